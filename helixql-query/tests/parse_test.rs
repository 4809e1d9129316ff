//! Source-to-AST coverage: declaration forms, traversal chains, return
//! clauses, and position-tagged syntax errors.

use helixql_query::ast::{
    FieldTypeExpr, IdArg, Modifier, ReturnItem, StartSelector, Statement, StepKind,
};
use helixql_query::parser::Parser;
use helixql_query::{Error, parse};

#[test]
fn parses_declarations_and_queries_together() {
    let source = parse(
        "// social schema
        NODE User {
            Username: String,
            Status: { Active, Banned },
        }
        EDGE Follows FROM User TO User { Since: Int }
        EDGE Wrote FROM User TO Post {}

        /* queries
           follow below */
        QUERY actives() =>
            GET User
            WHERE Status::Active
            RETURN *",
    )
    .unwrap();

    assert_eq!(source.nodes.len(), 1);
    assert_eq!(source.edges.len(), 2);
    assert_eq!(source.queries.len(), 1);

    let user = &source.nodes[0];
    assert_eq!(user.name, "User");
    assert_eq!(user.fields.len(), 2);
    assert_eq!(user.fields[0].ty, FieldTypeExpr::Named("String".to_string()));
    assert_eq!(
        user.fields[1].ty,
        FieldTypeExpr::Variants(vec!["Active".to_string(), "Banned".to_string()])
    );

    let follows = &source.edges[0];
    assert_eq!((follows.from.as_str(), follows.to.as_str()), ("User", "User"));
    assert!(source.edges[1].fields.is_empty());

    let query = &source.queries[0];
    assert_eq!(query.name, "actives");
    assert!(query.params.is_empty());
    assert_eq!(query.statements.len(), 2);
}

#[test]
fn start_selector_forms() {
    let selector = |text: &str| {
        let query = Parser::parse_query(text).unwrap();
        match &query.statements[0] {
            Statement::Traverse(expr) => expr.start.clone(),
            other => panic!("expected a traversal, got {other:?}"),
        }
    };

    assert_eq!(
        selector("GET User RETURN *"),
        StartSelector::Typed("User".to_string())
    );
    assert_eq!(selector("GET NODES RETURN *"), StartSelector::AllNodes);
    assert_eq!(selector("GET EDGES RETURN *"), StartSelector::AllEdges);
    assert_eq!(selector("GET RETURN *"), StartSelector::Everything);
    assert_eq!(
        selector("GET User(userID) RETURN *"),
        StartSelector::ById {
            ty: "User".to_string(),
            id: IdArg::Param("userID".to_string()),
        }
    );
    assert_eq!(
        selector("GET User(\"0a0b\") RETURN *"),
        StartSelector::ById {
            ty: "User".to_string(),
            id: IdArg::Literal("0a0b".to_string()),
        }
    );
}

#[test]
fn edge_qualifiers_do_not_swallow_the_next_step() {
    let query = Parser::parse_query("GET User::Out::Follows::In RETURN *").unwrap();
    let Statement::Traverse(expr) = &query.statements[0] else {
        panic!("expected a traversal");
    };
    assert_eq!(expr.steps.len(), 2);
    assert_eq!(expr.steps[0].kind, StepKind::Out);
    assert_eq!(expr.steps[0].edge.as_deref(), Some("Follows"));
    assert_eq!(expr.steps[1].kind, StepKind::In);
    assert_eq!(expr.steps[1].edge, None);
}

#[test]
fn distinct_marks_the_traversal() {
    let query = Parser::parse_query("GET User::In DISTINCT RETURN *").unwrap();
    let Statement::Traverse(expr) = &query.statements[0] else {
        panic!("expected a traversal");
    };
    assert!(expr.distinct);
}

#[test]
fn unknown_step_names_are_syntax_errors() {
    let err = Parser::parse_query("GET User::Sideways RETURN *").unwrap_err();
    match err {
        Error::Syntax { message, .. } => {
            assert!(message.contains("unknown traversal step `Sideways`"), "{message}");
        }
        other => panic!("expected a syntax error, got {other}"),
    }
}

#[test]
fn return_clause_forms() {
    let items = |text: &str| Parser::parse_query(text).unwrap().ret.items;

    assert_eq!(items("GET User RETURN *"), vec![ReturnItem::All]);
    // Bare RETURN is the full projection too.
    assert_eq!(items("GET User RETURN"), vec![ReturnItem::All]);
    assert_eq!(
        items("GET User RETURN Username, FollowerCount"),
        vec![
            ReturnItem::Field("Username".to_string()),
            ReturnItem::Field("FollowerCount".to_string()),
        ]
    );
    assert_eq!(
        items("users <- GET User RETURN users::{Username, Status}, COUNT(users)"),
        vec![
            ReturnItem::Projection {
                var: "users".to_string(),
                fields: vec!["Username".to_string(), "Status".to_string()],
            },
            ReturnItem::Count("users".to_string()),
        ]
    );
}

#[test]
fn return_modifiers() {
    let modifier = |text: &str| Parser::parse_query(text).unwrap().ret.modifier;
    assert_eq!(modifier("GET User RETURN *"), None);
    assert_eq!(modifier("GET User RETURN * JSON"), Some(Modifier::Json));
    assert_eq!(modifier("GET User RETURN Username NEXT"), Some(Modifier::Next));
}

#[test]
fn adhoc_bodies_declare_their_id_parameters() {
    let query = Parser::parse_query(
        "user <- GET User(userID)
         GET Post(postID)::In::Liked
         RETURN COUNT(user)",
    )
    .unwrap();
    assert_eq!(query.name, "adhoc");
    let params: Vec<(&str, &str)> = query
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.ty.as_str()))
        .collect();
    assert_eq!(params, [("userID", "String"), ("postID", "String")]);
}

#[test]
fn keywords_are_case_sensitive() {
    // Lowercase `get` is an identifier, not a keyword, so this is not a
    // traversal statement.
    let err = Parser::parse_query("get User RETURN *").unwrap_err();
    assert!(matches!(err, Error::Syntax { .. }), "got {err}");
}

#[test]
fn syntax_errors_carry_line_and_column() {
    let err = Parser::parse_query(
        "QUERY q() =>
    GET User RETRN *",
    )
    .unwrap_err();
    match err {
        Error::Syntax { line, column, .. } => {
            assert_eq!((line, column), (2, 14));
        }
        other => panic!("expected a syntax error, got {other}"),
    }
}

#[test]
fn unterminated_tokens_are_reported() {
    let err = parse("NODE User { Name: String }\nQUERY q() => GET User(\"abc RETURN *").unwrap_err();
    assert!(matches!(err, Error::Syntax { .. }), "got {err}");

    let err = parse("/* runs off the end").unwrap_err();
    match err {
        Error::Syntax { message, .. } => {
            assert!(message.contains("unterminated block comment"), "{message}");
        }
        other => panic!("expected a syntax error, got {other}"),
    }
}

#[test]
fn trailing_input_after_a_query_is_rejected() {
    let err = Parser::parse_query("GET User RETURN * GET Post RETURN *").unwrap_err();
    match err {
        Error::Syntax { message, .. } => {
            assert!(message.contains("trailing"), "{message}");
        }
        other => panic!("expected a syntax error, got {other}"),
    }
}

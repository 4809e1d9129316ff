//! End-to-end traversal runs against a real in-memory graph store.

use helixql_api::{KvWrite, Node, Value, props};
use helixql_query::{Error, Params, Schema, compile};
use helixql_storage::{GraphStore, MemStore, keys};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SOURCE: &str = "
NODE User { Username: String, FollowerCount: Int, Status: { Active, Banned } }
NODE Post { Title: String }
EDGE Follows FROM User TO User { Since: Int }
EDGE Wrote FROM User TO Post
EDGE Liked FROM User TO Post { Mood: { Happy, Meh } }
";

fn schema() -> Schema {
    Schema::parse(SOURCE).unwrap()
}

fn add_user(graph: &mut GraphStore<MemStore>, name: &str, followers: i64, status: &str) -> Node {
    graph
        .create_node(
            "User",
            props! {
                "Username" => name,
                "FollowerCount" => followers,
                "Status" => Value::tag("User.Status", status),
            },
        )
        .unwrap()
}

fn add_post(graph: &mut GraphStore<MemStore>, title: &str) -> Node {
    graph
        .create_node("Post", props! { "Title" => title })
        .unwrap()
}

fn run(
    schema: &Schema,
    graph: &GraphStore<MemStore>,
    text: &str,
) -> helixql_query::Result<Vec<helixql_query::Row>> {
    let outcome = compile(schema, text)?.execute(graph, &Params::new())?;
    Ok(outcome.as_rows().expect("row outcome").to_vec())
}

fn usernames(rows: &[helixql_query::Row]) -> Vec<String> {
    rows.iter()
        .map(|row| match row.value("Username") {
            Some(Value::String(name)) => name.clone(),
            other => panic!("expected a Username string, got {other:?}"),
        })
        .collect()
}

#[test]
fn typed_scan_returns_every_element_of_the_type() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    add_user(&mut graph, "ada", 10, "Active");
    add_user(&mut graph, "bob", 3, "Banned");
    add_post(&mut graph, "hello");

    let rows = run(&schema, &graph, "GET User RETURN Username").unwrap();
    let mut names = usernames(&rows);
    names.sort();
    assert_eq!(names, ["ada", "bob"]);

    let rows = run(&schema, &graph, "GET Post RETURN Title").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value("Title"), Some(&Value::from("hello")));
}

#[test]
fn empty_scan_is_empty_not_an_error() {
    let schema = schema();
    let graph = GraphStore::new(MemStore::new());
    let rows = run(&schema, &graph, "GET User RETURN Username").unwrap();
    assert!(rows.is_empty());
}

#[test]
fn out_hop_reaches_followed_users() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 1, "Active");
    let bob = add_user(&mut graph, "bob", 2, "Active");
    add_user(&mut graph, "cy", 0, "Active");
    graph
        .create_edge("Follows", ada.id, bob.id, props! { "Since" => 2020 })
        .unwrap();

    let text = format!("GET User(\"{}\")::Out::Follows RETURN Username", ada.id);
    let rows = run(&schema, &graph, &text).unwrap();
    assert_eq!(usernames(&rows), ["bob"]);
}

#[test]
fn in_hop_reaches_followers() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 1, "Active");
    let bob = add_user(&mut graph, "bob", 2, "Active");
    let cy = add_user(&mut graph, "cy", 0, "Active");
    graph
        .create_edge("Follows", bob.id, ada.id, props! { "Since" => 2021 })
        .unwrap();
    graph
        .create_edge("Follows", cy.id, ada.id, props! { "Since" => 2022 })
        .unwrap();

    let text = format!("GET User(\"{}\")::In::Follows RETURN Username", ada.id);
    let rows = run(&schema, &graph, &text).unwrap();
    let mut names = usernames(&rows);
    names.sort();
    assert_eq!(names, ["bob", "cy"]);
}

#[test]
fn hop_keeps_results_of_one_source_together() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 0, "Active");
    let bob = add_user(&mut graph, "bob", 0, "Active");
    for title in ["a1", "a2"] {
        let post = add_post(&mut graph, title);
        graph
            .create_edge("Wrote", ada.id, post.id, props! {})
            .unwrap();
    }
    for title in ["b1", "b2"] {
        let post = add_post(&mut graph, title);
        graph
            .create_edge("Wrote", bob.id, post.id, props! {})
            .unwrap();
    }

    let rows = run(&schema, &graph, "GET User::Out::Wrote RETURN Title").unwrap();
    assert_eq!(rows.len(), 4);
    let titles: Vec<&str> = rows
        .iter()
        .map(|row| match row.value("Title") {
            Some(Value::String(title)) => title.as_str(),
            other => panic!("expected a Title string, got {other:?}"),
        })
        .collect();
    // One author's posts are contiguous: the walk finishes a source
    // before moving to the next one.
    let a_positions: Vec<usize> = titles
        .iter()
        .enumerate()
        .filter(|(_, t)| t.starts_with('a'))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(a_positions[1] - a_positions[0], 1);
}

#[test]
fn edge_hops_stop_on_the_edges() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 0, "Active");
    let bob = add_user(&mut graph, "bob", 0, "Active");
    graph
        .create_edge("Follows", ada.id, bob.id, props! { "Since" => 2019 })
        .unwrap();

    let text = format!("GET User(\"{}\")::OutE::Follows RETURN Since", ada.id);
    let rows = run(&schema, &graph, &text).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value("Since"), Some(&Value::Int(2019)));

    let text = format!("GET User(\"{}\")::InE::Follows RETURN Since", bob.id);
    let rows = run(&schema, &graph, &text).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value("Since"), Some(&Value::Int(2019)));
}

#[test]
fn where_keeps_matching_tags_only() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    add_user(&mut graph, "ada", 1, "Active");
    add_user(&mut graph, "bob", 2, "Banned");
    add_user(&mut graph, "cy", 3, "Active");

    let rows = run(
        &schema,
        &graph,
        "GET User WHERE Status::Active RETURN Username",
    )
    .unwrap();
    let mut names = usernames(&rows);
    names.sort();
    assert_eq!(names, ["ada", "cy"]);

    let rows = run(
        &schema,
        &graph,
        "GET User WHERE Status::Banned RETURN Username",
    )
    .unwrap();
    assert_eq!(usernames(&rows), ["bob"]);
}

#[test]
fn where_can_filter_on_the_arriving_edge() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 0, "Active");
    let bob = add_user(&mut graph, "bob", 0, "Active");
    let post = add_post(&mut graph, "launch");
    graph
        .create_edge(
            "Liked",
            ada.id,
            post.id,
            props! { "Mood" => Value::tag("Liked.Mood", "Happy") },
        )
        .unwrap();
    graph
        .create_edge(
            "Liked",
            bob.id,
            post.id,
            props! { "Mood" => Value::tag("Liked.Mood", "Meh") },
        )
        .unwrap();

    // After `::In::Liked` the scope is the liking users; `Mood` is not
    // a User field, so the predicate falls through to the crossed edge.
    let text = format!(
        "GET Post(\"{}\")::In::Liked WHERE Mood::Happy RETURN Username",
        post.id
    );
    let rows = run(&schema, &graph, &text).unwrap();
    assert_eq!(usernames(&rows), ["ada"]);
}

#[test]
fn distinct_folds_parallel_edges() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 0, "Active");
    let bob = add_user(&mut graph, "bob", 0, "Active");
    graph
        .create_edge("Follows", ada.id, bob.id, props! { "Since" => 2020 })
        .unwrap();
    graph
        .create_edge("Follows", ada.id, bob.id, props! { "Since" => 2023 })
        .unwrap();

    let plain = format!("GET User(\"{}\")::Out::Follows RETURN Username", ada.id);
    assert_eq!(run(&schema, &graph, &plain).unwrap().len(), 2);

    let deduped = format!(
        "GET User(\"{}\")::Out::Follows DISTINCT RETURN Username",
        ada.id
    );
    let rows = run(&schema, &graph, &deduped).unwrap();
    assert_eq!(usernames(&rows), ["bob"]);

    // Re-running an already-duplicate-free pipeline changes nothing.
    assert_eq!(run(&schema, &graph, &deduped).unwrap(), rows);
}

#[test]
fn limit_takes_a_prefix_of_the_unlimited_run() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let mut rng = StdRng::seed_from_u64(11);
    for i in 0..20 {
        let status = if rng.gen_bool(0.5) { "Active" } else { "Banned" };
        let followers: i64 = rng.gen_range(0..1000);
        add_user(&mut graph, &format!("user{i}"), followers, status);
    }

    let all = run(
        &schema,
        &graph,
        "GET User WHERE Status::Active RETURN Username",
    )
    .unwrap();
    let limited = run(
        &schema,
        &graph,
        "GET User WHERE Status::Active LIMIT 7 RETURN Username",
    )
    .unwrap();
    let take = all.len().min(7);
    assert_eq!(limited, all[..take].to_vec());
}

#[test]
fn follower_sampling_pipeline() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let target = add_user(&mut graph, "target", 0, "Active");

    let mut active = Vec::new();
    for i in 0..120 {
        let user = add_user(&mut graph, &format!("active{i}"), i, "Active");
        graph
            .create_edge("Follows", user.id, target.id, props! { "Since" => 2024 })
            .unwrap();
        active.push(user);
    }
    for i in 0..30 {
        let user = add_user(&mut graph, &format!("banned{i}"), i, "Banned");
        graph
            .create_edge("Follows", user.id, target.id, props! { "Since" => 2024 })
            .unwrap();
    }
    // Ten enthusiasts follow twice; DISTINCT folds them back to one.
    for user in active.iter().take(10) {
        graph
            .create_edge("Follows", user.id, target.id, props! { "Since" => 2025 })
            .unwrap();
    }

    let text = format!(
        "followers <- GET User(\"{}\")::In::Follows DISTINCT
         WHERE Status::Active
         LIMIT 50
         RETURN Username, FollowerCount",
        target.id
    );
    let rows = run(&schema, &graph, &text).unwrap();
    assert_eq!(rows.len(), 50);

    let mut seen = std::collections::BTreeSet::new();
    for row in &rows {
        let columns: Vec<&str> = row.columns.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(columns, ["Username", "FollowerCount"]);
        let Some(Value::String(name)) = row.value("Username") else {
            panic!("Username missing");
        };
        assert!(name.starts_with("active"), "{name} passed the filter");
        assert!(seen.insert(name.clone()), "{name} appeared twice");
    }
}

#[test]
fn follower_page_filters_through_the_arrival_edge() {
    // Status lives on the edge here, not the user, so the predicate can
    // only resolve through the crossed `Follows` edge.
    let schema = Schema::parse(
        "
        NODE User { Username: String, FollowerCount: Int }
        EDGE Follows FROM User TO User { Status: { Active, Inactive } }
        ",
    )
    .unwrap();
    fn add(graph: &mut GraphStore<MemStore>, name: &str, followers: i64) -> Node {
        graph
            .create_node(
                "User",
                props! { "Username" => name, "FollowerCount" => followers },
            )
            .unwrap()
    }
    let mut graph = GraphStore::new(MemStore::new());
    let target = add(&mut graph, "target", 0);
    for i in 0..120 {
        let user = add(&mut graph, &format!("active{i}"), i);
        graph
            .create_edge(
                "Follows",
                user.id,
                target.id,
                props! { "Status" => Value::tag("Follows.Status", "Active") },
            )
            .unwrap();
    }
    for i in 0..80 {
        let user = add(&mut graph, &format!("idle{i}"), i);
        graph
            .create_edge(
                "Follows",
                user.id,
                target.id,
                props! { "Status" => Value::tag("Follows.Status", "Inactive") },
            )
            .unwrap();
    }

    let text = format!(
        "GET User(\"{}\")::In::Follows
         WHERE Status::Active
         LIMIT 50
         RETURN Username, FollowerCount",
        target.id
    );
    let rows = run(&schema, &graph, &text).unwrap();
    assert_eq!(rows.len(), 50);
    for row in &rows {
        let columns: Vec<&str> = row.columns.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(columns, ["Username", "FollowerCount"]);
        let Some(Value::String(name)) = row.value("Username") else {
            panic!("Username missing");
        };
        assert!(name.starts_with("active"), "{name} crossed an Inactive edge");
    }
}

#[test]
fn next_cursor_matches_eager_rows() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    for i in 0..5 {
        add_user(&mut graph, &format!("user{i}"), i, "Active");
    }

    let eager = run(&schema, &graph, "GET User RETURN Username, FollowerCount").unwrap();

    let outcome = compile(&schema, "GET User RETURN Username, FollowerCount NEXT")
        .unwrap()
        .execute(&graph, &Params::new())
        .unwrap();
    let mut cursor = outcome.into_cursor().expect("cursor outcome");
    let mut streamed = Vec::new();
    while let Some(row) = cursor.next().unwrap() {
        streamed.push(row);
    }
    assert_eq!(streamed, eager);

    // Exhaustion stays quiet.
    assert_eq!(cursor.next().unwrap(), None);
    assert_eq!(cursor.next().unwrap(), None);
}

#[test]
fn missing_id_fails_the_run() {
    let schema = schema();
    let graph = GraphStore::new(MemStore::new());
    let ghost = uuid::Uuid::new_v4();
    let text = format!("GET User(\"{ghost}\") RETURN *");
    let err = run(&schema, &graph, &text).unwrap_err();
    match err {
        Error::NotFound { label, id } => {
            assert_eq!(label, "User");
            assert_eq!(id, ghost);
        }
        other => panic!("expected NotFound, got {other}"),
    }
}

#[test]
fn missing_id_fails_even_when_the_binding_is_unused() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    add_post(&mut graph, "hello");
    let ghost = uuid::Uuid::new_v4();
    let text = format!(
        "missing <- GET User(\"{ghost}\")
         GET Post
         RETURN Title"
    );
    let err = run(&schema, &graph, &text).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }), "got {err}");
}

#[test]
fn dangling_edge_reference_aborts() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 0, "Active");
    let bob = add_user(&mut graph, "bob", 0, "Active");
    let edge = graph
        .create_edge("Follows", ada.id, bob.id, props! { "Since" => 2020 })
        .unwrap();
    // Tear the graph: remove bob's record but leave the edge in place.
    graph.kv_mut().delete(&keys::node_key(bob.id));

    let text = format!("GET User(\"{}\")::Out::Follows RETURN Username", ada.id);
    let err = run(&schema, &graph, &text).unwrap_err();
    match err {
        Error::DanglingReference { edge: e, node } => {
            assert_eq!(e, edge.id);
            assert_eq!(node, bob.id);
        }
        other => panic!("expected DanglingReference, got {other}"),
    }
}

#[test]
fn cursor_reports_an_error_once_then_fuses() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 0, "Active");
    let bob = add_user(&mut graph, "bob", 0, "Active");
    graph
        .create_edge("Follows", ada.id, bob.id, props! { "Since" => 2020 })
        .unwrap();
    graph.kv_mut().delete(&keys::node_key(bob.id));

    let text = format!("GET User(\"{}\")::Out::Follows RETURN Username NEXT", ada.id);
    let outcome = compile(&schema, &text)
        .unwrap()
        .execute(&graph, &Params::new())
        .unwrap();
    let mut cursor = outcome.into_cursor().expect("cursor outcome");
    assert!(cursor.next().is_err());
    assert_eq!(cursor.next().unwrap(), None);
}

#[test]
fn parameter_arity_and_types_are_checked() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 0, "Active");

    let compiled = compile(
        &schema,
        "QUERY byId(userID: String) => GET User(userID) RETURN Username",
    )
    .unwrap();

    // Missing.
    let err = compiled.execute(&graph, &Params::new()).unwrap_err();
    assert!(matches!(err, Error::ParamMismatch(_)), "got {err}");

    // Wrong type.
    let mut params = Params::new();
    params.insert("userID".to_string(), Value::Int(7));
    let err = compiled.execute(&graph, &params).unwrap_err();
    assert!(matches!(err, Error::ParamMismatch(_)), "got {err}");

    // Unexpected extra.
    let mut params = Params::new();
    params.insert("userID".to_string(), Value::from(ada.id.to_string()));
    params.insert("depth".to_string(), Value::Int(2));
    let err = compiled.execute(&graph, &params).unwrap_err();
    assert!(matches!(err, Error::ParamMismatch(_)), "got {err}");

    // Well formed.
    let mut params = Params::new();
    params.insert("userID".to_string(), Value::from(ada.id.to_string()));
    let outcome = compiled.execute(&graph, &params).unwrap();
    assert_eq!(outcome.as_rows().unwrap().len(), 1);
}

#[test]
fn bare_get_walks_nodes_then_edges() {
    let schema = schema();
    let mut graph = GraphStore::new(MemStore::new());
    let ada = add_user(&mut graph, "ada", 0, "Active");
    let bob = add_user(&mut graph, "bob", 0, "Active");
    graph
        .create_edge("Follows", ada.id, bob.id, props! { "Since" => 2020 })
        .unwrap();

    let rows = run(&schema, &graph, "GET RETURN *").unwrap();
    assert_eq!(rows.len(), 3);
    // Nodes come first, each row shaped by its own declared type.
    assert!(rows[0].value("Username").is_some());
    assert!(rows[1].value("Username").is_some());
    assert!(rows[2].value("Since").is_some());

    let counted = run(&schema, &graph, "all <- GET RETURN COUNT(all)").unwrap();
    assert_eq!(counted.len(), 1);
    assert_eq!(counted[0].value("COUNT(all)"), Some(&Value::Int(3)));
}

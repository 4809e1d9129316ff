use crate::ast::*;
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token, TokenType};

pub struct Parser;

impl Parser {
    /// Parse a full source file: NODE/EDGE declarations and named
    /// queries, in any order.
    pub fn parse_source(input: &str) -> Result<Source> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = TokenParser::new(tokens);
        parser.parse_source()
    }

    /// Parse a single query. Accepts the declared form
    /// (`QUERY Name(p: Type) => ...`) or a bare body
    /// (`GET ... RETURN ...`); for a bare body, every parameter name
    /// used in an id position is implicitly declared with type String.
    pub fn parse_query(input: &str) -> Result<QueryDecl> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = TokenParser::new(tokens);
        let query = if parser.check(&TokenType::Query) {
            parser.parse_query_decl()?
        } else {
            parser.parse_adhoc_query()?
        };
        parser.expect_eof()?;
        Ok(query)
    }
}

struct TokenParser {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenParser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    fn parse_source(&mut self) -> Result<Source> {
        let mut source = Source {
            nodes: Vec::new(),
            edges: Vec::new(),
            queries: Vec::new(),
        };
        while !self.is_at_end() {
            match self.peek().token_type {
                TokenType::Node => source.nodes.push(self.parse_node_decl()?),
                TokenType::Edge => source.edges.push(self.parse_edge_decl()?),
                TokenType::Query => source.queries.push(self.parse_query_decl()?),
                _ => {
                    return Err(self.syntax_here(format!(
                        "expected NODE, EDGE, or QUERY declaration, found {:?}",
                        self.peek().token_type
                    )));
                }
            }
        }
        Ok(source)
    }

    fn parse_node_decl(&mut self) -> Result<NodeDecl> {
        self.consume(&TokenType::Node, "expected NODE")?;
        let name = self.parse_identifier("node type name")?;
        let fields = if self.check(&TokenType::LeftBrace) {
            self.parse_field_block()?
        } else {
            Vec::new()
        };
        Ok(NodeDecl { name, fields })
    }

    fn parse_edge_decl(&mut self) -> Result<EdgeDecl> {
        self.consume(&TokenType::Edge, "expected EDGE")?;
        let name = self.parse_identifier("edge type name")?;
        self.consume(&TokenType::From, "expected FROM after edge type name")?;
        let from = self.parse_identifier("source node type")?;
        self.consume(&TokenType::To, "expected TO after source node type")?;
        let to = self.parse_identifier("target node type")?;
        let fields = if self.check(&TokenType::LeftBrace) {
            self.parse_field_block()?
        } else {
            Vec::new()
        };
        Ok(EdgeDecl {
            name,
            from,
            to,
            fields,
        })
    }

    fn parse_field_block(&mut self) -> Result<Vec<FieldDecl>> {
        self.consume(&TokenType::LeftBrace, "expected `{`")?;
        let mut fields = Vec::new();
        while !self.check(&TokenType::RightBrace) {
            let name = self.parse_identifier("field name")?;
            self.consume(&TokenType::Colon, "expected `:` after field name")?;
            let ty = if self.check(&TokenType::LeftBrace) {
                FieldTypeExpr::Variants(self.parse_variant_set()?)
            } else {
                FieldTypeExpr::Named(self.parse_identifier("field type")?)
            };
            fields.push(FieldDecl { name, ty });
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        self.consume(&TokenType::RightBrace, "expected `}` after field list")?;
        Ok(fields)
    }

    fn parse_variant_set(&mut self) -> Result<Vec<String>> {
        self.consume(&TokenType::LeftBrace, "expected `{`")?;
        let mut variants = Vec::new();
        while !self.check(&TokenType::RightBrace) {
            variants.push(self.parse_identifier("variant name")?);
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        self.consume(&TokenType::RightBrace, "expected `}` after variant list")?;
        Ok(variants)
    }

    fn parse_query_decl(&mut self) -> Result<QueryDecl> {
        self.consume(&TokenType::Query, "expected QUERY")?;
        let name = self.parse_identifier("query name")?;
        self.consume(&TokenType::LeftParen, "expected `(` after query name")?;
        let mut params = Vec::new();
        while !self.check(&TokenType::RightParen) {
            let name = self.parse_identifier("parameter name")?;
            self.consume(&TokenType::Colon, "expected `:` after parameter name")?;
            let ty = self.parse_identifier("parameter type")?;
            params.push(ParamDecl { name, ty });
            if !self.match_token(&TokenType::Comma) {
                break;
            }
        }
        self.consume(&TokenType::RightParen, "expected `)` after parameter list")?;
        self.consume(&TokenType::FatArrow, "expected `=>` before query body")?;
        let (statements, ret) = self.parse_body()?;
        Ok(QueryDecl {
            name,
            params,
            statements,
            ret,
        })
    }

    /// A bare body without the QUERY header. Parameter names found in id
    /// positions become the declared parameter list, typed String.
    fn parse_adhoc_query(&mut self) -> Result<QueryDecl> {
        let (statements, ret) = self.parse_body()?;
        let mut params: Vec<ParamDecl> = Vec::new();
        for statement in &statements {
            let expr = match statement {
                Statement::Assign { expr, .. } | Statement::Traverse(expr) => expr,
                _ => continue,
            };
            if let StartSelector::ById {
                id: IdArg::Param(name),
                ..
            } = &expr.start
                && !params.iter().any(|p| p.name == *name)
            {
                params.push(ParamDecl {
                    name: name.clone(),
                    ty: "String".to_string(),
                });
            }
        }
        Ok(QueryDecl {
            name: "adhoc".to_string(),
            params,
            statements,
            ret,
        })
    }

    fn parse_body(&mut self) -> Result<(Vec<Statement>, ReturnClause)> {
        let mut statements = Vec::new();
        loop {
            match self.peek().token_type {
                TokenType::Return => break,
                TokenType::Where => {
                    self.advance();
                    statements.push(Statement::Where(self.parse_predicate()?));
                }
                TokenType::Limit => {
                    self.advance();
                    statements.push(Statement::Limit(self.parse_count()?));
                }
                TokenType::Get => {
                    statements.push(Statement::Traverse(self.parse_traversal()?));
                }
                TokenType::Identifier(_)
                    if self.peek_ahead(1).token_type == TokenType::Arrow =>
                {
                    let var = self.parse_identifier("binding name")?;
                    self.advance(); // `<-`
                    statements.push(Statement::Assign {
                        var,
                        expr: self.parse_traversal()?,
                    });
                }
                _ => {
                    return Err(self.syntax_here(format!(
                        "expected a statement or RETURN, found {:?}",
                        self.peek().token_type
                    )));
                }
            }
        }
        let ret = self.parse_return()?;
        Ok((statements, ret))
    }

    fn parse_traversal(&mut self) -> Result<TraversalExpr> {
        self.consume(&TokenType::Get, "expected GET")?;
        let start = match &self.peek().token_type {
            TokenType::Nodes => {
                self.advance();
                StartSelector::AllNodes
            }
            TokenType::Edges => {
                self.advance();
                StartSelector::AllEdges
            }
            TokenType::Identifier(_) => {
                let ty = self.parse_identifier("type name")?;
                if self.match_token(&TokenType::LeftParen) {
                    let id = match self.peek().token_type.clone() {
                        TokenType::Identifier(name) => {
                            self.advance();
                            IdArg::Param(name)
                        }
                        TokenType::String(text) => {
                            self.advance();
                            IdArg::Literal(text)
                        }
                        other => {
                            return Err(self.syntax_here(format!(
                                "expected a parameter name or string id, found {other:?}"
                            )));
                        }
                    };
                    self.consume(&TokenType::RightParen, "expected `)` after id argument")?;
                    StartSelector::ById { ty, id }
                } else {
                    StartSelector::Typed(ty)
                }
            }
            _ => StartSelector::Everything,
        };

        let mut steps = Vec::new();
        while self.check(&TokenType::DoubleColon) {
            self.advance();
            let (line, column) = {
                let token = self.peek();
                (token.line, token.column)
            };
            let name = self.parse_identifier("traversal step")?;
            let kind = match name.as_str() {
                "In" => StepKind::In,
                "Out" => StepKind::Out,
                "InE" => StepKind::InE,
                "OutE" => StepKind::OutE,
                other => {
                    return Err(Error::syntax(
                        line,
                        column,
                        format!("unknown traversal step `{other}`"),
                    ));
                }
            };
            // `::Follows` after a step is the edge-type qualifier; a step
            // name there starts the next hop instead.
            let edge = if self.check(&TokenType::DoubleColon)
                && let TokenType::Identifier(next) = &self.peek_ahead(1).token_type
                && !matches!(next.as_str(), "In" | "Out" | "InE" | "OutE")
            {
                self.advance();
                Some(self.parse_identifier("edge type")?)
            } else {
                None
            };
            steps.push(Step { kind, edge });
        }

        let distinct = self.match_token(&TokenType::Distinct);
        Ok(TraversalExpr {
            start,
            steps,
            distinct,
        })
    }

    fn parse_predicate(&mut self) -> Result<Predicate> {
        let field = self.parse_identifier("predicate field")?;
        self.consume(&TokenType::DoubleColon, "expected `::` after predicate field")?;
        let variant = self.parse_identifier("variant name")?;
        Ok(Predicate { field, variant })
    }

    fn parse_count(&mut self) -> Result<u64> {
        match self.peek().token_type {
            TokenType::Integer(n) => {
                self.advance();
                // The lexer has no unary minus, so n is non-negative.
                Ok(n as u64)
            }
            _ => Err(self.syntax_here(format!(
                "expected an integer after LIMIT, found {:?}",
                self.peek().token_type
            ))),
        }
    }

    fn parse_return(&mut self) -> Result<ReturnClause> {
        self.consume(&TokenType::Return, "expected RETURN")?;
        let mut items = Vec::new();
        if self.match_token(&TokenType::Star) {
            items.push(ReturnItem::All);
        } else if matches!(
            self.peek().token_type,
            TokenType::Identifier(_) | TokenType::Count
        ) {
            loop {
                items.push(self.parse_return_item()?);
                if !self.match_token(&TokenType::Comma) {
                    break;
                }
            }
        } else {
            // Bare RETURN projects every declared field.
            items.push(ReturnItem::All);
        }

        let modifier = if self.match_token(&TokenType::Json) {
            Some(Modifier::Json)
        } else if self.match_token(&TokenType::Next) {
            Some(Modifier::Next)
        } else {
            None
        };
        Ok(ReturnClause { items, modifier })
    }

    fn parse_return_item(&mut self) -> Result<ReturnItem> {
        if self.match_token(&TokenType::Count) {
            self.consume(&TokenType::LeftParen, "expected `(` after COUNT")?;
            let var = self.parse_identifier("binding name")?;
            self.consume(&TokenType::RightParen, "expected `)` after COUNT argument")?;
            return Ok(ReturnItem::Count(var));
        }
        let name = self.parse_identifier("return item")?;
        if self.check(&TokenType::DoubleColon)
            && self.peek_ahead(1).token_type == TokenType::LeftBrace
        {
            self.advance(); // `::`
            self.advance(); // `{`
            let mut fields = Vec::new();
            while !self.check(&TokenType::RightBrace) {
                fields.push(self.parse_identifier("projected field")?);
                if !self.match_token(&TokenType::Comma) {
                    break;
                }
            }
            self.consume(&TokenType::RightBrace, "expected `}` after projection")?;
            return Ok(ReturnItem::Projection { var: name, fields });
        }
        Ok(ReturnItem::Field(name))
    }

    fn parse_identifier(&mut self, ctx: &str) -> Result<String> {
        match self.peek().token_type.clone() {
            TokenType::Identifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.syntax_here(format!(
                "expected identifier for {ctx}, found {other:?}"
            ))),
        }
    }

    fn expect_eof(&mut self) -> Result<()> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.syntax_here(format!(
                "unexpected trailing input: {:?}",
                self.peek().token_type
            )))
        }
    }

    fn match_token(&mut self, token_type: &TokenType) -> bool {
        if self.check(token_type) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token_type: &TokenType) -> bool {
        std::mem::discriminant(token_type) == std::mem::discriminant(&self.peek().token_type)
    }

    fn consume(&mut self, token_type: &TokenType, message: &str) -> Result<()> {
        if self.check(token_type) {
            self.advance();
            Ok(())
        } else {
            Err(self.syntax_here(format!(
                "{message}, found {:?}",
                self.peek().token_type
            )))
        }
    }

    fn syntax_here(&self, message: String) -> Error {
        let token = self.peek();
        Error::syntax(token.line, token.column, message)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::Eof)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.position]
    }

    /// Token `n` places past the cursor, saturating at Eof.
    fn peek_ahead(&self, n: usize) -> &Token {
        let index = (self.position + n).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }
}

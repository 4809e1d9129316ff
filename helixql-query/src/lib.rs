pub mod ast;
pub mod bind;
pub mod error;
pub mod exec;
pub mod lexer;
pub mod parser;
pub mod query_api;
pub mod result;
pub mod schema;

pub use error::{Error, Result};
pub use query_api::{CompiledQuery, Params, QuerySet, compile};
pub use result::{Cell, Cursor, Outcome, Row};
pub use schema::Schema;

pub fn parse(source: &str) -> Result<ast::Source> {
    parser::Parser::parse_source(source)
}

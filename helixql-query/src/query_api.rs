//! Compile-and-execute surface: the gateway-facing contract.
//!
//! `compile` turns query text into a [`CompiledQuery`] that can run any
//! number of times against any snapshot. Parameter arity and types are
//! checked against the declared list before a run touches storage.

use std::collections::BTreeMap;

use helixql_api::{GraphSnapshot, Value};

use crate::ast::{QueryDecl, Source};
use crate::bind::{Binder, BoundParam, BoundQuery};
use crate::error::{Error, Result};
use crate::exec;
use crate::parser::Parser;
use crate::result::{self, Outcome};
use crate::schema::Schema;

/// Name to typed-value arguments for one execution.
pub type Params = BTreeMap<String, Value>;

/// Compile one query against a schema. The text may be a declared
/// `QUERY Name(...) => ...` form or a bare body.
pub fn compile(schema: &Schema, text: &str) -> Result<CompiledQuery> {
    let decl = Parser::parse_query(text)?;
    compile_decl(schema, &decl)
}

fn compile_decl(schema: &Schema, decl: &QueryDecl) -> Result<CompiledQuery> {
    let bound = Binder::bind(schema, decl)?;
    log::debug!("compiled query `{}`", bound.name);
    Ok(CompiledQuery {
        schema: schema.clone(),
        bound,
    })
}

/// A parsed, bound, reusable query.
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    schema: Schema,
    bound: BoundQuery,
}

impl CompiledQuery {
    pub fn name(&self) -> &str {
        &self.bound.name
    }

    /// Declared parameters, in declaration order.
    pub fn params(&self) -> &[BoundParam] {
        &self.bound.params
    }

    /// Run against a snapshot. The outcome borrows the snapshot for as
    /// long as a cursor stays open, and nothing else: the compiled
    /// query and the parameter map may be dropped first.
    pub fn execute<'a, S: GraphSnapshot>(
        &self,
        snapshot: &'a S,
        params: &Params,
    ) -> Result<Outcome<'a>> {
        self.check_params(params)?;
        log::debug!("executing query `{}`", self.bound.name);
        let evaluated = exec::evaluate(snapshot, &self.bound, params)?;
        result::materialize(&self.schema, &self.bound.ret, evaluated)
    }

    fn check_params(&self, params: &Params) -> Result<()> {
        for param in &self.bound.params {
            let value = params.get(&param.name).ok_or_else(|| {
                Error::ParamMismatch(format!("missing parameter `{}`", param.name))
            })?;
            if !param.ty.admits(value) {
                return Err(Error::ParamMismatch(format!(
                    "parameter `{}`: expected {}, got {}",
                    param.name,
                    param.ty.name(),
                    value.kind()
                )));
            }
        }
        for name in params.keys() {
            if !self.bound.params.iter().any(|p| p.name == *name) {
                return Err(Error::ParamMismatch(format!(
                    "unexpected parameter `{name}`"
                )));
            }
        }
        Ok(())
    }
}

/// Named queries compiled out of one source text.
#[derive(Debug, Clone, Default)]
pub struct QuerySet {
    queries: BTreeMap<String, CompiledQuery>,
}

impl QuerySet {
    /// Compile every `QUERY` declaration of a parsed source. Names must
    /// be unique.
    pub fn compile_source(schema: &Schema, source: &Source) -> Result<Self> {
        let mut set = QuerySet::default();
        for decl in &source.queries {
            if set.queries.contains_key(&decl.name) {
                return Err(Error::bind(format!("duplicate query `{}`", decl.name)));
            }
            let compiled = compile_decl(schema, decl)?;
            set.queries.insert(decl.name.clone(), compiled);
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&CompiledQuery> {
        self.queries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

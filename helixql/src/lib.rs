//! # HelixQL
//!
//! **An embedded property-graph database with a typed traversal language.**
//!
//! HelixQL is for applications that want graph queries without an external
//! server. Node and edge types are declared up front; queries are compiled
//! against that schema, so a misspelled field or an impossible hop fails at
//! compile time instead of halfway through a scan.
//!
//! ## 🚀 Quickstart
//!
//! Add `helixql` to your `Cargo.toml`, then open a database from a source
//! text that declares the schema and the queries together:
//!
//! ```rust
//! use helixql::{Database, Params, props};
//!
//! fn main() -> helixql::Result<()> {
//!     // 1. Compile the schema and the named queries
//!     let mut db = Database::open(
//!         "NODE User { Username: String, Status: { Active, Banned } }
//!          EDGE Follows FROM User TO User
//!
//!          QUERY actives() =>
//!              users <- GET User
//!              WHERE Status::Active
//!              RETURN Username",
//!     )?;
//!
//!     // 2. Write data, checked against the schema
//!     let active = db.tag("User", "Status", "Active")?;
//!     db.insert_node("User", props! { "Username" => "ada", "Status" => active })?;
//!
//!     // 3. Run a declared query
//!     let outcome = db.run("actives", &Params::new())?;
//!     let rows = outcome.as_rows().expect("row outcome");
//!     assert_eq!(rows.len(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## 💡 Core Concepts
//!
//! - **[`Database`]**: the entry point. Owns the store, the compiled schema,
//!   and the query set; every write is validated against the schema before
//!   it lands.
//! - **[`props!`]**: builds the property map for [`Database::insert_node`]
//!   and [`Database::insert_edge`].
//! - **[`Outcome`] / [`Cursor`]**: query results as rows, a JSON document,
//!   or an incremental cursor, chosen by the query's RETURN modifier.
//! - **[`query`]**: the engine itself (re-exported from `helixql-query`),
//!   for callers that bring their own [`GraphSnapshot`].
//!
//! ## 📚 The Query Language
//!
//! A query names its parameters, binds traversals to variables, and ends in
//! a RETURN:
//!
//! ```text
//! QUERY follows(userID: String) =>
//!     user <- GET User(userID)
//!     followers <- GET User(userID)::In::Follows DISTINCT
//!     WHERE Status::Active
//!     LIMIT 50
//!     RETURN user::{Username}, COUNT(followers)
//! ```
//!
//! `GET` selects the starting elements, `::In`/`::Out` hop across edges to
//! the neighbouring nodes, `::InE`/`::OutE` stop on the edges themselves,
//! and `WHERE`/`LIMIT`/`DISTINCT` refine the pipeline they follow.

mod error;

use std::collections::BTreeMap;

use helixql_query::QuerySet;
use helixql_query::schema::FieldDef;

pub use error::{Error, Result};
pub use helixql_api::{
    Edge, EdgeId, GraphSnapshot, KvStore, Node, NodeId, StoreError, Value, props,
};
pub use helixql_query as query;
pub use helixql_query::{Cell, CompiledQuery, Cursor, Outcome, Params, Row, Schema};
pub use helixql_storage::{GraphStore, MemStore};

/// An embedded graph database: in-memory store, schema, and the queries
/// compiled at open time.
///
/// # Example
///
/// ```
/// use helixql::{Database, props};
///
/// let mut db = Database::open("NODE City { Name: String }").unwrap();
/// db.insert_node("City", props! { "Name" => "Oslo" }).unwrap();
/// ```
///
/// # Consistency
///
/// Reads take `&self` and writes take `&mut self`, so a live [`Outcome`]
/// or prepared snapshot can never observe a concurrent mutation.
#[derive(Debug)]
pub struct Database {
    graph: GraphStore<MemStore>,
    schema: Schema,
    queries: QuerySet,
}

impl Database {
    /// Opens a database from a source text of NODE and EDGE declarations
    /// plus zero or more named queries.
    ///
    /// The whole text is compiled up front; a schema error or an invalid
    /// query fails the open rather than the first call that would have
    /// hit it.
    pub fn open(source: &str) -> Result<Self> {
        let parsed = helixql_query::parse(source)?;
        let schema = Schema::from_decls(&parsed.nodes, &parsed.edges)?;
        let queries = QuerySet::compile_source(&schema, &parsed)?;
        log::debug!(
            "opened database: {} node types, {} edge types, {} queries",
            parsed.nodes.len(),
            parsed.edges.len(),
            queries.len()
        );
        Ok(Self {
            graph: GraphStore::new(MemStore::new()),
            schema,
            queries,
        })
    }

    /// The compiled schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Names of the queries declared at open time, in name order.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.queries.names()
    }

    /// Read-only view of the stored graph.
    ///
    /// Implements [`GraphSnapshot`], so it can be handed to a
    /// [`CompiledQuery`] directly.
    pub fn snapshot(&self) -> &GraphStore<MemStore> {
        &self.graph
    }

    /// Compiles one query against this database's schema without running
    /// it.
    ///
    /// Accepts the declared `QUERY Name(...) =>` form or a bare body such
    /// as `GET User RETURN *`. Execute it any number of times against
    /// [`Database::snapshot`].
    pub fn prepare(&self, text: &str) -> Result<CompiledQuery> {
        Ok(helixql_query::compile(&self.schema, text)?)
    }

    /// Checked constructor for ADT field values.
    ///
    /// `tag("User", "Status", "Active")` yields the value to store in the
    /// `Status` field of a `User`. Unknown fields and variants are
    /// rejected here instead of surfacing later as a failed match.
    pub fn tag(&self, type_name: &str, field: &str, variant: &str) -> Result<Value> {
        Ok(self.schema.tag(type_name, field, variant)?)
    }

    /// Stores a new node and returns the full record, id included.
    ///
    /// Every field the node type declares must be present with an
    /// admissible value, and no undeclared property is accepted.
    pub fn insert_node(
        &mut self,
        ty: &str,
        properties: BTreeMap<String, Value>,
    ) -> Result<Node> {
        let node_type = self
            .schema
            .node_type(ty)
            .ok_or_else(|| Error::Schema(format!("unknown node type `{ty}`")))?;
        validate_props(ty, &node_type.fields, &properties)?;
        Ok(self.graph.create_node(ty, properties)?)
    }

    /// Stores a new `src -> dst` edge and returns the full record.
    ///
    /// Both endpoints must exist and carry the node types the edge
    /// declaration names; fields are checked like [`Database::insert_node`].
    pub fn insert_edge(
        &mut self,
        ty: &str,
        src: NodeId,
        dst: NodeId,
        properties: BTreeMap<String, Value>,
    ) -> Result<Edge> {
        let edge_type = self
            .schema
            .edge_type(ty)
            .ok_or_else(|| Error::Schema(format!("unknown edge type `{ty}`")))?;
        validate_props(ty, &edge_type.fields, &properties)?;
        let from = edge_type.from.clone();
        let to = edge_type.to.clone();
        check_endpoint(&self.graph, src, &from, "source")?;
        check_endpoint(&self.graph, dst, &to, "destination")?;
        Ok(self.graph.create_edge(ty, src, dst, properties)?)
    }

    /// Deletes a node and every edge incident to it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<()> {
        Ok(self.graph.drop_node(id)?)
    }

    /// Deletes a single edge.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<()> {
        Ok(self.graph.drop_edge(id)?)
    }

    /// Runs a query declared at open time.
    ///
    /// The outcome borrows the database's current state; drop it before
    /// the next mutation.
    pub fn run(&self, name: &str, params: &Params) -> Result<Outcome<'_>> {
        let compiled = self
            .queries
            .get(name)
            .ok_or_else(|| Error::UnknownQuery(name.to_string()))?;
        Ok(compiled.execute(&self.graph, params)?)
    }

    /// Compiles and runs a one-off query text.
    ///
    /// Same forms as [`Database::prepare`]; the compiled plan is dropped
    /// after the run.
    pub fn query(&self, text: &str, params: &Params) -> Result<Outcome<'_>> {
        let compiled = self.prepare(text)?;
        Ok(compiled.execute(&self.graph, params)?)
    }
}

/// Write-side schema check: exactly the declared fields, each with an
/// admissible value.
fn validate_props(
    owner: &str,
    fields: &[FieldDef],
    properties: &BTreeMap<String, Value>,
) -> Result<()> {
    for field in fields {
        let value = properties.get(&field.name).ok_or_else(|| {
            Error::Schema(format!(
                "`{owner}` record is missing field `{}`",
                field.name
            ))
        })?;
        if !field.ty.admits(value) {
            return Err(Error::Schema(format!(
                "field `{}` of `{owner}` expects {}, got {}",
                field.name,
                field.ty,
                value.kind()
            )));
        }
    }
    for name in properties.keys() {
        if fields.iter().all(|field| field.name != *name) {
            return Err(Error::Schema(format!(
                "`{owner}` does not declare a field `{name}`"
            )));
        }
    }
    Ok(())
}

fn check_endpoint(
    graph: &GraphStore<MemStore>,
    id: NodeId,
    expected: &str,
    role: &str,
) -> Result<()> {
    let node = graph
        .node(id)?
        .ok_or_else(|| Error::Schema(format!("{role} node {id} does not exist")))?;
    if node.label != expected {
        return Err(Error::Schema(format!(
            "{role} node {id} is a `{}`, not a `{expected}`",
            node.label
        )));
    }
    Ok(())
}

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Node identifier.
///
/// Nodes are addressed by UUID; the id is assigned at creation time and is
/// stable for the lifetime of the record.
pub type NodeId = Uuid;

/// Edge identifier.
///
/// Edges carry their own UUID, independent of the endpoint node ids.
pub type EdgeId = Uuid;

/// Property value stored on a node or edge.
///
/// Covers the primitive field types of the schema language plus tagged
/// variants for ADT fields:
/// - String: UTF-8 text
/// - Int: 64-bit signed integers
/// - Float: 64-bit floating point
/// - Boolean: true/false
/// - Tag: one variant of a closed, schema-declared variant set
/// - Null: absent value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    Boolean(bool),
    Tag {
        /// Identity of the owning ADT field, `<TypeName>.<FieldName>`.
        adt: String,
        variant: String,
    },
    Null,
}

impl Value {
    /// Short name of the value's kind, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "String",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Boolean(_) => "Boolean",
            Value::Tag { .. } => "Tag",
            Value::Null => "Null",
        }
    }

    /// Build a tagged ADT value.
    ///
    /// `adt` is the field identity in `<TypeName>.<FieldName>` form. Two tag
    /// values compare equal iff both the field identity and the variant
    /// match; the variant name alone is never compared across fields.
    pub fn tag(adt: impl Into<String>, variant: impl Into<String>) -> Self {
        Value::Tag {
            adt: adt.into(),
            variant: variant.into(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// Builds the property map for a node or edge.
///
/// ## Example Use
/// ```rust
/// use helixql_api::props;
///
/// let properties = props! {
///     "Username" => "will",
///     "FollowerCount" => 21,
/// };
///
/// assert_eq!(properties.len(), 2);
/// ```
#[macro_export]
macro_rules! props {
    () => {
        ::std::collections::BTreeMap::<String, $crate::Value>::new()
    };
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = ::std::collections::BTreeMap::<String, $crate::Value>::new();
        $(
            map.insert(String::from($key), $crate::Value::from($value));
        )*
        map
    }};
}

/// A stored node: id, type tag, and field values.
///
/// Properties use a `BTreeMap` so record encoding and scans are
/// deterministic; field ordering for projection comes from the schema, not
/// from this map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub properties: BTreeMap<String, Value>,
}

/// A stored directed edge: id, type tag, endpoints, and field values.
///
/// `src` and `dst` are node ids; the src→dst orientation is persisted and
/// is what `In`/`Out` traversal directions are defined against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub label: String,
    pub src: NodeId,
    pub dst: NodeId,
    pub properties: BTreeMap<String, Value>,
}

/// Which record family a storage error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Node,
    Edge,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Node => write!(f, "node"),
            RecordKind::Edge => write!(f, "edge"),
        }
    }
}

/// Errors surfaced by a [`GraphSnapshot`] implementation.
///
/// These describe inconsistencies inside the store itself. They are
/// distinct from query-level errors such as a dangling edge endpoint,
/// which the executor raises after a well-formed read.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record bytes under a live key failed to decode.
    #[error("corrupt {kind} record at key `{key}`: {source}")]
    Decode {
        kind: RecordKind,
        key: String,
        #[source]
        source: serde_json::Error,
    },
    /// An index key does not end in a well-formed id.
    #[error("malformed index key `{key}`")]
    BadKey { key: String },
    /// A type or adjacency index names an id with no backing record.
    #[error("{kind} index entry `{id}` has no backing record")]
    Orphaned { kind: RecordKind, id: Uuid },
}

/// Ordered key-value store read contract.
///
/// The query core consumes exactly two operations from the underlying
/// store: a point lookup and a lazy ordered prefix scan. Durability,
/// compaction and write batching are the store's own business.
pub trait KvStore {
    /// Point lookup. A missing key yields `None`.
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    /// Lazy scan of every pair whose key starts with `prefix`, in key
    /// order. An unmatched prefix yields an empty iterator.
    fn scan<'a>(&'a self, prefix: &[u8]) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;
}

/// Mutation half of the key-value contract, used by the graph adapter's
/// write surface. The query core itself never calls these.
pub trait KvWrite {
    /// Insert or overwrite one pair.
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>);

    /// Remove a key. Returns whether it was present.
    fn delete(&mut self, key: &[u8]) -> bool;
}

/// Read-only view of the property graph, consumed by the traversal
/// executor.
///
/// A `&self` borrow is the consistency boundary: implementations take
/// shared borrows for every read and exclusive borrows for mutation, so a
/// live snapshot borrow cannot observe concurrent writes. Iteration order
/// of the scan methods must be stable for a given store state; the
/// executor's output ordering is defined in terms of it.
pub trait GraphSnapshot {
    /// Fetch one node record. `Ok(None)` when the id is unknown.
    fn node(&self, id: NodeId) -> Result<Option<Node>, StoreError>;

    /// Fetch one edge record. `Ok(None)` when the id is unknown.
    fn edge(&self, id: EdgeId) -> Result<Option<Edge>, StoreError>;

    /// All nodes of one declared type, in type-index order.
    fn nodes_with_label<'a>(
        &'a self,
        label: &str,
    ) -> Box<dyn Iterator<Item = Result<Node, StoreError>> + 'a>;

    /// All edges of one declared type, in type-index order.
    fn edges_with_label<'a>(
        &'a self,
        label: &str,
    ) -> Box<dyn Iterator<Item = Result<Edge, StoreError>> + 'a>;

    /// Every node in the store, in record-key order.
    fn nodes<'a>(&'a self) -> Box<dyn Iterator<Item = Result<Node, StoreError>> + 'a>;

    /// Every edge in the store, in record-key order.
    fn edges<'a>(&'a self) -> Box<dyn Iterator<Item = Result<Edge, StoreError>> + 'a>;

    /// Outgoing edges of `src`, optionally restricted to one edge type,
    /// in adjacency-index order.
    fn out_edges<'a>(
        &'a self,
        src: NodeId,
        label: Option<&str>,
    ) -> Box<dyn Iterator<Item = Result<Edge, StoreError>> + 'a>;

    /// Incoming edges of `dst`, optionally restricted to one edge type,
    /// in adjacency-index order.
    fn in_edges<'a>(
        &'a self,
        dst: NodeId,
        label: Option<&str>,
    ) -> Box<dyn Iterator<Item = Result<Edge, StoreError>> + 'a>;
}

//! Graph adapter: node/edge records and their indexes over any
//! [`KvStore`].
//!
//! Reads implement [`GraphSnapshot`] and go through `&self`; the write
//! surface needs `&mut self` plus [`KvWrite`], so a borrow of the store
//! is already a consistent view. `create_edge` deliberately does not
//! verify that its endpoints exist — referential integrity is enforced
//! at read time by the traversal layer, and tests rely on being able to
//! store a dangling edge.

use std::collections::BTreeMap;

use helixql_api::{
    Edge, EdgeId, GraphSnapshot, KvStore, KvWrite, Node, NodeId, RecordKind, StoreError, Value,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::keys;

#[derive(Debug)]
pub struct GraphStore<S> {
    kv: S,
}

impl<S> GraphStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    pub fn into_inner(self) -> S {
        self.kv
    }

    /// Raw access to the underlying store. Bypasses every index; meant
    /// for integrity tooling and tests that need a torn graph.
    pub fn kv_mut(&mut self) -> &mut S {
        &mut self.kv
    }
}

impl<S: KvStore + KvWrite> GraphStore<S> {
    /// Store a new node of type `label` and return the full record.
    pub fn create_node(
        &mut self,
        label: &str,
        properties: BTreeMap<String, Value>,
    ) -> Result<Node> {
        let node = Node {
            id: Uuid::new_v4(),
            label: label.to_string(),
            properties,
        };
        let bytes = serde_json::to_vec(&node).map_err(Error::Encode)?;
        self.kv.put(keys::node_key(node.id), bytes);
        self.kv.put(keys::node_label_key(label, node.id), Vec::new());
        log::debug!("created node {} ({})", node.id, node.label);
        Ok(node)
    }

    /// Store a new `src -> dst` edge of type `label` and return the full
    /// record. Endpoints are not checked; see the module docs.
    pub fn create_edge(
        &mut self,
        label: &str,
        src: NodeId,
        dst: NodeId,
        properties: BTreeMap<String, Value>,
    ) -> Result<Edge> {
        let edge = Edge {
            id: Uuid::new_v4(),
            label: label.to_string(),
            src,
            dst,
            properties,
        };
        let bytes = serde_json::to_vec(&edge).map_err(Error::Encode)?;
        self.kv.put(keys::edge_key(edge.id), bytes);
        self.kv.put(keys::edge_label_key(label, edge.id), Vec::new());
        self.kv.put(keys::out_edge_key(src, label, edge.id), Vec::new());
        self.kv.put(keys::in_edge_key(dst, label, edge.id), Vec::new());
        log::debug!("created edge {} ({} {} -> {})", edge.id, label, src, dst);
        Ok(edge)
    }

    /// Delete a node and every edge incident to it.
    pub fn drop_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.fetch_node(id)?.ok_or(Error::UnknownNode(id))?;
        let mut incident: Vec<EdgeId> = Vec::new();
        for edge in self.out_edges(id, None) {
            incident.push(edge?.id);
        }
        for edge in self.in_edges(id, None) {
            incident.push(edge?.id);
        }
        // A self-loop shows up in both adjacency lists.
        incident.sort_unstable();
        incident.dedup();
        for edge_id in incident {
            self.drop_edge(edge_id)?;
        }
        self.kv.delete(&keys::node_key(id));
        self.kv.delete(&keys::node_label_key(&node.label, id));
        log::debug!("dropped node {} ({})", id, node.label);
        Ok(())
    }

    /// Delete a single edge and its index postings.
    pub fn drop_edge(&mut self, id: EdgeId) -> Result<()> {
        let edge = self.fetch_edge(id)?.ok_or(Error::UnknownEdge(id))?;
        self.kv.delete(&keys::edge_key(id));
        self.kv.delete(&keys::edge_label_key(&edge.label, id));
        self.kv.delete(&keys::out_edge_key(edge.src, &edge.label, id));
        self.kv.delete(&keys::in_edge_key(edge.dst, &edge.label, id));
        log::debug!("dropped edge {} ({})", id, edge.label);
        Ok(())
    }
}

impl<S: KvStore> GraphStore<S> {
    fn fetch_node(&self, id: NodeId) -> std::result::Result<Option<Node>, StoreError> {
        let key = keys::node_key(id);
        match self.kv.get(&key) {
            None => Ok(None),
            Some(bytes) => decode_node(&key, &bytes).map(Some),
        }
    }

    fn fetch_edge(&self, id: EdgeId) -> std::result::Result<Option<Edge>, StoreError> {
        let key = keys::edge_key(id);
        match self.kv.get(&key) {
            None => Ok(None),
            Some(bytes) => decode_edge(&key, &bytes).map(Some),
        }
    }

    /// Resolve an index posting to its node record.
    fn node_posting(&self, key: &[u8]) -> std::result::Result<Node, StoreError> {
        let id = keys::tail_id(key).ok_or_else(|| StoreError::BadKey {
            key: printable(key),
        })?;
        self.fetch_node(id)?.ok_or(StoreError::Orphaned {
            kind: RecordKind::Node,
            id,
        })
    }

    /// Resolve an index posting to its edge record.
    fn edge_posting(&self, key: &[u8]) -> std::result::Result<Edge, StoreError> {
        let id = keys::tail_id(key).ok_or_else(|| StoreError::BadKey {
            key: printable(key),
        })?;
        self.fetch_edge(id)?.ok_or(StoreError::Orphaned {
            kind: RecordKind::Edge,
            id,
        })
    }
}

impl<S: KvStore> GraphSnapshot for GraphStore<S> {
    fn node(&self, id: NodeId) -> std::result::Result<Option<Node>, StoreError> {
        self.fetch_node(id)
    }

    fn edge(&self, id: EdgeId) -> std::result::Result<Option<Edge>, StoreError> {
        self.fetch_edge(id)
    }

    fn nodes_with_label<'a>(
        &'a self,
        label: &str,
    ) -> Box<dyn Iterator<Item = std::result::Result<Node, StoreError>> + 'a> {
        let prefix = keys::node_label_scan(label);
        Box::new(
            self.kv
                .scan(&prefix)
                .map(move |(key, _)| self.node_posting(&key)),
        )
    }

    fn edges_with_label<'a>(
        &'a self,
        label: &str,
    ) -> Box<dyn Iterator<Item = std::result::Result<Edge, StoreError>> + 'a> {
        let prefix = keys::edge_label_scan(label);
        Box::new(
            self.kv
                .scan(&prefix)
                .map(move |(key, _)| self.edge_posting(&key)),
        )
    }

    fn nodes<'a>(&'a self) -> Box<dyn Iterator<Item = std::result::Result<Node, StoreError>> + 'a> {
        Box::new(
            self.kv
                .scan(keys::NODE_PREFIX)
                .map(|(key, bytes)| decode_node(&key, &bytes)),
        )
    }

    fn edges<'a>(&'a self) -> Box<dyn Iterator<Item = std::result::Result<Edge, StoreError>> + 'a> {
        Box::new(
            self.kv
                .scan(keys::EDGE_PREFIX)
                .map(|(key, bytes)| decode_edge(&key, &bytes)),
        )
    }

    fn out_edges<'a>(
        &'a self,
        src: NodeId,
        label: Option<&str>,
    ) -> Box<dyn Iterator<Item = std::result::Result<Edge, StoreError>> + 'a> {
        let prefix = keys::out_edge_scan(src, label);
        Box::new(
            self.kv
                .scan(&prefix)
                .map(move |(key, _)| self.edge_posting(&key)),
        )
    }

    fn in_edges<'a>(
        &'a self,
        dst: NodeId,
        label: Option<&str>,
    ) -> Box<dyn Iterator<Item = std::result::Result<Edge, StoreError>> + 'a> {
        let prefix = keys::in_edge_scan(dst, label);
        Box::new(
            self.kv
                .scan(&prefix)
                .map(move |(key, _)| self.edge_posting(&key)),
        )
    }
}

fn decode_node(key: &[u8], bytes: &[u8]) -> std::result::Result<Node, StoreError> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::Decode {
        kind: RecordKind::Node,
        key: printable(key),
        source,
    })
}

fn decode_edge(key: &[u8], bytes: &[u8]) -> std::result::Result<Edge, StoreError> {
    serde_json::from_slice(bytes).map_err(|source| StoreError::Decode {
        kind: RecordKind::Edge,
        key: printable(key),
        source,
    })
}

fn printable(key: &[u8]) -> String {
    String::from_utf8_lossy(key).into_owned()
}

//! Byte layout of graph data inside the key-value store.
//!
//! Every record family lives under a short ASCII prefix; ids are
//! hyphenated UUID text so keys stay printable and prefix scans stay
//! cheap. Layout:
//!
//! - `n:<node-id>` → node record
//! - `e:<edge-id>` → edge record
//! - `nl:<label>:<node-id>` → node type index posting (empty value)
//! - `el:<label>:<edge-id>` → edge type index posting (empty value)
//! - `out:<src-id>:<label>:<edge-id>` → outgoing adjacency posting
//! - `in:<dst-id>:<label>:<edge-id>` → incoming adjacency posting
//!
//! Labels are identifiers and can never contain `:`, so prefix
//! boundaries are unambiguous.

use helixql_api::{EdgeId, NodeId};
use uuid::Uuid;

pub const NODE_PREFIX: &[u8] = b"n:";
pub const EDGE_PREFIX: &[u8] = b"e:";
pub const NODE_LABEL_PREFIX: &[u8] = b"nl:";
pub const EDGE_LABEL_PREFIX: &[u8] = b"el:";
pub const OUT_EDGE_PREFIX: &[u8] = b"out:";
pub const IN_EDGE_PREFIX: &[u8] = b"in:";

/// Length of a hyphenated UUID in bytes.
const ID_LEN: usize = 36;

fn push_id(buf: &mut Vec<u8>, id: Uuid) {
    let mut text = [0u8; ID_LEN];
    id.hyphenated().encode_lower(&mut text);
    buf.extend_from_slice(&text);
}

pub fn node_key(id: NodeId) -> Vec<u8> {
    let mut key = Vec::with_capacity(NODE_PREFIX.len() + ID_LEN);
    key.extend_from_slice(NODE_PREFIX);
    push_id(&mut key, id);
    key
}

pub fn edge_key(id: EdgeId) -> Vec<u8> {
    let mut key = Vec::with_capacity(EDGE_PREFIX.len() + ID_LEN);
    key.extend_from_slice(EDGE_PREFIX);
    push_id(&mut key, id);
    key
}

pub fn node_label_key(label: &str, id: NodeId) -> Vec<u8> {
    let mut key = node_label_scan(label);
    push_id(&mut key, id);
    key
}

/// Scan prefix covering every node of one type.
pub fn node_label_scan(label: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(NODE_LABEL_PREFIX.len() + label.len() + 1 + ID_LEN);
    key.extend_from_slice(NODE_LABEL_PREFIX);
    key.extend_from_slice(label.as_bytes());
    key.push(b':');
    key
}

pub fn edge_label_key(label: &str, id: EdgeId) -> Vec<u8> {
    let mut key = edge_label_scan(label);
    push_id(&mut key, id);
    key
}

/// Scan prefix covering every edge of one type.
pub fn edge_label_scan(label: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(EDGE_LABEL_PREFIX.len() + label.len() + 1 + ID_LEN);
    key.extend_from_slice(EDGE_LABEL_PREFIX);
    key.extend_from_slice(label.as_bytes());
    key.push(b':');
    key
}

pub fn out_edge_key(src: NodeId, label: &str, edge: EdgeId) -> Vec<u8> {
    adjacency_key(OUT_EDGE_PREFIX, src, label, edge)
}

pub fn in_edge_key(dst: NodeId, label: &str, edge: EdgeId) -> Vec<u8> {
    adjacency_key(IN_EDGE_PREFIX, dst, label, edge)
}

/// Scan prefix for one node's outgoing adjacency, optionally narrowed to
/// a single edge type.
pub fn out_edge_scan(src: NodeId, label: Option<&str>) -> Vec<u8> {
    adjacency_scan(OUT_EDGE_PREFIX, src, label)
}

/// Scan prefix for one node's incoming adjacency, optionally narrowed to
/// a single edge type.
pub fn in_edge_scan(dst: NodeId, label: Option<&str>) -> Vec<u8> {
    adjacency_scan(IN_EDGE_PREFIX, dst, label)
}

fn adjacency_key(prefix: &[u8], node: NodeId, label: &str, edge: EdgeId) -> Vec<u8> {
    let mut key = adjacency_scan(prefix, node, Some(label));
    push_id(&mut key, edge);
    key
}

fn adjacency_scan(prefix: &[u8], node: NodeId, label: Option<&str>) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + ID_LEN + 1 + label.map_or(0, |l| l.len() + 1));
    key.extend_from_slice(prefix);
    push_id(&mut key, node);
    key.push(b':');
    if let Some(label) = label {
        key.extend_from_slice(label.as_bytes());
        key.push(b':');
    }
    key
}

/// Recover the UUID that terminates an index or record key.
///
/// All key shapes above end in a fixed-width hyphenated id, so the tail
/// bytes decode without walking the separators.
pub fn tail_id(key: &[u8]) -> Option<Uuid> {
    if key.len() < ID_LEN {
        return None;
    }
    let tail = &key[key.len() - ID_LEN..];
    let text = std::str::from_utf8(tail).ok()?;
    Uuid::parse_str(text).ok()
}

pub mod graph;
pub mod keys;
pub mod mem;
mod error;

pub use crate::error::{Error, Result};
pub use crate::graph::GraphStore;
pub use crate::mem::MemStore;

//! Shared type definitions for the Taproot binding runtime.
//!
//! These types describe the contract between the synchronization engine and
//! the host environment that owns the live tree: node and listener identities,
//! mutation records delivered in batches, the event model, and the
//! [`Document`] port the engine drives everything through.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod document;
pub mod event;
pub mod mutation;

pub use document::{Document, ReadyState};
pub use event::{DispatchStep, Event, EventPhase, ListenerOptions, ListenerTarget};
pub use mutation::{MutationBatch, MutationRecord, ObserveOptions};

/// Identity of a node in the host tree.
///
/// Identities are stable for the lifetime of the node and are never reused
/// while the node exists, whether it is connected or detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Handle for a native listener attached through [`Document::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Handle for a mutation observer created through [`Document::create_observer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObserverId(pub u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_render_with_their_kind() {
        assert_eq!(NodeId(3).to_string(), "node#3");
        assert_eq!(ListenerId(7).to_string(), "listener#7");
        assert_eq!(ObserverId(1).to_string(), "observer#1");
    }

    #[test]
    fn node_ids_serialize_transparently_as_numbers() {
        let encoded = serde_json::to_string(&NodeId(42)).expect("serialize node id");
        assert_eq!(encoded, "42");
    }
}

//! The host port.
//!
//! The engine never depends on a concrete tree implementation. Everything it
//! needs from the environment (reading the tree, writing attributes, observing
//! mutations, attaching listeners, planning dispatch) goes through
//! [`Document`]. The trait is object-safe so controller hooks can receive it as
//! `&mut dyn Document`.

use serde::{Deserialize, Serialize};

use crate::{DispatchStep, ListenerId, ListenerOptions, ListenerTarget, MutationBatch, NodeId, ObserveOptions, ObserverId};

/// Loading state of the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

/// Capabilities the binding engine requires from its host environment.
///
/// Mutations performed through this trait are not reported synchronously:
/// they are queued per observer and handed out by [`Document::take_records`],
/// one batch per observer, in observer-creation order.
pub trait Document {
    /// The root element of the document.
    fn document_element(&self) -> NodeId;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Children of `node` in document order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Whether `node` is currently reachable from the document root.
    fn is_connected(&self, node: NodeId) -> bool;

    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);

    fn remove_attribute(&mut self, node: NodeId, name: &str);

    fn text_content(&self, node: NodeId) -> String;

    fn set_text_content(&mut self, node: NodeId, text: &str);

    fn ready_state(&self) -> ReadyState;

    fn create_observer(&mut self) -> ObserverId;

    /// Starts observing `node`. Observing a node the observer already watches
    /// replaces the previous options for that node.
    fn observe(&mut self, observer: ObserverId, node: NodeId, options: ObserveOptions);

    /// Stops the observer and drops any records still queued for it.
    fn disconnect_observer(&mut self, observer: ObserverId);

    /// Hands out every queued record, grouped per observer.
    fn take_records(&mut self) -> Vec<MutationBatch>;

    fn add_listener(&mut self, target: ListenerTarget, event_type: &str, options: ListenerOptions) -> ListenerId;

    /// Detaches a listener. Unknown or already removed ids are ignored.
    fn remove_listener(&mut self, listener: ListenerId);

    /// Listeners to invoke, in order, for an event of `event_type` dispatched
    /// at `target`. Listeners registered with `once` are removed by the host
    /// as they are planned.
    fn dispatch_plan(&mut self, target: NodeId, event_type: &str) -> Vec<DispatchStep>;

    /// Ancestors of `node`, nearest first, excluding `node` itself.
    fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.parent(node);
        while let Some(ancestor) = current {
            ancestors.push(ancestor);
            current = self.parent(ancestor);
        }
        ancestors
    }

    /// `node` followed by all of its descendants, in document order.
    fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut ordered = Vec::new();
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            ordered.push(current);
            let mut children = self.children(current);
            children.reverse();
            stack.extend(children);
        }
        ordered
    }
}

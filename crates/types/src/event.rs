//! Event model shared by the host dispatcher and the action listeners.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ListenerId, NodeId};

/// Where a native listener is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListenerTarget {
    Node(NodeId),
    Document,
    Window,
}

/// Native listener options produced by merging action modifiers.
///
/// `passive` is tri-state: `None` leaves the host default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerOptions {
    pub capture: bool,
    pub passive: Option<bool>,
    pub once: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPhase {
    Capturing,
    AtTarget,
    Bubbling,
}

/// One listener invocation planned by the host for a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStep {
    pub listener: ListenerId,
    pub current_target: ListenerTarget,
    pub phase: EventPhase,
}

/// A dispatched event.
///
/// Handlers signal propagation control through the flag methods; the
/// dispatcher reads them back after every listener invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    event_type: String,
    target: NodeId,
    current_target: Option<ListenerTarget>,
    phase: Option<EventPhase>,
    /// Arbitrary payload carried alongside the event.
    pub detail: Value,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
    default_prevented: bool,
}

impl Event {
    pub fn new(event_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            current_target: None,
            phase: None,
            detail: Value::Null,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            default_prevented: false,
        }
    }

    /// Attaches a detail payload.
    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = detail;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The node the event was dispatched at.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The target whose listener is currently running, if any.
    pub fn current_target(&self) -> Option<ListenerTarget> {
        self.current_target
    }

    pub fn phase(&self) -> Option<EventPhase> {
        self.phase
    }

    /// Moves the event to the given dispatch step. Called by dispatchers only.
    pub fn enter_step(&mut self, step: &DispatchStep) {
        self.current_target = Some(step.current_target);
        self.phase = Some(step.phase);
    }

    /// Clears the in-flight dispatch position once dispatch finishes.
    pub fn finish_dispatch(&mut self) {
        self.current_target = None;
        self.phase = None;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stops propagation and prevents any further listener from running,
    /// including the remaining handlers of the current action listener.
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_stop_implies_propagation_stop() {
        let mut event = Event::new("click", NodeId(1));
        event.stop_immediate_propagation();
        assert!(event.is_propagation_stopped());
        assert!(event.is_immediate_propagation_stopped());
    }

    #[test]
    fn dispatch_position_tracks_the_current_step() {
        let mut event = Event::new("click", NodeId(4));
        let step = DispatchStep {
            listener: ListenerId(9),
            current_target: ListenerTarget::Document,
            phase: EventPhase::Bubbling,
        };
        event.enter_step(&step);
        assert_eq!(event.current_target(), Some(ListenerTarget::Document));
        assert_eq!(event.phase(), Some(EventPhase::Bubbling));

        event.finish_dispatch();
        assert_eq!(event.current_target(), None);
        assert_eq!(event.target(), NodeId(4));
    }
}

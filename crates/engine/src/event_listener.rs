//! Action attribute grammar and the listener entries it produces.
//!
//! An action attribute holds whitespace-separated entries of the form
//! `greeter:greet,ledger:record@click+once,keyup`. Each event spec is turned
//! into a [`ListenerKey`]; handlers from every entry naming the same key share
//! one native listener, in declaration order.

use once_cell::sync::Lazy;
use regex::Regex;
use taproot_types::{Document, ListenerId, ListenerOptions, ListenerTarget, NodeId};
use taproot_util::camelize;
use tracing::debug;

static ACTION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\S+?)@(\S+)").expect("action pattern"));

static HANDLER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"([^,]+?):([^,]+)").expect("handler pattern"));

/// A `descriptor:method` pair. The method name is camelized at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handler {
    pub descriptor: String,
    pub method: String,
}

/// Identity of a native listener: event type, merged options, and where it is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerKey {
    pub event_type: String,
    pub options: ListenerOptions,
    pub target: ListenerTarget,
}

/// One `handlers@events` entry of an action attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionBinding {
    pub handlers: Vec<Handler>,
    pub events: Vec<ListenerKey>,
}

/// Parses an action attribute value declared on `element`.
pub fn parse_actions(value: &str, element: NodeId) -> Vec<ActionBinding> {
    ACTION_PATTERN
        .captures_iter(value)
        .map(|captures| ActionBinding {
            handlers: parse_handlers(&captures[1]),
            events: captures[2]
                .split(',')
                .filter_map(|event| parse_event(event, element))
                .collect(),
        })
        .collect()
}

pub fn parse_handlers(csv: &str) -> Vec<Handler> {
    HANDLER_PATTERN
        .captures_iter(csv)
        .map(|captures| Handler {
            descriptor: captures[1].to_string(),
            method: camelize(&captures[2]),
        })
        .collect()
}

/// Parses `type+modifier+...`. Later modifiers override earlier ones.
pub fn parse_event(spec: &str, element: NodeId) -> Option<ListenerKey> {
    let mut parts = spec.split('+');
    let event_type = parts.next().filter(|event_type| !event_type.is_empty())?;

    let mut options = ListenerOptions::default();
    let mut target = ListenerTarget::Node(element);
    for modifier in parts {
        match modifier {
            "capture" => options.capture = true,
            "passive" => options.passive = Some(true),
            "notpassive" => options.passive = Some(false),
            "once" => options.once = true,
            "document" => target = ListenerTarget::Document,
            "window" => target = ListenerTarget::Window,
            unknown => debug!(modifier = unknown, event_type, "ignoring unknown action modifier"),
        }
    }

    Some(ListenerKey {
        event_type: event_type.to_string(),
        options,
        target,
    })
}

/// A native listener and the handlers currently routed through it.
#[derive(Debug)]
pub(crate) struct EventListenerEntry {
    listener: ListenerId,
    pub(crate) handlers: Vec<Handler>,
}

impl EventListenerEntry {
    pub(crate) fn attach(document: &mut dyn Document, element: NodeId, key: &ListenerKey) -> Self {
        let listener = document.add_listener(key.target, &key.event_type, key.options);
        debug!(node = %element, event_type = %key.event_type, listener = %listener, "attached action listener");
        Self {
            listener,
            handlers: Vec::new(),
        }
    }

    pub(crate) fn listener(&self) -> ListenerId {
        self.listener
    }

    pub(crate) fn detach(&self, document: &mut dyn Document) {
        debug!(listener = %self.listener, "detached action listener");
        document.remove_listener(self.listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ELEMENT: NodeId = NodeId(7);

    #[test]
    fn parses_handler_lists_and_event_lists() {
        let bindings = parse_actions("greeter:set-greeting,ledger:record@click,keyup  other:go@submit", ELEMENT);
        assert_eq!(bindings.len(), 2);

        let first = &bindings[0];
        assert_eq!(
            first.handlers,
            vec![
                Handler {
                    descriptor: "greeter".into(),
                    method: "setGreeting".into()
                },
                Handler {
                    descriptor: "ledger".into(),
                    method: "record".into()
                },
            ]
        );
        let types: Vec<_> = first.events.iter().map(|key| key.event_type.as_str()).collect();
        assert_eq!(types, vec!["click", "keyup"]);
        assert_eq!(bindings[1].events[0].target, ListenerTarget::Node(ELEMENT));
    }

    #[test]
    fn modifiers_merge_with_later_ones_winning() {
        let key = parse_event("scroll+passive+notpassive+capture+once+document+window", ELEMENT).expect("event");
        assert_eq!(key.event_type, "scroll");
        assert_eq!(
            key.options,
            ListenerOptions {
                capture: true,
                passive: Some(false),
                once: true
            }
        );
        assert_eq!(key.target, ListenerTarget::Window);
    }

    #[test]
    fn unknown_modifiers_and_empty_types_are_ignored() {
        let key = parse_event("click+sideways", ELEMENT).expect("event");
        assert_eq!(key.options, ListenerOptions::default());
        assert!(parse_event("", ELEMENT).is_none());
        assert!(parse_actions("no-at-sign here", ELEMENT).is_empty());
    }

    #[test]
    fn equal_event_specs_produce_equal_keys() {
        let left = parse_event("click+capture+once", ELEMENT);
        let right = parse_event("click+once+capture", ELEMENT);
        assert_eq!(left, right);
    }
}

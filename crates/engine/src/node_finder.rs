//! Scoped node lookup by logical node name.
//!
//! A node named `item` in the `list` namespace is any element carrying
//! `data-list-item`. Lookups start at the controller's element and skip every
//! descendant element that is itself bound to the same descriptor, together
//! with everything inside it. Nested controllers of other descriptors are
//! searched as usual.

use std::convert::Infallible;

use taproot_types::{Document, NodeId};
use taproot_util::{attribute_name_for, tokens};

use crate::{error::ProxyError, proxy::ElementProxyHandler};

#[derive(Debug, Clone)]
struct Scope {
    descriptor: String,
    controllers_attribute: String,
}

impl Scope {
    fn new(descriptor: &str, controllers_attribute: &str) -> Self {
        Self {
            descriptor: descriptor.to_string(),
            controllers_attribute: controllers_attribute.to_string(),
        }
    }

    fn binds_descriptor(&self, document: &dyn Document, node: NodeId) -> bool {
        document
            .attribute(node, &self.controllers_attribute)
            .is_some_and(|value| tokens(&value).contains(&self.descriptor.as_str()))
    }

    /// Matching elements in document order, stopping after `limit` matches.
    fn matches(&self, document: &dyn Document, element: NodeId, node_name: &str, limit: Option<usize>) -> Vec<NodeId> {
        let attribute = attribute_name_for(&self.descriptor, node_name);
        let mut found = Vec::new();
        let mut stack = vec![element];

        while let Some(node) = stack.pop() {
            if node != element && self.binds_descriptor(document, node) {
                continue;
            }
            if document.has_attribute(node, &attribute) {
                found.push(node);
                if limit.is_some_and(|limit| found.len() >= limit) {
                    break;
                }
            }
            let mut children = document.children(node);
            children.reverse();
            stack.extend(children);
        }
        found
    }
}

/// Resolves a node name to the bound element itself or its first matching descendant.
#[derive(Debug, Clone)]
pub struct NodeFinder {
    scope: Scope,
}

impl NodeFinder {
    pub fn new(descriptor: &str, controllers_attribute: &str) -> Self {
        Self {
            scope: Scope::new(descriptor, controllers_attribute),
        }
    }
}

impl ElementProxyHandler for NodeFinder {
    type Output = Option<NodeId>;
    type Input = Infallible;

    fn get(&self, document: &dyn Document, element: NodeId, key: &str) -> Result<Option<NodeId>, ProxyError> {
        Ok(self.scope.matches(document, element, key, Some(1)).into_iter().next())
    }
}

/// Resolves a node name to every matching element, the bound element first.
#[derive(Debug, Clone)]
pub struct NodeSetFinder {
    scope: Scope,
}

impl NodeSetFinder {
    pub fn new(descriptor: &str, controllers_attribute: &str) -> Self {
        Self {
            scope: Scope::new(descriptor, controllers_attribute),
        }
    }
}

impl ElementProxyHandler for NodeSetFinder {
    type Output = Vec<NodeId>;
    type Input = Infallible;

    fn get(&self, document: &dyn Document, element: NodeId, key: &str) -> Result<Vec<NodeId>, ProxyError> {
        Ok(self.scope.matches(document, element, key, None))
    }
}

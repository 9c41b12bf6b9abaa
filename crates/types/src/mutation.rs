//! Mutation observation records and options.

use serde::{Deserialize, Serialize};

use crate::{NodeId, ObserverId};

/// Options for [`Document::observe`](crate::Document::observe).
///
/// Attribute mutations are only reported for names listed in
/// `attribute_filter`; `None` means attributes are not observed at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObserveOptions {
    /// Report insertion and removal of children.
    pub child_list: bool,
    /// Extend observation to every descendant of the observed node.
    pub subtree: bool,
    /// Attribute names to report.
    pub attribute_filter: Option<Vec<String>>,
    /// Record the previous attribute value on each attribute record.
    pub attribute_old_value: bool,
}

impl ObserveOptions {
    /// Watch the named attributes of a single node, recording old values.
    pub fn attributes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            child_list: false,
            subtree: false,
            attribute_filter: Some(names.into_iter().map(Into::into).collect()),
            attribute_old_value: true,
        }
    }

    /// Watch child insertion/removal and the named attributes across a whole subtree.
    pub fn subtree<I, S>(attribute_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            child_list: true,
            subtree: true,
            attribute_filter: Some(attribute_names.into_iter().map(Into::into).collect()),
            attribute_old_value: false,
        }
    }

    /// Whether attribute mutations on `name` should be reported.
    pub fn observes_attribute(&self, name: &str) -> bool {
        self.attribute_filter
            .as_ref()
            .is_some_and(|names| names.iter().any(|candidate| candidate == name))
    }
}

/// A single observed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationRecord {
    /// Children were inserted into and/or removed from `target`.
    ChildList {
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// Attribute `name` of `target` was written or removed.
    Attributes {
        target: NodeId,
        name: String,
        old_value: Option<String>,
    },
}

impl MutationRecord {
    /// The node the mutation happened on.
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target, .. } | MutationRecord::Attributes { target, .. } => *target,
        }
    }
}

/// All records queued for one observer since the previous delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationBatch {
    pub observer: ObserverId,
    pub records: Vec<MutationRecord>,
}

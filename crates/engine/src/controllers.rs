//! Controller instance manager.
//!
//! Reconciles the instances bound to an element against its controllers
//! attribute. Reconciliation is incremental: descriptors that stay listed
//! keep their instance, so writing an unchanged value is a no-op.

use std::rc::Rc;

use taproot_types::{Document, Event, MutationBatch, NodeId};
use taproot_util::tokens;
use tracing::trace;

use crate::{
    attribute_observer::{AttributeObservers, changed_attributes},
    controller::{ControllerInstance, HookSettings},
    registry::Registry,
    scope::{BindingId, ScopeArena, VisibleControllers},
};

#[derive(Debug)]
pub(crate) struct ControllerManager {
    settings: HookSettings,
    scopes: ScopeArena,
    observers: AttributeObservers,
}

impl ControllerManager {
    pub(crate) fn new(settings: HookSettings) -> Self {
        Self {
            settings,
            scopes: ScopeArena::default(),
            observers: AttributeObservers::default(),
        }
    }

    pub(crate) fn binding_of(&self, node: NodeId) -> Option<BindingId> {
        self.scopes.binding_of(node)
    }

    /// Binds a node entering the document.
    ///
    /// Nodes that kept their record while detached get their scope link
    /// corrected first, then are reconciled like any other node, since their
    /// controllers attribute may have changed while no records were reported.
    pub(crate) fn create(&mut self, document: &mut dyn Document, registry: &Registry, node: NodeId) {
        self.scopes.relink(document, node);
        self.update(document, registry, node);
    }

    /// Reconciles the instances of `node` against its controllers attribute.
    pub(crate) fn update(&mut self, document: &mut dyn Document, registry: &Registry, node: NodeId) {
        let Some(value) = document.attribute(node, &self.settings.controllers_attribute) else {
            self.destroy(document, node);
            return;
        };
        let listed: Vec<String> = tokens(&value).into_iter().map(str::to_string).collect();

        let Self {
            settings,
            scopes,
            observers,
        } = self;
        scopes.ensure(document, node);

        let watched: Vec<String> = listed
            .iter()
            .filter_map(|descriptor| registry.lookup(descriptor).map(|definition| definition.hook_table(descriptor)))
            .flat_map(|table| table.keys().cloned().collect::<Vec<_>>())
            .collect();
        observers.observe(document, node, watched);

        let Some(record) = scopes.record_mut(node) else {
            return;
        };

        let stale: Vec<String> = record
            .instances
            .keys()
            .filter(|descriptor| !listed.contains(descriptor))
            .cloned()
            .collect();
        let mut changed = !stale.is_empty();
        for descriptor in stale {
            if let Some(mut instance) = record.instances.shift_remove(&descriptor) {
                instance.disconnect(document, settings);
            }
        }

        for descriptor in &listed {
            if record.instances.contains_key(descriptor) {
                continue;
            }
            let Some(definition) = registry.lookup(descriptor) else {
                continue;
            };
            let instance = ControllerInstance::new(node, descriptor, Rc::clone(definition));
            let instance = record.instances.entry(descriptor.clone()).or_insert(instance);
            instance.connect(document, settings);
            changed = true;
        }

        if changed {
            scopes.touch();
        }
    }

    /// Disconnects every instance of `node` and drops its record.
    pub(crate) fn destroy(&mut self, document: &mut dyn Document, node: NodeId) {
        self.observers.unobserve(document, node);
        let Some(mut record) = self.scopes.remove(node) else {
            return;
        };
        for instance in record.instances.values_mut() {
            instance.disconnect(document, &self.settings);
        }
    }

    pub(crate) fn rebase(&mut self, document: &dyn Document, node: NodeId) {
        self.scopes.rebase(document, node);
    }

    pub(crate) fn resolve_visible(&mut self, document: &dyn Document, node: NodeId) -> Rc<VisibleControllers> {
        self.scopes.resolve_visible(document, node)
    }

    /// Descriptors with a live instance on `node`, in creation order.
    pub(crate) fn descriptors_on(&self, node: NodeId) -> Vec<String> {
        self.scopes
            .record(node)
            .map(|record| record.instances.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Delivers every attribute that really changed to every instance on the element.
    pub(crate) fn process_attribute_batch(&mut self, document: &mut dyn Document, batch: &MutationBatch) {
        let Some(node) = self.observers.node_for(batch.observer) else {
            return;
        };
        let changed = changed_attributes(document, &batch.records);
        trace!(node = %node, records = batch.records.len(), changed = changed.len(), "processing attribute batch");
        if changed.is_empty() {
            return;
        }

        let Self { settings, scopes, .. } = self;
        let Some(record) = scopes.record_mut(node) else {
            return;
        };
        let descriptors: Vec<String> = record.instances.keys().cloned().collect();
        for attribute in &changed {
            for descriptor in &descriptors {
                if let Some(instance) = record.instances.get_mut(descriptor) {
                    instance.attribute_changed(document, settings, attribute);
                }
            }
        }
    }

    /// Runs an action method on the instance of `descriptor` bound to `owner`.
    pub(crate) fn perform(&mut self, document: &mut dyn Document, owner: NodeId, descriptor: &str, action: &str, event: &mut Event) {
        let Self { settings, scopes, .. } = self;
        if let Some(instance) = scopes
            .record_mut(owner)
            .and_then(|record| record.instances.get_mut(descriptor))
        {
            instance.perform(document, settings, action, event);
        }
    }
}

//! Root synchronization engine.
//!
//! The runtime owns the host document and keeps every controller instance
//! and action listener in step with it. Work happens in [`Runtime::tick`]:
//! a pending initialization runs first, then queued mutation records are
//! drained until the host has nothing left to report.

use std::rc::Rc;

use taproot_types::{Document, Event, ListenerTarget, MutationBatch, MutationRecord, NodeId, ObserveOptions, ObserverId, ReadyState};
use taproot_util::descriptor_for;
use tracing::{debug, trace, warn};

use crate::{
    config::RuntimeConfig,
    controller::HookSettings,
    controllers::ControllerManager,
    error::{ConfigError, RegistryError},
    event_listener::ListenerKey,
    event_listeners::EventListenerRegistry,
    registry::{ControllerDefinition, Registry},
    scope::VisibleControllers,
};

/// What a scheduled initialization waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitializationTrigger {
    /// The next tick.
    Microtask,
    /// The first tick after the host leaves [`ReadyState::Loading`].
    ContentLoaded,
}

/// Keeps controllers and action listeners bound to a host document.
///
/// Nothing happens until [`register`](Self::register) schedules an
/// initialization and the embedder calls [`tick`](Self::tick).
pub struct Runtime<D: Document> {
    document: D,
    config: RuntimeConfig,
    registry: Registry,
    controllers: ControllerManager,
    listeners: EventListenerRegistry,
    root_observer: Option<ObserverId>,
    pending: Option<InitializationTrigger>,
    initialized: bool,
}

impl<D: Document> Runtime<D> {
    /// Creates a runtime with the default configuration.
    pub fn new(document: D) -> Self {
        Self::build(document, RuntimeConfig::default())
    }

    /// Creates a runtime with `config`, rejecting it when invalid.
    pub fn with_config(document: D, config: RuntimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(document, config))
    }

    fn build(document: D, config: RuntimeConfig) -> Self {
        let settings = HookSettings {
            controllers_attribute: config.controllers_attribute.clone(),
            catch_panics: config.catch_panics,
        };
        Self {
            document,
            listeners: EventListenerRegistry::new(config.actions_attribute.clone()),
            controllers: ControllerManager::new(settings),
            config,
            registry: Registry::new(),
            root_observer: None,
            pending: None,
            initialized: false,
        }
    }

    /// The host document.
    pub fn document(&self) -> &D {
        &self.document
    }

    /// Mutable access to the host. Mutations are picked up on the next [`tick`](Self::tick).
    pub fn document_mut(&mut self) -> &mut D {
        &mut self.document
    }

    /// The configuration the runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Registered controller definitions by descriptor.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether the first document scan has run.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The trigger a scheduled initialization is waiting for, if any.
    pub fn pending_initialization(&self) -> Option<InitializationTrigger> {
        self.pending
    }

    /// Registers a definition under the descriptor derived from its own name.
    ///
    /// Returns the descriptor. A conflicting descriptor is logged and the
    /// original registration is kept.
    pub fn register(&mut self, definition: ControllerDefinition) -> Result<String, RegistryError> {
        let name = definition.name().to_string();
        let result = self.register_as(&name, Rc::new(definition));
        self.enqueue_initialize();
        result
    }

    /// Registers several definitions, each under the descriptor derived from the paired name.
    ///
    /// Every entry is attempted; the first conflict is returned after all of them ran.
    pub fn register_all<I, N>(&mut self, definitions: I) -> Result<Vec<String>, RegistryError>
    where
        I: IntoIterator<Item = (N, Rc<ControllerDefinition>)>,
        N: AsRef<str>,
    {
        let mut registered = Vec::new();
        let mut first_error = None;
        for (name, definition) in definitions {
            match self.register_as(name.as_ref(), definition) {
                Ok(descriptor) => registered.push(descriptor),
                Err(error) => {
                    if first_error.is_none() {
                        first_error = Some(error);
                    }
                }
            }
        }
        self.enqueue_initialize();

        match first_error {
            Some(error) => Err(error),
            None => Ok(registered),
        }
    }

    fn register_as(&mut self, name: &str, definition: Rc<ControllerDefinition>) -> Result<String, RegistryError> {
        let descriptor = descriptor_for(name);
        self.registry.register(&descriptor, definition)?;
        Ok(descriptor)
    }

    fn enqueue_initialize(&mut self) {
        if self.pending.is_some() {
            return;
        }
        let trigger = if self.document.ready_state() == ReadyState::Loading {
            InitializationTrigger::ContentLoaded
        } else {
            InitializationTrigger::Microtask
        };
        trace!(?trigger, "scheduled initialization");
        self.pending = Some(trigger);
    }

    /// Runs one processing turn.
    pub fn tick(&mut self) {
        if let Some(trigger) = self.pending
            && (trigger == InitializationTrigger::Microtask || self.document.ready_state() != ReadyState::Loading)
        {
            self.pending = None;
            self.initialize();
        }
        self.flush();
    }

    /// Drains queued mutation records until the host reports none.
    pub fn flush(&mut self) {
        for _ in 0..self.config.max_flush_rounds {
            let batches = self.document.take_records();
            if batches.is_empty() {
                return;
            }
            for batch in batches {
                self.process_batch(&batch);
            }
        }
        warn!(
            rounds = self.config.max_flush_rounds,
            "mutation records kept arriving, leaving the rest for the next tick"
        );
    }

    fn initialize(&mut self) {
        let root = self.document.document_element();
        if self.initialized {
            debug!("re-scanning for newly registered controllers");
            for node in self.document.subtree(root) {
                if self.document.has_attribute(node, &self.config.controllers_attribute) {
                    self.reconcile(node);
                }
            }
            return;
        }

        let observer = self.document.create_observer();
        self.document.observe(
            observer,
            root,
            ObserveOptions::subtree([self.config.controllers_attribute.clone(), self.config.actions_attribute.clone()]),
        );
        self.root_observer = Some(observer);
        debug!(root = %root, "initializing");
        self.connect(root);
        self.initialized = true;
    }

    fn process_batch(&mut self, batch: &MutationBatch) {
        if Some(batch.observer) == self.root_observer {
            trace!(records = batch.records.len(), "processing root batch");
            for record in &batch.records {
                self.process_root_record(record);
            }
        } else {
            self.controllers.process_attribute_batch(&mut self.document, batch);
        }
    }

    fn process_root_record(&mut self, record: &MutationRecord) {
        match record {
            MutationRecord::ChildList { added, removed, .. } => {
                for node in added {
                    self.connect(*node);
                }
                for node in removed {
                    self.disconnect(*node);
                }
            }
            // Detached targets are settled by their removal record and by
            // `connect` if they come back.
            MutationRecord::Attributes { target, .. } if !self.document.is_connected(*target) => {}
            MutationRecord::Attributes { target, name, .. } if *name == self.config.controllers_attribute => {
                self.reconcile(*target);
            }
            MutationRecord::Attributes { target, name, .. } if *name == self.config.actions_attribute => {
                self.listeners.update(&mut self.document, *target);
            }
            MutationRecord::Attributes { .. } => {}
        }
    }

    /// Reconciles `node` and rebases the scopes below it when its record was replaced.
    fn reconcile(&mut self, node: NodeId) {
        let previous = self.controllers.binding_of(node);
        self.controllers.update(&mut self.document, &self.registry, node);
        if self.controllers.binding_of(node) != previous {
            self.controllers.rebase(&self.document, node);
        }
    }

    fn connect(&mut self, subtree: NodeId) {
        if !self.document.is_connected(subtree) {
            return;
        }
        let nodes = self.document.subtree(subtree);
        for node in &nodes {
            if self.document.has_attribute(*node, &self.config.controllers_attribute)
                || self.controllers.binding_of(*node).is_some()
            {
                self.controllers.create(&mut self.document, &self.registry, *node);
            }
        }
        for node in &nodes {
            if self.document.has_attribute(*node, &self.config.actions_attribute) || self.listeners.is_tracking(*node) {
                self.listeners.create(&mut self.document, *node);
            }
        }
    }

    fn disconnect(&mut self, subtree: NodeId) {
        if self.document.is_connected(subtree) {
            return;
        }
        let nodes = self.document.subtree(subtree);
        for node in &nodes {
            self.controllers.destroy(&mut self.document, *node);
        }
        for node in &nodes {
            self.listeners.destroy(&mut self.document, *node);
        }
    }

    /// Dispatches `event` at `target` through the host's listener plan.
    ///
    /// Action listeners resolve the controllers visible at the element that
    /// declared them, at the moment they run. Returns the event with its final
    /// propagation and default flags.
    pub fn dispatch(&mut self, target: NodeId, mut event: Event) -> Event {
        let plan = self.document.dispatch_plan(target, event.event_type());
        trace!(target = %target, event_type = %event.event_type(), listeners = plan.len(), "dispatching event");

        for step in &plan {
            if event.is_propagation_stopped() && event.current_target() != Some(step.current_target) {
                break;
            }
            event.enter_step(step);

            let Some((element, handlers)) = self.listeners.handlers(step.listener) else {
                continue;
            };
            self.listeners.release_once(step.listener);
            let visible = self.controllers.resolve_visible(&self.document, element);
            for handler in &handlers {
                if let Some(owner) = visible.get(&handler.descriptor) {
                    self.controllers
                        .perform(&mut self.document, *owner, &handler.descriptor, &handler.method, &mut event);
                }
                if event.is_immediate_propagation_stopped() {
                    break;
                }
            }
            if event.is_immediate_propagation_stopped() {
                break;
            }
        }

        event.finish_dispatch();
        event
    }

    /// Descriptors with a live instance on `node`.
    pub fn descriptors_on(&self, node: NodeId) -> Vec<String> {
        self.controllers.descriptors_on(node)
    }

    /// Controllers an action declared on `node` would currently resolve.
    pub fn visible_controllers(&mut self, node: NodeId) -> VisibleControllers {
        self.controllers.resolve_visible(&self.document, node).as_ref().clone()
    }

    /// Action listener keys currently attached for `node`.
    pub fn action_listeners_on(&self, node: NodeId) -> Vec<ListenerKey> {
        self.listeners.keys_on(node)
    }

    /// Whether action listeners of `node` are attached to `target`.
    pub fn listens_on(&self, node: NodeId, target: ListenerTarget) -> bool {
        self.listeners.keys_on(node).iter().any(|key| key.target == target)
    }
}

impl<D: Document + std::fmt::Debug> std::fmt::Debug for Runtime<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("document", &self.document)
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("pending", &self.pending)
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

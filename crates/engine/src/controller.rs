//! Controller lifecycle protocol.
//!
//! A [`Controller`] is user code bound to one element under one descriptor.
//! The engine calls it through a [`ControllerInstance`], which owns the
//! controller, its memoized capability views, and the single invocation
//! boundary where hook failures are caught and logged.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
};

use anyhow::anyhow;
use indexmap::IndexMap;
use once_cell::unsync::OnceCell;
use serde_json::Value;
use taproot_types::{Document, Event, NodeId};
use tracing::{debug, error};

use crate::{
    data_mediator::DataMediator,
    node_finder::{NodeFinder, NodeSetFinder},
    proxy::ElementProxy,
    registry::ControllerDefinition,
};

/// Result type returned by every controller hook.
pub type HookResult = anyhow::Result<()>;

/// Behavior bound to an element.
///
/// Every hook has a default, so implementations only override what they use.
/// Errors returned from hooks are logged by the engine and never propagate
/// to sibling controllers or to the mutation that triggered the hook.
pub trait Controller: 'static {
    fn connect(&mut self, _cx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    fn disconnect(&mut self, _cx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    /// Called with `{key}Changed` when the attribute backing a hooked data key changes.
    fn changed(&mut self, _hook: &str, _cx: &mut Context<'_>) -> HookResult {
        Ok(())
    }

    /// Called with the camelized method name of a declarative action.
    fn perform(&mut self, action: &str, _event: &mut Event, _cx: &mut Context<'_>) -> HookResult {
        Err(anyhow!("controller has no action named {action:?}"))
    }
}

/// Settings shared by every hook invocation of a runtime.
#[derive(Debug, Clone)]
pub(crate) struct HookSettings {
    pub controllers_attribute: String,
    pub catch_panics: bool,
}

/// Capability views memoized for the lifetime of one instance.
#[derive(Debug, Default)]
pub(crate) struct InstanceViews {
    data: OnceCell<Rc<DataMediator>>,
    nodes: OnceCell<Rc<NodeFinder>>,
    node_sets: OnceCell<Rc<NodeSetFinder>>,
}

/// What a hook can see and touch.
pub struct Context<'a> {
    document: &'a mut dyn Document,
    element: NodeId,
    descriptor: &'a str,
    defaults: &'a Rc<IndexMap<String, Value>>,
    views: &'a InstanceViews,
    controllers_attribute: &'a str,
}

impl<'a> Context<'a> {
    /// The element the controller is bound to.
    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn descriptor(&self) -> &str {
        self.descriptor
    }

    pub fn document(&self) -> &dyn Document {
        &*self.document
    }

    pub fn document_mut(&mut self) -> &mut dyn Document {
        &mut *self.document
    }

    /// Attribute-backed data of the bound element.
    pub fn data(&mut self) -> ElementProxy<'_, DataMediator> {
        let handler = self
            .views
            .data
            .get_or_init(|| Rc::new(DataMediator::new(self.descriptor, Rc::clone(self.defaults))));
        let handler = Rc::clone(handler);
        ElementProxy::new(&mut *self.document, self.element, handler)
    }

    /// Data of another element in this controller's namespace.
    ///
    /// `None` reuses this controller's declared defaults.
    pub fn data_for(&mut self, element: NodeId, defaults: Option<Rc<IndexMap<String, Value>>>) -> ElementProxy<'_, DataMediator> {
        let defaults = defaults.unwrap_or_else(|| Rc::clone(self.defaults));
        let handler = Rc::new(DataMediator::new(self.descriptor, defaults));
        ElementProxy::new(&mut *self.document, element, handler)
    }

    /// Single-node lookup by logical node name.
    pub fn nodes(&mut self) -> ElementProxy<'_, NodeFinder> {
        let handler = self
            .views
            .nodes
            .get_or_init(|| Rc::new(NodeFinder::new(self.descriptor, self.controllers_attribute)));
        let handler = Rc::clone(handler);
        ElementProxy::new(&mut *self.document, self.element, handler)
    }

    /// Node-set lookup by logical node name.
    pub fn node_sets(&mut self) -> ElementProxy<'_, NodeSetFinder> {
        let handler = self
            .views
            .node_sets
            .get_or_init(|| Rc::new(NodeSetFinder::new(self.descriptor, self.controllers_attribute)));
        let handler = Rc::clone(handler);
        ElementProxy::new(&mut *self.document, self.element, handler)
    }
}

/// Runs one hook, logging instead of propagating any failure.
pub(crate) fn invoke<F>(descriptor: &str, hook: &str, catch_panics: bool, call: F)
where
    F: FnOnce() -> HookResult,
{
    let outcome = if catch_panics {
        panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| Err(anyhow!("panicked: {}", panic_message(&*payload))))
    } else {
        call()
    };

    if let Err(error) = outcome {
        error!(descriptor, hook, error = %format!("{error:#}"), "controller hook failed");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// A controller bound to one (element, descriptor) pair.
pub struct ControllerInstance {
    element: NodeId,
    descriptor: String,
    definition: Rc<ControllerDefinition>,
    controller: Box<dyn Controller>,
    views: InstanceViews,
}

impl ControllerInstance {
    pub(crate) fn new(element: NodeId, descriptor: &str, definition: Rc<ControllerDefinition>) -> Self {
        let controller = definition.instantiate();
        Self {
            element,
            descriptor: descriptor.to_string(),
            definition,
            controller,
            views: InstanceViews::default(),
        }
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn definition(&self) -> &Rc<ControllerDefinition> {
        &self.definition
    }

    /// Runs the change hook mapped to `attribute`, if any.
    pub(crate) fn attribute_changed(&mut self, document: &mut dyn Document, settings: &HookSettings, attribute: &str) {
        let table = self.definition.hook_table(&self.descriptor);
        let Some(method) = table.get(attribute) else {
            return;
        };
        self.run(document, settings, method, |controller, cx| controller.changed(method, cx));
    }

    /// Delivers every hooked attribute so defaults reach the controller, then connects.
    pub(crate) fn connect(&mut self, document: &mut dyn Document, settings: &HookSettings) {
        let table = self.definition.hook_table(&self.descriptor);
        for attribute in table.keys() {
            self.attribute_changed(document, settings, attribute);
        }
        debug!(node = %self.element, descriptor = %self.descriptor, "connecting controller");
        self.run(document, settings, "connect", |controller, cx| controller.connect(cx));
    }

    pub(crate) fn disconnect(&mut self, document: &mut dyn Document, settings: &HookSettings) {
        debug!(node = %self.element, descriptor = %self.descriptor, "disconnecting controller");
        self.run(document, settings, "disconnect", |controller, cx| controller.disconnect(cx));
    }

    pub(crate) fn perform(&mut self, document: &mut dyn Document, settings: &HookSettings, action: &str, event: &mut Event) {
        self.run(document, settings, action, |controller, cx| controller.perform(action, event, cx));
    }

    fn run<F>(&mut self, document: &mut dyn Document, settings: &HookSettings, hook: &str, call: F)
    where
        F: FnOnce(&mut dyn Controller, &mut Context<'_>) -> HookResult,
    {
        let Self {
            element,
            descriptor,
            definition,
            controller,
            views,
        } = self;
        let descriptor: &str = descriptor;
        let mut cx = Context {
            document,
            element: *element,
            descriptor,
            defaults: definition.defaults(),
            views,
            controllers_attribute: &settings.controllers_attribute,
        };
        invoke(descriptor, hook, settings.catch_panics, || call(controller.as_mut(), &mut cx));
    }
}

impl std::fmt::Debug for ControllerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerInstance")
            .field("element", &self.element)
            .field("descriptor", &self.descriptor)
            .field("definition", &self.definition.name())
            .finish_non_exhaustive()
    }
}

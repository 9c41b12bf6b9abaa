//! Controller definitions and the descriptor registry.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::Rc,
};

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use taproot_util::{attribute_name_for, camelize};
use tracing::{debug, error};

use crate::{controller::Controller, error::RegistryError};

/// Builds a fresh controller for every (element, descriptor) binding.
pub type ControllerFactory = Box<dyn Fn() -> Box<dyn Controller>>;

/// Attribute name → change-hook method name, in declaration order.
pub type HookTable = IndexMap<String, String>;

/// Everything the engine needs to know about one kind of controller.
///
/// A definition is registration-name agnostic: the same definition can be
/// registered under several descriptors, and each descriptor gets its own
/// memoized hook table because attribute names are namespaced by descriptor.
pub struct ControllerDefinition {
    name: String,
    factory: ControllerFactory,
    defaults: Rc<IndexMap<String, Value>>,
    change_hooks: IndexSet<String>,
    hook_tables: RefCell<HashMap<String, Rc<HookTable>>>,
}

impl ControllerDefinition {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Controller> + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
            defaults: Rc::new(IndexMap::new()),
            change_hooks: IndexSet::new(),
            hook_tables: RefCell::new(HashMap::new()),
        }
    }

    /// Shorthand for controllers that can be built with [`Default`].
    pub fn of<C>(name: impl Into<String>) -> Self
    where
        C: Controller + Default,
    {
        Self::new(name, || Box::new(C::default()))
    }

    /// Declares a data key and the value reads fall back to while its attribute is absent.
    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        Rc::make_mut(&mut self.defaults).insert(key.into(), value.into());
        self.hook_tables.get_mut().clear();
        self
    }

    /// Declares that the controller implements `{key}Changed`.
    ///
    /// The hook only fires for keys that also carry a default.
    pub fn on_change(mut self, key: impl Into<String>) -> Self {
        self.change_hooks.insert(key.into());
        self.hook_tables.get_mut().clear();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn defaults(&self) -> &Rc<IndexMap<String, Value>> {
        &self.defaults
    }

    pub(crate) fn instantiate(&self) -> Box<dyn Controller> {
        (self.factory)()
    }

    /// Watched attribute → hook method for this definition under `descriptor`.
    pub fn hook_table(&self, descriptor: &str) -> Rc<HookTable> {
        if let Some(table) = self.hook_tables.borrow().get(descriptor) {
            return Rc::clone(table);
        }

        let table: HookTable = self
            .defaults
            .keys()
            .filter(|key| self.change_hooks.contains(*key))
            .map(|key| (attribute_name_for(descriptor, key), format!("{}Changed", camelize(key))))
            .collect();
        let table = Rc::new(table);
        self.hook_tables
            .borrow_mut()
            .insert(descriptor.to_string(), Rc::clone(&table));
        table
    }
}

impl fmt::Debug for ControllerDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerDefinition")
            .field("name", &self.name)
            .field("defaults", &self.defaults)
            .field("change_hooks", &self.change_hooks)
            .finish_non_exhaustive()
    }
}

/// Descriptor → definition. The first registration of a descriptor wins.
#[derive(Debug, Default)]
pub struct Registry {
    definitions: IndexMap<String, Rc<ControllerDefinition>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: &str, definition: Rc<ControllerDefinition>) -> Result<(), RegistryError> {
        if descriptor.is_empty() {
            let error = RegistryError::EmptyDescriptor {
                name: definition.name().to_string(),
            };
            error!(error = %error, "rejected controller registration");
            return Err(error);
        }

        if let Some(existing) = self.definitions.get(descriptor) {
            let error = RegistryError::AlreadyRegistered {
                descriptor: descriptor.to_string(),
                existing: existing.name().to_string(),
            };
            error!(descriptor, error = %error, "rejected controller registration");
            return Err(error);
        }

        debug!(descriptor, controller = definition.name(), "registered controller");
        self.definitions.insert(descriptor.to_string(), definition);
        Ok(())
    }

    pub fn lookup(&self, descriptor: &str) -> Option<&Rc<ControllerDefinition>> {
        self.definitions.get(descriptor)
    }

    pub fn contains(&self, descriptor: &str) -> bool {
        self.definitions.contains_key(descriptor)
    }

    /// Registered descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

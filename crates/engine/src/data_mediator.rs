//! Attribute-backed key/value storage namespaced by descriptor.

use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value;
use taproot_types::{Document, NodeId};
use taproot_util::attribute_name_for;

use crate::{
    error::{DataError, ProxyError},
    proxy::{ElementProxy, ElementProxyHandler},
};

/// Reads and writes `data-{descriptor}-{key}` attributes.
///
/// Keys whose default is a string, or that have no default, are stored as
/// raw strings. Every other key is stored as JSON. Writing `None` removes the
/// attribute so reads fall back to the default again.
#[derive(Debug, Clone)]
pub struct DataMediator {
    descriptor: String,
    defaults: Rc<IndexMap<String, Value>>,
}

impl DataMediator {
    pub fn new(descriptor: &str, defaults: Rc<IndexMap<String, Value>>) -> Self {
        Self {
            descriptor: descriptor.to_string(),
            defaults,
        }
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn attribute_for(&self, key: &str) -> String {
        attribute_name_for(&self.descriptor, key)
    }

    fn stores_strings(&self, key: &str) -> bool {
        matches!(self.defaults.get(key), None | Some(Value::String(_)))
    }
}

impl ElementProxyHandler for DataMediator {
    type Output = Option<Value>;
    type Input = Option<Value>;

    fn get(&self, document: &dyn Document, element: NodeId, key: &str) -> Result<Option<Value>, ProxyError> {
        let attribute = self.attribute_for(key);
        let Some(raw) = document.attribute(element, &attribute) else {
            return Ok(self.defaults.get(key).cloned());
        };

        if self.stores_strings(key) {
            return Ok(Some(Value::String(raw)));
        }
        let value = serde_json::from_str(&raw).map_err(|source| DataError::Decode { attribute, source })?;
        Ok(Some(value))
    }

    fn set(&self, document: &mut dyn Document, element: NodeId, key: &str, value: Option<Value>) -> Result<(), ProxyError> {
        let attribute = self.attribute_for(key);
        let Some(value) = value else {
            document.remove_attribute(element, &attribute);
            return Ok(());
        };

        let encoded = match value {
            Value::String(raw) if self.stores_strings(key) => raw,
            other if self.stores_strings(key) => other.to_string(),
            other => serde_json::to_string(&other).map_err(|source| DataError::Encode {
                attribute: attribute.clone(),
                source,
            })?,
        };
        document.set_attribute(element, &attribute, &encoded);
        Ok(())
    }

    fn delete(&self, document: &mut dyn Document, element: NodeId, key: &str) -> Result<(), ProxyError> {
        document.remove_attribute(element, &self.attribute_for(key));
        Ok(())
    }
}

impl ElementProxy<'_, DataMediator> {
    /// Reads `key` as a string, whatever its storage policy.
    pub fn get_string(&self, key: &str) -> Result<Option<String>, ProxyError> {
        Ok(self.get(key)?.map(|value| match value {
            Value::String(text) => text,
            other => other.to_string(),
        }))
    }

    /// Writes `value` under `key`; shorthand for `set(key, Some(value.into()))`.
    pub fn put(&mut self, key: &str, value: impl Into<Value>) -> Result<(), ProxyError> {
        self.set(key, Some(value.into()))
    }
}

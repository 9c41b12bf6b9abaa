//! Element capability proxies.
//!
//! An [`ElementProxy`] pairs an element with a handler that decides what
//! reading, writing, and deleting a key means. Every key is reported as
//! present, enumeration is empty, and deletion always succeeds unless the
//! handler says otherwise.

use std::rc::Rc;

use taproot_types::{Document, NodeId};

use crate::error::ProxyError;

pub trait ElementProxyHandler {
    type Output;
    type Input;

    fn get(&self, document: &dyn Document, element: NodeId, key: &str) -> Result<Self::Output, ProxyError>;

    fn set(&self, _document: &mut dyn Document, _element: NodeId, key: &str, _value: Self::Input) -> Result<(), ProxyError> {
        Err(ProxyError::read_only(key))
    }

    fn has(&self, _document: &dyn Document, _element: NodeId, _key: &str) -> bool {
        true
    }

    fn delete(&self, _document: &mut dyn Document, _element: NodeId, _key: &str) -> Result<(), ProxyError> {
        Ok(())
    }

    fn keys(&self, _document: &dyn Document, _element: NodeId) -> Vec<String> {
        Vec::new()
    }
}

/// Key/value view over one element, backed by a handler.
pub struct ElementProxy<'a, H> {
    document: &'a mut dyn Document,
    element: NodeId,
    handler: Rc<H>,
}

impl<'a, H: ElementProxyHandler> ElementProxy<'a, H> {
    pub fn new(document: &'a mut dyn Document, element: NodeId, handler: Rc<H>) -> Self {
        Self {
            document,
            element,
            handler,
        }
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn get(&self, key: &str) -> Result<H::Output, ProxyError> {
        self.handler.get(&*self.document, self.element, key)
    }

    pub fn set(&mut self, key: &str, value: H::Input) -> Result<(), ProxyError> {
        self.handler.set(&mut *self.document, self.element, key, value)
    }

    pub fn has(&self, key: &str) -> bool {
        self.handler.has(&*self.document, self.element, key)
    }

    pub fn delete(&mut self, key: &str) -> Result<(), ProxyError> {
        self.handler.delete(&mut *self.document, self.element, key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.handler.keys(&*self.document, self.element)
    }
}

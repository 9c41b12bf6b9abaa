//! # Taproot Engine
//!
//! Binds behavior to elements of a live document. Elements name their
//! controllers in one attribute and their action bindings in another; the
//! engine instantiates controllers as elements appear, tears them down as they
//! leave, routes events to controller methods, and exposes attribute-backed
//! data and scoped node lookup to controller code.
//!
//! ## Usage
//!
//! ```rust
//! use taproot_dom::MemoryDocument;
//! use taproot_engine::{Context, Controller, ControllerDefinition, HookResult, Runtime};
//! use taproot_types::{Document, Event};
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! impl Controller for Greeter {
//!     fn changed(&mut self, hook: &str, cx: &mut Context<'_>) -> HookResult {
//!         if hook == "greetingChanged" {
//!             let greeting = cx.data().get_string("greeting")?.unwrap_or_default();
//!             let element = cx.element();
//!             cx.document_mut().set_text_content(element, &greeting);
//!         }
//!         Ok(())
//!     }
//!
//!     fn perform(&mut self, action: &str, _event: &mut Event, cx: &mut Context<'_>) -> HookResult {
//!         match action {
//!             "shout" => Ok(cx.data().put("greeting", "HELLO")?),
//!             other => anyhow::bail!("unknown action {other}"),
//!         }
//!     }
//! }
//!
//! let mut document = MemoryDocument::new();
//! let body = document.body();
//! let nodes = document.append_html(body, r#"<p data-controllers="greeter" data-actions="greeter:shout@click"></p>"#)?;
//!
//! let mut runtime = Runtime::new(document);
//! runtime.register(
//!     ControllerDefinition::of::<Greeter>("GreeterController")
//!         .with_default("greeting", "Hello, World!")
//!         .on_change("greeting"),
//! )?;
//! runtime.tick();
//! assert_eq!(runtime.document().text_content(nodes[0]), "Hello, World!");
//!
//! runtime.dispatch(nodes[0], Event::new("click", nodes[0]));
//! runtime.tick();
//! assert_eq!(runtime.document().text_content(nodes[0]), "HELLO");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`runtime`**: owns the host document, schedules initialization, and
//!   routes mutation batches and dispatched events
//! - **`controllers`** and **`scope`**: per-element instance tables and the
//!   scope chain used to resolve controllers for actions
//! - **`attribute_observer`**: batches data attribute changes into hook calls
//! - **`event_listener`** and **`event_listeners`**: the action grammar and the
//!   native listeners it maps to
//! - **`proxy`**, **`data_mediator`**, **`node_finder`**: capability views
//!   handed to controller code

mod attribute_observer;
pub mod config;
pub mod controller;
mod controllers;
pub mod data_mediator;
pub mod error;
pub mod event_listener;
mod event_listeners;
pub mod node_finder;
pub mod proxy;
pub mod registry;
pub mod runtime;
pub mod scope;

pub use config::RuntimeConfig;
pub use controller::{Context, Controller, ControllerInstance, HookResult};
pub use data_mediator::DataMediator;
pub use error::{ConfigError, DataError, ProxyError, RegistryError};
pub use event_listener::{ActionBinding, Handler, ListenerKey, parse_actions};
pub use node_finder::{NodeFinder, NodeSetFinder};
pub use proxy::{ElementProxy, ElementProxyHandler};
pub use registry::{ControllerDefinition, ControllerFactory, HookTable, Registry};
pub use runtime::{InitializationTrigger, Runtime};
pub use scope::{BindingId, VisibleControllers};

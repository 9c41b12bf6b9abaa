//! Utility functions shared by the Taproot crates.

pub mod naming;
pub mod path_processing;

pub use naming::{attribute_name_for, camelize, dasherize, descriptor_for, tokens};
pub use path_processing::expand_tilde;

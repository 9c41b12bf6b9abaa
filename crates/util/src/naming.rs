//! # Naming Utilities
//!
//! Pure string transforms used to derive attribute names, hook method names,
//! and descriptors from controller names. The only state is a memo of derived
//! attribute names keyed by descriptor and property.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use once_cell::sync::Lazy;
use regex::Regex;

static CAMELIZE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[_-][a-z0-9]").expect("camelize pattern"));

static ATTRIBUTE_NAMES: Lazy<Mutex<HashMap<String, HashMap<String, String>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Converts dashed or underscored names to lower camel case.
///
/// Only a separator followed by a lowercase letter or digit is folded, so
/// existing capitals and trailing separators are left as they are.
///
/// # Example
/// ```rust
/// use taproot_util::camelize;
///
/// assert_eq!(camelize("set-greeting"), "setGreeting");
/// assert_eq!(camelize("greetings_ledger"), "greetingsLedger");
/// assert_eq!(camelize("item-2"), "item2");
/// ```
pub fn camelize(input: &str) -> String {
    CAMELIZE_PATTERN
        .replace_all(input, |captures: &regex::Captures| captures[0][1..].to_uppercase())
        .into_owned()
}

/// Inserts `-` before every interior ASCII capital and lowercases the result.
///
/// # Example
/// ```rust
/// use taproot_util::dasherize;
///
/// assert_eq!(dasherize("greetingsLedger"), "greetings-ledger");
/// assert_eq!(dasherize("IntegrationTestController"), "integration-test-controller");
/// assert_eq!(dasherize("already-dashed"), "already-dashed");
/// ```
pub fn dasherize(input: &str) -> String {
    let mut dashed = String::with_capacity(input.len() + 4);
    for (index, character) in input.chars().enumerate() {
        if index > 0 && character.is_ascii_uppercase() {
            dashed.push('-');
        }
        dashed.push(character);
    }
    dashed.to_lowercase()
}

/// Derives the registration descriptor for a controller name.
///
/// The name is dasherized and a trailing `-controller` suffix is stripped.
///
/// # Example
/// ```rust
/// use taproot_util::descriptor_for;
///
/// assert_eq!(descriptor_for("GreeterController"), "greeter");
/// assert_eq!(descriptor_for("integration-test-2"), "integration-test-2");
/// ```
pub fn descriptor_for(name: &str) -> String {
    let dashed = dasherize(name);
    match dashed.strip_suffix("-controller") {
        Some(stripped) => stripped.to_string(),
        None => dashed,
    }
}

/// Name of the attribute backing `property` in the `descriptor` namespace.
///
/// An empty descriptor is the base namespace and yields `data-{property}`.
/// Results are memoized per descriptor and property.
///
/// # Example
/// ```rust
/// use taproot_util::attribute_name_for;
///
/// assert_eq!(attribute_name_for("greeter", "greetingsLedger"), "data-greeter-greetings-ledger");
/// assert_eq!(attribute_name_for("", "greeting"), "data-greeting");
/// ```
pub fn attribute_name_for(descriptor: &str, property: &str) -> String {
    let mut memo = ATTRIBUTE_NAMES.lock().unwrap_or_else(PoisonError::into_inner);
    let names = memo.entry(descriptor.to_string()).or_default();
    if let Some(name) = names.get(property) {
        return name.clone();
    }

    let separator = if descriptor.is_empty() { "" } else { "-" };
    let name = format!("data-{}{}{}", descriptor, separator, dasherize(property));
    names.insert(property.to_string(), name.clone());
    name
}

/// Splits an attribute value into its whitespace-separated tokens.
pub fn tokens(value: &str) -> Vec<&str> {
    value.split_whitespace().collect()
}

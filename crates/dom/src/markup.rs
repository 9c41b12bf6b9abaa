//! Minimal markup fragment parser.
//!
//! Supports elements with quoted, unquoted, or bare attributes, self-closing
//! tags, a handful of void elements, and text. Comments, entities, and raw
//! text elements are not supported.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static OPEN_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<([A-Za-z][\w-]*)((?:\s+[^\s=/>"']+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?)*)\s*(/?)>"#).expect("open tag pattern")
});

static CLOSE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"^</([A-Za-z][\w-]*)\s*>").expect("close tag pattern"));

static ATTRIBUTE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([^\s=/>"']+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#).expect("attribute pattern"));

const VOID_ELEMENTS: &[&str] = &["area", "br", "hr", "img", "input", "link", "meta"];

/// An element parsed from markup, before it is materialized in a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupNode {
    pub tag: String,
    pub attributes: IndexMap<String, String>,
    pub text: String,
    pub children: Vec<MarkupNode>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkupError {
    #[error("Malformed tag at byte {offset}")]
    MalformedTag { offset: usize },

    #[error("Unexpected closing tag </{tag}> at byte {offset}")]
    UnexpectedClose { tag: String, offset: usize },

    #[error("Unclosed element <{tag}>")]
    Unclosed { tag: String },

    #[error("Text outside of any element at byte {offset}")]
    StrayText { offset: usize },
}

/// Parses a markup fragment into its top-level elements.
///
/// # Example
/// ```rust
/// use taproot_dom::parse_fragment;
///
/// let nodes = parse_fragment(r#"<div data-controllers="greeter"><p data-greeter-greetable></p></div>"#)?;
/// assert_eq!(nodes.len(), 1);
/// assert_eq!(nodes[0].attributes["data-controllers"], "greeter");
/// assert_eq!(nodes[0].children[0].attributes["data-greeter-greetable"], "");
/// # Ok::<(), taproot_dom::MarkupError>(())
/// ```
pub fn parse_fragment(markup: &str) -> Result<Vec<MarkupNode>, MarkupError> {
    let mut roots = Vec::new();
    let mut open: Vec<MarkupNode> = Vec::new();
    let mut offset = 0;

    while offset < markup.len() {
        let rest = &markup[offset..];

        if rest.starts_with("</") {
            let captures = CLOSE_TAG.captures(rest).ok_or(MarkupError::MalformedTag { offset })?;
            let tag = captures[1].to_ascii_lowercase();
            let element = match open.pop() {
                Some(element) if element.tag == tag => element,
                _ => return Err(MarkupError::UnexpectedClose { tag, offset }),
            };
            attach(&mut open, &mut roots, element);
            offset += captures[0].len();
        } else if rest.starts_with('<') {
            let captures = OPEN_TAG.captures(rest).ok_or(MarkupError::MalformedTag { offset })?;
            let tag = captures[1].to_ascii_lowercase();
            let attributes = parse_attributes(captures.get(2).map_or("", |m| m.as_str()));
            let self_closing = !captures[3].is_empty() || VOID_ELEMENTS.contains(&tag.as_str());
            let element = MarkupNode {
                tag,
                attributes,
                ..MarkupNode::default()
            };
            if self_closing {
                attach(&mut open, &mut roots, element);
            } else {
                open.push(element);
            }
            offset += captures[0].len();
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            let text = rest[..end].trim();
            if !text.is_empty() {
                let parent = open.last_mut().ok_or(MarkupError::StrayText { offset })?;
                parent.text.push_str(text);
            }
            offset += end;
        }
    }

    if let Some(element) = open.pop() {
        return Err(MarkupError::Unclosed { tag: element.tag });
    }
    Ok(roots)
}

fn attach(open: &mut [MarkupNode], roots: &mut Vec<MarkupNode>, element: MarkupNode) {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None => roots.push(element),
    }
}

fn parse_attributes(source: &str) -> IndexMap<String, String> {
    ATTRIBUTE
        .captures_iter(source)
        .map(|captures| {
            let value = captures
                .get(2)
                .or_else(|| captures.get(3))
                .or_else(|| captures.get(4))
                .map_or("", |m| m.as_str());
            (captures[1].to_ascii_lowercase(), value.to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_with_all_attribute_forms() {
        let nodes = parse_fragment(
            r#"<div data-controllers="a b" data-bare data-single='x y' data-unquoted=z>
                 <button data-actions="a:go@click">Go</button>
                 <br>
               </div>"#,
        )
        .expect("parse fragment");

        let root = &nodes[0];
        assert_eq!(root.attributes["data-controllers"], "a b");
        assert_eq!(root.attributes["data-bare"], "");
        assert_eq!(root.attributes["data-single"], "x y");
        assert_eq!(root.attributes["data-unquoted"], "z");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].text, "Go");
        assert_eq!(root.children[1].tag, "br");
    }

    #[test]
    fn self_closing_elements_do_not_swallow_siblings() {
        let nodes = parse_fragment(r#"<div /><p></p>"#).expect("parse fragment");
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].children.is_empty());
    }

    #[test]
    fn reports_mismatched_and_unclosed_tags() {
        assert_eq!(
            parse_fragment("<div></p>"),
            Err(MarkupError::UnexpectedClose {
                tag: "p".into(),
                offset: 5
            })
        );
        assert_eq!(parse_fragment("<div>"), Err(MarkupError::Unclosed { tag: "div".into() }));
        assert_eq!(parse_fragment("hello"), Err(MarkupError::StrayText { offset: 0 }));
    }
}

//! Textual UI descriptions for the language model.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

use super::compress::CompactNode;

static UUID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("valid UUID pattern")
});

/// Identifiers with this prefix are kept even when they embed a UUID;
/// app switcher cards are recognized by it.
pub const STABLE_IDENTIFIER_PREFIX: &str = "card";

const INDENT: &str = "  ";

/// Whether the text contains a generated UUID anywhere.
pub fn contains_uuid(text: &str) -> bool {
    UUID_PATTERN.is_match(text)
}

/// Render a compact tree as an indented block, one element per line.
///
/// ```text
/// Application, id: 3, label: "Settings"
///   Button, id: 0, label: "Wi-Fi", value: "1"
///   Button, id: 1, label: "Bluetooth", disabled
///   Text, id: 2, label: "General"
/// ```
pub fn render(node: &CompactNode<'_>) -> String {
    let mut out = String::new();
    render_into(node, 0, &mut out);
    out
}

fn render_into(node: &CompactNode<'_>, depth: usize, out: &mut String) {
    if !out.is_empty() {
        out.push('\n');
    }
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push_str(&describe_line(node));

    for child in &node.children {
        render_into(child, depth + 1, out);
    }
}

/// The single line describing one node, without its children.
pub fn describe_line(node: &CompactNode<'_>) -> String {
    let attributes = node.attributes;
    let mut line = format!("{}, id: {}", attributes.kind.description_label(), node.number);

    if let Some(id) = attributes.identifier() {
        if !contains_uuid(id) || id.starts_with(STABLE_IDENTIFIER_PREFIX) {
            let _ = write!(line, ", name: \"{}\"", id);
        }
    }
    if let Some(label) = attributes.label() {
        if !contains_uuid(label) {
            let _ = write!(line, ", label: \"{}\"", label);
        }
    }
    if let Some(value) = &attributes.value {
        let _ = write!(line, ", value: \"{}\"", value);
    }
    if !attributes.enabled {
        line.push_str(", disabled");
    }
    if attributes.selected {
        line.push_str(", selected");
    }
    line
}

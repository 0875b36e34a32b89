//! Report Renderer
//!
//! Flattens a [`ShapeTree`] into an indented outline, one line per node:
//!
//! ```text
//! - dblp required
//!  - article multiple [Attrs=key|required, mdate|required, publtype]
//!   - author multiple
//!   - year required [Texts=['2019', '2020']]
//! ```

use crate::shape::{AttributeObservation, NodeId, ShapeNode, ShapeTree};

/// How often a node shows up compared with its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    /// Same occurrence count as the parent
    Required,
    /// More occurrences than the parent
    Multiple,
    /// Below the rarity threshold
    Rarely,
    Sometimes,
}

impl Frequency {
    pub fn suffix(self) -> &'static str {
        match self {
            Frequency::Required => " required",
            Frequency::Multiple => " multiple",
            Frequency::Rarely => " rarely",
            Frequency::Sometimes => "",
        }
    }
}

/// Renders the outline report of a tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReportRenderer {
    rarely_threshold: f64,
}

impl Default for ReportRenderer {
    fn default() -> Self {
        Self {
            rarely_threshold: 0.05,
        }
    }
}

impl ReportRenderer {
    pub fn new(rarely_threshold: f64) -> Self {
        Self { rarely_threshold }
    }

    pub fn rarely_threshold(&self) -> f64 {
        self.rarely_threshold
    }

    /// Classify `node` against its parent. The root has no frequency.
    pub fn frequency(&self, tree: &ShapeTree, node: &ShapeNode) -> Option<Frequency> {
        let parent = tree.node(node.parent?);
        let frequency = if node.occurrences == parent.occurrences {
            Frequency::Required
        } else if node.occurrences > parent.occurrences {
            Frequency::Multiple
        } else if (node.occurrences as f64) / (parent.occurrences as f64) < self.rarely_threshold
        {
            Frequency::Rarely
        } else {
            Frequency::Sometimes
        };
        Some(frequency)
    }

    /// Render the whole document, starting at the document element.
    /// An empty tree renders no lines.
    pub fn render(&self, tree: &ShapeTree) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(element) = tree.document_element() {
            self.render_node(tree, element, 0, &mut lines);
        }
        lines
    }

    /// Render `id` and its descendants, `id` indented by `depth` spaces
    pub fn render_node(&self, tree: &ShapeTree, id: NodeId, depth: usize, lines: &mut Vec<String>) {
        let node = tree.node(id);
        let suffix = self.frequency(tree, node).map_or("", Frequency::suffix);
        let description = describe(node);
        let indent = " ".repeat(depth);

        if description.is_empty() {
            lines.push(format!("{}- {}{}", indent, node.tag, suffix));
        } else {
            lines.push(format!("{}- {}{} [{}]", indent, node.tag, suffix, description));
        }

        for &child in node.children() {
            self.render_node(tree, child, depth + 1, lines);
        }
    }
}

fn describe(node: &ShapeNode) -> String {
    let mut parts = Vec::new();
    if !node.attributes().is_empty() {
        let attrs: Vec<String> = node.attributes().iter().map(describe_attribute).collect();
        parts.push(format!("Attrs={}", attrs.join(", ")));
    }
    if !node.texts.is_empty() {
        parts.push(format!("Texts={}", quote_list(node.texts.values())));
    }
    parts.join("; ")
}

/// Bracketed list of quoted strings: `['a', "it's"]`
fn quote_list(values: &[String]) -> String {
    let quoted: Vec<String> = values.iter().map(|v| quote(v)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Single quotes unless the value holds a single quote and no double quote
fn quote(value: &str) -> String {
    let delimiter = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(value.len() + 2);
    out.push(delimiter);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() && (c as u32) < 0x100 => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

fn describe_attribute(attribute: &AttributeObservation) -> String {
    let mut out = attribute.name.clone();
    if attribute.required {
        out.push_str("|required");
    }
    if !attribute.values.is_empty() {
        out.push_str(&format!("|enum[{}]", attribute.values.values().join("; ")));
    }
    out
}

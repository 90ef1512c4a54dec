//! Static view of a parsed document: the node list handed to the page
//! harness plus what can be read without running scripts.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Node};
use serde::Serialize;

/// A child slot of an element: a text run or another element (by index)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DomChild {
    Text(String),
    El(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomNode {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<DomChild>,
    pub parent: Option<usize>,
}

/// Inline script found in the document
#[derive(Debug, Clone, PartialEq)]
pub struct InlineScript {
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Elements in document order; index 0 is the root element
    pub nodes: Vec<DomNode>,
    pub title: String,
    pub styles: Vec<String>,
    pub scripts: Vec<InlineScript>,
    /// `<script src>` references that were not loaded
    pub external_scripts: Vec<String>,
}

impl ParsedDocument {
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let nodes = collect_nodes(document.root_element());

        let mut title = String::new();
        let mut styles = Vec::new();
        let mut scripts = Vec::new();
        let mut external_scripts = Vec::new();
        for (idx, node) in nodes.iter().enumerate() {
            match node.tag.as_str() {
                "title" if title.is_empty() => title = collapse_whitespace(&raw_text(&nodes, idx)),
                "style" => styles.push(raw_text(&nodes, idx)),
                "script" => {
                    if let Some(src) = attr(node, "src") {
                        external_scripts.push(src.to_string());
                    } else if is_javascript(attr(node, "type")) {
                        scripts.push(InlineScript {
                            code: raw_text(&nodes, idx),
                        });
                    }
                }
                _ => {}
            }
        }

        Self {
            nodes,
            title,
            styles,
            scripts,
            external_scripts,
        }
    }

    /// Index of the `<body>` element, if any
    pub fn body(&self) -> Option<usize> {
        self.nodes.iter().position(|n| n.tag == "body")
    }

    /// Visible body text with whitespace collapsed
    pub fn body_text(&self) -> String {
        match self.body() {
            Some(idx) => collapse_whitespace(&rendered_text(&self.nodes, idx)),
            None => String::new(),
        }
    }

    pub fn nodes_json(&self) -> String {
        serde_json::to_string(&self.nodes).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Node list for a markup fragment (used for `innerHTML` assignment).
/// Index 0 is the synthetic root wrapping the fragment's top-level nodes.
pub fn fragment_json(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let nodes = collect_nodes(fragment.root_element());
    serde_json::to_string(&nodes).unwrap_or_else(|_| "[]".to_string())
}

fn collect_nodes(root: ElementRef<'_>) -> Vec<DomNode> {
    let mut index = HashMap::new();
    let mut nodes = Vec::new();
    for n in root.descendants() {
        if let Some(el) = ElementRef::wrap(n) {
            index.insert(n.id(), nodes.len());
            nodes.push(DomNode {
                tag: el.value().name().to_string(),
                attrs: el
                    .value()
                    .attrs()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                children: Vec::new(),
                parent: None,
            });
        }
    }

    for n in root.descendants() {
        let Some(&idx) = index.get(&n.id()) else {
            continue;
        };
        for child in n.children() {
            match child.value() {
                Node::Text(text) => {
                    let s: &str = text;
                    nodes[idx].children.push(DomChild::Text(s.to_string()));
                }
                Node::Element(_) => {
                    if let Some(&ci) = index.get(&child.id()) {
                        nodes[ci].parent = Some(idx);
                        nodes[idx].children.push(DomChild::El(ci));
                    }
                }
                _ => {}
            }
        }
    }
    nodes
}

fn attr<'a>(node: &'a DomNode, name: &str) -> Option<&'a str> {
    node.attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn is_javascript(ty: Option<&str>) -> bool {
    match ty.map(|t| t.trim().to_ascii_lowercase()) {
        None => true,
        Some(t) => matches!(
            t.as_str(),
            "" | "text/javascript" | "application/javascript" | "module"
        ),
    }
}

/// All text under `idx` (what `textContent` reports)
fn raw_text(nodes: &[DomNode], idx: usize) -> String {
    let mut out = String::new();
    collect_text(nodes, idx, &mut out, false);
    out
}

/// Text a reader would see: skips script and style content
fn rendered_text(nodes: &[DomNode], idx: usize) -> String {
    let mut out = String::new();
    collect_text(nodes, idx, &mut out, true);
    out
}

fn collect_text(nodes: &[DomNode], idx: usize, out: &mut String, rendered: bool) {
    for child in &nodes[idx].children {
        match child {
            DomChild::Text(t) => out.push_str(t),
            DomChild::El(ci) => {
                if rendered && matches!(nodes[*ci].tag.as_str(), "script" | "style" | "template") {
                    continue;
                }
                collect_text(nodes, *ci, out, rendered);
            }
        }
    }
}

pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

//! HTML5 Parser implementation
//!
//! Uses html5ever's RcDom and converts it to our arena format. Template
//! contents, which html5ever keeps in a separate fragment, become the
//! children of the `<template>` element.

use crate::ParseError;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use mida_dom::{Document, DomTree, NodeId};

/// HTML5 parser
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a document URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;

        let mut document = Document::empty(url);
        {
            let tree = document.tree_mut();
            tree.set_recording(false);
            self.convert_node(&dom.document, tree, NodeId::ROOT);
            tree.set_recording(true);
        }
        document.finalize();

        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Convert an RcDom node (and its subtree) under `parent`
    fn convert_node(&self, handle: &Handle, tree: &mut DomTree, parent: NodeId) {
        match &handle.data {
            RcNodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, parent);
                }
            }
            RcNodeData::Doctype { name, .. } => {
                let id = tree.create_doctype(&name.to_string());
                attach(tree, parent, id);
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                if !text.trim().is_empty() {
                    let id = tree.create_text(&text);
                    attach(tree, parent, id);
                }
            }
            RcNodeData::Comment { contents } => {
                let id = tree.create_comment(&contents.to_string());
                attach(tree, parent, id);
            }
            RcNodeData::Element { name, attrs, template_contents, .. } => {
                let id = tree.create_element(name.local.as_ref());
                for attr in attrs.borrow().iter() {
                    // The element was just created, so it exists and is an element.
                    let _ = tree.set_attr(id, attr.name.local.as_ref(), &attr.value.to_string());
                }
                attach(tree, parent, id);

                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, id);
                }
                if let Some(contents) = template_contents.borrow().as_ref() {
                    for child in contents.children.borrow().iter() {
                        self.convert_node(child, tree, id);
                    }
                }
            }
            RcNodeData::ProcessingInstruction { .. } => {}
        }
    }
}

fn attach(tree: &mut DomTree, parent: NodeId, child: NodeId) {
    if let Err(err) = tree.append_child(parent, child) {
        tracing::warn!("dropping node during conversion: {}", err);
    }
}

//! Template instantiation

use crate::bind::Writer;
use crate::config::Config;
use crate::error::RenderError;
use crate::source::Source;
use crate::vocab;
use mida_dom::{Document, DomTree, NodeId, template};
use serde_json::Value as Json;

/// A fragment to instantiate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    node: NodeId,
    root: NodeId,
    types: Vec<String>,
}

impl Template {
    /// A `<template>` element (its first element child is cloned) or any
    /// other element (cloned as a whole)
    pub fn from_node(tree: &DomTree, node: NodeId) -> Result<Self, RenderError> {
        if tree.element(node).is_none() {
            return Err(RenderError::NotAnElement(node));
        }
        let root = if template::is_template(tree, node) {
            template::template_root(tree, node).ok_or(RenderError::EmptyTemplate(node))?
        } else {
            node
        };
        let types = tree.attr(root, vocab::ITEMTYPE)
            .map(|t| t.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        Ok(Self { node, root, types })
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Element that gets cloned
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Type URLs declared on the root
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Whether the template renders items of `type_url`
    pub fn renders_type(&self, type_url: &str) -> bool {
        self.types.iter().any(|t| t == type_url)
    }
}

/// Clone and bind a template; the result is detached
pub fn render(
    doc: &mut Document,
    source: &Source<'_>,
    template: &Template,
    config: &Config,
) -> Result<NodeId, RenderError> {
    let data = Json::Object(source.to_object(config));
    render_data(doc.tree_mut(), &data, template, config)
}

/// Clone and bind a template against already normalized data
pub fn render_data(
    tree: &mut DomTree,
    data: &Json,
    template: &Template,
    config: &Config,
) -> Result<NodeId, RenderError> {
    let clone = tree.clone_subtree(template.root)?;
    Writer::for_templates(config).bind_scope(tree, clone, data)?;
    Ok(clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_binds_clone() {
        let mut doc = mida_html::parse(r#"
            <template id="t">
              <article itemscope itemtype="https://schema.org/Person" title="{{name}}">
                <h1 itemprop="name"></h1>
                <span itemprop="role[]"></span>
              </article>
            </template>
        "#).unwrap();
        let node = doc.get_element_by_id("t").unwrap();
        let template = Template::from_node(doc.tree(), node).unwrap();
        assert!(template.renders_type("https://schema.org/Person"));

        let data = json!({"name": "Ada", "role": ["editor", "writer"]});
        let config = Config::default();
        let out = render(&mut doc, &Source::Object(&data), &template, &config).unwrap();

        let tree = doc.tree();
        assert!(!tree.is_connected(out));
        assert_eq!(tree.attr(out, "title"), Some("Ada"));
        let roles: Vec<String> = tree.descendants(out)
            .filter(|&n| tree.attr(n, "itemprop") == Some("role"))
            .map(|n| tree.text_content(n))
            .collect();
        assert_eq!(roles, vec!["editor", "writer"]);
        // The template itself is untouched.
        assert!(
            tree.descendants(template.root())
                .any(|n| tree.attr(n, "itemprop") == Some("role[]"))
        );
    }

    #[test]
    fn test_empty_template_rejected() {
        let doc = mida_html::parse(r#"<template id="t"></template><p id="p">x</p>"#).unwrap();
        let t = doc.get_element_by_id("t").unwrap();
        assert_eq!(Template::from_node(doc.tree(), t), Err(RenderError::EmptyTemplate(t)));

        let p = doc.get_element_by_id("p").unwrap();
        let text = doc.tree().children(p).next().unwrap().0;
        assert_eq!(Template::from_node(doc.tree(), text), Err(RenderError::NotAnElement(text)));
    }
}

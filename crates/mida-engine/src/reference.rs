//! Referenced item fetching
//!
//! An item carrying only an `itemid` is a reference to its canonical
//! location. Fetching resolves the id against the document base, loads the
//! target document when it is another one, and binds the first item found
//! at the fragment into the referencing element.

use crate::bind::Writer;
use crate::builder::Builder;
use crate::config::Config;
use crate::error::FetchError;
use crate::item::Item;
use crate::scope::Scope;
use crate::vocab;
use mida_dom::{Document, NodeId};
use url::Url;

/// Where a reference points
#[derive(Debug, Clone, PartialEq)]
struct Target {
    document: Url,
    fragment: String,
    same_document: bool,
}

fn target(doc: &Document, node: NodeId) -> Result<Target, FetchError> {
    let tree = doc.tree();
    if !vocab::is_scope(tree, node) {
        return Err(FetchError::NotAnItem(node));
    }
    let raw = match tree.attr(node, vocab::ITEMID).map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => id.to_string(),
        None if vocab::is_authoritative(tree, node) => {
            vocab::identity(tree, node, doc.base_url()).ok_or(FetchError::MissingItemId)?
        }
        None => return Err(FetchError::MissingItemId),
    };

    let mut url = vocab::resolve_url(doc.base_url(), &raw)
        .ok_or_else(|| FetchError::InvalidItemId(raw.clone()))?;
    let fragment = url.fragment()
        .filter(|f| !f.is_empty())
        .ok_or_else(|| FetchError::MissingFragment(raw.clone()))?
        .to_string();
    url.set_fragment(None);

    let same_document = Url::parse(doc.base_url())
        .map(|mut base| {
            base.set_fragment(None);
            base == url
        })
        .unwrap_or(false);
    Ok(Target { document: url, fragment, same_document })
}

/// Items at a fragment: the element itself when it is an item, otherwise
/// the top-level items inside it
fn items_at(doc: &Document, fragment: &str, config: &Config) -> Option<Vec<Item>> {
    let element = doc.get_element_by_id(fragment)?;
    let tree = doc.tree();
    let mut builder = Builder::new(doc, config);
    if vocab::is_scope(tree, element) {
        return Some(vec![builder.build(element)]);
    }
    let items = tree.descendants(element)
        .filter(|&n| {
            vocab::is_scope(tree, n) && !vocab::is_property(tree, n) && vocab::is_live(tree, n)
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|n| builder.build(n))
        .collect();
    Some(items)
}

impl Scope {
    /// Fetch the canonical data of a referenced item
    ///
    /// Returns every item found at the target; the first one is bound into
    /// `node`. No document borrow is held across the fetch.
    pub async fn fetch_reference(&self, node: NodeId) -> Result<Vec<Item>, FetchError> {
        let target = target(&self.document.borrow(), node)?;
        let url = target.document.to_string();
        let not_found = || FetchError::FragmentNotFound {
            url: url.clone(),
            fragment: target.fragment.clone(),
        };

        let items = if target.same_document {
            tracing::trace!(%node, fragment = %target.fragment, "resolving reference in document");
            items_at(&self.document.borrow(), &target.fragment, &self.config).ok_or_else(not_found)?
        } else {
            tracing::debug!(%node, url = %url, "fetching referenced item");
            let response = self.fetcher
                .fetch(&url)
                .await
                .map_err(|source| FetchError::Net { url: url.clone(), source })?;
            if !response.is_success() {
                return Err(FetchError::Http { url: url.clone(), status: response.status });
            }
            let body = response
                .text()
                .map_err(|e| FetchError::Parse { url: url.clone(), message: e.to_string() })?;
            let remote = mida_html::HtmlParser::new()
                .parse_with_url(&body, &url)
                .map_err(|e| FetchError::Parse { url: url.clone(), message: e.to_string() })?;
            items_at(&remote, &target.fragment, &self.config).ok_or_else(not_found)?
        };

        if let Some(first) = items.first() {
            let data = first.to_json();
            let mut doc = self.document.borrow_mut();
            Writer::new(&self.config).bind_scope(doc.tree_mut(), node, &data)?;
        }
        Ok(items)
    }
}

use std::collections::{BTreeMap, BTreeSet};

use select::document::Document;
use select::node::Node;
use select::predicate::Attr;
use serde::Serialize;
use tracing::debug;
use url::Url;

use crate::error::ExportError;
use crate::files::FileManager;

/// Marker attribute carrying a collection identifier, present on collection
/// list containers (and sometimes on the items themselves).
const COLLECTION_ATTR: &str = "data-wf-collection";

/// Marker attribute carrying the slug of one CMS item instance.
const ITEM_SLUG_ATTR: &str = "data-wf-item-slug";

/// One observed CMS item: the page it was seen on plus its slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionItem {
    pub url: String,
    pub slug: String,
}

/// Accumulated CMS observations across the crawl: collection identifier to
/// the items seen under it, and to the pages it was seen on.
#[derive(Debug, Default)]
pub struct CollectionRecords {
    items: BTreeMap<String, Vec<CollectionItem>>,
    pages: BTreeMap<String, Vec<String>>,
}

impl CollectionRecords {
    /// Scans a rendered document for collection markers, recording each item
    /// slug against its nearest enclosing collection identifier.
    pub fn scan(&mut self, html: &str, source_url: &Url) {
        let doc = Document::from(html);
        let page = source_url.to_string();

        for node in doc.find(Attr(ITEM_SLUG_ATTR, ())) {
            let Some(slug) = node.attr(ITEM_SLUG_ATTR) else { continue };
            if slug.is_empty() {
                continue;
            }
            let Some(collection) = enclosing_collection(node) else {
                debug!(slug, page = %page, "item slug without an enclosing collection");
                continue;
            };

            let items = self.items.entry(collection.clone()).or_default();
            let item = CollectionItem {
                url: page.clone(),
                slug: slug.to_string(),
            };
            if !items.contains(&item) {
                debug!(collection = %collection, slug, page = %page, "recorded CMS item");
                items.push(item);
            }
            self.record_page(&collection, &page);
        }

        // Containers without item slugs still associate the page with the
        // collection for the side artifact.
        for node in doc.find(Attr(COLLECTION_ATTR, ())) {
            if let Some(collection) = node.attr(COLLECTION_ATTR) {
                if !collection.is_empty() {
                    self.record_page(collection, &page);
                }
            }
        }
    }

    fn record_page(&mut self, collection: &str, page: &str) {
        let pages = self.pages.entry(collection.to_string()).or_default();
        if !pages.iter().any(|p| p == page) {
            pages.push(page.to_string());
        }
    }

    /// Synthesizes sibling item URLs: for each recorded item whose page path
    /// ends in `/<slug>`, every other slug in the same collection is
    /// substituted into that trailing segment. Items with multi-segment
    /// slugs, or observed on pages that do not end in their slug, cannot be
    /// expanded this way and are skipped.
    ///
    /// The result is a set: expanding twice yields the same URLs once.
    pub fn expand(&self, origin: &Url) -> Vec<Url> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();

        for items in self.items.values() {
            let slugs: BTreeSet<&str> = items.iter().map(|i| i.slug.as_str()).collect();
            for item in items {
                if item.slug.contains('/') {
                    debug!(slug = %item.slug, "multi-segment slug, skipping expansion");
                    continue;
                }
                let Ok(url) = Url::parse(&item.url) else { continue };
                let path = url.path();
                let suffix = format!("/{}", item.slug);
                let Some(collection_path) = path.strip_suffix(suffix.as_str()) else {
                    debug!(slug = %item.slug, path, "page path does not end in slug, skipping");
                    continue;
                };
                for other in &slugs {
                    if *other == item.slug {
                        continue;
                    }
                    let sibling = format!("{}/{}", collection_path, other);
                    if seen.insert(sibling.clone()) {
                        if let Ok(u) = origin.join(&sibling) {
                            out.push(u);
                        }
                    }
                }
            }
        }

        out
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.pages.is_empty()
    }

    pub fn collection_count(&self) -> usize {
        self.pages.len()
    }

    /// Persists the collection records and page associations as JSON side
    /// artifacts under the output root.
    pub fn write_artifacts(&self, files: &FileManager) -> Result<(), ExportError> {
        if !self.items.is_empty() {
            let json = serde_json::to_vec_pretty(&self.items).expect("serializable records");
            files.write("cms_collections.json", &json)?;
        }
        if !self.pages.is_empty() {
            let json = serde_json::to_vec_pretty(&self.pages).expect("serializable records");
            files.write("cms_pages.json", &json)?;
        }
        Ok(())
    }
}

fn enclosing_collection(node: Node) -> Option<String> {
    let mut current = Some(node);
    while let Some(n) = current {
        if let Some(id) = n.attr(COLLECTION_ATTR) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
        current = n.parent();
    }
    None
}

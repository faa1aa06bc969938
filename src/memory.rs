//! In-memory reference implementations of the collaborator stores.
//!
//! These back the integration tests and let embedders run the full
//! resolution path without a real backend. Visibility here is a simple
//! allow-list per page: a page inserted without one is public.

use std::collections::HashMap;

use crate::error::Error;
use crate::store::{AttachmentFilter, AttachmentStore, IdentityStore, PageStore, PageQuery};
use crate::types::{Attachment, Page, PageId, UserRef, Viewer};

/// Page store over an insertion-ordered vector.
#[derive(Debug, Default)]
pub struct MemoryPageStore {
    entries: Vec<MemoryPage>,
}

#[derive(Debug)]
struct MemoryPage {
    /// Viewer ids allowed to read; `None` means public.
    allowed: Option<Vec<String>>,
    page: Page,
}

impl MemoryPageStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a page readable by everyone.
    pub fn insert(&mut self, page: Page) {
        self.entries.push(MemoryPage { allowed: None, page });
    }

    /// Insert a page readable only by the listed viewer ids.
    pub fn insert_restricted(&mut self, page: Page, allowed: &[&str]) {
        self.entries.push(MemoryPage {
            allowed: Some(allowed.iter().map(|s| (*s).to_string()).collect()),
            page,
        });
    }

    fn can_view(&self, page: &Page, viewer: &Viewer) -> bool {
        let Some(entry) = self.entries.iter().find(|e| e.page.id == page.id) else {
            return false;
        };
        return match &entry.allowed {
            None => true,
            Some(allowed) => allowed.iter().any(|id| id == &viewer.id),
        };
    }

    fn query_admits(&self, entry: &MemoryPage, query: &PageQuery) -> bool {
        let page = &entry.page;

        if let Some(path) = query.exact_path_filter() {
            if page.path != path {
                return false;
            }
        }
        if let Some(prefix) = query.prefix_filter() {
            if !is_descendant_or_self(&page.path, prefix) {
                return false;
            }
        }
        if query.trash_excluded() && page.trashed {
            return false;
        }
        if query.redirects_excluded() && page.redirect {
            return false;
        }
        if let Some(pattern) = query.path_pattern_filter() {
            if !pattern.is_match(&page.path) {
                return false;
            }
        }
        if let Some(viewer) = query.viewer_filter() {
            if !self.can_view(page, viewer) {
                return false;
            }
        }
        true
    }
}

/// Whether `path` is `prefix` itself or lies below it on a `/` boundary.
fn is_descendant_or_self(path: &str, prefix: &str) -> bool {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        // Root prefix admits the whole tree.
        return true;
    }
    path == trimmed || path.strip_prefix(trimmed).is_some_and(|rest| rest.starts_with('/'))
}

impl PageStore for MemoryPageStore {
    fn find_by_path_and_viewer(&self, path: &str, viewer: &Viewer) -> Result<Option<Page>, Error> {
        let found = self
            .entries
            .iter()
            .find(|e| e.page.path == path && self.can_view(&e.page, viewer))
            .map(|e| e.page.clone());
        Ok(found)
    }

    fn find_by_id(&self, id: &PageId) -> Result<Option<Page>, Error> {
        Ok(self.entries.iter().find(|e| &e.page.id == id).map(|e| e.page.clone()))
    }

    fn is_accessible_by_viewer(&self, page: &Page, viewer: &Viewer) -> Result<bool, Error> {
        Ok(self.can_view(page, viewer))
    }

    fn select_ids(&self, query: &PageQuery) -> Result<Vec<PageId>, Error> {
        let ids = self
            .entries
            .iter()
            .filter(|e| self.query_admits(e, query))
            .map(|e| e.page.id.clone())
            .collect();
        Ok(ids)
    }
}

/// Attachment store over an insertion-ordered vector; result order is
/// insertion order, stable for a fixed data set.
#[derive(Debug, Default)]
pub struct MemoryAttachmentStore {
    attachments: Vec<Attachment>,
}

impl MemoryAttachmentStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attachment record.
    pub fn insert(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    fn filter_admits(filter: &AttachmentFilter, attachment: &Attachment) -> bool {
        if let Some(arg) = &filter.file_name_or_id {
            // An id match is page-unconstrained; a name match must fall
            // within the filter's page set.
            let by_id = &attachment.id.0 == arg;
            let by_name = &attachment.original_name == arg
                && filter.page_ids.contains(&attachment.page_id);
            if !by_id && !by_name {
                return false;
            }
        } else if !filter.page_ids.contains(&attachment.page_id) {
            return false;
        }

        if let Some(pattern) = &filter.name_pattern {
            if !pattern.matches(&attachment.original_name) {
                return false;
            }
        }
        true
    }
}

impl AttachmentStore for MemoryAttachmentStore {
    fn find_one(&self, filter: &AttachmentFilter) -> Result<Option<Attachment>, Error> {
        let found = self
            .attachments
            .iter()
            .find(|a| Self::filter_admits(filter, a))
            .cloned();
        Ok(found)
    }

    fn find(&self, filter: &AttachmentFilter) -> Result<Vec<Attachment>, Error> {
        let found = self
            .attachments
            .iter()
            .filter(|a| Self::filter_admits(filter, a))
            .cloned()
            .collect();
        Ok(found)
    }
}

/// Identity store over a plain map, with a switchable image capability.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    supports_images: bool,
    users: HashMap<String, UserRef>,
}

impl MemoryIdentityStore {
    /// An empty store advertising (or not) the image-population capability.
    pub fn new(supports_images: bool) -> Self {
        Self { supports_images, users: HashMap::new() }
    }

    /// Insert an identity record.
    pub fn insert(&mut self, user: UserRef) {
        self.users.insert(user.id.clone(), user);
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn supports_image_population(&self) -> bool {
        self.supports_images
    }

    fn public_user(&self, id: &str) -> Result<Option<UserRef>, Error> {
        Ok(self.users.get(id).cloned())
    }
}

//! Collaborator seams: page, attachment, and identity stores.
//!
//! Everything behind these traits is owned by the host application. This
//! crate only composes read-only queries and never bypasses the store's own
//! visibility filtering — viewer access is an opaque conjunctive filter the
//! store evaluates, not something re-implemented here.

use regex::Regex;

use crate::error::Error;
use crate::types::{Attachment, NamePattern, Page, PageId, Viewer};

/// Composable, read-only description of a page selection. Built by the
/// resolver, evaluated by the page store.
#[derive(Debug, Clone, Default)]
pub struct PageQuery {
    exact_path: Option<String>,
    exclude_redirects: bool,
    exclude_trashed: bool,
    path_pattern: Option<Regex>,
    prefix: Option<String>,
    viewer: Option<Viewer>,
}

impl PageQuery {
    /// Narrow to the prefix page and every page below it.
    pub fn descendants_of(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    /// Narrow to the single page at exactly this path.
    pub fn exact_path(mut self, path: &str) -> Self {
        self.exact_path = Some(path.to_string());
        self
    }

    /// Exclude redirect stubs.
    pub fn exclude_redirects(mut self) -> Self {
        self.exclude_redirects = true;
        self
    }

    /// Exclude trashed pages.
    pub fn exclude_trashed(mut self) -> Self {
        self.exclude_trashed = true;
        self
    }

    /// Conjoin a structural path predicate (see `depth::depth_predicate`).
    pub fn path_matches(mut self, pattern: Regex) -> Self {
        self.path_pattern = Some(pattern);
        self
    }

    /// Narrow to pages this viewer may read. The store decides what that
    /// means; this crate never inspects grants.
    pub fn visible_to(mut self, viewer: &Viewer) -> Self {
        self.viewer = Some(viewer.clone());
        self
    }

    /// The exact-path predicate, if set.
    pub fn exact_path_filter(&self) -> Option<&str> {
        self.exact_path.as_deref()
    }

    /// The structural path predicate, if set.
    pub fn path_pattern_filter(&self) -> Option<&Regex> {
        self.path_pattern.as_ref()
    }

    /// The descendants-of prefix, if set.
    pub fn prefix_filter(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Whether redirect stubs are excluded.
    pub fn redirects_excluded(&self) -> bool {
        self.exclude_redirects
    }

    /// Whether trashed pages are excluded.
    pub fn trash_excluded(&self) -> bool {
        self.exclude_trashed
    }

    /// The viewer whose visibility applies, if set.
    pub fn viewer_filter(&self) -> Option<&Viewer> {
        self.viewer.as_ref()
    }
}

/// Read-only attachment selection evaluated by the attachment store.
#[derive(Debug, Clone, Default)]
pub struct AttachmentFilter {
    /// Match the attachment whose id equals this value (anywhere — an id
    /// match is not constrained to `page_ids`), or whose original name
    /// equals it within `page_ids`.
    pub file_name_or_id: Option<String>,
    /// Filter original names through a compiled pattern.
    pub name_pattern: Option<NamePattern>,
    /// Only attachments owned by one of these pages.
    pub page_ids: Vec<PageId>,
}

/// The hierarchical page tree, viewer filtering included.
pub trait PageStore {
    /// The page at `path`, or `None` when it does not exist **or** this
    /// viewer may not read it — callers cannot tell those apart here.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on collaborator failure.
    fn find_by_path_and_viewer(&self, path: &str, viewer: &Viewer) -> Result<Option<Page>, Error>;

    /// The page with this id, regardless of viewer.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on collaborator failure.
    fn find_by_id(&self, id: &PageId) -> Result<Option<Page>, Error>;

    /// Whether this viewer may read the page.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on collaborator failure.
    fn is_accessible_by_viewer(&self, page: &Page, viewer: &Viewer) -> Result<bool, Error>;

    /// Evaluate a composed query down to page identifiers — never full page
    /// bodies, to bound the size of the subsequent attachment lookup.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on collaborator failure.
    fn select_ids(&self, query: &PageQuery) -> Result<Vec<PageId>, Error>;
}

/// The attachment records owned by pages.
pub trait AttachmentStore {
    /// The unique attachment matching the filter, if any.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on collaborator failure.
    fn find_one(&self, filter: &AttachmentFilter) -> Result<Option<Attachment>, Error>;

    /// Every attachment matching the filter. Ordering is whatever the store
    /// produces, stable for a fixed data set; callers must not rely on more.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on collaborator failure.
    fn find(&self, filter: &AttachmentFilter) -> Result<Vec<Attachment>, Error>;
}

/// Identity records, projected to public fields only.
pub trait IdentityStore {
    /// Whether this store can populate avatar images. Older identity record
    /// shapes may not carry them; absence is normal, not an error. Probed
    /// once at startup, never per request.
    fn supports_image_population(&self) -> bool;

    /// Public-fields projection of one identity, if it still exists.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on collaborator failure.
    fn public_user(&self, id: &str) -> Result<Option<crate::types::UserRef>, Error>;
}

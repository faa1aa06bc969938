//! Access-filtered attachment lookup over the collaborator stores.
//!
//! Two entry modes. Subtree mode composes descendants-of-prefix with
//! trash-exclusion, redirect-exclusion, viewer visibility, and an optional
//! depth predicate. Single-page mode composes path-equals with visibility
//! only. Both resolve the page set to identifiers before touching the
//! attachment store.

use regex::Regex;
use tracing::{debug, warn};

use crate::depth::depth_predicate;
use crate::error::Error;
use crate::store::{AttachmentFilter, AttachmentStore, IdentityStore, PageStore, PageQuery};
use crate::types::{Attachment, NamePattern, PathScope, Viewer};

/// Find every attachment visible to `viewer` within `scope`, optionally
/// filtered by original-name pattern.
///
/// Inaccessible pages silently narrow the result — the visibility filter is
/// applied at the page-set stage, and an empty result is not an error.
///
/// # Errors
///
/// Returns `Error::InvalidOption` if the scope's depth predicate does not
/// compile, or `Error::Store` from the collaborators.
pub fn find_scoped_attachments<P, A>(
    pages: &P,
    attachments: &A,
    scope: &PathScope,
    viewer: &Viewer,
    name_pattern: Option<&NamePattern>,
) -> Result<Vec<Attachment>, Error>
where
    P: PageStore + ?Sized,
    A: AttachmentStore + ?Sized,
{
    let mut query = PageQuery::default()
        .descendants_of(&scope.prefix)
        .exclude_trashed()
        .exclude_redirects()
        .visible_to(viewer);

    if let Some(range) = &scope.depth {
        let text = depth_predicate(&scope.prefix, range);
        let pattern = Regex::new(&text).map_err(|e| Error::InvalidOption {
            reason: format!("depth predicate failed to compile: {e}"),
        })?;
        query = query.path_matches(pattern);
    }

    let ids = pages.select_ids(&query)?;
    debug!(prefix = %scope.prefix, pages = ids.len(), "resolved scope to page set");
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let filter = AttachmentFilter {
        file_name_or_id: None,
        name_pattern: name_pattern.cloned(),
        page_ids: ids,
    };
    attachments.find(&filter)
}

/// Find every attachment of the single page at `path`, if the viewer may
/// read it. An absent or inaccessible page yields an empty list, never an
/// error — the multi-attachment path narrows rather than rejects.
///
/// # Errors
///
/// Returns `Error::Store` from the collaborators.
pub fn find_page_attachments<P, A>(
    pages: &P,
    attachments: &A,
    path: &str,
    viewer: &Viewer,
    name_pattern: Option<&NamePattern>,
) -> Result<Vec<Attachment>, Error>
where
    P: PageStore + ?Sized,
    A: AttachmentStore + ?Sized,
{
    let Some(page) = pages.find_by_path_and_viewer(path, viewer)? else {
        debug!(%path, "page absent or not visible, returning empty set");
        return Ok(Vec::new());
    };

    let filter = AttachmentFilter {
        file_name_or_id: None,
        name_pattern: name_pattern.cloned(),
        page_ids: vec![page.id],
    };
    attachments.find(&filter)
}

/// Find the unique attachment under `page_path` whose id or original name
/// equals `file_name_or_id`.
///
/// The access check is re-derived from the attachment's own page, not the
/// page resolved from `page_path` — these diverge when an attachment has
/// moved, and the attachment's actual owner decides.
///
/// # Errors
///
/// Returns `Error::PageNotFound` if no page is visible at `page_path`,
/// `Error::AttachmentNotFound` naming the argument if no attachment matches,
/// or `Error::Forbidden` if the re-derived access check fails.
pub fn find_attachment<P, A>(
    pages: &P,
    attachments: &A,
    page_path: &str,
    file_name_or_id: &str,
    viewer: &Viewer,
) -> Result<Attachment, Error>
where
    P: PageStore + ?Sized,
    A: AttachmentStore + ?Sized,
{
    let page = pages
        .find_by_path_and_viewer(page_path, viewer)?
        .ok_or_else(|| Error::PageNotFound { path: page_path.to_string() })?;

    let filter = AttachmentFilter {
        file_name_or_id: Some(file_name_or_id.to_string()),
        name_pattern: None,
        page_ids: vec![page.id],
    };
    let attachment = attachments.find_one(&filter)?.ok_or_else(|| {
        Error::AttachmentNotFound {
            file_name_or_id: file_name_or_id.to_string(),
            page_path: page_path.to_string(),
        }
    })?;

    // Re-derive access from the page that actually owns the attachment.
    // A missing owner page reads as an access failure, same as a grant miss.
    let owner = pages.find_by_id(&attachment.page_id)?;
    let accessible = match &owner {
        Some(owner) => pages.is_accessible_by_viewer(owner, viewer)?,
        None => false,
    };
    if !accessible {
        let owner_path = owner.map_or_else(|| page_path.to_string(), |p| p.path);
        debug!(%owner_path, "attachment owner page failed access re-derivation");
        return Err(Error::Forbidden { page_path: owner_path });
    }

    Ok(attachment)
}

/// Project each attachment's creator to public fields through the identity
/// store. An individual projection failure excludes that creator (left as
/// `None`) rather than failing the whole batch. When the store cannot
/// populate images, `image_url` is stripped.
pub fn populate_creators<I>(
    identity: &I,
    supports_images: bool,
    attachments: &mut [Attachment],
) where
    I: IdentityStore + ?Sized,
{
    for attachment in attachments {
        let user = match identity.public_user(&attachment.creator_id) {
            Ok(user) => user,
            Err(e) => {
                warn!(creator = %attachment.creator_id, error = %e, "creator projection failed");
                None
            },
        };
        attachment.creator = user.map(|mut u| {
            if !supports_images {
                u.image_url = None;
            }
            u
        });
    }
}

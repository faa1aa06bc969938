//! Boundary surface: single and multi attachment lookup, plus the
//! render-time consumption of scanned tags.
//!
//! The host router owns HTTP; this layer parses request inputs, orchestrates
//! the resolver, and returns typed errors whose `status()` the router maps
//! onto a response code.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::cache::ContextCache;
use crate::depth::DepthRange;
use crate::error::Error;
use crate::resolver;
use crate::scanner::{TagArg, TagMatch};
use crate::store::{AttachmentStore, IdentityStore, PageStore};
use crate::types::{Attachment, NamePattern, PathScope, Viewer};

/// Query input for the single-attachment lookup. `options` is accepted for
/// forward compatibility and currently unused by resolution.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefRequest {
    /// Attachment id or original file name. Required.
    pub file_name_or_id: Option<String>,
    /// Opaque per-tag options.
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
    /// Path of the page to look under. Required.
    pub page_path: Option<String>,
}

/// Query input for the multi-attachment lookup. Exactly one of `prefix` or
/// `page_path` must be present; `prefix` wins when both are.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefsRequest {
    /// Options: `regexp`/`regex` name filter, `depth` (prefix mode only).
    #[serde(default)]
    pub options: Option<Map<String, Value>>,
    /// Exact page path for single-page mode.
    pub page_path: Option<String>,
    /// Subtree root for descendant traversal.
    pub prefix: Option<String>,
}

/// The resolution surface, generic over the collaborator stores.
pub struct RefsService<P, A, I> {
    attachments: A,
    identity: I,
    pages: P,
    /// Capability probe result, resolved once at construction.
    supports_creator_images: bool,
}

impl<P, A, I> RefsService<P, A, I>
where
    P: PageStore,
    A: AttachmentStore,
    I: IdentityStore,
{
    /// Wire the service to its stores. The identity store's image-population
    /// capability is probed here, once — never per request.
    pub fn new(pages: P, attachments: A, identity: I) -> Self {
        let supports_creator_images = identity.supports_image_population();
        Self { attachments, identity, pages, supports_creator_images }
    }

    /// Single-attachment lookup (`GET /ref`).
    ///
    /// # Errors
    ///
    /// `Error::MissingParameter` (400) if `pagePath` or `fileNameOrId` is
    /// absent; `Error::PageNotFound` / `Error::AttachmentNotFound` (404) if
    /// either does not exist; `Error::Forbidden` (403) if the access check
    /// against the attachment's own page fails.
    pub fn get_ref(&self, req: &RefRequest, viewer: &Viewer) -> Result<Attachment, Error> {
        let page_path = req
            .page_path
            .as_deref()
            .ok_or_else(|| Error::MissingParameter { name: "pagePath".to_string() })?;
        let file_name_or_id = req
            .file_name_or_id
            .as_deref()
            .ok_or_else(|| Error::MissingParameter { name: "fileNameOrId".to_string() })?;

        debug!(%page_path, %file_name_or_id, "single attachment lookup");
        let mut attachment = resolver::find_attachment(
            &self.pages,
            &self.attachments,
            page_path,
            file_name_or_id,
            viewer,
        )?;
        resolver::populate_creators(
            &self.identity,
            self.supports_creator_images,
            std::slice::from_mut(&mut attachment),
        );
        Ok(attachment)
    }

    /// Multi-attachment lookup (`GET /refs`). Returns a possibly-empty
    /// sequence; inaccessible pages narrow the result instead of rejecting.
    ///
    /// # Errors
    ///
    /// `Error::MissingParameter` (400) if both `prefix` and `pagePath` are
    /// absent; `Error::InvalidPattern` / `Error::InvalidOption` (400) for a
    /// malformed `regexp`/`regex` or `depth` option.
    pub fn get_refs(&self, req: &RefsRequest, viewer: &Viewer) -> Result<Vec<Attachment>, Error> {
        let options = req.options.as_ref();
        let name_pattern = name_pattern_option(options)?;
        // Validated up front even when single-page mode will ignore it, so a
        // malformed depth fails fast regardless of mode.
        let depth = depth_option(options)?;

        let mut found = if let Some(prefix) = req.prefix.as_deref() {
            let scope = PathScope { depth, prefix: prefix.to_string() };
            debug!(%prefix, ?scope.depth, "subtree attachment lookup");
            resolver::find_scoped_attachments(
                &self.pages,
                &self.attachments,
                &scope,
                viewer,
                name_pattern.as_ref(),
            )?
        } else if let Some(page_path) = req.page_path.as_deref() {
            debug!(%page_path, "single page attachment lookup");
            resolver::find_page_attachments(
                &self.pages,
                &self.attachments,
                page_path,
                viewer,
                name_pattern.as_ref(),
            )?
        } else {
            return Err(Error::MissingParameter { name: "prefix or pagePath".to_string() });
        };

        resolver::populate_creators(&self.identity, self.supports_creator_images, &mut found);
        Ok(found)
    }

    /// Resolve one scanned tag from a context map into its attachments.
    /// Singular aliases yield exactly one attachment or an error; plural
    /// aliases yield a possibly-empty list.
    ///
    /// # Errors
    ///
    /// Same surface as `get_ref` / `get_refs`, driven by the tag's arguments.
    pub fn resolve_tag(&self, tag: &TagMatch, viewer: &Viewer) -> Result<Vec<Attachment>, Error> {
        if tag.alias.is_plural() {
            let options = Some(tag_options(tag));
            // A keyed `prefix=` asks for subtree traversal; a bare positional
            // names one exact page.
            let request = match tag.option("prefix") {
                Some(prefix) => RefsRequest {
                    options,
                    page_path: None,
                    prefix: Some(prefix.to_string()),
                },
                None => RefsRequest {
                    options,
                    page_path: tag.page_arg().map(str::to_string),
                    prefix: None,
                },
            };
            return self.get_refs(&request, viewer);
        }

        let request = RefRequest {
            file_name_or_id: tag.file_arg().map(str::to_string),
            options: Some(tag_options(tag)),
            page_path: tag.page_arg().map(str::to_string),
        };
        Ok(vec![self.get_ref(&request, viewer)?])
    }

    /// Resolve one tag through a per-context cache keyed on the tag's
    /// signature: repeated previews of an unchanged tag skip re-resolution.
    ///
    /// # Errors
    ///
    /// Same surface as `resolve_tag`. Errors are not cached.
    pub fn resolve_tag_cached(
        &self,
        cache: &ContextCache<Vec<Attachment>>,
        tag: &TagMatch,
        viewer: &Viewer,
    ) -> Result<Vec<Attachment>, Error> {
        let signature = tag.signature();
        if let Some(hit) = cache.get(&signature) {
            debug!(alias = tag.alias.as_str(), "tag resolution served from cache");
            return Ok(hit);
        }

        let resolved = self.resolve_tag(tag, viewer)?;
        cache.insert(signature, resolved.clone());
        Ok(resolved)
    }
}

/// Collect a tag's keyed arguments into an options map for the request
/// layer. A valueless flag becomes JSON `true` so option validation rejects
/// it rather than losing it. Positional arguments are handled separately.
fn tag_options(tag: &TagMatch) -> Map<String, Value> {
    let mut options = Map::new();
    for arg in &tag.args {
        match arg {
            TagArg::Keyed { key, value } => {
                options.insert(key.clone(), Value::String(value.clone()));
            },
            TagArg::Flag(key) => {
                options.insert(key.clone(), Value::Bool(true));
            },
            TagArg::Positional(_) => {},
        }
    }
    options
}

/// Extract and validate the `depth` option. A key present with a non-numeric
/// value (JSON `true`, `null`, an object) is an error, not a default.
fn depth_option(options: Option<&Map<String, Value>>) -> Result<Option<DepthRange>, Error> {
    let Some(value) = options.and_then(|o| o.get("depth")) else {
        return Ok(None);
    };
    return match value {
        Value::String(spec) => DepthRange::parse(spec).map(Some),
        Value::Number(n) => {
            // A negative number would stringify to the half-bounded textual
            // form ("-1" reads as "up to 1"), which is not what the caller
            // wrote. Reject it as an out-of-range bound instead.
            if n.as_f64().is_some_and(|v| v < 0.0) {
                return Err(Error::InvalidOption {
                    reason: format!("depth bounds must be 1 or larger, got `{n}`"),
                });
            }
            DepthRange::parse(&n.to_string()).map(Some)
        },
        _ => Err(Error::InvalidOption {
            reason: "depth option requires a numeric range".to_string(),
        }),
    };
}

/// Extract and compile the `regexp`/`regex` option; `regexp` is consulted
/// first. Compilation happens before any store call.
fn name_pattern_option(options: Option<&Map<String, Value>>) -> Result<Option<NamePattern>, Error> {
    let Some(options) = options else {
        return Ok(None);
    };
    let Some(value) = options.get("regexp").or_else(|| options.get("regex")) else {
        return Ok(None);
    };
    let Value::String(raw) = value else {
        return Err(Error::InvalidPattern {
            pattern: value.to_string(),
            reason: "pattern must be a string".to_string(),
        });
    };
    NamePattern::compile(raw).map(Some)
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{RefsRequest, depth_option, name_pattern_option, tag_options};
    use crate::depth::DepthRange;
    use crate::error::Error;
    use crate::scanner::{TagAlias, scan};

    fn options(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        let serde_json::Value::Object(map) = value else {
            panic!("expected a JSON object");
        };
        map
    }

    #[test]
    fn depth_accepts_string_and_number_forms() {
        let o = options(json!({"depth": "2-4"}));
        assert_eq!(
            depth_option(Some(&o)).unwrap(),
            Some(DepthRange { end: Some(4), start: 2 })
        );

        let o = options(json!({"depth": 2}));
        assert_eq!(
            depth_option(Some(&o)).unwrap(),
            Some(DepthRange { end: Some(2), start: 2 })
        );
    }

    #[test]
    fn depth_true_requires_a_numeric_range() {
        let o = options(json!({"depth": true}));
        let err = depth_option(Some(&o)).unwrap_err();
        assert!(err.to_string().contains("requires a numeric range"));
    }

    #[test]
    fn negative_numeric_depth_is_rejected() {
        let o = options(json!({"depth": -1}));
        let err = depth_option(Some(&o)).unwrap_err();
        assert!(err.to_string().contains("1 or larger"));
    }

    #[test]
    fn bare_depth_flag_becomes_true_and_is_rejected() {
        let (_, map) = scan("$refs(prefix=/docs, depth)", &TagAlias::ALL);
        let tag = &map.iter().next().unwrap().tag;

        let opts = tag_options(tag);
        assert_eq!(opts.get("depth"), Some(&Value::Bool(true)));

        let err = depth_option(Some(&opts)).unwrap_err();
        assert!(err.to_string().contains("requires a numeric range"));
    }

    #[test]
    fn regexp_is_consulted_before_regex() {
        let o = options(json!({"regex": "/^b/", "regexp": "/^a/"}));
        let pattern = name_pattern_option(Some(&o)).unwrap().unwrap();
        assert!(pattern.matches("apple.png"));
        assert!(!pattern.matches("banana.png"));
    }

    #[test]
    fn non_string_pattern_is_invalid() {
        let o = options(json!({"regexp": 42}));
        assert!(matches!(
            name_pattern_option(Some(&o)),
            Err(Error::InvalidPattern { .. })
        ));
    }

    #[test]
    fn refs_request_deserializes_camel_case() {
        let req: RefsRequest =
            serde_json::from_value(json!({"pagePath": "/docs", "options": {"depth": "2"}}))
                .unwrap();
        assert_eq!(req.page_path.as_deref(), Some("/docs"));
        assert!(req.options.unwrap().contains_key("depth"));
    }
}

//! Core domain types for pages, attachments, viewers, and scopes.

use serde::{Deserialize, Serialize};

use crate::depth::DepthRange;
use crate::error::Error;

/// Identifier of an attachment record. Newtype prevents mixing with page ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(
    /// The opaque id string assigned by the attachment store.
    pub String,
);

/// Identifier of a page record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(
    /// The opaque id string assigned by the page store.
    pub String,
);

/// An attachment as read from the attachment store. This crate only reads
/// these; ownership stays with the external store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    /// Public-fields projection of the uploader, populated by the resolver.
    /// `None` until populated, or when the identity record is gone.
    pub creator: Option<UserRef>,
    /// Raw identity id of the uploader, as stored.
    #[serde(skip)]
    pub creator_id: String,
    /// This attachment's id.
    pub id: AttachmentId,
    /// Original file name at upload time.
    pub original_name: String,
    /// Id of the page that owns this attachment.
    pub page_id: PageId,
}

/// A page record as read from the page store. Visibility is the store's
/// concern and is deliberately not represented here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// This page's id.
    pub id: PageId,
    /// Full hierarchical path, `/`-separated, starting with `/`.
    pub path: String,
    /// Whether this record is a redirect stub rather than a real page.
    pub redirect: bool,
    /// Whether the page sits in the trash.
    pub trashed: bool,
}

/// A page-path prefix together with an optional depth range bounding how
/// much of the subtree rooted there to include. A `None` depth means the
/// whole subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathScope {
    /// Optional depth range; depth 1 is the prefix page itself.
    pub depth: Option<DepthRange>,
    /// Path of the subtree root.
    pub prefix: String,
}

/// Public-fields projection of an identity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Identity id.
    pub id: String,
    /// Avatar image location. Absent when the identity store predates
    /// image records, or when it cannot populate them.
    pub image_url: Option<String>,
    /// Display name.
    pub username: String,
}

/// The identity on whose behalf access checks are evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    /// Identity id of the viewer.
    pub id: String,
}

/// Characters that make an undelimited pattern a regex rather than a
/// literal substring.
const REGEX_META: &[char] = &['.', '+', '*', '?', '(', ')', '[', ']', '{', '}', '|', '^', '$', '\\'];

/// Optional filter over attachment original names. Compiled once, before
/// any store call, so a bad pattern never reaches a query.
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// A compiled regular expression, from `/body/flags` form.
    Regex(regex::Regex),
    /// A literal substring matcher, from any other input.
    Substring(String),
}

impl NamePattern {
    /// Compile a raw `regexp`/`regex` option value.
    ///
    /// Slash-delimited input (`/^photo/i`) compiles as a regex with optional
    /// trailing flags (`i`, `m`, `s`, `x`). Undelimited input containing
    /// regex metacharacters compiles as a bare regex; a metacharacter-free
    /// literal matches as a plain substring and cannot fail.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` naming the raw input if the regex
    /// body does not compile or a flag is unknown.
    pub fn compile(raw: &str) -> Result<Self, Error> {
        let (body, flags) = match raw.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
            Some((body, flags)) => (body, flags),
            None => {
                if !raw.contains(REGEX_META) {
                    return Ok(NamePattern::Substring(raw.to_string()));
                }
                (raw, "")
            },
        };

        for flag in flags.chars() {
            if !matches!(flag, 'i' | 'm' | 's' | 'x') {
                return Err(Error::InvalidPattern {
                    pattern: raw.to_string(),
                    reason: format!("unknown flag `{flag}`"),
                });
            }
        }

        let source = if flags.is_empty() {
            body.to_string()
        } else {
            format!("(?{flags}){body}")
        };

        let regex = regex::Regex::new(&source).map_err(|e| Error::InvalidPattern {
            pattern: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok(NamePattern::Regex(regex))
    }

    /// Whether an original file name passes this filter.
    pub fn matches(&self, original_name: &str) -> bool {
        return match self {
            NamePattern::Regex(regex) => regex.is_match(original_name),
            NamePattern::Substring(needle) => original_name.contains(needle.as_str()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::NamePattern;
    use crate::error::Error;

    #[test]
    fn plain_input_is_a_substring_matcher() {
        let p = NamePattern::compile("photo").unwrap();
        assert!(p.matches("team-photo.png"));
        assert!(!p.matches("diagram.svg"));
    }

    #[test]
    fn slash_delimited_input_compiles_as_regex() {
        let p = NamePattern::compile("/^photo/").unwrap();
        assert!(p.matches("photo.png"));
        assert!(!p.matches("team-photo.png"));
    }

    #[test]
    fn case_insensitive_flag() {
        let p = NamePattern::compile("/^PHOTO/i").unwrap();
        assert!(p.matches("photo.png"));
    }

    #[test]
    fn broken_regex_fails_naming_the_pattern() {
        let err = NamePattern::compile("not(a valid regex").unwrap_err();
        let Error::InvalidPattern { pattern, .. } = err else {
            panic!("expected InvalidPattern, got {err:?}");
        };
        assert_eq!(pattern, "not(a valid regex");
    }

    #[test]
    fn undelimited_input_with_metacharacters_is_a_regex() {
        let p = NamePattern::compile("^photo").unwrap();
        assert!(p.matches("photo.png"));
        assert!(!p.matches("team-photo.png"));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(matches!(
            NamePattern::compile("/abc/g"),
            Err(Error::InvalidPattern { .. })
        ));
    }
}

//! Scope resolution: depth ranges and the structural path predicate.
//!
//! Depth is counted in hierarchical path segments below a scope's root page;
//! depth 1 is the root page itself. The predicate produced here is plain
//! regex text over path strings — pure, deterministic, and identical for
//! identical inputs — which the page store composes with its other filters.

use crate::error::Error;

/// A 1-based depth range over a page subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthRange {
    /// Inclusive upper bound; `None` for a half-bounded spec like `"2-"`.
    pub end: Option<u32>,
    /// Inclusive lower bound, always ≥ 1.
    pub start: u32,
}

impl DepthRange {
    /// Parse a textual depth specification.
    ///
    /// Accepted forms: a single integer (`"3"`, start = end = 3), a full
    /// range (`"2-4"`), or a half-bounded range (`"-3"` starts at 1, `"2-"`
    /// has no upper bound).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidOption` if the text is not one of those forms,
    /// if either bound resolves to < 1, or if start exceeds end.
    pub fn parse(spec: &str) -> Result<Self, Error> {
        let spec = spec.trim();
        if spec.is_empty() {
            return Err(missing_value());
        }

        let (start, end) = match spec.split_once('-') {
            None => {
                let n = parse_bound(spec)?;
                (n, Some(n))
            },
            Some(("", "")) => return Err(invalid(spec)),
            Some(("", high)) => (1, Some(parse_bound(high)?)),
            Some((low, "")) => (parse_bound(low)?, None),
            Some((low, high)) => (parse_bound(low)?, Some(parse_bound(high)?)),
        };

        if start < 1 || end.is_some_and(|e| e < 1) {
            return Err(Error::InvalidOption {
                reason: format!("depth bounds must be 1 or larger, got `{spec}`"),
            });
        }
        if end.is_some_and(|e| e < start) {
            return Err(Error::InvalidOption {
                reason: format!("depth range start exceeds end in `{spec}`"),
            });
        }

        Ok(DepthRange { end, start })
    }
}

/// Build the structural predicate for `page_path` under `range`: anchored
/// bounded repetition of one-path-segment groups.
///
/// The floor stays at the prefix's own separator count regardless of
/// `range.start` — depth 1 is the prefix page itself, never a descendant —
/// while the ceiling grows with `range.end`.
pub fn depth_predicate(page_path: &str, range: &DepthRange) -> String {
    let floor = page_path.matches('/').count();
    return match range.end {
        Some(end) => {
            let ceiling = floor + end as usize - 1;
            format!("^(/[^/]*){{{floor},{ceiling}}}$")
        },
        None => format!("^(/[^/]*){{{floor},}}$"),
    };
}

fn invalid(spec: &str) -> Error {
    Error::InvalidOption {
        reason: format!("depth option requires a numeric range, got `{spec}`"),
    }
}

fn missing_value() -> Error {
    Error::InvalidOption {
        reason: "depth option requires a numeric range".to_string(),
    }
}

fn parse_bound(text: &str) -> Result<u32, Error> {
    return text.trim().parse::<u32>().map_err(|_err| invalid(text));
}

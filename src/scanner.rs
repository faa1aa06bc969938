//! Tag scanning: find `$ref(...)`-family markers in rendered content and
//! substitute order-stable placeholders.
//!
//! Scanning is pure with respect to the input content and alias set. No
//! lookups or permission checks happen here; those are driven later by the
//! returned context map.

use regex::Regex;
use sha2::{Digest as _, Sha256};

/// Regex over content: alias name (longest alternatives first, so `refs`
/// never half-matches as `ref`) followed by a parenthesized argument string.
const TAG_PATTERN: &str = r"\$(refsimg|refimg|refs|ref)\(([^)]*)\)";

/// The four recognized tag aliases: single vs. multiple result, text vs.
/// image rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagAlias {
    /// `$ref(...)` — one attachment, text rendering.
    Ref,
    /// `$refimg(...)` — one attachment, image rendering.
    RefImg,
    /// `$refs(...)` — many attachments, text rendering.
    Refs,
    /// `$refsimg(...)` — many attachments, image rendering.
    RefsImg,
}

impl TagAlias {
    /// All four aliases, the default scan set.
    pub const ALL: [TagAlias; 4] = [TagAlias::Ref, TagAlias::RefImg, TagAlias::Refs, TagAlias::RefsImg];

    /// Parse an alias name as it appears in content.
    pub fn parse(name: &str) -> Option<Self> {
        return match name {
            "ref" => Some(TagAlias::Ref),
            "refimg" => Some(TagAlias::RefImg),
            "refs" => Some(TagAlias::Refs),
            "refsimg" => Some(TagAlias::RefsImg),
            _ => None,
        };
    }

    /// The alias name as it appears in content.
    pub fn as_str(self) -> &'static str {
        return match self {
            TagAlias::Ref => "ref",
            TagAlias::RefImg => "refimg",
            TagAlias::Refs => "refs",
            TagAlias::RefsImg => "refsimg",
        };
    }

    /// Whether this alias renders as an image.
    pub fn is_image(self) -> bool {
        matches!(self, TagAlias::RefImg | TagAlias::RefsImg)
    }

    /// Whether this alias resolves to multiple attachments.
    pub fn is_plural(self) -> bool {
        matches!(self, TagAlias::Refs | TagAlias::RefsImg)
    }
}

/// Keys this crate interprets as options. A bare token naming one of these
/// is a flag with no value, not a positional: `$refs(/docs, depth)` asks
/// for a depth, it does not name a file called "depth".
const OPTION_KEYS: &[&str] = &["depth", "regex", "regexp"];

/// A single parsed tag argument, in appearance order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagArg {
    /// A known option key appearing bare, with no `=`. Carried through so
    /// downstream validation can reject the valueless option explicitly
    /// instead of misreading it as a page path or file name.
    Flag(
        /// The option key.
        String,
    ),
    /// A `key=value` or bare `key=` option. Keys this crate interprets are
    /// `regexp`, `regex`, and `depth`; others pass through opaquely.
    Keyed {
        /// Option key, trimmed.
        key: String,
        /// Option value; empty string for `key=` with nothing after.
        value: String,
    },
    /// A bare token: first is the page path or prefix, an optional second
    /// is a file name or id.
    Positional(String),
}

/// One recognized tag occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMatch {
    /// Which alias matched.
    pub alias: TagAlias,
    /// Parsed arguments, in appearance order.
    pub args: Vec<TagArg>,
    /// Byte offset of the occurrence in the source content.
    pub position: usize,
    /// The full raw occurrence, `$alias(args)`.
    pub raw: String,
}

impl TagMatch {
    /// First positional argument: the page path or prefix, if any.
    pub fn page_arg(&self) -> Option<&str> {
        let mut positionals = self.args.iter().filter_map(|a| {
            return match a {
                TagArg::Positional(value) => Some(value.as_str()),
                _ => None,
            };
        });
        positionals.next()
    }

    /// Second positional argument: the file name or id, if any.
    pub fn file_arg(&self) -> Option<&str> {
        let mut positionals = self.args.iter().filter_map(|a| {
            return match a {
                TagArg::Positional(value) => Some(value.as_str()),
                _ => None,
            };
        });
        positionals.nth(1)
    }

    /// Value of a keyed option, if present.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.args.iter().find_map(|a| {
            return match a {
                TagArg::Keyed { key: k, value } if k == key => Some(value.as_str()),
                _ => None,
            };
        })
    }

    /// Stable signature of this tag: SHA-256 over alias and raw argument
    /// text. Downstream consumers key memoized resolution results on it, so
    /// repeated previews of an unchanged tag can skip re-resolution.
    pub fn signature(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.alias.as_str().as_bytes());
        hasher.update(b"(");
        hasher.update(self.raw.as_bytes());
        let digest = hasher.finalize();
        format!("{digest:x}")
    }
}

/// A placeholder bound to the tag occurrence it replaced. Created during a
/// single scan, consumed once by the downstream renderer, never persisted.
#[derive(Debug, Clone)]
pub struct PlaceholderEntry {
    /// Placeholder id, unique within one scan.
    pub placeholder: String,
    /// The occurrence this placeholder stands for.
    pub tag: TagMatch,
}

/// Insertion-ordered map from placeholder id to entry; insertion order is
/// appearance order in the scanned content.
#[derive(Debug, Clone, Default)]
pub struct TagContextMap {
    entries: Vec<PlaceholderEntry>,
}

impl TagContextMap {
    /// Look up an entry by placeholder id.
    pub fn get(&self, placeholder: &str) -> Option<&PlaceholderEntry> {
        self.entries.iter().find(|e| e.placeholder == placeholder)
    }

    /// Entries in appearance order.
    pub fn iter(&self) -> impl Iterator<Item = &PlaceholderEntry> {
        self.entries.iter()
    }

    /// Whether the scan recognized no tags.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recognized tags.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn push(&mut self, entry: PlaceholderEntry) {
        self.entries.push(entry);
    }
}

/// Scan content for tag occurrences of the requested aliases, replacing each
/// well-formed one with a placeholder unique within this call.
///
/// Content outside tag boundaries passes through byte-for-byte. A malformed
/// tag (alias matched but arguments unparsable) is left in the output
/// unmodified and gets no context-map entry — downstream rendering sees it
/// as literal text. Placeholders are not themselves tag syntax, so
/// re-scanning the output yields zero matches.
///
/// # Panics
///
/// Panics if the hardcoded tag regex is invalid (compile-time invariant).
pub fn scan(content: &str, aliases: &[TagAlias]) -> (String, TagContextMap) {
    let pattern = Regex::new(TAG_PATTERN).expect("valid regex");
    let mut rewritten = String::with_capacity(content.len());
    let mut map = TagContextMap::default();
    let mut last_end = 0;

    for cap in pattern.captures_iter(content) {
        let Some(whole) = cap.get(0) else { continue };
        let Some(entry) = parse_tag_capture(&cap, whole.start(), aliases, map.len()) else {
            continue;
        };

        rewritten.push_str(content.get(last_end..whole.start()).unwrap_or(""));
        rewritten.push_str(&entry.placeholder);
        last_end = whole.end();
        map.push(entry);
    }

    rewritten.push_str(content.get(last_end..).unwrap_or(""));
    (rewritten, map)
}

/// Try to turn one regex capture into a placeholder entry. `None` means the
/// occurrence stays literal: alias not in the requested set, or arguments
/// unparsable.
fn parse_tag_capture(
    cap: &regex::Captures<'_>,
    position: usize,
    aliases: &[TagAlias],
    index: usize,
) -> Option<PlaceholderEntry> {
    let alias = TagAlias::parse(cap.get(1)?.as_str())?;
    if !aliases.contains(&alias) {
        return None;
    }

    let raw_args = cap.get(2)?.as_str();
    let args = parse_args(raw_args)?;
    let raw = cap.get(0)?.as_str().to_string();
    let placeholder = placeholder_for(index, &raw);

    Some(PlaceholderEntry {
        placeholder,
        tag: TagMatch { alias, args, position, raw },
    })
}

/// Parse a raw argument string into an ordered option list. A bare token
/// naming a known option key becomes a flag, any other bare token a
/// positional. `None` on malformed input: an unterminated quote or an
/// empty key before `=`.
fn parse_args(raw: &str) -> Option<Vec<TagArg>> {
    let mut args = Vec::new();

    for token in split_quoted_commas(raw)? {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match token.split_once('=') {
            None if OPTION_KEYS.contains(&token) => {
                args.push(TagArg::Flag(token.to_string()));
            },
            None => args.push(TagArg::Positional(token.to_string())),
            Some((key, value)) => {
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                args.push(TagArg::Keyed {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                });
            },
        }
    }

    Some(args)
}

/// Split on commas that sit outside double quotes; quote characters are
/// consumed. `None` if a quote is left unterminated.
fn split_quoted_commas(raw: &str) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in raw.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if in_quotes {
        return None;
    }
    parts.push(current);
    Some(parts)
}

/// Placeholder for the `index`-th recognized tag: appearance index plus a
/// short digest of the raw occurrence. Deliberately free of `$name(` syntax.
fn placeholder_for(index: usize, raw: &str) -> String {
    let digest = Sha256::digest(raw.as_bytes());
    let hex = format!("{digest:x}");
    let short = hex.get(..8).unwrap_or(&hex);
    format!("ref_placeholder_{index}_{short}")
}

#[cfg(test)]
mod tests {
    use super::{TagAlias, TagArg, scan};

    #[test]
    fn well_formed_tags_become_distinct_placeholders() {
        let content = "before $ref(/docs, a.png) middle $refs(/docs) after";
        let (rewritten, map) = scan(content, &TagAlias::ALL);

        assert_eq!(map.len(), 2);
        let placeholders: Vec<&str> =
            map.iter().map(|e| e.placeholder.as_str()).collect();
        assert_ne!(placeholders[0], placeholders[1]);
        for p in &placeholders {
            assert!(rewritten.contains(*p), "placeholder missing from output");
        }
        assert!(rewritten.starts_with("before "));
        assert!(rewritten.ends_with(" after"));
        assert!(!rewritten.contains("$ref"));
    }

    #[test]
    fn rescanning_rewritten_content_finds_nothing() {
        let content = "$ref(/docs, a.png) and $refsimg(/docs, depth=2)";
        let (rewritten, first) = scan(content, &TagAlias::ALL);
        assert_eq!(first.len(), 2);

        let (again, second) = scan(&rewritten, &TagAlias::ALL);
        assert_eq!(second.len(), 0);
        assert_eq!(again, rewritten);
    }

    #[test]
    fn context_map_preserves_appearance_order() {
        let content = "$refs(/b) $ref(/a, x.png) $refimg(/c, y.png)";
        let (_, map) = scan(content, &TagAlias::ALL);

        let aliases: Vec<TagAlias> = map.iter().map(|e| e.tag.alias).collect();
        assert_eq!(aliases, vec![TagAlias::Refs, TagAlias::Ref, TagAlias::RefImg]);

        let positions: Vec<usize> = map.iter().map(|e| e.tag.position).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn positional_and_keyed_args_are_parsed_in_order() {
        let (_, map) = scan("$refs(/docs, regexp=/^a/i, depth=2-4)", &TagAlias::ALL);
        let entry = map.iter().next().unwrap();

        assert_eq!(entry.tag.page_arg(), Some("/docs"));
        assert_eq!(entry.tag.option("regexp"), Some("/^a/i"));
        assert_eq!(entry.tag.option("depth"), Some("2-4"));
        assert_eq!(entry.tag.file_arg(), None);
    }

    #[test]
    fn quoted_values_keep_their_commas() {
        let (_, map) = scan("$ref(/docs, \"a, b.png\")", &TagAlias::ALL);
        let entry = map.iter().next().unwrap();
        assert_eq!(entry.tag.file_arg(), Some("a, b.png"));
    }

    #[test]
    fn malformed_tag_stays_literal_with_no_entry() {
        let content = "keep $ref(/docs, \"unterminated) this";
        let (rewritten, map) = scan(content, &TagAlias::ALL);
        assert_eq!(map.len(), 0);
        assert_eq!(rewritten, content);
    }

    #[test]
    fn empty_key_is_malformed() {
        let content = "$refs(/docs, =oops)";
        let (rewritten, map) = scan(content, &TagAlias::ALL);
        assert_eq!(map.len(), 0);
        assert_eq!(rewritten, content);
    }

    #[test]
    fn aliases_outside_the_requested_set_pass_through() {
        let content = "$ref(/docs, a.png) $refs(/docs)";
        let (rewritten, map) = scan(content, &[TagAlias::Refs]);
        assert_eq!(map.len(), 1);
        assert!(rewritten.contains("$ref(/docs, a.png)"));
        assert!(!rewritten.contains("$refs(/docs)"));
    }

    #[test]
    fn refs_is_not_misread_as_ref() {
        let (_, map) = scan("$refs(/docs)", &TagAlias::ALL);
        assert_eq!(map.iter().next().unwrap().tag.alias, TagAlias::Refs);
    }

    #[test]
    fn unrelated_dollar_text_is_untouched() {
        let content = "prices: $100, $ref without parens, $unknown(x)";
        let (rewritten, map) = scan(content, &TagAlias::ALL);
        assert_eq!(map.len(), 0);
        assert_eq!(rewritten, content);
    }

    #[test]
    fn signatures_differ_per_tag_and_repeat_per_identical_tag() {
        let (_, map) = scan("$refs(/a) $refs(/b) $refs(/a)", &TagAlias::ALL);
        let sigs: Vec<String> = map.iter().map(|e| e.tag.signature()).collect();
        assert_ne!(sigs[0], sigs[1]);
        assert_eq!(sigs[0], sigs[2]);
    }

    #[test]
    fn bare_option_key_is_a_flag_not_a_positional() {
        let (_, map) = scan("$refs(prefix=/docs, depth)", &TagAlias::ALL);
        let entry = map.iter().next().unwrap();

        assert!(entry.tag.args.contains(&TagArg::Flag("depth".to_string())));
        assert_eq!(entry.tag.page_arg(), None);
        assert_eq!(entry.tag.option("prefix"), Some("/docs"));
    }

    #[test]
    fn keyed_option_detection() {
        let (_, map) = scan("$refs(/docs, grid=true)", &TagAlias::ALL);
        let entry = map.iter().next().unwrap();
        assert_eq!(
            entry.tag.args.last(),
            Some(&TagArg::Keyed { key: "grid".to_string(), value: "true".to_string() })
        );
    }
}

//! Crate-level error types for reference resolution.

/// All errors in wikiref carry enough context to produce a useful response
/// without a debugger. Caller errors (`MissingParameter`, `InvalidOption`,
/// `InvalidPattern`) surface before any store lookup; `PageNotFound`,
/// `AttachmentNotFound`, and `Forbidden` are discovered only after at least
/// one lookup and are never collapsed into each other, so a client can
/// distinguish "does not exist" from "exists but you cannot see it".
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No attachment with the given name or id exists under the page.
    #[error("attachment not found: `{file_name_or_id}` under {page_path}")]
    AttachmentNotFound {
        /// The name-or-id argument that matched nothing.
        file_name_or_id: String,
        /// Path of the page that was searched.
        page_path: String,
    },

    /// The viewer lacks access to the resolved page or attachment.
    #[error("forbidden: viewer cannot read {page_path}")]
    Forbidden {
        /// Path of the page the access check ran against.
        page_path: String,
    },

    /// A depth specification is malformed or out of range.
    #[error("invalid depth option: {reason}")]
    InvalidOption {
        /// Description of what was wrong with the specification.
        reason: String,
    },

    /// A name pattern option failed to compile.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The raw pattern as supplied by the caller.
        pattern: String,
        /// The compiler's rejection message.
        reason: String,
    },

    /// Underlying I/O error from config loading.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// A required request parameter is absent.
    #[error("missing parameter: {name}")]
    MissingParameter {
        /// Name of the absent parameter.
        name: String,
    },

    /// No page exists at the given path for this viewer.
    #[error("page not found: {path}")]
    PageNotFound {
        /// The path that resolved to nothing.
        path: String,
    },

    /// A collaborator store failed in a way this crate cannot interpret.
    #[error("store: {reason}")]
    Store {
        /// Description passed through from the store.
        reason: String,
    },

    /// TOML deserialization failed while loading config.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),
}

impl Error {
    /// The HTTP status a host router should respond with for this error.
    ///
    /// Caller errors map to 400, access failures to 403, missing pages and
    /// attachments to 404, and collaborator failures to 500.
    pub fn status(&self) -> u16 {
        return match self {
            Error::InvalidOption { .. }
            | Error::InvalidPattern { .. }
            | Error::MissingParameter { .. } => 400,
            Error::Forbidden { .. } => 403,
            Error::AttachmentNotFound { .. } | Error::PageNotFound { .. } => 404,
            Error::Io(_) | Error::Store { .. } | Error::TomlDe(_) => 500,
        };
    }
}

//! wikiref resolves inline `$ref(...)`-family markers embedded in wiki page
//! content into concrete attachment files, subject to viewer permissions,
//! and caches resolution results across successive renders of the same
//! content.
//!
//! The crate is a subsystem, not an application: page storage,
//! authentication, and final markup rendering belong to the host. Pages,
//! attachments, and identities arrive through the traits in [`store`]; the
//! host's rendering pipeline drives the [`pipeline::RefPreProcessor`] stage,
//! and its router exposes [`service::RefsService`] lookups, mapping typed
//! errors onto status codes via [`Error::status`].

pub mod cache;
pub mod config;
pub mod depth;
pub mod error;
pub mod memory;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod service;
pub mod store;
pub mod types;

pub use crate::cache::{ContextCache, ContextId, RenderStateCache};
pub use crate::config::Config;
pub use crate::depth::DepthRange;
pub use crate::error::Error;
pub use crate::pipeline::{PipelineStage, RefPreProcessor, RenderPass};
pub use crate::scanner::{TagAlias, TagContextMap, TagMatch, scan};
pub use crate::service::{RefRequest, RefsRequest, RefsService};
pub use crate::types::{Attachment, NamePattern, Page, PathScope, Viewer};

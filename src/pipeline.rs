//! Render pipeline seam: named stages and the reference pre-processor.
//!
//! The host rendering pipeline owns invocation order and concurrency; work
//! registers against named stages through a capability interface instead of
//! host-framework interceptor classes.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{ContextId, RenderStateCache};
use crate::scanner::{self, TagAlias, TagContextMap};

/// Stage name for a full (non-preview) render pass.
pub const STAGE_PRE_RENDER: &str = "preRender";
/// Stage name for a preview render pass.
pub const STAGE_PRE_RENDER_PREVIEW: &str = "preRenderPreview";

/// One unit of work registered against named pipeline stages.
pub trait PipelineStage {
    /// Whether this stage wants to run for the named pipeline point.
    fn handles(&self, stage: &str) -> bool;

    /// Transform one render pass. Must not block on anything beyond its own
    /// locks; the host may run passes for different contexts concurrently.
    fn apply(&self, pass: RenderPass) -> RenderPass;
}

/// State threaded through one render pass. Owned exclusively by the caller
/// of the pass; discarded wholesale if the render is abandoned.
#[derive(Debug)]
pub struct RenderPass {
    /// Page content, rewritten in place as stages run.
    pub content: String,
    /// Which rendering context this pass belongs to.
    pub context: ContextId,
    /// Placeholder-to-tag mapping produced by scanning. Fresh per pass.
    pub context_map: TagContextMap,
    /// Whether this is a preview pass. Preview passes never flush the
    /// state cache; full passes always do, before scanning.
    pub preview: bool,
}

impl RenderPass {
    /// A pass over `content` for `context`.
    pub fn new(context: ContextId, content: String, preview: bool) -> Self {
        Self {
            content,
            context,
            context_map: TagContextMap::default(),
            preview,
        }
    }
}

/// Pre-render stage that turns reference tags into placeholders and keeps
/// the per-context state cache honest: a full render flushes the context's
/// memoized resolution results before any scanning, a preview leaves them
/// for downstream consumers keyed on tag signatures.
pub struct RefPreProcessor<V> {
    aliases: Vec<TagAlias>,
    cache: Arc<RenderStateCache<V>>,
    max_scan_bytes: Option<u64>,
}

impl<V> RefPreProcessor<V> {
    /// A pre-processor scanning for `aliases`, flushing `cache` on full
    /// renders.
    pub fn new(aliases: Vec<TagAlias>, cache: Arc<RenderStateCache<V>>) -> Self {
        Self { aliases, cache, max_scan_bytes: None }
    }

    /// Skip scanning (tags stay literal) for content larger than `limit`
    /// bytes. Oversized content degrades the same way malformed tags do.
    pub fn with_scan_limit(mut self, limit: u64) -> Self {
        self.max_scan_bytes = Some(limit);
        self
    }

    fn oversized(&self, content: &str) -> bool {
        let Some(limit) = self.max_scan_bytes else {
            return false;
        };
        let bytes: u64 = content.len().try_into().unwrap_or(u64::MAX);
        bytes > limit
    }
}

impl<V> PipelineStage for RefPreProcessor<V> {
    fn handles(&self, stage: &str) -> bool {
        stage == STAGE_PRE_RENDER || stage == STAGE_PRE_RENDER_PREVIEW
    }

    fn apply(&self, mut pass: RenderPass) -> RenderPass {
        if !pass.preview {
            // Flush before any scanning for this pass, and only here: a full
            // render invalidates everything previews memoized.
            self.cache.clear_all(&pass.context);
        }

        if self.oversized(&pass.content) {
            debug!(context = %pass.context.0, bytes = pass.content.len(), "content over scan limit, left literal");
            return pass;
        }

        let (rewritten, map) = scanner::scan(&pass.content, &self.aliases);
        debug!(context = %pass.context.0, tags = map.len(), preview = pass.preview, "scanned render pass");
        pass.content = rewritten;
        pass.context_map = map;
        pass
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{
        PipelineStage as _, RefPreProcessor, RenderPass, STAGE_PRE_RENDER,
        STAGE_PRE_RENDER_PREVIEW,
    };
    use crate::cache::{ContextId, RenderStateCache};
    use crate::scanner::TagAlias;

    fn ctx() -> ContextId {
        ContextId("page-1:revision-9".to_string())
    }

    fn processor(cache: &Arc<RenderStateCache<String>>) -> RefPreProcessor<String> {
        RefPreProcessor::new(TagAlias::ALL.to_vec(), Arc::clone(cache))
    }

    #[test]
    fn handles_both_pre_render_stages_and_nothing_else() {
        let cache = Arc::new(RenderStateCache::new());
        let stage = processor(&cache);
        assert!(stage.handles(STAGE_PRE_RENDER));
        assert!(stage.handles(STAGE_PRE_RENDER_PREVIEW));
        assert!(!stage.handles("postRender"));
    }

    #[test]
    fn full_render_flushes_the_context_cache_before_scanning() {
        let cache = Arc::new(RenderStateCache::new());
        cache.cache(&ctx()).insert("sig".to_string(), "memoized".to_string());

        let stage = processor(&cache);
        let pass = stage.apply(RenderPass::new(ctx(), "$refs(/docs)".to_string(), false));

        assert!(cache.cache(&ctx()).is_empty());
        assert_eq!(pass.context_map.len(), 1);
    }

    #[test]
    fn preview_render_keeps_prior_entries() {
        let cache = Arc::new(RenderStateCache::new());
        cache.cache(&ctx()).insert("sig".to_string(), "memoized".to_string());

        let stage = processor(&cache);
        let first = stage.apply(RenderPass::new(ctx(), "$refs(/docs)".to_string(), true));
        assert_eq!(first.context_map.len(), 1);

        // A second preview for the same context still observes the entry.
        let _second = stage.apply(RenderPass::new(ctx(), "$refs(/docs)".to_string(), true));
        assert_eq!(
            cache.cache(&ctx()).get("sig"),
            Some("memoized".to_string())
        );
    }

    #[test]
    fn oversized_content_is_left_literal() {
        let cache = Arc::new(RenderStateCache::new());
        let stage = processor(&cache).with_scan_limit(8);
        let content = "$refs(/docs) plus padding beyond the limit".to_string();

        let pass = stage.apply(RenderPass::new(ctx(), content.clone(), true));
        assert_eq!(pass.content, content);
        assert!(pass.context_map.is_empty());
    }
}

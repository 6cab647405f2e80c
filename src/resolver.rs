//! Detail page → ranked sprite candidates, cached per detail URL.

use crate::fetch::PageFetcher;
use crate::page::{EMBED_ATTRIBUTE, EMBED_SELECTOR};
use crate::providers::{ProviderRegistry, SpriteCandidate};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Candidates for one detail page, lowest frame count first.
pub type CandidateList = Arc<[SpriteCandidate]>;

static EMBEDS: Lazy<Selector> = Lazy::new(|| Selector::parse(EMBED_SELECTOR).unwrap());

pub struct SpriteResolver {
    fetcher: Arc<dyn PageFetcher>,
    registry: Arc<ProviderRegistry>,
    cache: Mutex<HashMap<String, CandidateList>>,
}

impl SpriteResolver {
    pub fn new(fetcher: Arc<dyn PageFetcher>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            fetcher,
            registry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached(&self, detail_url: &str) -> Option<CandidateList> {
        self.lock_cache().get(detail_url).cloned()
    }

    /// Ranked candidates for `detail_url`.
    ///
    /// A cached result is returned without suspending. A failed fetch counts
    /// as a page with zero candidates and is cached as empty like one.
    pub async fn resolve(&self, detail_url: &str) -> CandidateList {
        if let Some(hit) = self.cached(detail_url) {
            debug!(%detail_url, candidates = hit.len(), "Sprite cache hit");
            return hit;
        }

        let candidates: CandidateList = match self.fetcher.fetch_page(detail_url).await {
            Ok(html) => extract_candidates(&html, &self.registry).into(),
            Err(err) => {
                warn!(%detail_url, "Detail page fetch failed: {err}");
                Arc::from(Vec::new())
            }
        };
        debug!(
            %detail_url,
            candidates = candidates.len(),
            providers = ?candidates.iter().map(|c| c.provider.as_str()).collect::<Vec<_>>(),
            "Resolved sprite candidates"
        );
        // Concurrent resolutions of one URL both fetch; the first stored list stays.
        self.lock_cache()
            .entry(detail_url.to_string())
            .or_insert(candidates)
            .clone()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, CandidateList>> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Parse detail page markup into candidates: document order, first embed per
/// provider wins, then a stable sort by ascending frame count.
pub fn extract_candidates(html: &str, registry: &ProviderRegistry) -> Vec<SpriteCandidate> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for span in document.select(&EMBEDS) {
        let Some(embed_url) = span.value().attr(EMBED_ATTRIBUTE) else {
            continue;
        };
        let embed_url = embed_url.trim();
        if embed_url.is_empty() {
            continue;
        }
        let Some(candidate) = registry.match_embed(embed_url) else {
            debug!(%embed_url, "Skipping unsupported embed");
            continue;
        };
        if !seen.insert(candidate.provider.clone()) {
            continue;
        }
        candidates.push(candidate);
    }

    candidates.sort_by_key(|c| c.frame_count);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::testing::{ScriptedFetcher, detail_page};

    fn resolver(fetcher: &Arc<ScriptedFetcher>) -> SpriteResolver {
        SpriteResolver::new(fetcher.clone(), ProviderRegistry::builtin())
    }

    #[test]
    fn dedupes_by_provider_and_sorts_by_frames() {
        let html = detail_page(&[
            "https://lulustream.com/e/aaa",
            "https://cdnstream.top/e/bbb",
            "https://lulustream.com/e/ccc",
        ]);
        let candidates = extract_candidates(&html, &ProviderRegistry::builtin());
        let summary: Vec<_> = candidates
            .iter()
            .map(|c| (c.provider.as_str(), c.external_id.as_str(), c.frame_count))
            .collect();
        assert_eq!(
            summary,
            vec![("lulustream", "aaa", 16), ("cdnstream", "bbb", 100)]
        );
    }

    #[test]
    fn sort_is_stable_and_unknown_embeds_are_skipped() {
        let html = detail_page(&[
            "https://cdnvids.top/embed/v1",
            "https://unknown.test/e/zzz",
            "https://short.icu/s1",
            "https://bysezoxexe.com/e/b1",
            "",
        ]);
        let candidates = extract_candidates(&html, &ProviderRegistry::builtin());
        let providers: Vec<_> = candidates.iter().map(|c| c.provider.as_str()).collect();
        assert_eq!(providers, vec!["bysezoxexe", "shorticu", "cdnvids"]);
        assert!(
            candidates
                .windows(2)
                .all(|pair| pair[0].frame_count <= pair[1].frame_count)
        );
    }

    #[test]
    fn only_change_video_spans_count() {
        let html = r#"<html><body>
            <div data-embed="https://lulustream.com/e/nope"></div>
            <span class="change-video">no attribute</span>
            <span class="change-video active" data-embed="https://short.icu/yes">x</span>
        </body></html>"#;
        let candidates = extract_candidates(html, &ProviderRegistry::builtin());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].external_id, "yes");
    }

    #[tokio::test]
    async fn second_resolve_hits_cache_without_fetching() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let url = "https://site.test/v/1";
        fetcher.respond(url, Ok(detail_page(&["https://lulustream.com/e/aaa"])));
        let resolver = resolver(&fetcher);

        let first = resolver.resolve(url).await;
        let second = resolver.resolve(url).await;

        assert_eq!(first.len(), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls(url), 1);
    }

    #[tokio::test]
    async fn page_without_embeds_is_cached_as_empty() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let url = "https://site.test/v/empty";
        fetcher.respond(url, Ok("<html><body>nothing here</body></html>".to_string()));
        let resolver = resolver(&fetcher);

        assert!(resolver.resolve(url).await.is_empty());
        assert!(resolver.resolve(url).await.is_empty());
        assert_eq!(fetcher.calls(url), 1);
        assert!(resolver.cached(url).is_some());
    }

    #[tokio::test]
    async fn http_error_is_cached_as_empty() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        let url = "https://site.test/v/missing";
        fetcher.respond(url, Err(TransportError::Status(404)));
        let resolver = resolver(&fetcher);

        let first = resolver.resolve(url).await;
        assert!(first.is_empty());
        assert!(resolver.cached(url).is_some());

        // The page recovering later does not replace the stored result.
        fetcher.respond(url, Ok(detail_page(&["https://short.icu/later"])));
        let second = resolver.resolve(url).await;
        assert!(second.is_empty());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls(url), 1);
    }
}

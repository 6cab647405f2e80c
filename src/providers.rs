//! Known embed providers and the sprite sheets they publish.
//!
//! Each provider exposes a trickplay sprite sheet whose URL can be derived
//! from the id in its embed URL. The table order is the match priority.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ts_rs::TS;

/// Static description of one provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderSpec {
    pub name: &'static str,
    /// Regex with one capture group holding the external id.
    pub pattern: &'static str,
    /// URL template; `{id}` is replaced with the captured id.
    pub sprite_template: &'static str,
    /// Present when the full sprite sheet is stretched and a smaller,
    /// undistorted sheet must be used to learn the frame aspect ratio.
    pub preview: Option<PreviewTemplate>,
    pub cols: u32,
    pub rows: u32,
    pub frame_count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct PreviewTemplate {
    pub template: &'static str,
    pub cols: u32,
    pub rows: u32,
}

pub const BUILTIN_PROVIDERS: &[ProviderSpec] = &[
    ProviderSpec {
        name: "lulustream",
        pattern: r"^https?://lulustream\.com/e/([a-zA-Z0-9]+)",
        sprite_template: "https://img.lulucdn.com/{id}_xt.jpg",
        preview: None,
        cols: 4,
        rows: 4,
        frame_count: 16,
    },
    ProviderSpec {
        name: "bysezoxexe",
        pattern: r"^https?://bysezoxexe\.com/e/([a-zA-Z0-9]+)",
        sprite_template: "https://img-place.com/{id}_xt.jpg",
        preview: None,
        cols: 4,
        rows: 4,
        frame_count: 16,
    },
    ProviderSpec {
        name: "cdnstream",
        pattern: r"^https?://cdnstream\.top/e/([a-zA-Z0-9]+)",
        sprite_template: "https://pixoraa.cc/{id}0000.jpg",
        preview: Some(PreviewTemplate {
            template: "https://pixoraa.cc/{id}_xt.jpg",
            cols: 2,
            rows: 2,
        }),
        cols: 10,
        rows: 10,
        frame_count: 100,
    },
    ProviderSpec {
        name: "cdnvids",
        pattern: r"^https?://cdnvids\.top/embed/([a-zA-Z0-9]+)",
        sprite_template: "https://pixibay.cc/{id}0000.jpg",
        preview: Some(PreviewTemplate {
            template: "https://pixibay.cc/{id}_xt.jpg",
            cols: 2,
            rows: 2,
        }),
        cols: 10,
        rows: 10,
        frame_count: 100,
    },
    ProviderSpec {
        name: "shorticu",
        pattern: r"^https?://short\.icu/([a-zA-Z0-9]+)",
        sprite_template: "https://img.freeimagecdn.net/image/{id}/0.jpg",
        preview: None,
        cols: 6,
        rows: 5,
        frame_count: 30,
    },
];

static BUILTIN: Lazy<Arc<ProviderRegistry>> =
    Lazy::new(|| Arc::new(ProviderRegistry::new(BUILTIN_PROVIDERS).unwrap()));

/// Sprite sheet reference derived from one matched embed URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SpriteCandidate {
    pub provider: String,
    pub external_id: String,
    pub sprite_url: String,
    pub cols: u32,
    pub rows: u32,
    pub frame_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub preview: Option<PreviewSheet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PreviewSheet {
    pub url: String,
    pub cols: u32,
    pub rows: u32,
}

#[derive(Debug)]
struct CompiledProvider {
    spec: ProviderSpec,
    regex: Regex,
}

/// Ordered, compiled provider table.
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: Vec<CompiledProvider>,
}

impl ProviderRegistry {
    pub fn new(specs: &[ProviderSpec]) -> Result<Self> {
        let providers = specs
            .iter()
            .map(|spec| {
                let regex = Regex::new(spec.pattern)
                    .with_context(|| format!("invalid pattern for provider {}", spec.name))?;
                Ok(CompiledProvider { spec: *spec, regex })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { providers })
    }

    /// Shared registry built from [`BUILTIN_PROVIDERS`].
    pub fn builtin() -> Arc<Self> {
        BUILTIN.clone()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.providers.iter().map(|p| p.spec.name)
    }

    pub fn match_embed(&self, embed_url: &str) -> Option<SpriteCandidate> {
        self.providers.iter().find_map(|provider| {
            let id = provider.regex.captures(embed_url)?.get(1)?.as_str();
            if id.is_empty() {
                return None;
            }
            Some(build_candidate(&provider.spec, id))
        })
    }
}

fn build_candidate(spec: &ProviderSpec, id: &str) -> SpriteCandidate {
    SpriteCandidate {
        provider: spec.name.to_string(),
        external_id: id.to_string(),
        sprite_url: spec.sprite_template.replace("{id}", id),
        cols: spec.cols,
        rows: spec.rows,
        frame_count: spec.frame_count,
        preview: spec.preview.map(|preview| PreviewSheet {
            url: preview.template.replace("{id}", id),
            cols: preview.cols,
            rows: preview.rows,
        }),
    }
}

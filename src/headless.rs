//! A one-item [`Page`] for driving the hover pipeline without a browser.
//!
//! The document holds a single listing item linking to a detail page, with
//! one thumbnail image filling it. Overlay mutations are recorded so the CLI
//! can print what a browser host would have rendered.

use crate::page::{NodeId, OverlayId, OverlayView, Page, Rect};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Mutex;
use tracing::debug;
use url::Url;

/// What happened to the overlay, in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum OverlayEvent {
    Mounted { view: OverlayView },
    Updated { view: OverlayView },
    Removed,
}

pub struct HeadlessPage {
    detail_url: Url,
    bounds: Rect,
    duration: Option<String>,
    relative: Mutex<bool>,
    events: Mutex<Vec<OverlayEvent>>,
    next_overlay: Mutex<u64>,
}

impl HeadlessPage {
    pub const ITEM: NodeId = NodeId(1);
    pub const THUMBNAIL: NodeId = NodeId(2);

    pub fn new(detail_url: &str, width: f64, height: f64, duration: Option<String>) -> Result<Self> {
        let detail_url =
            Url::parse(detail_url).with_context(|| format!("Invalid detail URL {detail_url}"))?;
        Ok(Self {
            detail_url,
            bounds: Rect {
                left: 0.0,
                top: 0.0,
                width,
                height,
            },
            duration,
            relative: Mutex::new(false),
            events: Mutex::new(Vec::new()),
            next_overlay: Mutex::new(0),
        })
    }

    pub fn events(&self) -> Vec<OverlayEvent> {
        lock(&self.events).clone()
    }

    fn record(&self, event: OverlayEvent) {
        lock(&self.events).push(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl Page for HeadlessPage {
    fn base_url(&self) -> Url {
        self.detail_url.clone()
    }

    fn closest_item(&self, node: NodeId) -> Option<NodeId> {
        (node == Self::ITEM || node == Self::THUMBNAIL).then_some(Self::ITEM)
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || (ancestor == Self::ITEM && node == Self::THUMBNAIL)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        (node == Self::THUMBNAIL).then_some(Self::ITEM)
    }

    fn first_link_href(&self, item: NodeId) -> Option<String> {
        (item == Self::ITEM).then(|| self.detail_url.to_string())
    }

    fn first_image(&self, item: NodeId) -> Option<NodeId> {
        (item == Self::ITEM).then_some(Self::THUMBNAIL)
    }

    fn first_thumb_container(&self, _item: NodeId) -> Option<NodeId> {
        None
    }

    fn duration_text(&self, item: NodeId) -> Option<String> {
        if item == Self::ITEM {
            self.duration.clone()
        } else {
            None
        }
    }

    fn is_static(&self, node: NodeId) -> bool {
        !(node == Self::ITEM && *lock(&self.relative))
    }

    fn make_relative(&self, node: NodeId) {
        if node == Self::ITEM {
            *lock(&self.relative) = true;
        }
    }

    fn bounding_rect(&self, _node: NodeId) -> Rect {
        self.bounds
    }

    fn mount_overlay(&self, _parent: NodeId, view: &OverlayView) -> OverlayId {
        let mut next = lock(&self.next_overlay);
        *next += 1;
        debug!(sprite = %view.sprite_url, "Overlay mounted");
        self.record(OverlayEvent::Mounted { view: view.clone() });
        OverlayId(*next)
    }

    fn update_overlay(&self, _overlay: OverlayId, view: &OverlayView) {
        self.record(OverlayEvent::Updated { view: view.clone() });
    }

    fn remove_overlay(&self, _overlay: OverlayId) {
        self.record(OverlayEvent::Removed);
    }
}

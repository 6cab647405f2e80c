//! In-memory stand-ins for the host seams, shared by unit tests.

use crate::error::{ImageLoadError, TransportError};
use crate::fetch::PageFetcher;
use crate::image_probe::{ImageDimensions, ImageProbe};
use crate::page::{NodeId, OverlayId, OverlayView, Page, Rect};
use crate::scheduler::{FrameCallback, FrameHandle, FrameScheduler};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

/// Detail page markup declaring `embeds` as server-switch spans.
pub(crate) fn detail_page(embeds: &[&str]) -> String {
    let spans: String = embeds
        .iter()
        .map(|embed| {
            format!(r#"<span class="change-video" data-embed="{embed}">Server</span>"#)
        })
        .collect();
    format!("<html><body><div class=\"servers\">{spans}</div></body></html>")
}

/// Yield to other tasks until `condition` holds.
pub(crate) async fn settle(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never became true");
}

#[derive(Default)]
pub(crate) struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Result<String, TransportError>>>,
    calls: Mutex<HashMap<String, usize>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ScriptedFetcher {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &str, response: Result<String, TransportError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    /// Hold fetches of `url` until the returned gate is notified.
    pub(crate) fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(url.to_string(), gate.clone());
        gate
    }

    pub(crate) fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, TransportError> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let gate = self.gates.lock().unwrap().get(url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(TransportError::Network(format!("no script for {url}"))))
    }
}

#[derive(Default)]
pub(crate) struct FakeProbe {
    sizes: Mutex<HashMap<String, ImageDimensions>>,
    loads: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeProbe {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, url: &str, width: u32, height: u32) {
        self.sizes
            .lock()
            .unwrap()
            .insert(url.to_string(), ImageDimensions { width, height });
    }

    pub(crate) fn gate(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(url.to_string(), gate.clone());
        gate
    }

    /// URLs requested so far, in order.
    pub(crate) fn loads(&self) -> Vec<String> {
        self.loads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProbe for FakeProbe {
    async fn load(&self, url: &str) -> Result<ImageDimensions, ImageLoadError> {
        self.loads.lock().unwrap().push(url.to_string());
        let gate = self.gates.lock().unwrap().get(url).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.sizes
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .ok_or_else(|| ImageLoadError::Status(404))
    }
}

/// Frame scheduler that only runs callbacks on [`ManualFrames::flush`].
#[derive(Default)]
pub(crate) struct ManualFrames {
    next_id: Mutex<u64>,
    queue: Mutex<Vec<(FrameHandle, FrameCallback)>>,
}

impl ManualFrames {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    pub(crate) fn flush(&self) {
        let due = std::mem::take(&mut *self.queue.lock().unwrap());
        for (_, callback) in due {
            callback();
        }
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        let handle = FrameHandle(*next);
        self.queue.lock().unwrap().push((handle, callback));
        handle
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queue.lock().unwrap().retain(|(h, _)| *h != handle);
    }
}

#[derive(Clone)]
struct FakeNode {
    parent: Option<NodeId>,
    item: bool,
    href: Option<String>,
    image: Option<NodeId>,
    thumb: Option<NodeId>,
    duration: Option<String>,
    is_static: bool,
    rect: Rect,
}

impl FakeNode {
    fn child_of(parent: Option<NodeId>, rect: Rect) -> Self {
        Self {
            parent,
            item: false,
            href: None,
            image: None,
            thumb: None,
            duration: None,
            is_static: true,
            rect,
        }
    }
}

#[derive(Default)]
struct OverlayLog {
    next_id: u64,
    live: HashMap<OverlayId, OverlayView>,
    mounts: Vec<(NodeId, OverlayView)>,
    updates: Vec<OverlayView>,
    removed: Vec<OverlayId>,
}

/// Listing document rooted at `https://site.test/`.
///
/// Items are 320x240 at (10, 100); their thumbnail wrapper and image are
/// 320x180 at the same origin. Every node starts out statically positioned.
pub(crate) struct FakePage {
    base: Url,
    nodes: Mutex<HashMap<NodeId, FakeNode>>,
    relative: Mutex<Vec<NodeId>>,
    overlays: Mutex<OverlayLog>,
}

const ITEM_RECT: Rect = Rect {
    left: 10.0,
    top: 100.0,
    width: 320.0,
    height: 240.0,
};

const THUMB_RECT: Rect = Rect {
    left: 10.0,
    top: 100.0,
    width: 320.0,
    height: 180.0,
};

impl FakePage {
    pub(crate) fn new() -> Self {
        Self {
            base: Url::parse("https://site.test/").unwrap(),
            nodes: Mutex::new(HashMap::new()),
            relative: Mutex::new(Vec::new()),
            overlays: Mutex::new(OverlayLog::default()),
        }
    }

    /// Item `id` with a wrapper at `id + 1` holding an image at `id + 2`.
    pub(crate) fn add_item(&self, id: u64, href: &str, duration: &str) -> NodeId {
        let item = self.add_bare_item(id, href);
        let wrapper = NodeId(id + 1);
        let image = NodeId(id + 2);
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(wrapper, FakeNode::child_of(Some(item), THUMB_RECT));
        nodes.insert(image, FakeNode::child_of(Some(wrapper), THUMB_RECT));
        if let Some(node) = nodes.get_mut(&item) {
            node.image = Some(image);
            node.duration = Some(duration.to_string());
        }
        item
    }

    /// Item `id` with a link and nothing else.
    pub(crate) fn add_bare_item(&self, id: u64, href: &str) -> NodeId {
        let item = NodeId(id);
        let mut node = FakeNode::child_of(None, ITEM_RECT);
        node.item = true;
        node.href = Some(href.to_string());
        self.nodes.lock().unwrap().insert(item, node);
        item
    }

    pub(crate) fn add_thumb_container(&self, item: NodeId, container: NodeId) {
        let mut nodes = self.nodes.lock().unwrap();
        nodes.insert(container, FakeNode::child_of(Some(item), THUMB_RECT));
        if let Some(node) = nodes.get_mut(&item) {
            node.thumb = Some(container);
        }
    }

    /// Plain node, optionally nested under `parent`.
    pub(crate) fn add_node(&self, id: u64, parent: Option<NodeId>) -> NodeId {
        let node = NodeId(id);
        self.nodes
            .lock()
            .unwrap()
            .insert(node, FakeNode::child_of(parent, Rect::default()));
        node
    }

    pub(crate) fn set_static(&self, node: NodeId, is_static: bool) {
        if let Some(n) = self.nodes.lock().unwrap().get_mut(&node) {
            n.is_static = is_static;
        }
    }

    pub(crate) fn set_rect(&self, node: NodeId, rect: Rect) {
        if let Some(n) = self.nodes.lock().unwrap().get_mut(&node) {
            n.rect = rect;
        }
    }

    pub(crate) fn made_relative(&self) -> Vec<NodeId> {
        self.relative.lock().unwrap().clone()
    }

    pub(crate) fn mounts(&self) -> Vec<(NodeId, OverlayView)> {
        self.overlays.lock().unwrap().mounts.clone()
    }

    pub(crate) fn updates(&self) -> Vec<OverlayView> {
        self.overlays.lock().unwrap().updates.clone()
    }

    pub(crate) fn removed(&self) -> Vec<OverlayId> {
        self.overlays.lock().unwrap().removed.clone()
    }

    /// Overlays currently attached to the document.
    pub(crate) fn mounted_count(&self) -> usize {
        self.overlays.lock().unwrap().live.len()
    }

    fn node(&self, node: NodeId) -> Option<FakeNode> {
        self.nodes.lock().unwrap().get(&node).cloned()
    }
}

impl Page for FakePage {
    fn base_url(&self) -> Url {
        self.base.clone()
    }

    fn closest_item(&self, node: NodeId) -> Option<NodeId> {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            let n = self.node(id)?;
            if n.item {
                return Some(id);
            }
            cursor = n.parent;
        }
        None
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.parent(id);
        }
        false
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn first_link_href(&self, item: NodeId) -> Option<String> {
        self.node(item).and_then(|n| n.href)
    }

    fn first_image(&self, item: NodeId) -> Option<NodeId> {
        self.node(item).and_then(|n| n.image)
    }

    fn first_thumb_container(&self, item: NodeId) -> Option<NodeId> {
        self.node(item).and_then(|n| n.thumb)
    }

    fn duration_text(&self, item: NodeId) -> Option<String> {
        self.node(item).and_then(|n| n.duration)
    }

    fn is_static(&self, node: NodeId) -> bool {
        self.node(node).is_none_or(|n| n.is_static)
    }

    fn make_relative(&self, node: NodeId) {
        self.set_static(node, false);
        self.relative.lock().unwrap().push(node);
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.node(node).map(|n| n.rect).unwrap_or_default()
    }

    fn mount_overlay(&self, parent: NodeId, view: &OverlayView) -> OverlayId {
        let mut log = self.overlays.lock().unwrap();
        log.next_id += 1;
        let id = OverlayId(log.next_id);
        log.live.insert(id, view.clone());
        log.mounts.push((parent, view.clone()));
        id
    }

    fn update_overlay(&self, overlay: OverlayId, view: &OverlayView) {
        let mut guard = self.overlays.lock().unwrap();
        let log = &mut *guard;
        if let Some(live) = log.live.get_mut(&overlay) {
            *live = view.clone();
            log.updates.push(view.clone());
        }
    }

    fn remove_overlay(&self, overlay: OverlayId) {
        let mut log = self.overlays.lock().unwrap();
        if log.live.remove(&overlay).is_some() {
            log.removed.push(overlay);
        }
    }
}

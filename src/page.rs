//! The slice of the host document the hover preview reads and mutates.
//!
//! A content-script host implements [`Page`] over the live DOM. Lookups are
//! phrased in terms of the listing structure (items, links, thumbnails) rather
//! than generic selectors; the selector constants below document what a host
//! is expected to match and are reused by the static listing scanner.

use crate::geometry::FrameRect;
use serde::Serialize;
use url::Url;

/// Qualifying listing item.
pub const ITEM_SELECTOR: &str = "article.loop-video";
/// Detail link inside an item.
pub const LINK_SELECTOR: &str = "a[href]";
pub const IMAGE_SELECTOR: &str = "img";
/// Thumbnail fallback when an item carries no `<img>`.
pub const THUMB_SELECTOR: &str = r#".thumb, .thumbnail, [class*="thumb"]"#;
pub const DURATION_SELECTOR: &str = ".post-thumbnail .duration";
/// Embed declarations on a detail page.
pub const EMBED_SELECTOR: &str = "span.change-video[data-embed]";
pub const EMBED_ATTRIBUTE: &str = "data-embed";

pub const CONTAINER_CLASS: &str = "lp-trickplay-container";
pub const LAYER_CLASS: &str = "lp-trickplay-overlay";
pub const TIME_CLASS: &str = "lp-trickplay-time";

/// Opaque handle to a node owned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Handle to a mounted overlay subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

/// Viewport-relative box, as `getBoundingClientRect` reports it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Everything the host needs to render the overlay.
///
/// The container is positioned relative to its positioned parent and sized to
/// the thumbnail. The sprite layer inside it is placed by `layer` and shows
/// one grid cell through `background_size`/`background_position`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayView {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub layer: FrameRect,
    pub sprite_url: String,
    pub background_size: (u32, u32),
    pub background_position: (f64, f64),
    pub time_label: String,
}

impl OverlayView {
    pub fn background_image_css(&self) -> String {
        format!("url({})", self.sprite_url)
    }

    pub fn background_size_css(&self) -> String {
        format!("{}% {}%", self.background_size.0, self.background_size.1)
    }

    pub fn background_position_css(&self) -> String {
        format!(
            "{}% {}%",
            self.background_position.0, self.background_position.1
        )
    }
}

/// Host document surface.
///
/// Methods are synchronous and may be called while the controller holds its
/// session lock, so implementations must not call back into the controller.
pub trait Page: Send + Sync {
    /// Origin used to resolve relative detail links.
    fn base_url(&self) -> Url;

    /// Nearest ancestor-or-self matching [`ITEM_SELECTOR`].
    fn closest_item(&self, node: NodeId) -> Option<NodeId>;

    /// Whether `node` is `ancestor` or lies inside its subtree.
    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// `href` attribute of the first [`LINK_SELECTOR`] match inside `item`.
    fn first_link_href(&self, item: NodeId) -> Option<String>;

    fn first_image(&self, item: NodeId) -> Option<NodeId>;

    fn first_thumb_container(&self, item: NodeId) -> Option<NodeId>;

    /// Raw text of the [`DURATION_SELECTOR`] element inside `item`.
    fn duration_text(&self, item: NodeId) -> Option<String>;

    /// Whether the computed `position` of `node` is `static`.
    fn is_static(&self, node: NodeId) -> bool;

    /// Force `position: relative` on `node`.
    fn make_relative(&self, node: NodeId);

    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// Append a rendered overlay to `parent`.
    fn mount_overlay(&self, parent: NodeId, view: &OverlayView) -> OverlayId;

    fn update_overlay(&self, overlay: OverlayId, view: &OverlayView);

    fn remove_overlay(&self, overlay: OverlayId);
}

/// Thumbnail of an item: its first image, else a thumb-classed element,
/// else the item itself.
pub fn find_thumbnail(page: &dyn Page, item: NodeId) -> NodeId {
    page.first_image(item)
        .or_else(|| page.first_thumb_container(item))
        .unwrap_or(item)
}

/// Nearest non-static ancestor of `thumbnail` up to `item`, falling back to
/// `item` and forcing it to relative positioning when it is static.
pub fn positioning_parent(page: &dyn Page, thumbnail: NodeId, item: NodeId) -> NodeId {
    let mut cursor = if thumbnail == item {
        None
    } else {
        page.parent(thumbnail)
    };
    let mut chosen = item;
    while let Some(node) = cursor {
        if node == item {
            break;
        }
        if !page.is_static(node) {
            chosen = node;
            break;
        }
        cursor = page.parent(node);
    }
    if page.is_static(chosen) {
        page.make_relative(chosen);
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePage;

    #[test]
    fn thumbnail_prefers_image_then_thumb_class_then_item() {
        let page = FakePage::new();
        let with_img = page.add_item(10, "/v/1", "1:00");
        assert_eq!(find_thumbnail(&page, with_img), NodeId(12));

        let bare = page.add_bare_item(20, "/v/2");
        assert_eq!(find_thumbnail(&page, bare), bare);

        let thumbed = page.add_bare_item(30, "/v/3");
        page.add_thumb_container(thumbed, NodeId(31));
        assert_eq!(find_thumbnail(&page, thumbed), NodeId(31));
    }

    #[test]
    fn positioning_walks_to_first_non_static_ancestor() {
        let page = FakePage::new();
        let item = page.add_item(10, "/v/1", "1:00");
        page.set_static(NodeId(11), false);
        assert_eq!(positioning_parent(&page, NodeId(12), item), NodeId(11));
        assert!(page.made_relative().is_empty());
    }

    #[test]
    fn static_chain_falls_back_to_item_and_forces_relative() {
        let page = FakePage::new();
        let item = page.add_item(10, "/v/1", "1:00");
        assert_eq!(positioning_parent(&page, NodeId(12), item), item);
        assert_eq!(page.made_relative(), vec![item]);
    }

    #[test]
    fn css_helpers_render_percentages() {
        let view = OverlayView {
            left: 0.0,
            top: 0.0,
            width: 320.0,
            height: 180.0,
            layer: FrameRect::fill(320.0, 180.0),
            sprite_url: "https://img.test/a.jpg".to_string(),
            background_size: (400, 400),
            background_position: (100.0, 50.0),
            time_label: "0:00 / 1:00".to_string(),
        };
        assert_eq!(view.background_image_css(), "url(https://img.test/a.jpg)");
        assert_eq!(view.background_size_css(), "400% 400%");
        assert_eq!(view.background_position_css(), "100% 50%");
    }
}

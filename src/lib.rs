//! Hover trick-play previews for video listing pages.
//!
//! Hovering a listing item resolves its detail page to ranked sprite sheets,
//! mounts an overlay over the thumbnail and scrubs through the sheet as the
//! pointer moves. The host document, the network and the paint clock sit
//! behind the [`page::Page`], [`fetch::PageFetcher`], [`image_probe::ImageProbe`]
//! and [`scheduler::FrameScheduler`] traits.

pub mod cancellation;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod headless;
pub mod image_probe;
pub mod listing;
pub mod page;
pub mod preferences;
pub mod providers;
pub mod resolver;
pub mod router;
pub mod scheduler;
pub mod timecode;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{HoverController, HoverOutcome, HoverTicket, SessionPhase};
pub use providers::{ProviderRegistry, SpriteCandidate};
pub use resolver::SpriteResolver;
pub use router::{EventRouter, PointerEvent, RouteEffect};

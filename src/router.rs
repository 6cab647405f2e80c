//! Document-level pointer delegation.
//!
//! One router sees every pointer event for the page and tracks the single
//! qualifying item under the pointer, so dynamically inserted items need no
//! listener registration of their own.

use crate::controller::{HoverController, HoverOutcome};
use crate::page::{NodeId, Page};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Over {
        target: NodeId,
    },
    Move {
        client_x: f64,
    },
    Out {
        target: NodeId,
        /// Node the pointer moved to, if it is still inside the document.
        related: Option<NodeId>,
    },
}

#[derive(Debug)]
pub enum RouteEffect {
    SessionStarted(JoinHandle<HoverOutcome>),
    SessionEnded,
    FrameRequested,
    Ignored,
}

pub struct EventRouter {
    controller: HoverController,
    page: Arc<dyn Page>,
    hovered: Mutex<Option<NodeId>>,
}

impl EventRouter {
    pub fn new(controller: HoverController, page: Arc<dyn Page>) -> Self {
        Self {
            controller,
            page,
            hovered: Mutex::new(None),
        }
    }

    pub fn hovered(&self) -> Option<NodeId> {
        *self.lock()
    }

    /// Route one pointer event. Must be called from within a tokio runtime.
    pub fn handle(&self, event: PointerEvent) -> RouteEffect {
        match event {
            PointerEvent::Over { target } => self.on_over(target),
            PointerEvent::Move { client_x } => match self.hovered() {
                Some(item) if self.controller.pointer_move(item, client_x) => {
                    RouteEffect::FrameRequested
                }
                _ => RouteEffect::Ignored,
            },
            PointerEvent::Out { target, related } => self.on_out(target, related),
        }
    }

    /// Hook for document mutations. Delegation already covers inserted items.
    pub fn on_mutation(&self) {
        trace!("Document mutated");
    }

    fn on_over(&self, target: NodeId) -> RouteEffect {
        let item = self.page.closest_item(target);
        let mut hovered = self.lock();
        match (item, *hovered) {
            (Some(item), Some(current)) if item == current => RouteEffect::Ignored,
            (Some(item), _) => {
                *hovered = Some(item);
                drop(hovered);
                debug!(item = item.0, "Pointer entered item");
                // Claim the slot now so a leave routed before the task runs ends it.
                let ticket = self.controller.start(item);
                let controller = self.controller.clone();
                RouteEffect::SessionStarted(tokio::spawn(async move {
                    controller.run(ticket).await
                }))
            }
            (None, Some(previous)) => {
                *hovered = None;
                drop(hovered);
                debug!(item = previous.0, "Pointer moved off items");
                self.controller.pointer_leave();
                RouteEffect::SessionEnded
            }
            (None, None) => RouteEffect::Ignored,
        }
    }

    fn on_out(&self, target: NodeId, related: Option<NodeId>) -> RouteEffect {
        let mut hovered = self.lock();
        let Some(item) = *hovered else {
            return RouteEffect::Ignored;
        };
        if !self.page.contains(item, target) {
            return RouteEffect::Ignored;
        }
        if related.is_some_and(|node| self.page.contains(item, node)) {
            return RouteEffect::Ignored;
        }
        *hovered = None;
        drop(hovered);
        debug!(item = item.0, "Pointer left item");
        self.controller.pointer_leave();
        RouteEffect::SessionEnded
    }

    fn lock(&self) -> MutexGuard<'_, Option<NodeId>> {
        match self.hovered.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

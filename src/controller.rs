//! Hover session state machine.
//!
//! Exactly one session lives in the controller's slot. Starting a session
//! synchronously tears down the previous one before any new async work
//! begins. Every await in the pipeline races the session's cancellation
//! token, and every continuation re-checks that it still owns the slot before
//! touching the page, so stale work is dropped rather than applied.
//!
//! ```text
//! Idle -> Resolving -> Active(0) -> Upgrading(1) -> ... -> Active(n-1)
//!            |              \___________________________/
//!            v                           |
//!        Torn-down  <--------------------+  (leave / superseding enter)
//! ```

use crate::cancellation::CancellationToken;
use crate::error::{ParseError, StaleSession};
use crate::geometry::{self, FrameRect, SheetSize};
use crate::image_probe::{ImageProbe, probe_sheet_size};
use crate::listing::{duration_seconds, resolve_detail_url};
use crate::page::{NodeId, OverlayId, OverlayView, Page, Rect, find_thumbnail, positioning_parent};
use crate::providers::SpriteCandidate;
use crate::resolver::SpriteResolver;
use crate::scheduler::{FrameHandle, FrameScheduler};
use crate::timecode::time_label;
use std::sync::{
    Arc, Mutex, MutexGuard,
    atomic::{AtomicU64, Ordering},
};
use tracing::{debug, trace};

/// Observable state of the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Resolving,
    /// Overlay mounted and showing candidate `candidate`.
    Active { candidate: usize },
    /// Overlay mounted; loading candidate `candidate` to replace the current one.
    Upgrading { candidate: usize },
}

/// How a `pointer_enter` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverOutcome {
    Unresolvable(ParseError),
    NoCandidates,
    /// Left or replaced by another hover before finishing.
    Superseded,
    Shown { provider: String, upgrades: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SessionId(u64);

/// A claimed session that has not started its async work yet.
#[derive(Debug)]
pub struct HoverTicket {
    id: SessionId,
    item: NodeId,
    token: CancellationToken,
}

struct HoverSession {
    id: SessionId,
    item: NodeId,
    token: CancellationToken,
    state: SessionState,
    pending_frame: Option<FrameHandle>,
}

enum SessionState {
    Resolving,
    Active(ActiveOverlay),
}

/// Session-scoped data the frame path needs.
struct ActiveOverlay {
    overlay: OverlayId,
    view: OverlayView,
    sprite: SpriteCandidate,
    candidate_index: usize,
    upgrading_to: Option<usize>,
    /// Item bounds measured once at activation.
    item_bounds: Rect,
    total_duration: u64,
    last_progress: f64,
}

impl ActiveOverlay {
    fn show_progress(&mut self, progress: f64) {
        let sprite = &self.sprite;
        let cell =
            geometry::frame_for_progress(progress, sprite.cols, sprite.rows, sprite.frame_count);
        self.view.background_position =
            geometry::background_position_percent(cell, sprite.cols, sprite.rows);
        if self.total_duration > 0 {
            let current = (progress * self.total_duration as f64).floor() as u64;
            self.view.time_label = time_label(current, self.total_duration);
        }
        self.last_progress = progress;
    }
}

/// Cloneable handle to the single-slot hover state machine.
#[derive(Clone)]
pub struct HoverController {
    inner: Arc<Inner>,
}

struct Inner {
    page: Arc<dyn Page>,
    resolver: Arc<SpriteResolver>,
    probe: Arc<dyn ImageProbe>,
    scheduler: Arc<dyn FrameScheduler>,
    slot: Mutex<Option<HoverSession>>,
    next_id: AtomicU64,
}

impl HoverController {
    pub fn new(
        page: Arc<dyn Page>,
        resolver: Arc<SpriteResolver>,
        probe: Arc<dyn ImageProbe>,
        scheduler: Arc<dyn FrameScheduler>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                page,
                resolver,
                probe,
                scheduler,
                slot: Mutex::new(None),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Start a session for `item`, replacing any current one, and drive it
    /// through resolution, activation and upgrades.
    pub async fn pointer_enter(&self, item: NodeId) -> HoverOutcome {
        let ticket = self.start(item);
        self.run(ticket).await
    }

    /// Claim the slot for `item` and tear down the previous session.
    ///
    /// Runs synchronously, so a leave handled right after it ends this
    /// session even if [`HoverController::run`] has not been polled yet.
    pub fn start(&self, item: NodeId) -> HoverTicket {
        let (id, token) = self.inner.begin(item);
        HoverTicket { id, item, token }
    }

    /// Drive a session claimed by [`HoverController::start`].
    pub async fn run(&self, ticket: HoverTicket) -> HoverOutcome {
        let HoverTicket { id, item, token } = ticket;
        let result = match self.inner.ensure_current(id, &token, "start") {
            Ok(()) => self.inner.run_session(id, item, &token).await,
            Err(stale) => Err(stale),
        };
        match result {
            Ok(outcome) => {
                debug!(session = id.0, ?outcome, "Hover session settled");
                outcome
            }
            Err(stale) => {
                debug!(session = id.0, "Discarding hover work: {stale}");
                HoverOutcome::Superseded
            }
        }
    }

    /// Schedule a frame update for the pointer at `client_x` over `item`.
    /// A pending, not yet run update is replaced. Returns whether a frame was
    /// scheduled; moves before activation or over another item are dropped.
    pub fn pointer_move(&self, item: NodeId, client_x: f64) -> bool {
        let inner = &self.inner;
        let (id, progress, previous) = {
            let mut slot = inner.lock();
            let Some(session) = slot.as_mut() else {
                return false;
            };
            if session.item != item {
                return false;
            }
            let SessionState::Active(active) = &session.state else {
                return false;
            };
            let progress = geometry::progress_at(client_x, active.item_bounds);
            (session.id, progress, session.pending_frame.take())
        };

        if let Some(previous) = previous {
            inner.scheduler.cancel_frame(previous);
        }
        let weak = Arc::downgrade(inner);
        let handle = inner.scheduler.request_frame(Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.apply_frame(id, progress);
            }
        }));

        let orphaned = {
            let mut slot = inner.lock();
            match slot.as_mut() {
                Some(session) if session.id == id => {
                    session.pending_frame = Some(handle);
                    None
                }
                _ => Some(handle),
            }
        };
        match orphaned {
            Some(handle) => {
                inner.scheduler.cancel_frame(handle);
                false
            }
            None => true,
        }
    }

    /// End the current session, if any. Safe to call repeatedly.
    pub fn pointer_leave(&self) {
        let taken = self.inner.lock().take();
        if let Some(session) = taken {
            self.inner.teardown(session);
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match self.inner.lock().as_ref() {
            None => SessionPhase::Idle,
            Some(session) => match &session.state {
                SessionState::Resolving => SessionPhase::Resolving,
                SessionState::Active(active) => match active.upgrading_to {
                    Some(candidate) => SessionPhase::Upgrading { candidate },
                    None => SessionPhase::Active {
                        candidate: active.candidate_index,
                    },
                },
            },
        }
    }

    pub fn current_item(&self) -> Option<NodeId> {
        self.inner.lock().as_ref().map(|s| s.item)
    }

    pub fn active_sprite(&self) -> Option<SpriteCandidate> {
        self.inner.lock().as_ref().and_then(|s| match &s.state {
            SessionState::Active(active) => Some(active.sprite.clone()),
            SessionState::Resolving => None,
        })
    }

    pub fn overlay_view(&self) -> Option<OverlayView> {
        self.inner.lock().as_ref().and_then(|s| match &s.state {
            SessionState::Active(active) => Some(active.view.clone()),
            SessionState::Resolving => None,
        })
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Option<HoverSession>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn begin(&self, item: NodeId) -> (SessionId, CancellationToken) {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();
        let previous = self.lock().replace(HoverSession {
            id,
            item,
            token: token.clone(),
            state: SessionState::Resolving,
            pending_frame: None,
        });
        if let Some(previous) = previous {
            self.teardown(previous);
        }
        debug!(session = id.0, item = item.0, "Hover session resolving");
        (id, token)
    }

    fn teardown(&self, session: HoverSession) {
        session.token.cancel();
        if let Some(handle) = session.pending_frame {
            self.scheduler.cancel_frame(handle);
        }
        if let SessionState::Active(active) = session.state {
            self.page.remove_overlay(active.overlay);
        }
        debug!(session = session.id.0, "Hover session torn down");
    }

    fn end_if_current(&self, id: SessionId) {
        let taken = {
            let mut slot = self.lock();
            if slot.as_ref().is_some_and(|s| s.id == id) {
                slot.take()
            } else {
                None
            }
        };
        if let Some(session) = taken {
            self.teardown(session);
        }
    }

    fn ensure_current(
        &self,
        id: SessionId,
        token: &CancellationToken,
        stage: &'static str,
    ) -> Result<(), StaleSession> {
        token.check_cancelled(stage)?;
        match self.lock().as_ref() {
            Some(session) if session.id == id => Ok(()),
            _ => Err(StaleSession { stage }),
        }
    }

    async fn run_session(
        &self,
        id: SessionId,
        item: NodeId,
        token: &CancellationToken,
    ) -> Result<HoverOutcome, StaleSession> {
        let href = self.page.first_link_href(item);
        let detail_url = match resolve_detail_url(href.as_deref(), &self.page.base_url()) {
            Ok(url) => url,
            Err(err) => {
                debug!(session = id.0, "No detail page for item: {err}");
                self.end_if_current(id);
                return Ok(HoverOutcome::Unresolvable(err));
            }
        };

        let candidates = token
            .run_until_cancelled(self.resolver.resolve(&detail_url))
            .await
            .ok_or(StaleSession { stage: "resolve" })?;
        self.ensure_current(id, token, "resolve")?;
        if candidates.is_empty() {
            debug!(session = id.0, %detail_url, "No sprite candidates");
            self.end_if_current(id);
            return Ok(HoverOutcome::NoCandidates);
        }

        let page = self.page.as_ref();
        let thumbnail = find_thumbnail(page, item);
        let thumb_rect = page.bounding_rect(thumbnail);
        let parent = positioning_parent(page, thumbnail, item);
        let parent_rect = page.bounding_rect(parent);
        let total_duration = duration_seconds(page.duration_text(item).as_deref());

        let first = &candidates[0];
        let sheet = token
            .run_until_cancelled(probe_sheet_size(self.probe.as_ref(), first))
            .await
            .ok_or(StaleSession {
                stage: "first-image",
            })?;
        let view = initial_view(first, sheet, thumb_rect, parent_rect, total_duration);
        self.activate(id, token, parent, view, first.clone(), total_duration)?;

        let mut upgrades = 0;
        for (index, candidate) in candidates.iter().enumerate().skip(1) {
            self.mark_upgrading(id, token, index)?;
            let sheet = token
                .run_until_cancelled(probe_sheet_size(self.probe.as_ref(), candidate))
                .await
                .ok_or(StaleSession {
                    stage: "upgrade-image",
                })?;
            self.apply_upgrade(id, token, index, candidate, sheet)?;
            upgrades += 1;
        }

        let provider = candidates[candidates.len() - 1].provider.clone();
        Ok(HoverOutcome::Shown { provider, upgrades })
    }

    fn activate(
        &self,
        id: SessionId,
        token: &CancellationToken,
        parent: NodeId,
        view: OverlayView,
        sprite: SpriteCandidate,
        total_duration: u64,
    ) -> Result<(), StaleSession> {
        token.check_cancelled("activate")?;
        let mut slot = self.lock();
        let session = match slot.as_mut() {
            Some(session) if session.id == id => session,
            _ => return Err(StaleSession { stage: "activate" }),
        };
        let item_bounds = self.page.bounding_rect(session.item);
        let overlay = self.page.mount_overlay(parent, &view);
        debug!(
            session = id.0,
            provider = %sprite.provider,
            sprite = %sprite.sprite_url,
            "Hover overlay mounted"
        );
        session.state = SessionState::Active(ActiveOverlay {
            overlay,
            view,
            sprite,
            candidate_index: 0,
            upgrading_to: None,
            item_bounds,
            total_duration,
            last_progress: 0.0,
        });
        Ok(())
    }

    fn mark_upgrading(
        &self,
        id: SessionId,
        token: &CancellationToken,
        index: usize,
    ) -> Result<(), StaleSession> {
        token.check_cancelled("upgrade")?;
        let mut slot = self.lock();
        match slot.as_mut() {
            Some(HoverSession {
                id: current,
                state: SessionState::Active(active),
                ..
            }) if *current == id => {
                active.upgrading_to = Some(index);
                Ok(())
            }
            _ => Err(StaleSession { stage: "upgrade" }),
        }
    }

    fn apply_upgrade(
        &self,
        id: SessionId,
        token: &CancellationToken,
        index: usize,
        candidate: &SpriteCandidate,
        sheet: Option<SheetSize>,
    ) -> Result<(), StaleSession> {
        token.check_cancelled("upgrade")?;
        let mut slot = self.lock();
        let active = match slot.as_mut() {
            Some(HoverSession {
                id: current,
                state: SessionState::Active(active),
                ..
            }) if *current == id => active,
            _ => return Err(StaleSession { stage: "upgrade" }),
        };

        // Container placement stays as measured for the first candidate.
        active.view.layer = layer_for(candidate, sheet, active.view.width, active.view.height);
        active.view.sprite_url = candidate.sprite_url.clone();
        active.view.background_size =
            geometry::background_size_percent(candidate.cols, candidate.rows);
        active.sprite = candidate.clone();
        active.candidate_index = index;
        active.upgrading_to = None;
        let progress = active.last_progress;
        active.show_progress(progress);
        self.page.update_overlay(active.overlay, &active.view);
        debug!(
            session = id.0,
            provider = %candidate.provider,
            frames = candidate.frame_count,
            "Hover overlay upgraded"
        );
        Ok(())
    }

    fn apply_frame(&self, id: SessionId, progress: f64) {
        let mut slot = self.lock();
        let Some(session) = slot.as_mut() else {
            return;
        };
        if session.id != id {
            return;
        }
        let SessionState::Active(active) = &mut session.state else {
            return;
        };
        active.show_progress(progress);
        trace!(
            session = id.0,
            progress,
            position = %active.view.background_position_css(),
            "Frame update"
        );
        self.page.update_overlay(active.overlay, &active.view);
    }
}

fn layer_for(
    candidate: &SpriteCandidate,
    sheet: Option<SheetSize>,
    width: f64,
    height: f64,
) -> FrameRect {
    match sheet {
        Some(sheet) => geometry::frame_rect(
            width,
            height,
            candidate.cols,
            candidate.rows,
            sheet.width,
            sheet.height,
        ),
        None => FrameRect::fill(width, height),
    }
}

fn initial_view(
    candidate: &SpriteCandidate,
    sheet: Option<SheetSize>,
    thumbnail: Rect,
    parent: Rect,
    total_duration: u64,
) -> OverlayView {
    OverlayView {
        left: thumbnail.left - parent.left,
        top: thumbnail.top - parent.top,
        width: thumbnail.width,
        height: thumbnail.height,
        layer: layer_for(candidate, sheet, thumbnail.width, thumbnail.height),
        sprite_url: candidate.sprite_url.clone(),
        background_size: geometry::background_size_percent(candidate.cols, candidate.rows),
        background_position: (0.0, 0.0),
        time_label: time_label(0, total_duration),
    }
}

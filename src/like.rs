//! Optimistic like toggle.
//!
//! A [`LikeController`] owns the visible state of one like control. A toggle
//! flips it at once, sends the request, and then either adopts the server's
//! answer or restores the state captured before the flip. Only one toggle per
//! controller is in flight at a time; extra clicks are ignored.

use crate::api::{Api, ClassifiedFailure, LikeStatus};
use log::*;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

pub const LIKED_GLYPH: &str = "♥";
pub const UNLIKED_GLYPH: &str = "♡";

/// What the like control currently shows.
///
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LikeView {
    pub liked: bool,
    pub count: i64,
    pub processing: bool,
}

impl LikeView {
    pub fn glyph(&self) -> &'static str {
        glyph(self.liked)
    }
}

fn glyph(liked: bool) -> &'static str {
    if liked {
        LIKED_GLYPH
    } else {
        UNLIKED_GLYPH
    }
}

/// Visible state captured before a speculative change.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionSnapshot {
    pub liked: bool,
    pub count: i64,
    pub glyph: &'static str,
}

/// The mutating request behind a like toggle.
///
pub trait LikeApi: Send + Sync {
    fn toggle_like(
        &self,
        board_no: i64,
    ) -> impl Future<Output = Result<Value, ClassifiedFailure>> + Send;
}

impl LikeApi for Api {
    fn toggle_like(
        &self,
        board_no: i64,
    ) -> impl Future<Output = Result<Value, ClassifiedFailure>> + Send {
        Api::toggle_like(self, board_no)
    }
}

/// Drives the optimistic toggle for one like control.
///
pub struct LikeController<A> {
    api: Arc<A>,
    view: watch::Sender<LikeView>,
    in_flight: AtomicBool,
}

impl<A: LikeApi> LikeController<A> {
    pub fn new(api: Arc<A>) -> Self {
        let (view, _) = watch::channel(LikeView::default());
        LikeController {
            api,
            view,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn view(&self) -> LikeView {
        *self.view.borrow()
    }

    /// Receiver that observes every change to the visible state.
    ///
    pub fn subscribe(&self) -> watch::Receiver<LikeView> {
        self.view.subscribe()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Set the baseline shown before any interaction.
    ///
    pub fn initialize(&self, liked: bool, count: i64) {
        self.view.send_replace(LikeView {
            liked,
            count,
            processing: false,
        });
    }

    /// Toggle the like on `board_no`.
    ///
    /// Returns `Ok(None)` without touching anything when a toggle is already
    /// in flight. On failure the visible state is restored and the failure is
    /// returned for the caller to route to the error coordinator.
    ///
    pub async fn toggle(&self, board_no: i64) -> Result<Option<LikeStatus>, ClassifiedFailure> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Like toggle on board {} already in flight, ignoring", board_no);
            return Ok(None);
        }
        let mut action = Action {
            controller: self,
            snapshot: self.snapshot(),
            settled: false,
        };
        self.speculate();

        let result = self
            .api
            .toggle_like(board_no)
            .await
            .and_then(|payload| LikeStatus::from_payload(&payload));

        match result {
            Ok(status) => {
                self.reconcile(status);
                action.settled = true;
                Ok(Some(status))
            }
            Err(failure) => {
                warn!("Like toggle on board {} failed: {}", board_no, failure);
                action.rollback();
                Err(failure)
            }
        }
    }

    fn snapshot(&self) -> ActionSnapshot {
        let view = self.view();
        ActionSnapshot {
            liked: view.liked,
            count: view.count,
            glyph: view.glyph(),
        }
    }

    fn speculate(&self) {
        self.view.send_modify(|view| {
            view.count += if view.liked { -1 } else { 1 };
            view.liked = !view.liked;
            view.processing = true;
        });
    }

    /// The server's answer replaces whatever was guessed.
    fn reconcile(&self, status: LikeStatus) {
        self.view.send_replace(LikeView {
            liked: status.liked,
            count: status.like_count,
            processing: false,
        });
    }

    fn restore(&self, snapshot: ActionSnapshot) {
        self.view.send_replace(LikeView {
            liked: snapshot.liked,
            count: snapshot.count,
            processing: false,
        });
    }
}

/// One toggle in progress. Dropping it clears the in-flight flag, and rolls
/// back first if the toggle never settled (failed, panicked or was dropped).
struct Action<'a, A: LikeApi> {
    controller: &'a LikeController<A>,
    snapshot: ActionSnapshot,
    settled: bool,
}

impl<A: LikeApi> Action<'_, A> {
    fn rollback(&mut self) {
        self.controller.restore(self.snapshot);
        self.settled = true;
    }
}

impl<A: LikeApi> Drop for Action<'_, A> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("Like toggle abandoned before settling, rolling back");
            self.controller.restore(self.snapshot);
        }
        self.controller.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use tokio::sync::{oneshot, Notify};

    /// Answers each toggle with the next queued response once released.
    #[derive(Default)]
    struct ScriptedApi {
        calls: AtomicUsize,
        started: Notify,
        pending: Mutex<Vec<oneshot::Receiver<Result<Value, ClassifiedFailure>>>>,
    }

    impl ScriptedApi {
        fn queue(&self) -> oneshot::Sender<Result<Value, ClassifiedFailure>> {
            let (tx, rx) = oneshot::channel();
            self.pending.lock().unwrap().push(rx);
            tx
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::Acquire)
        }
    }

    impl LikeApi for ScriptedApi {
        fn toggle_like(
            &self,
            _board_no: i64,
        ) -> impl Future<Output = Result<Value, ClassifiedFailure>> + Send {
            self.calls.fetch_add(1, Ordering::AcqRel);
            let rx = self.pending.lock().unwrap().remove(0);
            self.started.notify_one();
            async move {
                rx.await
                    .unwrap_or_else(|_| Err(ClassifiedFailure::network()))
            }
        }
    }

    fn controller() -> (Arc<ScriptedApi>, Arc<LikeController<ScriptedApi>>) {
        let api = Arc::new(ScriptedApi::default());
        let controller = Arc::new(LikeController::new(Arc::clone(&api)));
        (api, controller)
    }

    #[test]
    fn test_initialize_sets_view() {
        let (_, controller) = controller();
        controller.initialize(true, 7);
        assert_eq!(
            controller.view(),
            LikeView { liked: true, count: 7, processing: false }
        );
        assert_eq!(controller.view().glyph(), LIKED_GLYPH);
    }

    #[tokio::test]
    async fn failed_toggle_restores_snapshot() {
        let (api, controller) = controller();
        controller.initialize(false, 3);
        let reply = api.queue();

        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.toggle(1).await }
        });
        api.started.notified().await;
        assert_eq!(
            controller.view(),
            LikeView { liked: true, count: 4, processing: true }
        );

        reply
            .send(Err(ClassifiedFailure::from_status(500, "boom")))
            .unwrap();
        let failure = task.await.unwrap().unwrap_err();
        assert_eq!(failure.raw_status, 500);
        assert_eq!(
            controller.view(),
            LikeView { liked: false, count: 3, processing: false }
        );
        assert_eq!(controller.view().glyph(), UNLIKED_GLYPH);
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn server_answer_overrides_speculation() {
        let (api, controller) = controller();
        controller.initialize(false, 3);
        api.queue()
            .send(Ok(json!({ "liked": true, "likeCount": 9 })))
            .unwrap();

        let status = controller.toggle(1).await.unwrap().unwrap();
        assert_eq!(status, LikeStatus { liked: true, like_count: 9 });
        assert_eq!(
            controller.view(),
            LikeView { liked: true, count: 9, processing: false }
        );
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn nested_payload_is_unwrapped_once() {
        let (api, controller) = controller();
        controller.initialize(true, 5);
        api.queue()
            .send(Ok(json!({ "data": { "liked": false, "likeCount": 4 } })))
            .unwrap();

        controller.toggle(1).await.unwrap();
        assert_eq!(
            controller.view(),
            LikeView { liked: false, count: 4, processing: false }
        );
    }

    #[tokio::test]
    async fn payload_without_like_state_rolls_back() {
        let (api, controller) = controller();
        controller.initialize(true, 5);
        api.queue().send(Ok(json!({ "message": "ok" }))).unwrap();

        let failure = controller.toggle(1).await.unwrap_err();
        assert_eq!(failure.kind, crate::api::FailureKind::Unknown);
        assert_eq!(
            controller.view(),
            LikeView { liked: true, count: 5, processing: false }
        );
    }

    #[tokio::test]
    async fn second_toggle_while_pending_is_ignored() {
        let (api, controller) = controller();
        controller.initialize(false, 3);
        let reply = api.queue();

        let first = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.toggle(1).await }
        });
        api.started.notified().await;
        let speculative = controller.view();

        assert_eq!(controller.toggle(1).await.unwrap(), None);
        assert_eq!(api.calls(), 1);
        assert_eq!(controller.view(), speculative);

        reply
            .send(Ok(json!({ "liked": true, "likeCount": 4 })))
            .unwrap();
        first.await.unwrap().unwrap();
        assert!(!controller.is_in_flight());

        // Settled, so the next click goes through.
        api.queue()
            .send(Ok(json!({ "liked": false, "likeCount": 3 })))
            .unwrap();
        assert!(controller.toggle(1).await.unwrap().is_some());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn dropped_toggle_rolls_back_and_releases() {
        let (api, controller) = controller();
        controller.initialize(true, 2);
        let _reply = api.queue();

        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.toggle(1).await }
        });
        api.started.notified().await;
        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());

        assert_eq!(
            controller.view(),
            LikeView { liked: true, count: 2, processing: false }
        );
        assert!(!controller.is_in_flight());
    }

    #[tokio::test]
    async fn subscribers_observe_each_step() {
        let (api, controller) = controller();
        controller.initialize(false, 0);
        let mut rx = controller.subscribe();
        rx.borrow_and_update();
        api.queue()
            .send(Ok(json!({ "liked": true, "likeCount": 1 })))
            .unwrap();

        controller.toggle(1).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), controller.view());
    }
}

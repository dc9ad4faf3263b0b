//! Process-wide error handling.
//!
//! The [`ErrorCoordinator`] is the terminal sink for every failure the user
//! should hear about. It maps a [`ClassifiedFailure`] to a message, writes it
//! to the state store and the notifier, and on an authentication failure
//! tears the session down and schedules one redirect to the login view.

use crate::api::{ClassifiedFailure, FailureKind, GENERIC_MESSAGE};
use crate::notify::{NoticeKind, Notifier};
use crate::session::SessionStore;
use crate::state::StateStore;
use log::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Delay between the "sign in again" notice and the redirect.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

pub const BAD_REQUEST_MESSAGE: &str = "Invalid request.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to do that.";
pub const NOT_FOUND_MESSAGE: &str = "The requested resource could not be found.";
pub const SERVER_ERROR_MESSAGE: &str =
    "The server ran into a problem. Please try again shortly.";
pub const CONNECTION_LOST_MESSAGE: &str = "The network connection was lost.";
pub const CONNECTION_RESTORED_MESSAGE: &str = "The network connection was restored.";

/// Where the hosting front end shows its views.
///
pub trait Navigator: Send + Sync {
    fn on_login_view(&self) -> bool;
    fn redirect_to_login(&self);
}

/// Outcome of handling one failure.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The session was torn down; no error message was stored.
    SessionExpired,
    /// The message was stored in `AppState.error` and shown.
    Reported { kind: FailureKind, message: String },
}

/// Single sink for user-facing failures.
///
pub struct ErrorCoordinator {
    state: Mutex<Option<StateStore>>,
    session: SessionStore,
    notifier: Notifier,
    navigator: Arc<dyn Navigator>,
    redirect_scheduled: Arc<AtomicBool>,
}

impl ErrorCoordinator {
    pub fn new(
        session: SessionStore,
        notifier: Notifier,
        navigator: Arc<dyn Navigator>,
        state: Option<StateStore>,
    ) -> Self {
        ErrorCoordinator {
            state: Mutex::new(state),
            session,
            notifier,
            navigator,
            redirect_scheduled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Return the process-wide coordinator, building it on first use.
    ///
    pub fn global<F>(state: Option<StateStore>, build: F) -> Arc<ErrorCoordinator>
    where
        F: FnOnce() -> ErrorCoordinator,
    {
        static GLOBAL: CoordinatorCell = CoordinatorCell::new();
        GLOBAL.get_or_init(state, build)
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn state(&self) -> Option<StateStore> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Attach a state store unless one is already attached.
    ///
    pub fn adopt_state(&self, state: StateStore) -> bool {
        let mut slot = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if slot.is_some() {
            return false;
        }
        debug!("Error coordinator adopted a state store");
        *slot = Some(state);
        true
    }

    /// Classify the failure and surface it.
    ///
    pub fn handle(&self, failure: &ClassifiedFailure) -> Resolution {
        error!("Error: {}", failure);

        let message = match failure.kind {
            FailureKind::Unauthorized => {
                self.handle_unauthorized();
                return Resolution::SessionExpired;
            }
            FailureKind::BadRequest => own_message(failure, BAD_REQUEST_MESSAGE),
            FailureKind::Forbidden => FORBIDDEN_MESSAGE.to_owned(),
            FailureKind::NotFound => NOT_FOUND_MESSAGE.to_owned(),
            FailureKind::ServerError => SERVER_ERROR_MESSAGE.to_owned(),
            FailureKind::Network | FailureKind::Unknown => own_message(failure, GENERIC_MESSAGE),
        };

        if let Some(state) = self.state() {
            state.set_error(Some(message.clone()));
        }
        self.notifier.show(&message, NoticeKind::Error);

        Resolution::Reported {
            kind: failure.kind,
            message,
        }
    }

    /// Route an error that did not come from the gateway through the same
    /// classifier. A wrapped [`ClassifiedFailure`] keeps its kind.
    ///
    pub fn report(&self, error: &anyhow::Error, context: &str) -> Resolution {
        error!("Error in {}: {:#}", context, error);
        match error.downcast_ref::<ClassifiedFailure>() {
            Some(failure) => self.handle(failure),
            None => self.handle(&ClassifiedFailure::unknown(error.to_string())),
        }
    }

    /// Reset `AppState.error` and hide both notification regions.
    ///
    pub fn clear(&self) {
        if let Some(state) = self.state() {
            state.set_error(None);
        }
        self.notifier.clear();
    }

    pub fn on_connectivity(&self, online: bool) {
        if online {
            info!("Network connection restored");
            self.notifier.show(CONNECTION_RESTORED_MESSAGE, NoticeKind::Success);
        } else {
            warn!("Network connection lost");
            self.notifier.show(CONNECTION_LOST_MESSAGE, NoticeKind::Warning);
        }
    }

    /// Follow a connectivity signal, notifying on every transition. The
    /// baseline is the value current when this is called.
    ///
    pub fn attach_connectivity(
        self: &Arc<Self>,
        mut online: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let mut last = *online.borrow_and_update();
        tokio::spawn(async move {
            while online.changed().await.is_ok() {
                let current = *online.borrow_and_update();
                if current != last {
                    coordinator.on_connectivity(current);
                    last = current;
                }
            }
        })
    }

    /// Report panics through the classifier after the previous hook runs.
    ///
    pub fn install_panic_hook(self: &Arc<Self>) {
        let coordinator = Arc::clone(self);
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            previous(info);
            let payload = info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| GENERIC_MESSAGE.to_owned());
            let failure = ClassifiedFailure::unknown(payload);
            // Off the panicking stack when a runtime is available; a store
            // lock may still be held here.
            match Handle::try_current() {
                Ok(handle) => {
                    let coordinator = Arc::clone(&coordinator);
                    handle.spawn(async move {
                        coordinator.handle(&failure);
                    });
                }
                Err(_) => {
                    coordinator.handle(&failure);
                }
            }
        }));
    }

    fn handle_unauthorized(&self) {
        self.session.teardown();
        if let Some(state) = self.state() {
            state.set_user(None);
        }

        if self.navigator.on_login_view() {
            return;
        }
        if self.redirect_scheduled.swap(true, Ordering::AcqRel) {
            debug!("Redirect to login already scheduled");
            return;
        }

        self.notifier.show(SESSION_EXPIRED_MESSAGE, NoticeKind::Warning);

        let navigator = Arc::clone(&self.navigator);
        let scheduled = Arc::clone(&self.redirect_scheduled);
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tokio::time::sleep(REDIRECT_DELAY).await;
                    navigator.redirect_to_login();
                    scheduled.store(false, Ordering::Release);
                });
            }
            Err(_) => {
                navigator.redirect_to_login();
                scheduled.store(false, Ordering::Release);
            }
        }
    }
}

fn own_message(failure: &ClassifiedFailure, fallback: &str) -> String {
    if failure.message.trim().is_empty() {
        fallback.to_owned()
    } else {
        failure.message.clone()
    }
}

/// Init-once holder for a shared coordinator.
///
pub struct CoordinatorCell {
    slot: OnceLock<Arc<ErrorCoordinator>>,
}

impl Default for CoordinatorCell {
    fn default() -> Self {
        CoordinatorCell::new()
    }
}

impl CoordinatorCell {
    pub const fn new() -> Self {
        CoordinatorCell {
            slot: OnceLock::new(),
        }
    }

    /// Build on first call. Later calls reuse the first coordinator and only
    /// attach `state` if it has none.
    ///
    pub fn get_or_init<F>(&self, state: Option<StateStore>, build: F) -> Arc<ErrorCoordinator>
    where
        F: FnOnce() -> ErrorCoordinator,
    {
        let coordinator = Arc::clone(self.slot.get_or_init(|| Arc::new(build())));
        if let Some(state) = state {
            coordinator.adopt_state(state);
        }
        coordinator
    }

    pub fn get(&self) -> Option<Arc<ErrorCoordinator>> {
        self.slot.get().cloned()
    }
}

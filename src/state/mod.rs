//! Application state management module.
//!
//! This module holds the UI-facing application state and notifies
//! subscribers whenever it changes:
//! - `AppState`, the immutable snapshot rendering code reads
//! - `StatePatch`, the partial update merged into it
//! - `StateStore`, the shared handle with its subscriber list

mod patch;

pub use patch::StatePatch;

use crate::api::{BoardDetail, BoardSummary, UserRecord};
use log::*;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Houses data representative of application state.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppState {
    pub user: Option<UserRecord>,
    pub boards: Vec<BoardSummary>,
    pub current_board: Option<BoardDetail>,
    pub loading: bool,
    pub error: Option<String>,
}

type Listener = Arc<dyn Fn(&AppState) + Send + Sync>;

struct Inner {
    snapshot: Arc<AppState>,
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// Shared handle over the application state and its subscribers.
///
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<Mutex<Inner>>,
}

impl Default for StateStore {
    fn default() -> Self {
        StateStore::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        StateStore {
            inner: Arc::new(Mutex::new(Inner {
                snapshot: Arc::new(AppState::default()),
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }

    /// Return the current snapshot.
    ///
    pub fn get(&self) -> Arc<AppState> {
        Arc::clone(&self.lock().snapshot)
    }

    /// Merge the patch into the snapshot, then call every subscriber with the
    /// merged snapshot in subscription order. Listeners run outside the lock,
    /// so they may read or update the store themselves.
    ///
    /// Ordering holds for calls made from one task or thread. Two `set` calls
    /// racing on different runtime threads each merge atomically, but their
    /// notifications may reach listeners in either order; a listener that
    /// needs the latest value should read [`StateStore::get`].
    ///
    pub fn set(&self, patch: StatePatch) {
        let (snapshot, listeners) = {
            let mut inner = self.lock();
            let next = Arc::new(patch.apply(&inner.snapshot));
            inner.snapshot = Arc::clone(&next);
            let listeners: Vec<Listener> = inner
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect();
            (next, listeners)
        };
        trace!("Notifying {} state subscribers", listeners.len());
        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// Register a listener. Dropping the returned [`Subscription`] keeps the
    /// listener registered; call [`Subscription::unsubscribe`] to remove it.
    ///
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AppState) + Send + Sync + 'static,
    {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        Subscription {
            id,
            store: Arc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn set_loading(&self, loading: bool) {
        self.set(StatePatch::new().loading(loading));
    }

    pub fn set_error(&self, error: Option<String>) {
        self.set(StatePatch::new().error(error));
    }

    pub fn set_user(&self, user: Option<UserRecord>) {
        self.set(StatePatch::new().user(user));
    }

    pub fn set_boards(&self, boards: Vec<BoardSummary>) {
        self.set(StatePatch::new().boards(boards));
    }

    pub fn set_current_board(&self, board: Option<BoardDetail>) {
        self.set(StatePatch::new().current_board(board));
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Capability to remove exactly one listener from a [`StateStore`].
///
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    store: Weak<Mutex<Inner>>,
}

impl Subscription {
    /// Remove the listener. Calling this again, or after the store is gone,
    /// does nothing.
    ///
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.store.upgrade() {
            lock_inner(&inner)
                .listeners
                .retain(|(id, _)| *id != self.id);
        }
    }
}

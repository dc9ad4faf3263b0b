//! Session credentials: the bearer token and the signed-in user.
//!
//! Storage mechanics live behind [`SessionStorage`]; [`SessionStore`] is the
//! shared handle the gateway, the error coordinator and the app facade use.

use crate::api::{Role, UserRecord};
use log::*;
use std::sync::{Arc, Mutex, MutexGuard};

/// Persistence surface for credentials. All operations are synchronous.
///
/// Backends that write somewhere durable should override [`store`] and
/// [`clear`] so token and user land in one write.
///
/// [`store`]: SessionStorage::store
/// [`clear`]: SessionStorage::clear
pub trait SessionStorage: Send {
    fn get_token(&self) -> Option<String>;
    fn set_token(&mut self, token: String);
    fn get_user(&self) -> Option<UserRecord>;
    fn set_user(&mut self, user: Option<UserRecord>);
    fn clear_token(&mut self);
    fn clear_user(&mut self);

    /// Set token and user together.
    fn store(&mut self, token: String, user: UserRecord) {
        self.set_token(token);
        self.set_user(Some(user));
    }

    /// Clear token and user together.
    fn clear(&mut self) {
        self.clear_token();
        self.clear_user();
    }
}

/// Keeps credentials in memory only.
///
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    token: Option<String>,
    user: Option<UserRecord>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    fn get_user(&self) -> Option<UserRecord> {
        self.user.clone()
    }

    fn set_user(&mut self, user: Option<UserRecord>) {
        self.user = user;
    }

    fn clear_token(&mut self) {
        self.token = None;
    }

    fn clear_user(&mut self) {
        self.user = None;
    }
}

/// Shared handle over the session storage.
///
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<Mutex<Box<dyn SessionStorage>>>,
}

impl SessionStore {
    pub fn new(storage: impl SessionStorage + 'static) -> Self {
        SessionStore {
            storage: Arc::new(Mutex::new(Box::new(storage))),
        }
    }

    pub fn in_memory() -> Self {
        SessionStore::new(MemoryStorage::new())
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn SessionStorage>> {
        self.storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn token(&self) -> Option<String> {
        self.lock().get_token()
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.lock().get_user()
    }

    /// Store the credentials returned by a successful login.
    ///
    pub fn login(&self, token: String, user: UserRecord) {
        debug!("Storing session for user '{}'...", user.user_id);
        self.lock().store(token, user);
    }

    /// Replace the stored user record, keeping the token.
    ///
    pub fn set_user(&self, user: Option<UserRecord>) {
        self.lock().set_user(user);
    }

    /// Clear token and user together under one lock.
    ///
    pub fn teardown(&self) {
        info!("Clearing stored session...");
        self.lock().clear();
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.user().map_or(false, |user| user.role == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

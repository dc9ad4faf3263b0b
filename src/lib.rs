//! Client for the bulletin-board REST service.
//!
//! Requests go through [`api::Api`], which normalizes every failure into an
//! [`api::ClassifiedFailure`]. UI-facing state lives in [`state::StateStore`],
//! failures are surfaced by [`coordinator::ErrorCoordinator`], and the like
//! button is driven optimistically by [`like::LikeController`].
//! [`app::BoardApp`] wires them together.

pub mod api;
pub mod app;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod like;
pub mod logger;
pub mod notify;
pub mod session;
pub mod state;

pub use app::BoardApp;
pub use error::{AppError, AppResult};

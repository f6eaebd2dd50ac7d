//! Release tracking state machine.
//!
//! A tracked repository moves through a small, implicit set of states:
//!
//! ```text
//! Untracked --add--> Tracked --refresh--> Tracked --remove--> Untracked
//!                       |
//!                       +--mark as seen--> seen <=> unseen (toggle)
//! ```
//!
//! The [`Tracker`] owns that machine. It talks to the upstream provider only
//! before it writes anything, so a failed or cancelled fetch never leaves a
//! half-written repository behind, and it never holds a store transaction
//! open across a network call.

pub mod error;
mod tracker;
mod view;

pub use crate::tracker::{Refresh, ReleaseChange, Tracker, repository_url};
pub use crate::view::{ReleaseView, RepositoryView};
pub use reltrack_store::{ReleaseId, RepositoryId};

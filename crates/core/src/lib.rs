//! Wordloop spaced-repetition domain.
//!
//! Everything in this crate is free of I/O. Persistence is reached only
//! through the [`store::CardStore`] trait, which the `db` crate implements
//! for PostgreSQL and which tests implement in memory.
//!
//! - [`card`]: the per-card review state machine.
//! - [`folder`]: day/study folder hierarchy rules.
//! - [`sync_plan`]: pure drift measurement for folder timer groups.
//! - [`timer_sync`]: the folder timer synchronizer service.
//! - [`review`]: the review scheduler service.
//! - [`due_queue`]: due/overdue queue resolution.

pub mod card;
pub mod due_queue;
pub mod error;
pub mod folder;
pub mod review;
pub mod store;
pub mod sync_plan;
pub mod sync_settings;
pub mod timer_sync;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

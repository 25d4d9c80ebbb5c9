//! Spaced-repetition vocabulary review for many independent users.
//!
//! [`services::ReviewService`] picks the next card for a user (most overdue
//! review first, otherwise a fresh item within the daily cap) and reschedules
//! cards with an SM-2 step once the user grades their recall.

pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod services;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{Config, DbConfig, SchedulerConfig};
pub use db::{MemoryStore, ReviewStore, SqliteStore};
pub use error::{ReviewError, ReviewResult};
pub use models::{CatalogRow, IngestReport, Item, ProgressRecord, ReviewCard, User, UserOverview};
pub use services::{Grade, ReviewService, ReviewSession, SessionPhase};

//! leetboard/crates/lb-services/src/lib.rs
//!
//! Session handling, thread lifecycle, and the background archival sweep,
//! written purely against the `lb-core` ports.

pub mod archival;
pub mod content;
pub mod scheduler;
pub mod session;

pub use archival::ArchivalOutcome;
pub use content::ContentManager;
pub use scheduler::{Scheduler, SchedulerHandle, SweepReport, Sweeper};
pub use session::{RenameReport, ResolvedSession, SessionManager, SESSION_TTL};

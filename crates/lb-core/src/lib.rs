//! leetboard/crates/lb-core/src/lib.rs
//!
//! The central domain types and interface definitions for Leetboard.

pub mod error;
pub mod ids;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use ids::generate_id;
pub use models::*;
pub use traits::*;

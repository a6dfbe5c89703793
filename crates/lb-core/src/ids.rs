//! Identifier generation.

use crate::error::{AppError, Result};
use uuid::{Builder, Uuid};

/// Draws a random v4 UUID from the OS entropy source.
///
/// Unlike `Uuid::new_v4`, an unavailable entropy source is reported as
/// `IdentityGeneration` instead of panicking.
pub fn generate_id() -> Result<Uuid> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes)
        .map_err(|e| AppError::IdentityGeneration(e.to_string()))?;
    Ok(Builder::from_random_bytes(bytes).into_uuid())
}

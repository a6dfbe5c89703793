//! # lb-avatar-http
//! leetboard/crates/lb-plugins/lb-avatar-http/src/lib.rs
//! Picks a random character from a public catalog API and uses its
//! portrait as the session avatar.

use async_trait::async_trait;
use lb_core::error::{AppError, Result};
use lb_core::traits::AvatarAssigner;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

pub const DEFAULT_AVATAR_API: &str = "https://rickandmortyapi.com/api/character";
/// Number of characters in the default catalog; IDs are `1..=826`.
pub const DEFAULT_CATALOG_SIZE: u32 = 826;

#[derive(Debug, Deserialize)]
struct Character {
    image: String,
}

pub struct HttpAvatarAssigner {
    client: Client,
    base_url: String,
    catalog_size: u32,
}

impl HttpAvatarAssigner {
    pub fn new(base_url: impl Into<String>, catalog_size: u32, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::avatar(format!("building HTTP client: {e}")))?;
        Ok(Self::with_client(client, base_url, catalog_size))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, catalog_size: u32) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            catalog_size: catalog_size.max(1),
        }
    }

    fn random_character(&self) -> u32 {
        rand::rng().random_range(1..=self.catalog_size)
    }

    /// Fetches the portrait URL of one specific character.
    #[instrument(skip(self))]
    pub async fn fetch_character(&self, character_id: u32) -> Result<String> {
        let url = format!("{}/{}", self.base_url, character_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::avatar(format!("fetching avatar: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::avatar(format!(
                "unexpected status from avatar API: {}",
                status.as_u16()
            )));
        }

        let character: Character = response
            .json()
            .await
            .map_err(|e| AppError::avatar(format!("decoding avatar JSON: {e}")))?;

        if character.image.trim().is_empty() {
            return Err(AppError::avatar(format!("character {character_id} has no image")));
        }
        debug!(character_id, image = %character.image, "avatar resolved");
        Ok(character.image)
    }
}

#[async_trait]
impl AvatarAssigner for HttpAvatarAssigner {
    async fn fetch_avatar(&self) -> Result<String> {
        let character_id = self.random_character();
        self.fetch_character(character_id)
            .await
            .inspect_err(|e| error!(character_id, error = %e, "avatar lookup failed"))
    }
}

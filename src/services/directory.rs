use crate::error::ExchangeError;
use crate::models::{ArtworkSummary, ParticipantProfile};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised by profile and artwork lookups
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown archetype code: {0}")]
    UnknownArchetype(String),

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

impl DirectoryError {
    /// Convert a failed profile lookup into the service error
    pub fn into_profile_error(self, user_id: &str) -> ExchangeError {
        match self {
            DirectoryError::NotFound(_) => ExchangeError::ProfileNotFound(user_id.to_string()),
            DirectoryError::UnknownArchetype(code) => ExchangeError::ArchetypeNotFound(code),
            DirectoryError::Unavailable(reason) => ExchangeError::DependencyUnavailable(reason),
        }
    }

    /// Convert a failed artwork lookup into the service error
    pub fn into_artwork_error(self, artwork_id: &str) -> ExchangeError {
        match self {
            DirectoryError::NotFound(_) => ExchangeError::ArtworkNotFound(artwork_id.to_string()),
            DirectoryError::UnknownArchetype(code) => ExchangeError::ArchetypeNotFound(code),
            DirectoryError::Unavailable(reason) => ExchangeError::DependencyUnavailable(reason),
        }
    }
}

/// Source of participant profiles, including each user's archetype code
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<ParticipantProfile, DirectoryError>;
}

/// Source of artwork metadata for session views
#[async_trait]
pub trait ArtworkCatalog: Send + Sync {
    async fn get_artwork_summary(&self, artwork_id: &str) -> Result<ArtworkSummary, DirectoryError>;
}

/// Directory held in memory, for local runs without a collaborator backend
#[derive(Default)]
pub struct StaticDirectory {
    profiles: RwLock<HashMap<String, ParticipantProfile>>,
    artworks: RwLock<HashMap<String, ArtworkSummary>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_profile(&self, profile: ParticipantProfile) {
        self.profiles
            .write()
            .await
            .insert(profile.user_id.clone(), profile);
    }

    pub async fn put_artwork(&self, artwork: ArtworkSummary) {
        self.artworks
            .write()
            .await
            .insert(artwork.artwork_id.clone(), artwork);
    }
}

#[async_trait]
impl ProfileDirectory for StaticDirectory {
    async fn get_profile(&self, user_id: &str) -> Result<ParticipantProfile, DirectoryError> {
        self.profiles
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(user_id.to_string()))
    }
}

#[async_trait]
impl ArtworkCatalog for StaticDirectory {
    async fn get_artwork_summary(&self, artwork_id: &str) -> Result<ArtworkSummary, DirectoryError> {
        self.artworks
            .read()
            .await
            .get(artwork_id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(artwork_id.to_string()))
    }
}

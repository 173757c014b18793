use crate::core::archetype::ArchetypeCode;
use crate::models::{ArtworkSummary, ParticipantProfile};
use crate::services::directory::{ArtworkCatalog, DirectoryError, ProfileDirectory};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with Appwrite
#[derive(Debug, Error)]
pub enum AppwriteError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid API key or token")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Unknown archetype code: {0}")]
    UnknownArchetype(String),
}

impl From<AppwriteError> for DirectoryError {
    fn from(err: AppwriteError) -> Self {
        match err {
            AppwriteError::NotFound(what) => DirectoryError::NotFound(what),
            AppwriteError::UnknownArchetype(code) => DirectoryError::UnknownArchetype(code),
            other => DirectoryError::Unavailable(other.to_string()),
        }
    }
}

/// Appwrite API client
///
/// Serves participant profiles and artwork metadata out of two document
/// collections.
pub struct AppwriteClient {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    client: Client,
    collections: AppwriteCollections,
}

/// Collection IDs in Appwrite
#[derive(Debug, Clone)]
pub struct AppwriteCollections {
    pub profiles: String,
    pub artworks: String,
}

impl AppwriteClient {
    /// Create a new Appwrite client
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collections: AppwriteCollections,
    ) -> Result<Self, AppwriteError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            client,
            collections,
        })
    }

    fn documents_url(&self, collection: &str) -> String {
        format!(
            "{}/databases/{}/collections/{}/documents",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            collection
        )
    }

    async fn get_json(&self, url: &str, what: &str) -> Result<Value, AppwriteError> {
        let response = self
            .client
            .get(url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json().await?),
            StatusCode::NOT_FOUND => Err(AppwriteError::NotFound(what.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AppwriteError::Unauthorized),
            status => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read body".to_string());
                tracing::error!("Failed to fetch {}: {} - {}", what, status, body);
                Err(AppwriteError::ApiError(format!("Failed to fetch {}: {}", what, status)))
            }
        }
    }

    /// Fetch a participant profile by user ID
    pub async fn fetch_profile(&self, user_id: &str) -> Result<ParticipantProfile, AppwriteError> {
        let queries = vec![format!("equal(\"userId\", [\"{}\"])", user_id), "limit(1)".to_string()];
        let queries_json = serde_json::to_string(&queries)
            .map_err(|e| AppwriteError::InvalidResponse(e.to_string()))?;
        let url = format!(
            "{}?queries={}",
            self.documents_url(&self.collections.profiles),
            urlencoding::encode(&queries_json)
        );

        tracing::debug!("Fetching profile for user: {}", user_id);

        let json = self.get_json(&url, &format!("profile {}", user_id)).await?;

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| AppwriteError::InvalidResponse("Missing documents array".into()))?;

        let doc = documents
            .first()
            .ok_or_else(|| AppwriteError::NotFound(format!("Profile not found for user {}", user_id)))?;

        parse_profile(doc.get("data").unwrap_or(doc), user_id)
    }

    /// Fetch artwork metadata by document ID
    pub async fn fetch_artwork(&self, artwork_id: &str) -> Result<ArtworkSummary, AppwriteError> {
        let url = format!(
            "{}/{}",
            self.documents_url(&self.collections.artworks),
            urlencoding::encode(artwork_id)
        );

        tracing::debug!("Fetching artwork: {}", artwork_id);

        let json = self.get_json(&url, &format!("artwork {}", artwork_id)).await?;
        let data = json.get("data").unwrap_or(&json);

        Ok(ArtworkSummary {
            artwork_id: artwork_id.to_string(),
            title: required_str(data, "title")?,
            artist: required_str(data, "artist")?,
            image_ref: optional_str(data, "imageUrl").or_else(|| optional_str(data, "imageRef")),
        })
    }
}

fn required_str(doc: &Value, field: &str) -> Result<String, AppwriteError> {
    optional_str(doc, field)
        .ok_or_else(|| AppwriteError::InvalidResponse(format!("Missing field {}", field)))
}

fn optional_str(doc: &Value, field: &str) -> Option<String> {
    doc.get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Archetype codes are validated here rather than trusted as stored
fn parse_profile(doc: &Value, user_id: &str) -> Result<ParticipantProfile, AppwriteError> {
    let code = required_str(doc, "archetypeCode")?;
    let archetype: ArchetypeCode = code
        .parse()
        .map_err(|_| AppwriteError::UnknownArchetype(code.clone()))?;

    Ok(ParticipantProfile {
        user_id: optional_str(doc, "userId").unwrap_or_else(|| user_id.to_string()),
        nickname: required_str(doc, "nickname")?,
        archetype,
        avatar_url: optional_str(doc, "avatarUrl"),
        bio: optional_str(doc, "bio"),
        contact: optional_str(doc, "contact"),
    })
}

#[async_trait]
impl ProfileDirectory for AppwriteClient {
    async fn get_profile(&self, user_id: &str) -> Result<ParticipantProfile, DirectoryError> {
        Ok(self.fetch_profile(user_id).await?)
    }
}

#[async_trait]
impl ArtworkCatalog for AppwriteClient {
    async fn get_artwork_summary(&self, artwork_id: &str) -> Result<ArtworkSummary, DirectoryError> {
        Ok(self.fetch_artwork(artwork_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(base_url: String) -> AppwriteClient {
        AppwriteClient::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            AppwriteCollections {
                profiles: "profiles".to_string(),
                artworks: "artworks".to_string(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_appwrite_client_creation() {
        let client = client("https://appwrite.test/v1/".to_string());
        assert_eq!(client.api_key, "test_key");
        assert_eq!(
            client.documents_url("profiles"),
            "https://appwrite.test/v1/databases/test_db/collections/profiles/documents"
        );
    }

    #[tokio::test]
    async fn test_fetch_profile() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(Matcher::Any)
            .match_header("X-Appwrite-Project", "test_project")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"total":1,"documents":[{"$id":"doc1","userId":"u1","nickname":"moonlit","archetypeCode":"lamf","bio":"Rothko"}]}"#,
            )
            .create_async()
            .await;

        let profile = client(server.url()).fetch_profile("u1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(profile.nickname, "moonlit");
        assert_eq!(profile.archetype, ArchetypeCode::Lamf);
        assert_eq!(profile.bio.as_deref(), Some("Rothko"));
        assert!(profile.avatar_url.is_none());
    }

    #[tokio::test]
    async fn test_profile_with_unknown_archetype() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"total":1,"documents":[{"userId":"u1","nickname":"x","archetypeCode":"ZZZZ"}]}"#)
            .create_async()
            .await;

        let err = client(server.url()).fetch_profile("u1").await.unwrap_err();
        assert!(matches!(err, AppwriteError::UnknownArchetype(code) if code == "ZZZZ"));
    }

    #[tokio::test]
    async fn test_missing_profile_maps_to_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/profiles/documents")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"total":0,"documents":[]}"#)
            .create_async()
            .await;

        let err = client(server.url()).get_profile("ghost").await.unwrap_err();
        assert!(matches!(err, DirectoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_artwork() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/artworks/documents/art_7")
            .with_status(200)
            .with_body(r#"{"$id":"art_7","title":"Starry Night","artist":"Van Gogh","imageUrl":"https://img/7.jpg"}"#)
            .create_async()
            .await;

        let artwork = client(server.url()).fetch_artwork("art_7").await.unwrap();
        assert_eq!(artwork.title, "Starry Night");
        assert_eq!(artwork.image_ref.as_deref(), Some("https://img/7.jpg"));
    }

    #[tokio::test]
    async fn test_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/artworks/documents/art_7")
            .with_status(500)
            .create_async()
            .await;

        let err = client(server.url()).get_artwork_summary("art_7").await.unwrap_err();
        assert!(matches!(err, DirectoryError::Unavailable(_)));
    }
}

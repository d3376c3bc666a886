use crate::config::{Settings, SharedSettings};
use crate::http::HttpClient;
use crate::models::MovieStatus;
use crate::text;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Radarr answered {status}")]
    Status { status: u16, body: String },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

/// The movie library the hub adds recommendations to.
#[async_trait]
pub trait MovieLibrary: Send + Sync {
    /// Raw titles of every movie already in the library.
    async fn movie_titles(&self) -> Result<Vec<String>, LibraryError>;

    async fn add_movie(&self, request: &AddMovieRequest) -> Result<MovieStatus>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMovieRequest {
    pub title: String,
    pub quality_profile_id: i64,
    pub metadata_profile_id: i64,
    pub title_slug: String,
    pub root_folder_path: String,
    pub tmdb_id: i64,
    pub monitored: bool,
    pub add_options: AddOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddOptions {
    pub monitor: String,
    pub search_for_movie: bool,
}

impl AddMovieRequest {
    pub fn new(title: &str, tmdb_id: i64, settings: &Settings) -> Self {
        Self {
            title: title.to_string(),
            quality_profile_id: settings.quality_profile_id,
            metadata_profile_id: settings.metadata_profile_id,
            title_slug: text::title_slug(title),
            root_folder_path: settings.root_folder_path.clone(),
            tmdb_id,
            monitored: true,
            add_options: AddOptions {
                monitor: "movieOnly".into(),
                search_for_movie: settings.search_for_movie,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct RadarrMovie {
    title: String,
}

#[derive(Debug, Deserialize)]
struct RadarrValidationError {
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

pub struct RadarrClient {
    http: HttpClient,
    settings: SharedSettings,
}

impl RadarrClient {
    pub fn new(http: HttpClient, settings: SharedSettings) -> Self {
        Self { http, settings }
    }

    async fn endpoint(&self) -> (String, String, std::time::Duration) {
        let settings = self.settings.read().await;
        (
            format!("{}/api/v3/movie", settings.radarr_address.trim_end_matches('/')),
            settings.radarr_api_key.clone(),
            settings.radarr_timeout(),
        )
    }
}

#[async_trait]
impl MovieLibrary for RadarrClient {
    #[instrument(skip(self))]
    async fn movie_titles(&self) -> Result<Vec<String>, LibraryError> {
        info!("Getting movies from Radarr");
        let (url, api_key, timeout) = self.endpoint().await;

        let request = self
            .http
            .request(Method::GET, &url)
            .header("X-Api-Key", api_key)
            .timeout(timeout);
        let response = self.http.send(request).await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!("Radarr movie list failed with status: {}", status);
            return Err(LibraryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let movies: Vec<RadarrMovie> = response.json().await.map_err(anyhow::Error::from)?;
        info!("Retrieved {} movies from Radarr", movies.len());
        Ok(movies.into_iter().map(|m| m.title).collect())
    }

    #[instrument(skip(self, request), fields(title = %request.title))]
    async fn add_movie(&self, request: &AddMovieRequest) -> Result<MovieStatus> {
        let (url, api_key, timeout) = self.endpoint().await;

        let builder = self
            .http
            .request(Method::POST, &url)
            .header("X-Api-Key", api_key)
            .timeout(timeout)
            .json(request);
        let response = self.http.send(builder).await?;

        if response.status() == StatusCode::CREATED {
            info!("Movie '{}' added successfully to Radarr", request.title);
            return Ok(MovieStatus::Added);
        }

        error!("Failed to add movie '{}' to Radarr", request.title);
        let body = response.text().await.unwrap_or_default();
        let message = first_error_message(&body);
        error!("{}", message);
        Ok(classify_add_error(&message))
    }
}

fn first_error_message(body: &str) -> String {
    serde_json::from_str::<Vec<RadarrValidationError>>(body)
        .ok()
        .and_then(|errors| errors.into_iter().next())
        .and_then(|e| e.error_message)
        .unwrap_or_else(|| "Unknown Error".to_string())
}

/// Maps a Radarr validation message onto a card status.
pub fn classify_add_error(message: &str) -> MovieStatus {
    if message.contains("already exists in the database")
        || message.contains("configured for an existing movie")
    {
        MovieStatus::AlreadyInRadarr
    } else if message.contains("Invalid Path") {
        MovieStatus::InvalidPath
    } else if message.contains("ID was not found") {
        MovieStatus::InvalidMovieId
    } else {
        MovieStatus::FailedToAdd
    }
}

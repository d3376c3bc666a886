use serde::{Deserialize, Serialize};
use std::fmt;

/// A recommended movie as pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Genre", default)]
    pub genre: String,
    #[serde(rename = "Status", default)]
    pub status: MovieStatus,
    #[serde(rename = "Img_Link", default, skip_serializing_if = "Option::is_none")]
    pub img_link: Option<String>,
    #[serde(rename = "Votes", default)]
    pub votes: u64,
    #[serde(rename = "Rating", default)]
    pub rating: f64,
    #[serde(rename = "Overview", default)]
    pub overview: String,
    #[serde(rename = "Language", default)]
    pub language: String,
    #[serde(rename = "Popularity", default)]
    pub popularity: f64,
    #[serde(rename = "Base_Movie", default, skip_serializing_if = "Option::is_none")]
    pub base_movie: Option<String>,
    #[serde(rename = "TMDB_ID", default, skip_serializing_if = "Option::is_none")]
    pub tmdb_id: Option<i64>,
}

impl Movie {
    /// Card title, e.g. `Heat (1995)`.
    pub fn display_title(&self) -> String {
        format!("{} ({})", self.name, self.year)
    }
}

/// Outcome of adding a movie to Radarr. `Pending` travels as the empty string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovieStatus {
    #[serde(rename = "Added")]
    Added,
    #[serde(rename = "Already in Radarr")]
    AlreadyInRadarr,
    #[serde(rename = "Failed to Add")]
    FailedToAdd,
    #[serde(rename = "Invalid Path")]
    InvalidPath,
    #[serde(rename = "Invalid Movie ID")]
    InvalidMovieId,
    #[default]
    #[serde(rename = "")]
    Pending,
}

impl MovieStatus {
    pub fn label(self) -> &'static str {
        match self {
            MovieStatus::Added => "Added",
            MovieStatus::AlreadyInRadarr => "Already in Radarr",
            MovieStatus::FailedToAdd => "Failed to Add",
            MovieStatus::InvalidPath => "Invalid Path",
            MovieStatus::InvalidMovieId => "Invalid Movie ID",
            MovieStatus::Pending => "",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, MovieStatus::Added | MovieStatus::AlreadyInRadarr)
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            MovieStatus::FailedToAdd | MovieStatus::InvalidPath | MovieStatus::InvalidMovieId
        )
    }
}

impl fmt::Display for MovieStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One entry of the sidebar selection list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectableItem {
    pub name: String,
    #[serde(default)]
    pub checked: bool,
}

impl SelectableItem {
    pub fn new(name: impl Into<String>, checked: bool) -> Self {
        Self {
            name: name.into(),
            checked,
        }
    }
}

/// The four settings a client may view and edit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    pub radarr_address: String,
    pub radarr_api_key: String,
    pub root_folder_path: String,
    pub tmdb_api_key: String,
}

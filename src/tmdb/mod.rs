use crate::config::{Settings, SharedSettings};
use crate::http::HttpClient;
use crate::text;
use anyhow::Result;
use async_trait::async_trait;
use isolang::Language;
use serde::Deserialize;
use tracing::{debug, instrument};

const API_BASE: &str = "https://api.themoviedb.org/3";
const POSTER_BASE: &str = "https://image.tmdb.org/t/p/original/";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub vote_count: u64,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl TmdbMovie {
    pub fn language_code(&self) -> &str {
        self.original_language.as_deref().unwrap_or("en")
    }

    /// Four-digit release year, `"0000"` when unknown.
    pub fn year(&self) -> String {
        self.release_date
            .as_deref()
            .and_then(|d| d.split('-').next())
            .filter(|y| !y.is_empty())
            .unwrap_or("0000")
            .to_string()
    }

    pub fn poster_url(&self) -> Option<String> {
        self.poster_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(|p| format!("{POSTER_BASE}{}", p.trim_start_matches('/')))
    }

    pub fn genres(&self) -> String {
        self.genre_ids
            .iter()
            .map(|id| genre_name(*id))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Deserialize)]
struct ResultPage {
    #[serde(default)]
    results: Vec<TmdbMovie>,
}

/// Movie metadata source used for id lookups and recommendations.
#[async_trait]
pub trait MovieDatabase: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<TmdbMovie>>;

    async fn recommendations(&self, movie_id: i64) -> Result<Vec<TmdbMovie>>;
}

pub struct TmdbClient {
    http: HttpClient,
    settings: SharedSettings,
}

impl TmdbClient {
    pub fn new(http: HttpClient, settings: SharedSettings) -> Self {
        Self { http, settings }
    }

    async fn api_key(&self) -> String {
        self.settings.read().await.tmdb_api_key.clone()
    }
}

#[async_trait]
impl MovieDatabase for TmdbClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<TmdbMovie>> {
        let api_key = self.api_key().await;
        let url = format!("{API_BASE}/search/movie");
        let page: ResultPage = self
            .http
            .get_json(&url, &[("api_key", api_key.as_str()), ("query", query)])
            .await?;
        debug!("TMDB search returned {} results", page.results.len());
        Ok(page.results)
    }

    #[instrument(skip(self))]
    async fn recommendations(&self, movie_id: i64) -> Result<Vec<TmdbMovie>> {
        let api_key = self.api_key().await;
        let url = format!("{API_BASE}/movie/{movie_id}/recommendations");
        let page: ResultPage = self
            .http
            .get_json(&url, &[("api_key", api_key.as_str())])
            .await?;
        Ok(page.results)
    }
}

/// Picks the TMDB id for `name` among search results: a close title match
/// in the right year, or the top result when `fallback` is set.
pub fn pick_match(results: &[TmdbMovie], name: &str, year: Option<&str>, fallback: bool) -> Option<i64> {
    results
        .iter()
        .find(|movie| {
            text::fuzzy_ratio(name, &movie.original_title) > 90
                && year.map_or(true, |y| movie.year() == y)
        })
        .or_else(|| if fallback { results.first() } else { None })
        .map(|movie| movie.id)
}

/// Rating, vote count and language filters from the settings.
pub fn passes_filters(movie: &TmdbMovie, settings: &Settings) -> bool {
    movie.vote_average >= settings.minimum_rating
        && movie.vote_count >= settings.minimum_votes
        && (settings.language_choice == "all" || movie.language_code() == settings.language_choice)
}

pub fn genre_name(id: i64) -> &'static str {
    match id {
        28 => "Action",
        12 => "Adventure",
        16 => "Animation",
        35 => "Comedy",
        80 => "Crime",
        99 => "Documentary",
        18 => "Drama",
        10751 => "Family",
        14 => "Fantasy",
        36 => "History",
        27 => "Horror",
        10402 => "Music",
        9648 => "Mystery",
        10749 => "Romance",
        878 => "Science Fiction",
        10770 => "TV Movie",
        53 => "Thriller",
        10752 => "War",
        37 => "Western",
        _ => "Unknown",
    }
}

/// English name of an ISO 639-1 code; unknown codes are returned as-is.
pub fn language_name(code: &str) -> String {
    // TMDB reports some Chinese titles under "cn", which is not ISO 639-1.
    let code = if code == "cn" { "zh" } else { code };
    Language::from_639_1(code)
        .map(|language| language.to_name().to_string())
        .unwrap_or_else(|| code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmdb(id: i64, original_title: &str, release_date: Option<&str>) -> TmdbMovie {
        TmdbMovie {
            id,
            title: original_title.to_string(),
            original_title: original_title.to_string(),
            release_date: release_date.map(str::to_string),
            genre_ids: vec![28, 53, 4242],
            overview: String::new(),
            popularity: 12.0,
            original_language: Some("en".into()),
            vote_count: 100,
            vote_average: 7.0,
            poster_path: Some("/abc.jpg".into()),
        }
    }

    #[test]
    fn match_prefers_close_titles_in_the_right_year() {
        let results = vec![
            tmdb(1, "Heat Wave", Some("2010-01-01")),
            tmdb(2, "Heat", Some("1986-03-01")),
            tmdb(3, "Heat", Some("1995-12-15")),
        ];
        assert_eq!(pick_match(&results, "Heat", Some("1995"), false), Some(3));
        assert_eq!(pick_match(&results, "Heat", None, false), Some(2));
        assert_eq!(pick_match(&results, "Ronin", None, false), None);
        assert_eq!(pick_match(&results, "Ronin", None, true), Some(1));
    }

    #[test]
    fn filters_follow_settings() {
        let settings = Settings::default();
        let mut movie = tmdb(1, "Heat", None);
        assert!(passes_filters(&movie, &settings));

        movie.vote_count = 10;
        assert!(!passes_filters(&movie, &settings));

        movie.vote_count = 100;
        let french_only = Settings {
            language_choice: "fr".into(),
            ..Settings::default()
        };
        assert!(!passes_filters(&movie, &french_only));
        movie.original_language = Some("fr".into());
        assert!(passes_filters(&movie, &french_only));
    }

    #[test]
    fn display_fields() {
        let movie = tmdb(1, "Heat", Some("1995-12-15"));
        assert_eq!(movie.year(), "1995");
        assert_eq!(movie.genres(), "Action, Thriller, Unknown");
        assert_eq!(
            movie.poster_url().as_deref(),
            Some("https://image.tmdb.org/t/p/original/abc.jpg")
        );
        assert_eq!(tmdb(2, "Ran", Some("")).year(), "0000");
        assert_eq!(tmdb(2, "Ran", None).year(), "0000");
        assert_eq!(language_name("xx"), "xx");
    }

    #[test]
    fn language_codes_resolve_to_english_names() {
        for (code, name) in [
            ("en", "English"),
            ("ja", "Japanese"),
            ("hr", "Croatian"),
            ("sr", "Serbian"),
            ("ka", "Georgian"),
            ("sk", "Slovak"),
            ("bg", "Bulgarian"),
            ("et", "Estonian"),
            ("ur", "Urdu"),
            ("ca", "Catalan"),
            ("cn", "Chinese"),
        ] {
            assert_eq!(language_name(code), name, "code {code}");
        }
    }

    #[test]
    fn results_decode_with_nulls() {
        let page: ResultPage = serde_json::from_str(
            r#"{"results":[{"id":7,"title":"Ran","release_date":null,"poster_path":null}]}"#,
        )
        .unwrap();
        assert_eq!(page.results[0].year(), "0000");
        assert!(page.results[0].poster_url().is_none());
        assert_eq!(page.results[0].language_code(), "en");
    }
}

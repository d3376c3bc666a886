use crate::config::SharedSettings;
use crate::models::{ClientSettings, Movie, MovieStatus, SelectableItem};
use crate::protocol::{ReplyCode, ServerEvent, SidebarData, SidebarUpdate, ToastMessage};
use crate::radarr::{AddMovieRequest, LibraryError, MovieLibrary};
use crate::text;
use crate::tmdb::{self, MovieDatabase, TmdbMovie};
use anyhow::Result;
use rand::seq::{IndexedRandom, SliceRandom};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

#[cfg(test)]
mod tests;

const SEEDS_PER_ROUND: usize = 8;
const BACKLOG_SIZE: usize = 25;
const EXHAUSTED_PAUSE: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct EngineState {
    library: Vec<SelectableItem>,
    library_keys: HashSet<String>,
    recommended: Vec<Movie>,
    seeds: Vec<String>,
    new_found: usize,
    clients: usize,
}

pub struct Engine {
    settings: SharedSettings,
    settings_path: PathBuf,
    library: Arc<dyn MovieLibrary>,
    database: Arc<dyn MovieDatabase>,
    events: broadcast::Sender<ServerEvent>,
    state: Mutex<EngineState>,
    stopped: AtomicBool,
    searching: AtomicBool,
}

/// Clears the search-in-progress flag when a search ends, however it ends.
struct SearchGuard<'a>(&'a AtomicBool);

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Engine {
    pub fn new(
        settings: SharedSettings,
        settings_path: PathBuf,
        library: Arc<dyn MovieLibrary>,
        database: Arc<dyn MovieDatabase>,
    ) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            settings,
            settings_path,
            library,
            database,
            events,
            state: Mutex::new(EngineState::default()),
            stopped: AtomicBool::new(true),
            searching: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    fn broadcast(&self, event: ServerEvent) {
        // No subscribers simply means no client is connected.
        let _ = self.events.send(event);
    }

    fn toast(&self, title: &str, message: impl Into<String>) {
        self.broadcast(ServerEvent::Toast(ToastMessage::new(title, message)));
    }

    pub async fn request_library(&self, checked: bool) {
        let running = self.is_running();
        let update = match self.library.movie_titles().await {
            Ok(titles) => {
                let mut items: Vec<SelectableItem> = titles
                    .iter()
                    .map(|title| SelectableItem::new(text::library_name(title), checked))
                    .collect();
                items.sort_by_key(|item| item.name.to_lowercase());

                let mut state = self.state.lock().await;
                state.library_keys = items.iter().map(|item| text::folded_key(&item.name)).collect();
                state.library = items.clone();
                SidebarUpdate::success(items, running)
            }
            Err(LibraryError::Status { status, body }) => {
                error!("Radarr movie list failed: {}", status);
                self.state.lock().await.library.clear();
                SidebarUpdate::error(ReplyCode::Http(status), SidebarData::Text(body), running)
            }
            Err(LibraryError::Transport(e)) => {
                error!("Getting movie error: {}", e);
                self.state.lock().await.library.clear();
                SidebarUpdate::error(ReplyCode::Http(500), SidebarData::Text(e.to_string()), running)
            }
        };
        self.broadcast(ServerEvent::SidebarUpdate(update));
    }

    /// Resets the recommendation run around `selected`. Returns whether a
    /// search should follow.
    pub async fn start(&self, selected: Vec<String>) -> bool {
        self.broadcast(ServerEvent::Clear);

        let mut state = self.state.lock().await;
        state.new_found = 1;
        state.recommended.clear();

        let wanted: HashSet<&str> = selected.iter().map(String::as_str).collect();
        let mut seeds = Vec::new();
        for item in state.library.iter_mut() {
            item.checked = wanted.contains(item.name.as_str());
            if item.checked {
                seeds.push(item.name.clone());
            }
        }
        state.seeds = seeds;

        if state.seeds.is_empty() {
            self.stopped.store(true, Ordering::SeqCst);
            error!("Startup error: No Radarr Movies Selected");
            let update = SidebarUpdate::error(
                ReplyCode::Reason("No Radarr Movies Selected".into()),
                SidebarData::Items(state.library.clone()),
                false,
            );
            drop(state);
            self.broadcast(ServerEvent::SidebarUpdate(update));
            return false;
        }

        info!("Starting with {} seed movies", state.seeds.len());
        self.stopped.store(false, Ordering::SeqCst);
        true
    }

    pub fn stop(&self) {
        info!("Stopping search");
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn spawn_search(self: &Arc<Self>) {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.find_similar().await });
    }

    /// One search round. Overlapping calls are dropped while a round runs.
    pub async fn find_similar(&self) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        if self.searching.swap(true, Ordering::SeqCst) {
            return;
        }
        let _guard = SearchGuard(&self.searching);

        let seeds = {
            let mut state = self.state.lock().await;
            if state.new_found == 0 {
                None
            } else {
                state.new_found = 0;
                let mut rng = rand::rng();
                Some(
                    state
                        .seeds
                        .choose_multiple(&mut rng, SEEDS_PER_ROUND)
                        .cloned()
                        .collect::<Vec<_>>(),
                )
            }
        };

        match seeds {
            Some(seeds) => {
                info!("Searching for new movies");
                if let Err(e) = self.search_round(&seeds).await {
                    error!("TheMovieDB error: {}", e);
                }
            }
            None => {
                self.report_exhausted();
                tokio::time::sleep(EXHAUSTED_PAUSE).await;
            }
        }
    }

    async fn search_round(&self, seeds: &[String]) -> Result<()> {
        let settings = self.settings.read().await.clone();

        for seed in seeds {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            let results = self.database.search(seed).await?;
            let Some(movie_id) =
                tmdb::pick_match(&results, seed, None, settings.fallback_to_top_result)
            else {
                continue;
            };

            let related = self.database.recommendations(movie_id).await?;
            for candidate in related.iter().filter(|m| tmdb::passes_filters(m, &settings)) {
                if self.stopped.load(Ordering::SeqCst) {
                    break;
                }
                let mut state = self.state.lock().await;
                if state.library_keys.contains(&text::folded_key(&candidate.title))
                    || state.recommended.iter().any(|m| m.name == candidate.title)
                {
                    continue;
                }
                let movie = recommendation(candidate, seed);
                state.recommended.push(movie.clone());
                state.new_found += 1;
                drop(state);
                self.broadcast(ServerEvent::MoreMoviesLoaded(vec![movie]));
            }
        }

        if self.state.lock().await.new_found == 0 {
            self.report_exhausted();
        }
        Ok(())
    }

    fn report_exhausted(&self) {
        info!("Search Exhausted - Try selecting more movies from existing Radarr library");
        self.toast(
            "Search Exhausted",
            "Try selecting more movies from existing Radarr library",
        );
    }

    pub async fn add_movie(&self, encoded_name: &str, year: &str) {
        let name = urlencoding::decode(encoded_name)
            .map(|n| n.into_owned())
            .unwrap_or_else(|_| encoded_name.to_string());

        let status = match self.try_add(&name, year).await {
            Ok(status) => status,
            Err(e) => {
                error!("Adding movie error: {}", e);
                return;
            }
        };

        let refreshed = {
            let mut state = self.state.lock().await;
            state
                .recommended
                .iter_mut()
                .find(|m| m.name == name)
                .map(|movie| {
                    movie.status = status;
                    movie.clone()
                })
        };
        if let Some(movie) = refreshed {
            self.broadcast(ServerEvent::RefreshMovie(movie));
        }
    }

    async fn try_add(&self, name: &str, year: &str) -> Result<MovieStatus> {
        let settings = self.settings.read().await.clone();
        let known = {
            let state = self.state.lock().await;
            state
                .recommended
                .iter()
                .find(|m| m.name == name && m.year == year)
                .map(|m| m.tmdb_id)
        };
        let tmdb_id = match known {
            Some(id) => id,
            None => {
                let results = self.database.search(name).await?;
                tmdb::pick_match(&results, name, Some(year), settings.fallback_to_top_result)
            }
        };

        let Some(tmdb_id) = tmdb_id else {
            info!("No Matching Movie for: '{}' in The Movie Database.", name);
            self.toast(
                "Failed to add Movie",
                format!("No Matching Movie for: '{name}' in The Movie Database."),
            );
            return Ok(MovieStatus::FailedToAdd);
        };

        let status = if settings.dry_run_adding_to_radarr {
            MovieStatus::Added
        } else {
            let request = AddMovieRequest::new(name, tmdb_id, &settings);
            self.library.add_movie(&request).await?
        };

        let folder = text::folder_name(name);
        match status {
            MovieStatus::Added => {
                info!("Movie: '{}' added successfully to Radarr.", name);
                let mut state = self.state.lock().await;
                state.library.push(SelectableItem::new(name, false));
                state.library_keys.insert(text::folded_key(name));
            }
            MovieStatus::AlreadyInRadarr => info!("Movie '{}' is already in Radarr.", name),
            MovieStatus::InvalidPath => info!(
                "Path: {}/{}/ not valid.",
                settings.root_folder_path.trim_end_matches('/'),
                folder
            ),
            MovieStatus::InvalidMovieId => {
                info!("ID: {} for '{}' not correct", tmdb_id, folder)
            }
            MovieStatus::FailedToAdd | MovieStatus::Pending => {}
        }
        Ok(status)
    }

    pub async fn client_settings(&self) -> ClientSettings {
        self.settings.read().await.client_settings()
    }

    pub async fn update_settings(&self, update: ClientSettings) -> Result<()> {
        let mut settings = self.settings.write().await;
        settings.apply_client_settings(update);
        settings.save(&self.settings_path)?;
        info!("Settings updated");
        Ok(())
    }

    /// Registers a client and returns the recommendations it should see.
    pub async fn connect(&self) -> Option<Vec<Movie>> {
        let mut state = self.state.lock().await;
        let backlog = if state.recommended.is_empty() {
            None
        } else {
            if state.clients == 0 {
                let mut rng = rand::rng();
                if state.recommended.len() > BACKLOG_SIZE {
                    let sampled: Vec<Movie> = state
                        .recommended
                        .choose_multiple(&mut rng, BACKLOG_SIZE)
                        .cloned()
                        .collect();
                    state.recommended = sampled;
                } else {
                    info!("Shuffling movies");
                    state.recommended.shuffle(&mut rng);
                }
            }
            Some(state.recommended.clone())
        };
        state.clients += 1;
        backlog
    }

    pub async fn disconnect(&self) {
        let mut state = self.state.lock().await;
        state.clients = state.clients.saturating_sub(1);
    }

    pub async fn sidebar_snapshot(&self) -> Option<SidebarUpdate> {
        let state = self.state.lock().await;
        if state.library.is_empty() {
            return None;
        }
        Some(SidebarUpdate::success(state.library.clone(), self.is_running()))
    }

    /// Fetches the whole library and starts a run seeded with every title.
    pub async fn auto_start(self: Arc<Self>, delay: Duration) {
        tokio::time::sleep(delay).await;
        info!("Auto start");
        self.request_library(true).await;
        let names: Vec<String> = {
            let state = self.state.lock().await;
            state.library.iter().map(|item| item.name.clone()).collect()
        };
        if names.is_empty() {
            warn!("Auto start found no library movies");
        }
        if self.start(names).await {
            self.spawn_search();
        }
    }
}

fn recommendation(candidate: &TmdbMovie, seed: &str) -> Movie {
    Movie {
        name: candidate.title.clone(),
        year: candidate.year(),
        genre: candidate.genres(),
        status: MovieStatus::Pending,
        img_link: candidate.poster_url(),
        votes: candidate.vote_count,
        rating: candidate.vote_average,
        overview: candidate.overview.clone(),
        language: tmdb::language_name(candidate.language_code()),
        popularity: candidate.popularity,
        base_movie: Some(seed.to_string()),
        tmdb_id: Some(candidate.id),
    }
}

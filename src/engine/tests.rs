use super::*;
use crate::config::Settings;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct FakeLibrary {
    titles: Vec<String>,
    failure: Option<(u16, String)>,
    add_status: Option<MovieStatus>,
    added: std::sync::Mutex<Vec<AddMovieRequest>>,
}

#[async_trait]
impl MovieLibrary for FakeLibrary {
    async fn movie_titles(&self) -> Result<Vec<String>, LibraryError> {
        match &self.failure {
            Some((status, body)) => Err(LibraryError::Status {
                status: *status,
                body: body.clone(),
            }),
            None => Ok(self.titles.clone()),
        }
    }

    async fn add_movie(&self, request: &AddMovieRequest) -> Result<MovieStatus> {
        self.added.lock().unwrap().push(request.clone());
        Ok(self.add_status.unwrap_or(MovieStatus::Added))
    }
}

#[derive(Default)]
struct FakeDatabase {
    search: HashMap<String, Vec<TmdbMovie>>,
    recommendations: HashMap<i64, Vec<TmdbMovie>>,
}

#[async_trait]
impl MovieDatabase for FakeDatabase {
    async fn search(&self, query: &str) -> Result<Vec<TmdbMovie>> {
        // Give other tasks a turn, as a network call would.
        tokio::task::yield_now().await;
        Ok(self.search.get(query).cloned().unwrap_or_default())
    }

    async fn recommendations(&self, movie_id: i64) -> Result<Vec<TmdbMovie>> {
        Ok(self.recommendations.get(&movie_id).cloned().unwrap_or_default())
    }
}

fn tmdb(id: i64, title: &str, year: &str, votes: u64, rating: f64) -> TmdbMovie {
    TmdbMovie {
        id,
        title: title.to_string(),
        original_title: title.to_string(),
        release_date: Some(format!("{year}-06-01")),
        genre_ids: vec![878],
        overview: format!("{title} overview"),
        popularity: 20.0,
        original_language: Some("en".into()),
        vote_count: votes,
        vote_average: rating,
        poster_path: None,
    }
}

struct Harness {
    engine: Arc<Engine>,
    library: Arc<FakeLibrary>,
    events: broadcast::Receiver<ServerEvent>,
    _dir: tempfile::TempDir,
}

impl Harness {
    fn new(library: FakeLibrary, database: FakeDatabase, settings: Settings) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let library = Arc::new(library);
        let engine = Arc::new(Engine::new(
            Arc::new(RwLock::new(settings)),
            dir.path().join("settings_config.yaml"),
            library.clone(),
            Arc::new(database),
        ));
        let events = engine.subscribe();
        Self {
            engine,
            library,
            events,
            _dir: dir,
        }
    }

    fn drain(&mut self) -> Vec<ServerEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

fn heat_database() -> FakeDatabase {
    let mut database = FakeDatabase::default();
    database
        .search
        .insert("Heat".into(), vec![tmdb(949, "Heat", "1995", 9000, 7.9)]);
    database.recommendations.insert(
        949,
        vec![
            tmdb(348, "Alien", "1979", 15000, 8.1),
            tmdb(8489, "Ronin", "1998", 2000, 6.9),
            tmdb(1, "Obscure Thing", "2001", 3, 9.0),
            tmdb(2, "Bad Sequel", "2004", 900, 3.1),
        ],
    );
    database
}

#[tokio::test]
async fn library_is_folded_sorted_and_broadcast() {
    let library = FakeLibrary {
        titles: vec!["zodiac".into(), "Amélie (2001)".into(), "Heat".into()],
        ..Default::default()
    };
    let mut h = Harness::new(library, FakeDatabase::default(), Settings::default());

    h.engine.request_library(true).await;
    let events = h.drain();
    assert_eq!(
        events,
        vec![ServerEvent::SidebarUpdate(SidebarUpdate::success(
            vec![
                SelectableItem::new("Amelie", true),
                SelectableItem::new("Heat", true),
                SelectableItem::new("zodiac", true),
            ],
            false,
        ))]
    );
}

#[tokio::test]
async fn library_failure_reports_status_and_body() {
    let library = FakeLibrary {
        failure: Some((401, "Unauthorized".into())),
        ..Default::default()
    };
    let mut h = Harness::new(library, FakeDatabase::default(), Settings::default());

    h.engine.request_library(false).await;
    assert_eq!(
        h.drain(),
        vec![ServerEvent::SidebarUpdate(SidebarUpdate::error(
            ReplyCode::Http(401),
            SidebarData::Text("Unauthorized".into()),
            false,
        ))]
    );
    assert!(h.engine.sidebar_snapshot().await.is_none());
}

#[tokio::test]
async fn start_without_selection_clears_and_reports() {
    let library = FakeLibrary {
        titles: vec!["Heat".into()],
        ..Default::default()
    };
    let mut h = Harness::new(library, FakeDatabase::default(), Settings::default());
    h.engine.request_library(false).await;
    h.drain();

    assert!(!h.engine.start(vec!["Not In Library".into()]).await);
    assert!(!h.engine.is_running());
    let events = h.drain();
    assert_eq!(events[0], ServerEvent::Clear);
    match &events[1] {
        ServerEvent::SidebarUpdate(update) => {
            assert_eq!(update.code, Some(ReplyCode::Reason("No Radarr Movies Selected".into())));
            assert_eq!(
                update.data,
                SidebarData::Items(vec![SelectableItem::new("Heat", false)])
            );
            assert!(!update.running);
        }
        other => panic!("unexpected {}", other.name()),
    }
}

#[tokio::test]
async fn search_pushes_new_filtered_recommendations() {
    let library = FakeLibrary {
        titles: vec!["Heat".into(), "Ronin (1998)".into()],
        ..Default::default()
    };
    let mut h = Harness::new(library, heat_database(), Settings::default());
    h.engine.request_library(false).await;
    h.drain();

    assert!(h.engine.start(vec!["Heat".into()]).await);
    assert!(h.engine.is_running());
    h.engine.find_similar().await;

    let events = h.drain();
    assert_eq!(events[0], ServerEvent::Clear);
    assert_eq!(events.len(), 2);
    let ServerEvent::MoreMoviesLoaded(movies) = &events[1] else {
        panic!("unexpected {}", events[1].name());
    };
    let alien = &movies[0];
    assert_eq!(alien.name, "Alien");
    assert_eq!(alien.year, "1979");
    assert_eq!(alien.genre, "Science Fiction");
    assert_eq!(alien.language, "English");
    assert_eq!(alien.base_movie.as_deref(), Some("Heat"));
    assert_eq!(alien.tmdb_id, Some(348));
    assert_eq!(alien.status, MovieStatus::Pending);

    h.engine.find_similar().await;
    assert_eq!(
        h.drain(),
        vec![ServerEvent::Toast(ToastMessage::new(
            "Search Exhausted",
            "Try selecting more movies from existing Radarr library",
        ))]
    );
}

#[tokio::test]
async fn overlapping_searches_run_once() {
    let library = FakeLibrary {
        titles: vec!["Heat".into()],
        ..Default::default()
    };
    let mut h = Harness::new(library, heat_database(), Settings::default());
    h.engine.request_library(false).await;
    assert!(h.engine.start(vec!["Heat".into()]).await);
    h.drain();

    tokio::join!(h.engine.find_similar(), h.engine.find_similar());

    let names: Vec<String> = h
        .drain()
        .into_iter()
        .map(|event| match event {
            ServerEvent::MoreMoviesLoaded(movies) => movies[0].name.clone(),
            other => panic!("unexpected {}", other.name()),
        })
        .collect();
    assert_eq!(names, vec!["Alien", "Ronin"]);
}

#[tokio::test(start_paused = true)]
async fn exhausted_search_holds_off_further_rounds() {
    let library = FakeLibrary {
        titles: vec!["Heat".into()],
        ..Default::default()
    };
    let mut h = Harness::new(library, FakeDatabase::default(), Settings::default());
    h.engine.request_library(false).await;
    assert!(h.engine.start(vec!["Heat".into()]).await);
    h.engine.find_similar().await;
    let exhausted = ServerEvent::Toast(ToastMessage::new(
        "Search Exhausted",
        "Try selecting more movies from existing Radarr library",
    ));
    assert_eq!(h.drain().last(), Some(&exhausted));

    let engine = Arc::clone(&h.engine);
    let pausing = tokio::spawn(async move { engine.find_similar().await });
    let first = loop {
        if let Ok(event) = h.events.try_recv() {
            break event;
        }
        tokio::task::yield_now().await;
    };
    assert_eq!(first, exhausted);

    // Dropped while the pause is running.
    h.engine.find_similar().await;
    assert!(h.drain().is_empty());

    let paused_at = tokio::time::Instant::now();
    pausing.await.unwrap();
    assert!(paused_at.elapsed() >= EXHAUSTED_PAUSE);

    h.engine.find_similar().await;
    assert_eq!(h.drain(), vec![exhausted]);
}

#[tokio::test(start_paused = true)]
async fn auto_start_seeds_with_the_whole_library() {
    let library = FakeLibrary {
        titles: vec!["Ronin (1998)".into(), "Heat".into()],
        ..Default::default()
    };
    let mut h = Harness::new(library, heat_database(), Settings::default());

    Arc::clone(&h.engine)
        .auto_start(Duration::from_secs(60))
        .await;

    assert!(h.engine.is_running());
    let events = h.drain();
    assert_eq!(
        events[0],
        ServerEvent::SidebarUpdate(SidebarUpdate::success(
            vec![
                SelectableItem::new("Heat", true),
                SelectableItem::new("Ronin", true),
            ],
            false,
        ))
    );
    assert_eq!(events[1], ServerEvent::Clear);

    let state = h.engine.state.lock().await;
    assert_eq!(state.seeds, vec!["Heat".to_string(), "Ronin".to_string()]);
    assert!(state.library.iter().all(|item| item.checked));
}

#[tokio::test]
async fn stopped_engine_does_not_search() {
    let library = FakeLibrary {
        titles: vec!["Heat".into()],
        ..Default::default()
    };
    let mut h = Harness::new(library, heat_database(), Settings::default());
    h.engine.request_library(false).await;
    assert!(h.engine.start(vec!["Heat".into()]).await);
    h.engine.stop();
    h.drain();

    h.engine.find_similar().await;
    assert!(h.drain().is_empty());
}

#[tokio::test]
async fn adding_a_recommendation_refreshes_its_card() {
    let library = FakeLibrary {
        titles: vec!["Heat".into()],
        ..Default::default()
    };
    let mut h = Harness::new(library, heat_database(), Settings::default());
    h.engine.request_library(false).await;
    h.engine.start(vec!["Heat".into()]).await;
    h.engine.find_similar().await;
    h.drain();

    h.engine.add_movie("Alien", "1979").await;

    let added = h.library.added.lock().unwrap().clone();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].tmdb_id, 348);
    assert_eq!(added[0].title_slug, "alien");

    let events = h.drain();
    match &events[..] {
        [ServerEvent::RefreshMovie(movie)] => {
            assert_eq!(movie.name, "Alien");
            assert_eq!(movie.status, MovieStatus::Added);
        }
        other => panic!("unexpected events {other:?}"),
    }

    let snapshot = h.engine.sidebar_snapshot().await.expect("library");
    let SidebarData::Items(items) = snapshot.data else {
        panic!("expected items");
    };
    assert!(items.iter().any(|item| item.name == "Alien"));
}

#[tokio::test]
async fn radarr_rejections_become_statuses() {
    let library = FakeLibrary {
        titles: vec!["Heat".into()],
        add_status: Some(MovieStatus::InvalidPath),
        ..Default::default()
    };
    let mut h = Harness::new(library, heat_database(), Settings::default());
    h.engine.request_library(false).await;
    h.engine.start(vec!["Heat".into()]).await;
    h.engine.find_similar().await;
    h.drain();

    h.engine.add_movie("Ronin", "1998").await;
    let events = h.drain();
    match &events[..] {
        [ServerEvent::RefreshMovie(movie)] => assert_eq!(movie.status, MovieStatus::InvalidPath),
        other => panic!("unexpected events {other:?}"),
    }
}

#[tokio::test]
async fn unknown_movie_fails_with_a_toast() {
    let mut h = Harness::new(
        FakeLibrary::default(),
        FakeDatabase::default(),
        Settings::default(),
    );

    h.engine.add_movie("Nothing%20Here", "2020").await;
    assert!(h.library.added.lock().unwrap().is_empty());
    assert_eq!(
        h.drain(),
        vec![ServerEvent::Toast(ToastMessage::new(
            "Failed to add Movie",
            "No Matching Movie for: 'Nothing Here' in The Movie Database.",
        ))]
    );
}

#[tokio::test]
async fn dry_run_never_calls_radarr() {
    let settings = Settings {
        dry_run_adding_to_radarr: true,
        ..Settings::default()
    };
    let mut h = Harness::new(FakeLibrary::default(), heat_database(), settings);

    h.engine.add_movie("Heat", "1995").await;
    assert!(h.library.added.lock().unwrap().is_empty());
    // Not a recommendation, so nothing to refresh.
    assert!(h.drain().is_empty());
    let snapshot = h.engine.sidebar_snapshot().await.expect("library");
    assert_eq!(snapshot.data, SidebarData::Items(vec![SelectableItem::new("Heat", false)]));
}

#[tokio::test]
async fn connecting_clients_receive_the_backlog() {
    let library = FakeLibrary {
        titles: vec!["Heat".into()],
        ..Default::default()
    };
    let h = Harness::new(library, heat_database(), Settings::default());
    assert!(h.engine.connect().await.is_none());
    h.engine.disconnect().await;
    h.engine.disconnect().await;

    h.engine.request_library(false).await;
    h.engine.start(vec!["Heat".into()]).await;
    h.engine.find_similar().await;

    let backlog = h.engine.connect().await.expect("backlog");
    let mut names: Vec<_> = backlog.iter().map(|m| m.name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Alien", "Ronin"]);
}

#[tokio::test]
async fn settings_updates_are_persisted() {
    let h = Harness::new(
        FakeLibrary::default(),
        FakeDatabase::default(),
        Settings::default(),
    );
    let update = ClientSettings {
        radarr_address: "http://radarr:7878".into(),
        radarr_api_key: "key".into(),
        root_folder_path: "/movies/".into(),
        tmdb_api_key: "tmdb".into(),
    };

    h.engine.update_settings(update.clone()).await.unwrap();
    assert_eq!(h.engine.client_settings().await, update);

    let saved = crate::config::FileSettings::from_file(&h.engine.settings_path).unwrap();
    assert_eq!(saved.radarr_api_key.as_deref(), Some("key"));
    assert_eq!(saved.minimum_votes, Some(50));
}

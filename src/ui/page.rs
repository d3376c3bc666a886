use crate::models::{ClientSettings, Movie, MovieStatus, SelectableItem};
use chrono::{DateTime, Local};
use std::time::Instant;

pub const ADD_LABEL: &str = "Add to Radarr";
pub const START_LABEL: &str = "Start";
pub const STOP_LABEL: &str = "Stop";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Danger,
    Success,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Button {
    pub fn new(label: impl Into<String>, style: ButtonStyle) -> Self {
        Self {
            label: label.into(),
            style,
            disabled: false,
        }
    }
}

/// Card body colour class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardTone {
    Green,
    Red,
    Blue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poster {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MovieCard {
    pub movie: Movie,
    pub title: String,
    pub genre: String,
    pub votes: String,
    pub rating: String,
    pub poster: Option<Poster>,
    pub tone: CardTone,
    pub add_button: Button,
}

impl MovieCard {
    pub fn new(movie: Movie) -> Self {
        let poster = movie.img_link.as_ref().map(|src| Poster {
            src: src.clone(),
            alt: movie.name.clone(),
        });
        let mut card = Self {
            title: movie.display_title(),
            genre: movie.genre.clone(),
            votes: format!("Votes: {}", movie.votes),
            rating: format!("Rating: {}", movie.rating),
            poster,
            tone: CardTone::Blue,
            add_button: Button::new(ADD_LABEL, ButtonStyle::Primary),
            movie,
        };
        card.apply_status(card.movie.status);
        card
    }

    /// Name used to match refreshes against this card.
    pub fn match_name(&self) -> &str {
        crate::text::card_name(&self.title)
    }

    pub fn apply_status(&mut self, status: MovieStatus) {
        self.movie.status = status;
        if status.is_success() {
            self.tone = CardTone::Green;
            self.add_button.style = ButtonStyle::Secondary;
            self.add_button.disabled = true;
            self.add_button.label = status.label().to_string();
        } else if status.is_failure() {
            self.tone = CardTone::Red;
            self.add_button.style = ButtonStyle::Danger;
            self.add_button.disabled = true;
            self.add_button.label = status.label().to_string();
        } else {
            self.tone = CardTone::Blue;
            self.add_button.style = ButtonStyle::Primary;
            self.add_button.disabled = false;
            self.add_button.label = ADD_LABEL.to_string();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkbox {
    pub value: String,
    pub checked: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidebar {
    pub status_text: String,
    pub spinner_visible: bool,
    pub fetch_button_disabled: bool,
    pub select_all_visible: bool,
    pub select_all: Checkbox,
    pub items: Vec<Checkbox>,
}

impl Default for Sidebar {
    fn default() -> Self {
        Self {
            status_text: String::new(),
            spinner_visible: false,
            fetch_button_disabled: false,
            select_all_visible: false,
            select_all: Checkbox::default(),
            items: Vec::new(),
        }
    }
}

impl Sidebar {
    pub fn rebuild(&mut self, items: &[SelectableItem]) {
        self.items = items
            .iter()
            .map(|item| Checkbox {
                value: item.name.clone(),
                checked: item.checked,
                disabled: false,
            })
            .collect();
    }

    pub fn checked_names(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|c| c.checked)
            .map(|c| c.value.clone())
            .collect()
    }

    /// Select-all mirrors whether every item is checked.
    pub fn sync_select_all(&mut self) {
        self.select_all.checked = self.items.iter().all(|c| c.checked);
    }

    pub fn set_locked(&mut self, locked: bool) {
        for item in &mut self.items {
            item.disabled = locked;
        }
        self.select_all.disabled = locked;
        self.fetch_button_disabled = locked;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub header: String,
    pub message: Option<String>,
    pub shown_at: DateTime<Local>,
    pub(crate) hide_at: Instant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsForm {
    pub open: bool,
    pub fields: ClientSettings,
    pub save_message_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    RadarrAddress,
    RadarrApiKey,
    RootFolderPath,
    TmdbApiKey,
}

impl SettingsField {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "radarr_address" => Some(SettingsField::RadarrAddress),
            "radarr_api_key" => Some(SettingsField::RadarrApiKey),
            "root_folder_path" => Some(SettingsField::RootFolderPath),
            "tmdb_api_key" => Some(SettingsField::TmdbApiKey),
            _ => None,
        }
    }

    pub fn slot(self, settings: &mut ClientSettings) -> &mut String {
        match self {
            SettingsField::RadarrAddress => &mut settings.radarr_address,
            SettingsField::RadarrApiKey => &mut settings.radarr_api_key,
            SettingsField::RootFolderPath => &mut settings.root_folder_path,
            SettingsField::TmdbApiKey => &mut settings.tmdb_api_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverviewModal {
    pub title: String,
    pub lines: Vec<String>,
}

impl OverviewModal {
    pub fn for_movie(movie: &Movie) -> Self {
        Self {
            title: movie.name.clone(),
            lines: vec![
                movie.overview.clone(),
                String::new(),
                format!("Language: {}", movie.language),
                format!("Popularity: {}", movie.popularity),
                String::new(),
                format!(
                    "Recommendation from: {}",
                    movie.base_movie.as_deref().unwrap_or_default()
                ),
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub cards: Vec<MovieCard>,
    pub sidebar: Sidebar,
    pub job_button: Button,
    pub toasts: Vec<Toast>,
    pub settings: SettingsForm,
    pub overview: Option<OverviewModal>,
    pub scroll_locked: bool,
    pub theme: Theme,
    pub theme_switch_on: bool,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            cards: Vec::new(),
            sidebar: Sidebar::default(),
            job_button: Button::new(START_LABEL, ButtonStyle::Success),
            toasts: Vec::new(),
            settings: SettingsForm::default(),
            overview: None,
            scroll_locked: false,
            theme: Theme::default(),
            theme_switch_on: false,
        }
    }
}

impl Page {
    pub fn is_running(&self) -> bool {
        self.job_button.label.trim() == STOP_LABEL
    }

    pub fn show_running(&mut self, running: bool) {
        if running {
            self.job_button.label = STOP_LABEL.into();
            self.job_button.style = ButtonStyle::Warning;
        } else {
            self.job_button.label = START_LABEL.into();
            self.job_button.style = ButtonStyle::Success;
        }
        self.sidebar.set_locked(running);
    }
}

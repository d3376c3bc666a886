use super::page::{MovieCard, OverviewModal, Page, SettingsField, Theme, Toast};
use super::{Channel, PreferenceStore};
use crate::models::{ClientSettings, Movie};
use crate::protocol::{ClientEvent, ReplyStatus, ServerEvent, SidebarData, SidebarUpdate};
use chrono::Local;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const OVERVIEW_DEBOUNCE: Duration = Duration::from_millis(1500);
pub const SAVE_MESSAGE_DURATION: Duration = Duration::from_secs(1);
pub const TOAST_DURATION: Duration = Duration::from_secs(5);

const THEME_KEY: &str = "theme";
const SWITCH_KEY: &str = "switch-position";

/// Window geometry reported by scroll and touchmove events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub inner_height: f64,
    pub scroll_y: f64,
    pub body_height: f64,
}

impl Viewport {
    pub fn at_bottom(&self) -> bool {
        self.inner_height + self.scroll_y >= self.body_height
    }
}

/// Document geometry reported by touchend events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_height: f64,
    pub scroll_top: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn at_bottom(&self) -> bool {
        (self.scroll_height - self.client_height - self.scroll_top).abs() < 1.0
    }
}

pub struct UiController<C, P> {
    channel: C,
    prefs: P,
    page: Page,
    settings_pending: bool,
    overview_unlocks_at: Option<Instant>,
    save_message_hides_at: Option<Instant>,
    next_toast_id: u64,
}

impl<C: Channel, P: PreferenceStore> UiController<C, P> {
    pub fn new(channel: C, prefs: P) -> Self {
        let mut page = Page::default();
        if let Some(position) = prefs.load(SWITCH_KEY) {
            page.theme_switch_on = position == "true";
        }
        if let Some(theme) = prefs.load(THEME_KEY).as_deref().and_then(Theme::parse) {
            page.theme = theme;
        }

        Self {
            channel,
            prefs,
            page,
            settings_pending: false,
            overview_unlocks_at: None,
            save_message_hides_at: None,
            next_toast_id: 0,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    #[cfg(test)]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    #[cfg(test)]
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    #[cfg(test)]
    pub fn into_parts(self) -> (C, P) {
        (self.channel, self.prefs)
    }

    pub fn handle(&mut self, event: ServerEvent, now: Instant) {
        debug!(event = event.name(), "applying hub event");
        match event {
            ServerEvent::SidebarUpdate(update) => self.apply_sidebar_update(update),
            ServerEvent::RefreshMovie(movie) => self.refresh_movie(&movie),
            ServerEvent::MoreMoviesLoaded(movies) => self.append_movies(movies),
            ServerEvent::Clear => self.page.cards.clear(),
            ServerEvent::Toast(toast) => self.toast(toast.title, Some(toast.message), now),
            ServerEvent::SettingsLoaded(settings) => self.apply_settings(settings),
        }
    }

    pub fn on_disconnect(&mut self, now: Instant) {
        warn!("hub connection lost");
        self.toast("Connection Lost", Some("Please reconnect to continue.".into()), now);
    }

    fn apply_sidebar_update(&mut self, update: SidebarUpdate) {
        let sidebar = &mut self.page.sidebar;
        match (update.status, update.data) {
            (ReplyStatus::Success, data) => {
                sidebar.status_text = "Radarr List Retrieved".into();
                let items = match data {
                    SidebarData::Items(items) => items,
                    SidebarData::Text(_) => Vec::new(),
                };
                sidebar.rebuild(&items);
                sidebar.select_all_visible = true;
            }
            (ReplyStatus::Error, _) => {
                sidebar.status_text = update
                    .code
                    .map(|code| code.to_string())
                    .unwrap_or_default();
            }
        }
        sidebar.fetch_button_disabled = false;
        sidebar.spinner_visible = false;

        self.page.show_running(update.running);
        self.page.sidebar.sync_select_all();
    }

    fn refresh_movie(&mut self, movie: &Movie) {
        for card in self
            .page
            .cards
            .iter_mut()
            .filter(|card| card.match_name() == movie.name)
        {
            card.apply_status(movie.status);
        }
    }

    pub fn append_movies(&mut self, movies: Vec<Movie>) {
        self.page
            .cards
            .extend(movies.into_iter().map(MovieCard::new));
    }

    fn apply_settings(&mut self, settings: ClientSettings) {
        if !self.settings_pending {
            debug!("ignoring settings nobody asked for");
            return;
        }
        self.settings_pending = false;
        self.page.settings.fields = settings;
    }

    pub fn toast(&mut self, header: impl Into<String>, message: Option<String>, now: Instant) {
        self.next_toast_id += 1;
        self.page.toasts.push(Toast {
            id: self.next_toast_id,
            header: header.into(),
            message,
            shown_at: Local::now(),
            hide_at: now + TOAST_DURATION,
        });
    }

    pub fn dismiss_toast(&mut self, id: u64) {
        self.page.toasts.retain(|t| t.id != id);
    }

    pub fn fetch_library(&mut self, now: Instant) {
        let sidebar = &mut self.page.sidebar;
        sidebar.fetch_button_disabled = true;
        sidebar.spinner_visible = true;
        sidebar.status_text = "Accessing Radarr API".into();
        sidebar.items.clear();
        self.send(ClientEvent::RequestLibrary, now);
    }

    /// Start when idle, stop when running.
    pub fn toggle_job(&mut self, now: Instant) {
        if self.page.is_running() {
            self.page.show_running(false);
            self.send(ClientEvent::Stop, now);
        } else {
            self.page.show_running(true);
            let checked = self.page.sidebar.checked_names();
            let any = !checked.is_empty();
            self.send(ClientEvent::Start(checked), now);
            if any {
                self.toast("Loading new movies", None, now);
            }
        }
    }

    pub fn add_movie(&mut self, index: usize, now: Instant) -> bool {
        let Some(card) = self.page.cards.get_mut(index) else {
            return false;
        };
        if card.add_button.disabled {
            return false;
        }
        card.add_button.disabled = true;
        let event = ClientEvent::AddMovie(
            urlencoding::encode(&card.movie.name).into_owned(),
            card.movie.year.clone(),
        );
        self.send(event, now)
    }

    pub fn set_select_all(&mut self, checked: bool) {
        let sidebar = &mut self.page.sidebar;
        if sidebar.select_all.disabled {
            return;
        }
        sidebar.select_all.checked = checked;
        for item in &mut sidebar.items {
            item.checked = checked;
        }
    }

    pub fn set_item_checked(&mut self, index: usize, checked: bool) {
        let sidebar = &mut self.page.sidebar;
        match sidebar.items.get_mut(index) {
            Some(item) if !item.disabled => item.checked = checked,
            _ => return,
        }
        sidebar.sync_select_all();
    }

    pub fn open_settings(&mut self, now: Instant) {
        self.page.settings.open = true;
        self.settings_pending = true;
        self.send(ClientEvent::LoadSettings, now);
    }

    pub fn close_settings(&mut self) {
        self.page.settings.open = false;
        self.settings_pending = false;
    }

    pub fn edit_setting(&mut self, field: SettingsField, value: impl Into<String>) {
        *field.slot(&mut self.page.settings.fields) = value.into();
    }

    pub fn save_settings(&mut self, now: Instant) {
        let fields = self.page.settings.fields.clone();
        self.send(ClientEvent::UpdateSettings(fields), now);
        self.page.settings.save_message_visible = true;
        self.save_message_hides_at = Some(now + SAVE_MESSAGE_DURATION);
    }

    pub fn open_sidebar(&mut self, now: Instant) {
        self.send(ClientEvent::SidebarOpened, now);
    }

    /// Scroll and touchmove share the same bottom test.
    pub fn on_scroll(&mut self, viewport: Viewport, now: Instant) {
        if viewport.at_bottom() {
            self.send(ClientEvent::LoadMore, now);
        }
    }

    pub fn on_touch_end(&mut self, metrics: ScrollMetrics, now: Instant) {
        if metrics.at_bottom() {
            self.send(ClientEvent::LoadMore, now);
        }
    }

    pub fn show_overview(&mut self, index: usize, now: Instant) -> bool {
        if self.overview_unlocks_at.is_some_and(|until| now < until) {
            return false;
        }
        let Some(card) = self.page.cards.get(index) else {
            return false;
        };
        self.overview_unlocks_at = Some(now + OVERVIEW_DEBOUNCE);
        self.page.overview = Some(OverviewModal::for_movie(&card.movie));
        self.page.scroll_locked = true;
        true
    }

    pub fn close_overview(&mut self) {
        self.page.overview = None;
        self.page.scroll_locked = false;
    }

    pub fn toggle_theme(&mut self) -> anyhow::Result<()> {
        self.page.theme = self.page.theme.toggled();
        self.page.theme_switch_on = !self.page.theme_switch_on;
        self.prefs.store(THEME_KEY, self.page.theme.as_str())?;
        self.prefs
            .store(SWITCH_KEY, if self.page.theme_switch_on { "true" } else { "false" })?;
        Ok(())
    }

    /// Expires timed UI state.
    pub fn tick(&mut self, now: Instant) {
        if self.save_message_hides_at.is_some_and(|at| now >= at) {
            self.save_message_hides_at = None;
            self.page.settings.save_message_visible = false;
        }
        self.page.toasts.retain(|t| now < t.hide_at);
    }

    fn send(&mut self, event: ClientEvent, now: Instant) -> bool {
        let name = event.name();
        if !self.channel.is_connected() {
            self.toast("Connection Lost", Some("Please reload to continue.".into()), now);
            return false;
        }
        match self.channel.emit(event) {
            Ok(()) => {
                debug!(event = name, "sent");
                true
            }
            Err(e) => {
                warn!(event = name, error = %e, "send failed");
                self.toast("Connection Lost", Some("Please reload to continue.".into()), now);
                false
            }
        }
    }
}

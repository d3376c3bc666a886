use crate::models::{ClientSettings, Movie, SelectableItem};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Hub → client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "radarr_sidebar_update")]
    SidebarUpdate(SidebarUpdate),
    #[serde(rename = "refresh_movie")]
    RefreshMovie(Movie),
    #[serde(rename = "more_movies_loaded")]
    MoreMoviesLoaded(Vec<Movie>),
    #[serde(rename = "clear")]
    Clear,
    #[serde(rename = "new_toast_msg")]
    Toast(ToastMessage),
    #[serde(rename = "settings_loaded")]
    SettingsLoaded(ClientSettings),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::SidebarUpdate(_) => "radarr_sidebar_update",
            ServerEvent::RefreshMovie(_) => "refresh_movie",
            ServerEvent::MoreMoviesLoaded(_) => "more_movies_loaded",
            ServerEvent::Clear => "clear",
            ServerEvent::Toast(_) => "new_toast_msg",
            ServerEvent::SettingsLoaded(_) => "settings_loaded",
        }
    }
}

/// Client → hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "get_radarr_movies")]
    RequestLibrary,
    /// Percent-encoded movie name and its year.
    #[serde(rename = "adder")]
    AddMovie(String, String),
    #[serde(rename = "start_req")]
    Start(Vec<String>),
    #[serde(rename = "stop_req")]
    Stop,
    #[serde(rename = "update_settings")]
    UpdateSettings(ClientSettings),
    #[serde(rename = "load_settings")]
    LoadSettings,
    #[serde(rename = "side_bar_opened")]
    SidebarOpened,
    #[serde(rename = "load_more_movies")]
    LoadMore,
}

impl ClientEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::RequestLibrary => "get_radarr_movies",
            ClientEvent::AddMovie(..) => "adder",
            ClientEvent::Start(_) => "start_req",
            ClientEvent::Stop => "stop_req",
            ClientEvent::UpdateSettings(_) => "update_settings",
            ClientEvent::LoadSettings => "load_settings",
            ClientEvent::SidebarOpened => "side_bar_opened",
            ClientEvent::LoadMore => "load_more_movies",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SidebarUpdate {
    #[serde(rename = "Status")]
    pub status: ReplyStatus,
    #[serde(rename = "Code", default)]
    pub code: Option<ReplyCode>,
    #[serde(rename = "Data", default)]
    pub data: SidebarData,
    #[serde(rename = "Running", default)]
    pub running: bool,
}

impl SidebarUpdate {
    pub fn success(items: Vec<SelectableItem>, running: bool) -> Self {
        Self {
            status: ReplyStatus::Success,
            code: None,
            data: SidebarData::Items(items),
            running,
        }
    }

    pub fn error(code: ReplyCode, data: SidebarData, running: bool) -> Self {
        Self {
            status: ReplyStatus::Error,
            code: Some(code),
            data,
            running,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyStatus {
    Success,
    Error,
}

/// Either an HTTP status or a free-form reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReplyCode {
    Http(u16),
    Reason(String),
}

impl fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyCode::Http(code) => write!(f, "{code}"),
            ReplyCode::Reason(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SidebarData {
    Items(Vec<SelectableItem>),
    Text(String),
}

impl Default for SidebarData {
    fn default() -> Self {
        SidebarData::Items(Vec::new())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToastMessage {
    pub title: String,
    pub message: String,
}

impl ToastMessage {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub fn encode<T: Serialize>(event: &T) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(event)?)
}

pub fn decode<T: DeserializeOwned>(frame: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(frame)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieStatus;
    use serde_json::json;

    #[test]
    fn adder_payload_is_a_name_year_pair() {
        let frame = encode(&ClientEvent::AddMovie("Am%C3%A9lie".into(), "2001".into())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value, json!({"event": "adder", "data": ["Am%C3%A9lie", "2001"]}));
    }

    #[test]
    fn payloadless_events_omit_data() {
        let frame = encode(&ClientEvent::LoadMore).unwrap();
        assert_eq!(frame, r#"{"event":"load_more_movies"}"#);
        let event: ServerEvent = decode(r#"{"event":"clear"}"#).unwrap();
        assert_eq!(event, ServerEvent::Clear);
    }

    #[test]
    fn sidebar_update_accepts_item_list_or_error_text() {
        let ok: ServerEvent = decode(
            &json!({
                "event": "radarr_sidebar_update",
                "data": {
                    "Status": "Success",
                    "Code": null,
                    "Data": [{"name": "Alien", "checked": true}],
                    "Running": false
                }
            })
            .to_string(),
        )
        .unwrap();
        let ServerEvent::SidebarUpdate(update) = ok else {
            panic!("wrong event");
        };
        assert_eq!(update.status, ReplyStatus::Success);
        assert_eq!(update.data, SidebarData::Items(vec![SelectableItem::new("Alien", true)]));

        let err: ServerEvent = decode(
            &json!({
                "event": "radarr_sidebar_update",
                "data": {"Status": "Error", "Code": 401, "Data": "Unauthorized", "Running": true}
            })
            .to_string(),
        )
        .unwrap();
        let ServerEvent::SidebarUpdate(update) = err else {
            panic!("wrong event");
        };
        assert_eq!(update.code, Some(ReplyCode::Http(401)));
        assert_eq!(update.data, SidebarData::Text("Unauthorized".into()));
        assert!(update.running);
    }

    #[test]
    fn refresh_movie_carries_the_status_string() {
        let event: ServerEvent = decode(
            &json!({
                "event": "refresh_movie",
                "data": {"Name": "Heat", "Year": "1995", "Status": "Added"}
            })
            .to_string(),
        )
        .unwrap();
        match event {
            ServerEvent::RefreshMovie(movie) => assert_eq!(movie.status, MovieStatus::Added),
            other => panic!("unexpected {}", other.name()),
        }
    }

    #[test]
    fn unknown_event_is_a_protocol_error() {
        let result = decode::<ServerEvent>(r#"{"event":"reboot"}"#);
        assert!(matches!(result, Err(ProtocolError::Malformed(_))));
    }
}

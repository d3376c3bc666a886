use crate::ui::{Channel, PreferenceStore, ScrollMetrics, SettingsField, UiController, Viewport};
use std::time::Instant;
use thiserror::Error;
use tracing::warn;

pub const HELP: &str = "\
commands:
  fetch                 load the Radarr library into the sidebar
  start | stop | job    toggle the recommendation run
  check N | uncheck N   tick or untick sidebar item N
  all | none            tick or untick every sidebar item
  add N                 add movie card N to Radarr
  info N | close        show or hide the overview of card N
  more                  scroll to the bottom and ask for more movies
  swipe                 same as more, as a touch gesture
  sidebar               re-open the sidebar
  settings              open the settings form
  set FIELD VALUE       edit radarr_address, radarr_api_key, root_folder_path or tmdb_api_key
  save | cancel         save or close the settings form
  theme                 switch between light and dark
  dismiss ID            hide a toast
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Fetch,
    Job,
    Check(usize),
    Uncheck(usize),
    SelectAll(bool),
    Add(usize),
    Info(usize),
    Close,
    More,
    Swipe,
    Sidebar,
    Settings,
    Set(SettingsField, String),
    Save,
    Cancel,
    Theme,
    Dismiss(u64),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("'{0}' is not a valid number")]
    BadNumber(String),
    #[error("unknown settings field '{0}'")]
    UnknownField(String),
}

/// Parses one input line. Card and item numbers are 1-based on screen and
/// 0-based in the result.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Ok(None),
        "fetch" => Command::Fetch,
        "start" | "stop" | "job" => Command::Job,
        "check" => Command::Check(index("check", rest)?),
        "uncheck" => Command::Uncheck(index("uncheck", rest)?),
        "all" => Command::SelectAll(true),
        "none" => Command::SelectAll(false),
        "add" => Command::Add(index("add", rest)?),
        "info" => Command::Info(index("info", rest)?),
        "close" => Command::Close,
        "more" => Command::More,
        "swipe" => Command::Swipe,
        "sidebar" => Command::Sidebar,
        "settings" => Command::Settings,
        "set" => {
            let (name, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if name.is_empty() {
                return Err(CommandError::MissingArgument("set"));
            }
            let field = SettingsField::parse(name)
                .ok_or_else(|| CommandError::UnknownField(name.to_string()))?;
            Command::Set(field, value.trim().to_string())
        }
        "save" => Command::Save,
        "cancel" => Command::Cancel,
        "theme" => Command::Theme,
        "dismiss" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("dismiss"));
            }
            Command::Dismiss(
                rest.parse()
                    .map_err(|_| CommandError::BadNumber(rest.to_string()))?,
            )
        }
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn index(command: &'static str, arg: &str) -> Result<usize, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingArgument(command));
    }
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(CommandError::BadNumber(arg.to_string())),
    }
}

/// Applies a command and returns any text meant for the user.
/// `rendered_lines` and `rows` stand in for document and window height.
pub fn apply<C: Channel, P: PreferenceStore>(
    controller: &mut UiController<C, P>,
    command: Command,
    rendered_lines: usize,
    rows: usize,
    now: Instant,
) -> Option<String> {
    let body = rendered_lines as f64;
    let inner = rows as f64;
    match command {
        Command::Fetch => controller.fetch_library(now),
        Command::Job => controller.toggle_job(now),
        Command::Check(i) => controller.set_item_checked(i, true),
        Command::Uncheck(i) => controller.set_item_checked(i, false),
        Command::SelectAll(checked) => controller.set_select_all(checked),
        Command::Add(i) => {
            if !controller.add_movie(i, now) {
                return Some(format!("card {} cannot be added", i + 1));
            }
        }
        Command::Info(i) => {
            if !controller.show_overview(i, now) {
                return Some(format!("no overview for card {} right now", i + 1));
            }
        }
        Command::Close => controller.close_overview(),
        Command::More | Command::Swipe if controller.page().scroll_locked => {
            return Some("close the overview first".to_string());
        }
        Command::More => {
            let viewport = Viewport {
                inner_height: inner,
                scroll_y: (body - inner).max(0.0),
                body_height: body,
            };
            controller.on_scroll(viewport, now);
        }
        Command::Swipe => {
            let visible = inner.min(body);
            let metrics = ScrollMetrics {
                scroll_height: body,
                scroll_top: body - visible,
                client_height: visible,
            };
            controller.on_touch_end(metrics, now);
        }
        Command::Sidebar => controller.open_sidebar(now),
        Command::Settings => controller.open_settings(now),
        Command::Set(field, value) => controller.edit_setting(field, value),
        Command::Save => controller.save_settings(now),
        Command::Cancel => controller.close_settings(),
        Command::Theme => {
            if let Err(e) = controller.toggle_theme() {
                warn!("Saving theme preference failed: {:#}", e);
                return Some(format!("theme not saved: {e}"));
            }
        }
        Command::Dismiss(id) => controller.dismiss_toast(id),
        Command::Help => return Some(HELP.to_string()),
        Command::Quit => {}
    }
    None
}

use crate::ui::{ButtonStyle, CardTone, MovieCard, Page};
use std::fmt::Write;

/// Plain-text frame of the whole page.
pub fn page(page: &Page) -> String {
    let mut out = String::new();
    let job = &page.job_button;
    let _ = writeln!(
        out,
        "=== radarec [{}] ===  {}",
        page.theme.as_str(),
        button(&job.label, job.style, job.disabled)
    );

    sidebar(&mut out, page);

    let _ = writeln!(out, "--- movies ({}) ---", page.cards.len());
    for (i, card) in page.cards.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {}", i + 1, card_line(card));
    }

    if let Some(overview) = &page.overview {
        let _ = writeln!(out, "--- {} ---", overview.title);
        for line in &overview.lines {
            let _ = writeln!(out, "    {line}");
        }
        let _ = writeln!(out, "    (close)");
    }

    if page.settings.open {
        let fields = &page.settings.fields;
        let _ = writeln!(out, "--- settings ---");
        let _ = writeln!(out, "    radarr_address   = {}", fields.radarr_address);
        let _ = writeln!(out, "    radarr_api_key   = {}", fields.radarr_api_key);
        let _ = writeln!(out, "    root_folder_path = {}", fields.root_folder_path);
        let _ = writeln!(out, "    tmdb_api_key     = {}", fields.tmdb_api_key);
        if page.settings.save_message_visible {
            let _ = writeln!(out, "    Settings saved.");
        }
    }

    for toast in &page.toasts {
        let _ = write!(
            out,
            "[#{} {}] {}",
            toast.id,
            toast.shown_at.format("%H:%M:%S"),
            toast.header
        );
        if let Some(message) = &toast.message {
            let _ = write!(out, ": {message}");
        }
        out.push('\n');
    }
    out
}

fn sidebar(out: &mut String, page: &Page) {
    let sidebar = &page.sidebar;
    let spinner = if sidebar.spinner_visible { " ..." } else { "" };
    let _ = writeln!(
        out,
        "--- radarr library: {}{} ---  {}",
        sidebar.status_text,
        spinner,
        button("Fetch", ButtonStyle::Primary, sidebar.fetch_button_disabled)
    );
    if sidebar.select_all_visible {
        let _ = writeln!(
            out,
            "     {} select all",
            checkbox(sidebar.select_all.checked, sidebar.select_all.disabled)
        );
    }
    for (i, item) in sidebar.items.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {} {}",
            i + 1,
            checkbox(item.checked, item.disabled),
            item.value
        );
    }
}

fn card_line(card: &MovieCard) -> String {
    let tone = match card.tone {
        CardTone::Green => "+",
        CardTone::Red => "!",
        CardTone::Blue => " ",
    };
    let mut line = format!(
        "{tone} {} | {} | {} | {} | {}",
        card.title,
        card.genre,
        card.votes,
        card.rating,
        button(&card.add_button.label, card.add_button.style, card.add_button.disabled)
    );
    if let Some(poster) = &card.poster {
        let _ = write!(line, " | {}: {}", poster.alt, poster.src);
    }
    line
}

fn checkbox(checked: bool, disabled: bool) -> &'static str {
    match (checked, disabled) {
        (true, false) => "[x]",
        (false, false) => "[ ]",
        (true, true) => "{x}",
        (false, true) => "{ }",
    }
}

fn button(label: &str, style: ButtonStyle, disabled: bool) -> String {
    let marker = match style {
        ButtonStyle::Primary => "",
        ButtonStyle::Secondary => "=",
        ButtonStyle::Danger => "!",
        ButtonStyle::Success => "+",
        ButtonStyle::Warning => "~",
    };
    if disabled {
        format!("({marker}{label})")
    } else {
        format!("<{marker}{label}>")
    }
}

use deunicode::deunicode_with_tofu;
use regex::Regex;
use std::sync::LazyLock;

static YEAR_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" \(\d{4}\)").unwrap());
static TRAILING_YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(\d{4}\)$").unwrap());

/// Library title as shown in the sidebar: ASCII-folded, year tags removed.
pub fn library_name(title: &str) -> String {
    YEAR_TAG.replace_all(&ascii_fold(title), "").into_owned()
}

/// Key used to test whether a title is already in the library.
pub fn folded_key(title: &str) -> String {
    ascii_fold(title).to_lowercase()
}

// Characters with no transliteration become spaces.
fn ascii_fold(title: &str) -> String {
    deunicode_with_tofu(title, " ")
}

/// Strips the ` (YYYY)` suffix from a rendered card title.
pub fn card_name(title: &str) -> &str {
    let title = title.trim();
    match TRAILING_YEAR.find(title) {
        Some(m) => &title[..m.start()],
        None => title,
    }
}

/// Similarity in 0..=100 based on the indel distance, so that
/// `ratio = 2 * lcs / (len(a) + len(b))`.
pub fn fuzzy_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    let lcs = prev[b.len()];

    ((200 * lcs) as f64 / total as f64).round() as u8
}

/// Folder name Radarr would derive for a title.
pub fn folder_name(title: &str) -> String {
    title.replace('/', " ")
}

pub fn title_slug(title: &str) -> String {
    title.to_lowercase().replace(' ', "-")
}

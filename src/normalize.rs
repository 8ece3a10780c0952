//! Pure field-normalization transforms applied between extraction and storage.

/// Characters surrounding the numeric part of a CSS width value, e.g.
/// `"width:80%;"`. Trimmed from both ends before parsing.
const WIDTH_CHARS: &[char] = &['w', 'i', 'd', 't', 'h', ':', ';', ' ', '%'];

const PUBLISHED_PREFIX: &str = "Published on ";

/// Convert a rating-bar width string like `"width:80%;"` into a star count.
///
/// The percentage is scaled to a 0-5 range and rounded half away from zero,
/// then clamped so the result is always in `[0, 5]`. Anything that does not
/// parse as a number yields 0, never an error.
pub fn percentage_to_stars(raw: &str) -> i64 {
    let digits = raw.trim_matches(|c: char| WIDTH_CHARS.contains(&c));
    match digits.parse::<f64>() {
        Ok(pct) => ((pct / 100.0 * 5.0).round() as i64).clamp(0, 5),
        Err(_) => 0,
    }
}

/// Split a "Published on <date>, <time>" string into its date and time parts.
///
/// The split is on the first `", "`; when the separator is absent the
/// sentinel pair `("No date", "No time")` is returned.
pub fn split_published(raw: &str) -> (String, String) {
    let rest = raw.strip_prefix(PUBLISHED_PREFIX).unwrap_or(raw);
    match rest.split_once(", ") {
        Some((date, time)) => (date.to_string(), time.to_string()),
        None => ("No date".to_string(), "No time".to_string()),
    }
}

/// Strip the site's literal lowercase "na " prefix from a company string.
///
/// Only the exact lowercase prefix is matched; mixed-case strings come back
/// trimmed but otherwise untouched.
pub fn clean_company(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.strip_prefix("na ") {
        Some(rest) => rest.to_string(),
        None => trimmed.to_string(),
    }
}

// ── Tests ──

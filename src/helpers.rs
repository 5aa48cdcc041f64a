use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Placeholder for missing values.
pub const DASH: &str = "—";

/// Parse the timestamp shapes the API emits: RFC 3339, naive ISO (treated as
/// UTC), RFC 2822 (feed dates), or a bare date.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `Jan 5, 2026`, or the dash when missing. Unparseable input is shown as-is.
pub fn format_date(value: Option<&str>) -> String {
    match value.filter(|v| !v.is_empty()) {
        None => DASH.to_string(),
        Some(v) => match parse_timestamp(v) {
            Some(dt) => dt.format("%b %-d, %Y").to_string(),
            None => v.to_string(),
        },
    }
}

/// `12m ago`, `5h ago`, `3d ago`; a week or older falls back to the date.
pub fn format_relative(value: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(v) = value.filter(|v| !v.is_empty()) else {
        return DASH.to_string();
    };
    let Some(dt) = parse_timestamp(v) else {
        return v.to_string();
    };
    let diff = (now - dt).num_seconds().max(0);
    let minutes = diff / 60;
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = diff / 3600;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    let days = diff / 86_400;
    if days < 7 {
        return format!("{}d ago", days);
    }
    format_date(Some(v))
}

pub fn relative(value: Option<&str>) -> String {
    format_relative(value, Utc::now())
}

/// Deal value: `$1.2M`, `$500K`, `$750`; missing or zero is the dash.
pub fn format_value(value: Option<i64>) -> String {
    match value {
        None | Some(0) => DASH.to_string(),
        Some(v) if v >= 1_000_000 => format!("${:.1}M", v as f64 / 1_000_000.0),
        Some(v) if v >= 1_000 => format!("${:.0}K", v as f64 / 1_000.0),
        Some(v) => format!("${}", v),
    }
}

/// `closed_won` → `closed won`.
pub fn humanize(value: &str) -> String {
    value.replace('_', " ")
}

/// First `max` characters, with an ellipsis when cut.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", head)
}

/// Bar of `width` cells filled in proportion to `count / total`.
pub fn proportion_bar(count: u64, total: u64, width: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((count as f64 / total as f64) * width as f64).round() as usize
    };
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

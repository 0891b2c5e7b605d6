//! Relative publication times in Brazilian Portuguese

use chrono::{DateTime, Datelike, NaiveDateTime, Timelike, Utc};

const MONTHS: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Parses an ISO-8601 timestamp; offset-less values are taken as UTC
fn parse_published(published_at: &str) -> Option<DateTime<Utc>> {
    let trimmed = published_at.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn absolute(dt: &DateTime<Utc>) -> String {
    format!(
        "{} de {}. {:02}:{:02}",
        dt.day(),
        MONTHS[dt.month0() as usize],
        dt.hour(),
        dt.minute()
    )
}

/// Formats how long ago `published_at` was, relative to `now`
///
/// Timestamps in the future or more than a week old are shown as an absolute
/// date like `12 de jun. 14:30`.
pub fn format_relative_time(published_at: &str, now: DateTime<Utc>) -> String {
    let Some(published) = parse_published(published_at) else {
        return "Data inválida".to_string();
    };

    let elapsed = now.signed_duration_since(published);
    if elapsed.num_milliseconds() < 0 || elapsed.num_days() > 7 {
        return absolute(&published);
    }

    match (elapsed.num_days(), elapsed.num_hours(), elapsed.num_minutes()) {
        (days, _, _) if days >= 2 => format!("{} dias atrás", days),
        (1, _, _) => "Ontem".to_string(),
        (_, hours, _) if hours >= 1 => format!("{}h atrás", hours),
        (_, _, minutes) if minutes >= 1 => format!("{}min atrás", minutes),
        _ => "Agora".to_string(),
    }
}

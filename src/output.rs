// Terminal output helpers.
// Table construction and humanized ages for list commands.

use chrono::{DateTime, Duration, Utc};
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};

/// Build a table with bold headers and the house preset.
pub fn base_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|header| Cell::new(header).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

/// Truncate to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Humanize the time elapsed since `then`, e.g. "3 days ago".
pub fn since<Tz: chrono::TimeZone>(then: DateTime<Tz>) -> String {
    humanize_age(Utc::now().signed_duration_since(then))
}

/// Humanize a non-negative age.
pub fn humanize_age(age: Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }

    let (count, unit) = if minutes < 60 {
        (minutes, "minute")
    } else if age.num_hours() < 24 {
        (age.num_hours(), "hour")
    } else if age.num_days() < 30 {
        (age.num_days(), "day")
    } else if age.num_days() < 365 {
        (age.num_days() / 30, "month")
    } else {
        (age.num_days() / 365, "year")
    };

    let plural = if count == 1 { "" } else { "s" };
    format!("{count} {unit}{plural} ago")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanize_age_units() {
        assert_eq!(humanize_age(Duration::seconds(30)), "just now");
        assert_eq!(humanize_age(Duration::minutes(1)), "1 minute ago");
        assert_eq!(humanize_age(Duration::minutes(45)), "45 minutes ago");
        assert_eq!(humanize_age(Duration::hours(3)), "3 hours ago");
        assert_eq!(humanize_age(Duration::days(3)), "3 days ago");
        assert_eq!(humanize_age(Duration::days(90)), "3 months ago");
        assert_eq!(humanize_age(Duration::days(800)), "2 years ago");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("short", 75), "short");
    }
}

//! Command implementations for the `devdesk` binary

pub mod agent;
pub mod calendar;
pub mod editor;
pub mod migrate;
pub mod project;
pub mod sync_log;
pub mod task;
pub mod tool;
pub mod workspace;

use anyhow::{anyhow, Result};

/// First 8 characters of an id, for table output.
pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Cut `text` to its first line and at most `max` characters.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

/// `YYYY-MM-DD HH:MM` from an RFC 3339 timestamp; anything else is shown as is.
pub(crate) fn short_time(ts: &str) -> String {
    match (ts.get(..10), ts.get(11..16)) {
        (Some(date), Some(time)) => format!("{} {}", date, time),
        _ => ts.to_string(),
    }
}

/// Find an item by id prefix or exact name.
pub(crate) fn resolve<'a, T>(
    items: &'a [T],
    query: &str,
    kind: &str,
    key: impl Fn(&T) -> (&str, &str),
) -> Result<&'a T> {
    if let Some(exact) = items.iter().find(|i| {
        let (id, name) = key(*i);
        id == query || name == query
    }) {
        return Ok(exact);
    }

    let matches: Vec<&T> = items
        .iter()
        .filter(|i| key(*i).0.starts_with(query))
        .collect();
    match matches.as_slice() {
        [one] => Ok(*one),
        [] => Err(anyhow!("{} not found: {}", kind, query)),
        _ => Err(anyhow!("{} id prefix is ambiguous: {}", kind, query)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_ids() {
        assert_eq!(short_id("1234567890"), "12345678");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn truncates_first_line() {
        assert_eq!(truncate("short\nsecond", 10), "short");
        assert_eq!(truncate("a very long title", 10), "a very ...");
    }

    #[test]
    fn short_times() {
        assert_eq!(short_time("2026-10-19T09:30:00+00:00"), "2026-10-19 09:30");
        assert_eq!(short_time("yesterday"), "yesterday");
        // Char boundaries inside the slices must not panic.
        assert_eq!(short_time("2026-10-1é9:30:00 later"), "2026-10-1é9:30:00 later");
    }

    #[test]
    fn resolves_by_prefix_or_name() {
        fn key<'a>(i: &'a (&'static str, &'static str)) -> (&'a str, &'a str) {
            (i.0, i.1)
        }
        let items = vec![("abc123", "alpha"), ("abd456", "beta")];

        assert_eq!(resolve(&items, "beta", "item", key).unwrap().0, "abd456");
        assert_eq!(resolve(&items, "abc", "item", key).unwrap().1, "alpha");
        assert!(resolve(&items, "ab", "item", key).is_err());
        assert!(resolve(&items, "zzz", "item", key).is_err());
    }
}

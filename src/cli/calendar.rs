//! Calendar commands

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};

use super::workspace;
use super::{resolve, short_id, short_time, truncate};
use crate::store::{CalendarRepo, NewCalendarEvent, WorkspaceRepo};

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM` (UTC) or a bare date.
fn parse_time(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
        return Ok(dt.and_utc());
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("invalid date or time: {}", input))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| anyhow!("invalid date: {}", input))
}

#[allow(clippy::too_many_arguments)]
pub fn add(
    repo: &CalendarRepo,
    workspaces: &WorkspaceRepo,
    title: String,
    start: &str,
    end: Option<String>,
    all_day: bool,
    location: Option<String>,
    workspace_query: Option<String>,
) -> Result<()> {
    let start_at = parse_time(start)?.to_rfc3339();
    let end_at = end.map(|e| parse_time(&e)).transpose()?.map(|e| e.to_rfc3339());
    let workspace_id = workspace_query
        .map(|q| workspace::find(workspaces, &q).map(|w| w.id))
        .transpose()?;

    let event = repo.add(NewCalendarEvent {
        title,
        start_at,
        end_at,
        all_day,
        location,
        workspace_id,
        ..Default::default()
    })?;
    println!("Event '{}' added with ID: {}", event.title, short_id(&event.id));
    Ok(())
}

/// Events in `[from, from + days)`; everything when `from` is not given.
pub fn list(repo: &CalendarRepo, from: Option<String>, days: i64) -> Result<()> {
    let events = match from {
        Some(from) => {
            let from = parse_time(&from)?;
            let to = window_end(from, days)?;
            repo.get_between(&from.to_rfc3339(), &to.to_rfc3339())?
        }
        None => repo.get_all()?,
    };
    if events.is_empty() {
        println!("No events found.");
        return Ok(());
    }

    println!("{:<10} {:<17} {:<17} {:<24} {}", "ID", "Start", "End", "Title", "Location");
    println!("{}", "-".repeat(90));
    for e in events {
        let start = if e.all_day {
            e.start_at.get(..10).unwrap_or(&e.start_at).to_string() + " all day"
        } else {
            short_time(&e.start_at)
        };
        println!(
            "{:<10} {:<17} {:<17} {:<24} {}",
            short_id(&e.id),
            start,
            e.end_at.as_deref().map(short_time).unwrap_or_else(|| "-".to_string()),
            truncate(&e.title, 24),
            e.location.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn window_end(from: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    match TimeDelta::try_days(days).and_then(|span| from.checked_add_signed(span)) {
        Some(to) => Ok(to),
        None => bail!("--days {} is out of range", days),
    }
}

pub fn remove(repo: &CalendarRepo, query: &str) -> Result<()> {
    let events = repo.get_all()?;
    let event = resolve(&events, query, "Event", |e| (e.id.as_str(), e.title.as_str()))?;
    repo.remove(&event.id)?;
    println!("Event '{}' removed", event.title);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_formats() {
        let rfc = parse_time("2026-10-19T09:30:00+02:00").unwrap();
        assert_eq!(rfc.to_rfc3339(), "2026-10-19T07:30:00+00:00");

        let minute = parse_time("2026-10-19 09:30").unwrap();
        assert_eq!(minute.to_rfc3339(), "2026-10-19T09:30:00+00:00");

        let day = parse_time("2026-10-19").unwrap();
        assert_eq!(day.to_rfc3339(), "2026-10-19T00:00:00+00:00");

        assert!(parse_time("next tuesday").is_err());
    }

    #[test]
    fn window_end_rejects_out_of_range_days() {
        let from = parse_time("2026-10-19").unwrap();
        assert_eq!(
            window_end(from, 7).unwrap().to_rfc3339(),
            "2026-10-26T00:00:00+00:00"
        );
        assert!(window_end(from, 1_000_000_000_000).is_err());
        assert!(window_end(from, i64::MAX).is_err());
    }
}

//! Demo records installed by the `seed` binary and the in-memory store.

use chrono::{Datelike, TimeZone, Utc};
use vteacher_core::{RecordInput, Timestamp};

/// A seed row: the record fields plus the creation time to stamp it with.
#[derive(Debug, Clone)]
pub struct SeedRecord {
    pub input: RecordInput,
    pub created_at: Timestamp,
}

/// The demo records, oldest first.
///
/// The first three are dated within the current year; the last is dated
/// `now`.
pub fn demo_records(now: Timestamp) -> Vec<SeedRecord> {
    let start_of_year = Utc
        .with_ymd_and_hms(now.year(), 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let span = now - start_of_year;
    let at = |fraction: i32| start_of_year + span / 4 * fraction;

    let rows = [
        (
            "Meeting VTeachers",
            "This is an example vteacher. It contains **Markdown**!",
            at(1),
        ),
        (
            "Make a thing",
            "It's very easy to make some words **bold** and other words *italic* with\n\
             Markdown. You can even [link to React's website!](https://www.reactjs.org).",
            at(2),
        ),
        (
            "A vteacher with a very long title because sometimes you need more words",
            "You can write all kinds of [amazing](https://en.wikipedia.org/wiki/The_Amazing)\n\
             vteachers in this app! These vteacher live on the server in the `vteachers` folder.",
            at(3),
        ),
        (
            "I wrote this vteacher today",
            "It was an excellent vteacher.",
            now,
        ),
    ];

    rows.into_iter()
        .map(|(title, body, created_at)| SeedRecord {
            input: RecordInput::new(title, body),
            created_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_records_are_chronological() {
        let now = Utc::now();
        let records = demo_records(now);
        assert_eq!(records.len(), 4);
        assert!(records.windows(2).all(|w| w[0].created_at <= w[1].created_at));
        assert_eq!(records[3].created_at, now);
        assert_eq!(records[0].input.title, "Meeting VTeachers");
    }
}

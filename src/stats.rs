//! Aggregated statistics over completed transactions

use crate::store::{Recording, RecordingKind};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;

/// Income and expense totals for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// Month key, `YYYY-MM`
    pub month: String,
    pub income: f64,
    pub expense: f64,
}

/// Parse a `YYYY-MM` month key into (year, month).
pub fn parse_month(key: &str) -> Result<(i32, u32)> {
    let (year, month) = key
        .split_once('-')
        .ok_or_else(|| anyhow!("Invalid month key: {key}"))?;
    let year: i32 = year.parse().map_err(|_| anyhow!("Invalid year in {key}"))?;
    let month: u32 = month
        .parse()
        .map_err(|_| anyhow!("Invalid month in {key}"))?;
    if !(1..=12).contains(&month) {
        return Err(anyhow!("Month out of range in {key}"));
    }
    Ok((year, month))
}

/// Default reporting range: the current month and the two before it.
pub fn default_range(now: DateTime<Utc>) -> ((i32, u32), (i32, u32)) {
    let end = (now.year(), now.month());
    let start = months_back(end, 2);
    (start, end)
}

fn months_back((year, month): (i32, u32), n: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - n as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

fn next_month((year, month): (i32, u32)) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

fn month_key((year, month): (i32, u32)) -> String {
    format!("{year:04}-{month:02}")
}

/// Bucket completed transactions into per-month income/expense totals.
///
/// Every month in the inclusive range gets an entry, zeroed when nothing
/// happened that month. Incomplete recordings (no extracted amount yet) are
/// skipped.
pub fn monthly_summary(
    recordings: &[Recording],
    start: (i32, u32),
    end: (i32, u32),
) -> Vec<MonthlySummary> {
    let mut summaries = Vec::new();

    let mut current = start;
    while current <= end {
        summaries.push(MonthlySummary {
            month: month_key(current),
            income: 0.0,
            expense: 0.0,
        });
        current = next_month(current);
    }

    for recording in recordings {
        if !recording.is_transaction() {
            continue;
        }

        let key = month_key((recording.created_at.year(), recording.created_at.month()));
        let Some(summary) = summaries.iter_mut().find(|s| s.month == key) else {
            continue;
        };

        let amount = recording.amount.unwrap_or(0.0);
        match recording.kind {
            Some(RecordingKind::Income) => summary.income += amount,
            Some(RecordingKind::Outcome) => summary.expense += amount,
            None => {}
        }
    }

    summaries
}

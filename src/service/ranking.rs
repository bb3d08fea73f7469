//! Monthly referral ranking and leader-change evaluation.
//!
//! Ordering: month count descending, then first event of the month ascending (an
//! earlier start wins the tie), then referrer id ascending so the order is total.
//! Referrers without events this month sort last.

use std::cmp::Ordering;

use chrono::{DateTime, Datelike, FixedOffset, Utc};

use crate::{
    models::referralmodel::{RankedEntry, ReferralRecord},
    utils::timestamp::parse_event_time,
};

/// Number of entries shown in a leader announcement.
pub const TOP_RANKED: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// Nobody has a referral in the current month.
    NoActivity,
    /// The leader is the one already announced.
    Unchanged { leader: RankedEntry },
    LeaderChanged {
        previous: Option<String>,
        leader: RankedEntry,
        top_three: Vec<RankedEntry>,
    },
}

/// Whether `event` falls in the same calendar month as `now`, both read at `offset`.
pub fn in_current_month(event: DateTime<Utc>, now: DateTime<Utc>, offset: FixedOffset) -> bool {
    let event = event.with_timezone(&offset);
    let now = now.with_timezone(&offset);
    event.year() == now.year() && event.month() == now.month()
}

pub fn rank_entry(record: &ReferralRecord, now: DateTime<Utc>, offset: FixedOffset) -> RankedEntry {
    let month_events: Vec<DateTime<Utc>> = record
        .history
        .iter()
        .filter_map(|raw| parse_event_time(raw))
        .filter(|event| in_current_month(*event, now, offset))
        .collect();

    RankedEntry {
        id: record.id.clone(),
        month_count: month_events.len(),
        first_event_in_month: month_events.iter().min().copied(),
    }
}

fn compare_first_event(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_entries(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    b.month_count
        .cmp(&a.month_count)
        .then_with(|| compare_first_event(a.first_event_in_month, b.first_event_in_month))
        .then_with(|| a.id.cmp(&b.id))
}

/// Rank every record for the month containing `now`.
pub fn rank_month(records: &[ReferralRecord], now: DateTime<Utc>, offset: FixedOffset) -> Vec<RankedEntry> {
    let mut ranked: Vec<RankedEntry> = records
        .iter()
        .map(|record| rank_entry(record, now, offset))
        .collect();

    ranked.sort_by(compare_entries);
    ranked
}

/// Ranked entries with at least one referral this month.
pub fn monthly_standings(records: &[ReferralRecord], now: DateTime<Utc>, offset: FixedOffset) -> Vec<RankedEntry> {
    rank_month(records, now, offset)
        .into_iter()
        .filter(|entry| entry.month_count > 0)
        .collect()
}

/// Decide whether the leader changed since `previous_leader` was announced.
pub fn evaluate(
    records: &[ReferralRecord],
    now: DateTime<Utc>,
    offset: FixedOffset,
    previous_leader: Option<&str>,
) -> Evaluation {
    let top_three: Vec<RankedEntry> = monthly_standings(records, now, offset)
        .into_iter()
        .take(TOP_RANKED)
        .collect();

    let Some(leader) = top_three.first().cloned() else {
        return Evaluation::NoActivity;
    };

    if previous_leader == Some(leader.id.as_str()) {
        Evaluation::Unchanged { leader }
    } else {
        Evaluation::LeaderChanged {
            previous: previous_leader.map(str::to_string),
            leader,
            top_three,
        }
    }
}

/// Announcement posted when a new leader takes first place.
pub fn compose_announcement(top_three: &[RankedEntry], leaderboard_url: &str) -> String {
    let mut message = match top_three.first() {
        Some(leader) => format!(
            "🥇 *{}* just pulled into the lead with *{} referrals* this month!\n\n",
            leader.id,
            leader.month_count
        ),
        None => String::new(),
    };

    message.push_str(&format!("🏆 *Top {} Referrers:*\n", TOP_RANKED));
    let lines: Vec<String> = top_three
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{}. *{}* – {} referrals", i + 1, entry.id, entry.month_count))
        .collect();
    message.push_str(&lines.join("\n"));

    message.push_str("\n\nKeep it up, everyone! 💪");
    if !leaderboard_url.is_empty() {
        message.push_str(&format!(" Check the rest of the list- {}", leaderboard_url));
    }

    message
}

use crate::models::{
    CheckIn, Dashboard, Mood, MoodDistribution, MoodShare, Streak, TrendPoint, WeekdayMood,
    WeeklySummary, WeeklyTrend,
};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};

/// Number of most recent check-ins charted as the mood window.
pub const WINDOW_SIZE: usize = 7;

/// Consecutive-day streak ending at the most recent logged day.
///
/// Input order does not matter; same-day check-ins count once. Returns
/// `None` for an empty batch.
pub fn compute_streak(check_ins: &[CheckIn]) -> Option<Streak> {
    let days: BTreeSet<NaiveDate> = check_ins.iter().map(CheckIn::day).collect();
    let mut descending = days.iter().rev().copied();
    let last_logged = descending.next()?;

    let mut length = 1;
    let mut previous = last_logged;
    for day in descending {
        if (previous - day).num_days() != 1 {
            break;
        }
        length += 1;
        previous = day;
    }

    Some(Streak {
        length,
        last_logged,
    })
}

/// The most recent `WINDOW_SIZE` check-ins in chronological order.
///
/// `recent` must already be sorted descending by `created_at`.
pub fn mood_window(recent: &[CheckIn]) -> Vec<&CheckIn> {
    recent.iter().take(WINDOW_SIZE).rev().collect()
}

pub fn weekly_trend(recent: &[CheckIn]) -> WeeklyTrend {
    let window = mood_window(recent);
    let points = window
        .iter()
        .map(|check_in| TrendPoint {
            day: check_in.created_at.format("%a").to_string(),
            date: check_in.day(),
            mood: check_in.mood,
        })
        .collect();

    WeeklyTrend {
        points,
        average_mood: average_mood(window.iter().copied()),
    }
}

/// Mean mood rounded to one decimal, `None` when there is nothing to average.
pub fn average_mood<'a>(check_ins: impl IntoIterator<Item = &'a CheckIn>) -> Option<f64> {
    let (count, sum) = check_ins
        .into_iter()
        .fold((0u32, 0u32), |(count, sum), check_in| {
            (count + 1, sum + u32::from(check_in.mood.value()))
        });
    if count == 0 {
        return None;
    }
    Some(round_one(f64::from(sum) / f64::from(count)))
}

/// Percentage of the window spent in each mood present in it.
///
/// Each share is rounded on its own, so totals may drift from 100.
pub fn mood_distribution<'a>(window: impl IntoIterator<Item = &'a CheckIn>) -> MoodDistribution {
    let mut counts: BTreeMap<u8, (Mood, u32)> = BTreeMap::new();
    let mut total = 0u32;
    for check_in in window {
        counts
            .entry(check_in.mood.value())
            .or_insert((check_in.mood, 0))
            .1 += 1;
        total += 1;
    }

    counts
        .into_iter()
        .map(|(value, (mood, count))| {
            let percentage = (f64::from(count) / f64::from(total) * 100.0).round() as u8;
            (
                value,
                MoodShare {
                    label: mood.label(),
                    percentage,
                },
            )
        })
        .collect()
}

/// Per-weekday averages over the 7 days ending at `today`.
pub fn weekday_summary(check_ins: &[CheckIn], today: NaiveDate) -> WeeklySummary {
    let start = today - Duration::days(WINDOW_SIZE as i64 - 1);
    let mut buckets: BTreeMap<u32, (String, u32, u32)> = BTreeMap::new();

    for check_in in check_ins {
        let day = check_in.day();
        if day < start || day > today {
            continue;
        }
        let bucket = buckets
            .entry(day.weekday().num_days_from_sunday())
            .or_insert_with(|| (day.format("%a").to_string(), 0, 0));
        bucket.1 += 1;
        bucket.2 += u32::from(check_in.mood.value());
    }

    let days = buckets
        .into_iter()
        .map(|(weekday, (day, count, sum))| WeekdayMood {
            weekday,
            day,
            check_ins: count,
            average_mood: round_one(f64::from(sum) / f64::from(count)),
        })
        .collect();

    WeeklySummary { days }
}

/// Streak, trend and distribution for one unordered batch of check-ins.
pub fn build_dashboard(check_ins: &[CheckIn]) -> Dashboard {
    let mut recent = check_ins.to_vec();
    recent.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let trend = weekly_trend(&recent);
    let distribution = mood_distribution(mood_window(&recent));

    Dashboard {
        streak: compute_streak(&recent),
        trend: trend.points,
        average_mood: trend.average_mood,
        distribution,
        total_check_ins: recent.len(),
    }
}

fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

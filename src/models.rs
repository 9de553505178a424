use crate::errors::BackendError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const MOOD_NAMES: [&str; 5] = ["Very Sad", "Sad", "Neutral", "Happy", "Very Happy"];
const MOOD_EMOJIS: [&str; 5] = ["😞", "😕", "😐", "🙂", "😄"];

/// A mood score in `1..=5`, 1 being "Very Sad" and 5 "Very Happy".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Mood(u8);

impl Mood {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, BackendError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(BackendError::Validation(format!(
                "mood must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn name(self) -> &'static str {
        MOOD_NAMES[usize::from(self.0 - 1)]
    }

    pub fn emoji(self) -> &'static str {
        MOOD_EMOJIS[usize::from(self.0 - 1)]
    }

    pub fn label(self) -> String {
        format!("{} {}", self.name(), self.emoji())
    }
}

impl TryFrom<i64> for Mood {
    type Error = BackendError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Mood> for u8 {
    fn from(mood: Mood) -> Self {
        mood.0
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: u64,
    pub user_id: String,
    pub mood: Mood,
    pub notes: Option<String>,
    pub emotion: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CheckIn {
    /// Calendar day of the check-in, normalized to UTC.
    pub fn day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// Check-in as it sits on disk, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCheckIn {
    pub id: u64,
    #[serde(default)]
    pub user_id: String,
    pub mood: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
    pub created_at: String,
}

impl TryFrom<StoredCheckIn> for CheckIn {
    type Error = BackendError;

    fn try_from(raw: StoredCheckIn) -> Result<Self, Self::Error> {
        if raw.user_id.trim().is_empty() {
            return Err(BackendError::Validation(format!(
                "check-in {} has no owner",
                raw.id
            )));
        }
        let mood = Mood::new(raw.mood)?;
        let created_at = DateTime::parse_from_rfc3339(&raw.created_at)
            .map_err(|err| {
                BackendError::Validation(format!(
                    "check-in {} has invalid created_at {:?}: {err}",
                    raw.id, raw.created_at
                ))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: raw.id,
            user_id: raw.user_id,
            mood,
            notes: raw.notes,
            emotion: raw.emotion,
            created_at,
        })
    }
}

impl From<&CheckIn> for StoredCheckIn {
    fn from(check_in: &CheckIn) -> Self {
        Self {
            id: check_in.id,
            user_id: check_in.user_id.clone(),
            mood: i64::from(check_in.mood.value()),
            notes: check_in.notes.clone(),
            emotion: check_in.emotion.clone(),
            created_at: check_in.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoredData {
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub checkins: Vec<StoredCheckIn>,
}

/// Unvalidated input for creating a check-in.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCheckIn {
    pub user_id: String,
    pub mood: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub emotion: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Streak {
    pub length: u32,
    pub last_logged: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub day: String,
    pub date: NaiveDate,
    pub mood: Mood,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTrend {
    pub points: Vec<TrendPoint>,
    pub average_mood: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodShare {
    pub label: String,
    pub percentage: u8,
}

pub type MoodDistribution = BTreeMap<u8, MoodShare>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayMood {
    /// 0 = Sunday through 6 = Saturday.
    pub weekday: u32,
    pub day: String,
    pub check_ins: u32,
    pub average_mood: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WeeklySummary {
    pub days: Vec<WeekdayMood>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub streak: Option<Streak>,
    pub trend: Vec<TrendPoint>,
    pub average_mood: Option<f64>,
    pub distribution: MoodDistribution,
    pub total_check_ins: usize,
}

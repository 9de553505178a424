use crate::aggregate::weekday_summary;
use crate::errors::BackendError;
use crate::models::{CheckIn, Mood, NewCheckIn, StoredCheckIn, StoredData, WeeklySummary};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::{fs, sync::Mutex};
use tracing::{error, info, warn};

/// Persistence and lookup of check-ins on behalf of one or more users.
#[async_trait]
pub trait CheckInBackend: Send + Sync {
    async fn create_check_in(&self, new: NewCheckIn) -> Result<CheckIn, BackendError>;

    /// Most recent check-ins first.
    async fn list_recent(&self, user_id: &str, limit: usize) -> Result<Vec<CheckIn>, BackendError>;

    /// Latest check-in logged on the current UTC day, if any.
    async fn today_check_in(&self, user_id: &str) -> Result<Option<CheckIn>, BackendError>;

    async fn weekly_summary(&self, user_id: &str) -> Result<WeeklySummary, BackendError>;
}

#[derive(Debug, Default)]
struct Ledger {
    next_id: u64,
    check_ins: Vec<CheckIn>,
    /// Records that failed validation; written back untouched.
    skipped: Vec<StoredCheckIn>,
}

impl Ledger {
    fn from_stored(stored: StoredData) -> Result<Self, BackendError> {
        let mut check_ins = Vec::with_capacity(stored.checkins.len());
        let mut skipped = Vec::new();
        for raw in stored.checkins {
            match CheckIn::try_from(raw.clone()) {
                Ok(check_in) => check_ins.push(check_in),
                Err(err) => {
                    warn!("skipping stored check-in: {err}");
                    skipped.push(raw);
                }
            }
        }

        let max_id = check_ins
            .iter()
            .map(|c| c.id)
            .chain(skipped.iter().map(|raw| raw.id))
            .max()
            .unwrap_or(0);
        let after_max = max_id.checked_add(1).ok_or(BackendError::IdsExhausted)?;
        Ok(Self {
            next_id: stored.next_id.max(after_max),
            check_ins,
            skipped,
        })
    }

    fn to_stored(&self) -> StoredData {
        StoredData {
            next_id: self.next_id,
            checkins: self
                .check_ins
                .iter()
                .map(StoredCheckIn::from)
                .chain(self.skipped.iter().cloned())
                .collect(),
        }
    }

    fn for_user<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a CheckIn> + 'a {
        self.check_ins.iter().filter(move |c| c.user_id == user_id)
    }

    fn recent(&self, user_id: &str, limit: usize) -> Vec<CheckIn> {
        let mut rows: Vec<CheckIn> = self.for_user(user_id).cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        rows
    }

    fn latest_on(&self, user_id: &str, day: NaiveDate) -> Option<CheckIn> {
        self.for_user(user_id)
            .filter(|c| c.day() == day)
            .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned()
    }
}

/// Check-in store kept in memory and flushed to a pretty-printed JSON file
/// after every write.
pub struct JsonFileBackend {
    path: PathBuf,
    data: Mutex<Ledger>,
}

impl JsonFileBackend {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, BackendError> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let ledger = Ledger::from_stored(load_data(&path).await?)?;
        info!(
            "loaded {} check-ins from {} ({} skipped)",
            ledger.check_ins.len(),
            path.display(),
            ledger.skipped.len()
        );
        Ok(Self {
            path,
            data: Mutex::new(ledger),
        })
    }
}

#[async_trait]
impl CheckInBackend for JsonFileBackend {
    async fn create_check_in(&self, new: NewCheckIn) -> Result<CheckIn, BackendError> {
        let user_id = new.user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(BackendError::Validation("user_id is required".into()));
        }
        let mood = Mood::new(new.mood)?;

        let mut data = self.data.lock().await;
        let id = data.next_id.max(1);
        let next_id = id.checked_add(1).ok_or(BackendError::IdsExhausted)?;
        let check_in = CheckIn {
            id,
            user_id,
            mood,
            notes: non_blank(new.notes),
            emotion: non_blank(new.emotion),
            created_at: Utc::now(),
        };
        let previous_next_id = data.next_id;
        data.next_id = next_id;
        data.check_ins.push(check_in.clone());

        if let Err(err) = persist_data(&self.path, &data.to_stored()).await {
            data.check_ins.pop();
            data.next_id = previous_next_id;
            return Err(err);
        }

        info!(
            "check-in {} saved for {} (mood {})",
            check_in.id, check_in.user_id, check_in.mood
        );
        Ok(check_in)
    }

    async fn list_recent(&self, user_id: &str, limit: usize) -> Result<Vec<CheckIn>, BackendError> {
        let data = self.data.lock().await;
        Ok(data.recent(user_id, limit))
    }

    async fn today_check_in(&self, user_id: &str) -> Result<Option<CheckIn>, BackendError> {
        let data = self.data.lock().await;
        Ok(data.latest_on(user_id, Utc::now().date_naive()))
    }

    async fn weekly_summary(&self, user_id: &str) -> Result<WeeklySummary, BackendError> {
        let data = self.data.lock().await;
        let rows: Vec<CheckIn> = data.for_user(user_id).cloned().collect();
        Ok(weekday_summary(&rows, Utc::now().date_naive()))
    }
}

/// Reads the data file. A file that does not parse is moved aside to
/// `<path>.corrupt` so the next write cannot clobber it.
async fn load_data(path: &Path) -> Result<StoredData, BackendError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(StoredData::default()),
        Err(err) => {
            error!("failed to read data file {}: {err}", path.display());
            return Err(err.into());
        }
    };

    match serde_json::from_slice(&bytes) {
        Ok(data) => Ok(data),
        Err(err) => {
            let quarantine = corrupt_path(path);
            error!(
                "failed to parse data file {}: {err}; moving it to {}",
                path.display(),
                quarantine.display()
            );
            fs::rename(path, &quarantine).await?;
            Ok(StoredData::default())
        }
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

async fn persist_data(path: &Path, data: &StoredData) -> Result<(), BackendError> {
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await.map_err(|err| {
        error!("failed to write data file {}: {err}", path.display());
        BackendError::from(err)
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

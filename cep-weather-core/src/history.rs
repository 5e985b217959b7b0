//! Browser-held search history.
//!
//! The history lives in a single cookie as percent-encoded JSON. A
//! [`HistoryStore`] is an immutable snapshot: every operation consumes the
//! store and returns the next one, so a request handler can load, upsert and
//! re-emit the cookie without any shared state.

use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::SearchRecord;

pub const COOKIE_NAME: &str = "search_history";
pub const MAX_ENTRIES: usize = 10;
pub const COOKIE_MAX_AGE_DAYS: i64 = 7;

/// What to do with the persisted history when the page loads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPolicy {
    #[default]
    Restore,
    /// Discard the cookie and start empty on every load.
    ClearOnLoad,
}

/// How an upsert places a record whose CEP is already present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpsertStrategy {
    /// Drop the old entry and put the new one first.
    #[default]
    MoveToFront,
    /// Overwrite the old entry where it stands.
    ReplaceInPlace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKey {
    Cep,
    Location,
    LocalState,
    Temp,
    Timestamp,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Cep => "cep",
            SortKey::Location => "location",
            SortKey::LocalState => "localState",
            SortKey::Temp => "temp",
            SortKey::Timestamp => "timestamp",
        }
    }

    pub const fn all() -> &'static [SortKey] {
        &[SortKey::Cep, SortKey::Location, SortKey::LocalState, SortKey::Temp, SortKey::Timestamp]
    }

    fn compare(&self, a: &SearchRecord, b: &SearchRecord) -> Ordering {
        match self {
            SortKey::Cep => a.cep.cmp(&b.cep),
            SortKey::Location => a.location.cmp(&b.location),
            SortKey::LocalState => a.local_state.cmp(&b.local_state),
            SortKey::Temp => match (a.temp, b.temp) {
                (Some(x), Some(y)) => x.total_cmp(&y),
                (x, y) => x.is_some().cmp(&y.is_some()),
            },
            // Chronological; unreadable timestamps go first, ordered as text.
            SortKey::Timestamp => match (a.searched_at(), b.searched_at()) {
                (Some(x), Some(y)) => x.cmp(&y),
                (None, None) => a.timestamp.cmp(&b.timestamp),
                (x, y) => x.is_some().cmp(&y.is_some()),
            },
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SortKey {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        SortKey::all()
            .iter()
            .copied()
            .find(|key| key.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| anyhow::anyhow!("Unknown sort column '{value}'"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

impl TryFrom<&str> for SortDirection {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(anyhow::anyhow!("Unknown sort direction '{value}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    /// The state reached by clicking `key` while `current` is active.
    pub fn toggle(current: Option<SortState>, key: SortKey) -> SortState {
        match current {
            Some(state) if state.key == key => {
                SortState { key, direction: state.direction.flipped() }
            }
            _ => SortState { key, direction: SortDirection::Asc },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStore {
    /// Newest first.
    records: Vec<SearchRecord>,
    sort: Option<SortState>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a raw cookie value.
    ///
    /// A missing or undecodable cookie yields an empty store; so does
    /// [`LoadPolicy::ClearOnLoad`], whatever the cookie holds.
    pub fn load(cookie_value: Option<&str>, policy: LoadPolicy) -> Self {
        if policy == LoadPolicy::ClearOnLoad {
            return Self::new();
        }

        let Some(raw) = cookie_value.filter(|v| !v.is_empty()) else {
            return Self::new();
        };

        match decode_records(raw) {
            Ok(records) => Self::from_records(records),
            Err(error) => {
                tracing::debug!(%error, "ignoring unreadable history cookie");
                Self::new()
            }
        }
    }

    /// Build a store from records listed newest first, dropping later
    /// duplicates and anything past the cap.
    pub fn from_records(records: Vec<SearchRecord>) -> Self {
        let mut kept: Vec<SearchRecord> = Vec::with_capacity(records.len().min(MAX_ENTRIES));
        for record in records {
            if kept.len() == MAX_ENTRIES {
                break;
            }
            if !kept.iter().any(|r| r.cep == record.cep) {
                kept.push(record);
            }
        }
        Self { records: kept, sort: None }
    }

    /// Records in insertion order, newest first.
    pub fn records(&self) -> &[SearchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn sort_state(&self) -> Option<SortState> {
        self.sort
    }

    #[must_use]
    pub fn upsert(mut self, record: SearchRecord, strategy: UpsertStrategy) -> Self {
        let existing = self.records.iter().position(|r| r.cep == record.cep);

        match (strategy, existing) {
            (UpsertStrategy::ReplaceInPlace, Some(idx)) => {
                self.records[idx] = record;
            }
            (UpsertStrategy::MoveToFront, Some(idx)) => {
                self.records.remove(idx);
                self.records.insert(0, record);
            }
            (_, None) => {
                self.records.insert(0, record);
            }
        }

        self.evict()
    }

    /// Drop the oldest entries until the cap holds.
    #[must_use]
    pub fn evict(mut self) -> Self {
        if self.records.len() > MAX_ENTRIES {
            let dropped = self.records.len() - MAX_ENTRIES;
            self.records.truncate(MAX_ENTRIES);
            tracing::debug!(dropped, "evicted oldest history entries");
        }
        self
    }

    /// Click on a column: same column flips direction, a new one starts ascending.
    #[must_use]
    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort = Some(SortState::toggle(self.sort, key));
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Option<SortState>) -> Self {
        self.sort = sort;
        self
    }

    /// Records ordered by the active sort, or insertion order when none is set.
    pub fn sorted(&self) -> Vec<SearchRecord> {
        let mut out = self.records.clone();
        if let Some(SortState { key, direction }) = self.sort {
            // `sort_by` is stable, so ties keep insertion order.
            out.sort_by(|a, b| {
                let ord = key.compare(a, b);
                match direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                }
            });
        }
        out
    }

    /// Percent-encoded JSON of the records, ready to be a cookie value.
    pub fn to_cookie_value(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(&self.records)?;
        Ok(urlencoding::encode(&json).into_owned())
    }

    /// A full `Set-Cookie` header value persisting this store from `now`.
    pub fn set_cookie_header(&self, now: DateTime<Utc>) -> Result<String, serde_json::Error> {
        let value = self.to_cookie_value()?;
        let max_age = Duration::days(COOKIE_MAX_AGE_DAYS);
        let expires = (now + max_age).format("%a, %d %b %Y %H:%M:%S GMT");

        Ok(format!(
            "{COOKIE_NAME}={value}; Path=/; Max-Age={}; Expires={expires}; SameSite=Lax",
            max_age.num_seconds()
        ))
    }
}

fn decode_records(raw: &str) -> anyhow::Result<Vec<SearchRecord>> {
    let json = urlencoding::decode(raw)?;
    Ok(serde_json::from_str(&json)?)
}

/// Pull the history cookie's raw value out of a `Cookie` request header.
pub fn cookie_value(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .map(|(_, value)| value)
}

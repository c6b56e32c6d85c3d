use crate::error::{BanditError, BanditResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Identifier of one arm of the bandit (a creative, a page layout, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariantId(String);

impl VariantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VariantId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for VariantId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for VariantId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// The variants compared in one experiment run, in declaration order.
///
/// Declaration order is the tie-break priority during allocation and the
/// order of every per-variant output. Construction is the only place
/// identifiers are checked: non-empty set, non-empty and distinct names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct VariantSet {
    variants: Vec<VariantId>,
}

impl VariantSet {
    pub fn new<I, S>(ids: I) -> BanditResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut variants = Vec::new();
        for raw in ids {
            let id = raw.as_ref().trim();
            if id.is_empty() {
                return Err(BanditError::InvalidConfiguration(
                    "variant identifier must not be empty".to_string(),
                ));
            }
            if !seen.insert(id.to_string()) {
                return Err(BanditError::InvalidConfiguration(format!(
                    "duplicate variant identifier '{id}'"
                )));
            }
            variants.push(VariantId(id.to_string()));
        }
        if variants.is_empty() {
            return Err(BanditError::InvalidConfiguration(
                "at least one variant is required".to_string(),
            ));
        }
        Ok(Self { variants })
    }

    /// Parse a comma-separated list such as `"Video, Text, Image"`.
    pub fn parse_list(list: &str) -> BanditResult<Self> {
        if list.trim().is_empty() {
            return Err(BanditError::InvalidConfiguration(
                "at least one variant is required".to_string(),
            ));
        }
        Self::new(list.split(','))
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.variants.iter().any(|v| v == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariantId> {
        self.variants.iter()
    }

    pub fn as_slice(&self) -> &[VariantId] {
        &self.variants
    }
}

impl TryFrom<Vec<String>> for VariantSet {
    type Error = BanditError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VariantSet> for Vec<String> {
    fn from(value: VariantSet) -> Self {
        value.variants.into_iter().map(|v| v.0).collect()
    }
}

impl<'a> IntoIterator for &'a VariantSet {
    type Item = &'a VariantId;
    type IntoIter = std::slice::Iter<'a, VariantId>;

    fn into_iter(self) -> Self::IntoIter {
        self.variants.iter()
    }
}

/// Outcome counts for one variant on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub day: u64,
    pub segment: String,
    pub variant: VariantId,
    pub success: u64,
    pub failure: u64,
}

impl TrialRecord {
    /// Traffic the record accounts for.
    pub fn traffic(&self) -> u64 {
        self.success + self.failure
    }
}

/// Append-only record history of one experiment session, ordered by day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLog")]
pub struct ExperimentLog {
    records: Vec<TrialRecord>,
}

#[derive(Deserialize)]
struct RawLog {
    records: Vec<TrialRecord>,
}

impl TryFrom<RawLog> for ExperimentLog {
    type Error = BanditError;

    fn try_from(raw: RawLog) -> Result<Self, Self::Error> {
        let mut log = Self::new();
        log.append_round(raw.records)?;
        Ok(log)
    }
}

impl ExperimentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one record. Records must arrive in non-decreasing day order.
    pub fn append(&mut self, record: TrialRecord) -> BanditResult<()> {
        if let Some(last_day) = self.max_day() {
            if record.day < last_day {
                return Err(BanditError::OutOfOrderRecord {
                    day: record.day,
                    last_day,
                });
            }
        }
        self.records.push(record);
        Ok(())
    }

    /// Append a whole round. Nothing is appended if any record is out of order.
    pub fn append_round(&mut self, records: Vec<TrialRecord>) -> BanditResult<()> {
        let mut last_day = self.max_day();
        for record in &records {
            if let Some(last) = last_day {
                if record.day < last {
                    return Err(BanditError::OutOfOrderRecord {
                        day: record.day,
                        last_day: last,
                    });
                }
            }
            last_day = Some(record.day);
        }
        self.records.extend(records);
        Ok(())
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Day of the most recent record; `None` for an empty log.
    pub fn max_day(&self) -> Option<u64> {
        self.records.last().map(|r| r.day)
    }
}

/// Number of completed rounds in the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayCounter(u64);

impl DayCounter {
    pub fn starting_at(day: u64) -> Self {
        Self(day)
    }

    pub fn current(&self) -> u64 {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 += 1;
    }
}

/// Trailing day window applied to the log before it is read for display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetentionWindow {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "trailing_30_days")]
    Trailing30Days,
    #[serde(rename = "trailing_60_days")]
    Trailing60Days,
}

impl RetentionWindow {
    /// Window length in days, `None` when every record is kept.
    pub fn length_days(&self) -> Option<u64> {
        match self {
            Self::None => None,
            Self::Trailing30Days => Some(30),
            Self::Trailing60Days => Some(60),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Trailing30Days => "trailing_30_days",
            Self::Trailing60Days => "trailing_60_days",
        }
    }
}

impl fmt::Display for RetentionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetentionWindow {
    type Err = BanditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "trailing_30_days" => Ok(Self::Trailing30Days),
            "trailing_60_days" => Ok(Self::Trailing60Days),
            other => Err(BanditError::InvalidConfiguration(format!(
                "unknown retention window '{other}' (expected none, trailing_30_days or trailing_60_days)"
            ))),
        }
    }
}

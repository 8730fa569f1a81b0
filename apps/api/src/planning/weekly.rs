//! Weekly Pattern Builder: turns `{content_type: weekly_count}` weights into a
//! weekday → content type assignment.
//!
//! Pure: no I/O, and the pool of free weekdays is a local value rebuilt on
//! every call.

use std::cmp::Reverse;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Used when a blogger has no frequency configured at all.
pub const FALLBACK_CONTENT_TYPE: &str = "post";
pub const FALLBACK_PER_WEEK: i64 = 3;

const DAYS_PER_WEEK: usize = 7;

/// One `content_type → per_week` weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    pub content_type: String,
    pub per_week: i64,
}

/// Content-type weights in the order the caller wrote them.
///
/// Serialized as a JSON object. Input order matters (it breaks ties between
/// equal counts), so deserialization walks the object entries directly rather
/// than going through an ordered map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeeklyFrequency(Vec<FrequencyEntry>);

impl WeeklyFrequency {
    pub fn new(entries: Vec<FrequencyEntry>) -> Self {
        let mut frequency = WeeklyFrequency::default();
        for entry in entries {
            frequency.set(entry.content_type, entry.per_week);
        }
        frequency
    }

    /// Sets the count for a type, keeping its original position if present.
    pub fn set(&mut self, content_type: impl Into<String>, per_week: i64) {
        let content_type = content_type.into();
        match self.0.iter_mut().find(|e| e.content_type == content_type) {
            Some(existing) => existing.per_week = per_week,
            None => self.0.push(FrequencyEntry {
                content_type,
                per_week,
            }),
        }
    }

    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i64)> for WeeklyFrequency {
    fn from_iter<I: IntoIterator<Item = (S, i64)>>(iter: I) -> Self {
        let mut frequency = WeeklyFrequency::default();
        for (content_type, per_week) in iter {
            frequency.set(content_type, per_week);
        }
        frequency
    }
}

impl Serialize for WeeklyFrequency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(&entry.content_type, &entry.per_week)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WeeklyFrequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FrequencyVisitor;

        impl<'de> Visitor<'de> for FrequencyVisitor {
            type Value = WeeklyFrequency;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of content type to weekly count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut frequency = WeeklyFrequency::default();
                while let Some((content_type, per_week)) = access.next_entry::<String, i64>()? {
                    frequency.set(content_type, per_week);
                }
                Ok(frequency)
            }
        }

        deserializer.deserialize_map(FrequencyVisitor)
    }
}

/// Weekday (0 = Monday … 6 = Sunday) → content type. Unassigned days are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WeeklyPattern {
    days: [Option<String>; DAYS_PER_WEEK],
}

impl WeeklyPattern {
    pub fn for_weekday(&self, weekday: usize) -> Option<&str> {
        self.days.get(weekday).and_then(|d| d.as_deref())
    }

    pub fn for_date(&self, date: NaiveDate) -> Option<&str> {
        self.for_weekday(date.weekday().num_days_from_monday() as usize)
    }

    /// Weekdays assigned to `content_type`, ascending.
    pub fn weekdays_for(&self, content_type: &str) -> Vec<usize> {
        self.days
            .iter()
            .enumerate()
            .filter(|(_, d)| d.as_deref() == Some(content_type))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Builds the weekday assignment for one week.
///
/// Types are processed by descending count (ties keep input order). Each type
/// claims an evenly spaced subset of the weekdays still free, or all of them
/// when it asks for at least as many as remain. Zero and negative counts are
/// skipped; requests beyond seven days are silently dropped.
pub fn build_weekly_pattern(frequency: &WeeklyFrequency) -> WeeklyPattern {
    let fallback;
    let entries = if frequency.is_empty() {
        fallback = [FrequencyEntry {
            content_type: FALLBACK_CONTENT_TYPE.to_string(),
            per_week: FALLBACK_PER_WEEK,
        }];
        &fallback[..]
    } else {
        frequency.entries()
    };

    let mut ranked: Vec<&FrequencyEntry> = entries.iter().filter(|e| e.per_week > 0).collect();
    // sort_by_key is stable, so equal counts stay in input order
    ranked.sort_by_key(|e| Reverse(e.per_week));

    let mut available: Vec<usize> = (0..DAYS_PER_WEEK).collect();
    let mut pattern = WeeklyPattern::default();

    for entry in ranked {
        if available.is_empty() {
            break;
        }
        let count = usize::try_from(entry.per_week).unwrap_or(usize::MAX);
        let claimed = spread(&available, count);
        for &day in &claimed {
            pattern.days[day].get_or_insert_with(|| entry.content_type.clone());
        }
        available.retain(|day| !claimed.contains(day));
    }

    pattern
}

/// Picks `count` evenly spaced entries of `available` by index
/// `floor(i * len / count)`; takes everything when `count >= len`.
fn spread(available: &[usize], count: usize) -> Vec<usize> {
    let len = available.len();
    if count >= len {
        return available.to_vec();
    }
    (0..count).map(|i| available[i * len / count]).collect()
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::fmt;

/// A bookable time of day on a given date, with its remaining capacity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub time: String,
    pub available_slots: i32,
    pub max_slots: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateAvailability {
    pub date: String,
    pub time_slots: Vec<TimeSlot>,
}

/// Core catalog document: an activity with dated time slots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub description: String,
    /// Price per person, in whole currency units
    pub price: i64,
    pub image: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub available_dates: Vec<DateAvailability>,
    #[serde(default)]
    pub about: String,
    #[serde(default = "default_minimum_age")]
    pub minimum_age: i32,
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_minimum_age() -> i32 { 10 }
fn default_duration() -> String { "2-3 hours".to_string() }
fn default_active() -> bool { true }

/// Listing projection returned by catalog search.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceSummary {
    pub id: Uuid,
    pub title: String,
    pub location: String,
    pub description: String,
    pub price: i64,
    pub image: String,
    pub available_dates: Vec<DateAvailability>,
}

/// Address of a single capacity counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub experience_id: Uuid,
    pub date: String,
    pub time: String,
}

impl SlotKey {
    pub fn new(experience_id: Uuid, date: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            experience_id,
            date: date.into(),
            time: time.into(),
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} {}", self.experience_id, self.date, self.time)
    }
}

/// Catalog search filters (both case-insensitive substring matches).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExperienceQuery {
    pub search: Option<String>,
    pub location: Option<String>,
}

impl ExperienceQuery {
    pub fn matches(&self, experience: &Experience) -> bool {
        if !experience.is_active {
            return false;
        }

        if let Some(term) = non_blank(&self.search) {
            let hit = contains_ignore_case(&experience.title, &term)
                || contains_ignore_case(&experience.description, &term)
                || contains_ignore_case(&experience.location, &term);
            if !hit {
                return false;
            }
        }

        if let Some(location) = non_blank(&self.location) {
            if !contains_ignore_case(&experience.location, &location) {
                return false;
            }
        }

        true
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

impl Experience {
    /// Time slots offered on `date`; empty when the date is not scheduled.
    pub fn slots_for(&self, date: &str) -> &[TimeSlot] {
        self.available_dates
            .iter()
            .find(|d| d.date == date)
            .map(|d| d.time_slots.as_slice())
            .unwrap_or(&[])
    }

    pub fn find_slot(&self, date: &str, time: &str) -> Option<&TimeSlot> {
        self.slots_for(date).iter().find(|s| s.time == time)
    }

    /// Every (key, slot) pair, in document order.
    pub fn slot_entries(&self) -> impl Iterator<Item = (SlotKey, &TimeSlot)> + '_ {
        self.available_dates.iter().flat_map(move |d| {
            d.time_slots
                .iter()
                .map(move |s| (SlotKey::new(self.id, d.date.clone(), s.time.clone()), s))
        })
    }

    pub fn summary(&self) -> ExperienceSummary {
        ExperienceSummary {
            id: self.id,
            title: self.title.clone(),
            location: self.location.clone(),
            description: self.description.clone(),
            price: self.price,
            image: self.image.clone(),
            available_dates: self.available_dates.clone(),
        }
    }

    /// Check the document-level invariants before the experience enters a store.
    pub fn validate(&self) -> Result<(), ExperienceError> {
        if self.title.trim().is_empty() {
            return Err(ExperienceError::Invalid("title is required".to_string()));
        }
        if self.price < 0 {
            return Err(ExperienceError::Invalid(format!("negative price {}", self.price)));
        }

        let mut seen = HashSet::new();
        for (key, slot) in self.slot_entries() {
            if slot.max_slots < 1 {
                return Err(ExperienceError::InvalidSlot {
                    slot: key.to_string(),
                    reason: "maxSlots must be at least 1".to_string(),
                });
            }
            if slot.available_slots < 0 || slot.available_slots > slot.max_slots {
                return Err(ExperienceError::InvalidSlot {
                    slot: key.to_string(),
                    reason: format!(
                        "availableSlots {} outside 0..={}",
                        slot.available_slots, slot.max_slots
                    ),
                });
            }
            if !seen.insert(key.clone()) {
                return Err(ExperienceError::InvalidSlot {
                    slot: key.to_string(),
                    reason: "duplicate date/time".to_string(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExperienceError {
    #[error("Invalid experience: {0}")]
    Invalid(String),

    #[error("Invalid slot {slot}: {reason}")]
    InvalidSlot {
        slot: String,
        reason: String,
    },
}

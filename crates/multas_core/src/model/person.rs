//! Person domain model.
//!
//! # Responsibility
//! - Define the tracked individual and its two infraction counters.
//! - Map stored documents to `Person` values and back to field names.
//!
//! # Invariants
//! - `id` is assigned by the record store and never changes.
//! - Counters are unsigned; decrement is clamped at zero.
//! - `photo_url` is never empty after mapping (placeholder substituted).
//!
//! # See also
//! - docs/architecture/data-model.md

use crate::store::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque record identifier assigned by the record store.
pub type PersonId = String;

/// Document field holding the display name.
pub const FIELD_NAME: &str = "Nombre";
/// Document field holding the minor infraction count.
pub const FIELD_MINOR: &str = "GroseriasLeves";
/// Document field holding the major infraction count.
pub const FIELD_MAJOR: &str = "GroseriasFuertes";
/// Document field holding the photo reference.
pub const FIELD_PHOTO: &str = "fotoUrl";

/// Infraction category selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Counter {
    /// Minor infraction, cheaper per unit.
    Minor,
    /// Major infraction.
    Major,
}

impl Counter {
    /// Returns the stored document field backing this counter.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Minor => FIELD_MINOR,
            Self::Major => FIELD_MAJOR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Major => "major",
        }
    }

    /// Parses `minor|major` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "minor" => Some(Self::Minor),
            "major" => Some(Self::Major),
            _ => None,
        }
    }
}

/// Adjustment direction for one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increase => "increase",
            Self::Decrease => "decrease",
        }
    }

    /// Parses `increase|decrease` (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "increase" => Some(Self::Increase),
            "decrease" => Some(Self::Decrease),
            _ => None,
        }
    }

    /// Applies this direction to `current`.
    ///
    /// Decrease never goes below zero and increase saturates at `u32::MAX`.
    pub fn apply(self, current: u32) -> u32 {
        match self {
            Self::Increase => current.saturating_add(1),
            Self::Decrease => current.saturating_sub(1),
        }
    }
}

/// Document shape did not match the person schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonMappingError {
    pub id: PersonId,
    pub field: &'static str,
    pub message: String,
}

impl Display for PersonMappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "document `{}` has invalid field `{}`: {}",
            self.id, self.field, self.message
        )
    }
}

impl Error for PersonMappingError {}

/// One tracked individual with two infraction counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
    pub minor_count: u32,
    pub major_count: u32,
    /// Display reference; the configured placeholder when the source had none.
    pub photo_url: String,
}

impl Person {
    /// Returns the current value of one counter.
    pub fn count(&self, counter: Counter) -> u32 {
        match counter {
            Counter::Minor => self.minor_count,
            Counter::Major => self.major_count,
        }
    }

    /// Replaces one counter value.
    pub fn set_count(&mut self, counter: Counter, value: u32) {
        match counter {
            Counter::Minor => self.minor_count = value,
            Counter::Major => self.major_count = value,
        }
    }

    /// Sets both counters to zero.
    pub fn reset_counts(&mut self) {
        self.minor_count = 0;
        self.major_count = 0;
    }

    /// First character of the name, used by avatar fallbacks.
    pub fn initial(&self) -> Option<char> {
        self.name.trim().chars().next()
    }

    /// Maps one stored document to a person.
    ///
    /// Missing counters read as zero, a missing name reads as empty and a
    /// missing or blank photo reads as `placeholder_photo`.
    ///
    /// # Errors
    /// - Returns an error when a counter is present but not a non-negative
    ///   integer that fits `u32`.
    /// - Returns an error when the name or photo is present but not a string.
    pub fn from_document(
        document: &Document,
        placeholder_photo: &str,
    ) -> Result<Self, PersonMappingError> {
        let name = optional_string(document, FIELD_NAME)?.unwrap_or_default();
        let photo_url = optional_string(document, FIELD_PHOTO)?
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| placeholder_photo.to_string());

        Ok(Self {
            id: document.id.clone(),
            name,
            minor_count: counter_value(document, FIELD_MINOR)?,
            major_count: counter_value(document, FIELD_MAJOR)?,
            photo_url,
        })
    }
}

fn counter_value(document: &Document, field: &'static str) -> Result<u32, PersonMappingError> {
    match document.fields.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(value) => value
            .as_u64()
            .and_then(|raw| u32::try_from(raw).ok())
            .ok_or_else(|| PersonMappingError {
                id: document.id.clone(),
                field,
                message: format!("expected non-negative integer, got {value}"),
            }),
    }
}

fn optional_string(
    document: &Document,
    field: &'static str,
) -> Result<Option<String>, PersonMappingError> {
    match document.fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(PersonMappingError {
            id: document.id.clone(),
            field,
            message: format!("expected string, got {other}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{Counter, Direction, Person, FIELD_MAJOR, FIELD_MINOR, FIELD_NAME, FIELD_PHOTO};
    use crate::store::Document;
    use serde_json::json;

    const PLACEHOLDER: &str = "/placeholder.svg";

    #[test]
    fn decrease_is_clamped_at_zero() {
        assert_eq!(Direction::Decrease.apply(0), 0);
        assert_eq!(Direction::Decrease.apply(3), 2);
        assert_eq!(Direction::Increase.apply(u32::MAX), u32::MAX);
    }

    #[test]
    fn from_document_substitutes_placeholder_and_defaults() {
        let document = Document::from_json("a", json!({ FIELD_NAME: "Ana" })).unwrap();
        let person = Person::from_document(&document, PLACEHOLDER).unwrap();
        assert_eq!(person.name, "Ana");
        assert_eq!(person.minor_count, 0);
        assert_eq!(person.major_count, 0);
        assert_eq!(person.photo_url, PLACEHOLDER);

        let blank = Document::from_json("b", json!({ FIELD_PHOTO: "  " })).unwrap();
        let person = Person::from_document(&blank, PLACEHOLDER).unwrap();
        assert_eq!(person.photo_url, PLACEHOLDER);
    }

    #[test]
    fn from_document_reads_counters_and_photo() {
        let document = Document::from_json(
            "a",
            json!({
                FIELD_NAME: "Ana",
                FIELD_MINOR: 2,
                FIELD_MAJOR: 1,
                FIELD_PHOTO: "https://img.example/ana.png",
            }),
        )
        .unwrap();
        let person = Person::from_document(&document, PLACEHOLDER).unwrap();
        assert_eq!(person.count(Counter::Minor), 2);
        assert_eq!(person.count(Counter::Major), 1);
        assert_eq!(person.photo_url, "https://img.example/ana.png");
        assert_eq!(person.initial(), Some('A'));
    }

    #[test]
    fn from_document_rejects_negative_counter() {
        let document = Document::from_json("a", json!({ FIELD_MINOR: -1 })).unwrap();
        let err = Person::from_document(&document, PLACEHOLDER).unwrap_err();
        assert_eq!(err.field, FIELD_MINOR);
        assert_eq!(err.id, "a");
    }

    #[test]
    fn selectors_parse_case_insensitively() {
        assert_eq!(Counter::parse(" MAJOR "), Some(Counter::Major));
        assert_eq!(Direction::parse("Decrease"), Some(Direction::Decrease));
        assert_eq!(Counter::parse("medium"), None);
        assert_eq!(Counter::Minor.field_name(), FIELD_MINOR);
    }
}

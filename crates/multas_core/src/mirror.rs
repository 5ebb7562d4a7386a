//! Local mirror of the person collection.
//!
//! # Responsibility
//! - Hold the ordered set of persons last confirmed by the record store.
//! - Apply mutations only after the matching remote write succeeded.
//!
//! # Invariants
//! - Order is the store's fetch order and never changes between loads.
//! - Field updates touch exactly one person; all others are left untouched.
//! - The mirror is never re-fetched implicitly. External writers are only
//!   observed through an explicit reload.

use crate::model::person::{Counter, Person, PersonMappingError};
use crate::store::Document;

/// In-memory, ordered copy of the person collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalMirror {
    people: Vec<Person>,
}

impl LocalMirror {
    pub fn new(people: Vec<Person>) -> Self {
        Self { people }
    }

    /// Maps fetched documents to persons, keeping store order.
    ///
    /// # Errors
    /// - Returns the first document that does not match the person schema.
    pub fn from_documents(
        documents: &[Document],
        placeholder_photo: &str,
    ) -> Result<Self, PersonMappingError> {
        let people = documents
            .iter()
            .map(|document| Person::from_document(document, placeholder_photo))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { people })
    }

    pub fn all(&self) -> &[Person] {
        &self.people
    }

    pub fn get(&self, id: &str) -> Option<&Person> {
        self.people.iter().find(|person| person.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.people.iter().map(|person| person.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// Replaces one counter on the person with `id`.
    ///
    /// Returns `false` and changes nothing when `id` is unknown.
    pub fn apply_field_update(&mut self, id: &str, counter: Counter, value: u32) -> bool {
        match self.people.iter_mut().find(|person| person.id == id) {
            Some(person) => {
                person.set_count(counter, value);
                true
            }
            None => false,
        }
    }

    /// Sets both counters to zero on every person.
    pub fn apply_bulk_reset(&mut self) {
        self.people.iter_mut().for_each(Person::reset_counts);
    }
}

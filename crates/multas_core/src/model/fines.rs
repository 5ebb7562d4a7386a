//! Fine and total calculators.
//!
//! # Invariants
//! - Every value is recomputed from current counters; nothing is cached.
//! - Arithmetic is done in `u64`, so `u32` counters cannot overflow a total
//!   for any realistic board size.

use crate::model::person::{Counter, Person};
use serde::{Deserialize, Serialize};

/// Default price of one minor infraction.
pub const DEFAULT_MINOR_RATE: u64 = 200;
/// Default price of one major infraction.
pub const DEFAULT_MAJOR_RATE: u64 = 500;

/// Per-unit prices for both infraction categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FineRates {
    pub minor: u64,
    pub major: u64,
}

impl Default for FineRates {
    fn default() -> Self {
        Self {
            minor: DEFAULT_MINOR_RATE,
            major: DEFAULT_MAJOR_RATE,
        }
    }
}

impl FineRates {
    pub fn rate(&self, counter: Counter) -> u64 {
        match counter {
            Counter::Minor => self.minor,
            Counter::Major => self.major,
        }
    }

    /// Fine accumulated by one counter of one person.
    pub fn fine(&self, person: &Person, counter: Counter) -> u64 {
        u64::from(person.count(counter)).saturating_mul(self.rate(counter))
    }

    pub fn minor_fine(&self, person: &Person) -> u64 {
        self.fine(person, Counter::Minor)
    }

    pub fn major_fine(&self, person: &Person) -> u64 {
        self.fine(person, Counter::Major)
    }

    /// `minor_count * minor_rate + major_count * major_rate`.
    pub fn person_total(&self, person: &Person) -> u64 {
        self.minor_fine(person).saturating_add(self.major_fine(person))
    }

    /// Sum of `person_total` over `people`.
    pub fn grand_total<'a, I>(&self, people: I) -> u64
    where
        I: IntoIterator<Item = &'a Person>,
    {
        people.into_iter().fold(0u64, |total, person| {
            total.saturating_add(self.person_total(person))
        })
    }
}

/// Renders an amount as `$` plus the integer grouped by thousands.
///
/// `1200` renders as `$1,200`.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    grouped.push('$');
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

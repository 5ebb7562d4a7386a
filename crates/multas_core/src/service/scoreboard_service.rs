//! Scoreboard use-case service.
//!
//! # Responsibility
//! - Own the record store handle, the local mirror and the reset flow.
//! - Run every write against the store first and mirror it only on success.
//! - Expose fine totals and a read-only board snapshot for UI callers.
//!
//! # Invariants
//! - The mirror is never mutated before the store acknowledged the write.
//! - A failed write leaves the mirror exactly as it was.
//! - Counter values sent to the store are never negative.
//! - The mirror is only re-read through `refresh`; concurrent external
//!   writers are not observed otherwise.
//!
//! # See also
//! - docs/architecture/reset-flow.md

use crate::config::{ConfigError, ScoreboardConfig};
use crate::mirror::LocalMirror;
use crate::model::fines::FineRates;
use crate::model::person::{Counter, Direction, Person, PersonId, PersonMappingError};
use crate::reset::{InvalidTransition, ResetAction, ResetFlow, ResetState};
use crate::store::{Fields, RecordStore, StoreError};
use log::{error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub type ScoreboardResult<T> = Result<T, ScoreboardError>;

/// Service error surfaced to UI callers. None of these are fatal.
#[derive(Debug)]
pub enum ScoreboardError {
    Config(ConfigError),
    /// Loading the collection failed; the previous mirror is kept.
    Fetch(StoreError),
    /// A fetched document does not match the person schema.
    InvalidDocument(PersonMappingError),
    PersonNotFound(PersonId),
    /// Single-field write rejected; the mirror is unchanged.
    Update { id: PersonId, source: StoreError },
    /// Batched reset rejected; the mirror is unchanged.
    Batch(StoreError),
    InvalidTransition(InvalidTransition),
}

impl Display for ScoreboardError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Fetch(err) => write!(f, "failed to load people: {err}"),
            Self::InvalidDocument(err) => write!(f, "{err}"),
            Self::PersonNotFound(id) => write!(f, "person not found: {id}"),
            Self::Update { id, source } => write!(f, "failed to update person {id}: {source}"),
            Self::Batch(err) => write!(f, "failed to reset all fines: {err}"),
            Self::InvalidTransition(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScoreboardError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Fetch(err) | Self::Batch(err) => Some(err),
            Self::Update { source, .. } => Some(source),
            Self::InvalidDocument(err) => Some(err),
            Self::InvalidTransition(err) => Some(err),
            Self::PersonNotFound(_) => None,
        }
    }
}

impl From<ConfigError> for ScoreboardError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<InvalidTransition> for ScoreboardError {
    fn from(value: InvalidTransition) -> Self {
        Self::InvalidTransition(value)
    }
}

/// One board row with its derived fines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardRow {
    pub person: Person,
    pub minor_fine: u64,
    pub major_fine: u64,
    pub total: u64,
}

/// Read-only view of the whole board at one observation point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub rows: Vec<BoardRow>,
    pub grand_total: u64,
    pub reset_state: ResetState,
}

/// Use-case service for one scoreboard collection.
pub struct ScoreboardService<S: RecordStore> {
    store: S,
    config: ScoreboardConfig,
    rates: FineRates,
    mirror: LocalMirror,
    reset: ResetFlow,
    loaded: bool,
}

impl<S: RecordStore> ScoreboardService<S> {
    /// Creates a service with an empty, not yet loaded mirror.
    ///
    /// Callers that must stay interactive when the first load fails use this
    /// followed by [`Self::refresh`].
    pub fn new(store: S, config: ScoreboardConfig) -> ScoreboardResult<Self> {
        config.validate()?;
        let reset = ResetFlow::new(config.dismiss_after(), config.reset_message.clone());
        Ok(Self {
            store,
            rates: config.rates(),
            config,
            mirror: LocalMirror::default(),
            reset,
            loaded: false,
        })
    }

    /// Creates a service and loads the collection once.
    pub fn open(store: S, config: ScoreboardConfig) -> ScoreboardResult<Self> {
        let mut service = Self::new(store, config)?;
        service.refresh()?;
        Ok(service)
    }

    /// Re-reads the whole collection and replaces the mirror.
    ///
    /// On failure the current mirror is kept unchanged.
    pub fn refresh(&mut self) -> ScoreboardResult<usize> {
        let started_at = Instant::now();
        let collection = self.config.collection.as_str();

        let documents = self.store.fetch_all(collection).map_err(|err| {
            error!(
                "event=mirror_load module=service status=error collection={} duration_ms={} error={}",
                collection,
                started_at.elapsed().as_millis(),
                err
            );
            ScoreboardError::Fetch(err)
        })?;
        let mirror = LocalMirror::from_documents(&documents, &self.config.placeholder_photo)
            .map_err(|err| {
                error!(
                    "event=mirror_load module=service status=error collection={} error_code=invalid_document error={}",
                    collection, err
                );
                ScoreboardError::InvalidDocument(err)
            })?;

        self.mirror = mirror;
        self.loaded = true;
        info!(
            "event=mirror_load module=service status=ok collection={} people={} duration_ms={}",
            collection,
            self.mirror.len(),
            started_at.elapsed().as_millis()
        );
        Ok(self.mirror.len())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn config(&self) -> &ScoreboardConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn rates(&self) -> FineRates {
        self.rates
    }

    pub fn people(&self) -> &[Person] {
        self.mirror.all()
    }

    pub fn person(&self, id: &str) -> Option<&Person> {
        self.mirror.get(id)
    }

    pub fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    /// Total fine of one person, `None` when `id` is unknown.
    pub fn person_total(&self, id: &str) -> Option<u64> {
        self.mirror
            .get(id)
            .map(|person| self.rates.person_total(person))
    }

    /// Sum of every mirrored person's total.
    pub fn grand_total(&self) -> u64 {
        self.rates.grand_total(self.mirror.all())
    }

    pub fn board(&self) -> BoardSnapshot {
        let rows = self
            .mirror
            .all()
            .iter()
            .map(|person| BoardRow {
                minor_fine: self.rates.minor_fine(person),
                major_fine: self.rates.major_fine(person),
                total: self.rates.person_total(person),
                person: person.clone(),
            })
            .collect();

        BoardSnapshot {
            rows,
            grand_total: self.grand_total(),
            reset_state: self.reset.state().clone(),
        }
    }

    /// Increments or decrements one counter of one person.
    ///
    /// Returns the new counter value.
    ///
    /// # Errors
    /// - `PersonNotFound` when `id` is not mirrored; nothing is written.
    /// - `Update` when the store rejects the write; the mirror is unchanged.
    pub fn adjust_counter(
        &mut self,
        id: &str,
        counter: Counter,
        direction: Direction,
    ) -> ScoreboardResult<u32> {
        let current = self
            .mirror
            .get(id)
            .map(|person| person.count(counter))
            .ok_or_else(|| ScoreboardError::PersonNotFound(id.to_string()))?;
        let next = direction.apply(current);

        if let Err(err) = self.store.update_field(
            &self.config.collection,
            id,
            counter.field_name(),
            Value::from(next),
        ) {
            warn!(
                "event=counter_adjust module=service status=error person_id={} counter={} direction={} error={}",
                id,
                counter.as_str(),
                direction.as_str(),
                err
            );
            return Err(ScoreboardError::Update {
                id: id.to_string(),
                source: err,
            });
        }

        self.mirror.apply_field_update(id, counter, next);
        info!(
            "event=counter_adjust module=service status=ok person_id={} counter={} direction={} value={}",
            id,
            counter.as_str(),
            direction.as_str(),
            next
        );
        Ok(next)
    }

    pub fn reset_flow(&self) -> &ResetFlow {
        &self.reset
    }

    pub fn reset_state(&self) -> &ResetState {
        self.reset.state()
    }

    /// Opens the reset confirmation. No write happens yet.
    pub fn request_reset(&mut self) -> ScoreboardResult<()> {
        self.reset.apply(ResetAction::Request)?;
        Ok(())
    }

    /// Closes the reset confirmation without writing.
    pub fn cancel_reset(&mut self) -> ScoreboardResult<()> {
        self.reset.apply(ResetAction::Cancel)?;
        Ok(())
    }

    /// Resets both counters of every mirrored person in one atomic batch.
    ///
    /// On success the mirror is zeroed and the flow shows its transient
    /// message until `now + dismiss_after`. On failure the mirror is kept,
    /// the flow returns to the confirmation with an error banner and the
    /// store error is returned as `Batch`.
    pub fn confirm_reset(&mut self, now: Instant) -> ScoreboardResult<()> {
        self.reset.apply(ResetAction::Confirm)?;

        let collection = self.config.collection.as_str();
        let mut batch = self.store.begin_batch();
        for id in self.mirror.ids() {
            batch.update(collection, id, zeroed_counters());
        }
        let write_count = batch.len();

        match self.store.commit_batch(batch) {
            Ok(()) => {
                self.mirror.apply_bulk_reset();
                self.reset.apply(ResetAction::CommitSucceeded { now })?;
                info!(
                    "event=bulk_reset module=service status=ok collection={} people={}",
                    collection, write_count
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=bulk_reset module=service status=error collection={} people={} error={}",
                    collection, write_count, err
                );
                self.reset.apply(ResetAction::CommitFailed {
                    error: err.to_string(),
                })?;
                Err(ScoreboardError::Batch(err))
            }
        }
    }

    /// Closes the success message before its deadline.
    pub fn dismiss_reset(&mut self) -> ScoreboardResult<()> {
        self.reset.apply(ResetAction::Dismiss)?;
        Ok(())
    }

    /// Fires the deferred auto-dismiss when its deadline has passed.
    ///
    /// Returns `true` when the dialog was closed by this call.
    pub fn tick(&mut self, now: Instant) -> bool {
        let was_confirmed = matches!(self.reset.state(), ResetState::Confirmed { .. });
        // Tick is accepted in every state.
        let _ = self.reset.apply(ResetAction::Tick { now });
        was_confirmed && matches!(self.reset.state(), ResetState::Idle)
    }
}

fn zeroed_counters() -> Fields {
    let mut fields = Fields::new();
    fields.insert(Counter::Minor.field_name().to_string(), Value::from(0u32));
    fields.insert(Counter::Major.field_name().to_string(), Value::from(0u32));
    fields
}

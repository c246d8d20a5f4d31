//! Emission events and the log they are published to.
//!
//! Every successful `initialize` and `drip` appends exactly one event. The
//! log is append-only and sequence-numbered so pollers can resume with
//! [`EventLog::events_since`]; live subscribers get the same records through
//! a broadcast channel. Publishing never fails the operation that produced
//! the event.

use crate::errors::{STATUS_OK, STATUS_OK_DESCRIPTION};
use drip_types::{Address, ConfigurationRecord, TokenAmount, UnixTimestamp};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the live subscriber channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeEvent {
    pub status_code: u64,
    pub status_description: String,
    pub faucet: Address,
    pub mint: Address,
    pub mint_authority: Address,
    pub recipients: Vec<Address>,
    pub emission_interval_secs: u64,
    pub emission_per_tick: TokenAmount,
    pub timestamp: UnixTimestamp,
}

impl InitializeEvent {
    pub fn from_record(record: &ConfigurationRecord) -> Self {
        Self {
            status_code: STATUS_OK,
            status_description: STATUS_OK_DESCRIPTION.to_string(),
            faucet: record.faucet,
            mint: record.mint,
            mint_authority: record.mint_authority,
            recipients: record.recipient_accounts(),
            emission_interval_secs: record.emission_interval_secs,
            emission_per_tick: record.emission_per_tick,
            timestamp: record.initialized_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DripEvent {
    pub status_code: u64,
    pub status_description: String,
    pub faucet: Address,
    pub mint: Address,
    pub mint_authority: Address,
    pub recipients: Vec<Address>,
    pub per_recipient_amount: Vec<TokenAmount>,
    /// Seconds since the previous drip, or since initialization for the first
    pub interval: u64,
    pub total_supply_emitted: TokenAmount,
    pub drip_count: u64,
    pub timestamp: UnixTimestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FaucetEvent {
    Initialize(InitializeEvent),
    Drip(DripEvent),
}

impl FaucetEvent {
    pub fn faucet(&self) -> &Address {
        match self {
            FaucetEvent::Initialize(e) => &e.faucet,
            FaucetEvent::Drip(e) => &e.faucet,
        }
    }

    pub fn timestamp(&self) -> UnixTimestamp {
        match self {
            FaucetEvent::Initialize(e) => e.timestamp,
            FaucetEvent::Drip(e) => e.timestamp,
        }
    }
}

/// An event with its position in the log (first event is 1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub event: FaucetEvent,
}

/// In-memory, per-process event log.
///
/// Entries are not persisted with the records: a faucet reopened over an
/// existing store starts a fresh log at sequence 1. Sequence numbers are only
/// meaningful within one process lifetime, so a poller that outlives the
/// faucet must restart from `events_since(0)` and deduplicate by
/// `(faucet, drip_count)`, or rebuild its position from the stored records.
pub struct EventLog {
    entries: RwLock<Vec<EventRecord>>,
    publisher: broadcast::Sender<EventRecord>,
}

impl EventLog {
    pub fn new(channel_capacity: usize) -> Self {
        let (publisher, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            entries: RwLock::new(Vec::new()),
            publisher,
        }
    }

    /// Append an event and publish it. Returns its sequence number.
    pub fn append(&self, event: FaucetEvent) -> u64 {
        let mut entries = self.entries.write();
        let sequence = entries.len() as u64 + 1;
        let record = EventRecord { sequence, event };
        entries.push(record.clone());

        // No subscribers is not an error.
        if self.publisher.send(record).is_err() {
            trace!(sequence, "no live event subscribers");
        }
        sequence
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.publisher.subscribe()
    }

    /// All events with a sequence number greater than `sequence`.
    pub fn events_since(&self, sequence: u64) -> Vec<EventRecord> {
        let entries = self.entries.read();
        let start = (sequence as usize).min(entries.len());
        entries[start..].to_vec()
    }

    /// Events for one faucet, oldest first.
    pub fn events_for(&self, faucet: &Address) -> Vec<EventRecord> {
        self.entries
            .read()
            .iter()
            .filter(|r| r.event.faucet() == faucet)
            .cloned()
            .collect()
    }

    pub fn latest_sequence(&self) -> u64 {
        self.entries.read().len() as u64
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

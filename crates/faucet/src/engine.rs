//! Emission state machine.
//!
//! A faucet record moves `Uninitialized -> Initialized` once through
//! [`Faucet::initialize`]; every [`Faucet::drip`] afterwards is a
//! self-transition that mints one tick of emission. Each operation runs
//! under the record's own lock from the first read to the final write, so
//! concurrent drips against one record serialize and only the first one
//! sees the interval as elapsed.

use anyhow::anyhow;

use crate::errors::{FaucetError, STATUS_OK, STATUS_OK_DESCRIPTION};
use crate::events::{DripEvent, EventLog, FaucetEvent, InitializeEvent};
use crate::ledger::TokenLedger;
use crate::params::InitializeParams;
use crate::split::split_emission;
use drip_authority::{derive_mint_authority, locate_record, verify_mint_authority};
use drip_storage::RecordStore;
use drip_types::{
    Address, Clock, ConfigurationRecord, FaucetAddressing, TokenAmount, UnixTimestamp,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Tokens credited to one recipient by a drip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientAmount {
    pub account: Address,
    pub amount: TokenAmount,
}

/// Result of a successful drip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionReceipt {
    pub faucet: Address,
    pub mint: Address,
    pub mint_authority: Address,
    pub amounts: Vec<RecipientAmount>,
    /// Sum of `amounts`; below `emission_per_tick` only when the cap clamped it
    pub emitted: TokenAmount,
    pub elapsed_secs: u64,
    pub total_supply_emitted: TokenAmount,
    pub drip_count: u64,
    /// Mint supply reported by the ledger after minting
    pub mint_supply: TokenAmount,
    pub emitted_at: UnixTimestamp,
    pub event_sequence: u64,
}

pub struct Faucet {
    program_id: Address,
    store: Arc<dyn RecordStore>,
    ledger: Arc<dyn TokenLedger>,
    clock: Arc<dyn Clock>,
    events: Arc<EventLog>,
    locks: Mutex<HashMap<Address, Arc<Mutex<()>>>>,
}

impl Faucet {
    pub fn new(
        program_id: Address,
        store: Arc<dyn RecordStore>,
        ledger: Arc<dyn TokenLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            program_id,
            store,
            ledger,
            clock,
            events: Arc::new(EventLog::default()),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Publish events into `events` instead of a private log.
    pub fn with_event_log(mut self, events: Arc<EventLog>) -> Self {
        self.events = events;
        self
    }

    pub fn program_id(&self) -> &Address {
        &self.program_id
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Record location for `addressing`.
    pub fn locate(&self, addressing: &FaucetAddressing) -> Result<Address, FaucetError> {
        Ok(locate_record(addressing, &self.program_id)?)
    }

    /// Canonical `(mint_authority, bump)` for `addressing`.
    pub fn derive_authority(
        &self,
        addressing: &FaucetAddressing,
    ) -> Result<(Address, u8), FaucetError> {
        Ok(derive_mint_authority(addressing, &self.program_id)?)
    }

    pub fn record(&self, faucet: &Address) -> Result<Option<ConfigurationRecord>, FaucetError> {
        self.store.get_record(faucet).map_err(FaucetError::Storage)
    }

    pub fn records(&self) -> Result<Vec<ConfigurationRecord>, FaucetError> {
        self.store.list_records().map_err(FaucetError::Storage)
    }

    /// Make all record writes durable.
    pub fn flush(&self) -> Result<(), FaucetError> {
        self.store.flush().map_err(FaucetError::Storage)
    }

    /// Run `f` under the record's lock. The table entry is dropped again once
    /// no other caller holds or waits on it.
    fn with_record_lock<T>(&self, faucet: &Address, f: impl FnOnce() -> T) -> T {
        let lock = self.locks.lock().entry(*faucet).or_default().clone();
        let result = {
            let _guard = lock.lock();
            f()
        };
        drop(lock);

        let mut locks = self.locks.lock();
        if locks
            .get(faucet)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(faucet);
        }
        result
    }

    /// Create the configuration record for a new faucet.
    pub fn initialize(
        &self,
        addressing: &FaucetAddressing,
        params: InitializeParams,
    ) -> Result<ConfigurationRecord, FaucetError> {
        params.validate()?;
        let faucet = self.locate(addressing)?;

        self.with_record_lock(&faucet, || self.initialize_locked(faucet, addressing, params))
    }

    fn initialize_locked(
        &self,
        faucet: Address,
        addressing: &FaucetAddressing,
        params: InitializeParams,
    ) -> Result<ConfigurationRecord, FaucetError> {

        if let Some(existing) = self.record(&faucet)? {
            if existing.initialized {
                debug!(target: "faucet", faucet = %faucet, "Rejected re-initialization");
                return Err(FaucetError::AlreadyInitialized { faucet });
            }
        }

        let (mint_authority, canonical_bump) = self.derive_authority(addressing)?;
        if params.bump != canonical_bump {
            return Err(FaucetError::AuthorityMismatch {
                reason: format!(
                    "bump {} is not the canonical bump {} for {}",
                    params.bump, canonical_bump, mint_authority
                ),
            });
        }

        for recipient in &params.recipients {
            let account = self
                .ledger
                .token_account(&recipient.account)
                .map_err(FaucetError::Ledger)?;
            match account {
                Some(account) if account.mint == params.mint => {}
                _ => {
                    return Err(FaucetError::RecipientAccountMissing {
                        account: recipient.account,
                        mint: params.mint,
                    })
                }
            }
        }

        let now = self.clock.unix_timestamp();
        let record = ConfigurationRecord {
            faucet,
            addressing: addressing.clone(),
            mint: params.mint,
            mint_authority,
            authority_bump: canonical_bump,
            recipients: params.recipients,
            emission_interval_secs: params.emission_interval_secs,
            emission_per_tick: params.emission_per_tick,
            max_total_supply: params.max_total_supply,
            last_emission_time: 0,
            total_supply_emitted: 0,
            drip_count: 0,
            initialized_at: now,
            initialized: true,
        };
        self.store.put_record(&record).map_err(FaucetError::Storage)?;

        let sequence = self
            .events
            .append(FaucetEvent::Initialize(InitializeEvent::from_record(&record)));

        info!(
            target: "faucet",
            faucet = %faucet,
            mint = %record.mint,
            mint_authority = %record.mint_authority,
            recipients = record.recipients.len(),
            interval_secs = record.emission_interval_secs,
            per_tick = record.emission_per_tick,
            event = sequence,
            "Faucet initialized"
        );

        Ok(record)
    }

    /// Mint one tick of emission and split it across the recipients.
    pub fn drip(
        &self,
        faucet: &Address,
        mint: &Address,
        mint_authority: &Address,
        recipients: &[Address],
    ) -> Result<EmissionReceipt, FaucetError> {
        self.with_record_lock(faucet, || {
            self.drip_locked(faucet, mint, mint_authority, recipients)
        })
    }

    fn drip_locked(
        &self,
        faucet: &Address,
        mint: &Address,
        mint_authority: &Address,
        recipients: &[Address],
    ) -> Result<EmissionReceipt, FaucetError> {

        let record = match self.record(faucet)? {
            Some(record) if record.initialized => record,
            _ => return Err(FaucetError::NotInitialized { faucet: *faucet }),
        };

        self.check_authority(&record, mint, mint_authority)?;

        if !record.matches_recipients(recipients) {
            debug!(target: "faucet", faucet = %faucet, "Recipient set mismatch");
            return Err(FaucetError::RecipientSetMismatch { faucet: *faucet });
        }

        let remaining = record.remaining_supply();
        if let (Some(0), Some(cap)) = (remaining, record.max_total_supply) {
            debug!(target: "faucet", faucet = %faucet, cap, "Supply cap reached");
            return Err(FaucetError::SupplyCapReached {
                emitted: record.total_supply_emitted,
                cap,
            });
        }

        let now = self.clock.unix_timestamp();
        if now < record.last_emission_time {
            warn!(
                target: "faucet",
                faucet = %faucet,
                now,
                last_emission_time = record.last_emission_time,
                "Clock went backwards"
            );
            return Err(FaucetError::InvalidTimestamp {
                now,
                last_emission_time: record.last_emission_time,
            });
        }

        // drip_count, not a zero timestamp, marks a faucet that never dripped
        let first_drip = record.drip_count == 0;
        let since = if first_drip {
            record.initialized_at
        } else {
            record.last_emission_time
        };
        let elapsed_secs = now.saturating_sub(since).max(0) as u64;

        if !first_drip && elapsed_secs < record.emission_interval_secs {
            let retry_after_secs = record.emission_interval_secs - elapsed_secs;
            debug!(
                target: "faucet",
                faucet = %faucet,
                elapsed_secs,
                retry_after_secs,
                "Drip too soon"
            );
            return Err(FaucetError::TooSoon {
                elapsed_secs,
                interval_secs: record.emission_interval_secs,
                retry_after_secs,
            });
        }

        let amount = match remaining {
            Some(left) if left < record.emission_per_tick => {
                warn!(
                    target: "faucet",
                    faucet = %faucet,
                    per_tick = record.emission_per_tick,
                    clamped = left,
                    "Emission clamped to remaining supply"
                );
                left
            }
            _ => record.emission_per_tick,
        };

        let total_supply_emitted = record.total_supply_emitted.checked_add(amount).ok_or(
            FaucetError::SupplyCapReached {
                emitted: record.total_supply_emitted,
                cap: TokenAmount::MAX,
            },
        )?;
        let shares = split_emission(amount, &record.recipients)?;
        let credits: Vec<(Address, TokenAmount)> = record
            .recipients
            .iter()
            .map(|r| r.account)
            .zip(shares.iter().copied())
            .collect();
        self.check_ledger(mint, mint_authority, &credits)?;

        let mut updated = record.clone();
        updated.last_emission_time = now;
        updated.total_supply_emitted = total_supply_emitted;
        updated.drip_count += 1;
        self.store.put_record(&updated).map_err(FaucetError::Storage)?;

        let mint_supply = match self.ledger.mint_to(mint, mint_authority, &credits) {
            Ok(supply) => supply,
            Err(err) => {
                warn!(
                    target: "faucet",
                    faucet = %faucet,
                    error = %err,
                    "Mint failed, restoring faucet record"
                );
                if let Err(restore_err) = self.store.put_record(&record) {
                    error!(
                        target: "faucet",
                        faucet = %faucet,
                        error = %restore_err,
                        "Failed to restore faucet record after mint failure"
                    );
                    return Err(FaucetError::Storage(restore_err.context(format!(
                        "faucet {faucet} records an emission that was never minted: {err}"
                    ))));
                }
                return Err(FaucetError::Ledger(err));
            }
        };

        let event = DripEvent {
            status_code: STATUS_OK,
            status_description: STATUS_OK_DESCRIPTION.to_string(),
            faucet: *faucet,
            mint: *mint,
            mint_authority: *mint_authority,
            recipients: record.recipient_accounts(),
            per_recipient_amount: shares.clone(),
            interval: elapsed_secs,
            total_supply_emitted,
            drip_count: updated.drip_count,
            timestamp: now,
        };
        let event_sequence = self.events.append(FaucetEvent::Drip(event));

        info!(
            target: "faucet",
            faucet = %faucet,
            emitted = amount,
            recipients = credits.len(),
            total_supply_emitted,
            drip_count = updated.drip_count,
            elapsed_secs,
            "Drip emitted"
        );

        Ok(EmissionReceipt {
            faucet: *faucet,
            mint: *mint,
            mint_authority: *mint_authority,
            amounts: credits
                .into_iter()
                .map(|(account, amount)| RecipientAmount { account, amount })
                .collect(),
            emitted: amount,
            elapsed_secs,
            total_supply_emitted,
            drip_count: updated.drip_count,
            mint_supply,
            emitted_at: now,
            event_sequence,
        })
    }

    /// Ledger-side preconditions of `mint_to`, checked before the record is
    /// touched so a rejected mint never needs a rollback.
    fn check_ledger(
        &self,
        mint: &Address,
        mint_authority: &Address,
        credits: &[(Address, TokenAmount)],
    ) -> Result<(), FaucetError> {
        let info = self
            .ledger
            .mint_info(mint)
            .map_err(FaucetError::Ledger)?
            .ok_or_else(|| FaucetError::Ledger(anyhow!("unknown mint {mint}")))?;
        if info.mint_authority != Some(*mint_authority) {
            return Err(FaucetError::Ledger(anyhow!(
                "{mint_authority} is not the mint authority of {mint}"
            )));
        }

        for (account, _) in credits {
            let holder = self
                .ledger
                .token_account(account)
                .map_err(FaucetError::Ledger)?;
            match holder {
                Some(holder) if holder.mint == *mint => {}
                _ => {
                    return Err(FaucetError::RecipientAccountMissing {
                        account: *account,
                        mint: *mint,
                    })
                }
            }
        }
        Ok(())
    }

    fn check_authority(
        &self,
        record: &ConfigurationRecord,
        mint: &Address,
        mint_authority: &Address,
    ) -> Result<(), FaucetError> {
        if record.mint != *mint {
            return Err(FaucetError::AuthorityMismatch {
                reason: format!("mint {} is not faucet mint {}", mint, record.mint),
            });
        }
        if record.mint_authority != *mint_authority {
            return Err(FaucetError::AuthorityMismatch {
                reason: format!(
                    "authority {} is not faucet authority {}",
                    mint_authority, record.mint_authority
                ),
            });
        }
        verify_mint_authority(
            &record.addressing,
            record.authority_bump,
            &self.program_id,
            mint_authority,
        )
        .map_err(|e| FaucetError::AuthorityMismatch {
            reason: e.to_string(),
        })
    }
}

//! Drip keeper: the external loop that calls `drip` on a short period.
//!
//! The keeper polls far more often than the emission interval and relies on
//! the engine's rate limit, so a `TooSoon` rejection is the normal outcome
//! of most polls. Any other error stops the loop.

use crate::engine::{EmissionReceipt, Faucet};
use crate::errors::FaucetError;
use drip_types::{Address, ConfigurationRecord, TokenAmount};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// The account set a keeper drips against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DripTarget {
    pub faucet: Address,
    pub mint: Address,
    pub mint_authority: Address,
    pub recipients: Vec<Address>,
}

impl DripTarget {
    pub fn from_record(record: &ConfigurationRecord) -> Self {
        Self {
            faucet: record.faucet,
            mint: record.mint,
            mint_authority: record.mint_authority,
            recipients: record.recipient_accounts(),
        }
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeeperTick {
    Emitted(EmissionReceipt),
    Waiting { retry_after_secs: u64 },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeeperReport {
    pub polls: u64,
    pub emitted: u64,
    pub waited: u64,
    pub tokens_emitted: TokenAmount,
    /// Error that ended the loop, `None` on shutdown
    pub stopped_by: Option<String>,
}

pub struct DripKeeper {
    faucet: Arc<Faucet>,
    target: DripTarget,
    poll_period: Duration,
}

impl DripKeeper {
    pub fn new(faucet: Arc<Faucet>, target: DripTarget, poll_period: Duration) -> Self {
        Self {
            faucet,
            target,
            poll_period,
        }
    }

    pub fn target(&self) -> &DripTarget {
        &self.target
    }

    /// Attempt one drip. `TooSoon` is reported as [`KeeperTick::Waiting`].
    pub fn poll_once(&self) -> Result<KeeperTick, FaucetError> {
        let result = self.faucet.drip(
            &self.target.faucet,
            &self.target.mint,
            &self.target.mint_authority,
            &self.target.recipients,
        );
        match result {
            Ok(receipt) => Ok(KeeperTick::Emitted(receipt)),
            Err(FaucetError::TooSoon {
                retry_after_secs, ..
            }) => Ok(KeeperTick::Waiting { retry_after_secs }),
            Err(err) => Err(err),
        }
    }

    /// Poll until `shutdown` flips to true or a non-retryable error occurs.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> KeeperReport {
        let mut report = KeeperReport::default();
        let mut ticker = tokio::time::interval(self.poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            target: "faucet",
            faucet = %self.target.faucet,
            poll_ms = self.poll_period.as_millis() as u64,
            "Drip keeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            report.polls += 1;
            match self.poll_once() {
                Ok(KeeperTick::Emitted(receipt)) => {
                    report.emitted += 1;
                    report.tokens_emitted = report.tokens_emitted.saturating_add(receipt.emitted);
                }
                Ok(KeeperTick::Waiting { retry_after_secs }) => {
                    report.waited += 1;
                    debug!(target: "faucet", retry_after_secs, "Keeper waiting");
                }
                Err(err) => {
                    error!(
                        target: "faucet",
                        faucet = %self.target.faucet,
                        status = err.status_description(),
                        error = %err,
                        "Drip keeper stopped"
                    );
                    report.stopped_by = Some(err.to_string());
                    return report;
                }
            }
        }

        info!(
            target: "faucet",
            faucet = %self.target.faucet,
            polls = report.polls,
            emitted = report.emitted,
            "Drip keeper shut down"
        );
        report
    }
}

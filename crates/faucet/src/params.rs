//! Initialization parameters and their validation.

use crate::errors::ParamsError;
use drip_types::{Address, Recipient, TokenAmount, MAX_RECIPIENTS};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Everything `initialize` needs besides the addressing mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeParams {
    /// Bump the caller derived the mint authority with; must be canonical
    pub bump: u8,
    pub mint: Address,
    pub recipients: Vec<Recipient>,
    pub emission_interval_secs: u64,
    pub emission_per_tick: TokenAmount,
    #[serde(default)]
    pub max_total_supply: Option<TokenAmount>,
}

impl InitializeParams {
    /// Uncapped parameters splitting evenly across `accounts`.
    pub fn equal_split(
        bump: u8,
        mint: Address,
        accounts: &[Address],
        emission_interval_secs: u64,
        emission_per_tick: TokenAmount,
    ) -> Self {
        Self {
            bump,
            mint,
            recipients: accounts.iter().copied().map(Recipient::equal).collect(),
            emission_interval_secs,
            emission_per_tick,
            max_total_supply: None,
        }
    }

    pub fn with_max_total_supply(mut self, cap: TokenAmount) -> Self {
        self.max_total_supply = Some(cap);
        self
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.recipients.is_empty() {
            return Err(ParamsError::NoRecipients);
        }
        if self.recipients.len() > MAX_RECIPIENTS {
            return Err(ParamsError::TooManyRecipients {
                count: self.recipients.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.recipients.len());
        for recipient in &self.recipients {
            if !seen.insert(recipient.account) {
                return Err(ParamsError::DuplicateRecipient {
                    account: recipient.account,
                });
            }
            if recipient.weight == 0 {
                return Err(ParamsError::ZeroWeight {
                    account: recipient.account,
                });
            }
        }

        if self.emission_interval_secs == 0 {
            return Err(ParamsError::ZeroInterval);
        }
        if self.emission_per_tick == 0 {
            return Err(ParamsError::ZeroEmission);
        }
        if self.max_total_supply == Some(0) {
            return Err(ParamsError::ZeroSupplyCap);
        }
        Ok(())
    }
}

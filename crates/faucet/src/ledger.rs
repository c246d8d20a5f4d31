//! Token ledger interface used by the emission engine.
//!
//! The engine never holds balances itself. It checks that mints and token
//! accounts exist, then asks the ledger to mint a whole drip in one batch.

use anyhow::{anyhow, bail, Result};
use drip_types::{Address, TokenAmount};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// A token type and its minting authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintInfo {
    pub mint: Address,
    /// `None` once minting has been disabled for good
    pub mint_authority: Option<Address>,
    pub supply: TokenAmount,
    pub decimals: u8,
}

/// A balance of one mint held for one owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccount {
    pub address: Address,
    pub mint: Address,
    pub owner: Address,
    pub amount: TokenAmount,
}

/// Interface for token ledger operations.
pub trait TokenLedger: Send + Sync {
    /// Look up a mint.
    fn mint_info(&self, mint: &Address) -> Result<Option<MintInfo>>;

    /// Look up a token account.
    fn token_account(&self, account: &Address) -> Result<Option<TokenAccount>>;

    /// Mint every `(account, amount)` credit under `authority`.
    ///
    /// Either all credits apply or none do. Returns the mint's new supply.
    fn mint_to(
        &self,
        mint: &Address,
        authority: &Address,
        credits: &[(Address, TokenAmount)],
    ) -> Result<TokenAmount>;
}

#[derive(Debug, Default)]
struct LedgerState {
    mints: HashMap<Address, MintInfo>,
    accounts: HashMap<Address, TokenAccount>,
}

// -----------------------------------------------------------------------------
// In-memory implementation (for simulation and testing)
// -----------------------------------------------------------------------------
#[derive(Debug, Default)]
pub struct InMemoryTokenLedger {
    state: RwLock<LedgerState>,
}

impl InMemoryTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new mint with zero supply.
    pub fn create_mint(&self, mint: Address, authority: Address, decimals: u8) -> Result<()> {
        let mut state = self.state.write();
        if state.mints.contains_key(&mint) {
            bail!("mint {mint} already exists");
        }
        state.mints.insert(
            mint,
            MintInfo {
                mint,
                mint_authority: Some(authority),
                supply: 0,
                decimals,
            },
        );
        Ok(())
    }

    /// Open an empty token account for `mint`.
    pub fn create_account(&self, address: Address, mint: Address, owner: Address) -> Result<()> {
        let mut state = self.state.write();
        if !state.mints.contains_key(&mint) {
            bail!("unknown mint {mint}");
        }
        if state.accounts.contains_key(&address) {
            bail!("token account {address} already exists");
        }
        state.accounts.insert(
            address,
            TokenAccount {
                address,
                mint,
                owner,
                amount: 0,
            },
        );
        Ok(())
    }

    /// Hand minting rights to `authority` (or revoke them with `None`).
    pub fn set_mint_authority(&self, mint: &Address, authority: Option<Address>) -> Result<()> {
        let mut state = self.state.write();
        let info = state
            .mints
            .get_mut(mint)
            .ok_or_else(|| anyhow!("unknown mint {mint}"))?;
        info.mint_authority = authority;
        Ok(())
    }

    /// Balance of `account`, 0 when it does not exist.
    pub fn balance(&self, account: &Address) -> TokenAmount {
        self.state
            .read()
            .accounts
            .get(account)
            .map(|a| a.amount)
            .unwrap_or(0)
    }

    pub fn supply(&self, mint: &Address) -> TokenAmount {
        self.state
            .read()
            .mints
            .get(mint)
            .map(|m| m.supply)
            .unwrap_or(0)
    }
}

impl TokenLedger for InMemoryTokenLedger {
    fn mint_info(&self, mint: &Address) -> Result<Option<MintInfo>> {
        Ok(self.state.read().mints.get(mint).cloned())
    }

    fn token_account(&self, account: &Address) -> Result<Option<TokenAccount>> {
        Ok(self.state.read().accounts.get(account).cloned())
    }

    fn mint_to(
        &self,
        mint: &Address,
        authority: &Address,
        credits: &[(Address, TokenAmount)],
    ) -> Result<TokenAmount> {
        let mut state = self.state.write();

        let info = state
            .mints
            .get(mint)
            .ok_or_else(|| anyhow!("unknown mint {mint}"))?;
        if info.mint_authority != Some(*authority) {
            bail!("{authority} is not the mint authority of {mint}");
        }

        // Validate the whole batch before touching anything.
        let mut new_supply = info.supply;
        let mut new_balances = Vec::with_capacity(credits.len());
        for (account, amount) in credits {
            let holder = state
                .accounts
                .get(account)
                .ok_or_else(|| anyhow!("unknown token account {account}"))?;
            if holder.mint != *mint {
                bail!("token account {account} holds {} not {mint}", holder.mint);
            }
            let balance = new_balances
                .iter()
                .rev()
                .find(|(a, _)| a == account)
                .map(|(_, b)| *b)
                .unwrap_or(holder.amount);
            let balance = balance
                .checked_add(*amount)
                .ok_or_else(|| anyhow!("balance overflow on {account}"))?;
            new_supply = new_supply
                .checked_add(*amount)
                .ok_or_else(|| anyhow!("supply overflow on {mint}"))?;
            new_balances.push((*account, balance));
        }

        for (account, balance) in new_balances {
            if let Some(holder) = state.accounts.get_mut(&account) {
                holder.amount = balance;
            }
        }
        if let Some(info) = state.mints.get_mut(mint) {
            info.supply = new_supply;
        }
        Ok(new_supply)
    }
}

// -----------------------------------------------------------------------------
// Mock ledger (call recording and failure injection)
// -----------------------------------------------------------------------------

/// One recorded `mint_to` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintCall {
    pub mint: Address,
    pub authority: Address,
    pub credits: Vec<(Address, TokenAmount)>,
}

#[derive(Debug, Default)]
pub struct MockTokenLedger {
    inner: InMemoryTokenLedger,
    mint_calls: Mutex<Vec<MintCall>>,
    fail_next_mint: AtomicBool,
}

impl MockTokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backing ledger, for setting up mints and accounts.
    pub fn ledger(&self) -> &InMemoryTokenLedger {
        &self.inner
    }

    /// Make the next `mint_to` fail without applying anything.
    pub fn fail_next_mint(&self) {
        self.fail_next_mint.store(true, Ordering::SeqCst);
    }

    pub fn mint_calls(&self) -> Vec<MintCall> {
        self.mint_calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.mint_calls.lock().clear();
    }
}

impl TokenLedger for MockTokenLedger {
    fn mint_info(&self, mint: &Address) -> Result<Option<MintInfo>> {
        self.inner.mint_info(mint)
    }

    fn token_account(&self, account: &Address) -> Result<Option<TokenAccount>> {
        self.inner.token_account(account)
    }

    fn mint_to(
        &self,
        mint: &Address,
        authority: &Address,
        credits: &[(Address, TokenAmount)],
    ) -> Result<TokenAmount> {
        self.mint_calls.lock().push(MintCall {
            mint: *mint,
            authority: *authority,
            credits: credits.to_vec(),
        });
        if self.fail_next_mint.swap(false, Ordering::SeqCst) {
            bail!("injected mint failure");
        }
        self.inner.mint_to(mint, authority, credits)
    }
}

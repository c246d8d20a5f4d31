//! Emission Scenario Tests
//!
//! End-to-end runs of the faucet against an in-memory token ledger:
//! - equal split of a single tick across five recipients
//! - a keeper-style poll every 3s against a 60s interval
//! - re-initialization is rejected, other seeds are independent
//! - rejected drips leave no trace
//! - supply cap clamping and exhaustion
//! - keyed (multi-instance) faucets
//!
//! Run with: cargo test -p drip-faucet --test emission_scenarios -- --nocapture

use drip_faucet::{
    Address, ConfigurationRecord, Faucet, FaucetAddressing, FaucetError, FaucetEvent,
    InMemoryTokenLedger, InitializeParams, TokenLedger,
};
use drip_storage::MemoryRecordStore;
use drip_types::ManualClock;
use std::sync::Arc;

// =============================================================================
// TEST HELPERS
// =============================================================================

const START: i64 = 1_700_000_000;
const PROGRAM: Address = Address([42u8; 32]);

fn account(n: u8) -> Address {
    let mut id = [0u8; 32];
    id[0] = n;
    id[31] = 0xAA;
    Address(id)
}

struct Env {
    faucet: Faucet,
    ledger: Arc<InMemoryTokenLedger>,
    clock: Arc<ManualClock>,
}

fn env() -> Env {
    let ledger = Arc::new(InMemoryTokenLedger::new());
    let clock = Arc::new(ManualClock::new(START));
    let faucet = Faucet::new(
        PROGRAM,
        Arc::new(MemoryRecordStore::new()),
        ledger.clone(),
        clock.clone(),
    );
    Env {
        faucet,
        ledger,
        clock,
    }
}

/// Create `mint` under the authority derived for `addressing` and open one
/// token account per recipient.
fn prepare(env: &Env, addressing: &FaucetAddressing, mint: Address, recipients: &[Address]) -> u8 {
    let (authority, bump) = env.faucet.derive_authority(addressing).unwrap();
    env.ledger.create_mint(mint, authority, 9).unwrap();
    for (i, r) in recipients.iter().enumerate() {
        env.ledger
            .create_account(*r, mint, account(200 + i as u8))
            .unwrap();
    }
    bump
}

fn drip(env: &Env, record: &ConfigurationRecord) -> Result<drip_faucet::EmissionReceipt, FaucetError> {
    env.faucet.drip(
        &record.faucet,
        &record.mint,
        &record.mint_authority,
        &record.recipient_accounts(),
    )
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn five_equal_recipients_get_200_each() {
    let env = env();
    let addressing = FaucetAddressing::seeded("main");
    let mint = account(1);
    let recipients: Vec<Address> = (10..15).map(account).collect();
    let bump = prepare(&env, &addressing, mint, &recipients);

    let record = env
        .faucet
        .initialize(
            &addressing,
            InitializeParams::equal_split(bump, mint, &recipients, 60, 1_000),
        )
        .unwrap();

    let receipt = drip(&env, &record).unwrap();
    assert_eq!(receipt.emitted, 1_000);
    for (r, share) in recipients.iter().zip(&receipt.amounts) {
        assert_eq!(share.account, *r);
        assert_eq!(share.amount, 200);
        assert_eq!(env.ledger.balance(r), 200);
    }
    assert_eq!(env.ledger.supply(&mint), 1_000);
    assert_eq!(receipt.mint_supply, 1_000);

    let stored = env.faucet.record(&record.faucet).unwrap().unwrap();
    assert_eq!(stored.last_emission_time, START);
    assert_eq!(stored.total_supply_emitted, 1_000);
    assert_eq!(stored.drip_count, 1);

    match &env.faucet.events().events_since(1)[0].event {
        FaucetEvent::Drip(event) => {
            assert_eq!(event.status_code, 0);
            assert_eq!(event.status_description, "Ok");
            assert_eq!(event.per_recipient_amount, vec![200; 5]);
            assert_eq!(event.recipients, recipients);
            assert_eq!(event.total_supply_emitted, 1_000);
        }
        other => panic!("expected drip event, got {other:?}"),
    }
}

#[test]
fn polling_every_3s_emits_once_per_interval() {
    let env = env();
    let addressing = FaucetAddressing::seeded("main");
    let mint = account(1);
    let recipients: Vec<Address> = (10..15).map(account).collect();
    let bump = prepare(&env, &addressing, mint, &recipients);
    let record = env
        .faucet
        .initialize(
            &addressing,
            InitializeParams::equal_split(bump, mint, &recipients, 60, 1_000),
        )
        .unwrap();

    let mut successes = 0;
    let mut too_soon = 0;
    for call in 0..100 {
        if call > 0 {
            env.clock.advance(3);
        }
        match drip(&env, &record) {
            Ok(_) => successes += 1,
            Err(FaucetError::TooSoon { .. }) => too_soon += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    // t = 0, 60, 120, 180, 240 over a 297s window
    assert_eq!(successes, 5);
    assert_eq!(too_soon, 95);
    assert_eq!(env.ledger.supply(&mint), 5_000);
    assert_eq!(env.ledger.balance(&recipients[0]), 1_000);
}

#[test]
fn reinitialize_is_rejected_and_seeds_are_independent() {
    let env = env();
    let main = FaucetAddressing::seeded("main");
    let other = FaucetAddressing::seeded("other");
    let mint = account(1);
    let recipients = vec![account(10)];
    let bump = prepare(&env, &main, mint, &recipients);

    let first = env
        .faucet
        .initialize(
            &main,
            InitializeParams::equal_split(bump, mint, &recipients, 60, 1_000),
        )
        .unwrap();

    env.clock.advance(100);
    let err = env
        .faucet
        .initialize(
            &main,
            InitializeParams::equal_split(bump, mint, &recipients, 30, 5),
        )
        .unwrap_err();
    assert!(matches!(err, FaucetError::AlreadyInitialized { faucet } if faucet == first.faucet));
    assert_eq!(err.status_code(), 2);
    assert_eq!(env.faucet.record(&first.faucet).unwrap(), Some(first.clone()));

    let (_, other_bump) = env.faucet.derive_authority(&other).unwrap();
    let second = env
        .faucet
        .initialize(
            &other,
            InitializeParams::equal_split(other_bump, mint, &recipients, 30, 5),
        )
        .unwrap();
    assert_ne!(second.faucet, first.faucet);
    assert_ne!(second.mint_authority, first.mint_authority);
    assert_eq!(env.faucet.records().unwrap().len(), 2);
    assert_eq!(env.faucet.record(&first.faucet).unwrap(), Some(first));
}

#[test]
fn too_soon_changes_nothing() {
    let env = env();
    let addressing = FaucetAddressing::seeded("main");
    let mint = account(1);
    let recipients = vec![account(10), account(11)];
    let bump = prepare(&env, &addressing, mint, &recipients);
    let record = env
        .faucet
        .initialize(
            &addressing,
            InitializeParams::equal_split(bump, mint, &recipients, 60, 1_000),
        )
        .unwrap();
    drip(&env, &record).unwrap();

    let stored = env.faucet.record(&record.faucet).unwrap();
    let events = env.faucet.events().len();
    let supply = env.ledger.mint_info(&mint).unwrap().unwrap().supply;

    env.clock.advance(30);
    let err = drip(&env, &record).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(30)));

    assert_eq!(env.faucet.record(&record.faucet).unwrap(), stored);
    assert_eq!(env.faucet.events().len(), events);
    assert_eq!(env.ledger.mint_info(&mint).unwrap().unwrap().supply, supply);
}

#[test]
fn supply_cap_clamps_last_drip_then_stops() {
    let env = env();
    let addressing = FaucetAddressing::seeded("capped");
    let mint = account(1);
    let recipients = vec![account(10), account(11), account(12)];
    let bump = prepare(&env, &addressing, mint, &recipients);
    let record = env
        .faucet
        .initialize(
            &addressing,
            InitializeParams::equal_split(bump, mint, &recipients, 60, 1_000)
                .with_max_total_supply(2_500),
        )
        .unwrap();

    assert_eq!(drip(&env, &record).unwrap().emitted, 1_000);
    env.clock.advance(60);
    assert_eq!(drip(&env, &record).unwrap().emitted, 1_000);
    env.clock.advance(60);

    let last = drip(&env, &record).unwrap();
    assert_eq!(last.emitted, 500);
    let shares: Vec<u64> = last.amounts.iter().map(|a| a.amount).collect();
    assert_eq!(shares, vec![166, 166, 168]);
    assert_eq!(last.total_supply_emitted, 2_500);

    env.clock.advance(60);
    let err = drip(&env, &record).unwrap_err();
    assert!(matches!(
        err,
        FaucetError::SupplyCapReached {
            emitted: 2_500,
            cap: 2_500
        }
    ));
    assert!(!err.is_retryable());
    assert_eq!(env.ledger.supply(&mint), 2_500);
}

#[test]
fn keyed_instances_are_independent_faucets() {
    let env = env();
    let mint = account(1);
    let recipients = vec![account(10)];

    let a = FaucetAddressing::keyed(account(100));
    let b = FaucetAddressing::keyed(account(101));
    let (authority_a, bump_a) = env.faucet.derive_authority(&a).unwrap();
    let (authority_b, bump_b) = env.faucet.derive_authority(&b).unwrap();
    assert_ne!(authority_a, authority_b);

    env.ledger.create_mint(mint, authority_a, 0).unwrap();
    env.ledger.create_account(recipients[0], mint, account(200)).unwrap();
    let second_mint = account(2);
    env.ledger.create_mint(second_mint, authority_b, 0).unwrap();
    env.ledger
        .create_account(account(20), second_mint, account(200))
        .unwrap();

    let record_a = env
        .faucet
        .initialize(&a, InitializeParams::equal_split(bump_a, mint, &recipients, 60, 7))
        .unwrap();
    let record_b = env
        .faucet
        .initialize(
            &b,
            InitializeParams::equal_split(bump_b, second_mint, &[account(20)], 60, 9),
        )
        .unwrap();
    assert_eq!(record_a.faucet, account(100));
    assert_eq!(record_b.faucet, account(101));

    drip(&env, &record_a).unwrap();
    drip(&env, &record_b).unwrap();
    assert_eq!(env.ledger.balance(&recipients[0]), 7);
    assert_eq!(env.ledger.balance(&account(20)), 9);

    // b's authority cannot drip a's mint
    assert!(matches!(
        env.faucet
            .drip(&record_a.faucet, &mint, &authority_b, &recipients),
        Err(FaucetError::AuthorityMismatch { .. })
    ));
}

#[test]
fn drip_before_initialize_is_rejected() {
    let env = env();
    let addressing = FaucetAddressing::seeded("never");
    let faucet = env.faucet.locate(&addressing).unwrap();
    let err = env
        .faucet
        .drip(&faucet, &account(1), &account(2), &[account(10)])
        .unwrap_err();
    assert!(matches!(err, FaucetError::NotInitialized { .. }));
    assert!(env.faucet.events().is_empty());
}

//! Concurrent drip tests
//!
//! Many callers racing on the same faucet at the same instant: exactly one
//! may mint, all others must see the interval as not yet elapsed.

use drip_faucet::{
    Address, Faucet, FaucetAddressing, FaucetError, InMemoryTokenLedger, InitializeParams,
};
use drip_storage::MemoryRecordStore;
use drip_types::ManualClock;
use std::sync::{Arc, Barrier};
use std::thread;

const PROGRAM: Address = Address([42u8; 32]);

fn setup(seeds: &[&str]) -> (Arc<Faucet>, Arc<InMemoryTokenLedger>, Vec<drip_faucet::ConfigurationRecord>) {
    let ledger = Arc::new(InMemoryTokenLedger::new());
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let faucet = Faucet::new(
        PROGRAM,
        Arc::new(MemoryRecordStore::new()),
        ledger.clone(),
        clock,
    );

    let mut records = Vec::new();
    for (i, seed) in seeds.iter().enumerate() {
        let addressing = FaucetAddressing::seeded(seed);
        let (authority, bump) = faucet.derive_authority(&addressing).unwrap();
        let mint = Address([i as u8 + 1; 32]);
        let holder = Address([i as u8 + 100; 32]);
        ledger.create_mint(mint, authority, 0).unwrap();
        ledger.create_account(holder, mint, holder).unwrap();
        records.push(
            faucet
                .initialize(
                    &addressing,
                    InitializeParams::equal_split(bump, mint, &[holder], 60, 1_000),
                )
                .unwrap(),
        );
    }
    (Arc::new(faucet), ledger, records)
}

#[test]
fn concurrent_drips_have_exactly_one_winner() {
    const CALLERS: usize = 16;
    let (faucet, ledger, records) = setup(&["race"]);
    let record = records[0].clone();
    let barrier = Arc::new(Barrier::new(CALLERS));

    let handles: Vec<_> = (0..CALLERS)
        .map(|_| {
            let faucet = faucet.clone();
            let barrier = barrier.clone();
            let record = record.clone();
            thread::spawn(move || {
                barrier.wait();
                faucet.drip(
                    &record.faucet,
                    &record.mint,
                    &record.mint_authority,
                    &record.recipient_accounts(),
                )
            })
        })
        .collect();

    let mut winners = 0;
    let mut too_soon = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(_) => winners += 1,
            Err(FaucetError::TooSoon { .. }) => too_soon += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(too_soon, CALLERS - 1);
    assert_eq!(ledger.supply(&record.mint), 1_000);
    assert_eq!(faucet.record(&record.faucet).unwrap().unwrap().drip_count, 1);
}

#[test]
fn distinct_faucets_do_not_block_each_other() {
    let seeds = ["a", "b", "c", "d"];
    let (faucet, ledger, records) = setup(&seeds);

    let handles: Vec<_> = records
        .iter()
        .cloned()
        .map(|record| {
            let faucet = faucet.clone();
            thread::spawn(move || {
                faucet.drip(
                    &record.faucet,
                    &record.mint,
                    &record.mint_authority,
                    &record.recipient_accounts(),
                )
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().is_ok());
    }
    for record in &records {
        assert_eq!(ledger.supply(&record.mint), 1_000);
    }
}

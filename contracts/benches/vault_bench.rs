// Ledger throughput benchmarks for the MetaVault contract.
//
// Covers a deposit/withdraw round trip against the in-memory token, and the
// cost of the invariant audit as the number of accounts grows.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use metavault_contracts::{Account, Amount, AssetHandle, LocalToken, MetaVault, VaultConfig};

fn vault_with_accounts(count: usize, config: VaultConfig) -> (Arc<LocalToken>, MetaVault, Vec<Account>) {
    let token = Arc::new(LocalToken::new(AssetHandle::new("0xt")));
    let vault_addr = Account::new("0xv");
    let mut vault = MetaVault::with_config(
        Account::new("0xa"),
        vault_addr.clone(),
        AssetHandle::new("0xt"),
        token.clone(),
        config,
    )
    .unwrap();

    let accounts: Vec<Account> = (0..count).map(|i| Account::new(format!("0x{i:040x}"))).collect();
    for account in &accounts {
        token.mint(account, 1 << 100).unwrap();
        token.approve(account, &vault_addr, Amount::MAX).unwrap();
        vault.deposit(account, 1_000).unwrap();
    }
    (token, vault, accounts)
}

fn bench_round_trip(c: &mut Criterion) {
    let (_token, mut vault, accounts) = vault_with_accounts(1, VaultConfig::default());
    let bob = accounts[0].clone();

    c.bench_function("vault/deposit_withdraw", |b| {
        b.iter(|| {
            vault.deposit(&bob, 10).unwrap();
            vault.withdraw(&bob, 10).unwrap();
        });
    });
}

fn bench_audit(c: &mut Criterion) {
    let mut group = c.benchmark_group("vault/deposit_with_audit");

    for size in [10usize, 100, 1_000] {
        for audit in [true, false] {
            let config = VaultConfig {
                audit_invariant: audit,
                max_events: 0,
                ..VaultConfig::default()
            };
            let (_token, mut vault, accounts) = vault_with_accounts(size, config);
            let bob = accounts[0].clone();
            let label = if audit { "audit" } else { "no_audit" };

            group.throughput(Throughput::Elements(1));
            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, _| {
                b.iter(|| vault.deposit(&bob, 1).unwrap());
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_round_trip, bench_audit);
criterion_main!(benches);

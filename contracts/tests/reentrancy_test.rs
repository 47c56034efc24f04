//! Integration tests against hostile assets.
//!
//! The port implementations here call back into the vault from inside
//! `pull`/`push`, the way a malicious asset contract would. Each scenario
//! runs with the reentrancy guard on and off: the guard rejects re-entry
//! outright, and with it off the debit-before-push ordering alone must
//! still prevent a double spend.

use std::sync::Arc;

use parking_lot::Mutex;

use metavault_contracts::{
    Account, Amount, AssetHandle, AssetTransferPort, LocalToken, MetaVault, Operation,
    TransferError, VaultConfig, VaultEntry, VaultError,
};

const TOKEN: &str = "0xt";
const OWNER: &str = "0xa";
const VAULT: &str = "0xv";

/// What the hostile asset does when the vault calls out to it.
#[derive(Clone)]
enum Attack {
    /// On push, withdraw `amount` again for the recipient, up to `depth`
    /// nested levels, then complete the transfer.
    RewithdrawOnPush { depth: usize },
    /// On push, withdraw again and fail the push if the nested call fails.
    PropagateOnPush,
    /// On pull, withdraw for the depositor before the funds arrive.
    WithdrawOnPull,
    /// On push, deposit for `account`, then refuse the push.
    DepositThenRefuse { account: Account, amount: Amount },
    /// On push, try to skim everything to the owner as the recipient.
    SkimOnPush,
}

/// An asset that re-enters the vault.
struct HostileToken {
    inner: LocalToken,
    attack: Attack,
    /// Outcomes of every nested call, in the order they returned.
    nested: Mutex<Vec<Result<(), VaultError>>>,
    /// Current nesting level of `push`.
    level: Mutex<usize>,
}

impl HostileToken {
    fn new(attack: Attack) -> Self {
        Self {
            inner: LocalToken::new(AssetHandle::new(TOKEN)),
            attack,
            nested: Mutex::new(Vec::new()),
            level: Mutex::new(0),
        }
    }

    fn nested_outcomes(&self) -> Vec<Result<(), VaultError>> {
        self.nested.lock().clone()
    }

    fn record(&self, outcome: Result<(), VaultError>) -> Result<(), VaultError> {
        self.nested.lock().push(outcome.clone());
        outcome
    }
}

impl AssetTransferPort for HostileToken {
    fn asset(&self) -> &AssetHandle {
        self.inner.handle()
    }

    fn pull(
        &self,
        vault: &mut dyn VaultEntry,
        from: &Account,
        to: &Account,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if let Attack::WithdrawOnPull = self.attack {
            let _ = self.record(vault.withdraw(from, amount));
        }
        self.inner.pull(vault, from, to, amount)
    }

    fn push(
        &self,
        vault: &mut dyn VaultEntry,
        to: &Account,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let level = {
            let mut level = self.level.lock();
            *level += 1;
            *level
        };

        let outcome = match &self.attack {
            Attack::RewithdrawOnPush { depth } if level <= *depth => {
                let _ = self.record(vault.withdraw(to, amount));
                Ok(())
            }
            Attack::PropagateOnPush if level == 1 => self
                .record(vault.withdraw(to, amount))
                .map_err(TransferError::from),
            Attack::DepositThenRefuse { account, amount } if level == 1 => {
                let _ = self.record(vault.deposit(account, *amount));
                Err(TransferError::Rejected {
                    reason: "refusing after nested deposit".into(),
                })
            }
            Attack::SkimOnPush if level == 1 => {
                let _ = self.record(vault.skim(to, amount));
                Ok(())
            }
            _ => Ok(()),
        };

        let result = outcome.and_then(|()| self.inner.push(vault, to, amount));
        *self.level.lock() -= 1;
        result
    }

    fn balance_of(&self, holder: &Account) -> Amount {
        self.inner.balance_of(holder)
    }
}

/// Helper: a hostile token and a vault over it, with `who` already holding
/// `deposited` in the vault.
fn deploy(attack: Attack, guard: bool, who: &str, deposited: Amount) -> (Arc<HostileToken>, MetaVault, Account) {
    let token = Arc::new(HostileToken::new(attack));
    let config = VaultConfig {
        reentrancy_guard: guard,
        ..VaultConfig::default()
    };
    let mut vault = MetaVault::with_config(
        Account::new(OWNER),
        Account::new(VAULT),
        AssetHandle::new(TOKEN),
        token.clone(),
        config,
    )
    .unwrap();

    let account = Account::new(who);
    token.inner.mint(&account, deposited).unwrap();
    token
        .inner
        .approve(&account, &Account::new(VAULT), deposited)
        .unwrap();
    vault.deposit(&account, deposited).unwrap();

    // Other depositors whose funds an attacker would be stealing.
    let bystander = Account::new("0xbystander");
    token.inner.mint(&bystander, 1_000).unwrap();
    token
        .inner
        .approve(&bystander, &Account::new(VAULT), 1_000)
        .unwrap();
    vault.deposit(&bystander, 1_000).unwrap();

    (token, vault, account)
}

// ---------------------------------------------------------------------------
// Re-withdraw during push
// ---------------------------------------------------------------------------

#[test]
fn guard_rejects_rewithdraw_during_push() {
    let (token, mut vault, mallory) =
        deploy(Attack::RewithdrawOnPush { depth: 5 }, true, "0xm", 100);

    vault.withdraw(&mallory, 100).unwrap();

    assert_eq!(
        token.nested_outcomes(),
        vec![Err(VaultError::Reentrancy {
            operation: Operation::Withdraw
        })]
    );
    assert_eq!(token.inner.balance_of(&mallory), 100);
    assert_eq!(vault.balance_of(&mallory), 0);
    assert_eq!(vault.total_deposits(), 1_000);
    vault.audit().unwrap();
}

#[test]
fn ordering_alone_prevents_double_spend_of_full_balance() {
    let (token, mut vault, mallory) =
        deploy(Attack::RewithdrawOnPush { depth: 5 }, false, "0xm", 100);

    vault.withdraw(&mallory, 100).unwrap();

    // The nested call already sees the debited balance.
    assert_eq!(
        token.nested_outcomes(),
        vec![Err(VaultError::InsufficientBalance {
            account: mallory.clone(),
            available: 0,
            requested: 100,
        })]
    );
    assert_eq!(token.inner.balance_of(&mallory), 100);
    assert_eq!(vault.balance_of(&mallory), 0);
    assert_eq!(vault.backing(), 1_000);
    assert_eq!(vault.total_deposits(), 1_000);
    vault.audit().unwrap();
}

#[test]
fn ordering_alone_caps_nested_withdrawals_at_starting_balance() {
    let (token, mut vault, mallory) =
        deploy(Attack::RewithdrawOnPush { depth: 5 }, false, "0xm", 100);

    vault.withdraw(&mallory, 30).unwrap();

    // 100 → 70 (outer) → 40 → 10 → nested withdraw of 30 fails.
    let outcomes = token.nested_outcomes();
    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 2);
    assert!(matches!(
        outcomes.first(),
        Some(Err(VaultError::InsufficientBalance { available: 10, .. }))
    ));

    let received = token.inner.balance_of(&mallory);
    assert_eq!(received, 90);
    assert!(received <= 100);
    assert_eq!(vault.balance_of(&mallory), 10);
    assert_eq!(vault.total_deposits(), 1_010);
    assert_eq!(vault.shortfall(), 0);
    vault.audit().unwrap();
}

// ---------------------------------------------------------------------------
// Nested failure propagated through the push
// ---------------------------------------------------------------------------

#[test]
fn propagated_nested_failure_reverts_everything() {
    for guard in [true, false] {
        let (token, mut vault, mallory) = deploy(Attack::PropagateOnPush, guard, "0xm", 100);
        let before = vault.snapshot();
        let events_before = vault.events().count();

        let err = vault.withdraw(&mallory, 100).unwrap_err();

        assert!(matches!(
            err,
            VaultError::TransferFailed {
                operation: Operation::Withdraw,
                source: TransferError::Rejected { .. },
            }
        ));
        assert_eq!(vault.snapshot(), before, "guard = {guard}");
        assert_eq!(vault.events().count(), events_before);
        assert_eq!(token.inner.balance_of(&mallory), 0);
        assert!(!vault.is_entered());
    }
}

// ---------------------------------------------------------------------------
// Re-entry during deposit
// ---------------------------------------------------------------------------

#[test]
fn withdraw_during_pull_finds_nothing_credited() {
    for guard in [true, false] {
        let token = Arc::new(HostileToken::new(Attack::WithdrawOnPull));
        let mut vault = MetaVault::with_config(
            Account::new(OWNER),
            Account::new(VAULT),
            AssetHandle::new(TOKEN),
            token.clone(),
            VaultConfig {
                reentrancy_guard: guard,
                ..VaultConfig::default()
            },
        )
        .unwrap();
        let mallory = Account::new("0xm");
        token.inner.mint(&mallory, 50).unwrap();
        token
            .inner
            .approve(&mallory, &Account::new(VAULT), 50)
            .unwrap();

        vault.deposit(&mallory, 50).unwrap();

        let outcomes = token.nested_outcomes();
        assert_eq!(outcomes.len(), 1);
        if guard {
            assert!(matches!(outcomes[0], Err(VaultError::Reentrancy { .. })));
        } else {
            assert!(matches!(
                outcomes[0],
                Err(VaultError::InsufficientBalance { available: 0, .. })
            ));
        }
        assert_eq!(vault.balance_of(&mallory), 50);
        assert_eq!(token.inner.balance_of(&mallory), 0);
        vault.audit().unwrap();
    }
}

// ---------------------------------------------------------------------------
// Nested commit inside a failed transition
// ---------------------------------------------------------------------------

#[test]
fn nested_deposit_is_undone_when_outer_withdraw_fails() {
    let carol = Account::new("0xc");
    let attack = Attack::DepositThenRefuse {
        account: carol.clone(),
        amount: 25,
    };
    let (token, mut vault, bob) = deploy(attack, false, "0xb", 100);
    token.inner.mint(&carol, 25).unwrap();
    token
        .inner
        .approve(&carol, &Account::new(VAULT), 25)
        .unwrap();
    let before = vault.snapshot();
    let events_before: Vec<_> = vault.events().cloned().collect();

    let err = vault.withdraw(&bob, 10).unwrap_err();

    assert!(matches!(err, VaultError::TransferFailed { .. }));
    assert_eq!(token.nested_outcomes(), vec![Ok(())]);
    assert_eq!(vault.snapshot(), before);
    assert_eq!(vault.balance_of(&carol), 0);
    assert!(!vault.snapshot().balances.contains_key(&carol));
    assert_eq!(vault.events().cloned().collect::<Vec<_>>(), events_before);

    // The asset's own transfer from carol is not the vault's to undo:
    // her funds stay in the vault's holdings with no ledger credit.
    assert_eq!(token.inner.balance_of(&carol), 0);
    assert_eq!(vault.backing(), vault.total_deposits() + 25);
    assert_eq!(vault.shortfall(), 0);
}

#[test]
fn nested_commit_rollback_restores_evicted_events() {
    let carol = Account::new("0xc");
    let token = Arc::new(HostileToken::new(Attack::DepositThenRefuse {
        account: carol.clone(),
        amount: 5,
    }));
    let mut vault = MetaVault::with_config(
        Account::new(OWNER),
        Account::new(VAULT),
        AssetHandle::new(TOKEN),
        token.clone(),
        VaultConfig {
            reentrancy_guard: false,
            max_events: 1,
            ..VaultConfig::default()
        },
    )
    .unwrap();
    let bob = Account::new("0xb");
    for who in [&bob, &carol] {
        token.inner.mint(who, 50).unwrap();
        token.inner.approve(who, &Account::new(VAULT), 50).unwrap();
    }
    vault.deposit(&bob, 50).unwrap();
    let logged: Vec<_> = vault.events().cloned().collect();

    // The nested deposit evicts bob's event, then the outer withdraw fails.
    vault.withdraw(&bob, 10).unwrap_err();

    assert_eq!(vault.events().cloned().collect::<Vec<_>>(), logged);

    // Sequence numbers resume where the committed history left off.
    vault.deposit(&carol, 5).unwrap();
    assert_eq!(vault.events().last().map(|e| e.seq()), Some(1));
}

// ---------------------------------------------------------------------------
// Skim from inside a push
// ---------------------------------------------------------------------------

#[test]
fn nested_skim_by_non_owner_is_refused() {
    let (token, mut vault, mallory) = deploy(Attack::SkimOnPush, false, "0xm", 100);

    vault.withdraw(&mallory, 100).unwrap();

    assert_eq!(
        token.nested_outcomes(),
        vec![Err(VaultError::NotOwner {
            caller: mallory.clone()
        })]
    );
    assert_eq!(token.inner.balance_of(&mallory), 100);
    assert_eq!(vault.backing(), 1_000);
}

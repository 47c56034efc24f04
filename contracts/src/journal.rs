//! # Undo Journal
//!
//! Every write the vault makes during a transition is recorded here
//! together with the value it replaced. A failed transition unwinds the
//! journal back to the checkpoint it took on entry, which restores the
//! ledger bit-for-bit, including the effects of any nested re-entrant
//! transitions that committed inside it.
//!
//! The journal only lives as long as the outermost transition; once that
//! commits there is nothing left to undo and it is cleared.

use crate::events::VaultEvent;
use crate::types::{Account, Amount};

/// A position in the journal to unwind back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

/// A single undoable write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// `balances[account]` was overwritten. `previous == None` means the
    /// account had no entry, and undoing removes the key again.
    Balance {
        account: Account,
        previous: Option<Amount>,
    },
    /// `total_deposits` was overwritten.
    TotalDeposits { previous: Amount },
    /// An event was appended to the log and the sequence counter advanced
    /// from `previous_seq`.
    EventEmitted { previous_seq: u64 },
    /// The oldest logged event was evicted to stay within the log bound.
    EventEvicted(VaultEvent),
}

/// Append-only undo log, unwound in reverse order.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the current position.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.entries.len())
    }

    pub fn record(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    /// Pops every entry written after `checkpoint`, newest first. The
    /// caller applies each undo in the order returned.
    pub fn unwind(&mut self, checkpoint: Checkpoint) -> Vec<JournalEntry> {
        let at = checkpoint.0.min(self.entries.len());
        let mut undone = self.entries.split_off(at);
        undone.reverse();
        undone
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Module `version` implement the per-node version word, useful for
//! optimistic concurrency.
//!
//! A single `AtomicU64` carries, for one node:
//!
//! * insert lock, bit 0, held while mutating the node in place.
//! * structural-modification (SMO) lock, bit 1, held while the node
//!   takes part in a split or rebalance. Only ever held together with
//!   the insert lock.
//! * is-root flag, bit 2, and is-leaf flag, bit 3.
//! * insert version, bits [4, 24), bumped on every published insert.
//! * SMO version, bits [24, 44), bumped on every completed split or
//!   rebalance.
//! * lock version, bits [44, 64), seeded at construction.
//!
//! Readers copy the whole word into a [Snapshot], do their work, and
//! compare the snapshot against a fresh copy. Any mismatch, or a set
//! lock bit, means the node mutated underneath and the reader must
//! re-validate, chase a sibling or restart.
//!
//! Writers acquire the lock bits with fetch-or and never block
//! readers.

use std::{
    fmt, result,
    sync::atomic::{AtomicU64, Ordering::SeqCst},
    thread,
};

// TODO: Experiment with different atomic::Ordering to improve
// performance.

const INSERT_LOCK: u64 = 0b1;
const SMO_LOCK: u64 = 0b10;
const BOTH_LOCKS: u64 = 0b11;
const IS_ROOT: u64 = 0b100;
const IS_LEAF: u64 = 0b1000;
const INSERT_VERSION: u64 = 0xfffff0;
const SMO_VERSION: u64 = 0xfffff000000;
const LOCK_VERSION: u64 = 0xfffff00000000000;
const MAX_VERSION: u64 = 0xfffff;
const INSERT_INCREMENT: u64 = 0x10;
const SMO_INCREMENT: u64 = 0x1000000;

// Applied to bits [44, 64) of every fresh version word. The repair
// protocol keyed on this field is not wired up.
const LOCK_SEED: u64 = 100;

pub(crate) struct Version {
    v: AtomicU64,
}

impl Version {
    pub fn new() -> Version {
        Version {
            v: AtomicU64::new(LOCK_SEED << 44),
        }
    }

    pub fn new_with(word: u64) -> Version {
        Version {
            v: AtomicU64::new(word),
        }
    }

    /// Copy the whole word.
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.v.load(SeqCst))
    }

    /// Try to acquire the insert lock, return whether acquired.
    #[inline]
    pub fn try_insert_lock(&self) -> bool {
        (self.v.fetch_or(INSERT_LOCK, SeqCst) & INSERT_LOCK) == 0
    }

    #[inline]
    pub fn release_insert_lock(&self) {
        self.v.fetch_and(!INSERT_LOCK, SeqCst);
    }

    /// Try to acquire the SMO lock, return whether acquired. Caller
    /// must already hold the insert lock; on a fresh node this sets
    /// both lock bits in one go.
    #[inline]
    pub fn try_smo_lock(&self) -> bool {
        (self.v.fetch_or(BOTH_LOCKS, SeqCst) & SMO_LOCK) == 0
    }

    pub fn release_smo_lock(&self) {
        self.increment_smo();
        self.v.fetch_and(!SMO_LOCK, SeqCst);
    }

    pub fn release_both_locks(&self) {
        self.increment_insert();
        self.increment_smo();
        self.v.fetch_and(!BOTH_LOCKS, SeqCst);
    }

    pub fn mark_root(&self) {
        self.v.fetch_or(IS_ROOT, SeqCst);
    }

    pub fn unmark_root(&self) {
        self.v.fetch_and(!IS_ROOT, SeqCst);
    }

    pub fn mark_leaf(&self) {
        self.v.fetch_or(IS_LEAF, SeqCst);
    }

    pub fn unmark_leaf(&self) {
        self.v.fetch_and(!IS_LEAF, SeqCst);
    }

    /// Bump the insert version, wrapping with an explicit reset of
    /// only this field. Caller holds the insert lock.
    pub fn increment_insert(&self) {
        if self.snapshot().insert_version() == MAX_VERSION {
            self.v.fetch_and(!INSERT_VERSION, SeqCst);
        } else {
            self.v.fetch_add(INSERT_INCREMENT, SeqCst);
        }
    }

    /// Bump the SMO version, wrapping with an explicit reset of only
    /// this field. Caller holds the SMO lock.
    pub fn increment_smo(&self) {
        if self.snapshot().smo_version() == MAX_VERSION {
            self.v.fetch_and(!SMO_VERSION, SeqCst);
        } else {
            self.v.fetch_add(SMO_INCREMENT, SeqCst);
        }
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(f, "{:?}", self.snapshot())
    }
}

/// Whole-word copy of a [Version], compared with `!=` by optimistic
/// readers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct Snapshot(u64);

impl Snapshot {
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }

    #[inline]
    pub fn insert_lock(&self) -> bool {
        (self.0 & INSERT_LOCK) != 0
    }

    #[inline]
    pub fn smo_lock(&self) -> bool {
        (self.0 & SMO_LOCK) != 0
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        (self.0 & IS_ROOT) != 0
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        (self.0 & IS_LEAF) != 0
    }

    #[inline]
    pub fn insert_version(&self) -> u64 {
        (self.0 & INSERT_VERSION) >> 4
    }

    #[inline]
    pub fn smo_version(&self) -> u64 {
        (self.0 & SMO_VERSION) >> 24
    }

    #[allow(dead_code)]
    #[inline]
    pub fn lock_version(&self) -> u64 {
        (self.0 & LOCK_VERSION) >> 44
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> result::Result<(), fmt::Error> {
        write!(
            f,
            "Snapshot<ilock:{} slock:{} root:{} leaf:{} iver:{} sver:{}>",
            self.insert_lock(),
            self.smo_lock(),
            self.is_root(),
            self.is_leaf(),
            self.insert_version(),
            self.smo_version(),
        )
    }
}

/// Wait a beat while spinning on a node lock. If `spin` is false the
/// calling thread yields to the OS scheduler instead of burning the
/// core.
#[inline]
pub(crate) fn relax(spin: bool) {
    if spin {
        std::hint::spin_loop()
    } else {
        thread::yield_now()
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod version_test;

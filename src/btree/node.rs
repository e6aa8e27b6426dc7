//! Module `node` implement the tree node and its operations.
//!
//! Leaf and inner nodes share one layout: parent and sibling links,
//! the version word, the exclusive high key and inclusive low key,
//! the permutation word and a fixed array of entries. Inner nodes
//! additionally use `child0` for the left-most child that no
//! separator key covers; in leaves the same word is a spare slot,
//! which root growth exploits to hand the promoted copy back to the
//! insert path. The kind of a node is the is-leaf bit in its version
//! word, so re-parenting a child never branches on node kind.
//!
//! All fields are atomic words: writers mutate them under the node's
//! insert lock while optimistic readers load them freely and rely on
//! version validation to reject torn logical states.

use std::{
    array, ptr,
    sync::atomic::{AtomicPtr, AtomicU64, Ordering::SeqCst},
};

use crate::btree::{relax, Permuter, Version, WIDTH};

// Inner occupancy counts child0 on top of the entry slots.
const INNER_WIDTH: usize = WIDTH + 1;

/// One entry: a key and either a value handle (leaf) or a child
/// node (inner).
#[derive(Default)]
pub(crate) struct Slot {
    key: AtomicU64,
    link: AtomicPtr<()>,
}

impl Slot {
    fn new(key: u64, link: *mut ()) -> Slot {
        Slot {
            key: AtomicU64::new(key),
            link: AtomicPtr::new(link),
        }
    }

    #[inline]
    pub fn key(&self) -> u64 {
        self.key.load(SeqCst)
    }

    #[inline]
    pub fn link(&self) -> *mut () {
        self.link.load(SeqCst)
    }

    #[inline]
    pub fn set(&self, key: u64, link: *mut ()) {
        self.link.store(link, SeqCst);
        self.key.store(key, SeqCst);
    }

    #[inline]
    pub fn set_key(&self, key: u64) {
        self.key.store(key, SeqCst);
    }

    #[inline]
    pub fn copy_from(&self, other: &Slot) {
        self.set(other.key(), other.link());
    }
}

/// Result of a binary search over the permutation: `i` is the
/// logical position, `p` the physical slot, -1 when out of range.
#[derive(Clone, Copy, Debug)]
pub(crate) struct KeyPos {
    pub i: isize,
    pub p: isize,
}

#[repr(C)]
pub(crate) struct Node {
    pub(crate) parent: AtomicPtr<Node>,
    pub(crate) right: AtomicPtr<Node>,
    pub(crate) left: AtomicPtr<Node>,
    pub(crate) version: Version,
    highkey: AtomicU64,
    lowkey: AtomicU64,
    permutation: AtomicU64,
    pub(crate) child0: AtomicPtr<Node>,
    pub(crate) entry: [Slot; WIDTH],
}

/// Rewrite a child's parent back-pointer, uniformly for either node
/// kind.
pub(crate) unsafe fn set_parent(child: *mut Node, parent: *mut Node) {
    if !child.is_null() {
        (*child).parent.store(parent, SeqCst);
    }
}

// construction
impl Node {
    pub(crate) fn new(leaf: bool, parent: *mut Node, right: *mut Node, left: *mut Node) -> *mut Node {
        let node = Box::new(Node {
            parent: AtomicPtr::new(parent),
            right: AtomicPtr::new(right),
            left: AtomicPtr::new(left),
            version: Version::new(),
            highkey: AtomicU64::new(u64::MAX),
            lowkey: AtomicU64::new(0),
            permutation: AtomicU64::new(Permuter::make_empty().value()),
            child0: AtomicPtr::new(ptr::null_mut()),
            entry: array::from_fn(|_| Slot::default()),
        });
        if leaf {
            node.version.mark_leaf();
        }
        Box::into_raw(node)
    }

    /// Allocate a field-for-field copy, lock bits and all. Used by
    /// root growth to demote the current root's content one level.
    pub(crate) unsafe fn clone_raw(src: *mut Node) -> *mut Node {
        let s = &*src;
        let node = Box::new(Node {
            parent: AtomicPtr::new(s.parent.load(SeqCst)),
            right: AtomicPtr::new(s.right.load(SeqCst)),
            left: AtomicPtr::new(s.left.load(SeqCst)),
            version: Version::new_with(s.version.snapshot().value()),
            highkey: AtomicU64::new(s.highkey.load(SeqCst)),
            lowkey: AtomicU64::new(s.lowkey.load(SeqCst)),
            permutation: AtomicU64::new(s.permutation.load(SeqCst)),
            child0: AtomicPtr::new(s.child0.load(SeqCst)),
            entry: array::from_fn(|i| Slot::new(s.entry[i].key(), s.entry[i].link())),
        });
        Box::into_raw(node)
    }
}

// accessors
impl Node {
    #[inline]
    fn as_mut_ptr(&self) -> *mut Node {
        self as *const Node as *mut Node
    }

    #[inline]
    pub(crate) fn perm(&self) -> Permuter {
        Permuter::from(self.permutation.load(SeqCst))
    }

    #[inline]
    pub(crate) fn publish_perm(&self, p: Permuter) {
        self.permutation.store(p.value(), SeqCst);
    }

    #[inline]
    pub(crate) fn highkey(&self) -> u64 {
        self.highkey.load(SeqCst)
    }

    #[inline]
    pub(crate) fn set_highkey(&self, key: u64) {
        self.highkey.store(key, SeqCst);
    }

    #[inline]
    pub(crate) fn lowkey(&self) -> u64 {
        self.lowkey.load(SeqCst)
    }

    #[inline]
    pub(crate) fn set_lowkey(&self, key: u64) {
        self.lowkey.store(key, SeqCst);
    }

    #[inline]
    pub(crate) fn leaf_size(&self) -> usize {
        self.perm().size()
    }

    #[inline]
    pub(crate) fn inner_size(&self) -> usize {
        self.perm().size() + (!self.child0.load(SeqCst).is_null()) as usize
    }

    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.perm().size() == WIDTH
    }

    #[inline]
    pub(crate) fn is_empty_inner(&self) -> bool {
        self.child0.load(SeqCst).is_null()
    }
}

// search
impl Node {
    /// Logical position of the last key less-than-or-equal to `key`,
    /// `i == -1` when every live key is greater, or none exist.
    pub(crate) fn lower_bound(&self, key: u64) -> KeyPos {
        let perm = self.perm();
        let (mut l, mut r) = (0_isize, perm.size() as isize);
        while l < r {
            let m = (l + r) >> 1;
            let mp = perm.get(m as usize);
            let ekey = self.entry[mp].key();
            if key < ekey {
                r = m;
            } else if key == ekey {
                return KeyPos { i: m, p: mp as isize };
            } else {
                l = m + 1;
            }
        }
        match l - 1 {
            i if i < 0 => KeyPos { i: -1, p: -1 },
            i => KeyPos {
                i,
                p: perm.get(i as usize) as isize,
            },
        }
    }

    /// Logical position of the first key greater-than-or-equal to
    /// `key`, the insertion position. `i == WIDTH` on a full node
    /// with every key smaller.
    pub(crate) fn lower_bound_by(&self, key: u64) -> KeyPos {
        let perm = self.perm();
        let (mut l, mut r) = (0_isize, perm.size() as isize);
        while l < r {
            let m = (l + r) >> 1;
            let mp = perm.get(m as usize);
            let ekey = self.entry[mp].key();
            if key < ekey {
                r = m;
            } else if key == ekey {
                return KeyPos { i: m, p: mp as isize };
            } else {
                l = m + 1;
            }
        }
        if l < WIDTH as isize {
            KeyPos {
                i: l,
                p: perm.get(l as usize) as isize,
            }
        } else {
            KeyPos { i: l, p: -1 }
        }
    }

    /// Leaf lookup, the value handle on an exact match.
    pub(crate) fn get_leaf(&self, key: u64) -> Option<*mut ()> {
        let ip = self.lower_bound(key);
        if ip.i < 0 {
            return None;
        }
        if self.entry[ip.p as usize].key() == key {
            Some(self.entry[ip.p as usize].link())
        } else {
            None
        }
    }

    /// Inner lookup, the child covering `key`'s subtree.
    pub(crate) fn child_for(&self, key: u64) -> *mut Node {
        let ip = self.lower_bound(key);
        if ip.i < 0 {
            self.child0.load(SeqCst)
        } else {
            self.entry[ip.p as usize].link() as *mut Node
        }
    }

    /// Inner lookup by separator: the child whose range ends at
    /// exactly `key`, None when no separator holds it.
    pub(crate) fn child_exact(&self, key: u64) -> Option<*mut Node> {
        let perm = self.perm();
        let ip = self.lower_bound_by(key);
        if ip.i == perm.size() as isize {
            if perm.size() > 0 && key == self.highkey() {
                let s = perm.get(perm.size() - 1);
                return Some(self.entry[s].link() as *mut Node);
            }
            return None;
        }
        if self.entry[ip.p as usize].key() != key {
            return None;
        }
        if ip.i == 0 {
            Some(self.child0.load(SeqCst))
        } else {
            let s = perm.get((ip.i - 1) as usize);
            Some(self.entry[s].link() as *mut Node)
        }
    }
}

// point insertion, caller holds the insert lock
impl Node {
    pub(crate) fn insert_leaf(&self, key: u64, value: *mut ()) {
        let mut temp = self.perm();
        let ip = self.lower_bound_by(key);
        if ip.i == WIDTH as isize {
            return;
        }
        let pos = temp.insert_from_back(ip.i as usize);
        self.entry[pos].set(key, value);
        self.publish_perm(temp);
    }

    pub(crate) unsafe fn insert_inner(&self, key: u64, child: *mut Node) {
        let mut temp = self.perm();
        let ip = self.lower_bound_by(key);
        if ip.i == WIDTH as isize {
            return;
        }
        let pos = temp.insert_from_back(ip.i as usize);
        self.entry[pos].set(key, child as *mut ());
        self.publish_perm(temp);

        set_parent(child, self.as_mut_ptr());
    }
}

// split, caller holds insert and SMO locks on self
impl Node {
    /// Split a full leaf, moving the upper half of the logical order
    /// into a fresh right neighbour and inserting `(key, value)` into
    /// whichever side owns it. Insert locks of the pair are released;
    /// both SMO locks stay held until the separator lands in the
    /// parent. Returns the separator and the new node.
    pub(crate) unsafe fn split_leaf(&self, key: u64, value: *mut ()) -> (u64, *mut Node) {
        let size = self.leaf_size();
        let mid = (size + 1) / 2;
        let temp = self.perm();

        let nr = Node::new(
            true,
            self.parent.load(SeqCst),
            self.right.load(SeqCst),
            self.as_mut_ptr(),
        );

        let mut nper = temp;
        nper.rotate(0, mid);
        nper.set_size(size - mid);
        (*nr).publish_perm(nper);
        (*nr).set_highkey(self.highkey());
        (*nr).set_lowkey(self.entry[temp.get(mid)].key());
        for i in mid..size {
            let s = temp.get(i);
            (*nr).entry[s].copy_from(&self.entry[s]);
        }

        let _ = (*nr).version.try_smo_lock();

        self.right.store(nr, SeqCst);
        let median = self.entry[temp.get(mid)].key();
        self.set_highkey(median);
        let nr_right = (*nr).right.load(SeqCst);
        if !nr_right.is_null() {
            (*nr_right).left.store(nr, SeqCst);
        }
        let mut sp = self.perm();
        sp.set_size(mid);
        self.publish_perm(sp);

        if key < median {
            self.insert_leaf(key, value);
        } else {
            (*nr).insert_leaf(key, value);
        }

        self.version.increment_insert();
        (*nr).version.increment_insert();
        self.version.release_insert_lock();
        (*nr).version.release_insert_lock();

        (median, nr)
    }

    /// Split a full inner node. The entry just below the middle is
    /// promoted rather than copied: its child becomes the new node's
    /// `child0` and its key the separator handed upward. Children
    /// moving right are re-parented. `smo` carries the SMO-locked
    /// pair from the level below; it is released here and replaced
    /// with this pair.
    pub(crate) unsafe fn split_inner(
        &self,
        key: u64,
        child: *mut Node,
        smo: &mut (*mut Node, *mut Node),
    ) -> (u64, *mut Node) {
        let size = self.inner_size();
        let mid = (size + 1) / 2;
        let temp = self.perm();

        let nr = Node::new(
            false,
            self.parent.load(SeqCst),
            self.right.load(SeqCst),
            self.as_mut_ptr(),
        );

        let mut nper = temp;
        nper.rotate(0, mid);
        nper.set_size(temp.size() - mid);
        (*nr).publish_perm(nper);
        (*nr).set_highkey(self.highkey());
        (*nr).set_lowkey(self.entry[temp.get(mid - 1)].key());
        (*nr)
            .child0
            .store(self.entry[temp.get(mid - 1)].link() as *mut Node, SeqCst);
        for i in mid..temp.size() {
            let s = temp.get(i);
            (*nr).entry[s].copy_from(&self.entry[s]);
        }

        let _ = (*nr).version.try_smo_lock();

        self.right.store(nr, SeqCst);
        let median = self.entry[temp.get(mid - 1)].key();
        self.set_highkey(median);
        let nr_right = (*nr).right.load(SeqCst);
        if !nr_right.is_null() {
            (*nr_right).left.store(nr, SeqCst);
        }
        let mut sp = self.perm();
        sp.set_size(mid - 1);
        self.publish_perm(sp);

        for i in (mid - 1)..temp.size() {
            set_parent(self.entry[temp.get(i)].link() as *mut Node, nr);
        }

        if key < median {
            self.insert_inner(key, child);
        } else if key > median {
            (*nr).insert_inner(key, child);
        }

        let (a, b) = *smo;
        (*a).version.release_smo_lock();
        (*b).version.release_smo_lock();
        *smo = (self.as_mut_ptr(), nr);

        self.version.increment_insert();
        (*nr).version.increment_insert();
        self.version.release_insert_lock();
        (*nr).version.release_insert_lock();

        (median, nr)
    }
}

// rebalance, caller holds insert and SMO locks on self
//
// Lock order is strict: self, then sibling, then parent. Each
// acquisition re-reads its subject and re-verifies it afterwards; a
// lock is only trusted once its subject is re-observed identical.
// While spinning on a sibling the candidate is re-checked so a
// donor that stopped qualifying cannot wedge two writers against
// each other.
impl Node {
    /// Try to shed entries to a sibling instead of splitting.
    /// Prefers the left sibling. On success `(key, value)` has been
    /// inserted and every lock this node held is released.
    pub(crate) unsafe fn rebalance_leaf(&self, key: u64, value: *mut (), spin: bool) -> bool {
        if !cfg!(feature = "rebal") {
            return false;
        }
        if self.rebalance_leaf_left(key, value, spin) {
            return true;
        }
        self.rebalance_leaf_right(key, value, spin)
    }

    pub(crate) unsafe fn rebalance_inner(
        &self,
        key: u64,
        child: *mut Node,
        smo: &mut (*mut Node, *mut Node),
        spin: bool,
    ) -> bool {
        if !cfg!(feature = "rebal") {
            return false;
        }
        if self.rebalance_inner_left(key, child, smo, spin) {
            return true;
        }
        self.rebalance_inner_right(key, child, smo, spin)
    }

    // Acquire the insert lock on a sibling, bailing while spinning if
    // it stops being a viable donor.
    unsafe fn lock_sibling(&self, left_side: bool, spin: bool) -> Option<*mut Node> {
        loop {
            let cand = match left_side {
                true => self.left.load(SeqCst),
                false => self.right.load(SeqCst),
            };
            if cand.is_null() {
                return None;
            }
            while !(*cand).version.try_insert_lock() {
                let stale = (*cand).parent.load(SeqCst) != self.parent.load(SeqCst)
                    || (*cand).is_full()
                    || (*cand).version.snapshot().smo_lock();
                if stale {
                    return None;
                }
                relax(spin);
            }
            let cur = match left_side {
                true => self.left.load(SeqCst),
                false => self.right.load(SeqCst),
            };
            if cand == cur {
                return Some(cand);
            }
            (*cand).version.release_insert_lock();
        }
    }

    // Acquire the insert lock on the parent, chasing the pointer if a
    // concurrent parent split moved this node.
    unsafe fn lock_parent(&self, spin: bool) -> *mut Node {
        loop {
            let par = self.parent.load(SeqCst);
            while !(*par).version.try_insert_lock() {
                relax(spin);
            }
            if par == self.parent.load(SeqCst) {
                break par;
            }
            (*par).version.release_insert_lock();
        }
    }

    unsafe fn rebalance_leaf_left(&self, key: u64, value: *mut (), spin: bool) -> bool {
        let ip = self.lower_bound_by(key);

        let left = match self.lock_sibling(true, spin) {
            Some(left) => left,
            None => return false,
        };
        if (*left).parent.load(SeqCst) != self.parent.load(SeqCst) || (*left).is_full() {
            (*left).version.release_insert_lock();
            return false;
        }
        let par = self.lock_parent(spin);
        if (*left).parent.load(SeqCst) != par {
            (*left).version.release_insert_lock();
            (*par).version.release_insert_lock();
            return false;
        }

        let left_size = (*left).leaf_size();
        let mut to_mov = (WIDTH - left_size) / (1 + ((ip.i as usize) < WIDTH) as usize);
        if to_mov < 1 {
            to_mov = 1;
        }

        if left_size + to_mov <= WIDTH && to_mov <= ip.i as usize {
            while !(*left).version.try_smo_lock() {
                relax(spin);
            }

            let base = left_size;
            let mut temp = (*left).perm();
            let sperm = self.perm();
            for i in 0..to_mov {
                (*left).entry[temp.get(base + i)].copy_from(&self.entry[sperm.get(i)]);
            }
            temp.set_size(base + to_mov);
            (*left).publish_perm(temp);

            let p_upd = (*par).lower_bound_by((*left).highkey());

            if to_mov == ip.i as usize {
                // the new key becomes this node's smallest and the
                // separator itself
                (*par).entry[p_upd.p as usize].set_key(key);

                let mut t = self.perm();
                t.rotate(0, to_mov);
                t.set_size(t.size() - to_mov);
                self.publish_perm(t);

                let pos = t.insert_from_back(0);
                self.entry[pos].set(key, value);
                self.publish_perm(t);

                (*left).set_highkey(key);
                self.set_lowkey(key);
            } else {
                (*par).entry[p_upd.p as usize].set_key(self.entry[sperm.get(to_mov)].key());

                let mut t = self.perm();
                t.rotate(0, to_mov);
                t.set_size(t.size() - to_mov);
                self.publish_perm(t);

                let first = self.entry[t.get(0)].key();
                (*left).set_highkey(first);
                self.set_lowkey(first);
                self.insert_leaf(key, value);
            }

            (*left).version.release_both_locks();
            self.version.release_both_locks();
            (*par).version.increment_insert();
            (*par).version.release_insert_lock();
            return true;
        }
        (*left).version.release_insert_lock();
        (*par).version.release_insert_lock();
        false
    }

    unsafe fn rebalance_leaf_right(&self, key: u64, value: *mut (), spin: bool) -> bool {
        let ip = self.lower_bound_by(key);

        let right = match self.lock_sibling(false, spin) {
            Some(right) => right,
            None => return false,
        };
        if (*right).parent.load(SeqCst) != self.parent.load(SeqCst) || (*right).is_full() {
            (*right).version.release_insert_lock();
            return false;
        }
        let par = self.lock_parent(spin);
        if (*right).parent.load(SeqCst) != par {
            (*right).version.release_insert_lock();
            (*par).version.release_insert_lock();
            return false;
        }

        let right_size = (*right).leaf_size();
        let mut to_mov = (WIDTH - right_size) / (1 + (ip.i > 0) as usize);
        if to_mov < 1 {
            to_mov = 1;
        }

        if right_size + to_mov <= WIDTH && to_mov <= WIDTH - ip.i as usize {
            while !(*right).version.try_smo_lock() {
                relax(spin);
            }

            let base = right_size;
            let mut temp = (*right).perm();
            temp.rotate(0, WIDTH - to_mov);
            temp.set_size(base + to_mov);
            let sperm = self.perm();
            for i in 0..to_mov {
                (*right).entry[temp.get(i)].copy_from(&self.entry[sperm.get(WIDTH - to_mov + i)]);
            }
            (*right).publish_perm(temp);

            let p_upd = (*par).lower_bound_by(self.highkey());
            let newsep = (*right).entry[temp.get(0)].key();
            (*par).entry[p_upd.p as usize].set_key(newsep);

            let mut sp = self.perm();
            sp.set_size(WIDTH - to_mov);
            self.publish_perm(sp);

            self.set_highkey(newsep);
            (*right).set_lowkey(newsep);

            self.insert_leaf(key, value);

            (*right).version.release_both_locks();
            self.version.release_both_locks();
            (*par).version.increment_insert();
            (*par).version.release_insert_lock();
            return true;
        }
        (*right).version.release_insert_lock();
        (*par).version.release_insert_lock();
        false
    }

    unsafe fn rebalance_inner_left(
        &self,
        key: u64,
        child: *mut Node,
        smo: &mut (*mut Node, *mut Node),
        spin: bool,
    ) -> bool {
        let ip = self.lower_bound_by(key);

        let left = match self.lock_sibling(true, spin) {
            Some(left) => left,
            None => return false,
        };
        if (*left).parent.load(SeqCst) != self.parent.load(SeqCst) || (*left).is_full() {
            (*left).version.release_insert_lock();
            return false;
        }
        let par = self.lock_parent(spin);
        if (*left).parent.load(SeqCst) != par {
            (*left).version.release_insert_lock();
            (*par).version.release_insert_lock();
            return false;
        }

        let left_size = (*left).inner_size();
        let mut to_mov =
            (INNER_WIDTH - left_size) / (1 + ((ip.i as usize) < INNER_WIDTH - 1) as usize);
        if to_mov < 1 {
            to_mov = 1;
        }

        if left_size + to_mov <= INNER_WIDTH && to_mov <= (ip.i + 1) as usize {
            while !(*left).version.try_smo_lock() {
                relax(spin);
            }

            let mut temp = (*left).perm();
            let base = temp.size();
            let p_upd = (*par).lower_bound_by((*left).highkey());

            temp.set_size(base + to_mov);
            let sperm = self.perm();
            for i in 1..to_mov {
                (*left).entry[temp.get(base + i)].copy_from(&self.entry[sperm.get(i - 1)]);
            }
            // the separator comes down from the parent, attached to
            // this node's child0
            (*left).entry[temp.get(base)].set(
                (*par).entry[p_upd.p as usize].key(),
                self.child0.load(SeqCst) as *mut (),
            );
            (*left).publish_perm(temp);

            if (ip.i + 1) as usize == to_mov {
                // the incoming child becomes this node's child0 and
                // its separator the parent's
                (*par).entry[p_upd.p as usize].set_key(key);

                self.child0.store(child, SeqCst);
                set_parent(child, self.as_mut_ptr());

                let mut t = self.perm();
                t.set_size(t.size() - to_mov + 1);
                t.rotate(0, to_mov - 1);
                self.publish_perm(t);

                let (a, b) = *smo;
                (*a).version.release_smo_lock();
                (*b).version.release_smo_lock();

                let lperm = (*left).perm();
                for i in base..(base + to_mov) {
                    set_parent((*left).entry[lperm.get(i)].link() as *mut Node, left);
                }

                let sep = (*par).entry[p_upd.p as usize].key();
                (*left).set_highkey(sep);
                self.set_lowkey(sep);
            } else {
                (*par).entry[p_upd.p as usize].set_key(self.entry[sperm.get(to_mov - 1)].key());
                self.child0
                    .store(self.entry[sperm.get(to_mov - 1)].link() as *mut Node, SeqCst);

                let mut t = self.perm();
                t.set_size(t.size() - to_mov);
                t.rotate(0, to_mov);
                self.publish_perm(t);

                let lperm = (*left).perm();
                for i in base..(base + to_mov) {
                    set_parent((*left).entry[lperm.get(i)].link() as *mut Node, left);
                }

                let sep = (*par).entry[p_upd.p as usize].key();
                (*left).set_highkey(sep);
                self.set_lowkey(sep);
                self.insert_inner(key, child);

                let (a, b) = *smo;
                (*a).version.release_smo_lock();
                (*b).version.release_smo_lock();
            }

            (*left).version.release_both_locks();
            self.version.release_both_locks();
            (*par).version.increment_insert();
            (*par).version.release_insert_lock();
            return true;
        }
        (*left).version.release_insert_lock();
        (*par).version.release_insert_lock();
        false
    }

    unsafe fn rebalance_inner_right(
        &self,
        key: u64,
        child: *mut Node,
        smo: &mut (*mut Node, *mut Node),
        spin: bool,
    ) -> bool {
        let ip = self.lower_bound_by(key);

        let right = match self.lock_sibling(false, spin) {
            Some(right) => right,
            None => return false,
        };
        if (*right).parent.load(SeqCst) != self.parent.load(SeqCst) || (*right).is_full() {
            (*right).version.release_insert_lock();
            return false;
        }
        let par = self.lock_parent(spin);
        if (*right).parent.load(SeqCst) != par {
            (*right).version.release_insert_lock();
            (*par).version.release_insert_lock();
            return false;
        }

        let right_size = (*right).inner_size();
        let mut to_mov = (INNER_WIDTH - right_size) / 2;
        if to_mov < 1 {
            to_mov = 1;
        }

        if right_size + to_mov <= INNER_WIDTH && to_mov < INNER_WIDTH - ip.i as usize {
            while !(*right).version.try_smo_lock() {
                relax(spin);
            }

            let mut temp = (*right).perm();
            temp.rotate(0, WIDTH - to_mov);
            temp.set_size(temp.size() + to_mov);
            let sperm = self.perm();
            for i in 0..(to_mov - 1) {
                (*right).entry[temp.get(i)]
                    .copy_from(&self.entry[sperm.get(INNER_WIDTH - to_mov + i)]);
            }
            // this node's high key comes down as a separator,
            // attached to the right sibling's old child0
            (*right).entry[temp.get(to_mov - 1)]
                .set(self.highkey(), (*right).child0.load(SeqCst) as *mut ());
            (*right).publish_perm(temp);
            (*right)
                .child0
                .store(self.entry[sperm.get(WIDTH - to_mov)].link() as *mut Node, SeqCst);

            let p_upd = (*par).lower_bound_by(self.highkey());
            (*par).entry[p_upd.p as usize].set_key(self.entry[sperm.get(WIDTH - to_mov)].key());

            let mut sp = self.perm();
            sp.set_size(WIDTH - to_mov);
            self.publish_perm(sp);

            for i in (WIDTH - to_mov)..WIDTH {
                set_parent(self.entry[sperm.get(i)].link() as *mut Node, right);
            }

            let sep = (*par).entry[p_upd.p as usize].key();
            self.set_highkey(sep);
            (*right).set_lowkey(sep);
            self.insert_inner(key, child);

            let (a, b) = *smo;
            (*a).version.release_smo_lock();
            (*b).version.release_smo_lock();

            (*right).version.release_both_locks();
            self.version.release_both_locks();
            (*par).version.increment_insert();
            (*par).version.release_insert_lock();
            return true;
        }
        (*right).version.release_insert_lock();
        (*par).version.release_insert_lock();
        false
    }
}

// point deletion, caller has exclusive access to the tree
impl Node {
    /// Detach `key`'s value handle from this leaf. The caller owns
    /// the returned handle.
    pub(crate) fn take_leaf(&self, key: u64) -> Option<*mut ()> {
        let mut temp = self.perm();
        let ip = self.lower_bound(key);
        if ip.i < 0 {
            return None;
        }
        if self.entry[ip.p as usize].key() != key {
            return None;
        }
        temp.remove(ip.i as usize);
        self.publish_perm(temp);
        Some(self.entry[ip.p as usize].link())
    }

    /// Remove the child whose range ends at `key` from this inner
    /// node, returning the detached child for the caller to reclaim.
    pub(crate) fn remove_child(&self, key: u64) -> Option<*mut Node> {
        let mut temp = self.perm();
        let ip = self.lower_bound_by(key);
        if ip.i == temp.size() as isize {
            if self.highkey() != key {
                return None;
            }
        } else if self.entry[ip.p as usize].key() != key {
            return None;
        }
        if ip.i == 0 {
            let snap = self.child0.load(SeqCst);
            if temp.size() == 0 {
                self.child0.store(ptr::null_mut(), SeqCst);
                return Some(snap);
            }
            self.child0
                .store(self.entry[ip.p as usize].link() as *mut Node, SeqCst);
            temp.remove(0);
            self.publish_perm(temp);
            Some(snap)
        } else {
            let s = temp.get((ip.i - 1) as usize);
            let snap = self.entry[s].link() as *mut Node;
            temp.remove((ip.i - 1) as usize);
            self.publish_perm(temp);
            Some(snap)
        }
    }

    /// Splice this node out of its sibling list. The vacated key
    /// range is donated to a surviving neighbour so bound checks and
    /// parent routing keep agreeing: the right neighbour inherits the
    /// low bound when this node was its parent's left-most child,
    /// otherwise the left neighbour inherits the high bound.
    pub(crate) unsafe fn unlink(&self, leftmost_of_parent: bool) {
        let r = self.right.load(SeqCst);
        let l = self.left.load(SeqCst);
        if !r.is_null() {
            (*r).left.store(l, SeqCst);
        }
        if !l.is_null() {
            (*l).right.store(r, SeqCst);
        }
        if leftmost_of_parent {
            if !r.is_null() {
                (*r).set_lowkey(self.lowkey());
            }
        } else if !l.is_null() {
            (*l).set_highkey(self.highkey());
        } else if !r.is_null() {
            (*r).set_lowkey(self.lowkey());
        }
    }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;

//! Module `index` export [Index], an in-memory concurrent index
//! from `u64` keys to values.
//!
//! [Index] allow concurrent read and write access at API level.
//! Lookups never block: they snapshot per-node version words, chase
//! sibling links when a structural change slips in underneath, and
//! restart from the root when all else fails. Writers lock one leaf
//! for plain inserts; a full node takes the structural-modification
//! lock as well, sheds entries into a sibling when it can, otherwise
//! splits and climbs, handing one separator key up per level.
//!
//! **Possible ways to configure Index**:
//!
//! *spin*, relevant only in multi-threaded context. Constructing with
//! _spin_ as true will have writer threads spin while waiting to
//! acquire a node lock, constructing with false will have them yield
//! to the OS scheduler instead.
//!
//! Deletes require `&mut self` and hence an otherwise idle index,
//! refer to [Index::remove].

use log::{debug, info};

use std::{
    convert::TryFrom,
    marker, mem,
    ptr::{self, NonNull},
    sync::atomic::{AtomicU64, Ordering::SeqCst},
};

use crate::{
    btree::node::{set_parent, Node},
    btree::{relax, Depth, Snapshot, Stats, WIDTH},
    Error, Result,
};

pub const MAX_TREE_DEPTH: usize = 100;

/// Index type for concurrent reads and writes over `u64` keys.
///
/// Values are heap-allocated and never move once inserted, so
/// [Index::get] can hand out plain references. Nodes emptied by
/// [Index::remove] are reclaimed there; everything else lives until
/// the index is dropped.
pub struct Index<V> {
    name: String,
    spin: bool,

    root: NonNull<Node>,
    n_count: AtomicU64,
    n_nodes: AtomicU64,
    n_splits: AtomicU64,
    n_rebalances: AtomicU64,
    conflicts: AtomicU64,

    _values: marker::PhantomData<V>,
}

unsafe impl<V: Send> Send for Index<V> {}
unsafe impl<V: Send + Sync> Sync for Index<V> {}

impl<V> Drop for Index<V> {
    fn drop(&mut self) {
        unsafe { drop_tree::<V>(self.root.as_ptr()) }
    }
}

// by default dropping a node does not drop what it links to.
unsafe fn drop_tree<V>(node: *mut Node) {
    let n = &*node;
    let perm = n.perm();
    if n.version.snapshot().is_leaf() {
        for i in 0..perm.size() {
            drop(Box::from_raw(n.entry[perm.get(i)].link() as *mut V));
        }
    } else {
        let child0 = n.child0.load(SeqCst);
        if !child0.is_null() {
            drop_tree::<V>(child0);
        }
        for i in 0..perm.size() {
            drop_tree::<V>(n.entry[perm.get(i)].link() as *mut Node);
        }
    }
    drop(Box::from_raw(node));
}

/// Different ways to construct a new Index.
impl<V> Index<V> {
    /// Create an empty index, identified by `name`. The tree starts
    /// as a single empty leaf that is its own root.
    pub fn new(name: &str, spin: bool) -> Index<V> {
        let root = Node::new(true, ptr::null_mut(), ptr::null_mut(), ptr::null_mut());
        unsafe { (*root).version.mark_root() };

        Index {
            name: name.to_string(),
            spin,

            root: unsafe { NonNull::new_unchecked(root) },
            n_count: AtomicU64::new(0),
            n_nodes: AtomicU64::new(1),
            n_splits: AtomicU64::new(0),
            n_rebalances: AtomicU64::new(0),
            conflicts: AtomicU64::new(0),

            _values: marker::PhantomData,
        }
    }

    /// Applications can call this to log information about this
    /// instance.
    pub fn log(&self) {
        info!(
            target: "btree",
            "{:?}, new btree index, spin:{}", self.name, self.spin
        );
    }
}

impl<V> Index<V> {
    /// Return name of this index instance.
    #[inline]
    pub fn to_name(&self) -> String {
        self.name.clone()
    }

    /// Return whether writers spin or yield while waiting on a node
    /// lock.
    #[inline]
    pub fn is_spin(&self) -> bool {
        self.spin
    }

    /// Return number of entries in this instance.
    #[inline]
    pub fn len(&self) -> usize {
        self.n_count.load(SeqCst) as usize
    }

    /// Return whether index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the memory footprint of the node population.
    pub fn footprint(&self) -> Result<isize> {
        let n = self.n_nodes.load(SeqCst) as usize;
        err_at!(FailConvert, isize::try_from(n * mem::size_of::<Node>()))
    }

    /// Return statistics for this index. Depth figures come from
    /// [Index::validate].
    pub fn to_stats(&self) -> Result<Stats> {
        let mut stats = Stats::new(&self.name, self.spin);
        stats.node_size = mem::size_of::<Node>();
        stats.n_count = err_at!(FailConvert, usize::try_from(self.n_count.load(SeqCst)))?;
        stats.n_nodes = err_at!(FailConvert, usize::try_from(self.n_nodes.load(SeqCst)))?;
        stats.n_splits = err_at!(FailConvert, usize::try_from(self.n_splits.load(SeqCst)))?;
        stats.n_rebalances =
            err_at!(FailConvert, usize::try_from(self.n_rebalances.load(SeqCst)))?;
        stats.conflicts = err_at!(FailConvert, usize::try_from(self.conflicts.load(SeqCst)))?;
        Ok(stats)
    }
}

enum GetStep {
    FromRoot,
    FromInner,
    FromLeaf,
}

enum InsStep {
    FromRoot,
    Find,
    LeafInsert,
    InnerInsert,
}

// read and write operations.
impl<V> Index<V> {
    /// Get the value for `key`, None when absent. Never blocks.
    pub fn get(&self, key: u64) -> Option<&V> {
        use GetStep::*;

        unsafe {
            let mut node = self.root.as_ptr();
            let mut v1 = (*node).version.snapshot();
            let mut step = match v1.is_leaf() {
                true => FromLeaf,
                false => FromInner,
            };

            loop {
                match step {
                    FromRoot => {
                        node = self.root.as_ptr();
                        v1 = (*node).version.snapshot();
                        step = match v1.is_leaf() {
                            true => FromLeaf,
                            false => FromInner,
                        };
                    }
                    FromInner => {
                        let child = (*node).child_for(key);
                        let vcur = (*node).version.snapshot();
                        if v1 != vcur || vcur.insert_lock() {
                            if v1.is_root() {
                                step = FromRoot;
                                continue;
                            }
                            match recover(node, key, v1, (*node).version.snapshot(), false) {
                                Recover::Restart => step = FromRoot,
                                Recover::Hop(n, v) => {
                                    node = n;
                                    v1 = v;
                                }
                                Recover::Accept(v) => v1 = v,
                            }
                            continue;
                        }
                        if child.is_null() {
                            step = FromRoot;
                            continue;
                        }
                        v1 = (*child).version.snapshot();
                        node = child;
                        step = match v1.is_leaf() {
                            true => FromLeaf,
                            false => FromInner,
                        };
                    }
                    FromLeaf => {
                        let value = (*node).get_leaf(key);
                        let vcur = (*node).version.snapshot();
                        // an unchanged version word is not enough: the
                        // leaf must also still cover the key.
                        let covered = key >= (*node).lowkey() && key < (*node).highkey();
                        if v1 != vcur || vcur.insert_lock() || !covered {
                            if v1.is_root() && (v1 != vcur || vcur.insert_lock()) {
                                step = FromRoot;
                                continue;
                            }
                            match recover(node, key, v1, (*node).version.snapshot(), !covered) {
                                Recover::Restart => step = FromRoot,
                                Recover::Hop(n, v) => {
                                    node = n;
                                    v1 = v;
                                }
                                Recover::Accept(v) => v1 = v,
                            }
                            continue;
                        }
                        return value.map(|p| &*(p as *const V));
                    }
                }
            }
        }
    }

    /// Insert `key`, `value` into index. Returns None on success. If
    /// an entry with `key` already exists the index is left unchanged
    /// and `value` is handed back: first insert wins.
    pub fn insert(&self, key: u64, value: V) -> Option<V> {
        let vptr = Box::into_raw(Box::new(value)) as *mut ();
        unsafe {
            match self.do_insert(key, vptr) {
                true => {
                    self.n_count.fetch_add(1, SeqCst);
                    None
                }
                false => Some(*Box::from_raw(vptr as *mut V)),
            }
        }
    }

    unsafe fn do_insert(&self, key: u64, value: *mut ()) -> bool {
        use InsStep::*;

        let mut node = self.root.as_ptr();
        let mut v1 = (*node).version.snapshot();
        let mut step = match v1.is_leaf() {
            true => LeafInsert,
            false => Find,
        };

        // state for the climb after a split.
        let mut ikey: u64 = 0;
        let mut ichild: *mut Node = ptr::null_mut();
        let mut pchild: *mut Node = ptr::null_mut();
        let mut inner: *mut Node = ptr::null_mut();
        let mut smo: (*mut Node, *mut Node) = (ptr::null_mut(), ptr::null_mut());

        loop {
            match step {
                FromRoot => {
                    node = self.root.as_ptr();
                    v1 = (*node).version.snapshot();
                    step = match v1.is_leaf() {
                        true => LeafInsert,
                        false => Find,
                    };
                }
                Find => {
                    let child = (*node).child_for(key);
                    let vcur = (*node).version.snapshot();
                    if v1 != vcur || vcur.insert_lock() {
                        if v1.is_root() {
                            step = FromRoot;
                            continue;
                        }
                        match recover(node, key, v1, (*node).version.snapshot(), false) {
                            Recover::Restart => step = FromRoot,
                            Recover::Hop(n, v) => {
                                node = n;
                                v1 = v;
                            }
                            Recover::Accept(v) => v1 = v,
                        }
                        continue;
                    }
                    if child.is_null() {
                        step = FromRoot;
                        continue;
                    }
                    v1 = (*child).version.snapshot();
                    node = child;
                    step = match v1.is_leaf() {
                        true => LeafInsert,
                        false => Find,
                    };
                }
                LeafInsert => {
                    let leaf = node;
                    if (*leaf).get_leaf(key).is_some() {
                        return false;
                    }

                    while !(*leaf).version.try_insert_lock() {
                        if cfg!(feature = "debug") {
                            self.conflicts.fetch_add(1, SeqCst);
                        }
                        relax(self.spin);
                    }

                    // the root may have been replaced while we were
                    // arriving here.
                    if v1.is_root()
                        && v1.insert_version() != (*leaf).version.snapshot().insert_version()
                    {
                        (*leaf).version.release_insert_lock();
                        step = FromRoot;
                        continue;
                    }

                    // re-verify this leaf still covers the key, else
                    // hop siblings with the lock swapped over.
                    let r = (*leaf).right.load(SeqCst);
                    if !r.is_null() && key >= (*leaf).highkey() {
                        v1 = (*r).version.snapshot();
                        node = r;
                        (*leaf).version.release_insert_lock();
                        step = match key < (*r).highkey() {
                            true => LeafInsert,
                            false => FromRoot,
                        };
                        continue;
                    }
                    if let Some((l, vl)) = chase_left(leaf, key) {
                        let ip = (*l).lower_bound(key);
                        (*leaf).version.release_insert_lock();
                        if ip.i < 0 {
                            step = FromRoot;
                            continue;
                        }
                        v1 = vl;
                        node = l;
                        continue;
                    }

                    // first insert wins, re-checked now that the
                    // covering leaf is locked.
                    if (*leaf).get_leaf(key).is_some() {
                        (*leaf).version.release_insert_lock();
                        return false;
                    }

                    if (*leaf).is_full() {
                        if (*leaf).version.snapshot().is_root() {
                            let _ = (*leaf).version.try_smo_lock();
                            self.grow_root();
                            let promoted = (*leaf).child0.load(SeqCst);
                            (*leaf).version.release_both_locks();
                            node = promoted;
                            v1 = (*node).version.snapshot();
                            continue;
                        }
                        while !(*leaf).version.try_smo_lock() {
                            relax(self.spin);
                        }
                        if (*leaf).rebalance_leaf(key, value, self.spin) {
                            self.n_rebalances.fetch_add(1, SeqCst);
                            return true;
                        }
                        let (sep, nr) = (*leaf).split_leaf(key, value);
                        self.n_nodes.fetch_add(1, SeqCst);
                        self.n_splits.fetch_add(1, SeqCst);
                        smo = (leaf, nr);
                        ikey = sep;
                        ichild = nr;
                        pchild = leaf;
                        inner = (*leaf).parent.load(SeqCst);
                        step = InnerInsert;
                        continue;
                    }

                    (*leaf).insert_leaf(key, value);
                    (*leaf).version.increment_insert();
                    (*leaf).version.release_insert_lock();
                    return true;
                }
                InnerInsert => {
                    // the parent may have split while we climbed;
                    // chase the child's back-pointer until the lock
                    // sticks on the current one.
                    loop {
                        while !(*inner).version.try_insert_lock() {
                            if cfg!(feature = "debug") {
                                self.conflicts.fetch_add(1, SeqCst);
                            }
                            relax(self.spin);
                        }
                        let cur = (*pchild).parent.load(SeqCst);
                        if inner == cur {
                            break;
                        }
                        (*inner).version.release_insert_lock();
                        inner = cur;
                    }

                    if (*inner).is_full() {
                        if (*inner).version.snapshot().is_root() {
                            let _ = (*inner).version.try_smo_lock();
                            self.grow_root();
                            let promoted = (*inner).child0.load(SeqCst);
                            (*inner).version.release_both_locks();
                            inner = promoted;
                            continue;
                        }
                        while !(*inner).version.try_smo_lock() {
                            relax(self.spin);
                        }
                        if (*inner).rebalance_inner(ikey, ichild, &mut smo, self.spin) {
                            self.n_rebalances.fetch_add(1, SeqCst);
                            return true;
                        }
                        let (sep, nr) = (*inner).split_inner(ikey, ichild, &mut smo);
                        self.n_nodes.fetch_add(1, SeqCst);
                        self.n_splits.fetch_add(1, SeqCst);
                        ikey = sep;
                        ichild = nr;
                        pchild = inner;
                        inner = (*inner).parent.load(SeqCst);
                        continue;
                    }

                    (*inner).insert_inner(ikey, ichild);
                    let (a, b) = smo;
                    (*a).version.release_smo_lock();
                    (*b).version.release_smo_lock();
                    (*inner).version.increment_insert();
                    (*inner).version.release_insert_lock();
                    return true;
                }
            }
        }
    }

    // Grow the tree by one level. Caller holds both locks on the
    // current root, which is full. The root node stays where it is:
    // its content moves into a fresh child and the root itself turns
    // into (or stays) an inner node over that child.
    unsafe fn grow_root(&self) {
        let root = self.root.as_ptr();
        debug!(target: "btree", "{:?}, growing root", self.name);

        let child = Node::clone_raw(root);
        self.n_nodes.fetch_add(1, SeqCst);
        (*child).version.unmark_root();
        (*child).parent.store(root, SeqCst);

        if (*root).version.snapshot().is_leaf() {
            (*root).child0.store(child, SeqCst);
            (*root).version.unmark_leaf();
            let mut p = (*root).perm();
            p.set_size(0);
            (*root).publish_perm(p);
            (*child).version.release_both_locks();
        } else {
            let old_child0 = (*child).child0.load(SeqCst);
            (*root).child0.store(child, SeqCst);
            let mut p = (*root).perm();
            p.set_size(0);
            (*root).publish_perm(p);

            set_parent(old_child0, child);
            for i in 0..WIDTH {
                set_parent((*root).entry[i].link() as *mut Node, child);
            }
            (*child).version.release_both_locks();
        }
    }

    /// Remove `key` and its value from the index. Emptied nodes are
    /// spliced out and reclaimed; an emptied root collapses the tree
    /// back to a single empty leaf.
    ///
    /// Requires `&mut self`: there is no concurrent delete protocol,
    /// and the exclusive borrow is what guarantees no reader or
    /// writer is in flight.
    pub fn remove(&mut self, key: u64) {
        unsafe {
            let mut node = self.root.as_ptr();
            while !(*node).version.snapshot().is_leaf() {
                let child = (*node).child_for(key);
                if child.is_null() {
                    return;
                }
                node = child;
            }

            let leaf = node;
            let vptr = match (*leaf).take_leaf(key) {
                Some(vptr) => vptr,
                None => return,
            };
            drop(Box::from_raw(vptr as *mut V));
            self.n_count.fetch_sub(1, SeqCst);

            if (*leaf).leaf_size() != 0 {
                return;
            }
            let mut parent = (*leaf).parent.load(SeqCst);
            if parent.is_null() {
                // an empty leaf-root stays.
                return;
            }

            (*leaf).unlink((*parent).child0.load(SeqCst) == leaf);
            let mut k = (*leaf).highkey();

            loop {
                let inner = parent;
                match (*inner).remove_child(k) {
                    Some(dead) => {
                        drop(Box::from_raw(dead));
                        self.n_nodes.fetch_sub(1, SeqCst);
                    }
                    None => return,
                }
                if !(*inner).is_empty_inner() {
                    return;
                }

                parent = (*inner).parent.load(SeqCst);
                if parent.is_null() {
                    // the last entry of the tree went away; start
                    // over with a fresh leaf-root.
                    let old = self.root.as_ptr();
                    let root = Node::new(true, ptr::null_mut(), ptr::null_mut(), ptr::null_mut());
                    (*root).version.mark_root();
                    self.root = NonNull::new_unchecked(root);
                    self.n_nodes.store(1, SeqCst);
                    drop(Box::from_raw(old));
                    return;
                }
                (*inner).unlink((*parent).child0.load(SeqCst) == inner);
                k = (*inner).highkey();
            }
        }
    }
}

// validation.
impl<V> Index<V> {
    /// Walk the tree checking every structural invariant: permutation
    /// integrity, key bounds and ordering, parent/child and sibling
    /// coupling, root and leaf marks, and the ascending leaf chain.
    /// Returns statistics with leaf-depth figures filled in.
    ///
    /// Assumes a quiescent tree; run with no concurrent writers.
    pub fn validate(&self) -> Result<Stats> {
        let mut depths = Depth::default();
        let mut n_keys = 0;

        let root = self.root.as_ptr();
        unsafe {
            if !(*root).version.snapshot().is_root() {
                return err_at!(Fatal, msg: "root mark missing on root node");
            }
            let n_nodes = validate_node(root, true, 0, &mut depths, &mut n_keys)?;
            let count = self.n_nodes.load(SeqCst) as usize;
            if n_nodes != count {
                return err_at!(Fatal, msg: "node count {} != {}", n_nodes, count);
            }
            self.validate_leaf_chain(n_keys)?;
        }

        let mut stats = self.to_stats()?;
        stats.depths = Some(depths);
        Ok(stats)
    }

    // walk the bottom chain left to right, all live keys must come up
    // strictly ascending and account for every counted entry.
    unsafe fn validate_leaf_chain(&self, n_keys: usize) -> Result<()> {
        let mut node = self.root.as_ptr();
        while !(*node).version.snapshot().is_leaf() {
            node = (*node).child0.load(SeqCst);
            if node.is_null() {
                return err_at!(Fatal, msg: "missing child0 on the leftmost spine");
            }
        }

        let (mut count, mut prev) = (0, None);
        loop {
            let perm = (*node).perm();
            for i in 0..perm.size() {
                let key = (*node).entry[perm.get(i)].key();
                if let Some(prev) = prev {
                    if prev >= key {
                        return err_at!(Fatal, msg: "leaf chain out of order {} >= {}", prev, key);
                    }
                }
                prev = Some(key);
                count += 1;
            }
            let right = (*node).right.load(SeqCst);
            if right.is_null() {
                break;
            }
            if (*right).left.load(SeqCst) != node {
                return err_at!(Fatal, msg: "broken sibling back-link in leaf chain");
            }
            if (*right).lowkey() != (*node).highkey() {
                let (l, h) = ((*right).lowkey(), (*node).highkey());
                return err_at!(Fatal, msg: "sibling bounds differ {} != {}", l, h);
            }
            node = right;
        }

        if count != n_keys {
            return err_at!(Fatal, msg: "leaf chain count {} != {}", count, n_keys);
        }
        Ok(())
    }
}

unsafe fn validate_node(
    node: *mut Node,
    is_root: bool,
    depth: usize,
    depths: &mut Depth,
    n_keys: &mut usize,
) -> Result<usize> {
    if depth > MAX_TREE_DEPTH {
        return err_at!(Fatal, msg: "tree exceeds max depth {}", depth);
    }

    let n = &*node;
    let v = n.version.snapshot();
    if v.is_root() != is_root {
        return err_at!(Fatal, msg: "stray root mark at depth {}", depth);
    }
    if v.insert_lock() || v.smo_lock() {
        return err_at!(Fatal, msg: "lock held on a quiescent node");
    }

    let perm = n.perm();
    let mut seen = [false; WIDTH];
    for i in 0..WIDTH {
        let slot = perm.get(i);
        if slot >= WIDTH || seen[slot] {
            return err_at!(Fatal, msg: "permutation is not a permutation: {:?}", perm);
        }
        seen[slot] = true;
    }

    let (low, high) = (n.lowkey(), n.highkey());
    if low >= high {
        return err_at!(Fatal, msg: "bad bounds {} >= {}", low, high);
    }
    let mut prev: Option<u64> = None;
    for i in 0..perm.size() {
        let key = n.entry[perm.get(i)].key();
        if key < low || key >= high {
            return err_at!(Fatal, msg: "key {} outside bounds [{}, {})", key, low, high);
        }
        if let Some(prev) = prev {
            if prev >= key {
                return err_at!(Fatal, msg: "node out of order {} >= {}", prev, key);
            }
        }
        prev = Some(key);
    }

    if v.is_leaf() {
        depths.sample(depth);
        *n_keys += perm.size();
        return Ok(1);
    }

    let child0 = n.child0.load(SeqCst);
    if child0.is_null() {
        return err_at!(Fatal, msg: "inner node without child0");
    }

    let mut n_nodes = 1;
    let mut prev_child = child0;
    for i in 0..=perm.size() {
        let (child, child_low) = match i {
            0 => (child0, low),
            i => {
                let slot = &n.entry[perm.get(i - 1)];
                (slot.link() as *mut Node, slot.key())
            }
        };
        if child.is_null() {
            return err_at!(Fatal, msg: "null child at position {}", i);
        }
        if (*child).parent.load(SeqCst) != node {
            return err_at!(Fatal, msg: "child at position {} has a stray parent", i);
        }
        if (*child).lowkey() != child_low {
            let l = (*child).lowkey();
            return err_at!(Fatal, msg: "child low bound {} != separator {}", l, child_low);
        }
        let child_high = match i == perm.size() {
            true => high,
            false => n.entry[perm.get(i)].key(),
        };
        if (*child).highkey() != child_high {
            let h = (*child).highkey();
            return err_at!(Fatal, msg: "child high bound {} != separator {}", h, child_high);
        }
        match n.child_exact((*child).highkey()) {
            Some(found) if found == child => (),
            _ => return err_at!(Fatal, msg: "separator lookup misses child at position {}", i),
        }
        if i > 0 {
            let coupled = (*prev_child).right.load(SeqCst) == child
                && (*child).left.load(SeqCst) == prev_child;
            if !coupled {
                return err_at!(Fatal, msg: "siblings not coupled at position {}", i);
            }
        }
        prev_child = child;

        n_nodes += validate_node(child, false, depth + 1, depths, n_keys)?;
    }

    Ok(n_nodes)
}

enum Recover {
    Restart,
    Hop(*mut Node, Snapshot),
    Accept(Snapshot),
}

// A validation mismatch on `node`. Decide between chasing a sibling,
// restarting from the root, or accepting the new version and retrying
// the same node (an in-place insert moved nothing).
unsafe fn recover(
    node: *mut Node,
    key: u64,
    v1: Snapshot,
    v2: Snapshot,
    force_chase: bool,
) -> Recover {
    if force_chase || v2.smo_version() != v1.smo_version() || v2.smo_lock() {
        if let Some((right, vr)) = chase_right(node, key) {
            return match key < (*right).highkey() {
                true => Recover::Hop(right, vr),
                false => Recover::Restart,
            };
        }
        if let Some((left, vl)) = chase_left(node, key) {
            return match (*left).lower_bound(key).i < 0 {
                true => Recover::Restart,
                false => Recover::Hop(left, vl),
            };
        }
    }
    Recover::Accept(v2)
}

// Stable read of the right sibling: pointer, snapshot and bound check
// must all come from one consistent observation.
unsafe fn chase_right(node: *mut Node, key: u64) -> Option<(*mut Node, Snapshot)> {
    loop {
        let right = (*node).right.load(SeqCst);
        if right.is_null() {
            return None;
        }
        let vr = (*right).version.snapshot();
        let comp = key >= (*node).highkey();
        if right == (*node).right.load(SeqCst) {
            return match comp {
                true => Some((right, vr)),
                false => None,
            };
        }
    }
}

unsafe fn chase_left(node: *mut Node, key: u64) -> Option<(*mut Node, Snapshot)> {
    loop {
        let left = (*node).left.load(SeqCst);
        if left.is_null() {
            return None;
        }
        let vl = (*left).version.snapshot();
        let comp = key < (*left).highkey();
        if left == (*node).left.load(SeqCst) {
            return match comp {
                true => Some((left, vl)),
                false => None,
            };
        }
    }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;

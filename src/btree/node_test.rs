use std::ptr;
use std::sync::atomic::Ordering::SeqCst;

use super::*;

fn leaf_with(keys: &[u64]) -> *mut Node {
    let node = Node::new(true, ptr::null_mut(), ptr::null_mut(), ptr::null_mut());
    for &key in keys {
        unsafe { (*node).insert_leaf(key, Box::into_raw(Box::new(key)) as *mut ()) };
    }
    node
}

unsafe fn free_leaf(node: *mut Node) {
    let perm = (*node).perm();
    for i in 0..perm.size() {
        drop(Box::from_raw((*node).entry[perm.get(i)].link() as *mut u64));
    }
    drop(Box::from_raw(node));
}

#[test]
fn test_leaf_search() {
    let node = leaf_with(&[10, 20, 30, 40]);
    unsafe {
        let n = &*node;
        assert_eq!(n.leaf_size(), 4);
        assert!(!n.is_full());

        assert_eq!(n.lower_bound(20).i, 1);
        assert_eq!(n.lower_bound(25).i, 1);
        assert_eq!(n.lower_bound(5).i, -1);
        assert_eq!(n.lower_bound(45).i, 3);
        assert_eq!(n.lower_bound_by(25).i, 2);
        assert_eq!(n.lower_bound_by(10).i, 0);
        assert_eq!(n.lower_bound_by(45).i, 4);

        assert_eq!(*(n.get_leaf(30).unwrap() as *mut u64), 30);
        assert!(n.get_leaf(25).is_none());
        assert!(n.get_leaf(5).is_none());
        assert!(n.get_leaf(45).is_none());

        free_leaf(node);
    }
}

#[test]
fn test_leaf_insert_order() {
    let node = leaf_with(&[50, 10, 40, 20, 30]);
    unsafe {
        let n = &*node;
        let perm = n.perm();
        assert_eq!(perm.size(), 5);
        let keys: Vec<u64> = (0..perm.size()).map(|i| n.entry[perm.get(i)].key()).collect();
        assert_eq!(keys, vec![10, 20, 30, 40, 50]);
        free_leaf(node);
    }
}

#[test]
fn test_leaf_split() {
    let keys: Vec<u64> = (1..=15).map(|i| i * 10).collect();
    let node = leaf_with(&keys);
    unsafe {
        assert!((*node).is_full());
        assert!((*node).version.try_insert_lock());
        assert!((*node).version.try_smo_lock());

        let value = Box::into_raw(Box::new(155_u64)) as *mut ();
        let (sep, nr) = (*node).split_leaf(155, value);

        assert_eq!(sep, 90);
        assert_eq!((*node).leaf_size(), 8);
        assert_eq!((*nr).leaf_size(), 8);
        assert_eq!((*node).highkey(), 90);
        assert_eq!((*nr).lowkey(), 90);
        assert_eq!((*nr).highkey(), u64::MAX);
        assert_eq!((*node).right.load(SeqCst), nr);
        assert_eq!((*nr).left.load(SeqCst), node);
        assert!((*nr).version.snapshot().is_leaf());

        // insert locks are out, SMO locks stay with the pair
        let (s1, s2) = ((*node).version.snapshot(), (*nr).version.snapshot());
        assert!(!s1.insert_lock() && s1.smo_lock());
        assert!(!s2.insert_lock() && s2.smo_lock());

        // the new key landed right of the separator
        assert!((*node).get_leaf(155).is_none());
        assert_eq!(*((*nr).get_leaf(155).unwrap() as *mut u64), 155);
        for key in keys {
            let side = if key < 90 { node } else { nr };
            assert_eq!(*((*side).get_leaf(key).unwrap() as *mut u64), key);
        }

        (*node).version.release_smo_lock();
        (*nr).version.release_smo_lock();
        free_leaf(nr);
        free_leaf(node);
    }
}

unsafe fn inner_over(leaves: &[*mut Node], seps: &[u64]) -> *mut Node {
    let inner = Node::new(false, ptr::null_mut(), ptr::null_mut(), ptr::null_mut());
    (*inner).child0.store(leaves[0], SeqCst);
    set_parent(leaves[0], inner);
    for (i, &sep) in seps.iter().enumerate() {
        (*inner).insert_inner(sep, leaves[i + 1]);
    }
    inner
}

#[test]
fn test_inner_routing() {
    let l1 = leaf_with(&[10, 20]);
    let l2 = leaf_with(&[30, 40]);
    let l3 = leaf_with(&[50, 60]);
    unsafe {
        (*l1).set_highkey(30);
        (*l2).set_lowkey(30);
        (*l2).set_highkey(50);
        (*l3).set_lowkey(50);
        (*l1).right.store(l2, SeqCst);
        (*l2).left.store(l1, SeqCst);
        (*l2).right.store(l3, SeqCst);
        (*l3).left.store(l2, SeqCst);

        let inner = inner_over(&[l1, l2, l3], &[30, 50]);
        assert_eq!((*inner).inner_size(), 3);

        assert_eq!((*inner).child_for(5), l1);
        assert_eq!((*inner).child_for(29), l1);
        assert_eq!((*inner).child_for(30), l2);
        assert_eq!((*inner).child_for(49), l2);
        assert_eq!((*inner).child_for(50), l3);
        assert_eq!((*inner).child_for(u64::MAX), l3);

        assert_eq!((*inner).child_exact(30), Some(l1));
        assert_eq!((*inner).child_exact(50), Some(l2));
        assert_eq!((*inner).child_exact(u64::MAX), Some(l3));
        assert_eq!((*inner).child_exact(40), None);

        // inserting re-parented the children
        assert_eq!((*l1).parent.load(SeqCst), inner);
        assert_eq!((*l2).parent.load(SeqCst), inner);
        assert_eq!((*l3).parent.load(SeqCst), inner);

        free_leaf(l1);
        free_leaf(l2);
        free_leaf(l3);
        drop(Box::from_raw(inner));
    }
}

#[test]
fn test_take_leaf() {
    let node = leaf_with(&[10, 20, 30]);
    unsafe {
        let vptr = (*node).take_leaf(20).unwrap();
        assert_eq!(*(vptr as *mut u64), 20);
        drop(Box::from_raw(vptr as *mut u64));

        assert_eq!((*node).leaf_size(), 2);
        assert!((*node).get_leaf(20).is_none());
        assert!((*node).take_leaf(20).is_none());
        assert!((*node).take_leaf(25).is_none());

        let perm = (*node).perm();
        let keys: Vec<u64> = (0..perm.size())
            .map(|i| (*node).entry[perm.get(i)].key())
            .collect();
        assert_eq!(keys, vec![10, 30]);

        free_leaf(node);
    }
}

#[test]
fn test_remove_child() {
    let l1 = leaf_with(&[10]);
    let l2 = leaf_with(&[30]);
    let l3 = leaf_with(&[50]);
    unsafe {
        (*l1).set_highkey(30);
        (*l2).set_lowkey(30);
        (*l2).set_highkey(50);
        (*l3).set_lowkey(50);
        (*l1).right.store(l2, SeqCst);
        (*l2).left.store(l1, SeqCst);
        (*l2).right.store(l3, SeqCst);
        (*l3).left.store(l2, SeqCst);
        let inner = inner_over(&[l1, l2, l3], &[30, 50]);

        // middle child, keyed by its high bound
        (*l2).unlink((*inner).child0.load(SeqCst) == l2);
        assert_eq!((*inner).remove_child(50), Some(l2));
        assert_eq!((*inner).inner_size(), 2);
        assert_eq!((*l1).right.load(SeqCst), l3);
        assert_eq!((*l3).left.load(SeqCst), l1);
        assert_eq!((*l1).highkey(), 50); // donated

        // left-most child
        (*l1).unlink((*inner).child0.load(SeqCst) == l1);
        assert_eq!((*inner).remove_child((*l1).highkey()), Some(l1));
        assert_eq!((*inner).inner_size(), 1);
        assert_eq!((*inner).child0.load(SeqCst), l3);
        assert_eq!((*l3).lowkey(), 0); // donated

        // no separator holds 40
        assert_eq!((*inner).remove_child(40), None);

        // the last child goes through the high bound
        (*l3).unlink((*inner).child0.load(SeqCst) == l3);
        assert_eq!((*inner).remove_child((*l3).highkey()), Some(l3));
        assert!((*inner).is_empty_inner());

        free_leaf(l1);
        free_leaf(l2);
        free_leaf(l3);
        drop(Box::from_raw(inner));
    }
}

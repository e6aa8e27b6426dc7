use rand::{prelude::random, rngs::SmallRng, Rng, SeedableRng};

use super::*;

#[test]
fn test_permuter_empty() {
    let mut p = Permuter::make_empty();
    assert_eq!(p.size(), 0);

    // slots shall be allocated in the order 0, 1, ..
    for want in 0..WIDTH {
        assert_eq!(p.back(), want);
        let got = p.insert_from_back(0);
        assert_eq!(got, want);
        assert_eq!(p.size(), want + 1);
    }
    // each went in at logical position 0
    for i in 0..WIDTH {
        assert_eq!(p.get(i), WIDTH - 1 - i);
    }
}

#[test]
fn test_permuter_sorted() {
    for n in 0..=WIDTH {
        let mut p = Permuter::make_sorted(n);
        assert_eq!(p.size(), n, "make_sorted({})", n);
        for i in 0..n {
            assert_eq!(p.get(i), i, "make_sorted({}) position {}", n, i);
        }
        // remaining slots stay free, starting with n
        if n < WIDTH {
            assert_eq!(p.back(), n);
            let got = p.insert_from_back(n);
            assert_eq!(got, n);
            assert_eq!(p.size(), n + 1);
        }
    }
}

#[test]
fn test_permuter_set_size() {
    let mut p = Permuter::make_sorted(10);
    p.set_size(4);
    assert_eq!(p.size(), 4);
    for i in 0..WIDTH {
        assert_eq!(p.get(i), i); // slots untouched
    }
    p.set_size(15);
    assert_eq!(p.size(), 15);
}

#[test]
fn test_permuter_rotate() {
    let seed: u64 = random();
    println!("test_permuter_rotate seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    for _testcase in 0..10_000 {
        let n = rng.gen::<usize>() % (WIDTH + 1);
        let mut p = Permuter::make_sorted(n);
        let mut model: Vec<usize> = (0..WIDTH).collect();

        let i = rng.gen::<usize>() % (WIDTH + 1);
        let j = i + rng.gen::<usize>() % (WIDTH - i + 1);
        p.rotate(i, j);
        model[i..].rotate_left(j - i);

        assert_eq!(p.size(), n, "rotate({},{})", i, j);
        for k in 0..WIDTH {
            assert_eq!(p.get(k), model[k], "rotate({},{}) position {}", i, j, k);
        }
    }
}

// Drive random op sequences against a vector model of the logical
// order, with the free slots in the suffix.
#[test]
fn test_permuter_model() {
    let seed: u64 = random();
    // let seed: u64 = 8509396925563776793;
    println!("test_permuter_model seed:{}", seed);
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut p = Permuter::make_empty();
    let mut model: Vec<usize> = (0..WIDTH).rev().collect();
    let mut size = 0;

    for _op in 0..100_000 {
        match rng.gen::<u8>() % 4 {
            0 if size < WIDTH => {
                let i = rng.gen::<usize>() % (size + 1);
                let want = model[WIDTH - 1];
                assert_eq!(p.insert_from_back(i), want);
                let free = model.pop().unwrap();
                model.insert(i, free);
                size += 1;
            }
            1 if size > 0 => {
                let i = rng.gen::<usize>() % size;
                p.remove(i);
                let live = model.remove(i);
                model.insert(size - 1, live);
                size -= 1;
            }
            2 if size > 0 => {
                let i = rng.gen::<usize>() % size;
                p.remove_to_back(i);
                let live = model.remove(i);
                model.push(live);
                size -= 1;
            }
            3 if size >= 2 => {
                let i = rng.gen::<usize>() % size;
                let j = rng.gen::<usize>() % size;
                p.exchange(i, j);
                model.swap(i, j);
            }
            _ => continue,
        }

        assert_eq!(p.size(), size);
        for k in 0..WIDTH {
            assert_eq!(p.get(k), model[k], "position {}", k);
        }
        // the nibbles stay a permutation of 0..WIDTH
        let mut seen = [false; WIDTH];
        for k in 0..WIDTH {
            assert!(!seen[p.get(k)], "slot {} repeated", p.get(k));
            seen[p.get(k)] = true;
        }
    }
}

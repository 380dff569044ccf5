//! End-to-end behavior of a seeded pool through the public API.

use poolalloc::{Pool, UNIT_SIZE};

/// Backing storage for a pool of exactly `units` units. `u128` carries the
/// strictest primitive alignment, so the buffer start needs no alignment
/// slack and the seeded region comes out to exactly `units` whole units.
struct Region {
    buf: Vec<u128>,
    units: usize,
}

impl Region {
    fn new(units: usize) -> Self {
        let words = (units * UNIT_SIZE).div_ceil(std::mem::size_of::<u128>());
        Region {
            buf: vec![0; words],
            units,
        }
    }

    fn base(&mut self) -> *mut u8 {
        self.buf.as_mut_ptr().cast()
    }

    fn seed(&mut self, pool: &Pool) {
        unsafe { pool.add(self.base(), self.units * UNIT_SIZE) };
    }
}

fn free_blocks(pool: &Pool) -> Vec<usize> {
    let mut blocks = Vec::new();
    pool.for_blocks(|bytes| blocks.push(bytes));
    blocks
}

/// Total free units, headers included.
fn free_units(pool: &Pool) -> usize {
    let mut units = 0;
    pool.for_blocks(|bytes| units += bytes / UNIT_SIZE + 1);
    units
}

/// Every one-byte allocation costs two units: one payload unit plus the
/// header. An 18-unit pool therefore serves exactly nine of them, the last
/// one draining the free list completely, and freeing them all merges the
/// region back into one span.
#[test]
fn seed_exhaust_refill() {
    let mut region = Region::new(18);
    let pool = Pool::new();
    region.seed(&pool);

    let mut live = Vec::new();
    loop {
        let p = unsafe { pool.alloc(1) };
        if p.is_null() {
            break;
        }
        live.push(p);
    }

    assert_eq!(live.len(), 9);
    assert!(free_blocks(&pool).is_empty());

    for p in live.iter().rev() {
        unsafe { pool.free(*p) };
    }
    assert_eq!(free_blocks(&pool), [17 * UNIT_SIZE]);
}

/// Freeing the middle block last touches free neighbours on both sides, so
/// its release has to merge in both directions at once.
#[test]
fn coalescing_merges_both_sides() {
    let mut region = Region::new(6);
    let pool = Pool::new();
    region.seed(&pool);

    unsafe {
        let a = pool.alloc(UNIT_SIZE);
        let b = pool.alloc(UNIT_SIZE);
        let c = pool.alloc(UNIT_SIZE);
        assert!(!a.is_null() && !b.is_null() && !c.is_null());

        pool.free(a);
        pool.free(c);
        assert_eq!(free_blocks(&pool).len(), 2);

        pool.free(b);
    }
    assert_eq!(free_blocks(&pool), [5 * UNIT_SIZE]);
}

/// Requests are carved from the high end of a matched block, so the first
/// allocation from a fresh region lands in its upper half and the remainder
/// keeps covering the low end.
#[test]
fn splits_come_from_the_tail() {
    let mut region = Region::new(10);
    let pool = Pool::new();
    let base = region.base() as usize;
    region.seed(&pool);

    let p = unsafe { pool.alloc(UNIT_SIZE) };
    assert!(!p.is_null());
    assert!(p as usize >= base + 5 * UNIT_SIZE);

    assert_eq!(free_blocks(&pool), [7 * UNIT_SIZE]);
}

/// Next-fit hands back holes in the order the cursor passes them, not in
/// address order from the start of the region.
#[test]
fn next_fit_progresses_through_holes() {
    let mut region = Region::new(20);
    let pool = Pool::new();
    region.seed(&pool);

    unsafe {
        let p1 = pool.alloc(2 * UNIT_SIZE);
        let p2 = pool.alloc(2 * UNIT_SIZE);
        let p3 = pool.alloc(2 * UNIT_SIZE);
        let p4 = pool.alloc(2 * UNIT_SIZE);
        assert!(!p4.is_null());

        pool.free(p1);
        pool.free(p3);

        // The cursor sits below both holes; the search reaches p3's hole
        // first, then p1's.
        let q1 = pool.alloc(2 * UNIT_SIZE);
        let q2 = pool.alloc(2 * UNIT_SIZE);
        assert_eq!(q1, p3);
        assert_eq!(q2, p1);

        pool.free(q1);
        pool.free(q2);
        pool.free(p2);
        pool.free(p4);
    }
    assert_eq!(free_units(&pool), 20);
}

#[test]
fn realloc_growth_carries_contents() {
    let mut region = Region::new(10);
    let pool = Pool::new();
    region.seed(&pool);

    unsafe {
        let p = pool.alloc(UNIT_SIZE);
        std::ptr::write_bytes(p, 0xAB, UNIT_SIZE);

        let q = pool.realloc(p, 4 * UNIT_SIZE);
        assert!(!q.is_null());
        assert!(Pool::allocsz(q) >= 4 * UNIT_SIZE);
        for i in 0..UNIT_SIZE {
            assert_eq!(*q.add(i), 0xAB);
        }
        pool.free(q);
    }
    assert_eq!(free_units(&pool), 10);
}

#[test]
fn zero_and_null_behavior() {
    let mut region = Region::new(8);
    let pool = Pool::new();
    region.seed(&pool);

    unsafe {
        assert!(pool.alloc(0).is_null());
        pool.free(std::ptr::null_mut());
        assert!(pool.realloc(std::ptr::null_mut(), 0).is_null());

        // realloc to zero is a free.
        let p = pool.alloc(1);
        assert!(!p.is_null());
        assert!(pool.realloc(p, 0).is_null());
    }
    assert_eq!(free_units(&pool), 8);
}

/// Live and free units always add up to the seeded total, whatever order
/// things are allocated and freed in.
#[test]
fn units_are_conserved() {
    let seeded = 32;
    let mut region = Region::new(seeded);
    let pool = Pool::new();
    region.seed(&pool);

    unsafe {
        let mut live = Vec::new();
        let mut live_units = 0;

        for nbytes in [1, 50, 2 * UNIT_SIZE, 7, 100] {
            let p = pool.alloc(nbytes);
            assert!(!p.is_null());
            live_units += Pool::allocsz(p) / UNIT_SIZE + 1;
            live.push(p);

            assert_eq!(free_units(&pool) + live_units, seeded);
        }

        // Free in a scrambled order; the balance must hold throughout.
        for i in [3, 0, 4, 2, 1] {
            let released = Pool::allocsz(live[i]) / UNIT_SIZE + 1;
            pool.free(live[i]);
            live_units -= released;
            assert_eq!(free_units(&pool) + live_units, seeded);
        }
    }

    assert_eq!(free_blocks(&pool), [(seeded - 1) * UNIT_SIZE]);
}

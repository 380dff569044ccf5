//! Pool allocator over caller-supplied memory regions.
//!
//! [`Pool`] manages any number of disjoint byte ranges handed to it with
//! [`Pool::add`] and serves variable-sized allocations out of them. It never
//! talks to the operating system: growing the pool is always an explicit
//! `add` by the caller. That makes the allocator usable on bare metal, in
//! early boot code, inside memory handed over by some other subsystem, or
//! anywhere else a fixed arena has to be carved up after the fact.
//!
//! Free memory is tracked with an intrusive ring. Every free block starts
//! with a one-unit header holding the block size and the link to the next
//! free block, and the ring is kept in ascending address order so blocks that
//! become neighbours can be merged again when they are freed:
//!
//! ```text
//!                cursor
//!                  |
//!                  v
//! +-------+   +--------+   +-------+   +--------+   +-------+   +--------+
//! | live  |   | FREE   |   | live  |   | FREE   |   | live  |   | FREE   |
//! |       |   | hdr|...|   |       |   | hdr|...|   |       |   | hdr|...|
//! +-------+   +--|-----+   +-------+   +-^--|---+   +-------+   +-^--|---+
//!                |                       |  |                     |  |
//!                +-----------------------+  +---------------------+  |
//!          ^                                                         |
//!          +-------------------- wraps around -----------------------+
//! ```
//!
//! Allocation is next-fit: each search resumes from where the previous one
//! stopped instead of rescanning the ring from the lowest address, which
//! spreads allocations over the pool and keeps the common case short. When a
//! matched block is larger than requested, the request is carved from its
//! high-address end so the remainder stays linked exactly where it was.
//!
//! A single busy-wait lock per pool makes all operations safe to call from
//! any number of threads. See [`Pool`] for the full API and an example.

#![no_std]

#[cfg(test)]
extern crate std;

use core::ptr::NonNull;

mod align;
mod freelist;
mod header;
mod pool;
mod spinlock;

/// Non-null pointer to `T`. Used instead of `*mut T` wherever "possibly no
/// block" is meaningful, so the compiler forces the `None` case to be
/// handled instead of letting a null slip through pointer arithmetic.
pub(crate) type Pointer<T> = Option<NonNull<T>>;

pub use header::UNIT_SIZE;
pub use pool::Pool;

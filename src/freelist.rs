//! The circular free list at the heart of the pool.
//!
//! Free blocks form a singly linked ring threaded through the managed memory
//! itself: each block's [`FreeNode`] header holds the link, so tracking free
//! memory costs nothing beyond the headers the blocks carry anyway. The ring
//! is kept in ascending address order with exactly one wrap from the
//! highest-address block back to the lowest:
//!
//! ```text
//!             cursor
//!               |
//!               v
//!          +--------+       +--------+       +--------+
//!     +--> | 0x1000 | ----> | 0x1400 | ----> | 0x2a00 | --+
//!     |    +--------+       +--------+       +--------+   |
//!     |                                                   |
//!     +------------------------- wrap --------------------+
//! ```
//!
//! The cursor names an arbitrary ring member. Searches start right after it
//! and it is re-anchored after every mutation, which is what makes the
//! allocation policy next-fit rather than first-fit: consecutive searches
//! resume where the last one succeeded instead of grinding over the same
//! low-address blocks again and again.
//!
//! Address order is what makes merging cheap. When a block is inserted, the
//! walk to its ordered position also finds both address-neighbours, and a
//! neighbour touching the block is absorbed on the spot, in either or both
//! directions. The ring therefore never holds two adjacent free blocks.

use core::ptr::NonNull;

use crate::header::FreeNode;
use crate::Pointer;

/// Free block ring plus its cursor. All the searching, splitting and merging
/// lives here; callers are expected to hold the pool lock.
pub(crate) struct FreeList {
    /// Cursor into the ring: `None` when no free block exists, otherwise
    /// some valid ring member. Search start and post-mutation anchor.
    head: Pointer<FreeNode>,
}

// Safety: every node the cursor can reach lives in memory the pool manages
// exclusively; no node is shared outside the lock that wraps this list.
unsafe impl Send for FreeList {}

impl FreeList {
    pub const fn new() -> Self {
        Self { head: None }
    }

    /// Next-fit search for a block of at least `nunits` units.
    ///
    /// Walks the ring starting right after the cursor. The first block that
    /// fits is taken:
    ///
    /// * An exact fit is unlinked. Unlinking the only member leaves the
    ///   list empty.
    /// * A larger block is split from its high-address end. The low part
    ///   shrinks in place and stays linked, so no predecessor needs
    ///   rewiring; only the carved-off tail gets a fresh header:
    ///
    /// ```text
    ///   before:  | hdr 8 units                      ...........          |
    ///   after:   | hdr 5 units  ..........| hdr 3 units (returned)       |
    /// ```
    ///
    /// The cursor moves to the predecessor of the match, which keeps it
    /// valid across both cases and makes the next search resume here.
    ///
    /// Returns `None` when no block fits. The returned block is off the
    /// ring; its header keeps the size for the eventual re-insertion.
    ///
    /// # Safety
    ///
    /// All ring nodes must point into memory owned by the pool; `nunits`
    /// must be at least 1.
    pub unsafe fn take(&mut self, nunits: usize) -> Pointer<FreeNode> {
        let head = self.head?;
        let mut prev = head;
        let mut cur = prev.as_ref().next;

        loop {
            if cur.as_ref().nunits >= nunits {
                if cur.as_ref().nunits == nunits {
                    if prev.as_ref().next == cur.as_ref().next {
                        // `cur` was the only member.
                        self.head = None;
                    } else {
                        prev.as_mut().next = cur.as_ref().next;
                        self.head = Some(prev);
                    }
                } else {
                    // Shrink in place, hand out the tail.
                    let remaining = cur.as_ref().nunits - nunits;
                    cur.as_mut().nunits = remaining;
                    cur = NonNull::new_unchecked(cur.as_ptr().add(remaining));
                    cur.as_ptr().write(FreeNode::new(nunits));
                    self.head = Some(prev);
                }
                return Some(cur);
            }

            if cur == head {
                // Walked the full ring without a fit.
                return None;
            }

            prev = cur;
            cur = cur.as_ref().next;
        }
    }

    /// Inserts `block` at its address-ordered position, merging it with
    /// whichever address-neighbours it touches.
    ///
    /// The walk looks for the node after which the block belongs. Since the
    /// ring ascends with a single wrap, that is either a node whose
    /// successor has a higher address than the block, or the wrap node
    /// itself when the block sits below the lowest or above the highest
    /// address.
    ///
    /// With the position found, two independent checks run:
    ///
    /// * the block ends exactly where the successor starts: the successor
    ///   is absorbed into the block;
    /// * the predecessor ends exactly where the block starts: the block is
    ///   absorbed into the predecessor.
    ///
    /// Both, either or neither may fire; firing both stitches three blocks
    /// into one. The cursor is re-anchored at the insertion node afterwards.
    ///
    /// # Safety
    ///
    /// `block` must carry a valid header, lie in pool-managed memory, be
    /// disjoint from every block already on the ring, and not already be
    /// linked. Double inserts are undefined behavior.
    pub unsafe fn insert(&mut self, mut block: NonNull<FreeNode>) {
        let Some(mut cur) = self.head else {
            // Nothing to order against: the block becomes a self-linked
            // singleton ring.
            block.as_mut().next = block;
            self.head = Some(block);
            return;
        };

        while !(block > cur && block < cur.as_ref().next) {
            if cur >= cur.as_ref().next && (block > cur || block < cur.as_ref().next) {
                // `cur` is the wrap node and the block lies beyond either
                // end of the ring.
                break;
            }
            cur = cur.as_ref().next;
        }

        let next = cur.as_ref().next;

        if FreeNode::end_of(block) == next {
            block.as_mut().nunits += next.as_ref().nunits;
            if next == cur {
                // The block swallowed a singleton ring whole, so the node
                // that was going to be the insertion anchor is gone. The
                // block itself is the ring now.
                block.as_mut().next = block;
                self.head = Some(block);
                return;
            }
            block.as_mut().next = next.as_ref().next;
        } else {
            block.as_mut().next = next;
        }

        if FreeNode::end_of(cur) == block {
            cur.as_mut().nunits += block.as_ref().nunits;
            cur.as_mut().next = block.as_ref().next;
        } else {
            cur.as_mut().next = block;
        }

        self.head = Some(cur);
    }

    /// Calls `f` with the payload capacity, in bytes, of every free block,
    /// in ring order starting at the cursor.
    ///
    /// # Safety
    ///
    /// Ring nodes must be valid; the caller must hold the pool lock for the
    /// whole traversal.
    pub unsafe fn for_each(&self, mut f: impl FnMut(usize)) {
        let Some(head) = self.head else { return };

        let mut cur = head;
        loop {
            f(cur.as_ref().payload_size());
            cur = cur.as_ref().next;
            if cur == head {
                break;
            }
        }
    }
}

#[cfg(test)]
impl FreeList {
    pub(crate) fn cursor(&self) -> Pointer<FreeNode> {
        self.head
    }

    /// Ring members in list order starting at the cursor. Doubles as a ring
    /// closure check: a broken ring would never get back to the cursor.
    pub(crate) fn nodes(&self) -> std::vec::Vec<NonNull<FreeNode>> {
        let mut nodes = std::vec::Vec::new();
        let Some(head) = self.head else { return nodes };

        let mut cur = head;
        loop {
            nodes.push(cur);
            cur = unsafe { cur.as_ref().next };
            if cur == head {
                break;
            }
        }
        nodes
    }

    pub(crate) fn total_units(&self) -> usize {
        self.nodes()
            .iter()
            .map(|node| unsafe { node.as_ref().nunits })
            .sum()
    }
}

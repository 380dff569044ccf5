use core::mem;
use core::ptr::NonNull;

/// Raises the alignment of [`FreeNode`] to the strictest alignment any
/// primitive type can demand. `u128` carries the largest alignment
/// requirement in the language, so a header aligned for it is aligned for
/// everything else as well.
type MaxAlign = u128;

/// Header written in front of every block, free or live.
///
/// ```text
/// +-------------------+ <- unit aligned
/// |  nunits  |  next  |    one unit: the header itself
/// +-------------------+ <- payload, automatically unit aligned
/// |        ...        |    nunits - 1 units of user memory
/// +-------------------+
/// ```
///
/// The header is exactly one unit and units are maximally aligned, so
/// placing a header on a unit boundary aligns the payload after it for free.
/// There is no "live block" variant with different fields: a block handed to
/// the caller keeps its header (the size is needed to free it), only the
/// `next` link loses its meaning while the block is off the ring.
#[repr(C)]
pub(crate) struct FreeNode {
    /// Block size in units, header included. Never zero.
    pub nunits: usize,
    /// Next free block on the ring. Only meaningful while the block is
    /// linked; a block handed out to the caller carries a stale value.
    pub next: NonNull<FreeNode>,
    _align: [MaxAlign; 0],
}

/// Allocation granularity in bytes.
///
/// A unit is the size of a block header, which is also the minimum block
/// size and the alignment of every payload the pool returns. Derived from
/// the header layout so the three can never disagree.
pub const UNIT_SIZE: usize = mem::size_of::<FreeNode>();

impl FreeNode {
    /// Fresh header for a block of `nunits`. The `next` link is dangling
    /// until the block enters a ring.
    pub fn new(nunits: usize) -> Self {
        FreeNode {
            nunits,
            next: NonNull::dangling(),
            _align: [],
        }
    }

    /// Payload capacity in bytes: everything but the header unit.
    #[inline]
    pub fn payload_size(&self) -> usize {
        (self.nunits - 1) * UNIT_SIZE
    }

    /// First address past the block, in header-sized steps. Two blocks are
    /// adjacent in memory exactly when `end_of` one equals the other.
    ///
    /// # Notes
    ///
    /// Written as `FreeNode::end_of(node)` instead of a method on `&self` so
    /// no intermediary reference to the header is created; Miri is picky
    /// about references derived from pointers it considers retired.
    #[inline]
    pub unsafe fn end_of(node: NonNull<FreeNode>) -> NonNull<FreeNode> {
        NonNull::new_unchecked(node.as_ptr().add(node.as_ref().nunits))
    }

    /// The address handed to the caller: the first byte after the header.
    #[inline]
    pub unsafe fn payload_of(node: NonNull<FreeNode>) -> NonNull<u8> {
        NonNull::new_unchecked(node.as_ptr().add(1)).cast()
    }

    /// Recovers the header of a live allocation from the pointer the caller
    /// holds.
    ///
    /// # Safety
    ///
    /// `payload` must be an address previously produced by
    /// [`Self::payload_of`] for a block that is still live. Anything else
    /// reads a header that isn't there.
    #[inline]
    pub unsafe fn from_payload(payload: NonNull<u8>) -> NonNull<FreeNode> {
        NonNull::new_unchecked(payload.as_ptr().cast::<FreeNode>().sub(1))
    }
}

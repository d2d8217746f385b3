//! The slab allocator (component B).
//!
//! A growing arena of fixed-length pages holding cache-line-sized order
//! records, backed by a lock-free LIFO free list. Order insertion and
//! removal are symmetric over time at steady state, so slot reuse
//! dominates: the free list turns the common-case allocation into two CAS
//! operations.
//!
//! Handles, not pointers: callers address a record by its `Handle` (a
//! flat slot index), never a raw pointer. This is the arena-plus-index
//! realization of the intrusive-pointer requirement described in the
//! design notes — the FIFO links in `OrderRecord` are handles into this
//! same arena. ABA is not a concern: there is a single allocator domain,
//! and a reused slot is always reinitialized as the same `OrderRecord`
//! type before its handle is handed out again.
//!
//! Growth of the page vector is **not** lock-free; it is protected by the
//! book's spinlock in practice, because every allocation in the core
//! happens while that lock is held. The free-list push/pop, by contrast,
//! uses CAS with acquire/release ordering and would remain correct even
//! if called without the book lock held.

use crate::record::OrderRecord;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU32, Ordering};

/// Number of slots per page.
pub const PAGE_SIZE: usize = 4096;

/// An index into the slab's flat slot space. Stable for the lifetime of
/// the allocation; never reused while the slot is live.
pub type Handle = u32;

/// The null handle: no record, no neighbor.
pub const NULL_HANDLE: Handle = u32::MAX;

struct Page {
    records: Box<[MaybeUninit<OrderRecord>; PAGE_SIZE]>,
    /// Free-list link for each slot, valid only while the slot is free.
    /// Kept alongside rather than inside the (possibly uninitialized)
    /// record storage so the free list never reads unconstructed memory.
    free_links: Box<[AtomicU32; PAGE_SIZE]>,
}

impl Page {
    fn new() -> Self {
        Self {
            records: Box::new(
                [const { MaybeUninit::uninit() }; PAGE_SIZE],
            ),
            free_links: Box::new([const { AtomicU32::new(NULL_HANDLE) }; PAGE_SIZE]),
        }
    }
}

fn split(handle: Handle) -> (usize, usize) {
    let handle = handle as usize;
    (handle / PAGE_SIZE, handle % PAGE_SIZE)
}

/// The narrow read/write seam the price-level index needs from whichever
/// slab backs a given `BookStorage`: resolve a handle to its record.
/// Implemented by both the growable `Slab` and the fixed-capacity
/// `FixedSlab`, so `PriceLevelIndex`'s bucket-splicing methods work over
/// either without caring which allocator is behind them.
pub trait SlotStore {
    /// # Safety
    /// `handle` must currently hold a constructed, non-destroyed record.
    unsafe fn get(&self, handle: Handle) -> &OrderRecord;
    /// # Safety
    /// `handle` must currently hold a constructed, non-destroyed record.
    unsafe fn get_mut(&mut self, handle: Handle) -> &mut OrderRecord;
}

/// A growable slab: allocation never fails short of host memory.
pub struct Slab {
    pages: Vec<Page>,
    free_head: AtomicU32,
    next_slot: AtomicU32,
}

impl Slab {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            free_head: AtomicU32::new(NULL_HANDLE),
            next_slot: AtomicU32::new(0),
        }
    }

    /// Live-constructed-slot count estimate (allocated minus freed is not
    /// tracked here; callers that need `size` track it themselves via the
    /// directory). Exposed for diagnostics/tests only.
    #[cfg(test)]
    fn pages_len(&self) -> usize {
        self.pages.len()
    }

    /// Allocates a slot and placement-initializes it with `record`,
    /// returning its handle. Pops the free list (CAS) when possible;
    /// otherwise bumps the next-unused-slot counter, growing the page
    /// vector if needed.
    pub fn construct(&mut self, record: OrderRecord) -> Handle {
        let handle = self.allocate();
        let (page, offset) = split(handle);
        self.pages[page].records[offset].write(record);
        handle
    }

    /// Reserves a slot without initializing it. `construct` is almost
    /// always what callers want; this exists for the allocator's own
    /// tests and for symmetry with the spec's allocate/construct split.
    fn allocate(&mut self) -> Handle {
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            if head == NULL_HANDLE {
                break;
            }
            let (page, offset) = split(head);
            let next = self.pages[page].free_links[offset].load(Ordering::Relaxed);
            match self.free_head.compare_exchange_weak(
                head,
                next,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => return head,
                Err(_) => continue,
            }
        }

        let handle = self.next_slot.fetch_add(1, Ordering::Relaxed);
        let (page, _) = split(handle);
        while self.pages.len() <= page {
            self.pages.push(Page::new());
        }
        handle
    }

    /// Finalizes and frees the slot at `handle`, returning it to the free
    /// list (push, CAS, release-ordered).
    ///
    /// # Safety
    /// `handle` must currently hold a constructed `OrderRecord` that has
    /// not already been destroyed.
    pub unsafe fn destroy(&mut self, handle: Handle) {
        self.deallocate(handle);
    }

    fn deallocate(&mut self, handle: Handle) {
        let (page, offset) = split(handle);
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            self.pages[page].free_links[offset].store(head, Ordering::Relaxed);
            match self.free_head.compare_exchange_weak(
                head,
                handle,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(_) => continue,
            }
        }
    }

    /// Borrows the record at `handle`.
    ///
    /// # Safety
    /// `handle` must currently hold a constructed, non-destroyed record.
    pub unsafe fn get(&self, handle: Handle) -> &OrderRecord {
        let (page, offset) = split(handle);
        unsafe { self.pages[page].records[offset].assume_init_ref() }
    }

    /// Mutably borrows the record at `handle`.
    ///
    /// # Safety
    /// `handle` must currently hold a constructed, non-destroyed record.
    pub unsafe fn get_mut(&mut self, handle: Handle) -> &mut OrderRecord {
        let (page, offset) = split(handle);
        unsafe { self.pages[page].records[offset].assume_init_mut() }
    }
}

impl Default for Slab {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotStore for Slab {
    unsafe fn get(&self, handle: Handle) -> &OrderRecord {
        unsafe { Slab::get(self, handle) }
    }
    unsafe fn get_mut(&mut self, handle: Handle) -> &mut OrderRecord {
        unsafe { Slab::get_mut(self, handle) }
    }
}

/// A fixed-capacity slab: never grows, reports exhaustion instead.
pub struct FixedSlab {
    page: Page,
    capacity: usize,
    free_head: AtomicU32,
    next_slot: AtomicU32,
    allocated: u32,
}

impl FixedSlab {
    /// Creates a fixed slab with room for up to `capacity` records.
    /// `capacity` must not exceed `PAGE_SIZE`.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity <= PAGE_SIZE, "fixed slab capacity exceeds page size");
        Self {
            page: Page::new(),
            capacity,
            free_head: AtomicU32::new(NULL_HANDLE),
            next_slot: AtomicU32::new(0),
            allocated: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated as usize
    }

    /// Allocates and placement-initializes a slot, or reports exhaustion.
    pub fn construct(&mut self, record: OrderRecord) -> Option<Handle> {
        let handle = self.allocate()?;
        self.page.records[handle as usize].write(record);
        self.allocated += 1;
        Some(handle)
    }

    fn allocate(&mut self) -> Option<Handle> {
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            if head != NULL_HANDLE {
                let next = self.page.free_links[head as usize].load(Ordering::Relaxed);
                match self.free_head.compare_exchange_weak(
                    head,
                    next,
                    Ordering::Release,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return Some(head),
                    Err(_) => continue,
                }
            }

            let next_slot = self.next_slot.load(Ordering::Relaxed);
            if next_slot as usize >= self.capacity {
                return None;
            }
            match self.next_slot.compare_exchange_weak(
                next_slot,
                next_slot + 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(handle) => return Some(handle),
                Err(_) => continue,
            }
        }
    }

    /// # Safety
    /// `handle` must currently hold a constructed, non-destroyed record.
    pub unsafe fn destroy(&mut self, handle: Handle) {
        self.allocated -= 1;
        loop {
            let head = self.free_head.load(Ordering::Acquire);
            self.page.free_links[handle as usize].store(head, Ordering::Relaxed);
            match self.free_head.compare_exchange_weak(
                head,
                handle,
                Ordering::Release,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(_) => continue,
            }
        }
    }

    /// # Safety
    /// `handle` must currently hold a constructed, non-destroyed record.
    pub unsafe fn get(&self, handle: Handle) -> &OrderRecord {
        unsafe { self.page.records[handle as usize].assume_init_ref() }
    }

    /// # Safety
    /// `handle` must currently hold a constructed, non-destroyed record.
    pub unsafe fn get_mut(&mut self, handle: Handle) -> &mut OrderRecord {
        unsafe { self.page.records[handle as usize].assume_init_mut() }
    }
}

impl SlotStore for FixedSlab {
    unsafe fn get(&self, handle: Handle) -> &OrderRecord {
        unsafe { FixedSlab::get(self, handle) }
    }
    unsafe fn get_mut(&mut self, handle: Handle) -> &mut OrderRecord {
        unsafe { FixedSlab::get_mut(self, handle) }
    }
}

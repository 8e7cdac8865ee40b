//! Kernel Heap Allocator
//!
//! Uses `linked_list_allocator` over a static region.
//!
//! # Exhaustion
//! Growable buffers reserve with `try_reserve`, so running out of heap shows
//! up as a refused push rather than an abort.

use core::ptr::addr_of_mut;

use linked_list_allocator::LockedHeap;

#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

/// Heap size (64 KiB)
const HEAP_SIZE: usize = 64 * 1024;

static mut HEAP_MEMORY: [u8; HEAP_SIZE] = [0; HEAP_SIZE];

/// Initialize the kernel heap
///
/// # Safety
/// Must be called exactly once, before the first allocation.
pub unsafe fn init_heap() {
    // SAFETY: HEAP_MEMORY is only reached through this pointer, and the
    // caller guarantees a single call.
    unsafe {
        let start = addr_of_mut!(HEAP_MEMORY) as *mut u8;
        ALLOCATOR.lock().init(start, HEAP_SIZE);
    }
    log::info!("[BOOT] heap: {} KiB", HEAP_SIZE / 1024);
}

/// Size of the kernel heap in bytes
pub fn heap_size() -> usize {
    HEAP_SIZE
}

/// Bytes not currently allocated
pub fn heap_free() -> usize {
    ALLOCATOR.lock().free()
}

//! Memory management
//!
//! Only the heap lives here. It backs [`MemBufferPipe`](crate::pipe::MemBufferPipe)
//! and other `alloc` users on the bare-metal target; host builds use the
//! system allocator.

mod allocator;

pub use allocator::{heap_free, heap_size, init_heap};

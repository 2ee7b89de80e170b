//! Spool - Buffer
//!
//! Bounded multi-stream record buffer that decouples producers from flushers.
//!
//! # Architecture
//!
//! ```text
//! [Producers] --enqueue--> StreamBuffer --take--> [Flush workers]
//!                            │
//!                            ├── DashMap<StreamDescriptor, Arc<StreamQueue>>
//!                            │      └── Mutex<VecDeque<Record>> per stream
//!                            └── Accounting (global atomics + Notify)
//! ```
//!
//! # Key Design
//!
//! - **Per-stream locks**: unrelated streams never contend on enqueue/take
//! - **Exact bounds**: the per-stream bound is checked under the stream lock,
//!   the global bound is reserved with a compare-and-swap before the record
//!   becomes visible
//! - **Backpressure**: `enqueue` awaits a `Notify` that `take` signals after
//!   freeing bytes; `try_enqueue` hands the record back instead of waiting.
//!   Parked producers are counted per bound, so the scheduler can see a buffer
//!   that is refusing records while still under its byte limit
//! - **Forward progress**: `take` always returns at least one record from a
//!   non-empty queue, however large
//! - **Lock-free observability**: size accessors read mirrored atomics and may
//!   be momentarily stale
//!
//! # Example
//!
//! ```ignore
//! use spool_buffer::{BufferLimits, Record, StreamBuffer, StreamDescriptor};
//!
//! let buffer = StreamBuffer::new(BufferLimits::default());
//! let users = StreamDescriptor::new("public", "users");
//!
//! buffer.enqueue(&users, Record::new(&b"{\"id\":1}"[..])).await?;
//!
//! let batch = buffer.take(&users, 10 * 1024 * 1024);
//! assert_eq!(batch.len(), 1);
//! ```

mod batch;
mod buffer;
mod error;
mod queue;
mod record;
mod stream;

pub use batch::Batch;
pub use buffer::{BufferLimits, BufferSnapshot, StreamBuffer};
pub use error::{BufferError, Result};
pub use record::Record;
pub use stream::StreamDescriptor;

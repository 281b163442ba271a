//! Cross-thread request routing for event loops.
//!
//! Threads queue requests for another thread's [`EventLoop`]. Requests that
//! call into an object with a shorter lifetime than the loop are tracked by
//! that object's [`InvalidationRecord`]; destroying the object flips them to
//! invalid and the loop skips them.
//!
//! Producers that start before their consumers pre-register request buffers
//! in a [`BufferRegistry`], keyed `"<emitter>/<role>"`, which consumers claim
//! once they run.

/// Concrete bounded request buffer.
pub mod buffer;
/// Event loop configuration.
pub mod config;
/// Error types.
pub mod error;
/// Event loop identity and request execution.
pub mod event_loop;
/// Thread-local current event loop.
pub mod identity;
/// Object destruction hooks and request invalidation.
pub mod invalidation;
/// Thread-local outgoing buffers.
pub mod outgoing;
/// Buffer suppliers and pre-registration.
pub mod registry;
/// Queued requests.
pub mod request;
/// Event loop threads.
pub mod thread;

pub use buffer::{RequestBuffer, request_buffer_factory};
pub use config::EventLoopConfig;
pub use error::{EventLoopError, RequestBufferError, Result};
pub use event_loop::{DrainReport, EventLoop};
pub use identity::{current_event_loop, set_current_event_loop};
pub use invalidation::{DestroyCallback, DestroyNotifier, InvalidationRecord, Invalidator, NotifyOnDrop, invalidate, invalidator};
pub use outgoing::{bind_outgoing_buffer, outgoing_buffer, outgoing_buffer_as};
pub use registry::{BufferRegistry, RequestBufferFactory, RequestBufferHandle, RequestBufferSupplier, ThreadBufferMapping};
pub use request::{Request, RequestState};
pub use thread::spawn_event_loop_thread;

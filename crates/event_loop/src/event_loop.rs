use std::fmt;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::buffer::RequestBuffer;
use crate::invalidation::Invalidator;
use crate::request::{Request, RequestState};

/// Counts from one [`EventLoop::drain`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
	/// Requests whose body ran.
	pub executed: usize,
	/// Requests skipped because their target object was destroyed.
	pub skipped: usize,
}

/// Identity of the event loop running on one thread.
///
/// Requests are created against the loop that will execute them. The loop's
/// invalidation lock serializes execution against invalidation, so a request
/// is either skipped or runs to completion before the object it targets
/// finishes being destroyed. Creating a request never takes this lock.
pub struct EventLoop {
	name: String,
	invalidation: ReentrantMutex<()>,
}

impl fmt::Debug for EventLoop {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventLoop").field("name", &self.name).finish_non_exhaustive()
	}
}

impl EventLoop {
	/// Creates a loop identity. `name` is the role other threads address it by.
	pub fn new(name: impl Into<String>) -> Arc<Self> {
		Arc::new(Self {
			name: name.into(),
			invalidation: ReentrantMutex::new(()),
		})
	}

	/// Returns the loop's role name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Acquires the lock guarding request validity for this loop.
	///
	/// Re-entrant: a request body may destroy an object whose requests also
	/// live on this loop.
	pub fn invalidation_lock(&self) -> ReentrantMutexGuard<'_, ()> {
		self.invalidation.lock()
	}

	/// Creates a request for this loop.
	///
	/// With an invalidator, the request is tracked by the target object's
	/// record and becomes invalid when the object is destroyed. If the object
	/// is already gone the request is invalid from the start.
	///
	/// Only the record's own lock is taken, so producers never wait on a
	/// running request body.
	pub fn request<T>(self: &Arc<Self>, payload: T, invalidator: Option<&Invalidator>) -> Request<T> {
		let Some(invalidator) = invalidator else {
			return Request::untracked(payload);
		};
		let Some(record) = invalidator.record() else {
			tracing::trace!(event_loop = %self.name, "event_loop.request.target_destroyed");
			return Request {
				state: RequestState::new(false),
				payload,
			};
		};

		let state = RequestState::new(true);
		record.attach(self, &state);
		Request { state, payload }
	}

	/// Runs `f` with the request payload unless the request was invalidated.
	///
	/// The validity check and `f` both run under the invalidation lock.
	/// Returns `None` for a skipped request.
	///
	/// A record is bound to the first loop a request for it was created on,
	/// and [`invalidate`](crate::invalidate) only takes that loop's lock. A
	/// request created here for an object whose record is bound to another
	/// loop is still flipped on destruction, but the flip may land while `f`
	/// is running. Create all requests for one object on a single loop to get
	/// the full guarantee.
	pub fn execute<T, R>(&self, request: Request<T>, f: impl FnOnce(T) -> R) -> Option<R> {
		let _guard = self.invalidation.lock();
		let Request { state, payload } = request;
		state.detach();
		if !state.is_valid() {
			tracing::trace!(event_loop = %self.name, "event_loop.execute.skip_invalid");
			return None;
		}
		Some(f(payload))
	}

	/// Executes the requests queued in `buffer` when the pass starts.
	///
	/// Requests pushed while draining wait for the next pass.
	pub fn drain<T>(&self, buffer: &RequestBuffer<T>, mut f: impl FnMut(T)) -> DrainReport {
		let mut report = DrainReport::default();
		for _ in 0..buffer.len() {
			let Some(request) = buffer.pop() else {
				break;
			};
			match self.execute(request, &mut f) {
				Some(()) => report.executed += 1,
				None => report.skipped += 1,
			}
		}
		if report.executed + report.skipped > 0 {
			tracing::trace!(
				event_loop = %self.name,
				executed = report.executed,
				skipped = report.skipped,
				"event_loop.drain"
			);
		}
		report
	}
}

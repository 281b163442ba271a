//! Invalidation of queued requests whose target object is destroyed.
//!
//! Some requests queued with an [`EventLoop`] call into objects that may not
//! outlive the loop. Before queueing such requests, the producer obtains an
//! [`Invalidator`] for the object with [`invalidator`]. That registers a
//! destruction callback on the object which calls [`invalidate`] with the
//! object's [`InvalidationRecord`], flipping every request still queued
//! against it to invalid so the consumer skips it.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::event_loop::EventLoop;
use crate::request::RequestState;

/// Callback run once when the owning object starts being destroyed.
pub type DestroyCallback = Box<dyn FnOnce() + Send + 'static>;

/// Types that can run callbacks at the start of their destruction.
///
/// Implementors must run each registered callback exactly once, synchronously,
/// before the state those callbacks protect is torn down.
pub trait NotifyOnDrop {
	/// Registers `callback` to run when `self` is destroyed.
	fn add_destroy_notify_callback(&self, callback: DestroyCallback);
}

/// Embeddable [`NotifyOnDrop`] implementation.
///
/// Callbacks run when the notifier itself drops. Struct fields drop in
/// declaration order, so declare the notifier first, or call
/// [`DestroyNotifier::notify`] from the owner's own `Drop` impl.
#[derive(Default)]
pub struct DestroyNotifier {
	callbacks: Mutex<Vec<DestroyCallback>>,
}

impl DestroyNotifier {
	/// Creates a notifier with no callbacks.
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs and forgets every registered callback.
	pub fn notify(&self) {
		let callbacks = std::mem::take(&mut *self.callbacks.lock());
		for callback in callbacks {
			callback();
		}
	}

	/// Returns the number of callbacks waiting for destruction.
	pub fn pending(&self) -> usize {
		self.callbacks.lock().len()
	}
}

impl NotifyOnDrop for DestroyNotifier {
	fn add_destroy_notify_callback(&self, callback: DestroyCallback) {
		self.callbacks.lock().push(callback);
	}
}

impl Drop for DestroyNotifier {
	fn drop(&mut self) {
		self.notify();
	}
}

impl fmt::Debug for DestroyNotifier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DestroyNotifier").field("pending", &self.pending()).finish()
	}
}

#[derive(Debug, Default)]
struct RecordState {
	event_loop: Weak<EventLoop>,
	requests: Vec<Weak<RequestState>>,
	invalidated: bool,
}

/// Links one object to the requests queued against it.
///
/// The record never owns the requests nor the event loop; both references
/// are weak. The destruction callback installed by [`invalidator`] holds the
/// only strong reference and consumes it in [`invalidate`].
#[derive(Debug, Default)]
pub struct InvalidationRecord {
	state: Mutex<RecordState>,
}

impl InvalidationRecord {
	/// Creates an unattached record.
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	/// Returns the loop whose invalidation mutex guards this record, if it is still alive.
	pub fn event_loop(&self) -> Option<Arc<EventLoop>> {
		self.state.lock().event_loop.upgrade()
	}

	/// Returns the number of tracked requests that are still queued somewhere.
	pub fn pending(&self) -> usize {
		self.state.lock().requests.iter().filter(|request| request.strong_count() > 0).count()
	}

	/// Returns true once [`invalidate`] has processed this record.
	pub fn is_invalidated(&self) -> bool {
		self.state.lock().invalidated
	}

	/// Tracks `request` and binds the record to `event_loop` if it is unbound.
	///
	/// Serialized against [`invalidate`] by the record's own lock alone. A
	/// record that was already invalidated flips the request immediately.
	pub(crate) fn attach(self: &Arc<Self>, event_loop: &Arc<EventLoop>, request: &Arc<RequestState>) {
		let mut state = self.state.lock();
		if state.invalidated {
			drop(state);
			request.invalidate();
			return;
		}

		match state.event_loop.upgrade() {
			None => state.event_loop = Arc::downgrade(event_loop),
			Some(bound) if !Arc::ptr_eq(&bound, event_loop) => {
				tracing::warn!(
					bound = bound.name(),
					event_loop = event_loop.name(),
					"event_loop.invalidation.cross_loop_attach"
				);
			}
			Some(_) => {}
		}

		state.requests.retain(|tracked| tracked.strong_count() > 0);
		state.requests.push(Arc::downgrade(request));
		request.set_invalidation(Arc::downgrade(self));
	}

	/// Stops tracking `request`.
	pub(crate) fn forget(&self, request: &Arc<RequestState>) {
		let target = Arc::downgrade(request);
		self.state.lock().requests.retain(|tracked| tracked.strong_count() > 0 && !tracked.ptr_eq(&target));
	}
}

/// Marks every request tracked by `record` invalid, then frees the record.
///
/// The flip runs under the owning loop's invalidation lock; the record is
/// released after the lock. A record with no live owning loop is simply
/// released. Never panics or fails, so it is safe to call from `Drop`.
pub fn invalidate(record: Arc<InvalidationRecord>) {
	let event_loop = {
		let mut state = record.state.lock();
		match state.event_loop.upgrade() {
			Some(event_loop) => event_loop,
			None => {
				state.invalidated = true;
				tracing::trace!("event_loop.invalidate.unbound");
				return;
			}
		}
	};

	let invalidated = {
		let _guard = event_loop.invalidation_lock();
		let requests = {
			let mut state = record.state.lock();
			state.invalidated = true;
			std::mem::take(&mut state.requests)
		};
		let mut count = 0usize;
		for request in requests.iter().filter_map(Weak::upgrade) {
			request.invalidate();
			count += 1;
		}
		count
	};

	tracing::trace!(event_loop = event_loop.name(), invalidated, "event_loop.invalidate");
	drop(record);
}

/// Producer-side handle to an object's [`InvalidationRecord`].
///
/// Cloning is cheap. The handle does not keep the record alive; once the
/// object is destroyed, requests created through the handle are invalid.
#[derive(Debug, Clone)]
pub struct Invalidator {
	record: Weak<InvalidationRecord>,
}

impl Invalidator {
	/// Returns true until the tracked object's destruction has been processed.
	pub fn is_target_alive(&self) -> bool {
		self.record.strong_count() > 0
	}

	pub(crate) fn record(&self) -> Option<Arc<InvalidationRecord>> {
		self.record.upgrade()
	}
}

/// Creates an invalidation record for `target` and arranges for [`invalidate`]
/// to run when it is destroyed.
pub fn invalidator<O>(target: &O) -> Invalidator
where
	O: NotifyOnDrop + ?Sized,
{
	let record = InvalidationRecord::new();
	let handle = Invalidator {
		record: Arc::downgrade(&record),
	};
	target.add_destroy_notify_callback(Box::new(move || invalidate(record)));
	handle
}

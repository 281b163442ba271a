//! Queued units of work and their validity state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::invalidation::InvalidationRecord;

/// Validity state shared between a queued request and the invalidation record
/// that tracks it.
///
/// The queue owns the state through [`Request`]; an [`InvalidationRecord`]
/// only holds a weak reference to it, and the state only holds a weak
/// back-reference to the record. Ownership never forms a cycle.
#[derive(Debug)]
pub struct RequestState {
	valid: AtomicBool,
	invalidation: Mutex<Option<Weak<InvalidationRecord>>>,
}

impl RequestState {
	pub(crate) fn new(valid: bool) -> Arc<Self> {
		Arc::new(Self {
			valid: AtomicBool::new(valid),
			invalidation: Mutex::new(None),
		})
	}

	/// Returns false once the object this request targets has been destroyed.
	pub fn is_valid(&self) -> bool {
		self.valid.load(Ordering::Acquire)
	}

	/// Returns true while an invalidation record still tracks this request.
	pub fn is_tracked(&self) -> bool {
		self.invalidation.lock().as_ref().is_some_and(|record| record.strong_count() > 0)
	}

	/// Marks the request invalid and forgets its record.
	pub(crate) fn invalidate(&self) {
		self.valid.store(false, Ordering::Release);
		*self.invalidation.lock() = None;
	}

	pub(crate) fn set_invalidation(&self, record: Weak<InvalidationRecord>) {
		*self.invalidation.lock() = Some(record);
	}

	/// Removes this request from its record, if any. The back-reference lock is
	/// released before the record is touched.
	pub(crate) fn detach(self: &Arc<Self>) {
		let record = self.invalidation.lock().take();
		if let Some(record) = record.and_then(|weak| weak.upgrade()) {
			record.forget(self);
		}
	}
}

/// One queued unit of work.
#[derive(Debug)]
pub struct Request<T> {
	pub(crate) state: Arc<RequestState>,
	pub(crate) payload: T,
}

impl<T> Request<T> {
	/// Creates a request that no object lifetime can invalidate.
	pub fn untracked(payload: T) -> Self {
		Self {
			state: RequestState::new(true),
			payload,
		}
	}

	/// Returns the request validity flag.
	pub fn is_valid(&self) -> bool {
		self.state.is_valid()
	}

	/// Returns the shared validity state.
	pub fn state(&self) -> &Arc<RequestState> {
		&self.state
	}

	/// Borrows the payload.
	pub fn payload(&self) -> &T {
		&self.payload
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn untracked_request_stays_valid() {
		let request = Request::untracked(7u32);
		assert!(request.is_valid());
		assert!(!request.state().is_tracked());
		assert_eq!(*request.payload(), 7);
	}

	#[test]
	fn invalidate_clears_back_reference() {
		let record = InvalidationRecord::new();
		let state = RequestState::new(true);
		state.set_invalidation(Arc::downgrade(&record));
		assert!(state.is_tracked());

		state.invalidate();
		assert!(!state.is_valid());
		assert!(!state.is_tracked());
	}

	#[test]
	fn back_reference_to_freed_record_is_not_tracked() {
		let state = RequestState::new(true);
		{
			let record = InvalidationRecord::new();
			state.set_invalidation(Arc::downgrade(&record));
		}
		assert!(!state.is_tracked());
		state.detach();
		assert!(state.is_valid());
	}
}

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::RequestBufferError;
use crate::outgoing::bind_outgoing_buffer;
use crate::registry::RequestBufferHandle;
use crate::request::Request;

struct BufferState<T> {
	queue: VecDeque<Request<T>>,
	closed: bool,
}

/// Bounded FIFO of requests flowing from one producer thread to one event loop.
pub struct RequestBuffer<T> {
	capacity: usize,
	state: Mutex<BufferState<T>>,
}

impl<T> RequestBuffer<T> {
	/// Creates a buffer holding up to `capacity` pending requests (at least one).
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			capacity,
			state: Mutex::new(BufferState {
				queue: VecDeque::with_capacity(capacity),
				closed: false,
			}),
		}
	}

	/// Non-blocking enqueue. The request is dropped on error.
	pub fn try_push(&self, request: Request<T>) -> Result<(), RequestBufferError> {
		let mut state = self.state.lock();
		if state.closed {
			return Err(RequestBufferError::Closed);
		}
		if state.queue.len() >= self.capacity {
			return Err(RequestBufferError::Full { capacity: self.capacity });
		}
		state.queue.push_back(request);
		Ok(())
	}

	/// Dequeues the oldest request. Closed buffers still drain.
	pub fn pop(&self) -> Option<Request<T>> {
		self.state.lock().queue.pop_front()
	}

	/// Rejects further pushes.
	pub fn close(&self) {
		self.state.lock().closed = true;
	}

	/// Returns true once [`Self::close`] was called.
	pub fn is_closed(&self) -> bool {
		self.state.lock().closed
	}

	/// Returns current queue length.
	pub fn len(&self) -> usize {
		self.state.lock().queue.len()
	}

	/// Returns `true` if no requests are pending.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns buffer capacity.
	pub fn capacity(&self) -> usize {
		self.capacity
	}
}

/// Returns a buffer factory for `role` suitable for
/// [`BufferRegistry::register_supplier`](crate::BufferRegistry::register_supplier).
///
/// Each call builds a [`RequestBuffer<T>`] and binds it as the calling
/// thread's outgoing buffer for `role`.
pub fn request_buffer_factory<T>(role: &str) -> impl Fn(u32) -> RequestBufferHandle + Send + Sync + use<T>
where
	T: Send + 'static,
{
	let role = role.to_owned();
	move |capacity| {
		let buffer: RequestBufferHandle = Arc::new(RequestBuffer::<T>::new(capacity as usize));
		bind_outgoing_buffer(&role, Arc::clone(&buffer));
		buffer
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::outgoing::outgoing_buffer_as;

	#[test]
	fn fifo_until_full() {
		let buffer = RequestBuffer::new(2);
		assert_eq!(buffer.try_push(Request::untracked(1u32)), Ok(()));
		assert_eq!(buffer.try_push(Request::untracked(2)), Ok(()));
		assert_eq!(buffer.try_push(Request::untracked(3)), Err(RequestBufferError::Full { capacity: 2 }));

		assert_eq!(buffer.pop().map(|r| r.payload), Some(1));
		assert_eq!(buffer.pop().map(|r| r.payload), Some(2));
		assert!(buffer.pop().is_none());
	}

	#[test]
	fn closed_buffer_rejects_pushes_but_drains() {
		let buffer = RequestBuffer::new(4);
		buffer.try_push(Request::untracked("a")).unwrap();
		buffer.close();

		assert!(buffer.is_closed());
		assert_eq!(buffer.try_push(Request::untracked("b")), Err(RequestBufferError::Closed));
		assert_eq!(buffer.pop().map(|r| r.payload), Some("a"));
		assert!(buffer.is_empty());
	}

	#[test]
	fn zero_capacity_holds_one_request() {
		let buffer = RequestBuffer::<()>::new(0);
		assert_eq!(buffer.capacity(), 1);
	}

	#[test]
	fn factory_binds_outgoing_slot() {
		std::thread::spawn(|| {
			let factory = request_buffer_factory::<u64>("audio");
			let handle = factory(16);

			let bound = outgoing_buffer_as::<RequestBuffer<u64>>("audio").unwrap();
			let made = handle.downcast::<RequestBuffer<u64>>().ok().unwrap();
			assert!(Arc::ptr_eq(&bound, &made));
			assert_eq!(made.capacity(), 16);
		})
		.join()
		.unwrap();
	}
}

//! Per-thread outgoing request buffers and thread liveness tokens.
//!
//! A request buffer factory runs on the producer thread and binds the buffer
//! it creates here, so later sends from that thread find their buffer for a
//! target role without touching shared state.
//!
//! Slots are never reclaimed explicitly; they drop with the thread.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use crate::registry::RequestBufferHandle;

thread_local! {
	static OUTGOING: RefCell<HashMap<String, RequestBufferHandle>> = RefCell::new(HashMap::new());
	static LIVENESS: Arc<()> = Arc::new(());
}

/// Binds `buffer` as the calling thread's outgoing buffer for `role`,
/// replacing any previous binding.
pub fn bind_outgoing_buffer(role: &str, buffer: RequestBufferHandle) {
	let _ = OUTGOING.try_with(|slots| {
		slots.borrow_mut().insert(role.to_owned(), buffer);
	});
}

/// Returns the calling thread's outgoing buffer for `role`.
pub fn outgoing_buffer(role: &str) -> Option<RequestBufferHandle> {
	OUTGOING.try_with(|slots| slots.borrow().get(role).cloned()).ok().flatten()
}

/// Returns the calling thread's outgoing buffer for `role` if it has type `B`.
pub fn outgoing_buffer_as<B>(role: &str) -> Option<Arc<B>>
where
	B: Any + Send + Sync,
{
	outgoing_buffer(role)?.downcast::<B>().ok()
}

/// Returns a token that stops upgrading once the calling thread has exited.
pub(crate) fn liveness_token() -> Weak<()> {
	LIVENESS.try_with(Arc::downgrade).unwrap_or_default()
}

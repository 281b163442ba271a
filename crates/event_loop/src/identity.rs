//! Which event loop runs on the calling thread.
//!
//! The slot is a non-owning observer: it holds a weak reference, never keeps
//! a loop alive and never frees one. Slots of exited threads are simply
//! abandoned.

use std::cell::RefCell;
use std::sync::{Arc, Weak};

use crate::event_loop::EventLoop;

thread_local! {
	static CURRENT: RefCell<Weak<EventLoop>> = RefCell::new(Weak::new());
}

/// Returns the event loop bound to the calling thread.
///
/// `None` if nothing was bound, or the bound loop has since been dropped by
/// its owner.
pub fn current_event_loop() -> Option<Arc<EventLoop>> {
	CURRENT.try_with(|slot| slot.borrow().upgrade()).ok().flatten()
}

/// Binds `event_loop` to the calling thread, replacing any previous binding.
/// `None` clears the binding.
pub fn set_current_event_loop(event_loop: Option<&Arc<EventLoop>>) {
	let _ = CURRENT.try_with(|slot| {
		*slot.borrow_mut() = event_loop.map(Arc::downgrade).unwrap_or_default();
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	fn on_fresh_thread(f: impl FnOnce() + Send + 'static) {
		std::thread::spawn(f).join().unwrap();
	}

	#[test]
	fn unbound_thread_has_no_loop() {
		on_fresh_thread(|| assert!(current_event_loop().is_none()));
	}

	#[test]
	fn rebinding_replaces_without_freeing() {
		on_fresh_thread(|| {
			let x = EventLoop::new("x");
			let y = EventLoop::new("y");

			set_current_event_loop(Some(&x));
			assert!(Arc::ptr_eq(&current_event_loop().unwrap(), &x));
			assert_eq!(Arc::strong_count(&x), 1);

			set_current_event_loop(Some(&y));
			assert!(Arc::ptr_eq(&current_event_loop().unwrap(), &y));
			assert_eq!(Arc::strong_count(&x), 1);
			assert_eq!(x.name(), "x");

			set_current_event_loop(None);
			assert!(current_event_loop().is_none());
		});
	}

	#[test]
	fn binding_is_thread_local() {
		on_fresh_thread(|| {
			let gui = EventLoop::new("gui");
			set_current_event_loop(Some(&gui));
			std::thread::spawn(|| assert!(current_event_loop().is_none())).join().unwrap();
			assert_eq!(current_event_loop().unwrap().name(), "gui");
		});
	}

	#[test]
	fn dropped_loop_is_not_returned() {
		on_fresh_thread(|| {
			let gui = EventLoop::new("gui");
			set_current_event_loop(Some(&gui));
			drop(gui);
			assert!(current_event_loop().is_none());
		});
	}
}

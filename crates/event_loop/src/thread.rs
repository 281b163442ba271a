use std::sync::Arc;
use std::thread::JoinHandle;

use crate::event_loop::EventLoop;
use crate::identity::set_current_event_loop;

/// Spawns a named OS thread running an event loop of the same name.
///
/// The loop is bound as the thread's current loop for the duration of `f`.
pub fn spawn_event_loop_thread<F, R>(name: impl Into<String>, f: F) -> std::io::Result<JoinHandle<R>>
where
	F: FnOnce(Arc<EventLoop>) -> R + Send + 'static,
	R: Send + 'static,
{
	let name = name.into();
	tracing::trace!(thread = %name, "event_loop.spawn_thread");
	std::thread::Builder::new().name(name.clone()).spawn(move || {
		let event_loop = EventLoop::new(name);
		set_current_event_loop(Some(&event_loop));
		let out = f(Arc::clone(&event_loop));
		set_current_event_loop(None);
		out
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::identity::current_event_loop;

	#[test]
	fn thread_runs_with_its_loop_bound() {
		let handle = spawn_event_loop_thread("butler", |event_loop| {
			let current = current_event_loop().unwrap();
			(
				Arc::ptr_eq(&current, &event_loop),
				std::thread::current().name().map(str::to_owned),
				event_loop.name().to_owned(),
			)
		})
		.unwrap();

		let (bound, thread_name, loop_name) = handle.join().unwrap();
		assert!(bound);
		assert_eq!(thread_name.as_deref(), Some("butler"));
		assert_eq!(loop_name, "butler");
	}
}

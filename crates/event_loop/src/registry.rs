//! Request buffer suppliers and pre-registered buffer mappings.
//!
//! Threads that emit requests towards other threads may start before the
//! receiving threads exist. Receiving roles register a buffer factory here;
//! an emitting thread calls [`BufferRegistry::pre_register`] to allocate one
//! buffer per role and publish it under `"<emitter>/<role>"`, where the
//! receiving thread finds it once it starts.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};
use std::thread::{self, ThreadId};

use parking_lot::RwLock;

use crate::config::EventLoopConfig;
use crate::error::{Result, validate_name};
use crate::outgoing::liveness_token;

/// Opaque request buffer produced by a factory.
pub type RequestBufferHandle = Arc<dyn Any + Send + Sync>;

/// Builds a request buffer sized for the given number of pending requests.
pub type RequestBufferFactory = Arc<dyn Fn(u32) -> RequestBufferHandle + Send + Sync>;

/// A receiving role and the factory for its request buffers.
#[derive(Clone)]
pub struct RequestBufferSupplier {
	/// Role name of the receiving thread, used as the second half of mapping keys.
	pub name: String,
	/// `None` when the role expects no pre-allocated buffer.
	pub factory: Option<RequestBufferFactory>,
}

impl fmt::Debug for RequestBufferSupplier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RequestBufferSupplier")
			.field("name", &self.name)
			.field("has_factory", &self.factory.is_some())
			.finish()
	}
}

/// A buffer one emitting thread allocated for one receiving role.
#[derive(Clone)]
pub struct ThreadBufferMapping {
	/// Thread that ran the pre-registration.
	pub emitting_thread: ThreadId,
	/// Name the emitter pre-registered under.
	pub emitting_thread_name: String,
	/// Role of the thread that drains the buffer.
	pub target_thread_name: String,
	/// Buffer built by the role's factory on the emitting thread.
	pub request_buffer: RequestBufferHandle,
	emitter_liveness: Weak<()>,
}

impl ThreadBufferMapping {
	/// Returns false once the emitting thread has exited.
	pub fn is_emitter_alive(&self) -> bool {
		self.emitter_liveness.strong_count() > 0
	}

	/// Returns the buffer if it has type `B`.
	pub fn buffer_as<B>(&self) -> Option<Arc<B>>
	where
		B: Any + Send + Sync,
	{
		Arc::clone(&self.request_buffer).downcast::<B>().ok()
	}

	/// Returns the composite key this mapping is stored under.
	pub fn key(&self) -> String {
		mapping_key(&self.emitting_thread_name, &self.target_thread_name)
	}
}

impl fmt::Debug for ThreadBufferMapping {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ThreadBufferMapping")
			.field("emitting_thread", &self.emitting_thread)
			.field("emitting_thread_name", &self.emitting_thread_name)
			.field("target_thread_name", &self.target_thread_name)
			.field("emitter_alive", &self.is_emitter_alive())
			.finish_non_exhaustive()
	}
}

fn mapping_key(emitting_thread_name: &str, target_thread_name: &str) -> String {
	let mut key = String::with_capacity(emitting_thread_name.len() + target_thread_name.len() + 1);
	key.push_str(emitting_thread_name);
	key.push('/');
	key.push_str(target_thread_name);
	key
}

/// Suppliers and the shared mapping table, under one lock.
#[derive(Default)]
struct RegistryState {
	suppliers: Vec<RequestBufferSupplier>,
	mappings: HashMap<String, ThreadBufferMapping>,
}

/// Shared table of buffer suppliers and pre-registered buffers.
///
/// Cloning yields another handle to the same table. Entries left behind by
/// exited threads are only dropped when a consumer claims its buffers.
#[derive(Default, Clone)]
pub struct BufferRegistry {
	inner: Arc<RwLock<RegistryState>>,
}

impl fmt::Debug for BufferRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.inner.read();
		f.debug_struct("BufferRegistry")
			.field("suppliers", &state.suppliers.len())
			.field("mappings", &state.mappings.len())
			.finish()
	}
}

impl BufferRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the process-wide registry.
	pub fn global() -> &'static Self {
		static GLOBAL: OnceLock<BufferRegistry> = OnceLock::new();
		GLOBAL.get_or_init(Self::new)
	}

	/// Registers `factory` as the buffer supplier for the receiving role `role`.
	///
	/// Registering a role twice adds a second supplier; pre-registration then
	/// calls both and the later one wins the mapping.
	pub fn register_supplier<F>(&self, role: impl Into<String>, factory: F) -> Result<()>
	where
		F: Fn(u32) -> RequestBufferHandle + Send + Sync + 'static,
	{
		self.push_supplier(role.into(), Some(Arc::new(factory)))
	}

	/// Registers a receiving role that wants no pre-allocated buffer.
	pub fn register_role(&self, role: impl Into<String>) -> Result<()> {
		self.push_supplier(role.into(), None)
	}

	fn push_supplier(&self, name: String, factory: Option<RequestBufferFactory>) -> Result<()> {
		validate_name(&name)?;
		tracing::debug!(role = %name, has_factory = factory.is_some(), "event_loop.register_supplier");
		self.inner.write().suppliers.push(RequestBufferSupplier { name, factory });
		Ok(())
	}

	/// Returns the registered suppliers in registration order.
	pub fn suppliers(&self) -> Vec<RequestBufferSupplier> {
		self.inner.read().suppliers.clone()
	}

	/// Allocates a buffer for every other role and publishes it for that role.
	///
	/// Runs each factory on the calling thread. Roles without a factory and
	/// the emitter's own role are skipped. A mapping already stored for the
	/// same emitter name and role is replaced; its buffer is abandoned.
	/// Returns the number of mappings published.
	pub fn pre_register(&self, emitting_thread_name: &str, num_requests: u32) -> Result<usize> {
		validate_name(emitting_thread_name)?;

		let targets: Vec<(String, RequestBufferFactory)> = {
			let state = self.inner.read();
			state
				.suppliers
				.iter()
				.filter_map(|supplier| {
					let Some(factory) = supplier.factory.as_ref() else {
						tracing::trace!(role = %supplier.name, "event_loop.pre_register.no_factory");
						return None;
					};
					if supplier.name == emitting_thread_name {
						tracing::trace!(role = %supplier.name, "event_loop.pre_register.self");
						return None;
					}
					Some((supplier.name.clone(), Arc::clone(factory)))
				})
				.collect()
		};

		let emitting_thread = thread::current().id();
		let emitter_liveness = liveness_token();
		let mappings: Vec<ThreadBufferMapping> = targets
			.into_iter()
			.map(|(target_thread_name, factory)| ThreadBufferMapping {
				emitting_thread,
				emitting_thread_name: emitting_thread_name.to_owned(),
				request_buffer: factory(num_requests),
				target_thread_name,
				emitter_liveness: emitter_liveness.clone(),
			})
			.collect();

		let published = mappings.len();
		let mut state = self.inner.write();
		for mapping in mappings {
			let key = mapping.key();
			if let Some(replaced) = state.mappings.insert(key, mapping) {
				tracing::debug!(
					emitter = %replaced.emitting_thread_name,
					role = %replaced.target_thread_name,
					emitter_alive = replaced.is_emitter_alive(),
					"event_loop.pre_register.replaced"
				);
			}
		}
		drop(state);

		tracing::debug!(emitter = emitting_thread_name, num_requests, published, "event_loop.pre_register");
		Ok(published)
	}

	/// Pre-registers with the capacity from `config`.
	pub fn pre_register_with(&self, config: &EventLoopConfig, emitting_thread_name: &str) -> Result<usize> {
		self.pre_register(emitting_thread_name, config.request_capacity)
	}

	/// Returns every mapping targeting `role`, sorted by emitter name.
	///
	/// Includes mappings whose emitting thread has exited.
	pub fn buffers_for_role(&self, role: &str) -> Vec<ThreadBufferMapping> {
		let state = self.inner.read();
		let mut found: Vec<_> = state.mappings.values().filter(|mapping| mapping.target_thread_name == role).cloned().collect();
		drop(state);
		found.sort_by(|a, b| a.emitting_thread_name.cmp(&b.emitting_thread_name));
		found
	}

	/// Drops stale mappings targeting `role` and returns the live ones, sorted by emitter name.
	pub fn claim_buffers_for_role(&self, role: &str) -> Vec<ThreadBufferMapping> {
		let mut state = self.inner.write();
		let before = state.mappings.len();
		state
			.mappings
			.retain(|_, mapping| mapping.target_thread_name != role || mapping.is_emitter_alive());
		let reaped = before - state.mappings.len();
		let mut found: Vec<_> = state.mappings.values().filter(|mapping| mapping.target_thread_name == role).cloned().collect();
		drop(state);

		if reaped > 0 {
			tracing::debug!(role, reaped, "event_loop.claim.reaped_stale");
		}
		found.sort_by(|a, b| a.emitting_thread_name.cmp(&b.emitting_thread_name));
		found
	}

	/// Claims buffers for `role`, reaping stale mappings only if `config` asks for it.
	pub fn claim_buffers_with(&self, config: &EventLoopConfig, role: &str) -> Vec<ThreadBufferMapping> {
		if config.reap_stale_on_claim {
			self.claim_buffers_for_role(role)
		} else {
			self.buffers_for_role(role)
		}
	}

	/// Returns the number of stored mappings.
	pub fn mapping_count(&self) -> usize {
		self.inner.read().mappings.len()
	}
}

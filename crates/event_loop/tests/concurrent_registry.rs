//! Registration, pre-registration and lookups racing on one registry.

use std::sync::{Arc, Barrier};
use std::thread;

use pretty_assertions::assert_eq;
use xeno_event_loop::{BufferRegistry, RequestBufferHandle, ThreadBufferMapping};

const ROLES: usize = 6;
const EMITTERS: usize = 6;
const ROUNDS: usize = 50;

/// Buffer recording who built it, so readers can cross-check every field of a mapping.
#[derive(Debug)]
struct Stamp {
	role: String,
}

fn check(mapping: &ThreadBufferMapping, role: &str) {
	assert_eq!(mapping.target_thread_name, role);
	assert_eq!(mapping.key(), format!("{}/{}", mapping.emitting_thread_name, role));
	assert!(mapping.emitting_thread_name.starts_with("emitter"));
	let stamp = mapping.buffer_as::<Stamp>().expect("buffer type");
	assert_eq!(stamp.role, role);
}

#[test]
fn lookups_never_observe_partial_mappings() {
	let registry = BufferRegistry::new();
	let barrier = Arc::new(Barrier::new(ROLES + EMITTERS + ROLES));
	let mut handles = Vec::new();

	for r in 0..ROLES {
		let registry = registry.clone();
		let barrier = Arc::clone(&barrier);
		handles.push(thread::spawn(move || {
			barrier.wait();
			let role = format!("role{r}");
			let tag = role.clone();
			registry
				.register_supplier(role, move |_| -> RequestBufferHandle { Arc::new(Stamp { role: tag.clone() }) })
				.unwrap();
		}));
	}

	for e in 0..EMITTERS {
		let registry = registry.clone();
		let barrier = Arc::clone(&barrier);
		handles.push(thread::spawn(move || {
			barrier.wait();
			for _ in 0..ROUNDS {
				registry.pre_register(&format!("emitter{e}"), 4).unwrap();
			}
		}));
	}

	for r in 0..ROLES {
		let registry = registry.clone();
		let barrier = Arc::clone(&barrier);
		handles.push(thread::spawn(move || {
			barrier.wait();
			let role = format!("role{r}");
			for _ in 0..ROUNDS {
				for mapping in registry.buffers_for_role(&role) {
					check(&mapping, &role);
				}
			}
		}));
	}

	for handle in handles {
		handle.join().unwrap();
	}

	assert_eq!(registry.suppliers().len(), ROLES);
	for r in 0..ROLES {
		let role = format!("role{r}");
		let found = registry.buffers_for_role(&role);
		assert!(found.len() <= EMITTERS);
		for mapping in &found {
			check(mapping, &role);
		}
	}

	// Once every supplier exists, one more round publishes the full matrix.
	let remote = registry.clone();
	thread::spawn(move || {
		for e in 0..EMITTERS {
			remote.pre_register(&format!("emitter{e}"), 4).unwrap();
		}
	})
	.join()
	.unwrap();
	assert_eq!(registry.mapping_count(), ROLES * EMITTERS);
}

//! In-flight request registry keyed by [`RequestKey`].

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
// self
use crate::{_prelude::*, request::RequestKey, response::ApiResponse};

/// Future shared by every caller of one deduplicated request.
pub(crate) type SharedResponse = Shared<BoxFuture<'static, Result<ApiResponse>>>;

struct Entry {
	id: u64,
	handle: WeakShared<BoxFuture<'static, Result<ApiResponse>>>,
}

/// Map from request signature to the pending call serving it.
///
/// Entries hold weak handles and are removed by the [`Release`] owned by their call, so an entry
/// lives exactly as long as the call it points to.
#[derive(Default)]
pub(crate) struct InFlightRegistry {
	entries: Mutex<HashMap<RequestKey, Entry>>,
	next_id: AtomicU64,
}
impl InFlightRegistry {
	/// Returns the pending call for `key`, or registers the one built by `make`.
	///
	/// `make` runs under the registry lock and receives a [`Release`] that the new future must
	/// own; dropping it removes the entry. The boolean is true when the caller joined an existing
	/// call.
	pub(crate) fn join_or_insert<F>(
		self: &Arc<Self>,
		key: RequestKey,
		make: F,
	) -> (SharedResponse, bool)
	where
		F: FnOnce(Release) -> BoxFuture<'static, Result<ApiResponse>>,
	{
		let mut entries = self.entries.lock();

		if let Some(shared) = entries.get(&key).and_then(|entry| entry.handle.upgrade()) {
			return (shared, true);
		}

		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let release = Release { registry: self.clone(), key: key.clone(), id };
		let shared = make(release).shared();

		if let Some(handle) = shared.downgrade() {
			entries.insert(key, Entry { id, handle });
		}

		(shared, false)
	}

	/// Number of pending calls.
	pub(crate) fn len(&self) -> usize {
		self.entries.lock().len()
	}

	/// Forgets every entry. Pending calls still complete for their current callers.
	pub(crate) fn clear(&self) {
		let drained = std::mem::take(&mut *self.entries.lock());

		drop(drained);
	}

	fn remove(&self, key: &RequestKey, id: u64) {
		let mut entries = self.entries.lock();

		if entries.get(key).is_some_and(|entry| entry.id == id) {
			entries.remove(key);
		}
	}
}
impl Debug for InFlightRegistry {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InFlightRegistry").field("len", &self.len()).finish()
	}
}

/// Removes its registry entry when dropped, whether the call settled or was abandoned.
pub(crate) struct Release {
	registry: Arc<InFlightRegistry>,
	key: RequestKey,
	id: u64,
}
impl Drop for Release {
	fn drop(&mut self) {
		self.registry.remove(&self.key, self.id);
	}
}

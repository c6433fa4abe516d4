//! Resumable `before` cursor plus a bounded recently-seen cache that suppresses repeats.

// std
use std::collections::VecDeque;
// self
use crate::{_prelude::*, listing::ListingItem};

/// Default number of fullnames remembered for duplicate suppression.
pub const DEFAULT_RECENT_CAPACITY: usize = 200;

/// Fixed-capacity set of fullnames evicting the least-recently-touched entry on overflow.
#[derive(Clone, Debug)]
pub struct RecentCache {
	capacity: usize,
	tick: u64,
	entries: HashMap<String, u64>,
	order: BTreeMap<u64, String>,
}
impl RecentCache {
	/// Creates an empty cache; a zero capacity is raised to one.
	pub fn new(capacity: usize) -> Self {
		Self {
			capacity: capacity.max(1),
			tick: 0,
			entries: HashMap::new(),
			order: BTreeMap::new(),
		}
	}

	/// Maximum number of fullnames retained.
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Number of fullnames currently retained.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns `true` when nothing has been recorded.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Returns `true` if `fullname` is retained. Does not refresh recency.
	pub fn contains(&self, fullname: &str) -> bool {
		self.entries.contains_key(fullname)
	}

	/// Records `fullname` as most recently seen, returning whether it was already present.
	pub fn touch(&mut self, fullname: &str) -> bool {
		self.tick += 1;

		if let Some(stamp) = self.entries.get_mut(fullname) {
			self.order.remove(stamp);
			*stamp = self.tick;
			self.order.insert(self.tick, fullname.to_owned());

			return true;
		}

		self.entries.insert(fullname.to_owned(), self.tick);
		self.order.insert(self.tick, fullname.to_owned());

		while self.entries.len() > self.capacity {
			let Some((_, evicted)) = self.order.pop_first() else { break };

			self.entries.remove(&evicted);
		}

		false
	}

	/// Forgets every fullname.
	pub fn clear(&mut self) {
		self.entries.clear();
		self.order.clear();
	}
}

/// Tracks the `before` cursor and the recently emitted fullnames of one session.
#[derive(Clone, Debug)]
pub struct CursorTracker {
	latest_before: Option<String>,
	recent: RecentCache,
}
impl CursorTracker {
	/// Creates a tracker with an unset cursor and an empty cache of `capacity` entries.
	pub fn new(capacity: usize) -> Self {
		Self { latest_before: None, recent: RecentCache::new(capacity) }
	}

	/// Current `before` cursor; `None` means "first page".
	pub fn cursor(&self) -> Option<&str> {
		self.latest_before.as_deref()
	}

	/// Recently-seen cache backing duplicate suppression.
	pub fn recent(&self) -> &RecentCache {
		&self.recent
	}

	/// Orders a fetched batch oldest first.
	///
	/// `child_count` is the number of children the server sent, malformed ones included. A
	/// response with no children resets the cursor: the referenced item most likely aged out
	/// of the server's window, so the next request starts again from the first page.
	pub fn begin_batch(
		&mut self,
		mut items: Vec<ListingItem>,
		child_count: usize,
	) -> VecDeque<ListingItem> {
		if child_count == 0 {
			self.latest_before = None;
		}

		items.sort_by_key(|item| item.sort_key);

		items.into()
	}

	/// Records one item of the current batch and reports whether it should be emitted.
	///
	/// The cursor moves to every item except the batch's last one, which stays behind as an
	/// overlap anchor for the next request.
	pub fn observe(&mut self, item: &ListingItem, is_last: bool) -> bool {
		let seen = self.recent.touch(&item.fullname);

		if !is_last {
			self.latest_before = Some(item.fullname.clone());
		}

		!seen
	}

	/// Processes a whole batch at once, returning the items to emit in order.
	pub fn absorb(&mut self, items: Vec<ListingItem>) -> Vec<ListingItem> {
		let child_count = items.len();
		let mut batch = self.begin_batch(items, child_count);
		let mut emitted = Vec::with_capacity(batch.len());

		while let Some(item) = batch.pop_front() {
			if self.observe(&item, batch.is_empty()) {
				emitted.push(item);
			}
		}

		emitted
	}

	/// Clears the cursor and the recently-seen cache.
	pub fn reset(&mut self) {
		self.latest_before = None;
		self.recent.clear();
	}
}
impl Default for CursorTracker {
	fn default() -> Self {
		Self::new(DEFAULT_RECENT_CAPACITY)
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::listing::parse_base36;

	fn item(id: &str) -> ListingItem {
		ListingItem {
			kind: "t3".into(),
			id: id.into(),
			fullname: format!("t3_{id}"),
			sort_key: parse_base36(id).expect("Test ids must be base-36."),
			data: json!({ "id": id }),
		}
	}

	fn names(items: &[ListingItem]) -> Vec<&str> {
		items.iter().map(|item| item.fullname.as_str()).collect()
	}

	#[test]
	fn fresh_batch_emits_all_and_withholds_last_from_cursor() {
		let mut tracker = CursorTracker::default();
		let emitted = tracker.absorb(vec![item("a1"), item("a2"), item("a3")]);

		assert_eq!(names(&emitted), ["t3_a1", "t3_a2", "t3_a3"]);
		assert_eq!(tracker.cursor(), Some("t3_a2"));
	}

	#[test]
	fn batch_is_sorted_oldest_first() {
		let mut tracker = CursorTracker::default();
		let emitted = tracker.absorb(vec![item("c"), item("a"), item("zz"), item("b")]);

		assert_eq!(names(&emitted), ["t3_a", "t3_b", "t3_c", "t3_zz"]);
		assert!(emitted.windows(2).all(|pair| pair[0].sort_key <= pair[1].sort_key));
		assert_eq!(tracker.cursor(), Some("t3_c"));
	}

	#[test]
	fn overlapping_batches_do_not_repeat_items() {
		let mut tracker = CursorTracker::default();

		tracker.absorb(vec![item("a1"), item("a2"), item("a3")]);

		let emitted = tracker.absorb(vec![item("a3"), item("a4"), item("a5")]);

		assert_eq!(names(&emitted), ["t3_a4", "t3_a5"]);
		assert_eq!(tracker.cursor(), Some("t3_a4"));
	}

	#[test]
	fn single_item_batch_keeps_previous_cursor() {
		let mut tracker = CursorTracker::default();

		tracker.absorb(vec![item("a1"), item("a2")]);

		let emitted = tracker.absorb(vec![item("a2")]);

		assert!(emitted.is_empty());
		assert_eq!(tracker.cursor(), Some("t3_a1"));
	}

	#[test]
	fn empty_batch_resets_cursor_but_keeps_cache() {
		let mut tracker = CursorTracker::default();

		tracker.absorb(vec![item("a1"), item("a2")]);

		assert!(tracker.absorb(Vec::new()).is_empty());
		assert_eq!(tracker.cursor(), None);
		assert!(tracker.recent().contains("t3_a1"));
	}

	#[test]
	fn batch_of_only_malformed_children_keeps_cursor() {
		let mut tracker = CursorTracker::default();

		tracker.absorb(vec![item("a1"), item("a2")]);

		assert!(tracker.begin_batch(Vec::new(), 2).is_empty());
		assert_eq!(tracker.cursor(), Some("t3_a1"));

		tracker.begin_batch(Vec::new(), 0);

		assert_eq!(tracker.cursor(), None);
	}

	#[test]
	fn cache_evicts_least_recently_touched() {
		let mut cache = RecentCache::new(2);

		assert!(!cache.touch("a"));
		assert!(!cache.touch("b"));
		assert!(cache.touch("a"));
		assert!(!cache.touch("c"));
		assert!(cache.contains("a"));
		assert!(!cache.contains("b"));
		assert_eq!(cache.len(), 2);
	}

	#[test]
	fn no_repeat_within_capacity_window() {
		let mut tracker = CursorTracker::new(DEFAULT_RECENT_CAPACITY);
		let ids = (1..=DEFAULT_RECENT_CAPACITY as u64).map(|n| format!("{n:x}")).collect::<Vec<_>>();
		let first = ids.iter().map(|id| item(id)).collect::<Vec<_>>();

		assert_eq!(tracker.absorb(first).len(), DEFAULT_RECENT_CAPACITY);

		let replay = ids.iter().map(|id| item(id)).collect::<Vec<_>>();

		assert!(tracker.absorb(replay).is_empty());
		assert_eq!(tracker.recent().len(), DEFAULT_RECENT_CAPACITY);
	}

	#[test]
	fn reset_clears_cursor_and_cache() {
		let mut tracker = CursorTracker::default();

		tracker.absorb(vec![item("a1"), item("a2")]);
		tracker.reset();

		assert_eq!(tracker.cursor(), None);
		assert!(tracker.recent().is_empty());
	}
}

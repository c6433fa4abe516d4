//! Listing children and the base-36 ordering key derived from their identifiers.

// crates.io
use serde_json::Value;
// self
use crate::_prelude::*;

/// Reasons a child record is dropped from an otherwise valid page.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ItemError {
	/// The child has no `data` object.
	#[error("Child has no data object.")]
	MissingData,
	/// The child's data has no string `id`.
	#[error("Child data has no string id.")]
	MissingId,
	/// The `id` is not a base-36 number that fits in 64 bits.
	#[error("Child id {id:?} is not a base-36 identifier.")]
	InvalidId {
		/// Raw identifier.
		id: String,
	},
	/// Neither `data.name` nor the child's `kind` is available to build the fullname.
	#[error("Child {id:?} has neither a name nor a kind.")]
	MissingFullname {
		/// Raw identifier.
		id: String,
	},
}

/// One listing child, keyed by its fullname and ordered by its base-36 identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct ListingItem {
	/// Child kind, e.g. `t3`.
	pub kind: String,
	/// Base-36 identifier.
	pub id: String,
	/// Composite `kind_id` identifier.
	pub fullname: String,
	/// Numeric value of `id`, increasing with item age order.
	pub sort_key: u64,
	/// Raw `data` object as delivered by the server.
	pub data: Value,
}
impl ListingItem {
	/// Parses one element of the response's `children` array.
	pub fn from_child(child: &Value) -> Result<Self, ItemError> {
		let data = child.get("data").filter(|data| data.is_object()).ok_or(ItemError::MissingData)?;
		let id = data.get("id").and_then(Value::as_str).ok_or(ItemError::MissingId)?;
		let sort_key = parse_base36(id).ok_or_else(|| ItemError::InvalidId { id: id.into() })?;
		let kind = child.get("kind").and_then(Value::as_str);
		let name = data.get("name").and_then(Value::as_str);
		let (kind, fullname) = match (kind, name) {
			(Some(kind), Some(name)) => (kind.to_owned(), name.to_owned()),
			(Some(kind), None) => (kind.to_owned(), format!("{kind}_{id}")),
			(None, Some(name)) => {
				let kind = name.split_once('_').map_or(name, |(kind, _)| kind);

				(kind.to_owned(), name.to_owned())
			},
			(None, None) => return Err(ItemError::MissingFullname { id: id.into() }),
		};

		Ok(Self { kind, id: id.to_owned(), fullname, sort_key, data: data.clone() })
	}

	/// Consumes the item, returning the raw `data` object handed to consumers.
	pub fn into_data(self) -> Value {
		self.data
	}
}

/// Parses a base-36 identifier; signs, empty strings, and overflow are rejected.
pub fn parse_base36(id: &str) -> Option<u64> {
	if id.is_empty() || !id.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
		return None;
	}

	u64::from_str_radix(id, 36).ok()
}

#[cfg(test)]
mod tests {
	// crates.io
	use serde_json::json;
	// self
	use super::*;

	#[test]
	fn base36_matches_reddit_ids() {
		assert_eq!(parse_base36("z"), Some(35));
		assert_eq!(parse_base36("10"), Some(36));
		assert_eq!(parse_base36("1a2b3c"), Some(77_370_024));
		assert_eq!(parse_base36(""), None);
		assert_eq!(parse_base36("+1"), None);
		assert_eq!(parse_base36("a_b"), None);
		assert_eq!(parse_base36("zzzzzzzzzzzzzzzzzzzz"), None);
	}

	#[test]
	fn child_uses_name_or_falls_back_to_kind_and_id() {
		let named = json!({"kind": "t3", "data": {"id": "abc", "name": "t3_abc", "title": "x"}});
		let item = ListingItem::from_child(&named).expect("Named child should parse.");

		assert_eq!(item.fullname, "t3_abc");
		assert_eq!(item.kind, "t3");
		assert_eq!(item.data["title"], "x");

		let unnamed = json!({"kind": "t1", "data": {"id": "def"}});
		let item = ListingItem::from_child(&unnamed).expect("Unnamed child should parse.");

		assert_eq!(item.fullname, "t1_def");

		let kindless = json!({"data": {"id": "ghi", "name": "t5_ghi"}});
		let item = ListingItem::from_child(&kindless).expect("Kindless child should parse.");

		assert_eq!(item.kind, "t5");
	}

	#[test]
	fn malformed_children_are_reported() {
		assert_eq!(ListingItem::from_child(&json!({"kind": "t3"})), Err(ItemError::MissingData));
		assert_eq!(
			ListingItem::from_child(&json!({"kind": "t3", "data": {"name": "t3_x"}})),
			Err(ItemError::MissingId)
		);
		assert_eq!(
			ListingItem::from_child(&json!({"kind": "t3", "data": {"id": "not-b36"}})),
			Err(ItemError::InvalidId { id: "not-b36".into() })
		);
		assert_eq!(
			ListingItem::from_child(&json!({"data": {"id": "abc"}})),
			Err(ItemError::MissingFullname { id: "abc".into() })
		);
	}
}

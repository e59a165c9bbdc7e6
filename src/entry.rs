//! Decoded directory entries.
use crate::value::Value;

/// Name of the attribute holding the full path of an entry.
pub const DISTINGUISHED_NAME: &str = "distinguishedname";
/// Name of the attribute holding the object class hierarchy.
pub const OBJECT_CLASS: &str = "objectclass";
/// Name of the attribute holding a provider object path.
pub const ADS_PATH: &str = "adspath";

/// An ordered attribute map with case-insensitive names.
///
/// Names are ASCII lower-cased on insertion and compared ASCII
/// case-insensitively, so `get("sAMAccountName")` and
/// `get("samaccountname")` refer to the same attribute. Empty strings are
/// stored as [`Value::Null`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entry {
	/// Attributes in insertion order, names lower-cased
	attributes: Vec<(String, Value)>,
}

impl Entry {
	/// An entry without attributes.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Get an attribute value. Returns `None` if the attribute is not present.
	#[must_use]
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.position(name).map(|i| &self.attributes[i].1)
	}

	/// Get a mutable reference to an attribute value.
	pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
		self.position(name).map(|i| &mut self.attributes[i].1)
	}

	/// Whether the attribute is present, even if it holds no value.
	#[must_use]
	pub fn has(&self, name: &str) -> bool {
		self.position(name).is_some()
	}

	/// Whether the attribute is absent or holds no value.
	#[must_use]
	pub fn is_empty_attribute(&self, name: &str) -> bool {
		self.get(name).map_or(true, Value::is_null)
	}

	/// Set an attribute, replacing any previous value in place.
	pub fn set(&mut self, name: &str, value: impl Into<Value>) {
		let value = match value.into() {
			Value::String(s) if s.is_empty() => Value::Null,
			value => value,
		};
		match self.position(name) {
			Some(i) => self.attributes[i].1 = value,
			None => self.attributes.push((name.to_ascii_lowercase(), value)),
		}
	}

	/// Remove an attribute, returning its value.
	pub fn remove(&mut self, name: &str) -> Option<Value> {
		self.position(name).map(|i| self.attributes.remove(i).1)
	}

	/// The attributes in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.attributes.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// The attribute names in insertion order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.attributes.iter().map(|(k, _)| k.as_str())
	}

	/// Number of attributes.
	#[must_use]
	pub fn len(&self) -> usize {
		self.attributes.len()
	}

	/// Whether the entry has no attributes.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.attributes.is_empty()
	}

	/// Get the first string of an attribute.
	#[must_use]
	pub fn first_str(&self, name: &str) -> Option<&str> {
		self.get(name)?.first_str()
	}

	/// Get all strings of an attribute.
	#[must_use]
	pub fn strings(&self, name: &str) -> Vec<&str> {
		self.get(name).map(Value::strings).unwrap_or_default()
	}

	/// Whether the provider only returned an object path for this entry, as
	/// happens for wildcard selections.
	#[must_use]
	pub fn is_ads_path_only(&self) -> bool {
		self.len() == 1 && self.has(ADS_PATH)
	}

	/// Index of an attribute.
	fn position(&self, name: &str) -> Option<usize> {
		self.attributes.iter().position(|(k, _)| k.eq_ignore_ascii_case(name))
	}
}

impl<N: AsRef<str>, V: Into<Value>> FromIterator<(N, V)> for Entry {
	fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
		let mut entry = Entry::new();
		for (name, value) in iter {
			entry.set(name.as_ref(), value);
		}
		entry
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::Entry;
	use crate::value::Value;

	#[test]
	fn get() {
		let entry: Entry =
			[("Name", Value::from(vec!["Foo Bar", "Bar McBaz"])), ("sAMAccountName", "foo".into())]
				.into_iter()
				.collect();
		assert_eq!(
			entry.get("attribute_does_not_exist"),
			None,
			"Undefined attributes should return None"
		);
		assert_eq!(entry.first_str("NAME"), Some("Foo Bar"), "Should return the first value");
		assert_eq!(entry.first_str("samaccountname"), Some("foo"));
		assert_eq!(entry.names().collect::<Vec<_>>(), ["name", "samaccountname"]);
	}

	#[test]
	fn set_replaces_in_place() {
		let mut entry = Entry::new();
		entry.set("a", 1_i64);
		entry.set("B", 2_i64);
		entry.set("A", 3_i64);
		assert_eq!(
			entry.iter().collect::<Vec<_>>(),
			[("a", &Value::Integer(3)), ("b", &Value::Integer(2))]
		);
	}

	#[test]
	fn non_ascii_names() {
		let mut entry = Entry::new();
		entry.set("Ädresse", "x");
		entry.set("ÄDRESSE", "y");
		assert_eq!(entry.first_str("Ädresse"), Some("y"));
		assert_eq!(entry.names().collect::<Vec<_>>(), ["Ädresse"]);
	}

	#[test]
	fn empty_string_is_null() {
		let mut entry = Entry::new();
		entry.set("description", "");
		assert!(entry.has("description"));
		assert!(entry.is_empty_attribute("description"));
		assert!(entry.is_empty_attribute("missing"));
	}

	#[test]
	fn ads_path_only() {
		let mut entry = Entry::new();
		entry.set("ADsPath", "LDAP://CN=x,DC=y");
		assert!(entry.is_ads_path_only());
		entry.set("cn", "x");
		assert!(!entry.is_ads_path_only());
	}

	proptest! {
		#[test]
		fn missing_attributes_are_absent(
			keys in proptest::collection::vec("[a-z]{1,8}", 0..8),
			absent in "[A-Z]{9,12}",
		) {
			let entry: Entry = keys.iter().map(|k| (k.as_str(), Value::from(k.as_str()))).collect();
			prop_assert!(!entry.has(&absent));
			prop_assert!(entry.get(&absent).is_none());
		}
	}
}

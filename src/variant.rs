//! Loosely typed field values as handed over by a directory provider.
//!
//! Providers report each field as a type tag plus a raw value. The tags are the
//! automation/ADO data type numbers, grouped into a handful of [`TypeKind`]s
//! which decide how the [`Decoder`](crate::decoder::Decoder) interprets the
//! raw value.
use std::{collections::HashMap, sync::LazyLock};

use ldap3::SearchEntry;

use crate::value::SecurityDescriptor;

/// Type tag constants reported by automation providers.
pub mod tags {
	/// No value
	pub const EMPTY: u16 = 0;
	/// 32-bit signed integer
	pub const I4: u16 = 3;
	/// Double precision float
	pub const R8: u16 = 5;
	/// Automation date (days since 1899-12-30)
	pub const DATE: u16 = 7;
	/// Automation object reference
	pub const DISPATCH: u16 = 9;
	/// Boolean
	pub const BOOL: u16 = 11;
	/// Variant (container for another value, or an array of them)
	pub const VARIANT: u16 = 12;
	/// 64-bit signed integer
	pub const I8: u16 = 20;
	/// Fixed length wide string
	pub const WCHAR: u16 = 130;
	/// Variable length string
	pub const VARCHAR: u16 = 200;
	/// Long variable length string
	pub const LONG_VARCHAR: u16 = 201;
	/// Variable length wide string
	pub const VAR_WCHAR: u16 = 202;
	/// Variable length binary
	pub const VAR_BINARY: u16 = 204;
	/// Array of variants
	pub const ARRAY_VARIANT: u16 = 8204;
}

/// Semantic grouping of type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
	/// Integral values
	Integer,
	/// Text
	String,
	/// Automation objects: large integers (file times) and security descriptors
	Object,
	/// Byte arrays
	Binary,
	/// Automation dates
	Date,
	/// Booleans
	Boolean,
}

/// Tag to kind lookup, built once on first use.
static TYPE_KINDS: LazyLock<HashMap<u16, TypeKind>> = LazyLock::new(|| {
	[
		(TypeKind::Integer, &[tags::I4, tags::I8][..]),
		(TypeKind::String, &[tags::WCHAR, tags::VARCHAR, tags::LONG_VARCHAR, tags::VAR_WCHAR][..]),
		(TypeKind::Object, &[tags::DISPATCH][..]),
		(TypeKind::Binary, &[tags::VAR_BINARY][..]),
		(TypeKind::Date, &[tags::DATE, tags::R8][..]),
		(TypeKind::Boolean, &[tags::BOOL][..]),
	]
	.into_iter()
	.flat_map(|(kind, tags)| tags.iter().map(move |tag| (*tag, kind)))
	.collect()
});

impl TypeKind {
	/// The kind a type tag belongs to, or `None` for unmapped tags.
	#[must_use]
	pub fn of(tag: u16) -> Option<Self> {
		TYPE_KINDS.get(&tag).copied()
	}
}

/// Whether values with this tag hold an array of nested variants.
#[must_use]
pub fn is_array_tag(tag: u16) -> bool {
	matches!(tag, tags::VARIANT | tags::ARRAY_VARIANT)
}

/// The untyped payload of a [`Variant`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
	/// Nothing
	Null,
	/// An integer
	Integer(i64),
	/// A floating point number
	Float(f64),
	/// Text
	Text(String),
	/// Bytes
	Bytes(Vec<u8>),
	/// A boolean
	Boolean(bool),
	/// A 64-bit integer object split into its high and low 32-bit words
	LargeInteger {
		/// Upper word
		high: i32,
		/// Lower word, as reported (may be negative)
		low: i32,
	},
	/// A security descriptor object
	Descriptor(SecurityDescriptor),
	/// Nested variants
	Array(Vec<Variant>),
}

/// A tagged field value.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
	/// Type tag, see [`tags`]
	pub tag: u16,
	/// The raw value
	pub value: RawValue,
}

impl Variant {
	/// A variant with an explicit tag.
	#[must_use]
	pub fn new(tag: u16, value: RawValue) -> Self {
		Self { tag, value }
	}

	/// An empty variant.
	#[must_use]
	pub fn empty() -> Self {
		Self::new(tags::EMPTY, RawValue::Null)
	}

	/// A wide string variant.
	#[must_use]
	pub fn string(value: impl Into<String>) -> Self {
		Self::new(tags::VAR_WCHAR, RawValue::Text(value.into()))
	}

	/// A 64-bit integer variant.
	#[must_use]
	pub fn integer(value: i64) -> Self {
		Self::new(tags::I8, RawValue::Integer(value))
	}

	/// A boolean variant.
	#[must_use]
	pub fn boolean(value: bool) -> Self {
		Self::new(tags::BOOL, RawValue::Boolean(value))
	}

	/// A binary variant.
	#[must_use]
	pub fn binary(value: impl Into<Vec<u8>>) -> Self {
		Self::new(tags::VAR_BINARY, RawValue::Bytes(value.into()))
	}

	/// An automation date variant.
	#[must_use]
	pub fn date(value: f64) -> Self {
		Self::new(tags::DATE, RawValue::Float(value))
	}

	/// A large integer (file time) object variant.
	#[must_use]
	pub fn large_integer(high: i32, low: i32) -> Self {
		Self::new(tags::DISPATCH, RawValue::LargeInteger { high, low })
	}

	/// A large integer object variant from a full 64-bit value.
	#[must_use]
	#[allow(clippy::cast_possible_truncation)]
	pub fn filetime(ticks: i64) -> Self {
		Self::large_integer((ticks >> 32) as i32, ticks as i32)
	}

	/// An array of variants.
	#[must_use]
	pub fn array(values: Vec<Variant>) -> Self {
		Self::new(tags::ARRAY_VARIANT, RawValue::Array(values))
	}
}

/// A named field of a raw record.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
	/// Field name as reported by the provider
	pub name: String,
	/// Field value
	pub value: Variant,
}

/// A raw record: the ordered fields of one search result row or object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
	/// The fields, in provider order
	fields: Vec<RawField>,
}

impl RawEntry {
	/// An empty record.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Append a field.
	pub fn push(&mut self, name: impl Into<String>, value: Variant) {
		self.fields.push(RawField { name: name.into(), value });
	}

	/// Builder style [`RawEntry::push`].
	#[must_use]
	pub fn with(mut self, name: impl Into<String>, value: Variant) -> Self {
		self.push(name, value);
		self
	}

	/// The fields in provider order.
	#[must_use]
	pub fn fields(&self) -> &[RawField] {
		&self.fields
	}

	/// Look up a field by name, ignoring case.
	#[must_use]
	pub fn field(&self, name: &str) -> Option<&Variant> {
		self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)).map(|f| &f.value)
	}

	/// Number of fields.
	#[must_use]
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Whether the record has no fields.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

impl<N: Into<String>> FromIterator<(N, Variant)> for RawEntry {
	fn from_iter<T: IntoIterator<Item = (N, Variant)>>(iter: T) -> Self {
		Self {
			fields: iter
				.into_iter()
				.map(|(name, value)| RawField { name: name.into(), value })
				.collect(),
		}
	}
}

/// Wrap the values of a multi-valued attribute, keeping single values scalar.
fn collapse(mut values: Vec<Variant>) -> Option<Variant> {
	match values.len() {
		0 => None,
		1 => values.pop(),
		_ => Some(Variant::array(values)),
	}
}

impl From<SearchEntry> for RawEntry {
	/// Convert an `ldap3` search result. Text values become string variants,
	/// binary values binary variants, and the entry DN is reported as the
	/// `distinguishedName` field. Attributes are ordered by name.
	fn from(entry: SearchEntry) -> Self {
		let mut raw = RawEntry::new().with("distinguishedName", Variant::string(entry.dn));

		let mut attrs: Vec<_> = entry
			.attrs
			.into_iter()
			.filter_map(|(name, values)| {
				collapse(values.into_iter().map(Variant::string).collect()).map(|v| (name, v))
			})
			.chain(entry.bin_attrs.into_iter().filter_map(|(name, values)| {
				collapse(values.into_iter().map(Variant::binary).collect()).map(|v| (name, v))
			}))
			.filter(|(name, _)| !name.eq_ignore_ascii_case("distinguishedName"))
			.collect();
		attrs.sort_by(|(a, _), (b, _)| a.cmp(b));

		for (name, value) in attrs {
			raw.push(name, value);
		}
		raw
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use ldap3::SearchEntry;

	use super::{tags, RawEntry, RawValue, TypeKind, Variant};

	#[test]
	fn kinds() {
		assert_eq!(TypeKind::of(tags::I4), Some(TypeKind::Integer));
		assert_eq!(TypeKind::of(tags::VAR_WCHAR), Some(TypeKind::String));
		assert_eq!(TypeKind::of(tags::VAR_BINARY), Some(TypeKind::Binary));
		assert_eq!(TypeKind::of(tags::R8), Some(TypeKind::Date));
		assert_eq!(TypeKind::of(9999), None);
	}

	#[test]
	fn filetime_split() {
		let variant = Variant::filetime(0x01D0_0000_8000_0001);
		assert_eq!(variant.value, RawValue::LargeInteger { high: 0x01D0_0000, low: -0x7FFF_FFFF });
	}

	#[test]
	fn from_search_entry() {
		let entry = SearchEntry {
			dn: "CN=Foo,DC=example,DC=com".to_owned(),
			attrs: HashMap::from([
				("cn".to_owned(), vec!["Foo".to_owned()]),
				("memberOf".to_owned(), vec!["CN=A,DC=x".to_owned(), "CN=B,DC=x".to_owned()]),
				("description".to_owned(), vec![]),
			]),
			bin_attrs: HashMap::from([("objectGUID".to_owned(), vec![vec![0_u8; 16]])]),
		};
		let raw = RawEntry::from(entry);

		assert_eq!(raw.fields()[0].name, "distinguishedName");
		assert_eq!(raw.len(), 4, "empty attributes are dropped");
		assert_eq!(raw.field("CN"), Some(&Variant::string("Foo")));
		assert!(matches!(raw.field("memberof"), Some(Variant { tag: tags::ARRAY_VARIANT, .. })));
		assert_eq!(raw.field("objectguid"), Some(&Variant::binary(vec![0_u8; 16])));
	}
}

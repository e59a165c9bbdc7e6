//! Normalized attribute values.
use time::{macros::datetime, OffsetDateTime};

/// The zero point of directory file times, 1601-01-01T00:00:00Z. A file time
/// of zero decodes to this instant rather than to the Unix epoch.
pub const LDAP_EPOCH: OffsetDateTime = datetime!(1601-01-01 0:00 UTC);

/// Seconds between the file time epoch and the Unix epoch, negated.
pub(crate) const FILETIME_UNIX_OFFSET: i64 = -11_644_473_600;

/// Owner, group and control information of an NT security descriptor object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDescriptor {
	/// Control flags
	pub control: i64,
	/// Group principal
	pub group: String,
	/// Owner principal
	pub owner: String,
	/// Descriptor revision
	pub revision: i64,
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	/// No value.
	Null,
	/// Any integral value.
	Integer(i64),
	/// A floating point number of an unmapped type.
	Float(f64),
	/// Text, including GUID, SID and base64 renderings of binary values.
	String(String),
	/// A boolean flag.
	Boolean(bool),
	/// A point in time.
	Timestamp(OffsetDateTime),
	/// Raw bytes which were not decoded further.
	Binary(Vec<u8>),
	/// A security descriptor object.
	Descriptor(SecurityDescriptor),
	/// A multi-valued attribute.
	List(Vec<Value>),
}

impl Value {
	/// Borrow the text of a string value.
	#[must_use]
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			_ => None,
		}
	}

	/// The integer of an integer value.
	#[must_use]
	pub fn as_i64(&self) -> Option<i64> {
		match *self {
			Value::Integer(i) => Some(i),
			_ => None,
		}
	}

	/// The flag of a boolean value.
	#[must_use]
	pub fn as_bool(&self) -> Option<bool> {
		match *self {
			Value::Boolean(b) => Some(b),
			_ => None,
		}
	}

	/// The instant of a timestamp value.
	#[must_use]
	pub fn as_timestamp(&self) -> Option<OffsetDateTime> {
		match *self {
			Value::Timestamp(t) => Some(t),
			_ => None,
		}
	}

	/// Whether this is [`Value::Null`]
	#[must_use]
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// The first string of this value: the value itself if it is a string, or
	/// the first string element of a list.
	#[must_use]
	pub fn first_str(&self) -> Option<&str> {
		match self {
			Value::String(s) => Some(s),
			Value::List(values) => values.iter().find_map(Value::as_str),
			_ => None,
		}
	}

	/// All strings of this value. A single string yields itself, a list yields
	/// its string elements, everything else yields nothing.
	#[must_use]
	pub fn strings(&self) -> Vec<&str> {
		match self {
			Value::String(s) => vec![s.as_str()],
			Value::List(values) => values.iter().filter_map(Value::as_str).collect(),
			_ => Vec::new(),
		}
	}
}

impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Value::String(value.to_owned())
	}
}

impl From<String> for Value {
	fn from(value: String) -> Self {
		Value::String(value)
	}
}

impl From<i64> for Value {
	fn from(value: i64) -> Self {
		Value::Integer(value)
	}
}

impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Value::Boolean(value)
	}
}

impl From<OffsetDateTime> for Value {
	fn from(value: OffsetDateTime) -> Self {
		Value::Timestamp(value)
	}
}

impl<T: Into<Value>> From<Vec<T>> for Value {
	fn from(values: Vec<T>) -> Self {
		Value::List(values.into_iter().map(Into::into).collect())
	}
}

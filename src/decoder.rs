//! Decoding of tagged provider values into normalized [`Value`]s.
//!
//! Decoding is total: every variant produces a value (or nothing, for empty
//! arrays), and unmapped type tags pass their raw value through unchanged.
use std::fmt;

use base64::Engine as _;
use time::OffsetDateTime;
use tracing::warn;

use crate::{
	dn::{self, split_unescaped},
	entry::{Entry, DISTINGUISHED_NAME},
	models::DirectoryObject,
	value::{Value, FILETIME_UNIX_OFFSET, LDAP_EPOCH},
	variant::{RawEntry, RawValue, TypeKind, Variant},
};

/// File time ticks per second (100ns resolution).
const TICKS_PER_SECOND: i64 = 10_000_000;
/// Seconds from the automation date base (1899-12-30) to the Unix epoch.
const VARIANT_DATE_UNIX_OFFSET: i64 = 2_209_161_600;
/// Seconds per day.
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Turns raw provider records into entries and typed objects.
///
/// Implement this to customize decoding or classification and install it with
/// [`Directory::set_parser`](crate::directory::Directory::set_parser).
pub trait Parser: fmt::Debug + Send + Sync {
	/// Decode all fields of a record. `container_name_only` collapses
	/// container paths to their common name, except for the
	/// `distinguishedName` attribute.
	fn parse_entry(&self, raw: &RawEntry, container_name_only: bool) -> Entry;

	/// Turn a decoded entry into a typed object.
	fn classify(&self, entry: Entry) -> DirectoryObject {
		DirectoryObject::classify(entry)
	}
}

/// The standard decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Parser for Decoder {
	fn parse_entry(&self, raw: &RawEntry, container_name_only: bool) -> Entry {
		let mut entry = Entry::new();
		for field in raw.fields() {
			if let Some(value) = self.decode_field(&field.name, &field.value, container_name_only) {
				entry.set(&field.name, value);
			}
		}
		entry
	}
}

impl Decoder {
	/// Decode the value of a named field. The `distinguishedName` attribute is
	/// always decoded as a full path.
	#[must_use]
	pub fn decode_field(
		&self,
		name: &str,
		variant: &Variant,
		container_name_only: bool,
	) -> Option<Value> {
		let container_name_only =
			container_name_only && !name.eq_ignore_ascii_case(DISTINGUISHED_NAME);
		self.decode(variant, container_name_only)
	}

	/// Decode a single variant. Returns `None` for empty arrays.
	#[must_use]
	pub fn decode(&self, variant: &Variant, container_name_only: bool) -> Option<Value> {
		if let RawValue::Array(items) = &variant.value {
			if items.is_empty() {
				return None;
			}
			let values =
				items.iter().filter_map(|item| self.decode(item, container_name_only)).collect();
			return Some(Value::List(values));
		}

		let value = &variant.value;
		Some(match TypeKind::of(variant.tag) {
			Some(TypeKind::Integer) => Value::Integer(raw_integer(value).unwrap_or(0)),
			Some(TypeKind::String) => decode_string(&raw_text(value), container_name_only),
			Some(TypeKind::Object) => decode_object(value),
			Some(TypeKind::Binary) => decode_binary(value),
			Some(TypeKind::Date) => decode_date(value),
			Some(TypeKind::Boolean) => Value::Boolean(raw_truthy(value)),
			None => passthrough(value),
		})
	}
}

/// The raw value unchanged, as far as [`Value`] can represent it.
fn passthrough(value: &RawValue) -> Value {
	match value {
		RawValue::Null => Value::Null,
		RawValue::Integer(i) => Value::Integer(*i),
		RawValue::Float(f) => Value::Float(*f),
		RawValue::Text(s) => Value::String(s.clone()),
		RawValue::Bytes(b) => Value::Binary(b.clone()),
		RawValue::Boolean(b) => Value::Boolean(*b),
		RawValue::LargeInteger { high, low } => Value::Integer(join_words(*high, *low)),
		RawValue::Descriptor(d) => Value::Descriptor(d.clone()),
		RawValue::Array(items) => {
			Value::List(items.iter().map(|item| passthrough(&item.value)).collect())
		}
	}
}

/// Combine the words of a large integer. The low word is reported signed, so
/// it is reinterpreted as unsigned before joining.
#[allow(clippy::cast_sign_loss)]
fn join_words(high: i32, low: i32) -> i64 {
	(i64::from(high) << 32) | i64::from(low as u32)
}

/// Integer interpretation of a raw value.
#[allow(clippy::cast_possible_truncation)]
fn raw_integer(value: &RawValue) -> Option<i64> {
	match value {
		RawValue::Integer(i) => Some(*i),
		RawValue::Float(f) if f.is_finite() => Some(f.trunc() as i64),
		RawValue::Text(s) => s.trim().parse().ok(),
		RawValue::Boolean(b) => Some(i64::from(*b)),
		RawValue::LargeInteger { high, low } => Some(join_words(*high, *low)),
		RawValue::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
		_ => None,
	}
}

/// Text interpretation of a raw value, normalizing the character set of byte
/// strings to UTF-8.
fn raw_text(value: &RawValue) -> String {
	match value {
		RawValue::Text(s) => s.clone(),
		RawValue::Bytes(b) => bytes_to_string(b),
		RawValue::Integer(i) => i.to_string(),
		RawValue::Float(f) => f.to_string(),
		RawValue::Boolean(true) => "1".to_owned(),
		RawValue::LargeInteger { high, low } => join_words(*high, *low).to_string(),
		RawValue::Boolean(false)
		| RawValue::Null
		| RawValue::Descriptor(_)
		| RawValue::Array(_) => String::new(),
	}
}

/// Decode UTF-8, reading only the bytes that are not valid UTF-8 as Latin-1.
fn bytes_to_string(bytes: &[u8]) -> String {
	let mut text = String::with_capacity(bytes.len());
	for chunk in bytes.utf8_chunks() {
		text.push_str(chunk.valid());
		text.extend(chunk.invalid().iter().copied().map(char::from));
	}
	text
}

/// Boolean interpretation of a raw value.
fn raw_truthy(value: &RawValue) -> bool {
	match value {
		RawValue::Boolean(b) => *b,
		RawValue::Integer(i) => *i != 0,
		RawValue::Float(f) => f.abs() > f64::EPSILON,
		RawValue::Text(s) => match s.as_str() {
			"TRUE" => true,
			"FALSE" | "" | "0" => false,
			_ => true,
		},
		RawValue::Bytes(b) => !b.is_empty(),
		RawValue::LargeInteger { high, low } => *high != 0 || *low != 0,
		RawValue::Descriptor(_) => true,
		RawValue::Array(items) => !items.is_empty(),
		RawValue::Null => false,
	}
}

/// Decode a string: expand `\XX` hex escapes, then optionally collapse a
/// container path to its common name.
fn decode_string(text: &str, container_name_only: bool) -> Value {
	let text = unescape_hex(text);
	if container_name_only {
		if let Some(name) = container_name(&text) {
			return Value::String(name);
		}
	}
	Value::String(text)
}

/// Replace every `\XX` hex escape with the byte it encodes.
pub(crate) fn unescape_hex(text: &str) -> String {
	if !text.contains('\\') {
		return text.to_owned();
	}
	let bytes = text.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		match (bytes[i], dn::hex_pair(bytes, i + 1)) {
			(b'\\', Some(byte)) => {
				out.push(byte);
				i += 3;
			}
			(byte, _) => {
				out.push(byte);
				i += 1;
			}
		}
	}
	bytes_to_string(&out)
}

/// The common name of a container path: text starting with `CN=` that has
/// more than one comma separated component.
fn container_name(text: &str) -> Option<String> {
	let prefix = text.get(..3)?;
	if !prefix.eq_ignore_ascii_case("CN=") {
		return None;
	}
	let parts = split_unescaped(text, ',');
	if parts.len() < 2 {
		return None;
	}
	Some(dn::unescape(&parts[0][3..]))
}

/// Decode an automation object: large integers are file times.
fn decode_object(value: &RawValue) -> Value {
	match value {
		RawValue::LargeInteger { high, low } => decode_filetime(join_words(*high, *low)),
		RawValue::Descriptor(d) => Value::Descriptor(d.clone()),
		RawValue::Null => Value::Integer(0),
		other => passthrough(other),
	}
}

/// Convert file time ticks (100ns since 1601-01-01) to a timestamp. Zero is
/// the [`LDAP_EPOCH`]. Negative or unrepresentable times decode to `0`.
#[must_use]
pub fn decode_filetime(ticks: i64) -> Value {
	if ticks == 0 {
		return Value::Timestamp(LDAP_EPOCH);
	}
	if ticks < 0 {
		return Value::Integer(0);
	}
	let seconds = ticks / TICKS_PER_SECOND + FILETIME_UNIX_OFFSET;
	match OffsetDateTime::from_unix_timestamp(seconds) {
		Ok(time) => Value::Timestamp(time),
		Err(err) => {
			warn!("File time {ticks} is out of range: {err}");
			Value::Integer(0)
		}
	}
}

/// Decode an automation date value.
fn decode_date(value: &RawValue) -> Value {
	#[allow(clippy::cast_precision_loss)]
	let days = match value {
		RawValue::Float(f) => *f,
		RawValue::Integer(i) => *i as f64,
		RawValue::Null => 0.0,
		other => return passthrough(other),
	};
	if days.abs() < f64::EPSILON {
		return Value::Integer(0);
	}
	match variant_date(days) {
		Some(time) => Value::Timestamp(time),
		None => {
			warn!("Automation date {days} is out of range");
			Value::Integer(0)
		}
	}
}

/// Convert an automation date (days since 1899-12-30, time of day as the
/// fraction) to a UTC timestamp. Dates before the base carry the time of day
/// as a positive fraction.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn variant_date(days: f64) -> Option<OffsetDateTime> {
	if !days.is_finite() {
		return None;
	}
	let whole = days.trunc();
	let fraction = (days - whole).abs();
	let seconds = whole * SECONDS_PER_DAY + (fraction * SECONDS_PER_DAY).round();
	if seconds.abs() > 1e15 {
		return None;
	}
	OffsetDateTime::from_unix_timestamp(seconds as i64 - VARIANT_DATE_UNIX_OFFSET).ok()
}

/// Decode a byte array by length: 16 bytes are a GUID, 28 bytes a SID, other
/// lengths are rendered as base64.
fn decode_binary(value: &RawValue) -> Value {
	match value {
		RawValue::Bytes(bytes) if bytes.is_empty() => Value::Null,
		RawValue::Bytes(bytes) => Value::String(match bytes.len() {
			28 => decode_sid(bytes),
			_ => decode_guid(bytes)
				.unwrap_or_else(|| base64::engine::general_purpose::STANDARD.encode(bytes)),
		}),
		RawValue::Null => Value::Null,
		other => passthrough(other),
	}
}

/// Render a binary GUID in its canonical form. The first three groups are
/// stored little-endian, the last two big-endian. `None` unless there are
/// exactly 16 bytes.
#[must_use]
pub fn decode_guid(bytes: &[u8]) -> Option<String> {
	let bytes: &[u8; 16] = bytes.try_into().ok()?;
	let hex = |range: &[u8]| range.iter().map(|b| format!("{b:02x}")).collect::<String>();
	let reversed =
		|range: &[u8]| range.iter().rev().map(|b| format!("{b:02x}")).collect::<String>();
	Some(format!(
		"{}-{}-{}-{}-{}",
		reversed(&bytes[0..4]),
		reversed(&bytes[4..6]),
		reversed(&bytes[6..8]),
		hex(&bytes[8..10]),
		hex(&bytes[10..16]),
	))
}

/// Render a binary security identifier as `S-{revision}-{authority}-{sub}...`.
///
/// The 48-bit identifier authority is big-endian, the 32-bit sub-authorities
/// are little-endian as laid out by the platform.
#[must_use]
pub fn decode_sid(bytes: &[u8]) -> String {
	if bytes.len() < 8 {
		return base64::engine::general_purpose::STANDARD.encode(bytes);
	}
	let revision = bytes[0];
	let authority = bytes[2..8].iter().fold(0_u64, |acc, b| (acc << 8) | u64::from(*b));
	let mut sid = format!("S-{revision}-{authority}");
	for chunk in bytes[8..].chunks_exact(4) {
		let sub = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
		sid.push('-');
		sid.push_str(&sub.to_string());
	}
	sid
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use proptest::prelude::*;
	use time::macros::datetime;

	use super::{decode_filetime, decode_guid, decode_sid, Decoder, Parser};
	use crate::{
		value::{SecurityDescriptor, Value, LDAP_EPOCH},
		variant::{tags, RawEntry, RawValue, Variant},
	};

	#[test]
	fn integers() {
		let decoder = Decoder;
		assert_eq!(decoder.decode(&Variant::integer(42), true), Some(Value::Integer(42)));
		assert_eq!(
			decoder.decode(&Variant::new(tags::I4, RawValue::Text(" 7 ".to_owned())), true),
			Some(Value::Integer(7))
		);
	}

	#[test]
	fn strings_unescape_hex() {
		let decoder = Decoder;
		let latin1 = vec![0x4d, 0xfc, 0x6c];
		assert_eq!(
			decoder.decode(&Variant::string(r"caf\c3\a9 \28main\29"), true),
			Some(Value::from("café (main)"))
		);
		assert_eq!(
			decoder.decode(&Variant::new(tags::VARCHAR, RawValue::Bytes(latin1)), true),
			Some(Value::from("Mül")),
			"Latin-1 bytes are normalized"
		);
		assert_eq!(
			decoder.decode(&Variant::string(r"caf\c3\a9 M\fcller"), true),
			Some(Value::from("café Müller")),
			"valid sequences survive a stray Latin-1 byte"
		);
	}

	#[test]
	fn container_name_only() {
		let decoder = Decoder;
		let path = Variant::string("CN=Domain Admins,CN=Users,DC=example,DC=com");
		assert_eq!(decoder.decode(&path, true), Some(Value::from("Domain Admins")));
		assert_eq!(
			decoder.decode(&path, false),
			Some(Value::from("CN=Domain Admins,CN=Users,DC=example,DC=com"))
		);
		assert_eq!(
			decoder.decode(&Variant::string("CN=alone"), true),
			Some(Value::from("CN=alone"))
		);
		assert_eq!(
			decoder.decode(&Variant::string(r"CN=Doe\, Jane,OU=Staff"), true),
			Some(Value::from("Doe, Jane"))
		);
	}

	#[test]
	fn distinguished_name_is_never_truncated() {
		let raw = RawEntry::new()
			.with("distinguishedName", Variant::string("CN=Jane,OU=Staff,DC=example"))
			.with("manager", Variant::string("CN=Boss,OU=Staff,DC=example"));
		let entry = Decoder.parse_entry(&raw, true);
		assert_eq!(entry.first_str("distinguishedname"), Some("CN=Jane,OU=Staff,DC=example"));
		assert_eq!(entry.first_str("manager"), Some("Boss"));
	}

	#[test]
	fn arrays() {
		let decoder = Decoder;
		let variant = Variant::array(vec![Variant::string("a"), Variant::integer(1)]);
		assert_eq!(
			decoder.decode(&variant, true),
			Some(Value::List(vec![Value::from("a"), Value::Integer(1)]))
		);
		assert_eq!(decoder.decode(&Variant::array(vec![]), true), None);

		let raw = RawEntry::new().with("member", Variant::array(vec![]));
		let entry = Decoder.parse_entry(&raw, true);
		assert!(!entry.has("member"), "empty arrays are absent");
	}

	#[test]
	fn unknown_tags_pass_through() {
		let decoder = Decoder;
		assert_eq!(
			decoder.decode(&Variant::new(999, RawValue::Text(r"\41".to_owned())), true),
			Some(Value::from(r"\41"))
		);
		assert_eq!(
			decoder.decode(&Variant::new(72, RawValue::Bytes(vec![1, 2])), true),
			Some(Value::Binary(vec![1, 2]))
		);
		assert_eq!(decoder.decode(&Variant::empty(), true), Some(Value::Null));
	}

	#[test]
	fn booleans() {
		let decoder = Decoder;
		assert_eq!(decoder.decode(&Variant::boolean(true), true), Some(Value::Boolean(true)));
		assert_eq!(
			decoder.decode(&Variant::new(tags::BOOL, RawValue::Integer(0)), true),
			Some(Value::Boolean(false))
		);
	}

	#[test]
	fn filetimes() {
		assert_eq!(decode_filetime(0), Value::Timestamp(LDAP_EPOCH));
		assert_ne!(decode_filetime(0), Value::Timestamp(time::OffsetDateTime::UNIX_EPOCH));
		// 2021-01-01T00:00:00Z
		assert_eq!(
			decode_filetime(132_539_328_000_000_000),
			Value::Timestamp(datetime!(2021-01-01 0:00 UTC))
		);
		assert_eq!(decode_filetime(i64::MAX), Value::Integer(0), "never expires");
		assert_eq!(decode_filetime(-1), Value::Integer(0));

		let decoder = Decoder;
		assert_eq!(
			decoder.decode(&Variant::large_integer(0, 0), true),
			Some(Value::Timestamp(LDAP_EPOCH))
		);
		assert_eq!(
			decoder.decode(&Variant::filetime(132_539_328_000_000_000), true),
			Some(Value::Timestamp(datetime!(2021-01-01 0:00 UTC)))
		);
	}

	#[test]
	fn descriptors() {
		let descriptor = SecurityDescriptor {
			control: 0x8c14,
			group: r"EXAMPLE\Domain Admins".to_owned(),
			owner: r"EXAMPLE\Domain Admins".to_owned(),
			revision: 1,
		};
		let variant = Variant::new(tags::DISPATCH, RawValue::Descriptor(descriptor.clone()));
		assert_eq!(
			Decoder.decode(&variant, true),
			Some(Value::Descriptor(descriptor))
		);
	}

	#[test]
	fn variant_dates() {
		let decoder = Decoder;
		assert_eq!(
			decoder.decode(&Variant::date(44_197.5), true),
			Some(Value::Timestamp(datetime!(2021-01-01 12:00 UTC)))
		);
		assert_eq!(
			decoder.decode(&Variant::date(25_569.0), true),
			Some(Value::Timestamp(time::OffsetDateTime::UNIX_EPOCH))
		);
		assert_eq!(decoder.decode(&Variant::date(0.0), true), Some(Value::Integer(0)));
	}

	#[test]
	fn guid() {
		let bytes = [
			0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd,
			0xee, 0xff,
		];
		assert_eq!(decode_guid(&bytes).as_deref(), Some("00112233-4455-6677-8899-aabbccddeeff"));
		assert_eq!(decode_guid(&[1, 2, 3]), None);
		assert_eq!(decode_guid(&[0; 17]), None);
		assert_eq!(
			Decoder.decode(&Variant::binary(bytes.to_vec()), true),
			Some(Value::from("00112233-4455-6677-8899-aabbccddeeff"))
		);
	}

	#[test]
	fn sid() {
		let bytes = [
			0x01, 0x05, 0x00, 0x00, 0x00, 0x00, 0x00, 0x05, 0x15, 0x00, 0x00, 0x00, 0xa0, 0x65,
			0xcf, 0x7e, 0x78, 0x4b, 0x9b, 0x5f, 0xe7, 0x7c, 0x87, 0x70, 0x50, 0x04, 0x00, 0x00,
		];
		assert_eq!(decode_sid(&bytes), "S-1-5-21-2127521184-1604012920-1887927527-1104");
		assert_eq!(
			Decoder.decode(&Variant::binary(bytes.to_vec()), true),
			Some(Value::from("S-1-5-21-2127521184-1604012920-1887927527-1104"))
		);
	}

	#[test]
	fn other_binary_is_base64() {
		assert_eq!(
			Decoder.decode(&Variant::binary(b"hello".to_vec()), true),
			Some(Value::from("aGVsbG8="))
		);
		assert_eq!(Decoder.decode(&Variant::binary(Vec::new()), true), Some(Value::Null));
	}

	proptest! {
		#[test]
		fn guid_shape(bytes in proptest::collection::vec(any::<u8>(), 16)) {
			let guid = Decoder.decode(&Variant::binary(bytes), true).unwrap();
			let guid = guid.as_str().unwrap();
			let groups: Vec<usize> = guid.split('-').map(str::len).collect();
			prop_assert_eq!(groups, vec![8, 4, 4, 4, 12]);
			prop_assert!(guid.chars().all(|c| c == '-' || c.is_ascii_hexdigit()));
		}

		#[test]
		fn sid_shape(bytes in proptest::collection::vec(any::<u8>(), 28)) {
			let revision = bytes[0];
			let sid = Decoder.decode(&Variant::binary(bytes), true).unwrap();
			let sid = sid.as_str().unwrap();
			let prefix = format!("S-{revision}-");
			prop_assert!(sid.starts_with(&prefix));
		}
	}
}

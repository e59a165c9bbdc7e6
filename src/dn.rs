//! Distinguished names.
use std::{fmt, str::FromStr};

use crate::error::Error;

/// The attribute types a relative distinguished name may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdnType {
	/// Common name
	Cn,
	/// User id
	Uid,
	/// Organizational unit
	Ou,
	/// Domain component
	Dc,
	/// Organization
	O,
}

impl RdnType {
	/// The canonical, upper-case spelling.
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			RdnType::Cn => "CN",
			RdnType::Uid => "UID",
			RdnType::Ou => "OU",
			RdnType::Dc => "DC",
			RdnType::O => "O",
		}
	}
}

impl FromStr for RdnType {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"CN" => Ok(RdnType::Cn),
			"UID" => Ok(RdnType::Uid),
			"OU" => Ok(RdnType::Ou),
			"DC" => Ok(RdnType::Dc),
			"O" => Ok(RdnType::O),
			other => Err(Error::Model(format!("The RDN component '{other}' is invalid."))),
		}
	}
}

impl fmt::Display for RdnType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One `type=value` component of a distinguished name. The value is stored
/// unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rdn {
	/// Attribute type
	pub kind: RdnType,
	/// Unescaped value
	pub value: String,
}

/// A parsed distinguished name: an ordered sequence of RDNs.
///
/// Equality compares the serialized paths case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct DistinguishedName {
	/// Components in parse order
	components: Vec<Rdn>,
}

impl DistinguishedName {
	/// Parse a distinguished name such as `CN=Jane Doe,OU=Staff,DC=example,DC=com`.
	///
	/// An empty string yields an empty name. Components of a type other than
	/// CN, UID, OU, DC or O are rejected with [`Error::Model`].
	pub fn parse(path: &str) -> Result<Self, Error> {
		let mut dn = Self::default();
		if path.trim().is_empty() {
			return Ok(dn);
		}
		for rdn in split_unescaped(path, ',') {
			let (kind, value) = split_rdn(rdn)
				.ok_or_else(|| Error::Model(format!("Malformed RDN '{rdn}' in '{path}'")))?;
			dn.add_component(kind, &unescape(value))?;
		}
		Ok(dn)
	}

	/// The complete path, each value escaped, components joined by commas in
	/// their original order.
	#[must_use]
	pub fn path(&self) -> String {
		self.components
			.iter()
			.map(|rdn| format!("{}={}", rdn.kind, ldap3::dn_escape(rdn.value.as_str())))
			.collect::<Vec<_>>()
			.join(",")
	}

	/// The common name values, joined by commas.
	#[must_use]
	pub fn name(&self) -> String {
		self.values(RdnType::Cn).join(",")
	}

	/// All components in order.
	#[must_use]
	pub fn components(&self) -> &[Rdn] {
		&self.components
	}

	/// The values of every component of the given type, in order.
	#[must_use]
	pub fn values(&self, kind: RdnType) -> Vec<&str> {
		self.components
			.iter()
			.filter(|rdn| rdn.kind == kind)
			.map(|rdn| rdn.value.as_str())
			.collect()
	}

	/// Whether the name has no components.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.components.is_empty()
	}

	/// Append a component. Fails if the type is unknown or the value empty.
	pub fn add_component(&mut self, kind: &str, value: &str) -> Result<&mut Self, Error> {
		if value.is_empty() {
			return Err(Error::Model("The RDN value cannot be empty".to_owned()));
		}
		let kind = kind.parse()?;
		self.components.push(Rdn { kind, value: value.to_owned() });
		Ok(self)
	}

	/// Remove every component of the given type holding the given value.
	pub fn remove_component(&mut self, kind: &str, value: &str) -> Result<&mut Self, Error> {
		let kind: RdnType = kind.parse()?;
		self.components.retain(|rdn| !(rdn.kind == kind && rdn.value == value));
		Ok(self)
	}

	/// Extract the values of one component type straight from a path string,
	/// joined by commas. Components that do not parse are skipped, so this
	/// never fails.
	#[must_use]
	pub fn extract_component(path: &str, kind: &str) -> String {
		split_unescaped(path, ',')
			.into_iter()
			.filter_map(split_rdn)
			.filter(|(k, _)| k.trim().eq_ignore_ascii_case(kind.trim()))
			.map(|(_, v)| unescape(v))
			.collect::<Vec<_>>()
			.join(",")
	}
}

impl PartialEq for DistinguishedName {
	fn eq(&self, other: &Self) -> bool {
		self.path().to_lowercase() == other.path().to_lowercase()
	}
}

impl Eq for DistinguishedName {}

impl FromStr for DistinguishedName {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl fmt::Display for DistinguishedName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.path())
	}
}

/// Split on every `sep` that is not preceded by an escaping backslash.
pub(crate) fn split_unescaped(s: &str, sep: char) -> Vec<&str> {
	let mut parts = Vec::new();
	let mut start = 0;
	let mut escaped = false;
	for (i, c) in s.char_indices() {
		if escaped {
			escaped = false;
		} else if c == '\\' {
			escaped = true;
		} else if c == sep {
			parts.push(&s[start..i]);
			start = i + c.len_utf8();
		}
	}
	parts.push(&s[start..]);
	parts
}

/// Split an RDN at its first unescaped `=`.
fn split_rdn(rdn: &str) -> Option<(&str, &str)> {
	let mut parts = split_unescaped(rdn, '=');
	if parts.len() < 2 {
		return None;
	}
	let kind = parts.remove(0);
	let value_start = kind.len() + 1;
	Some((kind.trim(), trim_value(&rdn[value_start..])))
}

/// Trim surrounding whitespace, keeping a trailing space that is escaped.
fn trim_value(value: &str) -> &str {
	let value = value.trim_start();
	let trimmed = value.trim_end();
	let backslashes = trimmed.len() - trimmed.trim_end_matches('\\').len();
	if backslashes % 2 == 1 {
		value[trimmed.len()..]
			.chars()
			.next()
			.map_or(trimmed, |escaped| &value[..trimmed.len() + escaped.len_utf8()])
	} else {
		trimmed
	}
}

/// Undo DN escaping: `\XX` hex pairs become bytes, `\c` becomes `c`.
pub(crate) fn unescape(value: &str) -> String {
	let bytes = value.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'\\' && i + 1 < bytes.len() {
			if let Some(byte) = hex_pair(bytes, i + 1) {
				out.push(byte);
				i += 3;
			} else {
				out.push(bytes[i + 1]);
				i += 2;
			}
		} else {
			out.push(bytes[i]);
			i += 1;
		}
	}
	String::from_utf8(out)
		.unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

/// The byte encoded by two hex digits at `at`, if there are two.
pub(crate) fn hex_pair(bytes: &[u8], at: usize) -> Option<u8> {
	let pair = bytes.get(at..at + 2)?;
	if !pair.iter().all(u8::is_ascii_hexdigit) {
		return None;
	}
	u8::from_str_radix(std::str::from_utf8(pair).ok()?, 16).ok()
}

//! Group membership references and tests.
use crate::{
	dn::DistinguishedName,
	entry::Entry,
	error::Error,
	models::{Model, User},
	value::Value,
};

/// A reference to a group or member.
///
/// A name compares case-insensitively against the common names of the
/// referenced objects, a distinguished name compares against their full paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
	/// Common name
	Name(String),
	/// Full path
	Dn(DistinguishedName),
}

impl Membership {
	/// Read one value of a relational attribute. Values that are not
	/// distinguished names (for example container names that were already
	/// collapsed) are kept as names.
	#[must_use]
	pub fn from_attribute(value: &str, name_only: bool) -> Self {
		let name = short_name(value);
		if name_only {
			return Membership::Name(name);
		}
		match DistinguishedName::parse(value) {
			Ok(dn) if !dn.is_empty() => Membership::Dn(dn),
			_ => Membership::Name(name),
		}
	}

	/// Whether the relational attribute value refers to this object.
	#[must_use]
	pub fn matches(&self, value: &str) -> bool {
		match self {
			Membership::Name(name) => {
				short_name(value).to_lowercase() == name.trim().to_lowercase()
			}
			Membership::Dn(dn) => DistinguishedName::parse(value).is_ok_and(|other| other == *dn),
		}
	}
}

/// The common name of a relational value, or the value itself if it has none.
fn short_name(value: &str) -> String {
	let name = DistinguishedName::extract_component(value, "cn");
	if name.is_empty() {
		value.to_owned()
	} else {
		name
	}
}

impl TryFrom<&str> for Membership {
	type Error = Error;

	fn try_from(value: &str) -> Result<Self, Self::Error> {
		Ok(Membership::Name(value.to_owned()))
	}
}

impl TryFrom<String> for Membership {
	type Error = Error;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Ok(Membership::Name(value))
	}
}

impl TryFrom<DistinguishedName> for Membership {
	type Error = Error;

	fn try_from(value: DistinguishedName) -> Result<Self, Self::Error> {
		Ok(Membership::Dn(value))
	}
}

impl TryFrom<&DistinguishedName> for Membership {
	type Error = Error;

	fn try_from(value: &DistinguishedName) -> Result<Self, Self::Error> {
		Ok(Membership::Dn(value.clone()))
	}
}

impl TryFrom<&Value> for Membership {
	type Error = Error;

	fn try_from(value: &Value) -> Result<Self, Self::Error> {
		match value {
			Value::String(name) => Ok(Membership::Name(name.clone())),
			other => Err(Error::Model(format!(
				"a membership must be a name or a distinguished name, got {other:?}"
			))),
		}
	}
}

impl TryFrom<&User> for Membership {
	type Error = Error;

	fn try_from(user: &User) -> Result<Self, Self::Error> {
		let dn = user.dn()?;
		if dn.is_empty() {
			return Err(Error::Model("the user has no distinguished name".to_owned()));
		}
		Ok(Membership::Dn(dn))
	}
}

/// The values of a relational attribute as memberships.
pub(crate) fn memberships(entry: &Entry, attribute: &str, name_only: bool) -> Vec<Membership> {
	entry.strings(attribute).into_iter().map(|v| Membership::from_attribute(v, name_only)).collect()
}

/// Whether any candidate matches any value of a relational attribute.
pub(crate) fn contains_any<I>(entry: &Entry, attribute: &str, candidates: I) -> Result<bool, Error>
where
	I: IntoIterator,
	I::Item: TryInto<Membership, Error = Error>,
{
	let values = entry.strings(attribute);
	for candidate in candidates {
		let candidate = candidate.try_into()?;
		if values.iter().any(|value| candidate.matches(value)) {
			return Ok(true);
		}
	}
	Ok(false)
}

//! Groups.
use crate::{
	entry::Entry,
	error::Error,
	models::{
		membership::{contains_any, memberships},
		with_default_class, Membership, Model,
	},
};

/// A group.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
	/// Attributes
	entry: Entry,
}

impl Model for Group {
	const DEFAULT_CLASSES: &'static [&'static str] = &["top", "group"];
	const DEFAULT_ATTRIBUTES: &'static [&'static str] = &[
		"objectClass",
		"distinguishedName",
		"displayName",
		"member",
		"whenCreated",
		"objectGuid",
		"objectSid",
	];
	const COLUMN_MAP: &'static [(&'static str, &'static [&'static str])] = &[
		("objectClass", &["objectClass"]),
		("dn", &["distinguishedName"]),
		("name", &["displayName"]),
		("members", &["member"]),
		("createdAt", &["whenCreated"]),
		("objectGuid", &["objectGuid"]),
		("objectSid", &["objectSid"]),
	];

	fn from_entry(entry: Entry) -> Self {
		Self { entry: with_default_class::<Self>(entry) }
	}

	fn entry(&self) -> &Entry {
		&self.entry
	}

	fn entry_mut(&mut self) -> &mut Entry {
		&mut self.entry
	}

	fn into_entry(self) -> Entry {
		self.entry
	}
}

impl Default for Group {
	fn default() -> Self {
		Self::new()
	}
}

impl Group {
	/// A new group with the default object classes.
	#[must_use]
	pub fn new() -> Self {
		Self::from_entry(Entry::new())
	}

	/// Display name.
	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.entry.first_str("displayname")
	}

	/// Set the display name.
	pub fn set_name(&mut self, name: &str) {
		self.set_attribute("displayName", name);
	}

	/// The members of the group.
	#[must_use]
	pub fn members(&self, name_only: bool) -> Vec<Membership> {
		memberships(&self.entry, "member", name_only)
	}

	/// Whether any of the candidates is a member. Candidates can be names,
	/// distinguished names or [`User`](crate::models::User)s.
	pub fn in_members<I>(&self, candidates: I) -> Result<bool, Error>
	where
		I: IntoIterator,
		I::Item: TryInto<Membership, Error = Error>,
	{
		contains_any(&self.entry, "member", candidates)
	}
}

//! Computer accounts.
use std::cell::OnceCell;

use crate::{
	entry::Entry,
	error::Error,
	models::{
		membership::{contains_any, memberships},
		with_default_class, Membership, Model, OperatingSystem,
	},
};

/// A computer account.
#[derive(Debug, Clone)]
pub struct Computer {
	/// Attributes
	entry: Entry,
	/// Operating system, read from the attributes on first use
	os: OnceCell<OperatingSystem>,
}

impl Model for Computer {
	const DEFAULT_CLASSES: &'static [&'static str] =
		&["top", "person", "organizationalPerson", "user", "computer"];
	const DEFAULT_ATTRIBUTES: &'static [&'static str] = &[
		"objectclass",
		"distinguishedName",
		"name",
		"operatingSystem",
		"operatingSystemVersion",
		"memberOf",
		"whenCreated",
		"objectGUID",
		"objectSID",
	];
	const COLUMN_MAP: &'static [(&'static str, &'static [&'static str])] = &[
		("objectClass", &["objectclass"]),
		("dn", &["distinguishedName"]),
		("name", &["name"]),
		("os", &["operatingSystem", "operatingSystemVersion"]),
		("memberOf", &["memberOf"]),
		("createdAt", &["whenCreated"]),
		("objectGuid", &["objectGUID"]),
		("objectSid", &["objectSID"]),
	];

	fn from_entry(entry: Entry) -> Self {
		Self { entry: with_default_class::<Self>(entry), os: OnceCell::new() }
	}

	fn entry(&self) -> &Entry {
		&self.entry
	}

	fn entry_mut(&mut self) -> &mut Entry {
		self.os.take();
		&mut self.entry
	}

	fn into_entry(self) -> Entry {
		self.entry
	}
}

impl Default for Computer {
	fn default() -> Self {
		Self::new()
	}
}

impl PartialEq for Computer {
	fn eq(&self, other: &Self) -> bool {
		self.entry == other.entry
	}
}

impl Computer {
	/// A new computer with the default object classes.
	#[must_use]
	pub fn new() -> Self {
		Self::from_entry(Entry::new())
	}

	/// Name.
	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.entry.first_str("name")
	}

	/// Set the name.
	pub fn set_name(&mut self, name: &str) {
		self.set_attribute("name", name);
	}

	/// The operating system.
	pub fn operating_system(&self) -> &OperatingSystem {
		self.os.get_or_init(|| {
			OperatingSystem::new(
				self.entry.first_str("operatingsystem").unwrap_or_default(),
				self.entry.first_str("operatingsystemversion").unwrap_or_default(),
			)
		})
	}

	/// Groups the computer is a member of.
	#[must_use]
	pub fn member_of(&self, name_only: bool) -> Vec<Membership> {
		memberships(&self.entry, "memberof", name_only)
	}

	/// Whether the computer is a member of the group.
	pub fn is_member_of<M>(&self, group: M) -> Result<bool, Error>
	where
		M: TryInto<Membership, Error = Error>,
	{
		contains_any(&self.entry, "memberof", [group])
	}
}

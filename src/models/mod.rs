//! Typed views of directory entries.
//!
//! A decoded [`Entry`] is classified by its most specific object class into a
//! [`DirectoryObject`]: a [`User`], [`Group`], [`Computer`], or the generic
//! entry when the class is unmapped.
use std::{collections::HashMap, sync::LazyLock};

use crate::{
	dn::DistinguishedName,
	entry::{Entry, DISTINGUISHED_NAME, OBJECT_CLASS},
	error::Error,
	object_class::ObjectClass,
	value::Value,
};

mod address;
mod computer;
mod group;
mod membership;
mod os;
mod user;

pub use self::{
	address::Address, computer::Computer, group::Group, membership::Membership,
	os::OperatingSystem, user::User,
};

/// Behavior shared by every model type.
pub trait Model: Sized {
	/// Object classes of a new instance, most general first.
	const DEFAULT_CLASSES: &'static [&'static str];
	/// Attributes selected when a search names none.
	const DEFAULT_ATTRIBUTES: &'static [&'static str];
	/// Friendly names and the directory attributes they stand for.
	const COLUMN_MAP: &'static [(&'static str, &'static [&'static str])];

	/// Wrap a decoded entry.
	fn from_entry(entry: Entry) -> Self;

	/// The underlying attributes.
	fn entry(&self) -> &Entry;

	/// The underlying attributes, mutably.
	fn entry_mut(&mut self) -> &mut Entry;

	/// Unwrap the underlying attributes.
	fn into_entry(self) -> Entry;

	/// The object classes of a new instance.
	#[must_use]
	fn default_class() -> ObjectClass {
		ObjectClass::new(Self::DEFAULT_CLASSES)
	}

	/// The most specific default object class, used to scope searches.
	#[must_use]
	fn most_relevant_class() -> &'static str {
		Self::DEFAULT_CLASSES.last().copied().unwrap_or_default()
	}

	/// Translate friendly names through [`Model::COLUMN_MAP`], ignoring case.
	/// Unknown names are dropped.
	fn translate_attributes<S: AsRef<str>>(names: &[S]) -> Vec<String> {
		let mut translated: Vec<String> = Vec::new();
		for name in names {
			let name = name.as_ref().trim();
			let Some((_, attributes)) =
				Self::COLUMN_MAP.iter().find(|(key, _)| key.eq_ignore_ascii_case(name))
			else {
				continue;
			};
			for attribute in *attributes {
				if !translated.iter().any(|t| t.eq_ignore_ascii_case(attribute)) {
					translated.push((*attribute).to_owned());
				}
			}
		}
		translated
	}

	/// Get an attribute.
	fn attribute(&self, name: &str) -> Option<&Value> {
		self.entry().get(name)
	}

	/// Set an attribute.
	fn set_attribute(&mut self, name: &str, value: impl Into<Value>) {
		self.entry_mut().set(name, value);
	}

	/// The parsed distinguished name. Empty if the attribute is absent.
	fn dn(&self) -> Result<DistinguishedName, Error> {
		DistinguishedName::parse(self.entry().first_str(DISTINGUISHED_NAME).unwrap_or_default())
	}

	/// Replace the distinguished name.
	fn set_dn(&mut self, dn: &DistinguishedName) {
		self.set_attribute(DISTINGUISHED_NAME, dn.path());
	}

	/// The object classes.
	fn object_class(&self) -> ObjectClass {
		self.entry().get(OBJECT_CLASS).map(ObjectClass::from_value).unwrap_or_default()
	}

	/// The object GUID in canonical text form.
	fn guid(&self) -> Option<&str> {
		self.entry().first_str("objectguid")
	}

	/// The security identifier in `S-` text form.
	fn sid(&self) -> Option<&str> {
		self.entry().first_str("objectsid")
	}

	/// When the object was created.
	fn created_at(&self) -> Option<&Value> {
		self.entry().get("whencreated")
	}
}

/// Set the default object classes on entries that have none.
pub(crate) fn with_default_class<M: Model>(mut entry: Entry) -> Entry {
	if entry.is_empty_attribute(OBJECT_CLASS) {
		entry.set(OBJECT_CLASS, M::default_class().to_value());
	}
	entry
}

impl Model for Entry {
	const DEFAULT_CLASSES: &'static [&'static str] = &[];
	const DEFAULT_ATTRIBUTES: &'static [&'static str] = &["*"];
	const COLUMN_MAP: &'static [(&'static str, &'static [&'static str])] = &[];

	fn from_entry(entry: Entry) -> Self {
		entry
	}

	fn entry(&self) -> &Entry {
		self
	}

	fn entry_mut(&mut self) -> &mut Entry {
		self
	}

	fn into_entry(self) -> Entry {
		self
	}
}

/// The model kinds an entry can be classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelKind {
	/// [`User`]
	User,
	/// [`Group`]
	Group,
	/// [`Computer`]
	Computer,
}

/// Most specific object class to model kind.
static CLASS_TABLE: LazyLock<HashMap<String, ModelKind>> = LazyLock::new(|| {
	[
		(User::most_relevant_class(), ModelKind::User),
		(Group::most_relevant_class(), ModelKind::Group),
		(Computer::most_relevant_class(), ModelKind::Computer),
	]
	.into_iter()
	.map(|(class, kind)| (class.to_lowercase(), kind))
	.collect()
});

impl ModelKind {
	/// The kind for an object class hierarchy, by its most specific class.
	#[must_use]
	pub fn of(class: &ObjectClass) -> Option<Self> {
		CLASS_TABLE.get(class.most_relevant()?).copied()
	}
}

/// A classified directory object.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryObject {
	/// An entry of an unmapped class
	Entry(Entry),
	/// A user account
	User(User),
	/// A group
	Group(Group),
	/// A computer account
	Computer(Computer),
}

impl DirectoryObject {
	/// Classify an entry by the last element of its object class attribute.
	#[must_use]
	pub fn classify(entry: Entry) -> Self {
		let class = entry.get(OBJECT_CLASS).map(ObjectClass::from_value).unwrap_or_default();
		match ModelKind::of(&class) {
			Some(ModelKind::User) => DirectoryObject::User(User::from_entry(entry)),
			Some(ModelKind::Group) => DirectoryObject::Group(Group::from_entry(entry)),
			Some(ModelKind::Computer) => DirectoryObject::Computer(Computer::from_entry(entry)),
			None => DirectoryObject::Entry(entry),
		}
	}

	/// The model kind, `None` for generic entries.
	#[must_use]
	pub fn kind(&self) -> Option<ModelKind> {
		match self {
			DirectoryObject::Entry(_) => None,
			DirectoryObject::User(_) => Some(ModelKind::User),
			DirectoryObject::Group(_) => Some(ModelKind::Group),
			DirectoryObject::Computer(_) => Some(ModelKind::Computer),
		}
	}

	/// The underlying attributes.
	#[must_use]
	pub fn entry(&self) -> &Entry {
		match self {
			DirectoryObject::Entry(entry) => entry,
			DirectoryObject::User(user) => user.entry(),
			DirectoryObject::Group(group) => group.entry(),
			DirectoryObject::Computer(computer) => computer.entry(),
		}
	}

	/// Unwrap the underlying attributes.
	#[must_use]
	pub fn into_entry(self) -> Entry {
		match self {
			DirectoryObject::Entry(entry) => entry,
			DirectoryObject::User(user) => user.into_entry(),
			DirectoryObject::Group(group) => group.into_entry(),
			DirectoryObject::Computer(computer) => computer.into_entry(),
		}
	}

	/// The user, if this is one.
	#[must_use]
	pub fn into_user(self) -> Option<User> {
		match self {
			DirectoryObject::User(user) => Some(user),
			_ => None,
		}
	}

	/// The group, if this is one.
	#[must_use]
	pub fn into_group(self) -> Option<Group> {
		match self {
			DirectoryObject::Group(group) => Some(group),
			_ => None,
		}
	}

	/// The computer, if this is one.
	#[must_use]
	pub fn into_computer(self) -> Option<Computer> {
		match self {
			DirectoryObject::Computer(computer) => Some(computer),
			_ => None,
		}
	}
}

impl From<Entry> for DirectoryObject {
	fn from(entry: Entry) -> Self {
		Self::classify(entry)
	}
}

//! Object class hierarchies.
use crate::value::Value;

/// The object classes of an entry, case-folded.
///
/// Directory servers list the hierarchy from the most general class to the
/// most specific one, so the last class is the most relevant for deciding
/// what kind of object an entry is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectClass {
	/// Lower-cased class names in server order
	classes: Vec<String>,
}

impl ObjectClass {
	/// Build from a list of class names.
	pub fn new<I, S>(classes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		Self { classes: classes.into_iter().map(|c| c.as_ref().to_lowercase()).collect() }
	}

	/// Build from a decoded `objectClass` attribute.
	#[must_use]
	pub fn from_value(value: &Value) -> Self {
		Self::new(value.strings())
	}

	/// Whether the entry is of the given class.
	#[must_use]
	pub fn is(&self, class: &str) -> bool {
		let class = class.to_lowercase();
		self.classes.iter().any(|c| *c == class)
	}

	/// All classes in order.
	#[must_use]
	pub fn classes(&self) -> &[String] {
		&self.classes
	}

	/// The most specific class: the last one listed.
	#[must_use]
	pub fn most_relevant(&self) -> Option<&str> {
		self.classes.last().map(String::as_str)
	}

	/// The classes as an attribute value.
	#[must_use]
	pub fn to_value(&self) -> Value {
		Value::List(self.classes.iter().cloned().map(Value::String).collect())
	}
}

//! Postal addresses.
use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// Country attribute
const COUNTRY: &str = "co";
/// State attribute
const STATE: &str = "st";
/// City attribute
const CITY: &str = "l";
/// Street attribute
const STREET: &str = "street";
/// Postal code attribute
const POSTAL_CODE: &str = "postalCode";

/// A postal address spread over five directory attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
	/// Country (`co`)
	pub country: Option<String>,
	/// State or province (`st`)
	pub state: Option<String>,
	/// City (`l`)
	pub city: Option<String>,
	/// Street address (`street`)
	pub street_address: Option<String>,
	/// Postal code (`postalCode`)
	pub postal_code: Option<String>,
}

impl Address {
	/// The directory attributes an address is read from.
	pub const ATTRIBUTES: [&'static str; 5] = [STREET, POSTAL_CODE, STATE, CITY, COUNTRY];

	/// Read the address attributes of an entry.
	#[must_use]
	pub fn from_entry(entry: &Entry) -> Self {
		let read = |name: &str| entry.first_str(name).map(str::to_owned);
		Self {
			country: read(COUNTRY),
			state: read(STATE),
			city: read(CITY),
			street_address: read(STREET),
			postal_code: read(POSTAL_CODE),
		}
	}

	/// Write the address back to its attributes. Missing parts clear them.
	pub fn write_to(&self, entry: &mut Entry) {
		let fields = [
			(COUNTRY, &self.country),
			(STATE, &self.state),
			(CITY, &self.city),
			(STREET, &self.street_address),
			(POSTAL_CODE, &self.postal_code),
		];
		for (name, value) in fields {
			entry.set(name, value.clone().unwrap_or_default());
		}
	}
}

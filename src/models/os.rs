//! Computer operating systems.
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// An operating system as described by `operatingSystem` and
/// `operatingSystemVersion`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingSystem {
	/// Product name, e.g. `Windows`
	pub name: String,
	/// Version, e.g. `10`
	pub version: String,
	/// Edition, e.g. `Enterprise`
	pub flavor: String,
	/// Dotted build number, e.g. `10.0.19045`
	pub build: String,
}

impl OperatingSystem {
	/// Parse the full name and build strings. Windows names are split into
	/// name, version and flavor at spaces; other names are kept whole.
	#[must_use]
	pub fn new(full_name: &str, build: &str) -> Self {
		let mut os = Self { build: normalize_build(build), ..Self::default() };
		if full_name.to_lowercase().contains("windows") {
			let mut parts = full_name.split(' ');
			os.name = parts.next().unwrap_or_default().to_owned();
			os.version = parts.next().unwrap_or_default().to_owned();
			os.flavor = parts.next().unwrap_or_default().to_owned();
		} else {
			full_name.clone_into(&mut os.name);
		}
		os
	}

	/// Replace the build, normalizing it.
	pub fn set_build(&mut self, build: &str) {
		self.build = normalize_build(build);
	}

	/// `name version`
	#[must_use]
	pub fn version_name(&self) -> String {
		format!("{} {}", self.name, self.version)
	}

	/// `name version flavor`
	#[must_use]
	pub fn full_name(&self) -> String {
		format!("{} {} {}", self.name, self.version, self.flavor)
	}

	/// Order by version, then by build.
	#[must_use]
	pub fn compare(&self, other: &Self) -> Ordering {
		compare_versions(&self.version, &other.version)
			.then_with(|| compare_versions(&self.build, &other.build))
	}
}

/// `6.3 (9600)` becomes `6.3.9600`.
fn normalize_build(build: &str) -> String {
	build.split_whitespace().collect::<Vec<_>>().join(".").replace(['(', ')'], "")
}

/// Compare dotted version strings part by part, numerically where both parts
/// are numbers. A version with more parts is greater than its prefix.
fn compare_versions(a: &str, b: &str) -> Ordering {
	let split = |v: &str| -> Vec<String> {
		v.split(['.', '-', '_', '+']).filter(|p| !p.is_empty()).map(str::to_owned).collect()
	};
	let (a, b) = (split(a), split(b));
	for (x, y) in a.iter().zip(&b) {
		let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
			(Ok(x), Ok(y)) => x.cmp(&y),
			(Ok(_), Err(_)) => Ordering::Greater,
			(Err(_), Ok(_)) => Ordering::Less,
			(Err(_), Err(_)) => x.cmp(y),
		};
		if ordering != Ordering::Equal {
			return ordering;
		}
	}
	a.len().cmp(&b.len())
}

#[cfg(test)]
mod tests {
	use std::cmp::Ordering;

	use super::OperatingSystem;

	#[test]
	fn parse_windows() {
		let os = OperatingSystem::new("Windows 10 Enterprise", "10.0 (19045)");
		assert_eq!(os.name, "Windows");
		assert_eq!(os.version, "10");
		assert_eq!(os.flavor, "Enterprise");
		assert_eq!(os.build, "10.0.19045");
		assert_eq!(os.version_name(), "Windows 10");
		assert_eq!(os.full_name(), "Windows 10 Enterprise");
	}

	#[test]
	fn other_systems_keep_their_name() {
		let os = OperatingSystem::new("Samba", "4.15");
		assert_eq!(os.name, "Samba");
		assert_eq!(os.version, "");
		assert_eq!(os.build, "4.15");
	}

	#[test]
	fn compare() {
		let win10 = OperatingSystem::new("Windows 10 Pro", "10.0 (19045)");
		let win10_old = OperatingSystem::new("Windows 10 Pro", "10.0 (9600)");
		let win7 = OperatingSystem::new("Windows 7 Professional", "6.1 (7601)");
		assert_eq!(win10.compare(&win7), Ordering::Greater);
		assert_eq!(win10.compare(&win10_old), Ordering::Greater, "builds compare numerically");
		assert_eq!(win10.compare(&win10.clone()), Ordering::Equal);
	}
}

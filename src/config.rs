//! Config for the directory session.
use std::{fmt, time::Duration};

use ldap3::Scope;
use serde::{Deserialize, Serialize};

use crate::{
	connection::SearchProperties,
	dialect::{DialectKind, SearchRoot, PORT, ROOT_DN, SSL_PORT},
	error::Error,
};

/// Directory session configuration.
///
/// Deserializes from camelCase keys; unknown keys are rejected.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Config {
	/// Server host name. `None` binds serverless, to whatever server the
	/// provider picks
	pub host: Option<String>,
	/// Server port
	pub port: u16,
	/// Command dialect
	pub dialect: DialectKind,
	/// Base DN of searches. [`ROOT_DN`] resolves to the server's default naming
	/// context on bind
	pub base_dn: String,
	/// Bind user
	pub username: Option<String>,
	/// Bind password
	pub password: Option<String>,
	/// Use the TLS scheme. With the plain default port, port 636 is used
	pub ssl: bool,
	/// Bind as soon as the directory is created
	#[serde(alias = "autoBind")]
	pub auto_connect: bool,
	/// Per command timeout in seconds
	pub timeout: u64,
	/// Maximum number of entries per result page
	pub page_size: u32,
	/// Check the session with a trivial search right after binding
	pub check_connection: bool,
	/// Collapse container paths in decoded values to their common name
	pub container_name_only: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			host: None,
			port: PORT,
			dialect: DialectKind::default(),
			base_dn: ROOT_DN.to_owned(),
			username: None,
			password: None,
			ssl: false,
			auto_connect: true,
			timeout: 30,
			page_size: 1000,
			check_connection: false,
			container_name_only: true,
		}
	}
}

/// A dynamically typed option value, for [`Config::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
	/// No value
	Null,
	/// A flag
	Bool(bool),
	/// A number
	Integer(i64),
	/// Text
	Text(String),
}

impl ConfigValue {
	/// Name of the value type, for error messages.
	fn type_name(&self) -> &'static str {
		match self {
			ConfigValue::Null => "null",
			ConfigValue::Bool(_) => "boolean",
			ConfigValue::Integer(_) => "integer",
			ConfigValue::Text(_) => "string",
		}
	}
}

impl fmt::Display for ConfigValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigValue::Null => f.write_str("null"),
			ConfigValue::Bool(b) => write!(f, "{b}"),
			ConfigValue::Integer(i) => write!(f, "{i}"),
			ConfigValue::Text(s) => f.write_str(s),
		}
	}
}

impl From<bool> for ConfigValue {
	fn from(value: bool) -> Self {
		ConfigValue::Bool(value)
	}
}

impl From<i64> for ConfigValue {
	fn from(value: i64) -> Self {
		ConfigValue::Integer(value)
	}
}

impl From<&str> for ConfigValue {
	fn from(value: &str) -> Self {
		ConfigValue::Text(value.to_owned())
	}
}

impl From<String> for ConfigValue {
	fn from(value: String) -> Self {
		ConfigValue::Text(value)
	}
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
	fn from(value: Option<T>) -> Self {
		value.map_or(ConfigValue::Null, Into::into)
	}
}

/// Reject `value` for `key` because it has the wrong type.
fn wrong_type(key: &str, expected: &str, value: &ConfigValue) -> Error {
	Error::config(key, format!("expected {expected}, got {}", value.type_name()))
}

/// A boolean option.
fn boolean(key: &str, value: ConfigValue) -> Result<bool, Error> {
	match value {
		ConfigValue::Bool(b) => Ok(b),
		other => Err(wrong_type(key, "a boolean", &other)),
	}
}

/// An integer option that must fit `T`.
fn integer<T: TryFrom<i64>>(key: &str, value: ConfigValue) -> Result<T, Error> {
	match value {
		ConfigValue::Integer(i) if i < 0 => {
			Err(Error::config(key, format!("must be at least 0, got {i}")))
		}
		ConfigValue::Integer(i) => {
			T::try_from(i).map_err(|_| Error::config(key, format!("{i} is out of range")))
		}
		other => Err(wrong_type(key, "an integer", &other)),
	}
}

/// A string option.
fn string(key: &str, value: ConfigValue) -> Result<String, Error> {
	match value {
		ConfigValue::Text(s) => Ok(s),
		other => Err(wrong_type(key, "a string", &other)),
	}
}

/// A string option that may be unset.
fn string_or_null(key: &str, value: ConfigValue) -> Result<Option<String>, Error> {
	match value {
		ConfigValue::Null => Ok(None),
		other => string(key, other).map(Some),
	}
}

impl Config {
	/// Build a config from key/value options on top of the defaults.
	pub fn from_options<I, K, V>(options: I) -> Result<Self, Error>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: Into<ConfigValue>,
	{
		let mut config = Self::default();
		for (key, value) in options {
			config.set(key.as_ref(), value)?;
		}
		Ok(config)
	}

	/// Set an option by its camelCase name. Fails for unknown keys and values
	/// of the wrong type, leaving the config unchanged.
	pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) -> Result<(), Error> {
		let value = value.into();
		match key {
			"host" => self.host = string_or_null(key, value)?,
			"port" => self.port = integer(key, value)?,
			"dialect" => self.dialect = string(key, value)?.parse()?,
			"baseDn" => self.base_dn = string(key, value)?,
			"username" => self.username = string_or_null(key, value)?,
			"password" => self.password = string_or_null(key, value)?,
			"ssl" => self.ssl = boolean(key, value)?,
			"autoConnect" | "autoBind" => self.auto_connect = boolean(key, value)?,
			"timeout" => self.timeout = integer(key, value)?,
			"pageSize" => self.page_size = integer(key, value)?,
			"checkConnection" => self.check_connection = boolean(key, value)?,
			"containerNameOnly" => self.container_name_only = boolean(key, value)?,
			_ => return Err(Error::config(key, "option does not exist")),
		}
		Ok(())
	}

	/// Read an option by its camelCase name.
	pub fn get(&self, key: &str) -> Result<ConfigValue, Error> {
		Ok(match key {
			"host" => self.host.clone().into(),
			"port" => i64::from(self.port).into(),
			"dialect" => {
				ConfigValue::Text(match self.dialect {
					DialectKind::Native => "native".to_owned(),
					DialectKind::Sql => "sql".to_owned(),
				})
			}
			"baseDn" => self.base_dn.clone().into(),
			"username" => self.username.clone().into(),
			"password" => self.password.clone().into(),
			"ssl" => self.ssl.into(),
			"autoConnect" | "autoBind" => self.auto_connect.into(),
			"timeout" => i64::try_from(self.timeout).unwrap_or(i64::MAX).into(),
			"pageSize" => i64::from(self.page_size).into(),
			"checkConnection" => self.check_connection.into(),
			"containerNameOnly" => self.container_name_only.into(),
			_ => return Err(Error::config(key, "option does not exist")),
		})
	}

	/// The port actually used: the TLS default when TLS is on and the port was
	/// left at the plain default.
	#[must_use]
	pub fn effective_port(&self) -> u16 {
		if self.ssl && self.port == PORT {
			SSL_PORT
		} else {
			self.port
		}
	}

	/// Where searches start.
	#[must_use]
	pub fn search_root(&self) -> SearchRoot {
		SearchRoot {
			host: self.host.clone(),
			port: self.effective_port(),
			ssl: self.ssl,
			base_dn: self.base_dn.clone(),
		}
	}

	/// Properties sent with every command.
	#[must_use]
	pub fn search_properties(&self) -> SearchProperties {
		SearchProperties {
			scope: Scope::Subtree,
			page_size: self.page_size,
			timeout: Duration::from_secs(self.timeout),
		}
	}
}

//! Error codes

/// Errors that can occur when using this library
#[derive(thiserror::Error, Debug)]
pub enum Error {
	/// A configuration option was unknown or had a value of the wrong type.
	#[error("Invalid configuration option `{key}`: {reason}")]
	Configuration {
		/// The offending option name
		key: String,
		/// Why the value was rejected
		reason: String,
	},
	/// An operation needed a bound session but there is none.
	#[error("Connection not established")]
	NotConnected,
	/// Binding, naming context discovery or the transport failed.
	#[error("Connection error: {0}")]
	Connection(String),
	/// The connection collaborator failed to execute a command.
	#[error("Failed to execute command {command}: {message} ({code})")]
	Execution {
		/// The command text that was sent
		command: String,
		/// Native error code reported by the provider
		code: i64,
		/// Native error message reported by the provider
		message: String,
	},
	/// A dialect could not compile a command. Indicates a programming error.
	#[error("Dialect error: {0}")]
	Dialect(String),
	/// A "first or fail" search returned nothing.
	#[error("No LDAP query results the search: [{query}]")]
	EntryNotFound {
		/// The compiled query text
		query: String,
	},
	/// A model accessor was called with an unusable argument.
	#[error("Model error: {0}")]
	Model(String),
	/// A cursor was asked to move to a position that does not exist.
	#[error("Invalid seek position ({0})")]
	OutOfBounds(i64),
	/// The result set handle was not open.
	#[error("ResultSet is not opened, unable to operate")]
	ResultSetClosed,
}

impl Error {
	/// Shorthand for a configuration error on `key`.
	pub(crate) fn config(key: &str, reason: impl Into<String>) -> Self {
		Self::Configuration { key: key.to_owned(), reason: reason.into() }
	}

	/// Whether this is one of the connection error kinds, which leave the
	/// session unbound.
	#[must_use]
	pub fn is_connection(&self) -> bool {
		matches!(self, Self::NotConnected | Self::Connection(_))
	}
}

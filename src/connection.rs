//! The collaborator seam: the provider that binds, executes compiled commands
//! and hands back result handles.
//!
//! Nothing in this crate talks to a directory server itself. A [`Connection`]
//! implementation does, and its [`ResultHandle`]s are walked by a
//! [`Cursor`](crate::cursor::Cursor).
use std::time::Duration;

use ldap3::Scope;

use crate::{error::Error, variant::RawEntry};

/// Options passed along with every executed command.
#[derive(Debug, Clone, Copy)]
pub struct SearchProperties {
	/// Search scope
	pub scope: Scope,
	/// Maximum number of entries per result page
	pub page_size: u32,
	/// Per command timeout
	pub timeout: Duration,
}

impl Default for SearchProperties {
	fn default() -> Self {
		Self { scope: Scope::Subtree, page_size: 1000, timeout: Duration::from_secs(30) }
	}
}

/// A live, position addressable result set.
///
/// Positions are 1-based. Before the first record the handle is at BOF, after
/// the last one at EOF; at either end there is no current record and
/// [`absolute_position`](ResultHandle::absolute_position) is `None`. An empty
/// result set is at BOF and EOF at once.
pub trait ResultHandle {
	/// Whether the handle can still be operated on.
	fn is_open(&self) -> bool;

	/// The 1-based position of the current record.
	fn absolute_position(&self) -> Option<usize>;

	/// Whether the position is before the first record.
	fn bof(&self) -> bool;

	/// Whether the position is after the last record.
	fn eof(&self) -> bool;

	/// Move to the first record.
	fn move_first(&mut self) -> Result<(), Error>;

	/// Move to the last record.
	fn move_last(&mut self) -> Result<(), Error>;

	/// Move one record forward.
	fn move_next(&mut self) -> Result<(), Error>;

	/// Move one record back.
	fn move_previous(&mut self) -> Result<(), Error>;

	/// Move `offset` records relative to the current one.
	fn move_by(&mut self, offset: i64) -> Result<(), Error>;

	/// Number of records known to the handle.
	fn record_count(&self) -> usize;

	/// The fields of the current record, `None` at BOF or EOF.
	fn fields(&self) -> Result<Option<RawEntry>, Error>;

	/// Release the handle.
	fn close(&mut self);
}

/// A directory provider.
pub trait Connection {
	/// The result sets returned by [`execute`](Connection::execute).
	type Handle: ResultHandle;

	/// Bind the session. Returns whether the session is bound afterwards.
	fn connect(&mut self, username: Option<&str>, password: Option<&str>) -> Result<bool, Error>;

	/// Unbind the session.
	fn disconnect(&mut self);

	/// Whether the session is bound.
	fn is_connected(&self) -> bool;

	/// The naming context the server uses as its default search base.
	fn default_naming_context(&mut self) -> Result<String, Error>;

	/// Execute a compiled command. Failures are reported as
	/// [`Error::Execution`], or as a connection error if the session broke.
	fn execute(&mut self, command: &str, properties: &SearchProperties)
		-> Result<Self::Handle, Error>;

	/// Fetch the fields of a single object by its provider path.
	fn get_ldap_object(&mut self, path: &str) -> Result<RawEntry, Error>;

	/// Host name of the server that authenticated the session.
	fn logon_server(&mut self) -> Result<String, Error> {
		Err(Error::Connection("Could not get the logon controller".to_owned()))
	}
}

/// A fully buffered result set.
#[derive(Debug, Clone, Default)]
pub struct MemoryResultSet {
	/// The records
	records: Vec<RawEntry>,
	/// 0 is BOF, `records.len() + 1` is EOF
	position: usize,
	/// Whether [`ResultHandle::close`] has not been called yet
	open: bool,
}

impl MemoryResultSet {
	/// An open result set positioned on the first record.
	#[must_use]
	pub fn new(records: Vec<RawEntry>) -> Self {
		let position = usize::from(!records.is_empty());
		Self { records, position, open: true }
	}

	/// Position after the last record.
	fn eof_position(&self) -> usize {
		self.records.len() + 1
	}
}

impl FromIterator<RawEntry> for MemoryResultSet {
	fn from_iter<T: IntoIterator<Item = RawEntry>>(iter: T) -> Self {
		Self::new(iter.into_iter().collect())
	}
}

impl ResultHandle for MemoryResultSet {
	fn is_open(&self) -> bool {
		self.open
	}

	fn absolute_position(&self) -> Option<usize> {
		(1..=self.records.len()).contains(&self.position).then_some(self.position)
	}

	fn bof(&self) -> bool {
		self.records.is_empty() || self.position == 0
	}

	fn eof(&self) -> bool {
		self.records.is_empty() || self.position >= self.eof_position()
	}

	fn move_first(&mut self) -> Result<(), Error> {
		self.position = usize::from(!self.records.is_empty());
		Ok(())
	}

	fn move_last(&mut self) -> Result<(), Error> {
		self.position = self.records.len();
		Ok(())
	}

	fn move_next(&mut self) -> Result<(), Error> {
		self.move_by(1)
	}

	fn move_previous(&mut self) -> Result<(), Error> {
		self.move_by(-1)
	}

	fn move_by(&mut self, offset: i64) -> Result<(), Error> {
		if !self.open {
			return Err(Error::ResultSetClosed);
		}
		let eof = i64::try_from(self.eof_position()).unwrap_or(i64::MAX);
		let current = i64::try_from(self.position).unwrap_or(i64::MAX);
		let target = current.saturating_add(offset).clamp(0, eof);
		self.position = usize::try_from(target).unwrap_or_default();
		Ok(())
	}

	fn record_count(&self) -> usize {
		self.records.len()
	}

	fn fields(&self) -> Result<Option<RawEntry>, Error> {
		if !self.open {
			return Err(Error::ResultSetClosed);
		}
		Ok(self.absolute_position().map(|position| self.records[position - 1].clone()))
	}

	fn close(&mut self) {
		self.open = false;
	}
}

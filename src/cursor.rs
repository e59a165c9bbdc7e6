//! Bidirectional, seekable cursors over search results.
use std::{fmt, sync::Arc};

use tracing::debug;

use crate::{
	connection::ResultHandle, decoder::Parser, entry::Entry, error::Error,
	models::DirectoryObject,
};

/// A transformation applied to every fetched entry before it is classified.
pub type AfterFetch<'a> = Box<dyn FnMut(Entry) -> Result<Entry, Error> + 'a>;

/// A cursor over the records of a [`ResultHandle`].
///
/// Positions are 0-based. The cursor owns its handle and closes it exactly
/// once, on [`Cursor::close`] or when dropped.
pub struct Cursor<'a, H: ResultHandle> {
	/// The result set, `None` once closed
	handle: Option<H>,
	/// Decodes and classifies records
	parser: Arc<dyn Parser>,
	/// Collapse container paths to their common name
	container_name_only: bool,
	/// Cached result of [`Cursor::count`]
	count: Option<usize>,
	/// Post fetch transformations, in registration order
	hooks: Vec<AfterFetch<'a>>,
}

impl<H: ResultHandle> fmt::Debug for Cursor<'_, H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Cursor")
			.field("open", &self.handle.is_some())
			.field("key", &self.key())
			.field("count", &self.count)
			.field("hooks", &self.hooks.len())
			.finish_non_exhaustive()
	}
}

impl<'a, H: ResultHandle> Cursor<'a, H> {
	/// Wrap a result handle. Fails if the handle is not open.
	pub fn new(
		handle: H,
		parser: Arc<dyn Parser>,
		container_name_only: bool,
	) -> Result<Self, Error> {
		if !handle.is_open() {
			return Err(Error::ResultSetClosed);
		}
		debug!("Opened result set");
		Ok(Self {
			handle: Some(handle),
			parser,
			container_name_only,
			count: None,
			hooks: Vec::new(),
		})
	}

	/// Register a transformation for every fetched entry. Hooks run in
	/// registration order and may replace the entry.
	pub fn after_fetch(
		&mut self,
		hook: impl FnMut(Entry) -> Result<Entry, Error> + 'a,
	) -> &mut Self {
		self.hooks.push(Box::new(hook));
		self
	}

	/// Whether collapsing of container paths is enabled.
	#[must_use]
	pub fn container_name_only(&self) -> bool {
		self.container_name_only
	}

	/// Enable or disable collapsing of container paths.
	pub fn set_container_name_only(&mut self, container_name_only: bool) -> &mut Self {
		self.container_name_only = container_name_only;
		self
	}

	/// The open handle.
	fn handle(&mut self) -> Result<&mut H, Error> {
		self.handle.as_mut().ok_or(Error::ResultSetClosed)
	}

	/// The 0-based position of the current entry, `None` if there is none.
	#[must_use]
	pub fn key(&self) -> Option<usize> {
		self.handle.as_ref()?.absolute_position().map(|position| position - 1)
	}

	/// Whether there is a current entry.
	#[must_use]
	pub fn valid(&self) -> bool {
		self.handle.as_ref().is_some_and(|h| h.is_open() && !(h.eof() || h.bof()))
	}

	/// The decoded current entry, after the fetch hooks ran.
	pub fn current_entry(&mut self) -> Result<Option<Entry>, Error> {
		if !self.valid() {
			return Ok(None);
		}
		let Some(raw) = self.handle()?.fields()? else {
			return Ok(None);
		};
		let mut entry = self.parser.parse_entry(&raw, self.container_name_only);
		for hook in &mut self.hooks {
			entry = hook(entry)?;
		}
		Ok(Some(entry))
	}

	/// The current entry, classified.
	pub fn current(&mut self) -> Result<Option<DirectoryObject>, Error> {
		Ok(self.current_entry()?.map(|entry| self.parser.classify(entry)))
	}

	/// Move to the next entry. Does nothing without a current entry.
	pub fn move_next(&mut self) -> Result<(), Error> {
		if self.valid() {
			self.handle()?.move_next()?;
		}
		Ok(())
	}

	/// Move to the previous entry. Does nothing without a current entry.
	pub fn move_previous(&mut self) -> Result<(), Error> {
		if self.valid() {
			self.handle()?.move_previous()?;
		}
		Ok(())
	}

	/// Move to the first entry.
	pub fn rewind(&mut self) -> Result<(), Error> {
		self.handle()?.move_first()
	}

	/// Move to the last entry.
	pub fn fast_forward(&mut self) -> Result<(), Error> {
		self.handle()?.move_last()
	}

	/// Move to the 0-based `position`. Fails for negative positions and for
	/// positions past the last entry.
	pub fn seek(&mut self, position: i64) -> Result<(), Error> {
		if position < 0 {
			return Err(Error::OutOfBounds(position));
		}
		if self.key() != Some(0) {
			self.handle()?.move_first()?;
		}
		self.handle()?.move_by(position)?;
		if self.key().is_none() {
			return Err(Error::OutOfBounds(position));
		}
		Ok(())
	}

	/// Number of entries.
	///
	/// The first call moves the cursor to the last entry to let the provider
	/// materialize the whole result; the size is cached afterwards.
	pub fn count(&mut self) -> Result<usize, Error> {
		if let Some(count) = self.count {
			return Ok(count);
		}
		let handle = self.handle()?;
		handle.move_last()?;
		let count = handle.record_count();
		self.count = Some(count);
		Ok(count)
	}

	/// Up to `limit` entries starting at the 0-based `offset`. A limit of `0`
	/// means no limit.
	pub fn entries(&mut self, limit: usize, offset: usize) -> Result<Vec<DirectoryObject>, Error> {
		if offset == 0 {
			self.rewind()?;
		} else {
			self.seek(i64::try_from(offset).map_err(|_| Error::OutOfBounds(i64::MAX))?)?;
		}
		let mut entries = Vec::new();
		while let Some(object) = self.current()? {
			entries.push(object);
			if limit != 0 && entries.len() >= limit {
				break;
			}
			self.move_next()?;
		}
		Ok(entries)
	}

	/// Iterate from the current position to the end.
	pub fn iter(&mut self) -> Iter<'_, 'a, H> {
		Iter { cursor: self }
	}

	/// Close the handle.
	pub fn close(mut self) {
		self.release();
	}

	/// Close the handle if it is still open.
	fn release(&mut self) {
		if let Some(mut handle) = self.handle.take() {
			if handle.is_open() {
				handle.close();
				debug!("Closed result set");
			}
		}
	}
}

impl<H: ResultHandle> Drop for Cursor<'_, H> {
	fn drop(&mut self) {
		self.release();
	}
}

/// Iterator over the remaining entries of a [`Cursor`].
pub struct Iter<'c, 'a, H: ResultHandle> {
	/// The cursor being advanced
	cursor: &'c mut Cursor<'a, H>,
}

impl<H: ResultHandle> fmt::Debug for Iter<'_, '_, H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Iter").field("cursor", &self.cursor).finish()
	}
}

impl<H: ResultHandle> Iterator for Iter<'_, '_, H> {
	type Item = Result<DirectoryObject, Error>;

	fn next(&mut self) -> Option<Self::Item> {
		let current = self.cursor.current().transpose()?;
		if let Err(err) = self.cursor.move_next() {
			// The position is unknown now, stop here.
			self.cursor.release();
			return Some(current.and(Err(err)));
		}
		Some(current)
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use std::sync::Arc;

	use super::Cursor;
	use crate::{
		connection::{MemoryResultSet, ResultHandle},
		decoder::Decoder,
		error::Error,
		models::ModelKind,
		variant::{RawEntry, Variant},
	};

	fn records(n: usize) -> MemoryResultSet {
		(0..n)
			.map(|i| {
				RawEntry::new()
					.with("cn", Variant::string(format!("user{i}")))
					.with(
						"objectClass",
						Variant::array(vec![Variant::string("top"), Variant::string("user")]),
					)
			})
			.collect()
	}

	fn cursor(n: usize) -> Cursor<'static, MemoryResultSet> {
		Cursor::new(records(n), Arc::new(Decoder), true).unwrap()
	}

	fn cn(cursor: &mut Cursor<'_, MemoryResultSet>) -> Option<String> {
		cursor.current_entry().unwrap().and_then(|e| e.first_str("cn").map(str::to_owned))
	}

	#[test]
	fn closed_handle_is_rejected() {
		let mut handle = records(1);
		handle.close();
		let result = Cursor::new(handle, Arc::new(Decoder), true);
		assert!(matches!(result, Err(Error::ResultSetClosed)));
	}

	#[test]
	fn walk_both_ways() -> Result<(), Box<dyn std::error::Error>> {
		let mut cursor = cursor(3);
		assert_eq!(cursor.key(), Some(0));
		assert_eq!(cursor.current()?.unwrap().kind(), Some(ModelKind::User));

		cursor.move_next()?;
		cursor.move_next()?;
		assert_eq!(cn(&mut cursor).as_deref(), Some("user2"));
		cursor.move_previous()?;
		assert_eq!(cursor.key(), Some(1));

		cursor.fast_forward()?;
		cursor.move_next()?;
		assert!(!cursor.valid());
		assert_eq!(cursor.key(), None);
		assert!(cursor.current()?.is_none());
		cursor.move_next()?;

		cursor.rewind()?;
		assert_eq!(cn(&mut cursor).as_deref(), Some("user0"));
		Ok(())
	}

	#[test]
	fn seek_bounds() -> Result<(), Box<dyn std::error::Error>> {
		let mut cursor = cursor(3);
		cursor.seek(2)?;
		assert_eq!(cn(&mut cursor).as_deref(), Some("user2"));
		cursor.seek(0)?;
		assert_eq!(cursor.key(), Some(0));

		let count = i64::try_from(cursor.count()?)?;
		assert!(matches!(cursor.seek(-1), Err(Error::OutOfBounds(-1))));
		assert!(matches!(cursor.seek(count), Err(Error::OutOfBounds(3))));
		Ok(())
	}

	#[test]
	fn count_moves_to_last() -> Result<(), Box<dyn std::error::Error>> {
		let mut cursor = cursor(4);
		assert_eq!(cursor.count()?, 4);
		assert_eq!(cursor.key(), Some(3));
		cursor.rewind()?;
		assert_eq!(cursor.count()?, 4, "cached");
		assert_eq!(cursor.key(), Some(0), "cached count does not move");
		assert_eq!(cursor.iter().count(), 4);
		Ok(())
	}

	#[test]
	fn entries_window() -> Result<(), Box<dyn std::error::Error>> {
		let mut cursor = cursor(5);
		assert_eq!(cursor.entries(2, 1)?.len(), 2);
		assert_eq!(cursor.key(), Some(2), "stops on the last returned entry");
		assert_eq!(cursor.entries(0, 3)?.len(), 2);
		assert_eq!(cursor.entries(0, 0)?.len(), 5);
		assert!(matches!(cursor.entries(1, 5), Err(Error::OutOfBounds(5))));

		let mut empty = Cursor::new(MemoryResultSet::new(Vec::new()), Arc::new(Decoder), true)?;
		assert!(empty.entries(0, 0)?.is_empty());
		assert_eq!(empty.count()?, 0);
		Ok(())
	}

	#[test]
	fn hooks_run_in_order() -> Result<(), Box<dyn std::error::Error>> {
		let mut cursor = cursor(1);
		cursor
			.after_fetch(|mut entry| {
				entry.set("cn", "first");
				Ok(entry)
			})
			.after_fetch(|mut entry| {
				let cn = entry.first_str("cn").unwrap_or_default().to_owned();
				entry.set("cn", format!("{cn}-second"));
				Ok(entry)
			});
		assert_eq!(cn(&mut cursor).as_deref(), Some("first-second"));
		Ok(())
	}

	#[test]
	fn hook_errors_propagate() {
		let mut cursor = cursor(2);
		cursor.after_fetch(|_| Err(Error::Model("broken".to_owned())));
		let results: Vec<_> = cursor.iter().collect();
		assert_eq!(results.len(), 2);
		assert!(results.iter().all(Result::is_err));
	}
}

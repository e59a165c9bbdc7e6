//! A directory session: binding, searching and the search shortcuts.
use std::{fmt, sync::Arc};

use ldap3::Scope;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
	config::Config,
	connection::{Connection, SearchProperties},
	decoder::{Decoder, Parser},
	dialect::{BooleanType, Dialect, SearchRoot},
	error::Error,
	models::{Computer, Group, Model, User},
	query::QueryBuilder,
};

/// Facts about the directory the session is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryInfo {
	/// The server's default naming context
	pub default_naming_context: String,
	/// The server that authenticated the session, if the provider can tell
	pub logon_server: Option<String>,
	/// Lower-cased, sorted host names of the domain controllers
	pub domain_controllers: Vec<String>,
}

/// A session with a directory server, on top of a [`Connection`].
///
/// The session is unbound when the directory is dropped.
pub struct Directory<C: Connection> {
	/// Session configuration
	config: Config,
	/// The provider
	connection: C,
	/// Whether this session bound the connection
	bound: bool,
	/// Where searches start, with the root sentinel resolved once bound
	root: SearchRoot,
	/// Cached default naming context
	naming_context: Option<String>,
	/// Compiles commands
	dialect: Arc<dyn Dialect>,
	/// Decodes and classifies records
	parser: Arc<dyn Parser>,
}

impl<C: Connection> fmt::Debug for Directory<C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Directory")
			.field("root", &self.root)
			.field("bound", &self.bound)
			.field("dialect", &self.dialect)
			.field("parser", &self.parser)
			.finish_non_exhaustive()
	}
}

impl<C: Connection> Directory<C> {
	/// Create a directory over `connection`, binding right away if the
	/// config asks for it.
	pub fn new(config: Config, connection: C) -> Result<Self, Error> {
		let mut directory = Self {
			root: config.search_root(),
			dialect: Arc::from(config.dialect.dialect()),
			parser: Arc::new(Decoder),
			naming_context: None,
			bound: false,
			connection,
			config,
		};
		if directory.config.auto_connect {
			directory.connect()?;
		}
		Ok(directory)
	}

	/// The configuration.
	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// The provider.
	#[must_use]
	pub fn connection(&self) -> &C {
		&self.connection
	}

	/// The provider, mutably.
	pub fn connection_mut(&mut self) -> &mut C {
		&mut self.connection
	}

	/// Where searches start.
	#[must_use]
	pub fn search_root(&self) -> &SearchRoot {
		&self.root
	}

	/// The dialect queries are compiled with.
	#[must_use]
	pub fn dialect(&self) -> Arc<dyn Dialect> {
		Arc::clone(&self.dialect)
	}

	/// Compile queries with a different dialect.
	pub fn set_dialect(&mut self, dialect: Arc<dyn Dialect>) -> &mut Self {
		self.dialect = dialect;
		self
	}

	/// The parser results are decoded with.
	#[must_use]
	pub fn parser(&self) -> Arc<dyn Parser> {
		Arc::clone(&self.parser)
	}

	/// Decode results with a different parser.
	pub fn set_parser(&mut self, parser: Arc<dyn Parser>) -> &mut Self {
		self.parser = parser;
		self
	}

	/// Whether the session is bound.
	#[must_use]
	pub fn is_bound(&self) -> bool {
		self.bound && self.connection.is_connected()
	}

	/// Bind the session. Binding an already bound session does nothing.
	///
	/// A root sentinel base DN is resolved to the default naming context, and
	/// with `checkConnection` the session is checked with a trivial search.
	pub fn connect(&mut self) -> Result<(), Error> {
		if self.is_bound() {
			return Ok(());
		}
		let bound = self
			.connection
			.connect(self.config.username.as_deref(), self.config.password.as_deref())
			.inspect_err(|_| self.connection.disconnect())?;
		if !bound {
			return Err(Error::Connection(format!(
				"Unable to bind to {}",
				self.root.object_path(&self.root.base_dn)
			)));
		}
		self.bound = true;
		info!("Bound to {}", self.root.object_path(&self.root.base_dn));

		if self.root.is_root_dn() {
			match self.naming_context() {
				Ok(naming_context) => self.root.base_dn = naming_context,
				Err(err) => {
					self.unbind();
					return Err(err);
				}
			}
		}
		if self.config.check_connection {
			let reason = match self.check_connection() {
				Ok(true) => return Ok(()),
				Ok(false) => "no entry returned".to_owned(),
				Err(err) => err.to_string(),
			};
			self.unbind();
			return Err(Error::Connection(format!("Connection check failed: {reason}")));
		}
		Ok(())
	}

	/// Unbind the session.
	pub fn unbind(&mut self) {
		if self.bound {
			if self.connection.is_connected() {
				self.connection.disconnect();
			}
			self.naming_context = None;
			self.bound = false;
			debug!("Unbound");
		}
	}

	/// The server's default naming context. Cached while bound.
	pub fn naming_context(&mut self) -> Result<String, Error> {
		if let Some(naming_context) = &self.naming_context {
			return Ok(naming_context.clone());
		}
		let naming_context = self.connection.default_naming_context()?;
		self.naming_context = Some(naming_context.clone());
		Ok(naming_context)
	}

	/// Execute a compiled command. Fails with [`Error::NotConnected`] without
	/// a bound session; connection errors unbind the session.
	pub fn execute(
		&mut self,
		command: &str,
		properties: &SearchProperties,
	) -> Result<C::Handle, Error> {
		if !self.is_bound() {
			return Err(Error::NotConnected);
		}
		self.connection.execute(command, properties).inspect_err(|err| {
			if err.is_connection() {
				warn!("Unbinding after connection error: {err}");
				self.unbind();
			}
		})
	}

	/// A new query rooted at the base DN.
	pub fn search(&mut self) -> Result<QueryBuilder<'_, C>, Error> {
		QueryBuilder::new(self)
	}

	/// Check the session with a base scope search of the root. Returns whether
	/// the root was found.
	pub fn check_connection(&mut self) -> Result<bool, Error> {
		if !self.is_bound() {
			return Ok(false);
		}
		let cursor = self
			.search()?
			.scope(Scope::Base)
			.where_present("objectClass", BooleanType::And)
			.select(&["ADsPath"])
			.get()?;
		Ok(cursor.valid())
	}

	/// Gather facts about the directory. Failing to find the logon server is
	/// logged and otherwise ignored.
	pub fn info(&mut self) -> Result<DirectoryInfo, Error> {
		if !self.is_bound() {
			return Err(Error::NotConnected);
		}
		let default_naming_context = self.naming_context()?;
		let logon_server = match self.connection.logon_server() {
			Ok(server) => Some(server),
			Err(err) => {
				warn!("Could not find the logon server: {err}");
				None
			}
		};
		let domain_controllers = self.domain_controllers(&default_naming_context)?;
		Ok(DirectoryInfo { default_naming_context, logon_server, domain_controllers })
	}

	/// Host names of the computers in the domain controllers container.
	fn domain_controllers(&mut self, naming_context: &str) -> Result<Vec<String>, Error> {
		let mut cursor = self
			.search()?
			.from(format!("OU=Domain Controllers,{naming_context}"))
			.where_equals("objectCategory", "Computer", BooleanType::And)
			.select(&["dNSHostName"])
			.get()?;
		let mut controllers: Vec<String> = cursor
			.entries(0, 0)?
			.iter()
			.filter_map(|object| object.entry().first_str("dnshostname"))
			.map(str::to_lowercase)
			.collect();
		controllers.sort();
		Ok(controllers)
	}

	/// Entries of an object category.
	pub fn category(&mut self, category: &str) -> Result<QueryBuilder<'_, C>, Error> {
		Ok(self.search()?.where_equals("objectCategory", category, BooleanType::And))
	}

	/// User accounts.
	pub fn users(&mut self) -> Result<QueryBuilder<'_, C>, Error> {
		self.category(User::most_relevant_class())
	}

	/// Groups.
	pub fn groups(&mut self) -> Result<QueryBuilder<'_, C>, Error> {
		self.category(Group::most_relevant_class())
	}

	/// Computer accounts.
	pub fn computers(&mut self) -> Result<QueryBuilder<'_, C>, Error> {
		self.category(Computer::most_relevant_class())
	}

	/// The user with the given account name. Without `attributes` the model's
	/// default attributes are selected; with `translate` the attributes are
	/// friendly names translated through the model's column map.
	pub fn user<S: AsRef<str>>(
		&mut self,
		account: &str,
		attributes: &[S],
		translate: bool,
	) -> Result<Option<User>, Error> {
		let attributes = model_attributes::<User, S>(attributes, translate);
		let object = self.users()?.first_by("sAMAccountName", account, &attributes)?;
		Ok(object.map(|object| User::from_entry(object.into_entry())))
	}

	/// The group with the given common name.
	pub fn group<S: AsRef<str>>(
		&mut self,
		name: &str,
		attributes: &[S],
		translate: bool,
	) -> Result<Option<Group>, Error> {
		let attributes = model_attributes::<Group, S>(attributes, translate);
		let object = self.groups()?.first_by("cn", name, &attributes)?;
		Ok(object.map(|object| Group::from_entry(object.into_entry())))
	}

	/// The computer with the given common name.
	pub fn computer<S: AsRef<str>>(
		&mut self,
		name: &str,
		attributes: &[S],
		translate: bool,
	) -> Result<Option<Computer>, Error> {
		let attributes = model_attributes::<Computer, S>(attributes, translate);
		let object = self.computers()?.first_by("cn", name, &attributes)?;
		Ok(object.map(|object| Computer::from_entry(object.into_entry())))
	}
}

/// The attributes to select for a model search.
fn model_attributes<M: Model, S: AsRef<str>>(attributes: &[S], translate: bool) -> Vec<String> {
	if attributes.is_empty() {
		M::DEFAULT_ATTRIBUTES.iter().map(|a| (*a).to_owned()).collect()
	} else if translate {
		M::translate_attributes(attributes)
	} else {
		attributes.iter().map(|a| a.as_ref().to_owned()).collect()
	}
}

impl<C: Connection> Drop for Directory<C> {
	fn drop(&mut self) {
		self.unbind();
	}
}

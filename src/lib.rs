//! Query Active Directory style directories through an ADSI-like provider.
//!
//! The library compiles fluent searches into provider command text, walks the
//! results with a seekable cursor, decodes the loosely typed field values the
//! provider hands back, and classifies each decoded entry into a typed model
//! ([`User`], [`Group`], [`Computer`]) by its most specific object class.
//!
//! The library does not speak the directory protocol itself. A [`Connection`]
//! implementation binds, executes the compiled commands and returns
//! [`ResultHandle`]s; [`MemoryResultSet`] covers providers that fetch a whole
//! result up front, and [`RawEntry`] converts from [`ldap3::SearchEntry`] so
//! entries fetched with `ldap3` go through the same decoding pipeline.
//!
//! For a general primer on LDAP, the [introduction] in the `ldap3` crate is an
//! excellent resource. Microsoft documents the two command [dialects] used by
//! the ADSI OLE DB provider.
//!
//! [introduction]: https://github.com/inejge/ldap3/blob/master/LDAP-primer.md
//! [dialects]: https://learn.microsoft.com/en-us/windows/win32/adsi/searching-with-activex-data-objects-ado
//!
//! # Getting started
//! A minimal search might look like so:
//! ```no_run
//! # fn run<C: adsi_query::Connection>(connection: C) -> Result<(), Box<dyn std::error::Error>> {
//! use adsi_query::{BooleanType, Config, Directory, DirectoryObject};
//!
//! // Configuration can also be deserialized with serde or built from
//! // key/value options with `Config::from_options`.
//! let config = Config {
//!     host: Some("dc01.example.com".to_owned()),
//!     username: Some("EXAMPLE\\search".to_owned()),
//!     password: Some("verysecret".to_owned()),
//!     ..Config::default()
//! };
//! let mut directory = Directory::new(config, connection)?;
//!
//! let mut cursor = directory
//!     .users()?
//!     .where_starts_with("sn", "Doe", BooleanType::And)
//!     .select(&["cn", "mail", "lockoutTime"])
//!     .get()?;
//! println!("{} users", cursor.count()?);
//! cursor.rewind()?;
//! for object in cursor.iter() {
//!     if let DirectoryObject::User(user) = object? {
//!         println!("{:?} locked out: {}", user.mail(), user.is_lockout());
//!     }
//! }
//! drop(cursor);
//!
//! if let Some(user) = directory.user("jdoe", &["login", "memberOf"], true)? {
//!     println!("jdoe in staff: {}", user.is_member_of("staff")?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Limitations
//! * The native dialect flattens filters into one AND bucket and one OR bucket,
//!   so `where(a).or_where(b)` compiles to `(&(a)(b))` and explicit groups are
//!   ignored. The SQL dialect compiles groups as written.
//! * [`Cursor::count`] moves the cursor to the last entry the first time it is
//!   called.
//! * Passwords in [`Config`] are plain strings.

pub mod config;
pub mod connection;
pub mod cursor;
pub mod decoder;
pub mod dialect;
pub mod directory;
pub mod dn;
pub mod entry;
pub mod error;
pub mod models;
pub mod object_class;
pub mod query;
pub mod value;
pub mod variant;

pub use ldap3::{self, SearchEntry};

pub use crate::{
	config::{Config, ConfigValue},
	connection::{Connection, MemoryResultSet, ResultHandle, SearchProperties},
	cursor::Cursor,
	decoder::{Decoder, Parser},
	dialect::{BooleanType, Dialect, DialectKind, Filter, NativeDialect, SearchRoot, SqlDialect},
	directory::{Directory, DirectoryInfo},
	dn::DistinguishedName,
	entry::Entry,
	error::Error,
	models::{Computer, DirectoryObject, Group, Model, ModelKind, User},
	object_class::ObjectClass,
	query::QueryBuilder,
	value::{Value, LDAP_EPOCH},
	variant::{RawEntry, Variant},
};

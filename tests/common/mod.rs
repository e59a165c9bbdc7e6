use std::collections::HashMap;

use adsi_query::{
	Config, Connection, Directory, Error, MemoryResultSet, RawEntry, SearchProperties, Variant,
};
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

pub const NAMING_CONTEXT: &str = "DC=example,DC=com";

/// How the next command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
	Execution,
	Connection,
}

/// An in-memory provider. Commands are answered with the records of the first
/// response whose key occurs in the command text, or with no records.
#[derive(Debug, Default)]
pub struct FakeConnection {
	pub connected: bool,
	pub responses: Vec<(String, Vec<RawEntry>)>,
	pub objects: HashMap<String, RawEntry>,
	pub logon_server: Option<String>,
	pub failure: Option<Failure>,
	pub commands: Vec<String>,
	pub disconnects: usize,
}

impl FakeConnection {
	pub fn respond(mut self, key: &str, records: Vec<RawEntry>) -> Self {
		self.responses.push((key.to_owned(), records));
		self
	}

	pub fn object(mut self, path: &str, record: RawEntry) -> Self {
		self.objects.insert(path.to_owned(), record);
		self
	}
}

impl Connection for FakeConnection {
	type Handle = MemoryResultSet;

	fn connect(&mut self, _username: Option<&str>, _password: Option<&str>) -> Result<bool, Error> {
		self.connected = true;
		Ok(true)
	}

	fn disconnect(&mut self) {
		self.connected = false;
		self.disconnects += 1;
	}

	fn is_connected(&self) -> bool {
		self.connected
	}

	fn default_naming_context(&mut self) -> Result<String, Error> {
		Ok(NAMING_CONTEXT.to_owned())
	}

	fn execute(
		&mut self,
		command: &str,
		_properties: &SearchProperties,
	) -> Result<MemoryResultSet, Error> {
		self.commands.push(command.to_owned());
		match self.failure.take() {
			Some(Failure::Connection) => {
				self.connected = false;
				return Err(Error::Connection("The server is not operational".to_owned()));
			}
			Some(Failure::Execution) => {
				return Err(Error::Execution {
					command: command.to_owned(),
					code: -2_147_217_900,
					message: "One or more errors occurred during processing of command".to_owned(),
				});
			}
			None => {}
		}
		let records = self
			.responses
			.iter()
			.find(|(key, _)| command.contains(key.as_str()))
			.map(|(_, records)| records.clone())
			.unwrap_or_default();
		Ok(MemoryResultSet::new(records))
	}

	fn get_ldap_object(&mut self, path: &str) -> Result<RawEntry, Error> {
		self.objects.get(path).cloned().ok_or_else(|| Error::Execution {
			command: path.to_owned(),
			code: -2_147_016_656,
			message: "There is no such object on the server".to_owned(),
		})
	}

	fn logon_server(&mut self) -> Result<String, Error> {
		self.logon_server
			.clone()
			.ok_or_else(|| Error::Connection("Could not get the logon controller".to_owned()))
	}
}

pub fn init_tracing() {
	let tracing_filter = EnvFilter::default().add_directive(LevelFilter::DEBUG.into());
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_filter).with_test_writer().try_init();
}

pub fn config() -> Config {
	Config { host: Some("dc01.example.com".to_owned()), ..Config::default() }
}

pub fn directory(connection: FakeConnection) -> Result<Directory<FakeConnection>, Error> {
	init_tracing();
	Directory::new(config(), connection)
}

pub fn classes(classes: &[&str]) -> Variant {
	Variant::array(classes.iter().map(|class| Variant::string(*class)).collect())
}

pub fn user_record(account: &str, cn: &str) -> RawEntry {
	RawEntry::new()
		.with("distinguishedName", Variant::string(format!("CN={cn},OU=Staff,{NAMING_CONTEXT}")))
		.with("sAMAccountName", Variant::string(account))
		.with("objectClass", classes(&["top", "person", "organizationalPerson", "user"]))
}

pub fn group_record(cn: &str, members: &[&str]) -> RawEntry {
	RawEntry::new()
		.with("distinguishedName", Variant::string(format!("CN={cn},OU=Groups,{NAMING_CONTEXT}")))
		.with("displayName", Variant::string(cn))
		.with(
			"member",
			Variant::array(
				members
					.iter()
					.map(|member| Variant::string(format!("CN={member},OU=Staff,{NAMING_CONTEXT}")))
					.collect(),
			),
		)
		.with("objectClass", classes(&["top", "group"]))
}

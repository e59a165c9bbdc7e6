//! Command dialects: compile a search root, filters and an attribute list into
//! the text a directory provider executes.
//!
//! Two dialects are built in. The [`NativeDialect`] produces
//! `<LDAP://host/base>;(filter);attrs` commands with prefix notation filters,
//! the [`SqlDialect`] produces `SELECT attrs FROM 'LDAP://host/base' WHERE ...`.
//!
//! The native dialect flattens filters into one AND bucket and one OR bucket and
//! ignores explicit groups; only the SQL dialect honors
//! [`QueryBuilder::open_where_group`](crate::query::QueryBuilder::open_where_group).
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Plain scheme of provider paths.
pub const PROTOCOL: &str = "LDAP://";
/// TLS scheme of provider paths.
pub const SSL_PROTOCOL: &str = "LDAPS://";
/// Default plain port.
pub const PORT: u16 = 389;
/// Default TLS port.
pub const SSL_PORT: u16 = 636;
/// Base DN sentinel meaning "discover the default naming context".
pub const ROOT_DN: &str = "RootDSE";

/// Which built-in dialect to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
	/// Prefix notation filters
	#[default]
	Native,
	/// SQL-like commands
	Sql,
}

impl DialectKind {
	/// Instantiate the dialect.
	#[must_use]
	pub fn dialect(self) -> Box<dyn Dialect> {
		match self {
			DialectKind::Native => Box::new(NativeDialect),
			DialectKind::Sql => Box::new(SqlDialect),
		}
	}
}

impl std::str::FromStr for DialectKind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"native" | "ldap" => Ok(DialectKind::Native),
			"sql" => Ok(DialectKind::Sql),
			_ => Err(Error::config("dialect", format!("unknown dialect `{s}`"))),
		}
	}
}

/// How a filter combines with the ones before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BooleanType {
	/// Conjunction
	#[default]
	And,
	/// Disjunction
	Or,
}

impl BooleanType {
	/// The SQL keyword.
	#[must_use]
	pub fn as_sql(self) -> &'static str {
		match self {
			BooleanType::And => "AND",
			BooleanType::Or => "OR",
		}
	}

	/// The prefix notation operator.
	#[must_use]
	pub fn as_native(self) -> char {
		match self {
			BooleanType::And => '&',
			BooleanType::Or => '|',
		}
	}
}

impl fmt::Display for BooleanType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_sql())
	}
}

/// One element of the filter list of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
	/// A predicate such as `cn=foo`, written without outer parentheses
	Expression {
		/// How it combines with the preceding filters
		boolean: BooleanType,
		/// Dialect specific predicate text
		expression: String,
	},
	/// Start of an explicit group
	OpenGroup(BooleanType),
	/// End of the innermost group
	CloseGroup,
}

impl Filter {
	/// A predicate filter.
	pub fn expression(boolean: BooleanType, expression: impl Into<String>) -> Self {
		Filter::Expression { boolean, expression: expression.into() }
	}
}

/// Where a search starts: the provider path of the base object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoot {
	/// Server host name, or `None` for serverless binding
	pub host: Option<String>,
	/// Server port
	pub port: u16,
	/// Whether to use the TLS scheme
	pub ssl: bool,
	/// Base DN, or [`ROOT_DN`]
	pub base_dn: String,
}

impl Default for SearchRoot {
	fn default() -> Self {
		Self { host: None, port: PORT, ssl: false, base_dn: ROOT_DN.to_owned() }
	}
}

impl SearchRoot {
	/// Whether the base DN is the root discovery sentinel.
	#[must_use]
	pub fn is_root_dn(&self) -> bool {
		self.base_dn == ROOT_DN
	}

	/// The scheme prefix.
	#[must_use]
	pub fn protocol(&self) -> &'static str {
		if self.ssl {
			SSL_PROTOCOL
		} else {
			PROTOCOL
		}
	}

	/// `host[:port]/`, the port only if it differs from the scheme default.
	fn authority(&self) -> Option<String> {
		let host = self.host.as_deref().filter(|h| !h.is_empty())?;
		let default_port = if self.ssl { SSL_PORT } else { PORT };
		Some(if self.port == default_port {
			format!("{host}/")
		} else {
			format!("{host}:{}/", self.port)
		})
	}

	/// The provider path of an object, `LDAP://host/path`.
	#[must_use]
	pub fn object_path(&self, path: &str) -> String {
		format!("{}{}{path}", self.protocol(), self.authority().unwrap_or_default())
	}
}

/// A command dialect.
///
/// Only [`command_order`](Dialect::command_order),
/// [`command_separator`](Dialect::command_separator),
/// [`escape_value`](Dialect::escape_value),
/// [`compile_filters`](Dialect::compile_filters) and
/// [`compile_from`](Dialect::compile_from) must be provided.
pub trait Dialect: fmt::Debug {
	/// Names of the command parts in output order. Known names are `FROM`,
	/// `FILTERS` and `SELECT`.
	fn command_order(&self) -> &[&str];

	/// Text placed between command parts.
	fn command_separator(&self) -> &str;

	/// Whether empty parts still take their position in the command.
	fn keeps_empty_parts(&self) -> bool {
		true
	}

	/// Whether explicit filter groups are compiled.
	fn supports_groups(&self) -> bool {
		false
	}

	/// Escape a literal value for use in a predicate.
	fn escape_value(&self, value: &str) -> String;

	/// Escape a value and surround it with wildcards, which themselves stay
	/// unescaped.
	fn escape_wildcard(&self, value: &str, leading: bool, trailing: bool) -> String {
		let lead = if leading { "*" } else { "" };
		let trail = if trailing { "*" } else { "" };
		self.escape_value(&format!("{lead}{value}{trail}"))
	}

	/// Negate a predicate.
	fn negate(&self, expression: &str) -> String {
		format!("NOT {expression}")
	}

	/// A range predicate, if the dialect has one. Dialects without it get a
	/// pair of `>=` and `<=` predicates instead.
	fn between(&self, _field: &str, _min: &str, _max: &str) -> Option<String> {
		None
	}

	/// Escape an attribute name.
	fn escape_identifier(&self, identifier: &str) -> String {
		identifier.to_owned()
	}

	/// Compile the filter list.
	fn compile_filters(&self, filters: &[Filter]) -> String;

	/// Compile the attribute list.
	fn compile_select(&self, attributes: &[String]) -> Result<String, Error> {
		join_attributes(self, attributes)
	}

	/// Compile the search root.
	fn compile_from(&self, root: &SearchRoot) -> String;

	/// Assemble a full command from its parts in
	/// [`command_order`](Dialect::command_order).
	fn compile_command(
		&self,
		root: &SearchRoot,
		filters: &[Filter],
		attributes: &[String],
	) -> Result<String, Error> {
		let mut parts = Vec::with_capacity(self.command_order().len());
		for part in self.command_order() {
			let compiled = match *part {
				"FROM" => self.compile_from(root),
				"FILTERS" => self.compile_filters(filters),
				"SELECT" => self.compile_select(attributes)?,
				other => return Err(Error::Dialect(format!("Unknown command part `{other}`"))),
			};
			if compiled.is_empty() && !self.keeps_empty_parts() {
				continue;
			}
			parts.push(compiled);
		}
		Ok(parts.join(self.command_separator()))
	}
}

/// Validate, escape and comma-join attribute names.
fn join_attributes<D: Dialect + ?Sized>(
	dialect: &D,
	attributes: &[String],
) -> Result<String, Error> {
	if attributes.is_empty() {
		return Err(Error::Dialect("No attributes selected".to_owned()));
	}
	let mut escaped = Vec::with_capacity(attributes.len());
	for attribute in attributes {
		if attribute.trim().is_empty() || attribute.contains(',') {
			return Err(Error::Dialect(format!("Invalid attribute name `{attribute}`")));
		}
		escaped.push(dialect.escape_identifier(attribute.trim()));
	}
	Ok(escaped.join(","))
}

/// Prefix notation dialect: `<root>;filter;attributes`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDialect;

impl NativeDialect {
	/// Wrap every expression in parentheses and, for more than one, prefix the
	/// whole with the operator.
	fn concatenate(expressions: &[&str], operator: char) -> String {
		let joined: String = expressions.iter().map(|e| format!("({e})")).collect();
		if expressions.len() > 1 {
			format!("({operator}{joined})")
		} else {
			joined
		}
	}
}

impl Dialect for NativeDialect {
	fn command_order(&self) -> &[&str] {
		&["FROM", "FILTERS", "SELECT"]
	}

	fn command_separator(&self) -> &str {
		";"
	}

	fn escape_value(&self, value: &str) -> String {
		ldap3::ldap_escape(value).into_owned()
	}

	fn escape_wildcard(&self, value: &str, leading: bool, trailing: bool) -> String {
		let lead = if leading { "*" } else { "" };
		let trail = if trailing { "*" } else { "" };
		format!("{lead}{}{trail}", self.escape_value(value))
	}

	fn negate(&self, expression: &str) -> String {
		format!("!({expression})")
	}

	fn compile_filters(&self, filters: &[Filter]) -> String {
		let mut and = Vec::new();
		let mut or = Vec::new();
		for filter in filters {
			if let Filter::Expression { boolean, expression } = filter {
				match boolean {
					BooleanType::And => and.push(expression.as_str()),
					BooleanType::Or => or.push(expression.as_str()),
				}
			}
		}
		match (and.is_empty(), or.is_empty()) {
			(_, true) => Self::concatenate(&and, '&'),
			(true, false) => Self::concatenate(&or, '|'),
			(false, false) => {
				let members: String = and.iter().map(|e| format!("({e})")).collect();
				format!("(&{members}{})", Self::concatenate(&or, '|'))
			}
		}
	}

	fn compile_from(&self, root: &SearchRoot) -> String {
		let authority = if root.is_root_dn() { None } else { root.authority() };
		format!("<{}{}{}>", root.protocol(), authority.unwrap_or_default(), root.base_dn)
	}
}

/// SQL-like dialect: `SELECT attributes FROM 'root' WHERE predicates`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlDialect;

/// Whether a value reads as a number and can go into a predicate unquoted.
fn is_numeric(value: &str) -> bool {
	let value = value.trim();
	!value.is_empty()
		&& value.bytes().any(|b| b.is_ascii_digit())
		&& value
			.bytes()
			.all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
		&& value.parse::<f64>().is_ok()
}

impl Dialect for SqlDialect {
	fn command_order(&self) -> &[&str] {
		&["SELECT", "FROM", "FILTERS"]
	}

	fn command_separator(&self) -> &str {
		" "
	}

	fn keeps_empty_parts(&self) -> bool {
		false
	}

	fn supports_groups(&self) -> bool {
		true
	}

	fn escape_value(&self, value: &str) -> String {
		if is_numeric(value) {
			value.to_owned()
		} else {
			format!("'{}'", value.replace('\'', "''"))
		}
	}

	fn between(&self, field: &str, min: &str, max: &str) -> Option<String> {
		Some(format!("{field} BETWEEN {} AND {}", self.escape_value(min), self.escape_value(max)))
	}

	fn compile_filters(&self, filters: &[Filter]) -> String {
		let mut clause = String::new();
		let mut depth = 0_usize;
		let mut after_open = true;
		for filter in filters {
			match filter {
				Filter::Expression { boolean, expression } => {
					if !after_open {
						clause.push(' ');
						clause.push_str(boolean.as_sql());
						clause.push(' ');
					} else if !clause.is_empty() && !clause.ends_with('(') {
						clause.push(' ');
					}
					clause.push_str(expression);
					after_open = false;
				}
				Filter::OpenGroup(boolean) => {
					if !after_open {
						clause.push(' ');
						clause.push_str(boolean.as_sql());
						clause.push(' ');
					}
					clause.push('(');
					depth += 1;
					after_open = true;
				}
				Filter::CloseGroup if depth > 0 => {
					if clause.ends_with('(') {
						// Empty group: drop it together with its operator.
						clause.pop();
						for operator in [" AND ", " OR "] {
							if let Some(rest) = clause.strip_suffix(operator) {
								let len = rest.len();
								clause.truncate(len);
								break;
							}
						}
						after_open = clause.is_empty() || clause.ends_with('(');
					} else {
						clause.push(')');
						after_open = false;
					}
					depth -= 1;
				}
				Filter::CloseGroup => {}
			}
		}
		for _ in 0..depth {
			clause.push(')');
		}
		if clause.is_empty() || clause.chars().all(|c| c == '(' || c == ')') {
			String::new()
		} else {
			format!("WHERE {clause}")
		}
	}

	fn compile_select(&self, attributes: &[String]) -> Result<String, Error> {
		Ok(format!("SELECT {}", join_attributes(self, attributes)?))
	}

	fn compile_from(&self, root: &SearchRoot) -> String {
		format!("FROM '{}'", root.object_path(&root.base_dn))
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use super::{
		BooleanType, Dialect, DialectKind, Filter, NativeDialect, SearchRoot, SqlDialect,
	};
	use crate::error::Error;

	fn and(expression: &str) -> Filter {
		Filter::expression(BooleanType::And, expression)
	}

	fn or(expression: &str) -> Filter {
		Filter::expression(BooleanType::Or, expression)
	}

	fn root() -> SearchRoot {
		SearchRoot {
			host: Some("dc1.example.com".to_owned()),
			base_dn: "DC=example,DC=com".to_owned(),
			..SearchRoot::default()
		}
	}

	#[test]
	fn native_filters() {
		let dialect = NativeDialect;
		assert_eq!(dialect.compile_filters(&[]), "");
		assert_eq!(dialect.compile_filters(&[and("cn=a")]), "(cn=a)");
		assert_eq!(dialect.compile_filters(&[and("cn=a"), and("sn=b")]), "(&(cn=a)(sn=b))");
		assert_eq!(dialect.compile_filters(&[or("cn=a"), or("cn=b")]), "(|(cn=a)(cn=b))");
		assert_eq!(
			dialect.compile_filters(&[and("objectClass=user"), or("cn=a"), or("cn=b")]),
			"(&(objectClass=user)(|(cn=a)(cn=b)))"
		);
		assert_eq!(
			dialect.compile_filters(&[and("a=1"), and("b=2"), or("c=3")]),
			"(&(a=1)(b=2)(c=3))",
			"a single OR member is not grouped"
		);
	}

	#[test]
	fn native_ignores_groups() {
		let dialect = NativeDialect;
		let filters =
			[Filter::OpenGroup(BooleanType::And), and("cn=a"), Filter::CloseGroup, and("sn=b")];
		assert_eq!(dialect.compile_filters(&filters), "(&(cn=a)(sn=b))");
	}

	#[test]
	fn native_escaping() {
		let dialect = NativeDialect;
		assert_eq!(dialect.escape_value("a*b(c)"), r"a\2ab\28c\29");
		assert_eq!(dialect.escape_wildcard("a*", true, true), r"*a\2a*");
		assert_eq!(dialect.negate("cn=a"), "!(cn=a)");
	}

	#[test]
	fn native_command() -> Result<(), Box<dyn std::error::Error>> {
		let command = NativeDialect.compile_command(
			&root(),
			&[and("cn=a")],
			&["cn".to_owned(), "objectclass".to_owned()],
		)?;
		assert_eq!(command, "<LDAP://dc1.example.com/DC=example,DC=com>;(cn=a);cn,objectclass");

		let command = NativeDialect.compile_command(&root(), &[], &["cn".to_owned()])?;
		assert_eq!(command, "<LDAP://dc1.example.com/DC=example,DC=com>;;cn");
		Ok(())
	}

	#[test]
	fn native_from() {
		let dialect = NativeDialect;
		let mut root = root();
		root.port = 3268;
		assert_eq!(dialect.compile_from(&root), "<LDAP://dc1.example.com:3268/DC=example,DC=com>");
		root.ssl = true;
		root.port = 636;
		assert_eq!(dialect.compile_from(&root), "<LDAPS://dc1.example.com/DC=example,DC=com>");
		root.base_dn = "RootDSE".to_owned();
		assert_eq!(dialect.compile_from(&root), "<LDAPS://RootDSE>");
		assert_eq!(dialect.compile_from(&SearchRoot::default()), "<LDAP://RootDSE>");
	}

	#[test]
	fn sql_escaping() {
		let dialect = SqlDialect;
		assert_eq!(dialect.escape_value("O'Brien"), "'O''Brien'");
		assert_eq!(dialect.escape_value("42"), "42");
		assert_eq!(dialect.escape_value("-1.5e3"), "-1.5e3");
		assert_eq!(dialect.escape_value("inf"), "'inf'");
		assert_eq!(dialect.escape_wildcard("Jo", false, true), "'Jo*'");
		assert_eq!(
			dialect.between("badPwdCount", "1", "3").unwrap(),
			"badPwdCount BETWEEN 1 AND 3"
		);
	}

	#[test]
	fn sql_filters() {
		let dialect = SqlDialect;
		assert_eq!(dialect.compile_filters(&[]), "");
		assert_eq!(dialect.compile_filters(&[and("cn='a'")]), "WHERE cn='a'");
		assert_eq!(
			dialect.compile_filters(&[
				and("objectClass='user'"),
				Filter::OpenGroup(BooleanType::And),
				or("cn='a'"),
				or("cn='b'"),
				Filter::CloseGroup,
				or("sn='c'"),
			]),
			"WHERE objectClass='user' AND (cn='a' OR cn='b') OR sn='c'"
		);
	}

	#[test]
	fn sql_nested_and_leading_groups() {
		let dialect = SqlDialect;
		assert_eq!(
			dialect.compile_filters(&[
				Filter::OpenGroup(BooleanType::And),
				and("a=1"),
				Filter::OpenGroup(BooleanType::Or),
				and("b=2"),
				or("c=3"),
				Filter::CloseGroup,
				Filter::CloseGroup,
				and("d=4"),
			]),
			"WHERE (a=1 OR (b=2 OR c=3)) AND d=4"
		);
		assert_eq!(
			dialect.compile_filters(&[Filter::OpenGroup(BooleanType::And), and("a=1")]),
			"WHERE (a=1)",
			"unclosed groups are closed"
		);
		assert_eq!(
			dialect.compile_filters(&[
				and("a=1"),
				Filter::OpenGroup(BooleanType::And),
				Filter::CloseGroup
			]),
			"WHERE a=1",
			"empty groups are dropped"
		);
	}

	#[test]
	fn sql_command() -> Result<(), Box<dyn std::error::Error>> {
		let command = SqlDialect.compile_command(
			&root(),
			&[and("cn='O''Brien'")],
			&["cn".to_owned(), "objectclass".to_owned()],
		)?;
		assert_eq!(
			command,
			concat!(
				"SELECT cn,objectclass FROM 'LDAP://dc1.example.com/DC=example,DC=com' ",
				"WHERE cn='O''Brien'"
			)
		);

		let command = SqlDialect.compile_command(&SearchRoot::default(), &[], &["*".to_owned()])?;
		assert_eq!(command, "SELECT * FROM 'LDAP://RootDSE'");
		Ok(())
	}

	#[test]
	fn invalid_select() {
		assert!(matches!(NativeDialect.compile_select(&[]), Err(Error::Dialect(_))));
		assert!(matches!(
			SqlDialect.compile_select(&["cn,sn".to_owned()]),
			Err(Error::Dialect(_))
		));
		assert!(matches!(NativeDialect.compile_select(&[" ".to_owned()]), Err(Error::Dialect(_))));
	}

	#[derive(Debug)]
	struct BrokenDialect;

	impl Dialect for BrokenDialect {
		fn command_order(&self) -> &[&str] {
			&["FROM", "WHERE"]
		}

		fn command_separator(&self) -> &str {
			";"
		}

		fn escape_value(&self, value: &str) -> String {
			value.to_owned()
		}

		fn compile_filters(&self, _filters: &[Filter]) -> String {
			String::new()
		}

		fn compile_from(&self, root: &SearchRoot) -> String {
			root.base_dn.clone()
		}
	}

	#[test]
	fn unknown_command_part() {
		let err = BrokenDialect.compile_command(&root(), &[], &["cn".to_owned()]).unwrap_err();
		assert!(matches!(err, Error::Dialect(ref message) if message.contains("WHERE")));
	}

	#[test]
	fn dialect_kind() -> Result<(), Box<dyn std::error::Error>> {
		assert_eq!("SQL".parse::<DialectKind>()?, DialectKind::Sql);
		assert_eq!("native".parse::<DialectKind>()?, DialectKind::Native);
		assert!(matches!("xml".parse::<DialectKind>(), Err(Error::Configuration { .. })));
		assert!(DialectKind::Sql.dialect().supports_groups());
		assert!(!DialectKind::Native.dialect().supports_groups());
		Ok(())
	}
}

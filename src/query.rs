//! Fluent search builder.
use std::{fmt, sync::Arc};

use ldap3::Scope;
use tracing::debug;

use crate::{
	connection::{Connection, SearchProperties},
	cursor::Cursor,
	dialect::{BooleanType, Dialect, Filter, SearchRoot},
	directory::Directory,
	entry::{Entry, ADS_PATH},
	error::Error,
	models::DirectoryObject,
};

/// Selects every attribute.
pub const WILDCARD: &str = "*";

/// Builds a search against a [`Directory`] and runs it.
///
/// Predicates are accumulated in declaration order and compiled by the
/// directory's [`Dialect`] when the query runs.
#[must_use = "a query does nothing until it is run"]
pub struct QueryBuilder<'a, C: Connection> {
	/// Directory the query runs against
	directory: &'a mut Directory<C>,
	/// Compiles the command text
	dialect: Arc<dyn Dialect>,
	/// Where the search starts
	root: SearchRoot,
	/// Requested attributes
	attributes: Vec<String>,
	/// Accumulated predicates and group tokens
	filters: Vec<Filter>,
	/// Named values for `:name` placeholders
	bindings: Vec<(String, String)>,
	/// Scope, page size and timeout
	properties: SearchProperties,
}

impl<C: Connection> fmt::Debug for QueryBuilder<'_, C> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QueryBuilder")
			.field("dialect", &self.dialect)
			.field("root", &self.root)
			.field("attributes", &self.attributes)
			.field("filters", &self.filters)
			.field("bindings", &self.bindings)
			.field("properties", &self.properties)
			.finish_non_exhaustive()
	}
}

impl<'a, C: Connection> QueryBuilder<'a, C> {
	/// A query rooted at the directory's base DN. If the base DN is still the
	/// root discovery sentinel and the session is bound, it is resolved to the
	/// default naming context.
	pub fn new(directory: &'a mut Directory<C>) -> Result<Self, Error> {
		let mut root = directory.search_root().clone();
		if root.is_root_dn() && directory.is_bound() {
			root.base_dn = directory.naming_context()?;
		}
		Ok(Self {
			dialect: directory.dialect(),
			properties: directory.config().search_properties(),
			directory,
			root,
			attributes: vec![WILDCARD.to_owned()],
			filters: Vec::new(),
			bindings: Vec::new(),
		})
	}

	/// The base DN of the search.
	#[must_use]
	pub fn dn(&self) -> &str {
		&self.root.base_dn
	}

	/// Change the base DN of the search. Empty values are ignored.
	pub fn set_dn(mut self, dn: impl fmt::Display) -> Self {
		let dn = dn.to_string();
		if !dn.is_empty() {
			self.root.base_dn = dn;
		}
		self
	}

	/// Alias of [`set_dn`](Self::set_dn).
	pub fn from(self, dn: impl fmt::Display) -> Self {
		self.set_dn(dn)
	}

	/// The search scope.
	#[must_use]
	pub fn search_scope(&self) -> Scope {
		self.properties.scope
	}

	/// Change the search scope.
	pub fn scope(mut self, scope: Scope) -> Self {
		self.properties.scope = scope;
		self
	}

	/// Replace the requested attributes. An empty list keeps the current
	/// selection.
	pub fn select<S: AsRef<str>>(mut self, attributes: &[S]) -> Self {
		if !attributes.is_empty() {
			self.attributes = attributes.iter().map(|a| a.as_ref().to_owned()).collect();
		}
		self
	}

	/// The attributes that will be requested: the selection plus the object
	/// class attribute unless everything is selected, without duplicates.
	#[must_use]
	pub fn selects(&self) -> Vec<String> {
		let mut selects = self.attributes.clone();
		if !self.selects_all() {
			selects.push("objectclass".to_owned());
		}
		let mut seen = Vec::with_capacity(selects.len());
		selects.retain(|attribute| {
			let key = attribute.to_lowercase();
			if seen.contains(&key) {
				return false;
			}
			seen.push(key);
			true
		});
		selects
	}

	/// Whether the wildcard is selected.
	fn selects_all(&self) -> bool {
		self.attributes.iter().any(|a| a == WILDCARD)
	}

	/// The accumulated filters.
	#[must_use]
	pub fn filters(&self) -> &[Filter] {
		&self.filters
	}

	/// The bound placeholder values.
	#[must_use]
	pub fn bindings(&self) -> &[(String, String)] {
		&self.bindings
	}

	/// Drop every filter and binding.
	pub fn clear_filters(mut self) -> Self {
		self.filters.clear();
		self.bindings.clear();
		self
	}

	/// Add a raw predicate. `:name` placeholders in the expression are
	/// replaced with the escaped value bound to `name` when the query is
	/// compiled; later bindings of the same name win.
	pub fn where_expr(
		mut self,
		expression: &str,
		boolean: BooleanType,
		bindings: &[(&str, &str)],
	) -> Self {
		for (name, value) in bindings {
			let name = name.trim_start_matches(':');
			self.bindings.retain(|(bound, _)| bound != name);
			self.bindings.push((name.to_owned(), (*value).to_owned()));
		}
		self.filters.push(Filter::expression(boolean, expression));
		self
	}

	/// Add a raw predicate joined with AND.
	pub fn and_where(self, expression: &str, bindings: &[(&str, &str)]) -> Self {
		self.where_expr(expression, BooleanType::And, bindings)
	}

	/// Add a raw predicate joined with OR.
	pub fn or_where(self, expression: &str, bindings: &[(&str, &str)]) -> Self {
		self.where_expr(expression, BooleanType::Or, bindings)
	}

	/// Open an explicit group. Only dialects that support groups record it.
	pub fn open_where_group(mut self, boolean: BooleanType) -> Self {
		if self.dialect.supports_groups() {
			self.filters.push(Filter::OpenGroup(boolean));
		}
		self
	}

	/// Close the innermost explicit group.
	pub fn close_where_group(mut self) -> Self {
		if self.dialect.supports_groups() {
			self.filters.push(Filter::CloseGroup);
		}
		self
	}

	/// `field=value`
	fn equals(&self, field: &str, value: &str) -> String {
		format!("{field}={}", self.dialect.escape_value(value))
	}

	/// `field=value` with wildcards around the escaped value.
	fn like(&self, field: &str, value: &str, leading: bool, trailing: bool) -> String {
		format!("{field}={}", self.dialect.escape_wildcard(value, leading, trailing))
	}

	/// Add an equality predicate.
	pub fn where_equals(self, field: &str, value: &str, boolean: BooleanType) -> Self {
		let expression = self.equals(field, value);
		self.where_expr(&expression, boolean, &[])
	}

	/// Add a negated equality predicate.
	pub fn where_not_equals(self, field: &str, value: &str, boolean: BooleanType) -> Self {
		let expression = self.dialect.negate(&self.equals(field, value));
		self.where_expr(&expression, boolean, &[])
	}

	/// Match any of the values. An empty list adds nothing.
	pub fn where_in<S: AsRef<str>>(
		mut self,
		field: &str,
		values: &[S],
		boolean: BooleanType,
	) -> Self {
		if values.is_empty() {
			return self;
		}
		self = self.open_where_group(boolean);
		for value in values {
			self = self.where_equals(field, value.as_ref(), BooleanType::Or);
		}
		self.close_where_group()
	}

	/// Match values in the inclusive range.
	pub fn where_between(self, field: &str, min: &str, max: &str, boolean: BooleanType) -> Self {
		if let Some(expression) = self.dialect.between(field, min, max) {
			return self.where_expr(&expression, boolean, &[]);
		}
		let lower = format!("{field}>={}", self.dialect.escape_value(min));
		let upper = format!("{field}<={}", self.dialect.escape_value(max));
		self.open_where_group(boolean)
			.where_expr(&lower, BooleanType::And, &[])
			.where_expr(&upper, BooleanType::And, &[])
			.close_where_group()
	}

	/// Match values containing `value`.
	pub fn where_contains(self, field: &str, value: &str, boolean: BooleanType) -> Self {
		let expression = self.like(field, value, true, true);
		self.where_expr(&expression, boolean, &[])
	}

	/// Match values not containing `value`.
	pub fn where_not_contains(self, field: &str, value: &str, boolean: BooleanType) -> Self {
		let expression = self.dialect.negate(&self.like(field, value, true, true));
		self.where_expr(&expression, boolean, &[])
	}

	/// Match values starting with `value`.
	pub fn where_starts_with(self, field: &str, value: &str, boolean: BooleanType) -> Self {
		let expression = self.like(field, value, false, true);
		self.where_expr(&expression, boolean, &[])
	}

	/// Match values not starting with `value`.
	pub fn where_not_starts_with(self, field: &str, value: &str, boolean: BooleanType) -> Self {
		let expression = self.dialect.negate(&self.like(field, value, false, true));
		self.where_expr(&expression, boolean, &[])
	}

	/// Match values ending with `value`.
	pub fn where_ends_with(self, field: &str, value: &str, boolean: BooleanType) -> Self {
		let expression = self.like(field, value, true, false);
		self.where_expr(&expression, boolean, &[])
	}

	/// Match values not ending with `value`.
	pub fn where_not_ends_with(self, field: &str, value: &str, boolean: BooleanType) -> Self {
		let expression = self.dialect.negate(&self.like(field, value, true, false));
		self.where_expr(&expression, boolean, &[])
	}

	/// Match entries that have a value for `field`.
	pub fn where_present(self, field: &str, boolean: BooleanType) -> Self {
		self.where_starts_with(field, "", boolean)
	}

	/// Match direct members of the group with the given distinguished name.
	pub fn where_member_of(self, dn: impl fmt::Display) -> Self {
		self.where_equals("memberOf", &dn.to_string(), BooleanType::And)
	}

	/// Replace the placeholders of an expression with their bound values in
	/// one left to right pass, so bound values are never substituted again.
	/// At each `:` the longest matching name wins, so `:name` does not
	/// clobber `:names`.
	fn bind(&self, expression: &str) -> String {
		let mut names: Vec<_> = self.bindings.iter().filter(|(name, _)| !name.is_empty()).collect();
		names.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));
		let mut bound = String::with_capacity(expression.len());
		let mut rest = expression;
		while let Some(at) = rest.find(':') {
			bound.push_str(&rest[..at]);
			let after = &rest[at + 1..];
			match names.iter().find(|(name, _)| after.starts_with(name.as_str())) {
				Some((name, value)) => {
					bound.push_str(&self.dialect.escape_value(value));
					rest = &after[name.len()..];
				}
				None => {
					bound.push(':');
					rest = after;
				}
			}
		}
		bound.push_str(rest);
		bound
	}

	/// Compile the command text.
	pub fn query(&self) -> Result<String, Error> {
		let filters: Vec<Filter> = self
			.filters
			.iter()
			.map(|filter| match filter {
				Filter::Expression { boolean, expression } => {
					Filter::expression(*boolean, self.bind(expression))
				}
				other => other.clone(),
			})
			.collect();
		self.dialect.compile_command(&self.root, &filters, &self.selects())
	}

	/// Run the query.
	pub fn get(self) -> Result<Cursor<'a, C::Handle>, Error> {
		let command = self.query()?;
		debug!(%command, "Running query");
		let resolve = self.selects_all();
		let directory = self.directory;
		let handle = directory.execute(&command, &self.properties)?;
		let parser = directory.parser();
		let container_name_only = directory.config().container_name_only;
		let mut cursor = Cursor::new(handle, Arc::clone(&parser), container_name_only)?;
		if resolve {
			let connection = directory.connection_mut();
			cursor.after_fetch(move |entry: Entry| {
				if !entry.is_ads_path_only() {
					return Ok(entry);
				}
				let Some(path) = entry.first_str(ADS_PATH) else {
					return Ok(entry);
				};
				let raw = connection.get_ldap_object(path)?;
				Ok(parser.parse_entry(&raw, container_name_only))
			});
		}
		Ok(cursor)
	}

	/// The first result, selecting `attributes` if any are given.
	pub fn first<S: AsRef<str>>(self, attributes: &[S]) -> Result<Option<DirectoryObject>, Error> {
		self.select(attributes).get()?.current()
	}

	/// The first result, or [`Error::EntryNotFound`] carrying the query text.
	pub fn first_or_fail<S: AsRef<str>>(self, attributes: &[S]) -> Result<DirectoryObject, Error> {
		let query = self.select(attributes);
		let text = query.query()?;
		query.first::<&str>(&[])?.ok_or(Error::EntryNotFound { query: text })
	}

	/// Run a search for entries whose `attribute` equals `value`.
	pub fn find_by<S: AsRef<str>>(
		self,
		attribute: &str,
		value: &str,
		attributes: &[S],
	) -> Result<Cursor<'a, C::Handle>, Error> {
		self.where_equals(attribute, value, BooleanType::And).select(attributes).get()
	}

	/// The first entry whose `attribute` equals `value`.
	pub fn first_by<S: AsRef<str>>(
		self,
		attribute: &str,
		value: &str,
		attributes: &[S],
	) -> Result<Option<DirectoryObject>, Error> {
		match self.first_by_or_fail(attribute, value, attributes) {
			Ok(object) => Ok(Some(object)),
			Err(Error::EntryNotFound { .. }) => Ok(None),
			Err(err) => Err(err),
		}
	}

	/// The first entry whose `attribute` equals `value`, or
	/// [`Error::EntryNotFound`].
	pub fn first_by_or_fail<S: AsRef<str>>(
		self,
		attribute: &str,
		value: &str,
		attributes: &[S],
	) -> Result<DirectoryObject, Error> {
		self.where_equals(attribute, value, BooleanType::And).first_or_fail(attributes)
	}
}

#[cfg(test)]
mod tests {
	#![allow(clippy::unwrap_used)]

	use ldap3::Scope;

	use super::QueryBuilder;
	use crate::{
		config::Config,
		connection::mock::MockConnection,
		dialect::{BooleanType, DialectKind},
		directory::Directory,
		error::Error,
	};

	fn directory(dialect: DialectKind) -> Directory<MockConnection> {
		let config = Config {
			host: Some("dc01".to_owned()),
			base_dn: "DC=example,DC=com".to_owned(),
			dialect,
			auto_connect: false,
			..Config::default()
		};
		Directory::new(config, MockConnection::default()).unwrap()
	}

	#[test]
	fn native_filter_shapes() -> Result<(), Box<dyn std::error::Error>> {
		let mut directory = directory(DialectKind::Native);
		let base = "<LDAP://dc01/DC=example,DC=com>";

		assert_eq!(directory.search()?.query()?, format!("{base};;*"));
		assert_eq!(
			directory.search()?.where_equals("cn", "jdoe", BooleanType::And).query()?,
			format!("{base};(cn=jdoe);*")
		);
		assert_eq!(
			directory
				.search()?
				.where_equals("cn", "jdoe", BooleanType::And)
				.where_equals("sn", "Doe", BooleanType::And)
				.select(&["cn", "CN", "mail"])
				.query()?,
			format!("{base};(&(cn=jdoe)(sn=Doe));cn,mail,objectclass")
		);
		assert_eq!(
			directory
				.search()?
				.where_equals("objectCategory", "person", BooleanType::And)
				.where_in("cn", &["a", "b"], BooleanType::And)
				.query()?,
			format!("{base};(&(objectCategory=person)(|(cn=a)(cn=b)));*")
		);
		Ok(())
	}

	#[test]
	fn native_wrappers() -> Result<(), Box<dyn std::error::Error>> {
		fn filters(query: QueryBuilder<'_, MockConnection>) -> String {
			query.query().unwrap()
		}

		let mut directory = directory(DialectKind::Native);
		assert!(filters(directory.search()?.where_contains("cn", "a*b", BooleanType::And))
			.contains(";(cn=*a\\2ab*);"));
		assert!(filters(directory.search()?.where_not_starts_with("cn", "adm", BooleanType::And))
			.contains(";(!(cn=adm*));"));
		let ends = directory.search()?.where_ends_with("mail", "@example.com", BooleanType::And);
		assert!(filters(ends).contains(";(mail=*@example.com);"));
		let between = directory.search()?.where_between("uSNChanged", "10", "20", BooleanType::And);
		assert!(filters(between).contains(";(&(uSNChanged>=10)(uSNChanged<=20));"));
		assert!(filters(directory.search()?.where_member_of("CN=Staff,DC=example,DC=com"))
			.contains(";(memberOf=CN=Staff,DC=example,DC=com);"));
		assert!(filters(directory.search()?.where_present("objectClass", BooleanType::And))
			.contains(";(objectClass=*);"));
		Ok(())
	}

	#[test]
	fn sql_escaping_and_groups() -> Result<(), Box<dyn std::error::Error>> {
		let mut directory = directory(DialectKind::Sql);
		assert_eq!(
			directory
				.search()?
				.where_equals("cn", "O'Brien", BooleanType::And)
				.select(&["cn"])
				.query()?,
			"SELECT cn,objectclass FROM 'LDAP://dc01/DC=example,DC=com' WHERE cn='O''Brien'"
		);
		let query = directory
			.search()?
			.where_equals("objectCategory", "person", BooleanType::And)
			.where_in("cn", &["a", "b"], BooleanType::And)
			.where_between("badPwdCount", "1", "5", BooleanType::Or)
			.where_in::<&str>("sn", &[], BooleanType::And)
			.query()?;
		assert!(query.ends_with(
			"WHERE objectCategory='person' AND (cn='a' OR cn='b') OR badPwdCount BETWEEN 1 AND 5"
		));
		Ok(())
	}

	#[test]
	fn bindings() -> Result<(), Box<dyn std::error::Error>> {
		let mut directory = directory(DialectKind::Sql);
		let query = directory
			.search()?
			.and_where("cn=:name AND sn=:names", &[(":name", "x"), ("names", "O'Y")])
			.and_where("title=:name", &[("name", "z")])
			.query()?;
		assert!(query.ends_with("WHERE cn='z' AND sn='O''Y' AND title='z'"));

		let query = directory
			.search()?
			.and_where("a=:a AND b=:b AND c='x:y'", &[("a", ":b"), ("b", "x")])
			.query()?;
		assert!(
			query.ends_with("WHERE a=':b' AND b='x' AND c='x:y'"),
			"bound values are not rebound"
		);
		let cleared = directory.search()?.and_where("cn=:a", &[("a", "b")]).clear_filters();
		assert!(cleared.bindings().is_empty());
		Ok(())
	}

	#[test]
	fn root_and_scope() -> Result<(), Box<dyn std::error::Error>> {
		let mut directory = directory(DialectKind::Native);
		let query = directory.search()?.from("OU=Staff,DC=example,DC=com").scope(Scope::OneLevel);
		assert_eq!(query.dn(), "OU=Staff,DC=example,DC=com");
		assert!(matches!(query.search_scope(), Scope::OneLevel));
		assert!(query.query()?.starts_with("<LDAP://dc01/OU=Staff,DC=example,DC=com>"));
		Ok(())
	}

	#[test]
	fn invalid_selection() -> Result<(), Box<dyn std::error::Error>> {
		let mut directory = directory(DialectKind::Native);
		assert!(matches!(directory.search()?.select(&["cn,sn"]).query(), Err(Error::Dialect(_))));
		Ok(())
	}

	#[test]
	fn unbound_search_fails() -> Result<(), Box<dyn std::error::Error>> {
		let mut directory = directory(DialectKind::Native);
		assert!(matches!(directory.search()?.get(), Err(Error::NotConnected)));
		Ok(())
	}
}

//! User accounts.
use std::cell::OnceCell;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::{
	entry::Entry,
	error::Error,
	models::{
		membership::{contains_any, memberships},
		with_default_class, Address, Membership, Model,
	},
	value::{Value, LDAP_EPOCH},
};

/// A user account.
#[derive(Debug, Clone)]
pub struct User {
	/// Attributes
	entry: Entry,
	/// Address, read from the attributes on first use
	address: OnceCell<Address>,
}

impl Model for User {
	const DEFAULT_CLASSES: &'static [&'static str] =
		&["top", "person", "organizationalPerson", "user"];
	const DEFAULT_ATTRIBUTES: &'static [&'static str] = &[
		"objectclass",
		"distinguishedName",
		"sAMAccountName",
		"givenName",
		"name",
		"userWorkstations",
		"mail",
		"description",
		"title",
		"street",
		"postalCode",
		"st",
		"l",
		"co",
		"msExchDelegateListBL",
		"mobile",
		"telephoneNumber",
		"department",
		"extensionAttribute1",
		"memberOf",
		"company",
		"thumbnailPhoto",
		"pwdLastSet",
		"badPwdCount",
		"badPasswordTime",
		"lastLogonTimestamp",
		"lockoutTime",
		"objectguid",
		"objectsid",
	];
	const COLUMN_MAP: &'static [(&'static str, &'static [&'static str])] = &[
		("objectClass", &["objectclass"]),
		("dn", &["distinguishedName"]),
		("login", &["sAMAccountName"]),
		("firstName", &["givenName"]),
		("name", &["name"]),
		("workstations", &["userWorkstations"]),
		("mail", &["mail"]),
		("jobTitle", &["description"]),
		("jobRole", &["title"]),
		("address", &Address::ATTRIBUTES),
		("mailboxes", &["msExchDelegateListBL"]),
		("mobile", &["mobile"]),
		("phone", &["telephoneNumber"]),
		("department", &["department"]),
		("departmentCode", &["extensionAttribute1"]),
		("memberOf", &["memberOf"]),
		("company", &["company"]),
		("photo", &["thumbnailPhoto"]),
		("passwordLastSet", &["pwdLastSet"]),
		("passwordErrorCount", &["badPwdCount"]),
		("passwordErrorTime", &["badPasswordTime"]),
		("lastLogon", &["lastLogonTimestamp"]),
		("lockoutTime", &["lockoutTime"]),
		("objectGuid", &["objectguid"]),
		("objectSid", &["objectsid"]),
	];

	fn from_entry(entry: Entry) -> Self {
		let mut entry = with_default_class::<Self>(entry);
		if let Some(Value::List(values)) = entry.get("description") {
			let first = values.first().cloned().unwrap_or(Value::Null);
			entry.set("description", first);
		}
		Self { entry, address: OnceCell::new() }
	}

	fn entry(&self) -> &Entry {
		&self.entry
	}

	fn entry_mut(&mut self) -> &mut Entry {
		self.address.take();
		&mut self.entry
	}

	fn into_entry(self) -> Entry {
		self.entry
	}
}

impl Default for User {
	fn default() -> Self {
		Self::new()
	}
}

impl PartialEq for User {
	fn eq(&self, other: &Self) -> bool {
		self.entry == other.entry
	}
}

impl User {
	/// A new user with the default object classes.
	#[must_use]
	pub fn new() -> Self {
		Self::from_entry(Entry::new())
	}

	/// Lower-cased account name.
	#[must_use]
	pub fn login(&self) -> Option<String> {
		self.entry.first_str("samaccountname").map(str::to_lowercase)
	}

	/// Set the account name, lower-cased.
	pub fn set_login(&mut self, login: &str) {
		self.set_attribute("sAMAccountName", login.to_lowercase());
	}

	/// Given name.
	#[must_use]
	pub fn first_name(&self) -> Option<&str> {
		self.entry.first_str("givenname")
	}

	/// Set the given name.
	pub fn set_first_name(&mut self, first_name: &str) {
		self.set_attribute("givenName", first_name);
	}

	/// Full name.
	#[must_use]
	pub fn name(&self) -> Option<&str> {
		self.entry.first_str("name")
	}

	/// Set the full name.
	pub fn set_name(&mut self, name: &str) {
		self.set_attribute("name", name);
	}

	/// Workstations the user may log on to.
	#[must_use]
	pub fn workstations(&self) -> Vec<String> {
		self.entry
			.first_str("userworkstations")
			.map(|w| w.split(',').map(str::to_owned).collect())
			.unwrap_or_default()
	}

	/// Set the workstations the user may log on to.
	pub fn set_workstations<S: AsRef<str>>(&mut self, workstations: &[S]) {
		let joined = workstations.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
		self.set_attribute("userWorkstations", joined);
	}

	/// Lower-cased mail address.
	#[must_use]
	pub fn mail(&self) -> Option<String> {
		self.entry.first_str("mail").map(str::to_lowercase)
	}

	/// Set the mail address, lower-cased.
	pub fn set_mail(&mut self, mail: &str) {
		self.set_attribute("mail", mail.to_lowercase());
	}

	/// Job title, kept in `description`.
	#[must_use]
	pub fn job_title(&self) -> Option<&str> {
		self.entry.first_str("description")
	}

	/// Set the job title.
	pub fn set_job_title(&mut self, job_title: &str) {
		self.set_attribute("description", job_title);
	}

	/// Job role, kept in `title`.
	#[must_use]
	pub fn job_role(&self) -> Option<&str> {
		self.entry.first_str("title")
	}

	/// Set the job role.
	pub fn set_job_role(&mut self, job_role: &str) {
		self.set_attribute("title", job_role);
	}

	/// The postal address.
	pub fn address(&self) -> &Address {
		self.address.get_or_init(|| Address::from_entry(&self.entry))
	}

	/// Replace the postal address and its attributes.
	pub fn set_address(&mut self, address: Address) {
		address.write_to(&mut self.entry);
		self.address = OnceCell::from(address);
	}

	/// Mailboxes the user may act for.
	#[must_use]
	pub fn mailboxes(&self, name_only: bool) -> Vec<Membership> {
		memberships(&self.entry, "msexchdelegatelistbl", name_only)
	}

	/// Mobile number.
	#[must_use]
	pub fn mobile(&self) -> Option<&str> {
		self.entry.first_str("mobile")
	}

	/// Set the mobile number.
	pub fn set_mobile(&mut self, mobile: &str) {
		self.set_attribute("mobile", mobile);
	}

	/// Telephone number.
	#[must_use]
	pub fn phone(&self) -> Option<&str> {
		self.entry.first_str("telephonenumber")
	}

	/// Set the telephone number.
	pub fn set_phone(&mut self, phone: &str) {
		self.set_attribute("telephoneNumber", phone);
	}

	/// The last `size` characters of the telephone number.
	pub fn branch_line(&self, size: usize) -> Result<Option<String>, Error> {
		if size == 0 {
			return Err(Error::Model("size must be greater than zero".to_owned()));
		}
		Ok(self.phone().map(|phone| {
			let chars: Vec<char> = phone.chars().collect();
			chars[chars.len().saturating_sub(size)..].iter().collect()
		}))
	}

	/// Department.
	#[must_use]
	pub fn department(&self) -> Option<&str> {
		self.entry.first_str("department")
	}

	/// Set the department.
	pub fn set_department(&mut self, department: &str) {
		self.set_attribute("department", department);
	}

	/// Department code, kept in `extensionAttribute1`.
	#[must_use]
	pub fn department_code(&self) -> Option<&str> {
		self.entry.first_str("extensionattribute1")
	}

	/// Set the department code.
	pub fn set_department_code(&mut self, department_code: &str) {
		self.set_attribute("extensionAttribute1", department_code);
	}

	/// Groups the user is a member of.
	#[must_use]
	pub fn member_of(&self, name_only: bool) -> Vec<Membership> {
		memberships(&self.entry, "memberof", name_only)
	}

	/// Whether the user is a member of the group.
	pub fn is_member_of<M>(&self, group: M) -> Result<bool, Error>
	where
		M: TryInto<Membership, Error = Error>,
	{
		contains_any(&self.entry, "memberof", [group])
	}

	/// Company.
	#[must_use]
	pub fn company(&self) -> Option<&str> {
		self.entry.first_str("company")
	}

	/// Set the company.
	pub fn set_company(&mut self, company: &str) {
		self.set_attribute("company", company);
	}

	/// Thumbnail photo as base64 text.
	#[must_use]
	pub fn photo(&self) -> Option<String> {
		match self.entry.get("thumbnailphoto")? {
			Value::String(encoded) => Some(encoded.clone()),
			Value::Binary(bytes) => Some(STANDARD.encode(bytes)),
			_ => None,
		}
	}

	/// Thumbnail photo bytes.
	#[must_use]
	pub fn raw_photo(&self) -> Option<Vec<u8>> {
		match self.entry.get("thumbnailphoto")? {
			Value::String(encoded) => STANDARD.decode(encoded).ok(),
			Value::Binary(bytes) => Some(bytes.clone()),
			_ => None,
		}
	}

	/// Set the thumbnail photo from its bytes.
	pub fn set_photo(&mut self, data: &[u8]) {
		self.set_attribute("thumbnailPhoto", STANDARD.encode(data));
	}

	/// When the password was last set.
	#[must_use]
	pub fn password_last_set(&self) -> Option<&Value> {
		self.entry.get("pwdlastset")
	}

	/// Number of failed logons since the last success.
	#[must_use]
	pub fn password_error_count(&self) -> Option<i64> {
		self.entry.get("badpwdcount")?.as_i64()
	}

	/// Time of the last failed logon.
	#[must_use]
	pub fn password_error_time(&self) -> Option<&Value> {
		self.entry.get("badpasswordtime")
	}

	/// Time of the last logon, as replicated.
	#[must_use]
	pub fn last_logon(&self) -> Option<&Value> {
		self.entry.get("lastlogontimestamp")
	}

	/// When the account was locked out. An account that is not locked out
	/// reports `0` rather than the [`LDAP_EPOCH`].
	#[must_use]
	pub fn lockout_time(&self) -> Value {
		match self.entry.get("lockouttime") {
			None | Some(Value::Null) => Value::Integer(0),
			Some(Value::Timestamp(time)) if *time == LDAP_EPOCH => Value::Integer(0),
			Some(value) => value.clone(),
		}
	}

	/// Whether the account is locked out.
	#[must_use]
	pub fn is_lockout(&self) -> bool {
		self.lockout_time() != Value::Integer(0)
	}
}

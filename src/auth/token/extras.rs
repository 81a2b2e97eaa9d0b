//! Free-form fields returned next to an installation token.

// crates.io
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

const SECRET_FIELD: &str = "token";

/// Errors produced by the typed [`Extras`] accessors.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ExtraError {
	/// The response did not include the requested field.
	#[error("Token response has no `{key}` field.")]
	MissingKey {
		/// Requested field.
		key: String,
	},
	/// The field exists but holds a different JSON type.
	#[error("Token response field `{key}` is {found}, expected {expected}.")]
	TypeMismatch {
		/// Requested field (dotted for nested values).
		key: String,
		/// JSON type the accessor expected.
		expected: &'static str,
		/// JSON type actually present.
		found: &'static str,
	},
}

/// Every top-level field of a token response, decoded as dynamic JSON values.
///
/// Decoding is best effort: a body that is not a JSON object yields an empty bag rather
/// than an error, so a token whose required fields parsed stays usable.
///
/// The bag includes the `token` field itself, which [`Debug`] redacts.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extras(BTreeMap<String, Value>);
impl Extras {
	/// Decodes `body` into an extras bag, ignoring decode failures.
	pub fn from_body(body: &[u8]) -> Self {
		serde_json::from_slice::<BTreeMap<String, Value>>(body).map(Self).unwrap_or_default()
	}

	/// Number of fields in the bag.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if the bag holds no fields.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Raw lookup without type expectations.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.0.get(key)
	}

	/// Iterates over all fields in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Looks up `key`, failing with [`ExtraError::MissingKey`] when absent.
	pub fn require(&self, key: &str) -> Result<&Value, ExtraError> {
		self.0.get(key).ok_or_else(|| ExtraError::MissingKey { key: key.to_owned() })
	}

	/// Returns a string field.
	pub fn str(&self, key: &str) -> Result<&str, ExtraError> {
		let value = self.require(key)?;

		value.as_str().ok_or_else(|| mismatch(key, "a string", value))
	}

	/// Returns a boolean field.
	pub fn bool(&self, key: &str) -> Result<bool, ExtraError> {
		let value = self.require(key)?;

		value.as_bool().ok_or_else(|| mismatch(key, "a boolean", value))
	}

	/// Returns a non-negative integer field.
	pub fn u64(&self, key: &str) -> Result<u64, ExtraError> {
		let value = self.require(key)?;

		value.as_u64().ok_or_else(|| mismatch(key, "an unsigned integer", value))
	}

	/// Returns an object field.
	pub fn object(&self, key: &str) -> Result<&Map<String, Value>, ExtraError> {
		let value = self.require(key)?;

		value.as_object().ok_or_else(|| mismatch(key, "an object", value))
	}

	/// Returns an array field.
	pub fn array(&self, key: &str) -> Result<&[Value], ExtraError> {
		let value = self.require(key)?;

		value.as_array().map(Vec::as_slice).ok_or_else(|| mismatch(key, "an array", value))
	}

	/// Returns an object field whose values must all be strings, such as `permissions`.
	pub fn string_map(&self, key: &str) -> Result<BTreeMap<String, String>, ExtraError> {
		self.object(key)?
			.iter()
			.map(|(name, value)| match value.as_str() {
				Some(s) => Ok((name.clone(), s.to_owned())),
				None => Err(mismatch(&format!("{key}.{name}"), "a string", value)),
			})
			.collect()
	}
}
impl FromIterator<(String, Value)> for Extras {
	fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
		Self(iter.into_iter().collect())
	}
}
impl Debug for Extras {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_map()
			.entries(self.0.iter().map(|(key, value)| {
				let value: &dyn Debug = if key == SECRET_FIELD { &"<redacted>" } else { value };

				(key, value)
			}))
			.finish()
	}
}

fn mismatch(key: &str, expected: &'static str, value: &Value) -> ExtraError {
	ExtraError::TypeMismatch { key: key.to_owned(), expected, found: kind(value) }
}

fn kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "a boolean",
		Value::Number(_) => "a number",
		Value::String(_) => "a string",
		Value::Array(_) => "an array",
		Value::Object(_) => "an object",
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const BODY: &[u8] = br#"{
		"token": "v1.abc",
		"permissions": {"issues": "write", "contents": "read"},
		"repository_selection": "selected",
		"repositories": [{"id": 1}],
		"single_file": null,
		"has_admin": false
	}"#;

	#[test]
	fn typed_accessors_read_known_fields() {
		let extras = Extras::from_body(BODY);

		assert_eq!(extras.len(), 6);
		assert_eq!(extras.str("repository_selection"), Ok("selected"));
		assert_eq!(extras.bool("has_admin"), Ok(false));
		assert_eq!(extras.array("repositories").map(<[Value]>::len), Ok(1));

		let permissions = extras.string_map("permissions").expect("Permissions should be strings.");

		assert_eq!(permissions.get("issues").map(String::as_str), Some("write"));
		assert_eq!(permissions.get("contents").map(String::as_str), Some("read"));
	}

	#[test]
	fn accessors_fail_explicitly() {
		let extras = Extras::from_body(BODY);

		assert_eq!(
			extras.str("expires_at"),
			Err(ExtraError::MissingKey { key: "expires_at".into() })
		);
		assert_eq!(
			extras.str("single_file"),
			Err(ExtraError::TypeMismatch {
				key: "single_file".into(),
				expected: "a string",
				found: "null",
			})
		);
		assert!(matches!(extras.u64("permissions"), Err(ExtraError::TypeMismatch { .. })));
	}

	#[test]
	fn nested_mismatch_names_the_path() {
		let extras = Extras::from_body(br#"{"permissions": {"issues": 3}}"#);

		assert_eq!(
			extras.string_map("permissions"),
			Err(ExtraError::TypeMismatch {
				key: "permissions.issues".into(),
				expected: "a string",
				found: "a number",
			})
		);
	}

	#[test]
	fn debug_redacts_the_token_field() {
		let extras = Extras::from_body(BODY);
		let rendered = format!("{extras:?}");

		assert!(!rendered.contains("v1.abc"), "Debug output must not leak the token.");
		assert!(rendered.contains("\"token\": \"<redacted>\""));
		assert!(rendered.contains("\"repository_selection\": String(\"selected\")"));
		assert_eq!(extras.str("token"), Ok("v1.abc"));
	}

	#[test]
	fn undecodable_body_yields_empty_bag() {
		assert!(Extras::from_body(b"[1, 2, 3]").is_empty());
		assert!(Extras::from_body(b"not json").is_empty());
	}
}

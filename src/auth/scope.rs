//! Repository scoping for installation access tokens.

// self
use crate::_prelude::*;

/// Errors emitted when validating repository scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum RepositoryScopeError {
	/// Empty repository names are not allowed.
	#[error("Repository names cannot be empty.")]
	Empty,
	/// Repository names cannot contain whitespace or path separators.
	#[error("Repository name is invalid: {name}.")]
	InvalidName {
		/// The offending repository name.
		name: String,
	},
}

/// Narrows an installation token to a subset of the installation's repositories.
///
/// Both lists keep caller order. When both are empty the token inherits every repository
/// the installation can reach and no request body is sent. Changing the scope after a
/// token has been cached does not narrow that token; the next exchange applies it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryScope {
	/// Repository names (without the owner prefix).
	#[serde(rename = "repositories", default, skip_serializing_if = "Vec::is_empty")]
	pub names: Vec<String>,
	/// Numeric repository identifiers.
	#[serde(rename = "repository_ids", default, skip_serializing_if = "Vec::is_empty")]
	pub ids: Vec<u64>,
}
impl RepositoryScope {
	/// Builds a scope limited to the provided repository names.
	pub fn names<I, S>(names: I) -> Result<Self, RepositoryScopeError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self::default().with_names(names)
	}

	/// Replaces the repository names.
	pub fn with_names<I, S>(mut self, names: I) -> Result<Self, RepositoryScopeError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut validated = Vec::new();

		for name in names {
			let name = name.into();

			if name.is_empty() {
				return Err(RepositoryScopeError::Empty);
			}
			if name.chars().any(|c| c.is_whitespace() || c == '/') {
				return Err(RepositoryScopeError::InvalidName { name });
			}

			validated.push(name);
		}

		self.names = validated;

		Ok(self)
	}

	/// Replaces the repository identifiers.
	pub fn with_ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
		self.ids = ids.into_iter().collect();

		self
	}

	/// Returns true if neither names nor identifiers are set.
	pub fn is_empty(&self) -> bool {
		self.names.is_empty() && self.ids.is_empty()
	}

	/// Encodes the scope as a token request body, or `None` when unscoped.
	pub fn to_request_body(&self) -> Result<Option<Vec<u8>>, serde_json::Error> {
		if self.is_empty() {
			return Ok(None);
		}

		serde_json::to_vec(self).map(Some)
	}
}

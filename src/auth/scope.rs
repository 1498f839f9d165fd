//! Scope modeling helpers used across the client.

// std
use std::{collections::BTreeSet, slice::Iter};
// self
use crate::_prelude::*;

/// The full set of scopes the Fitbit Web API grants to first-party data access.
const DEFAULT_SCOPES: &[&str] = &[
	"activity",
	"cardio_fitness",
	"electrocardiogram",
	"heartrate",
	"irregular_rhythm_notifications",
	"location",
	"nutrition",
	"oxygen_saturation",
	"profile",
	"respiratory_rate",
	"settings",
	"sleep",
	"social",
	"temperature",
	"weight",
];

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Normalized set of OAuth scopes.
///
/// Scopes are deduplicated and sorted so equality stays consistent regardless of
/// the order callers supply them in. The wire representation (authorization URL
/// and token cache) is the space-delimited normalized string.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScopeSet(Arc<[String]>);
impl ScopeSet {
	/// Creates a normalized scope set from any iterator.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Ok(Self(normalize(scopes)?))
	}

	/// The complete Fitbit scope list requested when the caller does not narrow it.
	pub fn default_scopes() -> Self {
		Self::new(DEFAULT_SCOPES.iter().copied()).unwrap_or_default()
	}

	/// Number of distinct scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the normalized set contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.binary_search_by(|candidate| candidate.as_str().cmp(scope)).is_ok()
	}

	/// Iterator over normalized scopes.
	pub fn iter(&self) -> ScopeIter {
		ScopeIter { inner: self.0.iter() }
	}

	/// Returns the normalized string representation (space-delimited).
	pub fn normalized(&self) -> String {
		self.0.join(" ")
	}
}
impl TryFrom<String> for ScopeSet {
	type Error = ScopeValidationError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::new(value.split_whitespace().map(str::to_owned))
	}
}
impl From<ScopeSet> for String {
	fn from(value: ScopeSet) -> Self {
		value.normalized()
	}
}
impl Debug for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeSet").field(&self.0).finish()
	}
}
impl Display for ScopeSet {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.normalized())
	}
}

/// Iterator over scope strings.
pub struct ScopeIter<'a> {
	inner: Iter<'a, String>,
}
impl<'a> Iterator for ScopeIter<'a> {
	type Item = &'a str;

	fn next(&mut self) -> Option<Self::Item> {
		self.inner.next().map(String::as_str)
	}
}

fn normalize<I, S>(scopes: I) -> Result<Arc<[String]>, ScopeValidationError>
where
	I: IntoIterator<Item = S>,
	S: Into<String>,
{
	let mut normalized = BTreeSet::new();

	for scope in scopes {
		let scope = scope.into();
		let trimmed = scope.trim();

		if trimmed.is_empty() {
			return Err(ScopeValidationError::Empty);
		}
		if trimmed.chars().any(char::is_whitespace) {
			return Err(ScopeValidationError::ContainsWhitespace { scope: trimmed.to_owned() });
		}

		normalized.insert(trimmed.to_owned());
	}

	Ok(normalized.into_iter().collect())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn scopes_are_deduplicated_and_sorted() {
		let scope = ScopeSet::new(["sleep", "activity", "sleep", " heartrate "])
			.expect("Scope fixture should be valid.");

		assert_eq!(scope.normalized(), "activity heartrate sleep");
		assert_eq!(scope.len(), 3);
		assert!(scope.contains("sleep"));
		assert!(!scope.contains("nutrition"));
	}

	#[test]
	fn validation_rejects_empty_and_embedded_whitespace() {
		assert_eq!(ScopeSet::new([""]).expect_err("Empty scope should be rejected."), ScopeValidationError::Empty);
		assert!(matches!(
			ScopeSet::new(["sleep activity"])
				.expect_err("Embedded whitespace should be rejected."),
			ScopeValidationError::ContainsWhitespace { .. }
		));
	}

	#[test]
	fn default_scopes_cover_the_full_grant() {
		let scope = ScopeSet::default_scopes();

		assert_eq!(scope.len(), DEFAULT_SCOPES.len());
		assert!(scope.contains("cardio_fitness"));
		assert!(scope.contains("weight"));
	}

	#[test]
	fn string_round_trip_preserves_normalization() {
		let scope: ScopeSet =
			"sleep activity".to_owned().try_into().expect("Scope string should parse.");

		assert_eq!(String::from(scope), "activity sleep");
	}
}

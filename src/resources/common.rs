//! Shared helpers for resource wrappers: path building and parameter validation.

// crates.io
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::{_prelude::*, error::ClientValidationError};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Sort order accepted by list endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
	/// Oldest first; required with `afterDate`.
	Asc,
	/// Newest first; required with `beforeDate`.
	Desc,
}
impl SortDirection {
	/// Wire value for the `sort` query parameter.
	pub fn as_str(self) -> &'static str {
		match self {
			SortDirection::Asc => "asc",
			SortDirection::Desc => "desc",
		}
	}
}
impl Display for SortDirection {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Builds a user-scoped endpoint path: `/{version}/user/{user_id}/{endpoint}`.
///
/// The special user id `-` addresses the currently authenticated user.
pub fn user_path(version: &str, user_id: &str, endpoint: &str) -> String {
	format!("/{version}/user/{user_id}/{}", endpoint.trim_matches('/'))
}

/// Builds a public endpoint path: `/{version}/{endpoint}` (database-wide
/// operations such as food search).
pub fn public_path(version: &str, endpoint: &str) -> String {
	format!("/{version}/{}", endpoint.trim_matches('/'))
}

/// Validates that a date string is `today` or a real `YYYY-MM-DD` calendar date.
pub fn validate_date_format(value: &str, field_name: &str) -> Result<(), ClientValidationError> {
	if value == "today" {
		return Ok(());
	}

	let shaped = value.len() == 10
		&& value.as_bytes()[4] == b'-'
		&& value.as_bytes()[7] == b'-'
		&& value
			.bytes()
			.enumerate()
			.all(|(idx, byte)| matches!(idx, 4 | 7) || byte.is_ascii_digit());

	if !shaped || Date::parse(value, DATE_FORMAT).is_err() {
		return Err(ClientValidationError::InvalidDate {
			value: value.to_owned(),
			field_name: field_name.to_owned(),
		});
	}

	Ok(())
}

/// Resolves a validated date string (`today` included) into a calendar date.
pub fn parse_date(value: &str, field_name: &str) -> Result<Date, ClientValidationError> {
	if value == "today" {
		return Ok(OffsetDateTime::now_utc().date());
	}

	validate_date_format(value, field_name)?;

	Date::parse(value, DATE_FORMAT).map_err(|_| ClientValidationError::InvalidDate {
		value: value.to_owned(),
		field_name: field_name.to_owned(),
	})
}

/// Validates ordering and maximum span of a date range.
pub fn validate_date_range(
	start: &str,
	end: &str,
	max_days: Option<i64>,
	resource_name: Option<&str>,
) -> Result<(), ClientValidationError> {
	let start_date = parse_date(start, "start_date")?;
	let end_date = parse_date(end, "end_date")?;

	if end_date < start_date {
		return Err(ClientValidationError::InvalidDateRange {
			start: start.to_owned(),
			end: end.to_owned(),
			reason: format!("Start date {start} is after end date {end}"),
		});
	}
	if let Some(max_days) = max_days {
		let span = (end_date - start_date).whole_days();

		if span > max_days {
			let suffix = resource_name.map(|name| format!(" for {name}")).unwrap_or_default();

			return Err(ClientValidationError::InvalidDateRange {
				start: start.to_owned(),
				end: end.to_owned(),
				reason: format!("Date range {span} days exceeds maximum allowed {max_days} days{suffix}"),
			});
		}
	}

	Ok(())
}

/// Validates the before/after + sort + limit parameter set of list endpoints.
///
/// Exactly one of `before_date`/`after_date` must be present, the sort
/// direction must match the chosen anchor, and the page size is bounded.
pub fn validate_pagination(
	before_date: Option<&str>,
	after_date: Option<&str>,
	sort: SortDirection,
	limit: u32,
	max_limit: u32,
) -> Result<(), ClientValidationError> {
	match (before_date, after_date) {
		(None, None) =>
			return Err(ClientValidationError::Pagination {
				message: "Either before_date or after_date must be specified".into(),
				field_name: None,
			}),
		(Some(before), _) => {
			validate_date_format(before, "before_date")?;

			if sort != SortDirection::Desc {
				return Err(ClientValidationError::Pagination {
					message: "sort must be desc when before_date is used".into(),
					field_name: Some("sort".into()),
				});
			}

			if let Some(after) = after_date {
				validate_date_format(after, "after_date")?;
			}
		},
		(None, Some(after)) => {
			validate_date_format(after, "after_date")?;

			if sort != SortDirection::Asc {
				return Err(ClientValidationError::Pagination {
					message: "sort must be asc when after_date is used".into(),
					field_name: Some("sort".into()),
				});
			}
		},
	}

	if limit == 0 || limit > max_limit {
		return Err(ClientValidationError::Pagination {
			message: format!("limit must be between 1 and {max_limit}, got {limit}"),
			field_name: Some("limit".into()),
		});
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn date_validation_accepts_today_and_calendar_dates() {
		assert!(validate_date_format("today", "date").is_ok());
		assert!(validate_date_format("2025-02-28", "date").is_ok());
	}

	#[test]
	fn date_validation_rejects_bad_shapes_and_impossible_dates() {
		for value in ["2025/02/28", "02-28-2025", "2025-2-28", "2025-02-30", "yesterday"] {
			let err = validate_date_format(value, "date")
				.expect_err("Invalid date fixture should be rejected.");

			assert!(matches!(err, ClientValidationError::InvalidDate { .. }), "{value}");
		}
	}

	#[test]
	fn range_validation_enforces_order_and_span() {
		assert!(validate_date_range("2025-01-01", "2025-01-31", Some(31), None).is_ok());
		assert!(matches!(
			validate_date_range("2025-01-31", "2025-01-01", None, None)
				.expect_err("Inverted range should be rejected."),
			ClientValidationError::InvalidDateRange { .. }
		));
		assert!(matches!(
			validate_date_range("2025-01-01", "2025-03-01", Some(30), Some("weight logs"))
				.expect_err("Oversized range should be rejected."),
			ClientValidationError::InvalidDateRange { .. }
		));
	}

	#[test]
	fn pagination_validation_requires_one_anchor_with_matching_sort() {
		assert!(
			validate_pagination(Some("2025-01-01"), None, SortDirection::Desc, 10, 100).is_ok()
		);
		assert!(
			validate_pagination(None, Some("2025-01-01"), SortDirection::Asc, 10, 100).is_ok()
		);
		assert!(validate_pagination(None, None, SortDirection::Desc, 10, 100).is_err());
		assert!(
			validate_pagination(Some("2025-01-01"), None, SortDirection::Asc, 10, 100).is_err()
		);
		assert!(
			validate_pagination(None, Some("2025-01-01"), SortDirection::Desc, 10, 100).is_err()
		);
	}

	#[test]
	fn pagination_validation_bounds_the_page_size() {
		let err = validate_pagination(Some("today"), None, SortDirection::Desc, 101, 100)
			.expect_err("Oversized limit should be rejected.");

		assert!(matches!(
			err,
			ClientValidationError::Pagination { ref field_name, .. }
				if field_name.as_deref() == Some("limit")
		));
	}

	#[test]
	fn paths_compose_for_user_and_public_endpoints() {
		assert_eq!(user_path("1", "-", "foods/log.json"), "/1/user/-/foods/log.json");
		assert_eq!(user_path("1.2", "-", "/sleep/list.json"), "/1.2/user/-/sleep/list.json");
		assert_eq!(public_path("1", "foods/search.json"), "/1/foods/search.json");
	}
}

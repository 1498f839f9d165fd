//! Sleep endpoints: logs by date, the paginated log list, and log management.
//!
//! Sleep is the one resource family served under API version 1.2.

// self
use crate::{
	_prelude::*,
	executor::{RequestDescriptor, RequestExecutor, ResponseBody},
	pagination::Paginator,
	resources::common::{self, SortDirection},
};

const API_VERSION: &str = "1.2";
const CURRENT_USER: &str = "-";
const LIST_MAX_LIMIT: u32 = 100;

/// Sleep resource operating on the currently authenticated user.
#[derive(Clone, Debug)]
pub struct SleepResource {
	executor: Arc<RequestExecutor>,
}
impl SleepResource {
	pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
		Self { executor }
	}

	/// Returns sleep logs for a single date (`today` or `YYYY-MM-DD`).
	pub async fn get_sleep_log_by_date(&self, date: &str) -> Result<ResponseBody> {
		common::validate_date_format(date, "date")?;

		let path = common::user_path(API_VERSION, CURRENT_USER, &format!("sleep/date/{date}.json"));

		self.executor.execute(RequestDescriptor::get(path)).await
	}

	/// Returns one page of the sleep log list.
	///
	/// Exactly one of `before_date`/`after_date` anchors the scan and the sort
	/// direction must match it; the response carries a `pagination.next` link
	/// for the following page.
	pub async fn get_sleep_log_list(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<ResponseBody> {
		let descriptor = self.sleep_log_list_request(before_date, after_date, sort, limit)?;

		self.executor.execute(descriptor).await
	}

	/// Returns a lazy paginator over the full sleep log list.
	pub fn get_sleep_log_list_pages(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<Paginator> {
		let descriptor = self.sleep_log_list_request(before_date, after_date, sort, limit)?;

		Ok(Paginator::new(self.executor.clone(), descriptor))
	}

	/// Creates a manual sleep log entry.
	pub async fn create_sleep_log(
		&self,
		date: &str,
		start_time: &str,
		duration_millis: u64,
	) -> Result<ResponseBody> {
		common::validate_date_format(date, "date")?;

		let path = common::user_path(API_VERSION, CURRENT_USER, "sleep.json");
		let descriptor = RequestDescriptor::post(path)
			.with_query("date", date)
			.with_query("startTime", start_time)
			.with_query("duration", duration_millis.to_string());

		self.executor.execute(descriptor).await
	}

	/// Deletes a sleep log entry; success is the no-content sentinel.
	pub async fn delete_sleep_log(&self, log_id: &str) -> Result<ResponseBody> {
		let path = common::user_path(API_VERSION, CURRENT_USER, &format!("sleep/{log_id}.json"));

		self.executor.execute(RequestDescriptor::delete(path)).await
	}

	fn sleep_log_list_request(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<RequestDescriptor> {
		common::validate_pagination(before_date, after_date, sort, limit, LIST_MAX_LIMIT)?;

		let path = common::user_path(API_VERSION, CURRENT_USER, "sleep/list.json");
		let descriptor = RequestDescriptor::get(path)
			.with_query("sort", sort.as_str())
			.with_query("limit", limit.to_string())
			.with_query("offset", "0")
			.with_opt_query("beforeDate", before_date)
			.with_opt_query("afterDate", after_date);

		Ok(descriptor)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ClientValidationError;

	#[test]
	fn list_validation_runs_before_any_request_is_built() {
		let executor = crate::_preludet::offline_executor();
		let resource = SleepResource::new(executor);
		let err = resource
			.sleep_log_list_request(None, None, SortDirection::Desc, 10)
			.expect_err("Missing anchors should be rejected locally.");

		assert!(matches!(err, Error::Validation(ClientValidationError::Pagination { .. })));
	}

	#[test]
	fn list_request_marshals_the_documented_parameters() {
		let executor = crate::_preludet::offline_executor();
		let resource = SleepResource::new(executor);
		let descriptor = resource
			.sleep_log_list_request(Some("2025-01-01"), None, SortDirection::Desc, 2)
			.expect("List request should build.");

		assert_eq!(descriptor.path, "/1.2/user/-/sleep/list.json");
		assert!(descriptor.query.contains(&("sort".into(), "desc".into())));
		assert!(descriptor.query.contains(&("limit".into(), "2".into())));
		assert!(descriptor.query.contains(&("offset".into(), "0".into())));
		assert!(descriptor.query.contains(&("beforeDate".into(), "2025-01-01".into())));
	}
}

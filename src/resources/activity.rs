//! Activity endpoints: summaries, lifetime stats, the paginated log list, and
//! TCX export.

// self
use crate::{
	_prelude::*,
	executor::{RequestDescriptor, RequestExecutor, ResponseBody},
	pagination::Paginator,
	resources::common::{self, SortDirection},
};

const API_VERSION: &str = "1";
const CURRENT_USER: &str = "-";
const LIST_MAX_LIMIT: u32 = 100;

/// Activity resource operating on the currently authenticated user.
#[derive(Clone, Debug)]
pub struct ActivityResource {
	executor: Arc<RequestExecutor>,
}
impl ActivityResource {
	pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
		Self { executor }
	}

	/// Returns the daily activity summary for a date.
	pub async fn get_daily_activity_summary(&self, date: &str) -> Result<ResponseBody> {
		common::validate_date_format(date, "date")?;

		let path =
			common::user_path(API_VERSION, CURRENT_USER, &format!("activities/date/{date}.json"));

		self.executor.execute(RequestDescriptor::get(path)).await
	}

	/// Returns the user's lifetime activity statistics.
	pub async fn get_lifetime_stats(&self) -> Result<ResponseBody> {
		let path = common::user_path(API_VERSION, CURRENT_USER, "activities.json");

		self.executor.execute(RequestDescriptor::get(path)).await
	}

	/// Returns one page of the activity log list.
	pub async fn get_activity_log_list(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<ResponseBody> {
		let descriptor = self.activity_log_list_request(before_date, after_date, sort, limit)?;

		self.executor.execute(descriptor).await
	}

	/// Returns a lazy paginator over the full activity log list.
	pub fn get_activity_log_list_pages(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<Paginator> {
		let descriptor = self.activity_log_list_request(before_date, after_date, sort, limit)?;

		Ok(Paginator::new(self.executor.clone(), descriptor))
	}

	/// Exports one activity as TCX; the body comes back as raw XML text.
	pub async fn get_activity_tcx(&self, log_id: &str) -> Result<ResponseBody> {
		let path = common::user_path(
			API_VERSION,
			CURRENT_USER,
			&format!("activities/{log_id}.tcx"),
		);

		self.executor.execute(RequestDescriptor::get(path)).await
	}

	/// Records a manually-logged activity.
	pub async fn create_activity_log(
		&self,
		activity_id: u64,
		date: &str,
		start_time: &str,
		duration_millis: u64,
	) -> Result<ResponseBody> {
		common::validate_date_format(date, "date")?;

		let path = common::user_path(API_VERSION, CURRENT_USER, "activities.json");
		let descriptor = RequestDescriptor::post(path).with_form(vec![
			("activityId".into(), activity_id.to_string()),
			("date".into(), date.to_owned()),
			("startTime".into(), start_time.to_owned()),
			("durationMillis".into(), duration_millis.to_string()),
		]);

		self.executor.execute(descriptor).await
	}

	/// Deletes an activity log entry; success is the no-content sentinel.
	pub async fn delete_activity_log(&self, log_id: &str) -> Result<ResponseBody> {
		let path =
			common::user_path(API_VERSION, CURRENT_USER, &format!("activities/{log_id}.json"));

		self.executor.execute(RequestDescriptor::delete(path)).await
	}

	fn activity_log_list_request(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<RequestDescriptor> {
		common::validate_pagination(before_date, after_date, sort, limit, LIST_MAX_LIMIT)?;

		let path = common::user_path(API_VERSION, CURRENT_USER, "activities/list.json");
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

	#[test]
	fn list_request_targets_version_one() {
		let executor = crate::_preludet::offline_executor();
		let resource = ActivityResource::new(executor);
		let descriptor = resource
			.activity_log_list_request(None, Some("2025-01-01"), SortDirection::Asc, 25)
			.expect("List request should build.");

		assert_eq!(descriptor.path, "/1/user/-/activities/list.json");
		assert!(descriptor.query.contains(&("afterDate".into(), "2025-01-01".into())));
	}
}

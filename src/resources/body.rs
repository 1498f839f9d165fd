//! Body endpoints: weight and fat logs.

// self
use crate::{
	_prelude::*,
	executor::{RequestDescriptor, RequestExecutor, ResponseBody},
	resources::common,
};

const API_VERSION: &str = "1";
const CURRENT_USER: &str = "-";

/// Body resource operating on the currently authenticated user.
#[derive(Clone, Debug)]
pub struct BodyResource {
	executor: Arc<RequestExecutor>,
}
impl BodyResource {
	pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
		Self { executor }
	}

	/// Returns weight logs for a date.
	pub async fn get_weight_logs(&self, date: &str) -> Result<ResponseBody> {
		common::validate_date_format(date, "date")?;

		let path = common::user_path(
			API_VERSION,
			CURRENT_USER,
			&format!("body/log/weight/date/{date}.json"),
		);

		self.executor.execute(RequestDescriptor::get(path)).await
	}

	/// Returns body-fat logs for a date.
	pub async fn get_body_fat_logs(&self, date: &str) -> Result<ResponseBody> {
		common::validate_date_format(date, "date")?;

		let path = common::user_path(
			API_VERSION,
			CURRENT_USER,
			&format!("body/log/fat/date/{date}.json"),
		);

		self.executor.execute(RequestDescriptor::get(path)).await
	}

	/// Records a weight log entry.
	pub async fn create_weight_log(&self, weight: f64, date: &str) -> Result<ResponseBody> {
		common::validate_date_format(date, "date")?;

		let path = common::user_path(API_VERSION, CURRENT_USER, "body/log/weight.json");
		let descriptor = RequestDescriptor::post(path).with_form(vec![
			("weight".into(), weight.to_string()),
			("date".into(), date.to_owned()),
		]);

		self.executor.execute(descriptor).await
	}
}

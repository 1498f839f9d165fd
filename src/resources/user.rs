//! User profile endpoints.

// self
use crate::{
	_prelude::*,
	executor::{RequestDescriptor, RequestExecutor, ResponseBody},
	resources::common,
};

const API_VERSION: &str = "1";
const CURRENT_USER: &str = "-";

/// User resource operating on the currently authenticated user.
#[derive(Clone, Debug)]
pub struct UserResource {
	executor: Arc<RequestExecutor>,
}
impl UserResource {
	pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
		Self { executor }
	}

	/// Returns the user's profile.
	pub async fn get_profile(&self) -> Result<ResponseBody> {
		let path = common::user_path(API_VERSION, CURRENT_USER, "profile.json");

		self.executor.execute(RequestDescriptor::get(path)).await
	}

	/// Updates profile fields from the provided key/value pairs.
	pub async fn update_profile(&self, fields: Vec<(String, String)>) -> Result<ResponseBody> {
		let path = common::user_path(API_VERSION, CURRENT_USER, "profile.json");
		let descriptor = RequestDescriptor::post(path).with_form(fields);

		self.executor.execute(descriptor).await
	}
}

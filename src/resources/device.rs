//! Device endpoints.

// self
use crate::{
	_prelude::*,
	executor::{RequestDescriptor, RequestExecutor, ResponseBody},
	resources::common,
};

const API_VERSION: &str = "1";
const CURRENT_USER: &str = "-";

/// Device resource operating on the currently authenticated user.
#[derive(Clone, Debug)]
pub struct DeviceResource {
	executor: Arc<RequestExecutor>,
}
impl DeviceResource {
	pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
		Self { executor }
	}

	/// Returns the devices paired to the user's account.
	pub async fn get_devices(&self) -> Result<ResponseBody> {
		let path = common::user_path(API_VERSION, CURRENT_USER, "devices.json");

		self.executor.execute(RequestDescriptor::get(path)).await
	}
}

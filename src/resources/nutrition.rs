//! Nutrition endpoints: food logs, the public food search, and log management.

// self
use crate::{
	_prelude::*,
	executor::{RequestDescriptor, RequestExecutor, ResponseBody},
	resources::common,
};

const API_VERSION: &str = "1";
const CURRENT_USER: &str = "-";

/// Meal type identifiers accepted by the food logging endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MealType {
	/// Breakfast.
	Breakfast = 1,
	/// Morning snack.
	MorningSnack = 2,
	/// Lunch.
	Lunch = 3,
	/// Afternoon snack.
	AfternoonSnack = 4,
	/// Dinner.
	Dinner = 5,
	/// Anytime.
	Anytime = 7,
}
impl MealType {
	/// Wire value for the `mealTypeId` parameter.
	pub fn id(self) -> u8 {
		self as u8
	}
}

/// Nutrition resource operating on the currently authenticated user.
#[derive(Clone, Debug)]
pub struct NutritionResource {
	executor: Arc<RequestExecutor>,
}
impl NutritionResource {
	pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
		Self { executor }
	}

	/// Returns the food log for a date.
	pub async fn get_food_log(&self, date: &str) -> Result<ResponseBody> {
		common::validate_date_format(date, "date")?;

		let path =
			common::user_path(API_VERSION, CURRENT_USER, &format!("foods/log/date/{date}.json"));

		self.executor.execute(RequestDescriptor::get(path)).await
	}

	/// Searches the public food database; no user scoping.
	pub async fn search_foods(&self, query: &str) -> Result<ResponseBody> {
		let path = common::public_path(API_VERSION, "foods/search.json");
		let descriptor = RequestDescriptor::get(path).with_query("query", query);

		self.executor.execute(descriptor).await
	}

	/// Logs a food entry against an existing food id.
	///
	/// The provider validates `foodId` server-side and reports rejections with
	/// `fieldName` populated.
	pub async fn create_food_log(
		&self,
		food_id: u64,
		meal_type: MealType,
		unit_id: u64,
		amount: f64,
		date: &str,
	) -> Result<ResponseBody> {
		common::validate_date_format(date, "date")?;

		let path = common::user_path(API_VERSION, CURRENT_USER, "foods/log.json");
		let descriptor = RequestDescriptor::post(path).with_form(vec![
			("foodId".into(), food_id.to_string()),
			("mealTypeId".into(), meal_type.id().to_string()),
			("unitId".into(), unit_id.to_string()),
			("amount".into(), amount.to_string()),
			("date".into(), date.to_owned()),
		]);

		self.executor.execute(descriptor).await
	}

	/// Deletes a food log entry; success is the no-content sentinel.
	pub async fn delete_food_log(&self, food_log_id: &str) -> Result<ResponseBody> {
		let path = common::user_path(
			API_VERSION,
			CURRENT_USER,
			&format!("foods/log/{food_log_id}.json"),
		);

		self.executor.execute(RequestDescriptor::delete(path)).await
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn meal_type_ids_match_the_documented_values() {
		assert_eq!(MealType::Breakfast.id(), 1);
		assert_eq!(MealType::Anytime.id(), 7);
	}
}

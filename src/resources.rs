//! Resource wrappers mapping method calls 1:1 onto API endpoint paths.
//!
//! Each wrapper owns no state beyond a handle to the shared executor: it
//! validates parameters locally, marshals them into a [`RequestDescriptor`],
//! and hands the decoded body straight back to the caller. The full API
//! surface follows this exact pattern; the modules here cover the endpoint
//! families the client exercises end-to-end.
//!
//! [`RequestDescriptor`]: crate::executor::RequestDescriptor

pub mod common;

pub mod activity;
pub mod body;
pub mod device;
pub mod nutrition;
pub mod sleep;
pub mod user;

pub use activity::ActivityResource;
pub use body::BodyResource;
pub use common::SortDirection;
pub use device::DeviceResource;
pub use nutrition::NutritionResource;
pub use sleep::SleepResource;
pub use user::UserResource;

/// Items key per paginated endpoint.
///
/// The API mixes bare arrays and object-with-named-array envelopes with no
/// structural rule; the association is fixed here from the provider's
/// documentation instead of being inferred from response shapes.
pub const PAGE_ITEM_KEYS: &[(&str, &str)] = &[
	("activities/list", "activities"),
	("ecg/list", "ecgReadings"),
	("irn/alerts/list", "alerts"),
	("sleep/list", "sleep"),
];

/// Looks up the items key for a paginated endpoint path.
pub fn page_items_key(endpoint: &str) -> Option<&'static str> {
	PAGE_ITEM_KEYS
		.iter()
		.find_map(|(candidate, key)| endpoint.contains(candidate).then_some(*key))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn item_keys_resolve_from_endpoint_paths() {
		assert_eq!(page_items_key("/1.2/user/-/sleep/list.json"), Some("sleep"));
		assert_eq!(page_items_key("/1/user/-/activities/list.json"), Some("activities"));
		assert_eq!(page_items_key("/1/user/-/profile.json"), None);
	}
}

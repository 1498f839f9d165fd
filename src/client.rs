//! Top-level client: wiring, the authenticate orchestration, and the flat
//! delegation surface over the resource wrappers.

// self
use crate::{
	_prelude::*,
	auth::{TokenManager, TokenRefresher, TokenSet},
	callback::{CallbackListener, CallbackResult},
	config::{ClientConfig, FlowMode},
	error::{ConfigError, OAuthError},
	executor::{RequestDescriptor, RequestExecutor, ResponseBody},
	flows::{FlowCoordinator, RefreshMetrics},
	http::ReqwestHttpClient,
	obs::{NoopObserver, RequestObserver},
	pagination::Paginator,
	resources::{
		ActivityResource, BodyResource, DeviceResource, NutritionResource, SleepResource,
		SortDirection, UserResource, nutrition::MealType,
	},
	store::{FileStore, MemoryStore, TokenStore},
};

/// Result of one [`FitbitClient::authenticate`] invocation.
#[derive(Clone, Debug)]
pub enum AuthenticateOutcome {
	/// A cached or silently-refreshed credential is already valid.
	AlreadyAuthenticated,
	/// The listener captured the redirect and the exchange completed.
	Completed,
	/// Manual mode: the caller must visit the URL and feed the redirect back
	/// via [`FitbitClient::complete_authorization`].
	AwaitingRedirect(Url),
}

/// Async Fitbit Web API client.
///
/// Construction wires the whole pipeline: store, token manager, flow
/// coordinator, executor, and the resource wrappers. Every resource method is
/// also reachable directly on the client through explicit delegation methods
/// assembled here.
pub struct FitbitClient {
	config: ClientConfig,
	redirect_uri: Url,
	manager: Arc<TokenManager>,
	coordinator: Arc<FlowCoordinator>,
	executor: Arc<RequestExecutor>,
	activity: ActivityResource,
	body: BodyResource,
	device: DeviceResource,
	nutrition: NutritionResource,
	sleep: SleepResource,
	user: UserResource,
}
impl FitbitClient {
	/// Builds a client with the default (discarding) observer.
	pub fn new(config: ClientConfig) -> Result<Self> {
		Self::with_observer(config, Arc::new(NoopObserver))
	}

	/// Builds a client publishing executor events to the provided observer.
	pub fn with_observer(
		config: ClientConfig,
		observer: Arc<dyn RequestObserver>,
	) -> Result<Self> {
		// Token requests must not follow redirects; resource calls never need to.
		let http = ReqwestClient::builder()
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.map_err(ConfigError::from)?;

		Self::with_http_client(config, observer, http)
	}

	/// Builds a client that reuses a caller-provided reqwest client.
	pub fn with_http_client(
		config: ClientConfig,
		observer: Arc<dyn RequestObserver>,
		http: ReqwestClient,
	) -> Result<Self> {
		let redirect_uri = config.parsed_redirect_uri()?;
		let store: Arc<dyn TokenStore> = match &config.token_cache_path {
			Some(path) => Arc::new(FileStore::new(path)),
			None => Arc::new(MemoryStore::default()),
		};
		let manager = Arc::new(TokenManager::new(store));
		let coordinator = Arc::new(FlowCoordinator::from_config(
			&config,
			ReqwestHttpClient::with_client(http.clone()),
		)?);
		let refresher: Arc<dyn TokenRefresher> = coordinator.clone();
		let executor = Arc::new(RequestExecutor::new(
			http,
			&config,
			manager.clone(),
			refresher,
			observer,
		));

		Ok(Self {
			redirect_uri,
			manager,
			coordinator,
			activity: ActivityResource::new(executor.clone()),
			body: BodyResource::new(executor.clone()),
			device: DeviceResource::new(executor.clone()),
			nutrition: NutritionResource::new(executor.clone()),
			sleep: SleepResource::new(executor.clone()),
			user: UserResource::new(executor.clone()),
			executor,
			config,
		})
	}

	/// The configuration the client was built from.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Counters for refresh flow outcomes.
	pub fn refresh_metrics(&self) -> Arc<RefreshMetrics> {
		self.coordinator.refresh_metrics()
	}

	/// Returns `true` when a non-stale credential is available right now.
	pub fn is_authenticated(&self) -> bool {
		self.manager.is_authenticated()
	}

	/// Loads the persisted token cache into memory; absence is not an error.
	pub async fn load_cached_token(&self) -> Result<Option<TokenSet>> {
		self.manager.load().await
	}

	/// Drops the credential from memory and the cache.
	pub async fn clear_tokens(&self) -> Result<()> {
		self.manager.clear().await
	}

	/// Completes authentication, interactively if needed.
	///
	/// Order of preference: reuse a live cached credential, silently refresh a
	/// stale one, otherwise start a fresh authorization attempt. The attempt's
	/// URL is handed to `present_url` (print it, open a browser); in listener
	/// mode the call then blocks until the redirect arrives or the wait bound
	/// expires, while manual mode returns
	/// [`AuthenticateOutcome::AwaitingRedirect`] for the caller to finish via
	/// [`Self::complete_authorization`].
	pub async fn authenticate<F>(&self, force_new: bool, present_url: F) -> Result<AuthenticateOutcome>
	where
		F: FnOnce(&Url),
	{
		if !force_new && self.try_cached_or_refresh().await? {
			return Ok(AuthenticateOutcome::AlreadyAuthenticated);
		}

		let url = self.begin_authorization()?;

		present_url(&url);

		match self.config.flow_mode {
			FlowMode::Listener => {
				self.await_callback().await?;

				Ok(AuthenticateOutcome::Completed)
			},
			FlowMode::Manual => Ok(AuthenticateOutcome::AwaitingRedirect(url)),
		}
	}

	/// Starts a fresh authorization attempt and returns its authorize URL.
	///
	/// Fails fast with [`OAuthError::FlowInProgress`] while another attempt is
	/// pending.
	pub fn begin_authorization(&self) -> Result<Url> {
		Ok(self.coordinator.begin()?.authorize_url)
	}

	/// Listener mode: waits for the redirect, completes the exchange, and
	/// persists the credential.
	pub async fn await_callback(&self) -> Result<()> {
		let listener = CallbackListener::for_redirect(
			&self.redirect_uri,
			std::time::Duration::from_secs(self.config.callback_timeout_seconds),
		)?;
		let callback = listener.capture().await?;

		self.finish(callback).await
	}

	/// Manual mode: parses the pasted redirect URL, completes the exchange, and
	/// persists the credential.
	pub async fn complete_authorization(&self, pasted_redirect: &str) -> Result<()> {
		let callback = CallbackResult::parse(pasted_redirect)?;

		self.finish(callback).await
	}

	/// Executes a raw descriptor through the authenticated pipeline.
	pub async fn execute(&self, descriptor: RequestDescriptor) -> Result<ResponseBody> {
		self.executor.execute(descriptor).await
	}

	/// Wraps a list descriptor in a lazy paginator.
	pub fn paginate(&self, initial: RequestDescriptor) -> Paginator {
		Paginator::new(self.executor.clone(), initial)
	}

	async fn finish(&self, callback: CallbackResult) -> Result<()> {
		let token = self.coordinator.complete(callback).await?;

		self.manager.install(token).await
	}

	async fn try_cached_or_refresh(&self) -> Result<bool> {
		if self.manager.peek().is_none() {
			self.manager.load().await?;
		}
		if self.manager.peek().is_none() {
			return Ok(false);
		}

		match self.manager.current(self.coordinator.as_ref()).await {
			Ok(_) => Ok(true),
			// Fatal rejections mean the cached credential is dead; fall through
			// to the interactive flow instead of surfacing them here.
			Err(Error::OAuth(
				OAuthError::InvalidGrant { .. }
				| OAuthError::InvalidToken { .. }
				| OAuthError::InvalidClient { .. },
			)) => Ok(false),
			Err(err) => Err(err),
		}
	}
}
impl Debug for FitbitClient {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FitbitClient")
			.field("redirect_uri", &self.redirect_uri)
			.field("flow_mode", &self.config.flow_mode)
			.field("authenticated", &self.is_authenticated())
			.finish_non_exhaustive()
	}
}

/// Resource accessors.
impl FitbitClient {
	/// Activity endpoints.
	pub fn activity(&self) -> &ActivityResource {
		&self.activity
	}

	/// Body endpoints.
	pub fn body(&self) -> &BodyResource {
		&self.body
	}

	/// Device endpoints.
	pub fn device(&self) -> &DeviceResource {
		&self.device
	}

	/// Nutrition endpoints.
	pub fn nutrition(&self) -> &NutritionResource {
		&self.nutrition
	}

	/// Sleep endpoints.
	pub fn sleep(&self) -> &SleepResource {
		&self.sleep
	}

	/// User endpoints.
	pub fn user(&self) -> &UserResource {
		&self.user
	}
}

/// Flat delegation surface: every resource method, reachable on the client.
impl FitbitClient {
	/// Delegates to [`ActivityResource::get_daily_activity_summary`].
	pub async fn get_daily_activity_summary(&self, date: &str) -> Result<ResponseBody> {
		self.activity.get_daily_activity_summary(date).await
	}

	/// Delegates to [`ActivityResource::get_lifetime_stats`].
	pub async fn get_lifetime_stats(&self) -> Result<ResponseBody> {
		self.activity.get_lifetime_stats().await
	}

	/// Delegates to [`ActivityResource::get_activity_log_list`].
	pub async fn get_activity_log_list(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<ResponseBody> {
		self.activity.get_activity_log_list(before_date, after_date, sort, limit).await
	}

	/// Delegates to [`ActivityResource::get_activity_log_list_pages`].
	pub fn get_activity_log_list_pages(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<Paginator> {
		self.activity.get_activity_log_list_pages(before_date, after_date, sort, limit)
	}

	/// Delegates to [`ActivityResource::get_activity_tcx`].
	pub async fn get_activity_tcx(&self, log_id: &str) -> Result<ResponseBody> {
		self.activity.get_activity_tcx(log_id).await
	}

	/// Delegates to [`ActivityResource::create_activity_log`].
	pub async fn create_activity_log(
		&self,
		activity_id: u64,
		date: &str,
		start_time: &str,
		duration_millis: u64,
	) -> Result<ResponseBody> {
		self.activity.create_activity_log(activity_id, date, start_time, duration_millis).await
	}

	/// Delegates to [`ActivityResource::delete_activity_log`].
	pub async fn delete_activity_log(&self, log_id: &str) -> Result<ResponseBody> {
		self.activity.delete_activity_log(log_id).await
	}

	/// Delegates to [`BodyResource::get_weight_logs`].
	pub async fn get_weight_logs(&self, date: &str) -> Result<ResponseBody> {
		self.body.get_weight_logs(date).await
	}

	/// Delegates to [`BodyResource::get_body_fat_logs`].
	pub async fn get_body_fat_logs(&self, date: &str) -> Result<ResponseBody> {
		self.body.get_body_fat_logs(date).await
	}

	/// Delegates to [`BodyResource::create_weight_log`].
	pub async fn create_weight_log(&self, weight: f64, date: &str) -> Result<ResponseBody> {
		self.body.create_weight_log(weight, date).await
	}

	/// Delegates to [`DeviceResource::get_devices`].
	pub async fn get_devices(&self) -> Result<ResponseBody> {
		self.device.get_devices().await
	}

	/// Delegates to [`NutritionResource::get_food_log`].
	pub async fn get_food_log(&self, date: &str) -> Result<ResponseBody> {
		self.nutrition.get_food_log(date).await
	}

	/// Delegates to [`NutritionResource::search_foods`].
	pub async fn search_foods(&self, query: &str) -> Result<ResponseBody> {
		self.nutrition.search_foods(query).await
	}

	/// Delegates to [`NutritionResource::create_food_log`].
	pub async fn create_food_log(
		&self,
		food_id: u64,
		meal_type: MealType,
		unit_id: u64,
		amount: f64,
		date: &str,
	) -> Result<ResponseBody> {
		self.nutrition.create_food_log(food_id, meal_type, unit_id, amount, date).await
	}

	/// Delegates to [`NutritionResource::delete_food_log`].
	pub async fn delete_food_log(&self, food_log_id: &str) -> Result<ResponseBody> {
		self.nutrition.delete_food_log(food_log_id).await
	}

	/// Delegates to [`SleepResource::get_sleep_log_by_date`].
	pub async fn get_sleep_log_by_date(&self, date: &str) -> Result<ResponseBody> {
		self.sleep.get_sleep_log_by_date(date).await
	}

	/// Delegates to [`SleepResource::get_sleep_log_list`].
	pub async fn get_sleep_log_list(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<ResponseBody> {
		self.sleep.get_sleep_log_list(before_date, after_date, sort, limit).await
	}

	/// Delegates to [`SleepResource::get_sleep_log_list_pages`].
	pub fn get_sleep_log_list_pages(
		&self,
		before_date: Option<&str>,
		after_date: Option<&str>,
		sort: SortDirection,
		limit: u32,
	) -> Result<Paginator> {
		self.sleep.get_sleep_log_list_pages(before_date, after_date, sort, limit)
	}

	/// Delegates to [`SleepResource::create_sleep_log`].
	pub async fn create_sleep_log(
		&self,
		date: &str,
		start_time: &str,
		duration_millis: u64,
	) -> Result<ResponseBody> {
		self.sleep.create_sleep_log(date, start_time, duration_millis).await
	}

	/// Delegates to [`SleepResource::delete_sleep_log`].
	pub async fn delete_sleep_log(&self, log_id: &str) -> Result<ResponseBody> {
		self.sleep.delete_sleep_log(log_id).await
	}

	/// Delegates to [`UserResource::get_profile`].
	pub async fn get_profile(&self) -> Result<ResponseBody> {
		self.user.get_profile().await
	}

	/// Delegates to [`UserResource::update_profile`].
	pub async fn update_profile(&self, fields: Vec<(String, String)>) -> Result<ResponseBody> {
		self.user.update_profile(fields).await
	}
}

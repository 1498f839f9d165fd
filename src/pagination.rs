//! Lazy pagination over "one page + next-page descriptor" list responses.
//!
//! List endpoints return a `pagination` block whose `next` member points at the
//! following page. [`Paginator`] turns that shape into a lazy, finite sequence:
//! each cursor is consumed exactly once, the sequence terminates when `next`
//! disappears, and restarting means re-issuing the original request rather than
//! resuming from an arbitrary midpoint. Consumers may stop at any time; every
//! page fetch is a stateless GET with nothing to clean up server-side.

// crates.io
use async_stream::try_stream;
use futures_util::Stream;
// self
use crate::{
	_prelude::*,
	executor::{RequestDescriptor, RequestExecutor, ResponseBody},
};

/// Pagination continuation; consumed exactly once by the next fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageCursor {
	/// The original request has not been issued yet.
	Start,
	/// Relative path (with query) of the next page.
	Next(String),
	/// The sequence is exhausted.
	Done,
}

/// Lazy iterator over page payloads built on top of the executor.
pub struct Paginator {
	executor: Arc<RequestExecutor>,
	initial: RequestDescriptor,
	cursor: PageCursor,
}
impl Paginator {
	/// Creates a paginator from the initial list request.
	pub fn new(executor: Arc<RequestExecutor>, initial: RequestDescriptor) -> Self {
		Self { executor, initial, cursor: PageCursor::Start }
	}

	/// The current continuation state.
	pub fn cursor(&self) -> &PageCursor {
		&self.cursor
	}

	/// Fetches the next page, or `None` once the sequence is exhausted.
	pub async fn next_page(&mut self) -> Result<Option<serde_json::Value>> {
		let descriptor = match std::mem::replace(&mut self.cursor, PageCursor::Done) {
			PageCursor::Start => self.initial.clone(),
			PageCursor::Next(path) => RequestDescriptor::get(path),
			PageCursor::Done => return Ok(None),
		};
		// The cursor is already consumed; an error leaves the sequence terminal
		// and only `restart` re-arms it.
		let body = self.executor.execute(descriptor).await?;
		let page = match body {
			ResponseBody::Json(value) => value,
			ResponseBody::Raw(_) | ResponseBody::NoContent => return Ok(None),
		};

		self.cursor = next_cursor(&page);

		Ok(Some(page))
	}

	/// Re-arms the paginator at the original initial request.
	pub fn restart(&mut self) {
		self.cursor = PageCursor::Start;
	}

	/// Adapts the paginator into a lazy stream of page payloads.
	pub fn into_stream(mut self) -> impl Stream<Item = Result<serde_json::Value>> {
		try_stream! {
			while let Some(page) = self.next_page().await? {
				yield page;
			}
		}
	}
}
impl Debug for Paginator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Paginator")
			.field("initial", &self.initial)
			.field("cursor", &self.cursor)
			.finish_non_exhaustive()
	}
}

/// Extracts the continuation from a page's `pagination.next` member.
///
/// The provider hands back an absolute URL; it is reduced to its path + query so
/// the follow-up request goes through the executor's own base URL.
fn next_cursor(page: &serde_json::Value) -> PageCursor {
	let next = page
		.get("pagination")
		.and_then(|pagination| pagination.get("next"))
		.and_then(serde_json::Value::as_str)
		.filter(|next| !next.is_empty());

	match next {
		Some(next) => match Url::parse(next) {
			Ok(url) => {
				let path = match url.query() {
					Some(query) => format!("{}?{query}", url.path()),
					None => url.path().to_owned(),
				};

				PageCursor::Next(path)
			},
			// Already relative; use it as-is.
			Err(_) => PageCursor::Next(next.to_owned()),
		},
		None => PageCursor::Done,
	}
}

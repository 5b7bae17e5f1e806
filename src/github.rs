use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
	Open,
	Closed,
}

impl IssueState {
	pub fn as_str(&self) -> &'static str {
		match self {
			IssueState::Open => "open",
			IssueState::Closed => "closed",
		}
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct GitHubIssue {
	/// Resource ID, which the sub-issue endpoints take (not the issue number)
	pub id: u64,
	pub number: u64,
	pub title: String,
	pub body: Option<String>,
	pub state: IssueState,
	pub html_url: String,
}

/// Response from GitHub when creating an issue
#[derive(Clone, Debug, Deserialize)]
pub struct CreatedIssue {
	pub id: u64,
	pub number: u64,
	pub html_url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
	#[error("not found: {0}")]
	NotFound(String),
	#[error("forbidden: {0}")]
	Forbidden(String),
	#[error("validation failed: {0}")]
	Validation(String),
	#[error("conflict: {0}")]
	Conflict(String),
	#[error("issue is already a sub-issue of this parent")]
	AlreadyLinked,
	#[error("unexpected response {status}: {body}")]
	Api { status: u16, body: String },
	#[error("request failed: {0}")]
	Transport(#[from] reqwest::Error),
}

impl GitHubError {
	fn from_status(status: StatusCode, body: String) -> Self {
		match status {
			StatusCode::NOT_FOUND | StatusCode::GONE => Self::NotFound(body),
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Forbidden(body),
			StatusCode::CONFLICT => Self::Conflict(body),
			StatusCode::UNPROCESSABLE_ENTITY => Self::Validation(body),
			_ => Self::Api { status: status.as_u16(), body },
		}
	}
}

//==============================================================================
// GitHub Client Trait
//==============================================================================

/// GitHub API operations the conversion needs.
/// This allows for both real API calls and mock implementations for testing.
#[async_trait]
pub trait GitHubClient: Send + Sync {
	/// Fetch a single issue by number
	async fn fetch_issue(&self, owner: &str, repo: &str, issue_number: u64) -> Result<GitHubIssue, GitHubError>;

	/// Fetch all sub-issues of an issue
	async fn fetch_sub_issues(&self, owner: &str, repo: &str, issue_number: u64) -> Result<Vec<GitHubIssue>, GitHubError>;

	/// Create a new issue
	async fn create_issue(&self, owner: &str, repo: &str, title: &str, body: &str) -> Result<CreatedIssue, GitHubError>;

	/// Add a sub-issue to a parent issue.
	/// `child_issue_id` is the resource ID (not the issue number).
	/// Fails with [`GitHubError::AlreadyLinked`] if the child is already under this parent.
	async fn add_sub_issue(&self, owner: &str, repo: &str, parent_issue_number: u64, child_issue_id: u64) -> Result<(), GitHubError>;

	/// Update an issue's body
	async fn update_issue_body(&self, owner: &str, repo: &str, issue_number: u64, body: &str) -> Result<(), GitHubError>;

	/// Update an issue's state (open/closed)
	async fn update_issue_state(&self, owner: &str, repo: &str, issue_number: u64, state: IssueState) -> Result<(), GitHubError>;

	/// Find an issue by exact title match
	async fn find_issue_by_title(&self, owner: &str, repo: &str, title: &str) -> Result<Option<GitHubIssue>, GitHubError>;
}

//==============================================================================
// Real GitHub Client Implementation
//==============================================================================

/// Real GitHub API client that makes HTTP requests
pub struct RealGitHubClient {
	http_client: Client,
	github_token: String,
	api_url: String,
}

impl RealGitHubClient {
	pub fn new(github_token: impl Into<String>, api_url: impl Into<String>) -> Result<Self, GitHubError> {
		let http_client = Client::builder().user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"))).build()?;
		Ok(Self {
			http_client,
			github_token: github_token.into(),
			api_url: api_url.into().trim_end_matches('/').to_string(),
		})
	}

	fn request(&self, method: Method, path: &str) -> RequestBuilder {
		self.http_client
			.request(method, format!("{}{path}", self.api_url))
			.header("Accept", "application/vnd.github+json")
			.header("X-GitHub-Api-Version", "2022-11-28")
			.bearer_auth(&self.github_token)
	}

	async fn send(request: RequestBuilder) -> Result<Response, GitHubError> {
		let res = request.send().await?;
		if !res.status().is_success() {
			let status = res.status();
			let body = res.text().await.unwrap_or_default();
			return Err(GitHubError::from_status(status, body));
		}
		Ok(res)
	}
}

#[async_trait]
impl GitHubClient for RealGitHubClient {
	async fn fetch_issue(&self, owner: &str, repo: &str, issue_number: u64) -> Result<GitHubIssue, GitHubError> {
		let res = Self::send(self.request(Method::GET, &format!("/repos/{owner}/{repo}/issues/{issue_number}"))).await?;
		Ok(res.json::<GitHubIssue>().await?)
	}

	async fn fetch_sub_issues(&self, owner: &str, repo: &str, issue_number: u64) -> Result<Vec<GitHubIssue>, GitHubError> {
		let mut all = Vec::new();
		for page in 1.. {
			let path = format!("/repos/{owner}/{repo}/issues/{issue_number}/sub_issues?per_page={PAGE_SIZE}&page={page}");
			let batch = Self::send(self.request(Method::GET, &path)).await?.json::<Vec<GitHubIssue>>().await?;
			let done = batch.len() < PAGE_SIZE;
			all.extend(batch);
			if done {
				break;
			}
		}
		Ok(all)
	}

	async fn create_issue(&self, owner: &str, repo: &str, title: &str, body: &str) -> Result<CreatedIssue, GitHubError> {
		let request = self
			.request(Method::POST, &format!("/repos/{owner}/{repo}/issues"))
			.json(&serde_json::json!({ "title": title, "body": body }));
		Ok(Self::send(request).await?.json::<CreatedIssue>().await?)
	}

	async fn add_sub_issue(&self, owner: &str, repo: &str, parent_issue_number: u64, child_issue_id: u64) -> Result<(), GitHubError> {
		let request = self
			.request(Method::POST, &format!("/repos/{owner}/{repo}/issues/{parent_issue_number}/sub_issues"))
			.json(&serde_json::json!({ "sub_issue_id": child_issue_id }));

		match Self::send(request).await {
			Ok(_) => Ok(()),
			// GitHub answers 422 when the child is already attached to this parent
			Err(GitHubError::Validation(body)) if body.to_ascii_lowercase().contains("duplicate sub-issues") => Err(GitHubError::AlreadyLinked),
			Err(e) => Err(e),
		}
	}

	async fn update_issue_body(&self, owner: &str, repo: &str, issue_number: u64, body: &str) -> Result<(), GitHubError> {
		let request = self
			.request(Method::PATCH, &format!("/repos/{owner}/{repo}/issues/{issue_number}"))
			.json(&serde_json::json!({ "body": body }));
		Self::send(request).await?;
		Ok(())
	}

	async fn update_issue_state(&self, owner: &str, repo: &str, issue_number: u64, state: IssueState) -> Result<(), GitHubError> {
		let request = self
			.request(Method::PATCH, &format!("/repos/{owner}/{repo}/issues/{issue_number}"))
			.json(&serde_json::json!({ "state": state.as_str() }));
		Self::send(request).await?;
		Ok(())
	}

	async fn find_issue_by_title(&self, owner: &str, repo: &str, title: &str) -> Result<Option<GitHubIssue>, GitHubError> {
		// Search in open and closed issues; the search is fuzzy, so filter for the exact title
		let query = urlencoding::encode(&format!("repo:{owner}/{repo} is:issue in:title \"{title}\"")).into_owned();
		let res = Self::send(self.request(Method::GET, &format!("/search/issues?q={query}&per_page={PAGE_SIZE}"))).await?;

		#[derive(Deserialize)]
		struct SearchResult {
			items: Vec<GitHubIssue>,
		}

		let result: SearchResult = res.json().await?;
		Ok(result.items.into_iter().find(|item| item.title == title))
	}
}

//==============================================================================
// Convenience type alias for boxed client
//==============================================================================

pub type BoxedGitHubClient = Arc<dyn GitHubClient>;

/// Create the HTTP-backed client.
pub fn create_client(github_token: &str, api_url: &str) -> Result<BoxedGitHubClient, GitHubError> {
	Ok(Arc::new(RealGitHubClient::new(github_token, api_url)?))
}

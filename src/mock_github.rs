//! Mock GitHub client for testing purposes.
//!
//! This module provides a mock implementation of the GitHubClient trait that stores
//! all data in memory, so the conversion pipeline can be exercised without hitting the real API.
//! Individual calls can be made to fail to simulate API errors.

use std::{
	collections::{BTreeMap, HashMap, HashSet},
	sync::{
		Mutex,
		atomic::{AtomicU64, Ordering},
	},
};

use async_trait::async_trait;
use tracing::instrument;

use crate::github::{CreatedIssue, GitHubClient, GitHubError, GitHubIssue, IssueState};

/// Internal representation of an issue in the mock
#[derive(Clone, Debug)]
struct MockIssueData {
	number: u64,
	id: u64,
	title: String,
	body: String,
	state: IssueState,
}

/// Key for looking up issues by owner/repo
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct RepoKey {
	owner: String,
	repo: String,
}

impl RepoKey {
	fn new(owner: &str, repo: &str) -> Self {
		Self {
			owner: owner.to_string(),
			repo: repo.to_string(),
		}
	}
}

/// Mock GitHub client that stores all state in memory.
/// Thread-safe for use in async contexts.
pub struct MockGitHubClient {
	/// Counter for generating unique issue IDs
	next_issue_id: AtomicU64,

	/// All issues, keyed by (owner, repo) -> issue_number -> issue
	issues: Mutex<HashMap<RepoKey, BTreeMap<u64, MockIssueData>>>,

	/// Sub-issue relationships: (owner, repo, parent_number) -> child issue IDs
	sub_issues: Mutex<HashMap<(RepoKey, u64), Vec<u64>>>,

	/// Repos where creating issues fails
	failing_creates: Mutex<HashSet<RepoKey>>,

	/// Issues whose linking as a sub-issue fails
	failing_links: Mutex<HashSet<(RepoKey, u64)>>,

	/// Whether body updates fail
	failing_body_updates: Mutex<bool>,

	/// Call log for debugging
	call_log: Mutex<Vec<String>>,
}

impl MockGitHubClient {
	/// Create an empty mock client
	pub fn new() -> Self {
		Self {
			next_issue_id: AtomicU64::new(1000),
			issues: Mutex::new(HashMap::new()),
			sub_issues: Mutex::new(HashMap::new()),
			failing_creates: Mutex::new(HashSet::new()),
			failing_links: Mutex::new(HashSet::new()),
			failing_body_updates: Mutex::new(false),
			call_log: Mutex::new(Vec::new()),
		}
	}

	/// Add an issue to the mock state. Returns its resource ID.
	pub fn add_issue(&self, owner: &str, repo: &str, number: u64, title: &str, body: &str, state: IssueState) -> u64 {
		let key = RepoKey::new(owner, repo);
		let id = self.next_issue_id.fetch_add(1, Ordering::SeqCst);

		let issue = MockIssueData {
			number,
			id,
			title: title.to_string(),
			body: body.to_string(),
			state,
		};

		self.issues.lock().unwrap().entry(key).or_default().insert(number, issue);
		id
	}

	/// Add a sub-issue relationship between two existing issues
	pub fn add_sub_issue_relation(&self, parent: (&str, &str, u64), child: (&str, &str, u64)) {
		let child_id = self.issue_id(child.0, child.1, child.2).expect("child issue must exist in the mock");
		let key = (RepoKey::new(parent.0, parent.1), parent.2);
		self.sub_issues.lock().unwrap().entry(key).or_default().push(child_id);
	}

	/// Make every `create_issue` call in this repo fail
	pub fn fail_create_issue_in(&self, owner: &str, repo: &str) {
		self.failing_creates.lock().unwrap().insert(RepoKey::new(owner, repo));
	}

	/// Make linking this issue as a sub-issue fail
	pub fn fail_linking_of(&self, owner: &str, repo: &str, number: u64) {
		self.failing_links.lock().unwrap().insert((RepoKey::new(owner, repo), number));
	}

	/// Make every `update_issue_body` call fail
	pub fn fail_body_updates(&self) {
		*self.failing_body_updates.lock().unwrap() = true;
	}

	/// Resource ID of an issue, if it exists
	pub fn issue_id(&self, owner: &str, repo: &str, number: u64) -> Option<u64> {
		self.issues.lock().unwrap().get(&RepoKey::new(owner, repo)).and_then(|issues| issues.get(&number)).map(|issue| issue.id)
	}

	/// Current body of an issue, if it exists
	pub fn issue_body(&self, owner: &str, repo: &str, number: u64) -> Option<String> {
		self.issues
			.lock()
			.unwrap()
			.get(&RepoKey::new(owner, repo))
			.and_then(|issues| issues.get(&number))
			.map(|issue| issue.body.clone())
	}

	/// All issues in a repo as (number, title, body, state), ordered by number
	pub fn repo_issues(&self, owner: &str, repo: &str) -> Vec<(u64, String, String, IssueState)> {
		self.issues
			.lock()
			.unwrap()
			.get(&RepoKey::new(owner, repo))
			.map(|issues| issues.values().map(|i| (i.number, i.title.clone(), i.body.clone(), i.state)).collect())
			.unwrap_or_default()
	}

	/// Sub-issues of a parent as `owner/repo#number` strings, in link order
	pub fn linked_sub_issues(&self, owner: &str, repo: &str, number: u64) -> Vec<String> {
		let child_ids = self.sub_issues.lock().unwrap().get(&(RepoKey::new(owner, repo), number)).cloned().unwrap_or_default();
		let issues = self.issues.lock().unwrap();
		child_ids
			.iter()
			.filter_map(|id| {
				issues
					.iter()
					.find_map(|(key, repo_issues)| repo_issues.values().find(|i| i.id == *id).map(|i| format!("{}/{}#{}", key.owner, key.repo, i.number)))
			})
			.collect()
	}

	/// Get the call log for debugging
	pub fn get_call_log(&self) -> Vec<String> {
		self.call_log.lock().unwrap().clone()
	}

	/// Clear the call log
	pub fn clear_call_log(&self) {
		self.call_log.lock().unwrap().clear();
	}

	fn log_call(&self, call: &str) {
		self.call_log.lock().unwrap().push(call.to_string());
	}

	fn convert_issue_data(key: &RepoKey, data: &MockIssueData) -> GitHubIssue {
		GitHubIssue {
			id: data.id,
			number: data.number,
			title: data.title.clone(),
			body: if data.body.is_empty() { None } else { Some(data.body.clone()) },
			state: data.state,
			html_url: format!("https://github.com/{}/{}/issues/{}", key.owner, key.repo, data.number),
		}
	}

	fn find_by_id(&self, id: u64) -> Option<(RepoKey, MockIssueData)> {
		let issues = self.issues.lock().unwrap();
		issues
			.iter()
			.find_map(|(key, repo_issues)| repo_issues.values().find(|i| i.id == id).map(|i| (key.clone(), i.clone())))
	}
}

impl Default for MockGitHubClient {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl GitHubClient for MockGitHubClient {
	#[instrument(skip(self), name = "MockGitHubClient::fetch_issue")]
	async fn fetch_issue(&self, owner: &str, repo: &str, issue_number: u64) -> Result<GitHubIssue, GitHubError> {
		tracing::info!(target: "mock_github", owner, repo, issue_number, "fetch_issue");
		self.log_call(&format!("fetch_issue({owner}, {repo}, {issue_number})"));

		let key = RepoKey::new(owner, repo);
		let issues = self.issues.lock().unwrap();

		let issue_data = issues
			.get(&key)
			.and_then(|repo_issues| repo_issues.get(&issue_number))
			.ok_or_else(|| GitHubError::NotFound(format!("{owner}/{repo}#{issue_number}")))?;

		Ok(Self::convert_issue_data(&key, issue_data))
	}

	#[instrument(skip(self), name = "MockGitHubClient::fetch_sub_issues")]
	async fn fetch_sub_issues(&self, owner: &str, repo: &str, issue_number: u64) -> Result<Vec<GitHubIssue>, GitHubError> {
		tracing::info!(target: "mock_github", owner, repo, issue_number, "fetch_sub_issues");
		self.log_call(&format!("fetch_sub_issues({owner}, {repo}, {issue_number})"));

		let child_ids = self.sub_issues.lock().unwrap().get(&(RepoKey::new(owner, repo), issue_number)).cloned().unwrap_or_default();

		Ok(child_ids
			.into_iter()
			.filter_map(|id| self.find_by_id(id))
			.map(|(key, data)| Self::convert_issue_data(&key, &data))
			.collect())
	}

	#[instrument(skip(self, body), name = "MockGitHubClient::create_issue")]
	async fn create_issue(&self, owner: &str, repo: &str, title: &str, body: &str) -> Result<CreatedIssue, GitHubError> {
		tracing::info!(target: "mock_github", owner, repo, title, "create_issue");
		self.log_call(&format!("create_issue({owner}, {repo}, {title}, <body>)"));

		let key = RepoKey::new(owner, repo);
		if self.failing_creates.lock().unwrap().contains(&key) {
			return Err(GitHubError::Forbidden(format!("cannot create issues in {owner}/{repo}")));
		}

		let id = self.next_issue_id.fetch_add(1, Ordering::SeqCst);
		let mut issues = self.issues.lock().unwrap();
		let repo_issues = issues.entry(key).or_default();
		let number = repo_issues.keys().next_back().map_or(1, |last| last + 1);

		repo_issues.insert(
			number,
			MockIssueData {
				number,
				id,
				title: title.to_string(),
				body: body.to_string(),
				state: IssueState::Open,
				},
		);

		Ok(CreatedIssue {
			id,
			number,
			html_url: format!("https://github.com/{owner}/{repo}/issues/{number}"),
		})
	}

	#[instrument(skip(self), name = "MockGitHubClient::add_sub_issue")]
	async fn add_sub_issue(&self, owner: &str, repo: &str, parent_issue_number: u64, child_issue_id: u64) -> Result<(), GitHubError> {
		tracing::info!(target: "mock_github", owner, repo, parent_issue_number, child_issue_id, "add_sub_issue");
		self.log_call(&format!("add_sub_issue({owner}, {repo}, parent={parent_issue_number}, child_id={child_issue_id})"));

		let (child_key, child) = self
			.find_by_id(child_issue_id)
			.ok_or_else(|| GitHubError::NotFound(format!("child issue with id {child_issue_id}")))?;

		if self.failing_links.lock().unwrap().contains(&(child_key.clone(), child.number)) {
			return Err(GitHubError::Forbidden(format!("cannot link {}/{}#{}", child_key.owner, child_key.repo, child.number)));
		}

		let mut sub_issues = self.sub_issues.lock().unwrap();
		let children = sub_issues.entry((RepoKey::new(owner, repo), parent_issue_number)).or_default();
		if children.contains(&child_issue_id) {
			return Err(GitHubError::AlreadyLinked);
		}
		children.push(child_issue_id);

		Ok(())
	}

	#[instrument(skip(self, body), name = "MockGitHubClient::update_issue_body")]
	async fn update_issue_body(&self, owner: &str, repo: &str, issue_number: u64, body: &str) -> Result<(), GitHubError> {
		tracing::info!(target: "mock_github", owner, repo, issue_number, "update_issue_body");
		self.log_call(&format!("update_issue_body({owner}, {repo}, {issue_number}, <body>)"));

		if *self.failing_body_updates.lock().unwrap() {
			return Err(GitHubError::Conflict(format!("{owner}/{repo}#{issue_number} was modified concurrently")));
		}

		let mut issues = self.issues.lock().unwrap();
		let issue = issues
			.get_mut(&RepoKey::new(owner, repo))
			.and_then(|repo_issues| repo_issues.get_mut(&issue_number))
			.ok_or_else(|| GitHubError::NotFound(format!("{owner}/{repo}#{issue_number}")))?;

		issue.body = body.to_string();
		Ok(())
	}

	#[instrument(skip(self), name = "MockGitHubClient::update_issue_state")]
	async fn update_issue_state(&self, owner: &str, repo: &str, issue_number: u64, state: IssueState) -> Result<(), GitHubError> {
		tracing::info!(target: "mock_github", owner, repo, issue_number, state = state.as_str(), "update_issue_state");
		self.log_call(&format!("update_issue_state({owner}, {repo}, {issue_number}, {})", state.as_str()));

		let mut issues = self.issues.lock().unwrap();
		let issue = issues
			.get_mut(&RepoKey::new(owner, repo))
			.and_then(|repo_issues| repo_issues.get_mut(&issue_number))
			.ok_or_else(|| GitHubError::NotFound(format!("{owner}/{repo}#{issue_number}")))?;

		issue.state = state;
		Ok(())
	}

	#[instrument(skip(self), name = "MockGitHubClient::find_issue_by_title")]
	async fn find_issue_by_title(&self, owner: &str, repo: &str, title: &str) -> Result<Option<GitHubIssue>, GitHubError> {
		tracing::info!(target: "mock_github", owner, repo, title, "find_issue_by_title");
		self.log_call(&format!("find_issue_by_title({owner}, {repo}, {title})"));

		let key = RepoKey::new(owner, repo);
		let issues = self.issues.lock().unwrap();

		Ok(issues
			.get(&key)
			.and_then(|repo_issues| repo_issues.values().find(|issue| issue.title == title))
			.map(|issue| Self::convert_issue_data(&key, issue)))
	}
}

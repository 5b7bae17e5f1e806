//! Issue and repository references.
//!
//! A task line can point at an issue in several ways:
//! - `https://github.com/owner/repo/issues/123` (scheme and `www.` optional)
//! - `<https://github.com/owner/repo/issues/123>` or `[label](https://github.com/owner/repo/issues/123)`
//! - `owner/repo#123`
//! - `#123`, relative to the repository of the issue holding the task list

use std::sync::LazyLock;

use derive_more::Display;
use regex::Regex;
use url::Url;

/// Owner, repo and number of a GitHub issue.
#[derive(Clone, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd, derive_new::new)]
#[display("{owner}/{repo}#{number}")]
pub struct IssueReference {
	#[new(into)]
	pub owner: String,
	#[new(into)]
	pub repo: String,
	pub number: u64,
}

impl IssueReference {
	pub fn repo_ref(&self) -> RepoReference {
		RepoReference::new(self.owner.clone(), self.repo.clone())
	}

	pub fn html_url(&self) -> String {
		format!("https://github.com/{}/{}/issues/{}", self.owner, self.repo, self.number)
	}
}

/// Owner and name of a GitHub repository.
#[derive(Clone, Debug, Display, Eq, Hash, PartialEq, derive_new::new)]
#[display("{owner}/{repo}")]
pub struct RepoReference {
	#[new(into)]
	pub owner: String,
	#[new(into)]
	pub repo: String,
}

impl RepoReference {
	pub fn html_url(&self) -> String {
		format!("https://github.com/{}/{}", self.owner, self.repo)
	}

	/// Whether `owner` names the same account as this repository's owner.
	/// GitHub logins are case-insensitive.
	pub fn same_owner(&self, owner: &str) -> bool {
		self.owner.eq_ignore_ascii_case(owner)
	}
}

/// Why a piece of text could not be turned into a reference.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum ReferenceError {
	#[error("not a valid URL: {0}")]
	Malformed(String),
	#[error("not a GitHub URL: {0}")]
	NotGitHub(String),
	#[error("not a GitHub issue URL (expected https://github.com/owner/repo/issues/123): {0}")]
	NotAnIssue(String),
	#[error("not a GitHub repository URL (expected https://github.com/owner/repo): {0}")]
	NotARepo(String),
	#[error("invalid issue number in {0}")]
	InvalidNumber(String),
}

static SHORTHAND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9-]*)/([A-Za-z0-9._-]+)#([0-9]+)$").expect("valid regex"));
static LOCAL_SHORTHAND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#([0-9]+)$").expect("valid regex"));
static REPO_SHORTHAND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9-]*)/([A-Za-z0-9._-]+)$").expect("valid regex"));
static MD_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[[^\]]*\]\(([^()\s]+)\)$").expect("valid regex"));

fn parse_github_url(s: &str) -> Result<(Url, Vec<String>), ReferenceError> {
	let s = s.trim();
	// Allow `github.com/owner/repo/...` without a scheme
	let with_scheme = if s.contains("://") { s.to_string() } else { format!("https://{s}") };
	let url = Url::parse(&with_scheme).map_err(|_| ReferenceError::Malformed(s.to_string()))?;

	if !matches!(url.scheme(), "https" | "http") || !matches!(url.host_str(), Some("github.com" | "www.github.com")) {
		return Err(ReferenceError::NotGitHub(s.to_string()));
	}

	let segments = url
		.path_segments()
		.map(|segments| segments.filter(|seg| !seg.is_empty()).map(str::to_string).collect())
		.unwrap_or_default();
	Ok((url, segments))
}

/// Parse a GitHub issue HTML URL into its owner, repo and number.
/// Query strings and fragments (e.g. `#issuecomment-1`) are ignored.
pub fn parse_issue_url(s: &str) -> Result<IssueReference, ReferenceError> {
	let (_, segments) = parse_github_url(s)?;

	match segments.as_slice() {
		[owner, repo, issues, number] if issues == "issues" => {
			let number = number
				.parse::<u64>()
				.ok()
				.filter(|n| *n > 0)
				.ok_or_else(|| ReferenceError::InvalidNumber(s.trim().to_string()))?;
			Ok(IssueReference::new(owner.as_str(), repo.as_str(), number))
		}
		_ => Err(ReferenceError::NotAnIssue(s.trim().to_string())),
	}
}

/// Parse a GitHub repository URL (`https://github.com/owner/repo`) or `owner/repo`.
pub fn parse_repo_url(s: &str) -> Result<RepoReference, ReferenceError> {
	let trimmed = s.trim();
	if let Some(caps) = REPO_SHORTHAND.captures(trimmed)
		&& !trimmed.starts_with("github.com")
	{
		return Ok(RepoReference::new(&caps[1], caps[2].trim_end_matches(".git")));
	}

	let (_, segments) = parse_github_url(trimmed)?;
	match segments.as_slice() {
		[owner, repo] => Ok(RepoReference::new(owner.as_str(), repo.trim_end_matches(".git"))),
		_ => Err(ReferenceError::NotARepo(trimmed.to_string())),
	}
}

/// Strip `<...>` autolink brackets or a `[label](...)` wrapper around a URL.
fn unwrap_link(text: &str) -> &str {
	if let Some(inner) = text.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
		return inner.trim();
	}
	if let Some(caps) = MD_LINK.captures(text)
		&& let Some(url) = caps.get(1)
	{
		return url.as_str();
	}
	text
}

/// Resolve the text of a task line to an issue reference.
///
/// `Ok(None)` means the text is not a reference at all (plain task, or a reference surrounded by prose).
/// `Err` means the text looks like a GitHub reference but cannot be resolved; callers keep such lines as plain text.
pub fn parse_task_reference(text: &str, context: &RepoReference) -> Result<Option<IssueReference>, ReferenceError> {
	let candidate = unwrap_link(text.trim());
	if candidate.is_empty() || candidate.chars().any(char::is_whitespace) {
		return Ok(None);
	}

	if let Some(caps) = SHORTHAND.captures(candidate) {
		let number = caps[3].parse::<u64>().ok().filter(|n| *n > 0).ok_or_else(|| ReferenceError::InvalidNumber(candidate.to_string()))?;
		return Ok(Some(IssueReference::new(&caps[1], &caps[2], number)));
	}

	if let Some(caps) = LOCAL_SHORTHAND.captures(candidate) {
		let number = caps[1].parse::<u64>().ok().filter(|n| *n > 0).ok_or_else(|| ReferenceError::InvalidNumber(candidate.to_string()))?;
		return Ok(Some(IssueReference::new(context.owner.as_str(), context.repo.as_str(), number)));
	}

	if candidate.contains("github.com/") {
		return parse_issue_url(candidate).map(Some);
	}

	Ok(None)
}

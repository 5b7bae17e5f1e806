//! Run-level error types.
//!
//! Per-item failures are not errors at this level; they are collected in the
//! [`Report`](crate::convert::Report). Only configuration problems and failures
//! that leave nothing sensible to continue with end a run early.

#![allow(unused_assignments)] // Fields are read by miette's derive macro via attributes

use miette::Diagnostic;

use crate::{
	github::GitHubError,
	reference::{IssueReference, ReferenceError, RepoReference},
};

/// Invalid or incomplete configuration. Always reported before anything is mutated.
#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum ConfigError {
	#[error("no GitHub token provided")]
	#[diagnostic(code(tasks2subissues::config::missing_token), help("pass --token, set GITHUB_TOKEN, or add `token` to the config file"))]
	MissingToken,

	#[error("invalid target issue URL {url:?}")]
	#[diagnostic(code(tasks2subissues::config::issue_url), help("expected https://github.com/<owner>/<repo>/issues/<number>"))]
	InvalidIssueUrl {
		url: String,
		#[source]
		source: ReferenceError,
	},

	#[error("invalid reference repo URL {url:?}")]
	#[diagnostic(code(tasks2subissues::config::ref_repo_url), help("expected https://github.com/<owner>/<repo>"))]
	InvalidRepoUrl {
		url: String,
		#[source]
		source: ReferenceError,
	},

	#[error("{count} task(s) reference issues from a different owner than {target_owner}, but no reference repo was given")]
	#[diagnostic(
		code(tasks2subissues::config::missing_ref_repo),
		help("pass --refrepo https://github.com/{target_owner}/<repo> so placeholder issues can be created there")
	)]
	MissingRefRepo { count: usize, target_owner: String },

	#[error("reference repo {ref_repo} is not owned by {target_owner}")]
	#[diagnostic(
		code(tasks2subissues::config::ref_repo_owner),
		help("sub-issues must belong to the same owner as their parent; use a repo under {target_owner}")
	)]
	RefRepoOwnerMismatch { ref_repo: RepoReference, target_owner: String },

	#[error("failed to load settings")]
	#[diagnostic(code(tasks2subissues::config::load))]
	Load(#[from] config::ConfigError),
}

/// Errors that end a run.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error("failed to set up the GitHub client")]
	Client(#[source] GitHubError),

	#[error("failed to fetch target issue {target}")]
	FetchTarget {
		target: IssueReference,
		#[source]
		source: GitHubError,
	},

	#[error("failed to fetch existing sub-issues of {target}")]
	FetchSubIssues {
		target: IssueReference,
		#[source]
		source: GitHubError,
	},

	/// Links are already in place at this point, so the original body is kept as is on GitHub.
	#[error("all tasks were linked, but updating the body of {target} failed; the task list is unchanged")]
	BodyUpdate {
		target: IssueReference,
		#[source]
		source: GitHubError,
	},
}

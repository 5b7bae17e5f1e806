//! Settings, layered: optional TOML file < `TASKS2SUBISSUES_*` environment < command line.

use std::{path::Path, time::Duration};

use serde::Deserialize;
use smart_default::SmartDefault;

use crate::{
	error::ConfigError,
	github::DEFAULT_API_URL,
	reference::{IssueReference, RepoReference, parse_issue_url, parse_repo_url},
};

pub const ENV_PREFIX: &str = "TASKS2SUBISSUES";

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, SmartDefault)]
#[serde(default)]
pub struct Settings {
	pub token: Option<String>,
	/// HTML URL of the repo where placeholder issues for other owners' issues are created
	pub ref_repo: Option<String>,
	/// Pause between sub-issue link calls; GitHub rejects rapid bursts of them
	#[default(5000)]
	pub link_delay_ms: u64,
	#[default(_code = "DEFAULT_API_URL.to_string()")]
	pub api_url: String,
}

impl Settings {
	/// Load from an optional config file, then the environment.
	pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
		let mut builder = config::Config::builder();
		if let Some(path) = config_file {
			builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
		}
		let settings = builder.add_source(config::Environment::with_prefix(ENV_PREFIX)).build()?.try_deserialize()?;
		Ok(settings)
	}

	pub fn token(&self) -> Result<&str, ConfigError> {
		self.token.as_deref().filter(|t| !t.trim().is_empty()).ok_or(ConfigError::MissingToken)
	}

	/// Validate the settings for a run against `issue_url`.
	pub fn run_config(&self, issue_url: &str) -> Result<RunConfig, ConfigError> {
		let target = parse_issue_url(issue_url).map_err(|source| ConfigError::InvalidIssueUrl {
			url: issue_url.to_string(),
			source,
		})?;
		let ref_repo = self
			.ref_repo
			.as_deref()
			.map(|url| parse_repo_url(url).map_err(|source| ConfigError::InvalidRepoUrl { url: url.to_string(), source }))
			.transpose()?;

		Ok(RunConfig {
			target,
			ref_repo,
			link_delay: Duration::from_millis(self.link_delay_ms),
		})
	}
}

/// Validated inputs of one conversion run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunConfig {
	/// The issue holding the task list
	pub target: IssueReference,
	pub ref_repo: Option<RepoReference>,
	pub link_delay: Duration,
}

impl RunConfig {
	pub fn new(target: IssueReference, ref_repo: Option<RepoReference>) -> Self {
		Self {
			target,
			ref_repo,
			link_delay: Duration::ZERO,
		}
	}
}

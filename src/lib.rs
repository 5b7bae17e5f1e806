//! Turn the task list of a GitHub issue into real sub-issues.
//!
//! Tasks that reference an issue of the same owner are linked directly. Tasks that
//! reference another owner's issue are linked through a placeholder ("proxy") issue
//! created in a reference repo of the target's owner. Converted lines are then
//! removed from the body; plain tasks stay where they are.

pub mod config;
pub mod convert;
pub mod error;
pub mod github;
pub mod mock_github;
pub mod reference;
pub mod tasklist;

pub use config::{RunConfig, Settings};
pub use convert::{BodyStatus, ItemError, ItemResult, Outcome, Report, convert};
pub use error::{ConfigError, ConvertError};
pub use github::{BoxedGitHubClient, GitHubClient, GitHubError, RealGitHubClient, create_client};
pub use reference::{IssueReference, RepoReference};

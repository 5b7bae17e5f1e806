use std::fmt;

use super::{link::LinkStatus, proxy::ProxyError};
use crate::{github::GitHubError, reference::IssueReference, tasklist::TaskItem};

/// Why a task that names an issue could not be converted.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
	#[error(transparent)]
	Proxy(#[from] ProxyError),
	#[error("linking failed: {0}")]
	Linking(#[source] GitHubError),
	#[error("issue belongs to another owner and no reference repo is configured")]
	NoRefRepo,
}

/// What happened to one task line.
#[derive(Debug)]
pub enum Outcome {
	LinkedOriginal(LinkStatus),
	LinkedViaProxy { proxy: IssueReference, status: LinkStatus },
	/// Plain task, kept in the body
	NotAnIssue,
	Failed(ItemError),
}

impl Outcome {
	/// Whether the line is now represented by a sub-issue and can leave the body.
	pub fn is_converted(&self) -> bool {
		matches!(self, Outcome::LinkedOriginal(_) | Outcome::LinkedViaProxy { .. })
	}

	pub fn is_failed(&self) -> bool {
		matches!(self, Outcome::Failed(_))
	}
}

#[derive(Debug)]
pub struct ItemResult {
	pub item: TaskItem,
	pub outcome: Outcome,
}

/// What happened to the target issue's body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BodyStatus {
	NoTaskList,
	/// Some task failed; the body was not touched
	LeftUnmodified,
	/// Nothing to remove (only plain tasks); no update was made
	NothingConverted,
	Updated { block_removed: bool },
}

#[derive(Debug)]
pub struct Report {
	pub target: IssueReference,
	pub items: Vec<ItemResult>,
	pub body: BodyStatus,
}

impl Report {
	pub fn failures(&self) -> impl Iterator<Item = &ItemResult> {
		self.items.iter().filter(|result| result.outcome.is_failed())
	}

	pub fn is_success(&self) -> bool {
		self.failures().next().is_none()
	}
}

fn already(status: LinkStatus) -> &'static str {
	match status {
		LinkStatus::Linked => "",
		LinkStatus::AlreadyLinked => " (already a sub-issue)",
	}
}

impl fmt::Display for Report {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let url = self.target.html_url();
		writeln!(f, "Converting task list issues to sub-issues for {url}")?;

		for ItemResult { item, outcome } in &self.items {
			let what = item.reference.as_ref().map_or_else(|| item.text.clone(), ToString::to_string);
			match outcome {
				Outcome::LinkedOriginal(status) => writeln!(f, "  linked   {what}{}", already(*status))?,
				Outcome::LinkedViaProxy { proxy, status } => writeln!(f, "  proxied  {what} via {proxy}{}", already(*status))?,
				Outcome::NotAnIssue => writeln!(f, "  kept     {what}")?,
				Outcome::Failed(e) => writeln!(f, "  FAILED   {what}: {e}")?,
			}
		}

		match self.body {
			BodyStatus::NoTaskList => write!(f, "No task list found on {url}, nothing to do"),
			BodyStatus::NothingConverted => write!(f, "No task issues were converted to sub-issues on {url}"),
			BodyStatus::Updated { block_removed: true } => write!(f, "Task list removed on {url}"),
			BodyStatus::Updated { block_removed: false } => write!(f, "Task list updated on {url}"),
			BodyStatus::LeftUnmodified => {
				let count = self.failures().count();
				let errors = if count == 1 { "error was" } else { "errors were" };
				write!(f, "{count} {errors} found. The task list on {url} was left unmodified, so no task is lost")
			}
		}
	}
}

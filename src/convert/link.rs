use std::{collections::HashSet, time::Duration};

use tracing::info;

use crate::{
	github::{GitHubClient, GitHubError},
	reference::IssueReference,
};

/// An issue that can be attached as a sub-issue: its reference plus the resource ID the API wants.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinkTarget {
	pub reference: IssueReference,
	pub id: u64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkStatus {
	Linked,
	/// Was a sub-issue of the target already (earlier run, or an earlier line of this one)
	AlreadyLinked,
}

/// Attaches issues under one parent. Treats existing links as success so reruns make progress.
pub struct Linker<'a> {
	client: &'a dyn GitHubClient,
	parent: &'a IssueReference,
	linked: HashSet<u64>,
	delay: Duration,
	calls: usize,
}

impl<'a> Linker<'a> {
	/// Load the parent's current sub-issues.
	pub async fn load(client: &'a dyn GitHubClient, parent: &'a IssueReference, delay: Duration) -> Result<Self, GitHubError> {
		let existing = client.fetch_sub_issues(&parent.owner, &parent.repo, parent.number).await?;
		tracing::debug!(%parent, existing = existing.len(), "loaded existing sub-issues");
		Ok(Self {
			client,
			parent,
			linked: existing.into_iter().map(|issue| issue.id).collect(),
			delay,
			calls: 0,
		})
	}

	/// Look up an issue's resource ID and link it.
	pub async fn link_original(&mut self, original: &IssueReference) -> Result<LinkStatus, GitHubError> {
		let issue = self.client.fetch_issue(&original.owner, &original.repo, original.number).await?;
		self.link(&LinkTarget {
			reference: original.clone(),
			id: issue.id,
		})
		.await
	}

	pub async fn link(&mut self, child: &LinkTarget) -> Result<LinkStatus, GitHubError> {
		if self.linked.contains(&child.id) {
			info!(parent = %self.parent, child = %child.reference, "already a sub-issue");
			return Ok(LinkStatus::AlreadyLinked);
		}

		if self.calls > 0 && !self.delay.is_zero() {
			tokio::time::sleep(self.delay).await;
		}
		self.calls += 1;

		let status = match self.client.add_sub_issue(&self.parent.owner, &self.parent.repo, self.parent.number, child.id).await {
			Ok(()) => LinkStatus::Linked,
			Err(GitHubError::AlreadyLinked) => LinkStatus::AlreadyLinked,
			Err(e) => return Err(e),
		};
		self.linked.insert(child.id);
		info!(parent = %self.parent, child = %child.reference, ?status, "linked sub-issue");
		Ok(status)
	}
}

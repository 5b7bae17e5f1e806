//! The conversion run: read the target's task list, link every referenced issue as a
//! sub-issue (through a proxy for other owners' issues), then drop the converted lines.
//!
//! Per-task failures are collected, not propagated. The body is only written when
//! every task that names an issue was converted, so a failed run loses nothing and
//! can simply be repeated.

pub mod link;
pub mod owner;
pub mod proxy;
pub mod report;
pub mod rewrite;

use link::Linker;
use owner::OwnerRelation;
use proxy::ProxyCreator;
pub use report::{BodyStatus, ItemError, ItemResult, Outcome, Report};
use rewrite::Rewrite;
use tracing::{info, instrument, warn};

use crate::{
	config::RunConfig,
	error::ConvertError,
	github::GitHubClient,
	reference::IssueReference,
	tasklist::{self, TaskItem},
};

/// Convert the task list of `config.target` into sub-issues.
///
/// Configuration problems (missing or foreign reference repo) are detected before
/// any issue is created or linked.
#[instrument(skip_all, fields(issue = %config.target))]
pub async fn convert(client: &dyn GitHubClient, config: &RunConfig) -> Result<Report, ConvertError> {
	let target = &config.target;
	let issue = client
		.fetch_issue(&target.owner, &target.repo, target.number)
		.await
		.map_err(|source| ConvertError::FetchTarget { target: target.clone(), source })?;
	let body = issue.body.unwrap_or_default();

	let Some(task_list) = tasklist::parse(&body, &target.repo_ref()) else {
		info!("no task list in the body");
		return Ok(Report {
			target: target.clone(),
			items: Vec::new(),
			body: BodyStatus::NoTaskList,
		});
	};
	info!(tasks = task_list.items.len(), kind = ?task_list.block.kind, "found task list");

	let cross_owner = task_list
		.items
		.iter()
		.filter_map(|item| item.reference.as_ref())
		.filter(|reference| owner::resolve(reference, &target.owner) == OwnerRelation::CrossOwner)
		.count();
	let ref_repo = proxy::require_ref_repo(cross_owner, config.ref_repo.as_ref(), &target.owner)?;

	let mut linker = Linker::load(client, target, config.link_delay)
		.await
		.map_err(|source| ConvertError::FetchSubIssues { target: target.clone(), source })?;
	let mut proxies = ref_repo.map(|ref_repo| ProxyCreator::new(client, ref_repo));

	let mut items = Vec::with_capacity(task_list.items.len());
	for item in &task_list.items {
		let outcome = convert_item(item, target, &mut linker, proxies.as_mut()).await;
		if let Outcome::Failed(e) = &outcome {
			warn!(line = item.line, task = %item.text, error = %e, "task not converted");
		}
		items.push(ItemResult { item: item.clone(), outcome });
	}

	let body = match rewrite::plan(&body, &task_list, &items) {
		Rewrite::Blocked { failures } => {
			warn!(failures, "leaving the body unmodified");
			BodyStatus::LeftUnmodified
		}
		Rewrite::Unchanged => BodyStatus::NothingConverted,
		Rewrite::Body { body, block_removed } => {
			client
				.update_issue_body(&target.owner, &target.repo, target.number, &body)
				.await
				.map_err(|source| ConvertError::BodyUpdate { target: target.clone(), source })?;
			info!(block_removed, "updated body");
			BodyStatus::Updated { block_removed }
		}
	};

	Ok(Report {
		target: target.clone(),
		items,
		body,
	})
}

async fn convert_item(item: &TaskItem, target: &IssueReference, linker: &mut Linker<'_>, proxies: Option<&mut ProxyCreator<'_>>) -> Outcome {
	let Some(reference) = &item.reference else {
		return Outcome::NotAnIssue;
	};
	// An issue cannot be its own sub-issue; keep the line as written
	if owner::is_same_issue(reference, target) {
		warn!(line = item.line, %reference, "task points at the issue holding the list, keeping it");
		return Outcome::NotAnIssue;
	}

	match (owner::resolve(reference, &target.owner), proxies) {
		(OwnerRelation::SameOwner, _) => match linker.link_original(reference).await {
			Ok(status) => Outcome::LinkedOriginal(status),
			Err(e) => Outcome::Failed(ItemError::Linking(e)),
		},
		(OwnerRelation::CrossOwner, Some(proxies)) => {
			let proxy = match proxies.proxy_for(reference).await {
				Ok(proxy) => proxy,
				Err(e) => return Outcome::Failed(e.into()),
			};
			match linker.link(&proxy).await {
				Ok(status) => Outcome::LinkedViaProxy { proxy: proxy.reference, status },
				Err(e) => Outcome::Failed(ItemError::Linking(e)),
			}
		}
		// Rejected up front by require_ref_repo
		(OwnerRelation::CrossOwner, None) => Outcome::Failed(ItemError::NoRefRepo),
	}
}

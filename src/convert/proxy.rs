//! Placeholder issues for tasks that point at another owner's issues.
//!
//! GitHub only links sub-issues under the same owner as the parent, so an issue
//! from another owner is represented by a proxy issue in the reference repo whose
//! body links back to the original.

use std::collections::HashMap;

use tracing::{info, warn};

use super::link::LinkTarget;
use crate::{
	error::ConfigError,
	github::{GitHubClient, GitHubError, IssueState},
	reference::{IssueReference, RepoReference, parse_issue_url},
};

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
	#[error("failed to fetch original issue {original}: {source}")]
	FetchOriginal {
		original: IssueReference,
		#[source]
		source: GitHubError,
	},
	#[error("failed to look for an existing proxy of {original} in {ref_repo}: {source}")]
	Lookup {
		original: IssueReference,
		ref_repo: RepoReference,
		#[source]
		source: GitHubError,
	},
	#[error("failed to create proxy of {original} in {ref_repo}: {source}")]
	Create {
		original: IssueReference,
		ref_repo: RepoReference,
		#[source]
		source: GitHubError,
	},
}

/// Check that proxies can be created before anything is mutated.
///
/// With `cross_owner == 0` no reference repo is needed and `None` is returned.
pub fn require_ref_repo<'a>(cross_owner: usize, ref_repo: Option<&'a RepoReference>, target_owner: &str) -> Result<Option<&'a RepoReference>, ConfigError> {
	if cross_owner == 0 {
		return Ok(None);
	}
	let ref_repo = ref_repo.ok_or_else(|| ConfigError::MissingRefRepo {
		count: cross_owner,
		target_owner: target_owner.to_string(),
	})?;
	if !ref_repo.same_owner(target_owner) {
		return Err(ConfigError::RefRepoOwnerMismatch {
			ref_repo: ref_repo.clone(),
			target_owner: target_owner.to_string(),
		});
	}
	Ok(Some(ref_repo))
}

/// `owner/repo#N:title`, without a space; proxies are looked up again by this exact title.
pub fn proxy_title(original: &IssueReference, original_title: &str) -> String {
	format!("{original}:{original_title}")
}

pub fn proxy_body(original: &IssueReference, title: &str) -> String {
	format!("This issue is a reference/placeholder to: [{title}]({})", original.html_url())
}

/// Creates proxies in one reference repo, at most one per original issue per run.
pub struct ProxyCreator<'a> {
	client: &'a dyn GitHubClient,
	ref_repo: &'a RepoReference,
	proxies: HashMap<IssueReference, LinkTarget>,
}

impl<'a> ProxyCreator<'a> {
	pub fn new(client: &'a dyn GitHubClient, ref_repo: &'a RepoReference) -> Self {
		Self {
			client,
			ref_repo,
			proxies: HashMap::new(),
		}
	}

	/// The proxy for `original`: one created earlier in this run, one left by a previous run
	/// (same title in the reference repo), or a new one.
	pub async fn proxy_for(&mut self, original: &IssueReference) -> Result<LinkTarget, ProxyError> {
		if let Some(proxy) = self.proxies.get(original) {
			tracing::debug!(%original, proxy = %proxy.reference, "reusing proxy from this run");
			return Ok(proxy.clone());
		}

		let proxy = self.find_or_create(original).await?;
		self.proxies.insert(original.clone(), proxy.clone());
		Ok(proxy)
	}

	async fn find_or_create(&self, original: &IssueReference) -> Result<LinkTarget, ProxyError> {
		let RepoReference { owner, repo } = self.ref_repo;

		let details = self
			.client
			.fetch_issue(&original.owner, &original.repo, original.number)
			.await
			.map_err(|source| ProxyError::FetchOriginal { original: original.clone(), source })?;
		let title = proxy_title(original, &details.title);

		let existing = self.client.find_issue_by_title(owner, repo, &title).await.map_err(|source| ProxyError::Lookup {
			original: original.clone(),
			ref_repo: self.ref_repo.clone(),
			source,
		})?;
		if let Some(existing) = existing {
			let reference = IssueReference::new(owner.as_str(), repo.as_str(), existing.number);
			info!(%original, proxy = %reference, "found proxy from a previous run");
			return Ok(LinkTarget { reference, id: existing.id });
		}

		let created = self
			.client
			.create_issue(owner, repo, &title, &proxy_body(original, &title))
			.await
			.map_err(|source| ProxyError::Create {
				original: original.clone(),
				ref_repo: self.ref_repo.clone(),
				source,
			})?;
		let reference = parse_issue_url(&created.html_url).unwrap_or_else(|_| IssueReference::new(owner.as_str(), repo.as_str(), created.number));
		info!(%original, proxy = %reference, "created proxy issue");

		// Mirror the original's state; the proxy is usable either way
		if details.state == IssueState::Closed
			&& let Err(e) = self.client.update_issue_state(owner, repo, created.number, IssueState::Closed).await
		{
			warn!(proxy = %reference, error = %e, "failed to close proxy of a closed issue");
		}

		Ok(LinkTarget { reference, id: created.id })
	}
}

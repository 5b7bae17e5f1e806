//! End-to-end conversion runs against the in-memory GitHub client.

use insta::assert_snapshot;
use rstest::{fixture, rstest};
use tasks2subissues::{
	BodyStatus, ConfigError, ConvertError, IssueReference, Outcome, RepoReference, RunConfig, convert,
	convert::link::LinkStatus,
	github::{GitHubClient, IssueState},
	mock_github::MockGitHubClient,
};

fn target() -> IssueReference {
	IssueReference::new("acme", "repo", 1)
}

fn with_refs() -> RunConfig {
	RunConfig::new(target(), Some(RepoReference::new("acme", "refs")))
}

fn calls(client: &MockGitHubClient, method: &str) -> usize {
	client.get_call_log().iter().filter(|call| call.starts_with(method)).count()
}

#[fixture]
fn client() -> MockGitHubClient {
	let client = MockGitHubClient::new();
	client.add_issue("acme", "repo", 5, "Same owner task", "", IssueState::Open);
	client.add_issue("acme", "repo", 6, "Another task", "", IssueState::Open);
	client.add_issue("acme", "tools", 2, "Sibling repo task", "", IssueState::Open);
	client.add_issue("other-org", "repo", 5, "Upstream bug", "", IssueState::Open);
	client.add_issue("other-org", "lib", 9, "Fixed upstream", "", IssueState::Closed);
	client
}

#[rstest]
#[tokio::test]
async fn test_same_owner_task_is_linked_and_removed(client: MockGitHubClient) {
	let body = "Intro\n- [ ] https://github.com/acme/repo/issues/5\n- [ ] buy milk\n";
	client.add_issue("acme", "repo", 1, "Epic", body, IssueState::Open);

	let report = convert(&client, &RunConfig::new(target(), None)).await.unwrap();

	assert!(report.is_success());
	assert_eq!(client.linked_sub_issues("acme", "repo", 1), vec!["acme/repo#5".to_string()]);
	assert_eq!(client.issue_body("acme", "repo", 1).unwrap(), "Intro\n- [ ] buy milk\n");
	assert_eq!(calls(&client, "create_issue"), 0);
	assert_snapshot!(report.to_string(), @"
	Converting task list issues to sub-issues for https://github.com/acme/repo/issues/1
	  linked   acme/repo#5
	  kept     buy milk
	Task list updated on https://github.com/acme/repo/issues/1
	");
}

#[rstest]
#[tokio::test]
async fn test_cross_owner_task_goes_through_proxy(client: MockGitHubClient) {
	let body = "Intro\n- [ ] https://github.com/other-org/repo/issues/5\n- [ ] buy milk\n";
	client.add_issue("acme", "repo", 1, "Epic", body, IssueState::Open);

	let report = convert(&client, &with_refs()).await.unwrap();

	assert!(report.is_success());
	let proxies = client.repo_issues("acme", "refs");
	assert_eq!(proxies.len(), 1);
	let (_, title, proxy_body, state) = &proxies[0];
	assert_eq!(title, "other-org/repo#5:Upstream bug");
	assert_snapshot!(proxy_body, @"This issue is a reference/placeholder to: [other-org/repo#5:Upstream bug](https://github.com/other-org/repo/issues/5)");
	assert_eq!(*state, IssueState::Open);

	assert_eq!(client.linked_sub_issues("acme", "repo", 1), vec!["acme/refs#1".to_string()]);
	assert_eq!(client.issue_body("acme", "repo", 1).unwrap(), "Intro\n- [ ] buy milk\n");
	// The original is never linked itself
	assert!(client.linked_sub_issues("other-org", "repo", 5).is_empty());
}

#[rstest]
#[tokio::test]
async fn test_mixed_owners_in_fenced_tasklist(client: MockGitHubClient) {
	let body = "Plan:\n\n```[tasklist]\n### Tasks\n- [ ] #5\n- [x] acme/tools#2\n- [ ] other-org/lib#9\n```\n\nNotes stay.\n";
	client.add_issue("acme", "repo", 1, "Epic", body, IssueState::Open);

	let report = convert(&client, &with_refs()).await.unwrap();

	assert_eq!(report.body, BodyStatus::Updated { block_removed: true });
	assert_eq!(client.issue_body("acme", "repo", 1).unwrap(), "Plan:\n\n\nNotes stay.\n");
	assert_eq!(client.linked_sub_issues("acme", "repo", 1), vec!["acme/repo#5", "acme/tools#2", "acme/refs#1"]);
	// Proxy of a closed issue is closed too
	assert_eq!(client.repo_issues("acme", "refs")[0].3, IssueState::Closed);
}

#[rstest]
#[tokio::test]
async fn test_only_plain_tasks_leaves_body_untouched(client: MockGitHubClient) {
	let body = "- [ ] buy milk\n- [x] walk the dog\n";
	client.add_issue("acme", "repo", 1, "Chores", body, IssueState::Open);

	let report = convert(&client, &RunConfig::new(target(), None)).await.unwrap();

	assert!(report.is_success());
	assert_eq!(report.body, BodyStatus::NothingConverted);
	assert!(report.items.iter().all(|item| matches!(item.outcome, Outcome::NotAnIssue)));
	assert_eq!(calls(&client, "update_issue_body"), 0);
	assert_eq!(calls(&client, "add_sub_issue"), 0);
	assert_eq!(client.issue_body("acme", "repo", 1).unwrap(), body);
}

#[rstest]
#[tokio::test]
async fn test_failed_task_keeps_body_byte_identical(client: MockGitHubClient) {
	let body = "Intro\r\n- [ ] #5\r\n- [ ] #6\r\n- [ ] buy milk\r\n";
	client.add_issue("acme", "repo", 1, "Epic", body, IssueState::Open);
	client.fail_linking_of("acme", "repo", 6);

	let report = convert(&client, &RunConfig::new(target(), None)).await.unwrap();

	assert!(!report.is_success());
	assert_eq!(report.body, BodyStatus::LeftUnmodified);
	assert_eq!(calls(&client, "update_issue_body"), 0);
	assert_eq!(client.issue_body("acme", "repo", 1).unwrap(), body);
	// Later tasks are still attempted after a failure
	assert_eq!(client.linked_sub_issues("acme", "repo", 1), vec!["acme/repo#5".to_string()]);
	assert!(report.to_string().ends_with("1 error was found. The task list on https://github.com/acme/repo/issues/1 was left unmodified, so no task is lost"));
}

#[rstest]
#[tokio::test]
async fn test_rerun_after_partial_failure_completes(client: MockGitHubClient) {
	let body = "- [ ] #5\n- [ ] other-org/repo#5\n- [ ] #404\n";
	client.add_issue("acme", "repo", 1, "Epic", body, IssueState::Open);

	let first = convert(&client, &with_refs()).await.unwrap();
	assert_eq!(first.failures().count(), 1);
	assert_eq!(client.issue_body("acme", "repo", 1).unwrap(), body);

	client.add_issue("acme", "repo", 404, "Created later", "", IssueState::Open);
	client.clear_call_log();
	let second = convert(&client, &with_refs()).await.unwrap();

	assert!(second.is_success());
	assert!(matches!(second.items[0].outcome, Outcome::LinkedOriginal(LinkStatus::AlreadyLinked)));
	assert!(matches!(second.items[1].outcome, Outcome::LinkedViaProxy { status: LinkStatus::AlreadyLinked, .. }));
	assert!(matches!(second.items[2].outcome, Outcome::LinkedOriginal(LinkStatus::Linked)));
	// The proxy from the first run is found again, not duplicated
	assert_eq!(client.repo_issues("acme", "refs").len(), 1);
	assert_eq!(calls(&client, "create_issue"), 0);
	assert_eq!(client.issue_body("acme", "repo", 1).unwrap(), "");
	assert_eq!(client.linked_sub_issues("acme", "repo", 1).len(), 3);
}

#[rstest]
#[tokio::test]
async fn test_duplicate_cross_owner_references_share_one_proxy(client: MockGitHubClient) {
	let body = "- [ ] other-org/repo#5\n- [ ] https://github.com/other-org/repo/issues/5\n";
	client.add_issue("acme", "repo", 1, "Epic", body, IssueState::Open);

	let report = convert(&client, &with_refs()).await.unwrap();

	assert!(report.is_success());
	assert_eq!(client.repo_issues("acme", "refs").len(), 1);
	assert_eq!(calls(&client, "add_sub_issue"), 1);
	assert!(matches!(report.items[1].outcome, Outcome::LinkedViaProxy { status: LinkStatus::AlreadyLinked, .. }));
}

#[rstest]
#[tokio::test]
async fn test_missing_refrepo_fails_before_any_mutation(client: MockGitHubClient) {
	let body = "- [ ] #5\n- [ ] other-org/repo#5\n";
	client.add_issue("acme", "repo", 1, "Epic", body, IssueState::Open);

	let result = convert(&client, &RunConfig::new(target(), None)).await;

	assert!(matches!(result, Err(ConvertError::Config(ConfigError::MissingRefRepo { count: 1, .. }))));
	assert_eq!(calls(&client, "create_issue"), 0);
	assert_eq!(calls(&client, "add_sub_issue"), 0);
	assert_eq!(calls(&client, "update_issue_body"), 0);
}

#[rstest]
#[tokio::test]
async fn test_refrepo_of_another_owner_is_rejected(client: MockGitHubClient) {
	client.add_issue("acme", "repo", 1, "Epic", "- [ ] other-org/repo#5\n", IssueState::Open);

	let config = RunConfig::new(target(), Some(RepoReference::new("other-org", "refs")));
	let result = convert(&client, &config).await;

	assert!(matches!(result, Err(ConvertError::Config(ConfigError::RefRepoOwnerMismatch { .. }))));
	assert_eq!(calls(&client, "create_issue"), 0);
}

#[rstest]
#[tokio::test]
async fn test_failed_proxy_creation_blocks_rewrite(client: MockGitHubClient) {
	let body = "- [ ] #5\n- [ ] other-org/repo#5\n";
	client.add_issue("acme", "repo", 1, "Epic", body, IssueState::Open);
	client.fail_create_issue_in("acme", "refs");

	let report = convert(&client, &with_refs()).await.unwrap();

	assert_eq!(report.body, BodyStatus::LeftUnmodified);
	assert!(matches!(report.items[1].outcome, Outcome::Failed(_)));
	assert_eq!(client.issue_body("acme", "repo", 1).unwrap(), body);
}

#[rstest]
#[tokio::test]
async fn test_body_update_failure_is_fatal(client: MockGitHubClient) {
	client.add_issue("acme", "repo", 1, "Epic", "- [ ] #5\n", IssueState::Open);
	client.fail_body_updates();

	let result = convert(&client, &RunConfig::new(target(), None)).await;

	assert!(matches!(result, Err(ConvertError::BodyUpdate { .. })));
	// The link stays; a rerun sees it as already done and retries the update
	assert_eq!(client.linked_sub_issues("acme", "repo", 1), vec!["acme/repo#5".to_string()]);
}

#[rstest]
#[tokio::test]
async fn test_unresolvable_lines_are_plain_tasks(client: MockGitHubClient) {
	let body = "- [ ] see #5 and #6\n- [ ] https://github.com/acme/repo/pull/6\n- [ ] #6\n";
	client.add_issue("acme", "repo", 1, "Epic", body, IssueState::Open);

	let report = convert(&client, &RunConfig::new(target(), None)).await.unwrap();

	assert!(report.is_success());
	assert_eq!(client.issue_body("acme", "repo", 1).unwrap(), "- [ ] see #5 and #6\n- [ ] https://github.com/acme/repo/pull/6\n");
	assert_eq!(client.linked_sub_issues("acme", "repo", 1), vec!["acme/repo#6".to_string()]);
}

#[rstest]
#[tokio::test]
async fn test_target_without_body(client: MockGitHubClient) {
	client.add_issue("acme", "repo", 1, "Empty", "", IssueState::Open);

	let report = convert(&client, &RunConfig::new(target(), None)).await.unwrap();

	assert_eq!(report.body, BodyStatus::NoTaskList);
	assert!(client.fetch_issue("acme", "repo", 1).await.unwrap().body.is_none());
}

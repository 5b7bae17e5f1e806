use std::collections::BTreeSet;

use super::report::ItemResult;
use crate::tasklist::TaskList;

/// Decision on the target body after every task was processed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Rewrite {
	/// At least one task failed; the body must stay as it is
	Blocked { failures: usize },
	/// No task was converted, nothing to write
	Unchanged,
	Body { body: String, block_removed: bool },
}

/// Compute the new body: converted lines removed, everything else byte for byte.
pub fn plan(body: &str, task_list: &TaskList, results: &[ItemResult]) -> Rewrite {
	let failures = results.iter().filter(|result| result.outcome.is_failed()).count();
	if failures > 0 {
		return Rewrite::Blocked { failures };
	}

	let converted: BTreeSet<usize> = results.iter().filter(|result| result.outcome.is_converted()).map(|result| result.item.line).collect();
	if converted.is_empty() {
		return Rewrite::Unchanged;
	}

	Rewrite::Body {
		body: task_list.without_lines(body, &converted),
		block_removed: task_list.items.iter().all(|item| converted.contains(&item.line)),
	}
}

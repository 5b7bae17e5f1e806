//! Task list extraction from an issue body.
//!
//! Only the first task list in the body is considered. It is either:
//! - a fenced legacy tasklist block (```` ```[tasklist] ```` ... ```` ``` ````), or
//! - a run of consecutive checklist lines (`- [ ] text`, `* [x] text`, `+ [X] text`).
//!
//! Lines keep their original bytes (including line terminators) so the body can be
//! reassembled exactly around the lines that get removed.

use std::{collections::BTreeSet, ops::Range, sync::LazyLock};

use regex::Regex;

use crate::reference::{IssueReference, RepoReference, parse_task_reference};

static CHECKLIST_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[ \t]*[-*+][ \t]+\[([ xX])\](?:[ \t]+(.*?))?[ \t]*$").expect("valid regex"));
static TASKLIST_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[ \t]*```[ \t]*\[tasklist\][ \t]*$").expect("valid regex"));

/// How the task list is delimited in the body.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BlockKind {
	/// Consecutive checklist lines.
	Checklist,
	/// A ```` ```[tasklist] ```` fenced block, fences included in the line range.
	FencedTasklist,
}

/// Location of the task list, as a range of line indices into the body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Block {
	pub kind: BlockKind,
	pub lines: Range<usize>,
}

/// One checklist line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaskItem {
	/// Line index in the body
	pub line: usize,
	/// The line exactly as it appears in the body, without its terminator
	pub raw: String,
	/// Task text after the checkbox
	pub text: String,
	pub checked: bool,
	pub reference: Option<IssueReference>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TaskList {
	pub block: Block,
	pub items: Vec<TaskItem>,
}

/// Split a body into lines, each keeping its terminator.
pub fn body_lines(body: &str) -> Vec<&str> {
	body.split_inclusive('\n').collect()
}

fn strip_eol(line: &str) -> &str {
	let line = line.strip_suffix('\n').unwrap_or(line);
	line.strip_suffix('\r').unwrap_or(line)
}

/// Parse a checklist line into (checked, text).
fn parse_checkbox(line: &str) -> Option<(bool, &str)> {
	let caps = CHECKLIST_LINE.captures(line)?;
	let checked = !caps[1].trim().is_empty();
	let text = caps.get(2).map_or("", |m| m.as_str());
	Some((checked, text))
}

/// An opening code fence: the fence character and its length.
fn code_fence(line: &str) -> Option<(char, usize)> {
	let trimmed = line.trim_start();
	let ch = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
	let len = trimmed.chars().take_while(|c| *c == ch).count();
	(len >= 3).then_some((ch, len))
}

fn closes_fence(line: &str, (ch, len): (char, usize)) -> bool {
	let trimmed = line.trim();
	let run = trimmed.chars().take_while(|c| *c == ch).count();
	run >= len && run == trimmed.chars().count()
}

/// Whether an HTML comment is still open after `line`, given whether one was open before it.
fn comment_open_after(line: &str, mut open: bool) -> bool {
	let mut rest = line;
	loop {
		let marker = if open { "-->" } else { "<!--" };
		match rest.find(marker) {
			Some(at) => {
				rest = &rest[at + marker.len()..];
				open = !open;
			}
			None => return open,
		}
	}
}

fn task_item(line_idx: usize, raw: &str, context: &RepoReference) -> Option<TaskItem> {
	let (checked, text) = parse_checkbox(raw)?;
	let reference = match parse_task_reference(text, context) {
		Ok(reference) => reference,
		Err(e) => {
			tracing::warn!(line = line_idx + 1, error = %e, "keeping unresolvable reference as plain task");
			None
		}
	};
	Some(TaskItem {
		line: line_idx,
		raw: raw.to_string(),
		text: text.to_string(),
		checked,
		reference,
	})
}

/// Locate and parse the task list in `body`.
///
/// `context` is the repository of the issue holding the body, used to resolve `#123` shorthands.
/// Returns `None` if the body has no task list.
pub fn parse(body: &str, context: &RepoReference) -> Option<TaskList> {
	let lines: Vec<&str> = body_lines(body).into_iter().map(strip_eol).collect();
	let mut open_fence: Option<(char, usize)> = None;
	let mut in_comment = false;

	let mut i = 0;
	while i < lines.len() {
		let line = lines[i];

		if let Some(fence) = open_fence {
			if closes_fence(line, fence) {
				open_fence = None;
			}
			i += 1;
			continue;
		}

		// Commented-out text is never rendered, so it cannot hold the task list
		if in_comment || comment_open_after(line, false) {
			in_comment = comment_open_after(line, in_comment);
			i += 1;
			continue;
		}

		if TASKLIST_FENCE.is_match(line)
			&& let Some(close) = (i + 1..lines.len()).find(|&j| closes_fence(lines[j], ('`', 3)))
		{
			let items = (i + 1..close).filter_map(|j| task_item(j, lines[j], context)).collect();
			return Some(TaskList {
				block: Block {
					kind: BlockKind::FencedTasklist,
					lines: i..close + 1,
				},
				items,
			});
		}

		if let Some(fence) = code_fence(line) {
			open_fence = Some(fence);
			i += 1;
			continue;
		}

		if parse_checkbox(line).is_some() {
			let end = (i..lines.len())
				.find(|&j| parse_checkbox(lines[j]).is_none() || comment_open_after(lines[j], false))
				.unwrap_or(lines.len());
			let items = (i..end).filter_map(|j| task_item(j, lines[j], context)).collect();
			return Some(TaskList {
				block: Block { kind: BlockKind::Checklist, lines: i..end },
				items,
			});
		}

		i += 1;
	}

	None
}

impl TaskList {
	/// Rebuild `body` without the task lines at the given line indices.
	///
	/// Every other line is copied byte for byte. If no task line is left, the whole block goes
	/// (for a fenced tasklist that includes the fences and any headers inside).
	pub fn without_lines(&self, body: &str, removed: &BTreeSet<usize>) -> String {
		let remaining = self.items.iter().filter(|item| !removed.contains(&item.line)).count();
		let drop_block = remaining == 0;

		body_lines(body)
			.into_iter()
			.enumerate()
			.filter(|(i, _)| !(self.block.lines.contains(i) && (drop_block || removed.contains(i))))
			.map(|(_, line)| line)
			.collect()
	}
}

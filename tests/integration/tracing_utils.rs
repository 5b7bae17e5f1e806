//! Reading the JSON trace file the binary writes when `TASKS2SUBISSUES_TRACE_FILE` is set.

use std::{fs, path::Path};

use serde::Deserialize;

/// A single trace event from the JSON log
#[derive(Debug, Deserialize)]
pub struct TraceEvent {
	/// DEBUG, INFO, WARN or ERROR
	pub level: String,
	pub fields: TraceFields,
}

#[derive(Debug, Deserialize)]
pub struct TraceFields {
	pub message: Option<String>,
}

pub struct TraceLog {
	events: Vec<TraceEvent>,
}

impl TraceLog {
	pub fn from_file(path: &Path) -> Self {
		let content = fs::read_to_string(path).unwrap_or_default();
		let events = content.lines().filter(|line| !line.is_empty()).filter_map(|line| serde_json::from_str(line).ok()).collect();
		Self { events }
	}

	pub fn has_event(&self, level: &str, message: &str) -> bool {
		self.events.iter().any(|e| e.level == level && e.fields.message.as_deref() == Some(message))
	}
}

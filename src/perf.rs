//! Timing scopes and the dispatch journal.
//!
//! Scopes print their elapsed time to stderr once `--perf` turns them on.
//! The journal, opened with a path, is a JSON-lines file with one entry per
//! dispatched action, subscriber failure and mount attempt. Every entry
//! carries `event` and `ms` (milliseconds since the journal was opened), so
//! a session can be replayed or diffed after the fact.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde_json::{Map, Value, json};

use crate::editor::{Action, SubscriptionId};
use crate::error::EditorError;

static ENABLED: AtomicBool = AtomicBool::new(false);
static JOURNAL: LazyLock<Mutex<Journal>> = LazyLock::new(|| Mutex::new(Journal::closed()));

/// Prints how long it lived when dropped, if timing is enabled.
#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        if !is_enabled() {
            return;
        }
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        eprintln!("[perf] {}: {:.2} ms", self.name, elapsed_ms);
    }
}

#[derive(Debug)]
struct Journal {
    start: Instant,
    writer: Option<BufWriter<File>>,
}

impl Journal {
    fn closed() -> Self {
        Self {
            start: Instant::now(),
            writer: None,
        }
    }

    /// Append one entry. `fields` is only built when the journal is open.
    fn record(&mut self, event: &str, fields: impl FnOnce() -> Map<String, Value>) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let mut entry = Map::new();
        entry.insert("event".to_string(), json!(event));
        entry.insert("ms".to_string(), json!(elapsed_ms));
        entry.extend(fields());
        // Journal write failures must not disturb the editor.
        let _ = serde_json::to_writer(&mut *writer, &Value::Object(entry));
        let _ = writeln!(writer);
        let _ = writer.flush();
    }
}

fn journal() -> MutexGuard<'static, Journal> {
    JOURNAL.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

/// Start a fresh journal at `path`, or close the journal with `None`.
///
/// # Errors
/// Returns the I/O error if the file cannot be created or written.
pub fn open_journal(path: Option<&Path>) -> std::io::Result<()> {
    let mut journal = journal();
    match path {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            writeln!(writer, r#"{{"event":"journal-start","ms":0.0}}"#)?;
            writer.flush()?;
            journal.start = Instant::now();
            journal.writer = Some(writer);
        }
        None => journal.writer = None,
    }
    Ok(())
}

pub fn is_journal_open() -> bool {
    journal().writer.is_some()
}

/// Record an action the editor has just applied.
pub fn log_action(action: &Action) {
    journal().record("dispatch", || {
        let mut fields = Map::new();
        fields.insert(
            "action".to_string(),
            serde_json::to_value(action).unwrap_or_else(|_| json!(action.kind())),
        );
        fields
    });
}

/// Record a subscriber that returned an error or panicked.
pub fn log_subscriber_failure(subscription: SubscriptionId, message: &str) {
    journal().record("subscriber-failure", || {
        let mut fields = Map::new();
        fields.insert("subscription".to_string(), json!(subscription.0));
        fields.insert("error".to_string(), json!(message));
        fields
    });
}

/// Record the outcome of the mount gate.
pub fn log_mount(blocks: usize, refusal: Option<&EditorError>) {
    journal().record("mount", || {
        let mut fields = Map::new();
        fields.insert("blocks".to_string(), json!(blocks));
        fields.insert("mounted".to_string(), json!(refusal.is_none()));
        if let Some(err) = refusal {
            fields.insert("error".to_string(), json!(err.to_string()));
        }
        fields
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockId;
    use tempfile::NamedTempFile;

    #[test]
    fn test_set_enabled_toggles_runtime_flag() {
        set_enabled(true);
        assert!(is_enabled());

        set_enabled(false);
        assert!(!is_enabled());
    }

    #[test]
    fn test_journal_records_editor_events_as_json_lines() {
        let temp_file = NamedTempFile::new().unwrap();
        open_journal(Some(temp_file.path())).unwrap();
        assert!(is_journal_open());
        log_action(&Action::Delete {
            id: BlockId::from("gone"),
        });
        log_subscriber_failure(SubscriptionId(7), "renderer crashed");
        log_mount(
            2,
            Some(&EditorError::InvalidDocument {
                id: BlockId::Number(1),
                field: "data.text".to_string(),
                message: "is required".to_string(),
            }),
        );
        open_journal(None).unwrap();
        assert!(!is_journal_open());

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let entries: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries[0]["event"], "journal-start");

        // Other tests may dispatch while the journal is open, so look the
        // entries up instead of relying on positions.
        let find = |event: &str, key: &str, expected: Value| {
            entries
                .iter()
                .any(|entry| entry["event"] == event && entry[key] == expected)
        };
        assert!(find("dispatch", "action", json!({ "type": "delete", "id": "gone" })));
        assert!(find("subscriber-failure", "subscription", json!(7)));
        assert!(find(
            "mount",
            "error",
            json!("data.text is required at block with id '1'")
        ));
        assert!(entries.iter().all(|entry| entry["ms"].is_number()));
    }
}

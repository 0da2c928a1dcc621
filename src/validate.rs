use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::models::Task;

/// Result of checking untrusted import input. `errors` block the import;
/// `warnings` are advisory. `todos` is present only when `is_valid`.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub todos: Option<Vec<Task>>,
}

/// The recognized top-level shapes of import input, determined up front
/// instead of duck-typing inside the field checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImportShape {
    /// `{ metadata, data: { todos, ... } }` — a metadata-wrapped export.
    Enhanced,
    /// `{ todos: [...] }` with no envelope.
    Legacy,
    Unrecognized,
}

fn detect_shape(parsed: &Value) -> ImportShape {
    let Some(object) = parsed.as_object() else {
        return ImportShape::Unrecognized;
    };
    if object.get("metadata").is_some_and(Value::is_object)
        && object.get("data").is_some_and(Value::is_object)
    {
        return ImportShape::Enhanced;
    }
    if object.get("todos").is_some_and(Value::is_array) {
        return ImportShape::Legacy;
    }
    ImportShape::Unrecognized
}

/// Turns an arbitrary string into either a clean task collection or a
/// detailed failure report. Never panics on malformed input.
pub fn validate_import_data(raw: &str) -> ValidationReport {
    let mut report = ValidationReport::default();

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(parsed) => parsed,
        Err(_) => {
            report.errors.push("Invalid JSON format".to_string());
            return report;
        }
    };

    match detect_shape(&parsed) {
        ImportShape::Enhanced => validate_enhanced(&parsed, &mut report),
        ImportShape::Legacy => validate_legacy(&parsed, &mut report),
        ImportShape::Unrecognized => {
            report.errors.push("Unrecognized data format".to_string());
        }
    }

    report
}

fn validate_enhanced(parsed: &Value, report: &mut ValidationReport) {
    let has_app_name = parsed["metadata"]
        .get("appName")
        .and_then(Value::as_str)
        .is_some_and(|name| !name.is_empty());
    if !has_app_name {
        report
            .warnings
            .push("Missing or incomplete metadata".to_string());
    }

    match parsed["data"].get("todos").and_then(Value::as_array) {
        Some(todos) => validate_todos(todos, report),
        None => {
            report
                .errors
                .push("Invalid data structure: todos array not found".to_string());
        }
    }
}

fn validate_legacy(parsed: &Value, report: &mut ValidationReport) {
    report
        .warnings
        .push("Importing legacy format (no metadata)".to_string());
    // Shape detection already proved `todos` is an array.
    let todos = parsed["todos"].as_array().expect("checked by detect_shape");
    validate_todos(todos, report);
}

fn validate_todos(todos: &[Value], report: &mut ValidationReport) {
    let mut valid: Vec<Task> = Vec::new();

    for (index, todo) in todos.iter().enumerate() {
        let n = index + 1;
        let mut todo_errors: Vec<String> = Vec::new();

        let id = todo.get("id").and_then(Value::as_str);
        if !id.is_some_and(|id| !id.is_empty()) {
            todo_errors.push(format!("Todo {n}: missing or invalid id"));
        }

        let text = todo.get("text").and_then(Value::as_str);
        if !text.is_some_and(|text| !text.trim().is_empty()) {
            todo_errors.push(format!("Todo {n}: missing or invalid text"));
        }

        let completed = todo.get("completed").and_then(Value::as_bool);
        if completed.is_none() {
            todo_errors.push(format!("Todo {n}: completed must be boolean"));
        }

        let created_at = todo.get("createdAt").and_then(Value::as_str);
        match created_at {
            Some(stamp) if !stamp.is_empty() => {
                if parse_date(stamp).is_none() {
                    todo_errors.push(format!("Todo {n}: invalid date format in createdAt"));
                }
            }
            _ => {
                todo_errors.push(format!("Todo {n}: missing or invalid createdAt"));
            }
        }

        if todo_errors.is_empty() {
            valid.push(Task {
                id: id.expect("validated above").to_string(),
                text: text.expect("validated above").to_string(),
                completed: completed.expect("validated above"),
                created_at: created_at.expect("validated above").to_string(),
            });
        } else {
            report.errors.append(&mut todo_errors);
        }
    }

    // Batch-reject policy: one bad task invalidates the whole import, so the
    // skipped-count warning only fires if that policy ever loosens.
    if report.errors.is_empty() {
        report.is_valid = true;
        if valid.len() != todos.len() {
            report
                .warnings
                .push(format!("{} invalid todos were skipped", todos.len() - valid.len()));
        }
        report.todos = Some(valid);
    }
}

/// Lenient date parsing for `createdAt` stamps: RFC 3339 first, then a few
/// naive datetime/date layouts that older exports produced.
pub(crate) fn parse_date(stamp: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(stamp) {
        return Some(parsed.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(stamp, layout) {
            return Some(parsed.and_utc());
        }
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(stamp, "%Y-%m-%d") {
        return Some(parsed.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

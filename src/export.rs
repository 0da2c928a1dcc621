use chrono::{Local, Utc};

use crate::models::{
    ExportEnvelope, ExportFormat, ExportMetadata, ExportOptions, StoreRecord, Task, APP_NAME,
    APP_VERSION,
};
use crate::store::TodoStore;
use crate::validate::parse_date;

impl TodoStore {
    /// Serializes the current record to the requested format. Infallible:
    /// the record shapes always serialize, and the options carry defaults.
    pub fn export_data(&self, options: ExportOptions) -> String {
        export_record(&self.read(), options)
    }
}

/// Format a stored timestamp for human-facing export output; falls back to
/// the raw string when it does not parse.
fn format_local(stamp: &str) -> String {
    match parse_date(stamp) {
        Some(parsed) => parsed
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => stamp.to_string(),
    }
}

pub fn export_record(record: &StoreRecord, options: ExportOptions) -> String {
    let todos: Vec<&Task> = record
        .todos
        .iter()
        .filter(|todo| options.include_completed || !todo.completed)
        .collect();

    match options.format {
        ExportFormat::Json => export_as_json(record, &todos, &options),
        ExportFormat::Csv => export_as_csv(&todos, &options),
        ExportFormat::Txt => export_as_text(&todos, &options),
    }
}

fn export_as_json(record: &StoreRecord, todos: &[&Task], options: &ExportOptions) -> String {
    let data = StoreRecord {
        version: record.version.clone(),
        todos: todos.iter().map(|todo| (*todo).clone()).collect(),
        last_modified: record.last_modified.clone(),
    };

    if options.include_metadata {
        let envelope = ExportEnvelope {
            metadata: ExportMetadata {
                app_name: APP_NAME.to_string(),
                app_version: APP_VERSION.to_string(),
                export_version: record.version.clone(),
                exported_at: Utc::now().to_rfc3339(),
                total_todos: data.todos.len(),
                completed_todos: data.todos.iter().filter(|t| t.completed).count(),
                user_agent: None,
            },
            data,
        };
        if options.pretty_print {
            serde_json::to_string_pretty(&envelope).unwrap_or_default()
        } else {
            serde_json::to_string(&envelope).unwrap_or_default()
        }
    } else if options.pretty_print {
        serde_json::to_string_pretty(&data).unwrap_or_default()
    } else {
        serde_json::to_string(&data).unwrap_or_default()
    }
}

/// Minimal CSV escaping: wrap in quotes and double any existing quotes.
fn csv_escape(value: &str) -> String {
    let escaped = value.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

fn export_as_csv(todos: &[&Task], options: &ExportOptions) -> String {
    let mut headers = vec!["ID", "Text", "Completed"];
    if options.include_created_date {
        headers.push("Created At");
    }

    let mut rows = vec![headers.join(",")];
    for todo in todos {
        let mut row = vec![
            csv_escape(&todo.id),
            csv_escape(&todo.text),
            if todo.completed { "true" } else { "false" }.to_string(),
        ];
        if options.include_created_date {
            row.push(csv_escape(&todo.created_at));
        }
        rows.push(row.join(","));
    }

    rows.join("\n")
}

fn export_as_text(todos: &[&Task], options: &ExportOptions) -> String {
    let mut lines: Vec<String> = Vec::new();

    if options.include_metadata {
        lines.push(format!("# {APP_NAME} Export"));
        lines.push(format!(
            "Exported: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));
        lines.push(format!("Total todos: {}", todos.len()));
        lines.push(String::new());
    }

    for (index, todo) in todos.iter().enumerate() {
        let status = if todo.completed { '✓' } else { '○' };
        lines.push(format!("{}. {status} {}", index + 1, todo.text));
        if options.include_created_date {
            lines.push(format!("   Created: {}", format_local(&todo.created_at)));
        }
        lines.push(String::new());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STORAGE_VERSION;

    fn make_task(id: &str, text: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            text: text.to_string(),
            completed,
            created_at: "2025-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn make_record(todos: Vec<Task>) -> StoreRecord {
        StoreRecord {
            version: STORAGE_VERSION.to_string(),
            todos,
            last_modified: "2025-06-01T12:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn json_export_with_metadata_wraps_in_envelope() {
        let record = make_record(vec![
            make_task("a", "one", false),
            make_task("b", "two", true),
            make_task("c", "three", false),
        ]);
        let out = export_record(&record, ExportOptions::default());
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["metadata"]["appName"], APP_NAME);
        assert_eq!(parsed["metadata"]["totalTodos"], 3);
        assert_eq!(parsed["metadata"]["completedTodos"], 1);
        assert_eq!(parsed["data"]["todos"].as_array().unwrap().len(), 3);
        assert_eq!(parsed["data"]["version"], STORAGE_VERSION);
    }

    #[test]
    fn json_export_without_metadata_is_the_bare_record() {
        let record = make_record(vec![make_task("a", "one", false)]);
        let out = export_record(
            &record,
            ExportOptions {
                include_metadata: false,
                ..Default::default()
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert!(parsed.get("metadata").is_none());
        assert_eq!(parsed["version"], STORAGE_VERSION);
        assert_eq!(parsed["lastModified"], "2025-06-01T12:00:00.000Z");
    }

    #[test]
    fn compact_json_has_no_newlines_or_double_spaces() {
        let record = make_record(vec![make_task("a", "one", false)]);
        let out = export_record(
            &record,
            ExportOptions {
                pretty_print: false,
                ..Default::default()
            },
        );
        assert!(!out.contains('\n'));
        assert!(!out.contains("  "));
    }

    #[test]
    fn excluding_completed_filters_tasks_and_counts() {
        let record = make_record(vec![
            make_task("a", "one", false),
            make_task("b", "two", true),
        ]);
        let out = export_record(
            &record,
            ExportOptions {
                include_completed: false,
                ..Default::default()
            },
        );
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["metadata"]["totalTodos"], 1);
        assert_eq!(parsed["metadata"]["completedTodos"], 0);
        let todos = parsed["data"]["todos"].as_array().unwrap();
        assert!(todos.iter().all(|t| t["completed"] == false));
    }

    #[test]
    fn bare_json_export_round_trips_through_the_validator() {
        let record = make_record(vec![
            make_task("a", "one", false),
            make_task("b", "two", true),
        ]);
        let out = export_record(
            &record,
            ExportOptions {
                include_metadata: false,
                ..Default::default()
            },
        );
        let report = crate::validate::validate_import_data(&out);
        assert!(report.is_valid, "errors: {:?}", report.errors);
        assert_eq!(report.todos.expect("todos present"), record.todos);
    }

    #[test]
    fn csv_export_escapes_quotes_and_keeps_field_count() {
        let record = make_record(vec![make_task(
            "a",
            "Todo with \"quotes\" and,commas",
            false,
        )]);
        let out = export_record(
            &record,
            ExportOptions {
                format: ExportFormat::Csv,
                ..Default::default()
            },
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "ID,Text,Completed,Created At");
        assert!(lines[1].contains("\"Todo with \"\"quotes\"\" and,commas\""));

        // The embedded comma sits inside quotes; counting unquoted commas
        // must still yield the header's field count.
        let mut in_quotes = false;
        let mut fields = 1;
        for ch in lines[1].chars() {
            match ch {
                '"' => in_quotes = !in_quotes,
                ',' if !in_quotes => fields += 1,
                _ => {}
            }
        }
        assert_eq!(fields, 4);
    }

    #[test]
    fn csv_export_has_no_trailing_newline_and_honors_created_date_option() {
        let record = make_record(vec![make_task("a", "one", true)]);
        let out = export_record(
            &record,
            ExportOptions {
                format: ExportFormat::Csv,
                include_created_date: false,
                ..Default::default()
            },
        );
        assert_eq!(out, "ID,Text,Completed\n\"a\",\"one\",true");
    }

    #[test]
    fn text_export_numbers_tasks_and_marks_status() {
        let record = make_record(vec![
            make_task("a", "open task", false),
            make_task("b", "done task", true),
        ]);
        let out = export_record(
            &record,
            ExportOptions {
                format: ExportFormat::Txt,
                include_created_date: false,
                ..Default::default()
            },
        );
        assert!(out.starts_with(&format!("# {APP_NAME} Export\n")));
        assert!(out.contains("Total todos: 2"));
        assert!(out.contains("1. ○ open task"));
        assert!(out.contains("2. ✓ done task"));
    }

    #[test]
    fn text_export_without_metadata_skips_the_header_block() {
        let record = make_record(vec![make_task("a", "only", false)]);
        let out = export_record(
            &record,
            ExportOptions {
                format: ExportFormat::Txt,
                include_metadata: false,
                ..Default::default()
            },
        );
        assert!(out.starts_with("1. ○ only"));
        assert!(out.contains("   Created: "));
    }
}

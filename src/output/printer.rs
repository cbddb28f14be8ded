use super::model::ResultRecord;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, Table};

/// 把记录渲染为表格
pub fn history_table(records: &[ResultRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "Run", "Time", "Collection", "Request", "#", "Method", "URL", "Status", "Duration",
    ]);

    for record in records {
        let status_color = if record.passed {
            Color::Green
        } else {
            Color::Red
        };
        let status = match (record.status, &record.error) {
            (Some(code), _) => code.to_string(),
            (None, Some(error)) => error.clone(),
            (None, None) => "-".to_string(),
        };

        table.add_row(vec![
            Cell::new(record.run_id.chars().take(8).collect::<String>()),
            Cell::new(record.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&record.collection),
            Cell::new(&record.request),
            Cell::new(record.attempt),
            Cell::new(&record.method),
            Cell::new(&record.url).add_attribute(Attribute::Dim),
            Cell::new(status).fg(status_color),
            Cell::new(
                record
                    .duration_ms
                    .map_or_else(|| "-".to_string(), |ms| format!("{}ms", ms)),
            ),
        ]);
    }

    table
}

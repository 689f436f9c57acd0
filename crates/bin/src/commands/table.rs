//! Table command - shows records as one sorted, filtered list.

use serde_json::Value;
use viewsync::{
    Table,
    view::{SortBy, SortOrder, SortedView, TextFilter},
};

use crate::{
    cli::TableArgs,
    config::ViewConfig,
    output::{OutputFormat, cell, print_table},
    records::{self, IdField, JsonRecord, by_field},
};

pub type RecordTable = Table<JsonRecord, SortedView<JsonRecord, TextFilter>>;

/// Run the table command
pub fn run(
    args: &TableArgs,
    config: ViewConfig,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.merge(ViewConfig::from(args));
    let records = records::load(&args.file, IdField::KeyOrPath)?;
    let total = records.len();
    let table = build(records, &config)?;

    match format {
        OutputFormat::Human => {
            let (headers, rows) = columns(&table)?;
            let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
            print_table(&headers, &rows);
            println!();
            println!("{} of {} records", table.row_count(), total);
        }
        OutputFormat::Json => {
            let rows = table
                .rows()?
                .into_iter()
                .map(|record| Value::Object(record.fields().clone()))
                .collect();
            println!("{}", serde_json::to_string_pretty(&Value::Array(rows))?);
        }
    }
    Ok(())
}

/// Builds the table described by `config` over `records`.
pub fn build(records: Vec<JsonRecord>, config: &ViewConfig) -> viewsync::Result<RecordTable> {
    let mut view = SortedView::new(TextFilter::default());
    match (&config.sort_field, config.order()) {
        (Some(field), order) => view = view.with_sort(by_field(field, order)),
        (None, SortOrder::Descending) => {
            let by_key = SortBy::new(|a: &JsonRecord, b: &JsonRecord| a.id().cmp(b.id()));
            view = view.with_sort(by_key.descending());
        }
        (None, SortOrder::Ascending) => {}
    }

    let mut table = Table::with_view(view)?;
    table.assign(records)?;
    if let Some(filter) = &config.filter {
        table.filter_by(filter.clone())?;
    }
    tracing::debug!(rows = table.row_count(), "Built table");
    Ok(table)
}

/// Header row and cells: the key, then every field in first-seen order.
pub fn columns(table: &RecordTable) -> viewsync::Result<(Vec<String>, Vec<Vec<String>>)> {
    let rows = table.rows()?;
    let mut headers = vec!["key".to_string()];
    for record in &rows {
        for name in record.fields().keys() {
            if name != "key" && !headers.contains(name) {
                headers.push(name.clone());
            }
        }
    }
    let cells = rows
        .iter()
        .map(|record| {
            let mut line = vec![record.id().to_string()];
            line.extend(headers[1..].iter().map(|name| cell(record.field(name))));
            line
        })
        .collect();
    Ok((headers, cells))
}

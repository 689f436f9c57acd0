//! Tree command - shows records as pages built from their paths.

use std::cmp::Ordering;

use serde_json::{Map, Value, json};
use viewsync::{
    Tree,
    tagged::Tagged,
    tree::{Node, SumBy, TreeNode, TreePage},
    view::{SortBy, TextFilter},
};

use crate::{
    cli::TreeArgs,
    config::ViewConfig,
    output::{OutputFormat, cell, number},
    records::{self, IdField, JsonRecord, compare_values},
};

/// Per-page aggregate: the sum of a numeric field, or a leaf count.
pub type Sum = SumBy<Box<dyn Fn(&JsonRecord) -> f64>, f64>;

pub type RecordTree = Tree<JsonRecord, TextFilter, Sum>;

type RecordNode = TreeNode<JsonRecord, Sum>;

type RecordPage = TreePage<JsonRecord, Sum>;

/// Run the tree command
pub fn run(
    args: &TreeArgs,
    config: ViewConfig,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config.merge(ViewConfig::from(args));
    let records = records::load(&args.file, IdField::Path)?;
    let tree = build(records, &config)?;

    match format {
        OutputFormat::Human => {
            for line in render(&tree, &config) {
                println!("{line}");
            }
        }
        OutputFormat::Json => {
            let value = page_json(tree.root(), &config);
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

fn summation(config: &ViewConfig) -> Sum {
    let field: Box<dyn Fn(&JsonRecord) -> f64> = match config.sum_field.clone() {
        Some(field) => Box::new(move |record: &JsonRecord| record.number(&field)),
        None => Box::new(|_: &JsonRecord| 1.0),
    };
    SumBy::new(field)
}

/// Value a node is sorted by: the field for leaves; for pages, the
/// aggregate when sorting by the summed field, the name otherwise.
fn sort_value(node: &RecordNode, field: &str, config: &ViewConfig) -> Option<Value> {
    match node.body() {
        Tagged::Leaf(record) => record.field(field).cloned(),
        Tagged::Page(page) if config.sum_field.as_deref() == Some(field) => {
            Some(json!(*page.aggregate()))
        }
        Tagged::Page(page) => Some(Value::String(page.name().to_string())),
    }
}

fn node_order(config: &ViewConfig) -> SortBy<RecordNode> {
    let order = config.order();
    let Some(field) = config.sort_field.clone() else {
        return Node::by_key().with_order(order);
    };
    let config = config.clone();
    SortBy::new(move |a: &RecordNode, b: &RecordNode| {
        let ordering: Ordering = compare_values(
            sort_value(a, &field, &config).as_ref(),
            sort_value(b, &field, &config).as_ref(),
        );
        ordering.then_with(|| a.name().cmp(b.name()))
    })
    .with_order(order)
}

/// Builds the tree described by `config` over `records`.
pub fn build(records: Vec<JsonRecord>, config: &ViewConfig) -> viewsync::Result<RecordTree> {
    let mut tree = Tree::with_parts(TextFilter::default(), summation(config))
        .with_sort(node_order(config))?;
    tree.rebuild(records)?;
    if let Some(filter) = &config.filter {
        tree.filter_by(filter.clone())?;
    }
    tracing::debug!(leaves = tree.leaf_count(), "Built tree");
    Ok(tree)
}

/// Indented listing: pages end in `/` and show their aggregate.
pub fn render(tree: &RecordTree, config: &ViewConfig) -> Vec<String> {
    let label = config.sum_field.as_deref().unwrap_or("leaves");
    let mut lines = vec![format!("{label}: {}", number(*tree.root().aggregate()))];
    render_page(tree.root(), 1, config, &mut lines);
    lines
}

fn render_page(page: &RecordPage, depth: usize, config: &ViewConfig, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    for node in page.children() {
        match node.body() {
            Tagged::Page(child) => {
                lines.push(format!(
                    "{indent}{}/  [{}]",
                    child.name(),
                    number(*child.aggregate())
                ));
                render_page(child, depth + 1, config, lines);
            }
            Tagged::Leaf(record) => match config.sum_field.as_deref() {
                Some(field) => lines.push(format!(
                    "{indent}{}  {}",
                    node.name(),
                    cell(record.field(field))
                )),
                None => lines.push(format!("{indent}{}", node.name())),
            },
        }
    }
}

fn page_json(page: &RecordPage, config: &ViewConfig) -> Value {
    let children: Vec<Value> = page
        .children()
        .map(|node| match node.body() {
            Tagged::Page(child) => page_json(child, config),
            Tagged::Leaf(record) => json!({
                "name": node.name(),
                "record": Value::Object(record.fields().clone()),
            }),
        })
        .collect();
    let mut object = Map::new();
    object.insert("name".to_string(), json!(page.name()));
    object.insert("path".to_string(), json!(page.path()));
    object.insert("aggregate".to_string(), json!(*page.aggregate()));
    object.insert("children".to_string(), Value::Array(children));
    Value::Object(object)
}

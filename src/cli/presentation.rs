//! CLI presentation: text and json formatters per command family.

use crate::error::{ApiError, StorageError};
use crate::navigation::NavigationState;
use crate::relocation::RelocationReport;
use crate::staging::StagedEntry;
use crate::types::{LogEntry, Node};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StorageError(StorageError::Serialization(e.to_string())))
}

/// "3 inside" for containers, "x2" for items.
fn contents_cell(node: &Node) -> String {
    match node.quantity {
        Some(qty) if node.is_item() => format!("x{}", qty),
        _ => format!("{} inside", node.child_count),
    }
}

fn node_table(nodes: &[Node]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Kind", "Contents", "Id"]);
    for node in nodes {
        table.add_row(vec![
            node.name.clone(),
            node.kind.to_string(),
            contents_cell(node),
            node.id.to_string(),
        ]);
    }
    table
}

pub fn format_houses(houses: &[Node], format: &str) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(&json!({ "houses": houses, "total": houses.len() }));
    }
    let mut out = format!("{}\n\n", format_section_heading("Houses"));
    if houses.is_empty() {
        out.push_str("No houses found.\n");
        return Ok(out);
    }
    out.push_str(&format!("{}\n", node_table(houses)));
    out.push_str(&format!("\nTotal: {} house(s)\n", houses.len()));
    Ok(out)
}

/// Current position: breadcrumb plus the children view.
pub fn format_listing(state: &NavigationState, format: &str) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(&json!({
            "house": state.house(),
            "path": state.path(),
            "path_names": state.path_names(),
            "children": state.children(),
            "selected": state.selected(),
        }));
    }
    let mut out = format!("{}\n\n", format_section_heading(&state.breadcrumb()));
    if state.children().is_empty() {
        out.push_str("(empty)\n");
    } else {
        out.push_str(&format!("{}\n", node_table(state.children())));
    }
    if let Some(selected) = state.selected().filter(|n| n.is_item()) {
        out.push_str(&format!("\nSelected: {} ({})\n", selected.name, selected.id));
    }
    Ok(out)
}

pub fn format_detail(state: &NavigationState, format: &str) -> Result<String, ApiError> {
    let Some(detail) = state.detail() else {
        return Ok("Nothing selected.".to_string());
    };
    if format == "json" {
        return to_json(&json!({
            "node": detail.node,
            "location": state.breadcrumb(),
            "child_preview": detail.child_preview,
            "authoritative": detail.authoritative,
        }));
    }
    let node = &detail.node;
    let mut out = format!("{}\n\n", format_section_heading(&node.name));
    out.push_str(&format!("  Kind: {}\n", node.kind));
    out.push_str(&format!("  Id: {}\n", node.id));
    out.push_str(&format!("  Location: {}\n", state.breadcrumb()));
    if node.is_item() {
        out.push_str(&format!("  Quantity: {}\n", node.quantity.unwrap_or(1)));
        if let Some(owner) = &node.owner_id {
            out.push_str(&format!("  Owner: {}\n", owner));
        }
        if let Some(memo) = &node.memo {
            out.push_str(&format!("  Memo: {}\n", memo));
        }
    } else {
        out.push_str(&format!("  Contents: {}\n", node.child_count));
        if !detail.child_preview.is_empty() {
            out.push_str(&format!("\n{}\n", node_table(&detail.child_preview)));
        }
    }
    Ok(out)
}

pub fn format_search_results(query: &str, nodes: &[Node], format: &str) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(&json!({ "query": query, "results": nodes, "total": nodes.len() }));
    }
    if nodes.is_empty() {
        return Ok(format!("No matches for '{}'.", query));
    }
    Ok(format!(
        "{}\n\n{}\n\n{} match(es)\n",
        format_section_heading(&format!("Results for '{}'", query)),
        node_table(nodes),
        nodes.len()
    ))
}

pub fn format_activity(entries: &[LogEntry], format: &str) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(&json!({ "activity": entries, "total": entries.len() }));
    }
    let mut out = format!("{}\n\n", format_section_heading("Recent activity"));
    if entries.is_empty() {
        out.push_str("No recent activity.\n");
        return Ok(out);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["When", "Node", "Action", "By"]);
    for entry in entries {
        table.add_row(vec![
            entry.occurred_at.format("%Y-%m-%d %H:%M").to_string(),
            entry.node_name.clone(),
            entry.action.clone(),
            entry.actor.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    Ok(out)
}

pub fn format_staging(entries: &[StagedEntry], format: &str) -> Result<String, ApiError> {
    if format == "json" {
        return to_json(&json!({ "staged": entries, "total": entries.len() }));
    }
    let mut out = format!("{}\n\n", format_section_heading("Staged"));
    if entries.is_empty() {
        out.push_str("Staging buffer is empty.\n");
        return Ok(out);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Name", "Kind", "From", "Staged at"]);
    for (i, entry) in entries.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            entry.node.name.clone(),
            entry.node.kind.to_string(),
            entry.origin_path_label.clone(),
            entry.staged_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    Ok(out)
}

pub fn format_relocation_report(report: &RelocationReport) -> String {
    let mut out = if report.failed.is_empty() {
        format!("{}\n", report.summary().green())
    } else {
        format!("{}\n", report.summary().yellow())
    };
    if !report.failed.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_BORDERS_ONLY);
        table.set_header(vec!["Name", "From", "Reason"]);
        for failure in &report.failed {
            table.add_row(vec![
                failure.entry.node.name.clone(),
                failure.entry.origin_path_label.clone(),
                failure.reason.clone(),
            ]);
        }
        out.push_str(&format!("\n{}\n", table));
        out.push_str("Failed entries remain staged.\n");
    }
    out
}

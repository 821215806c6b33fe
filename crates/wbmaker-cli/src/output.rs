//! Plain-text rendering of query results and hierarchy paths.

use colored::Colorize;
use std::collections::{BTreeMap, HashMap};
use wbmaker::item::PropertyInfo;
use wbmaker::sparql::SparqlTable;
use wbmaker_hierarchy::{PathAnalysis, PathStep};

/// Tab-separated rows under a header of the result variables.
pub fn table_tsv(table: &SparqlTable) -> String {
    let mut out = table.vars.join("\t");
    for row in &table.rows {
        out.push('\n');
        let cells: Vec<&str> = table
            .vars
            .iter()
            .map(|var| row.get(var).and_then(|v| v.as_deref()).unwrap_or(""))
            .collect();
        out.push_str(&cells.join("\t"));
    }
    out
}

/// `pid  label  datatype`, ordered by property number.
pub fn property_lines(props: &HashMap<String, PropertyInfo>) -> Vec<String> {
    let mut rows: Vec<(&String, &PropertyInfo)> = props.iter().collect();
    rows.sort_by_key(|(label, info)| (pid_number(&info.pid), info.pid.clone(), (*label).clone()));
    rows.into_iter()
        .map(|(label, info)| format!("{}\t{}\t{}", info.pid, label, info.datatype))
        .collect()
}

fn pid_number(pid: &str) -> u64 {
    pid.trim_start_matches('P').parse().unwrap_or(u64::MAX)
}

pub fn sorted_lookup(lookup: HashMap<String, String>) -> BTreeMap<String, String> {
    lookup.into_iter().collect()
}

fn step_line(index: usize, step: &PathStep) -> String {
    let label = step.external_label.as_deref().unwrap_or("-");
    let mut line = format!("{:>3}. {}  {}", index + 1, step.external_entity, label.bold());
    if let Some(local) = &step.local_entity {
        line.push_str(&format!("  → {}", local.green()));
    }
    line
}

pub fn path_report(analysis: &PathAnalysis) -> String {
    let mut lines = vec![format!(
        "{} ({} steps)",
        "shortest path".cyan().bold(),
        analysis.shortest_path.len()
    )];
    lines.extend(
        analysis
            .shortest_path
            .iter()
            .enumerate()
            .map(|(i, s)| step_line(i, s)),
    );
    if analysis.has_alternate() {
        lines.push(format!(
            "{} ({} steps, {} local links)",
            "alternate path".cyan().bold(),
            analysis.alternate_path.len(),
            analysis.alternate_links()
        ));
        lines.extend(
            analysis
                .alternate_path
                .iter()
                .enumerate()
                .map(|(i, s)| step_line(i, s)),
        );
    }
    lines.join("\n")
}

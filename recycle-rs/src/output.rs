//! Plain-text rendering of engine results.

use std::fmt::Write;

use recycle_core::{
    print_size,
    ConsistencyReport,
    DeleteOutcome,
    DeleteReport,
    Listing,
    Preview,
    PurgeSummary,
    SearchMiss,
    Statistics,
    SweepReport,
    TrashRecord,
};

const NAME_WIDTH: usize = 32;

fn clip(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let kept: String = value.chars().take(width.saturating_sub(3)).collect();
    format!("{kept}...")
}

pub fn table(records: &[TrashRecord]) -> String {
    let id_width = records.iter().map(|r| r.id.len()).max().unwrap_or(2).max(2);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<id_width$}  {:<NAME_WIDTH$}  {:<19}  {:>9}  TYPE",
        "ID", "NAME", "DELETED", "SIZE"
    );
    for record in records {
        let _ = writeln!(
            out,
            "{:<id_width$}  {:<NAME_WIDTH$}  {:<19}  {:>9}  {}",
            record.id,
            clip(&record.original_name, NAME_WIDTH),
            record.deleted_at,
            print_size(record.size_bytes),
            record.kind
        );
    }
    out
}

pub fn detailed(records: &[TrashRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(out, "ID:          {}", record.id);
        let _ = writeln!(out, "Name:        {}", record.original_name);
        let _ = writeln!(out, "Location:    {}", record.original_dir);
        let _ = writeln!(out, "Deleted:     {}", record.deleted_at);
        let _ = writeln!(out, "Size:        {} ({} bytes)", print_size(record.size_bytes), record.size_bytes);
        let _ = writeln!(out, "Type:        {}", record.kind);
        let _ = writeln!(out, "Permissions: {:o}", record.mode);
        let _ = writeln!(out, "Owner:       {}", record.owner);
        out.push('\n');
    }
    out
}

pub fn records(records: &[TrashRecord], full: bool) -> String {
    if full {
        detailed(records)
    } else {
        table(records)
    }
}

pub fn listing(listing: &Listing, full: bool) -> String {
    let mut out = records(&listing.records, full);
    let _ = writeln!(
        out,
        "Total: {} item(s), {}",
        listing.total_count,
        print_size(listing.total_bytes)
    );
    out
}

pub fn delete_report(report: &DeleteReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        match outcome {
            DeleteOutcome::Trashed(record) => {
                let _ = writeln!(out, "Moved {} to the recycle bin (id {})", record.original_name, record.id);
            }
            DeleteOutcome::Skipped { path, reason } => {
                let _ = writeln!(out, "Skipped {}: {}", path.display(), reason);
            }
        }
    }
    out
}

/// Numbered menu used when a restore pattern matches several items.
pub fn choices(records: &[TrashRecord]) -> String {
    let mut out = String::new();
    for (index, record) in records.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}) {}  {}  {}",
            index + 1,
            record.id,
            record.original_path().display(),
            record.deleted_at
        );
    }
    out
}

pub fn search_miss(miss: SearchMiss) -> &'static str {
    match miss {
        SearchMiss::Name => "No items match that name.",
        SearchMiss::DateRange => "No items were deleted in that date range.",
        SearchMiss::Both => "Neither the name nor the date range matches any item.",
        SearchMiss::Combination => "Items match the name and items match the date range, but none match both.",
    }
}

pub fn purge_summary(summary: &PurgeSummary) -> String {
    let mut out = format!(
        "Permanently deleted {} item(s), freed {}\n",
        summary.count,
        print_size(summary.bytes_freed)
    );
    for id in &summary.missing_payloads {
        let _ = writeln!(out, "Note: payload for {id} was already gone; record removed");
    }
    out
}

pub fn sweep(report: &SweepReport) -> String {
    let mut out = String::new();
    if report.candidates.is_empty() {
        let _ = writeln!(out, "Nothing older than {} to clean up.", report.cutoff);
        return out;
    }
    match &report.summary {
        None => {
            let _ = writeln!(
                out,
                "Would delete {} item(s) deleted on or before {}:",
                report.candidates.len(),
                report.cutoff
            );
            out.push_str(&table(&report.candidates));
        }
        Some(summary) => out.push_str(&purge_summary(summary)),
    }
    out
}

pub fn preview(preview: &Preview) -> String {
    match preview {
        Preview::Directory { location } => format!("Directory, stored at {}\n", location.display()),
        Preview::Binary { description, size } => format!("{description}, {}\n", print_size(*size)),
        Preview::Text { lines, truncated } => {
            let mut out = lines.join("\n");
            out.push('\n');
            if *truncated {
                out.push_str("...\n");
            }
            out
        }
    }
}

pub fn statistics(stats: &Statistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Items:        {}", stats.total_items);
    let _ = writeln!(out, "Total size:   {}", print_size(stats.total_bytes));
    let _ = writeln!(
        out,
        "Quota:        {} ({}% used)",
        print_size(stats.quota_bytes),
        stats.quota_percent
    );
    let _ = writeln!(out, "Files:        {}", stats.files);
    let _ = writeln!(out, "Directories:  {}", stats.directories);
    if let Some(newest) = &stats.newest {
        let _ = writeln!(out, "Newest:       {} ({})", newest.original_name, newest.deleted_at);
    }
    if let Some(oldest) = &stats.oldest {
        let _ = writeln!(out, "Oldest:       {} ({})", oldest.original_name, oldest.deleted_at);
    }
    if let Some(average) = stats.average_file_size {
        let _ = writeln!(out, "Average file: {}", print_size(average));
    }
    out
}

pub fn consistency(report: &ConsistencyReport) -> String {
    if report.is_clean() {
        return "Store and repository are consistent.\n".to_string();
    }
    let mut out = String::new();
    for id in &report.orphans {
        let _ = writeln!(out, "orphan payload without record: {id}");
    }
    for id in &report.dangling {
        let _ = writeln!(out, "record without payload: {id}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use recycle_core::ItemKind;

    fn record(name: &str, size: u64) -> TrashRecord {
        TrashRecord {
            id: "1700000000_abcdefghijkl".into(),
            original_name: name.into(),
            original_dir: "/home/u".into(),
            deleted_at: "2025-10-05 12:00:00".into(),
            size_bytes: size,
            kind: ItemKind::File,
            mode: 0o644,
            owner: "u:u".into(),
        }
    }

    #[test]
    fn test_table_has_header_and_rows() {
        let text = table(&[record("a.txt", 10), record("b.txt", 2048)]);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ID"));
        assert!(lines[2].contains("2.0 K"));
    }

    #[test]
    fn test_detailed_shows_every_field() {
        let text = detailed(&[record("a.txt", 10)]);
        assert!(text.contains("/home/u"));
        assert!(text.contains("Permissions: 644"));
        assert!(text.contains("Owner:       u:u"));
    }

    #[test]
    fn test_clip_long_names() {
        let long = "x".repeat(40);
        assert_eq!(clip(&long, 10), "xxxxxxx...");
        assert_eq!(clip("short", 10), "short");
    }

    #[test]
    fn test_preview_marks_truncation() {
        let text = preview(&Preview::Text {
            lines: vec!["one".into(), "two".into()],
            truncated: true,
        });
        assert_eq!(text, "one\ntwo\n...\n");
    }
}

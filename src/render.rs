//! cloc-style terminal rendering of the finished report.

use colored::Colorize;
use commit_stats_engine::model::{Report, RunSummary, StatBucket};

use crate::lang;

const RULE: usize = 100;

/// Prints per-developer tables: one row per language plus a SUM row, and an
/// optional per-repository breakdown when the report carries it.
pub fn print_report(report: &Report) {
    for (dev, stats) in &report.developers {
        println!("\n{}", "=".repeat(RULE));
        println!("Developer: {}", dev.bold());
        println!("{}", "=".repeat(RULE));
        print_table_header();

        for (ext, bucket) in &stats.by_file_type {
            print_row(lang::display_name(ext), bucket);
        }
        print_table_rule();
        print_row("SUM", &stats.total);

        if let Some(by_repo) = &stats.by_repository {
            println!("\n{}", "-".repeat(RULE));
            println!("    By Repository:");
            println!("    {}", "-".repeat(RULE - 4));
            for (repo, ext_stats) in by_repo {
                println!("\n    Repository: {}", repo.cyan());
                print!("    ");
                print_table_header();
                for (ext, bucket) in ext_stats {
                    print!("    ");
                    print_row(lang::display_name(ext), bucket);
                }
            }
        }
    }
}

/// Prints the soft-failure summary collected alongside the report.
pub fn print_summary(summary: &RunSummary) {
    if summary.dropped_repositories.is_empty() && summary.failed_units.is_empty() {
        return;
    }

    println!("\n{}", "-".repeat(RULE));
    if !summary.dropped_repositories.is_empty() {
        println!(
            "{} repositories skipped during probing:",
            summary.dropped_repositories.len().to_string().yellow()
        );
        for d in &summary.dropped_repositories {
            println!("  {} - {}", d.repo, d.reason);
        }
    }
    if !summary.failed_units.is_empty() {
        println!(
            "{} fetch units abandoned (results may be incomplete):",
            summary.failed_units.len().to_string().yellow()
        );
        for f in &summary.failed_units {
            println!("  {} - {}", f.unit, f.reason);
        }
    }
}

fn print_table_header() {
    println!(
        "{:<20} {:<15} {:<10} {:<10} {:<10} {:<10} {:<10} {:<15}",
        "Language", "Modifications", "Added", "Removed", "Renamed", "Line Adds", "Line Dels", "Line Changes"
    );
    print_table_rule();
}

fn print_table_rule() {
    println!(
        "{} {} {} {} {} {} {} {}",
        "-".repeat(20),
        "-".repeat(15),
        "-".repeat(10),
        "-".repeat(10),
        "-".repeat(10),
        "-".repeat(10),
        "-".repeat(10),
        "-".repeat(15)
    );
}

fn print_row(label: &str, b: &StatBucket) {
    println!(
        "{:<20} {:<15} {:<10} {:<10} {:<10} {:<10} {:<10} {:<15}",
        label, b.modifications, b.added, b.removed, b.renamed, b.additions, b.deletions, b.changes
    );
}

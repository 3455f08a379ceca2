//! Human-readable rendering of checker output.

use codetable_engine::{BatchDiff, ConflictCheck, SuggestionAction};
use codetable_model::{DependencyEdge, PendingOperation};
use colored::Colorize;

pub(crate) fn render_checks(operations: &[PendingOperation], checks: &[ConflictCheck]) {
    for (index, (op, check)) in operations.iter().zip(checks).enumerate() {
        let verdict = if check.has_conflict {
            "冲突".red().bold()
        } else if check.is_resolved() {
            "已解决".cyan()
        } else if check.impact.is_some() {
            "重码".yellow()
        } else {
            "通过".green()
        };

        let weight = check
            .calculated_weight
            .map(|w| format!(" w={w}"))
            .unwrap_or_default();
        println!(
            "{:>3}. [{}] {} {} @{}{weight}",
            index + 1,
            verdict,
            op.action().label(),
            op.word(),
            op.code(),
        );

        if let Some(impact) = &check.impact {
            println!("       {impact}");
        }
        for suggestion in &check.suggestions {
            let tag = match suggestion.action {
                SuggestionAction::Move => "移码",
                SuggestionAction::Adjust => "改码",
                SuggestionAction::Resolved => "已解决",
                SuggestionAction::Cancel => "取消",
            };
            match &suggestion.to_code {
                Some(to_code) => println!(
                    "       {} {} -> {}: {}",
                    tag.dimmed(),
                    suggestion.word,
                    to_code,
                    suggestion.reason
                ),
                None => println!("       {} {}: {}", tag.dimmed(), suggestion.word, suggestion.reason),
            }
        }
    }
}

pub(crate) fn render_dependencies(edges: &[DependencyEdge]) {
    println!("\n{}", "依赖关系".bold());
    for edge in edges {
        println!(
            "  #{} -> #{}: {}",
            edge.dependent + 1,
            edge.depends_on + 1,
            edge.reason
        );
    }
}

pub(crate) fn render_diff(diff: &BatchDiff) {
    for group in &diff.groups {
        println!("{}", group.code.as_str().bold());
        for entry in &group.added {
            println!("  {} {} w={}", "+".green(), entry.word, entry.weight);
        }
        for entry in &group.removed {
            println!("  {} {} w={}", "-".red(), entry.word, entry.weight);
        }
        for modified in &group.modified {
            println!(
                "  {} {} w={} -> {} w={}",
                "~".yellow(),
                modified.before.word,
                modified.before.weight,
                modified.after.word,
                modified.after.weight
            );
        }
    }
    if !diff.rejected.is_empty() {
        println!("{}", "被拒绝的操作".red().bold());
        for rejected in &diff.rejected {
            println!(
                "  #{} {} {} @{}: {}",
                rejected.index + 1,
                rejected.operation.action().label(),
                rejected.operation.word(),
                rejected.operation.code(),
                rejected.impact
            );
        }
    }
    if diff.groups.is_empty() && diff.rejected.is_empty() {
        println!("(no changes)");
    }
}

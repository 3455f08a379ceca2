//! Dependency edges for in-batch-resolved conflicts.

use crate::ConflictCheck;
use codetable_model::{DependencyEdge, PendingOperation};

/// One edge per check the classifier downgraded via forward resolution: the
/// neutralizing operation must precede the operation it unblocks. Edges are
/// recorded on the batch for display; the commit step still applies in array
/// order, so a batch ordered against its edges will simply fail to apply.
pub fn build_dependencies(
    operations: &[PendingOperation],
    checks: &[ConflictCheck],
) -> Vec<DependencyEdge> {
    checks
        .iter()
        .enumerate()
        .filter_map(|(index, check)| {
            check.resolved_by.map(|resolver_op| DependencyEdge {
                dependent: index,
                depends_on: resolver_op,
                reason: format!(
                    "操作 {} 依赖操作 {}（{}「{}」）",
                    index + 1,
                    resolver_op + 1,
                    operations[resolver_op].action().label(),
                    operations[resolver_op].word(),
                ),
            })
        })
        .collect()
}

//! Cost-based access-path chooser (§4.8). Given a predicate set over a
//! collection and optionally an `OrderBy` expression, picks the cheapest
//! single index to drive the scan, or falls back to a primary-key full
//! scan when nothing fits. This module only produces the plan descriptor;
//! walking it into actual documents is the external query-execution
//! layer's job (out of scope here, per §1).

use crate::bson::Value;

/// Operators the chooser can cost; matches the comparison forms a
/// predicate against an indexed expression may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    Between,
    In,
    StartsWith,
}

impl ComparisonOperator {
    /// Relative selectivity, lower is cheaper. Equality is assumed to
    /// match one key; open ranges and `IN` degrade towards a full index
    /// scan as their bound count grows.
    fn selectivity(self) -> f64 {
        match self {
            ComparisonOperator::Eq => 0.0,
            ComparisonOperator::Between => 0.2,
            ComparisonOperator::StartsWith => 0.25,
            ComparisonOperator::Lte | ComparisonOperator::Gte => 0.4,
            ComparisonOperator::Lt | ComparisonOperator::Gt => 0.5,
            ComparisonOperator::In => 0.3,
            // unbounded membership cost grows with the candidate set; callers
            // scale this by the actual `IN` list length via `in_count`.
        }
    }
}

/// A single `<indexed_expression> <op> <literal...>` predicate over a
/// collection, as the external query layer would hand to this module.
pub struct Predicate<'a> {
    /// Dotted path the predicate targets, e.g. `$.Name`; matched against
    /// an index's stored expression to see if the index can serve it.
    pub expression: &'a str,
    pub op: ComparisonOperator,
    pub value: &'a Value,
    /// Upper bound for `Between`; ignored otherwise.
    pub upper: Option<&'a Value>,
    /// Candidate count for `In`; ignored otherwise.
    pub in_count: usize,
}

/// What the chooser needs to know about one existing index to cost it.
pub struct IndexStats {
    pub name: String,
    /// The index's stored key-selector expression (§4.6), e.g. `$.Name`.
    pub expression: String,
    /// Approximate number of keys currently in the index, used only to
    /// break ties between two predicates of otherwise equal selectivity.
    pub key_count: u64,
}

/// The plan this module hands off to query execution: which index (if
/// any) to walk, in what direction, over what key range, plus which
/// predicates the index couldn't absorb and must be re-checked per row.
#[derive(Debug, Clone)]
pub struct AccessPathPlan {
    /// `None` means a primary-key full scan: no index predicate fit.
    pub index_name: Option<String>,
    pub direction: crate::engine::lite_engine::Order,
    pub key_range: (Value, Value),
    /// Indexes into the original `predicates` slice not satisfied by
    /// `index_name` and that the caller must still apply as a filter.
    pub residual_predicates: Vec<usize>,
    pub order_reuses_index: bool,
    pub project_from_key_only: bool,
}

struct Candidate {
    predicate_index: usize,
    index_name: String,
    cost: f64,
}

/// Picks the cheapest access path for `predicates` over the indexes in
/// `indexes`. `order_by`/`group_by`/`projection_field`, when given, are
/// dotted-path expressions compared against each candidate index's own
/// expression to break ties (§4.8: prefer a match with `OrderBy`, then
/// `GroupBy`, then the sole projected field).
pub fn choose_access_path(
    predicates: &[Predicate],
    indexes: &[IndexStats],
    order_by: Option<&str>,
    group_by: Option<&str>,
    projection_field: Option<&str>,
) -> AccessPathPlan {
    let mut candidates = Vec::new();

    for (i, predicate) in predicates.iter().enumerate() {
        let Some(index) = indexes.iter().find(|idx| idx.expression == predicate.expression) else {
            continue;
        };

        let selectivity = match predicate.op {
            ComparisonOperator::In if predicate.in_count > 0 => {
                ComparisonOperator::In.selectivity() * predicate.in_count as f64
            }
            op => op.selectivity(),
        };
        let cost = selectivity * (index.key_count.max(1) as f64);

        candidates.push(Candidate { predicate_index: i, index_name: index.name.clone(), cost });
    }

    candidates.sort_by(|a, b| a.cost.partial_cmp(&b.cost).unwrap());

    let best_cost = match candidates.first() {
        Some(c) => c.cost,
        None => return full_scan(predicates),
    };

    // among ties, prefer the one whose expression satisfies OrderBy, then
    // GroupBy, then the projection's sole field
    let tie_breaker = |name: &str| -> u8 {
        let expr = indexes.iter().find(|i| i.name == name).map(|i| i.expression.as_str());
        if expr.is_some() && expr == order_by {
            0
        } else if expr.is_some() && expr == group_by {
            1
        } else if expr.is_some() && expr == projection_field {
            2
        } else {
            3
        }
    };

    let chosen = candidates
        .iter()
        .take_while(|c| c.cost <= best_cost)
        .min_by_key(|c| tie_breaker(&c.index_name))
        .expect("candidates is non-empty, just checked above");

    let predicate = &predicates[chosen.predicate_index];
    let (min, max, direction) = key_range_for(predicate);

    let residual_predicates = (0..predicates.len()).filter(|&i| i != chosen.predicate_index).collect();

    let expr = indexes.iter().find(|i| i.name == chosen.index_name).map(|i| i.expression.as_str());
    let order_reuses_index = expr.is_some() && expr == order_by;
    let project_from_key_only = expr.is_some() && expr == projection_field && predicates.len() == 1;

    AccessPathPlan {
        index_name: Some(chosen.index_name.clone()),
        direction,
        key_range: (min, max),
        residual_predicates,
        order_reuses_index,
        project_from_key_only,
    }
}

fn key_range_for(predicate: &Predicate) -> (Value, Value, crate::engine::lite_engine::Order) {
    let range = match predicate.op {
        ComparisonOperator::Eq => (predicate.value.clone(), predicate.value.clone()),
        ComparisonOperator::Lt | ComparisonOperator::Lte => (Value::MinValue, predicate.value.clone()),
        ComparisonOperator::Gt | ComparisonOperator::Gte => (predicate.value.clone(), Value::MaxValue),
        ComparisonOperator::Between => {
            (predicate.value.clone(), predicate.upper.cloned().unwrap_or(Value::MaxValue))
        }
        ComparisonOperator::In | ComparisonOperator::StartsWith => (Value::MinValue, Value::MaxValue),
    };

    (range.0, range.1, crate::engine::lite_engine::Order::Ascending)
}

fn full_scan(predicates: &[Predicate]) -> AccessPathPlan {
    AccessPathPlan {
        index_name: None,
        direction: crate::engine::lite_engine::Order::Ascending,
        key_range: (Value::MinValue, Value::MaxValue),
        residual_predicates: (0..predicates.len()).collect(),
        order_reuses_index: false,
        project_from_key_only: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(name: &str, expression: &str, key_count: u64) -> IndexStats {
        IndexStats { name: name.to_string(), expression: expression.to_string(), key_count }
    }

    #[test]
    fn equality_beats_open_range_on_same_size_index() {
        let name_val = Value::from("Acme");
        let age_val = Value::from(30i32);

        let predicates = vec![
            Predicate { expression: "$.Name", op: ComparisonOperator::Eq, value: &name_val, upper: None, in_count: 0 },
            Predicate { expression: "$.Age", op: ComparisonOperator::Gt, value: &age_val, upper: None, in_count: 0 },
        ];
        let indexes = vec![idx("name_idx", "$.Name", 1000), idx("age_idx", "$.Age", 1000)];

        let plan = choose_access_path(&predicates, &indexes, None, None, None);
        assert_eq!(plan.index_name.as_deref(), Some("name_idx"));
        assert_eq!(plan.residual_predicates, vec![1]);
    }

    #[test]
    fn no_matching_index_falls_back_to_full_scan() {
        let val = Value::from(1i32);
        let predicates = vec![Predicate {
            expression: "$.Unindexed",
            op: ComparisonOperator::Eq,
            value: &val,
            upper: None,
            in_count: 0,
        }];

        let plan = choose_access_path(&predicates, &[], None, None, None);
        assert!(plan.index_name.is_none());
        assert_eq!(plan.residual_predicates, vec![0]);
    }

    #[test]
    fn tie_prefers_index_matching_order_by() {
        let a = Value::from(1i32);
        let b = Value::from(1i32);

        let predicates = vec![
            Predicate { expression: "$.A", op: ComparisonOperator::Eq, value: &a, upper: None, in_count: 0 },
            Predicate { expression: "$.B", op: ComparisonOperator::Eq, value: &b, upper: None, in_count: 0 },
        ];
        let indexes = vec![idx("a_idx", "$.A", 500), idx("b_idx", "$.B", 500)];

        let plan = choose_access_path(&predicates, &indexes, Some("$.B"), None, None);
        assert_eq!(plan.index_name.as_deref(), Some("b_idx"));
        assert!(plan.order_reuses_index);
    }
}

//! Tree induction: recursive binary splitting on continuous features,
//! minimizing an impurity criterion via a deterministic bracketed scan.

use crate::errors::ClassifierError;
use crate::forest::EvaluationNode;
use crate::impurity::ImpurityCriterion;
use crate::table::{sort_and_prefix_sum, Record, Table, TrainingContext};
use rayon::prelude::*;

/// Records of fewer than this many weighted events are never split.
pub const MIN_SIZE: usize = 100;

/// Declared but intentionally unenforced: the reference engine reserves this
/// as a future pruning knob. Kept here, named, unused by the stopping rule,
/// matching the open question in the design notes.
#[allow(dead_code)]
pub const IMPROVEMENT_MIN: f64 = 0.0;

const ZOOM_LEVELS: usize = 4;
const SCAN_POINTS: usize = 9;

/// A node of the training tree: owns a `[start, end)` subrange of the table,
/// its chosen split (if any), and its children.
pub struct GrowthNode {
    id: u64,
    start: usize,
    end: usize,
    signal: f64,
    background: f64,
    split_index: Option<usize>,
    split_value: f64,
    left: Option<Box<GrowthNode>>,
    right: Option<Box<GrowthNode>>,
}

impl GrowthNode {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn signal(&self) -> f64 {
        self.signal
    }

    pub fn background(&self) -> f64 {
        self.background
    }

    pub fn is_leaf(&self) -> bool {
        self.split_index.is_none()
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }

    /// Grow a tree over `table[start..end)`, assigning heap-addressed
    /// identifiers starting at `id` (1 for the root of a fresh tree), using
    /// the default `MIN_SIZE` stopping threshold.
    pub fn grow(
        table: &mut Table,
        ctx: &TrainingContext,
        criterion: &dyn ImpurityCriterion,
        start: usize,
        end: usize,
        id: u64,
    ) -> Result<Self, ClassifierError> {
        Self::grow_with_min_size(table, ctx, criterion, MIN_SIZE, start, end, id)
    }

    /// As `grow`, but with an explicit stopping-size threshold (wired from
    /// `TrainerConfig`).
    pub fn grow_with_min_size(
        table: &mut Table,
        ctx: &TrainingContext,
        criterion: &dyn ImpurityCriterion,
        min_size: usize,
        start: usize,
        end: usize,
        id: u64,
    ) -> Result<Self, ClassifierError> {
        if start == end {
            return Err(ClassifierError::InvalidInput(
                "cannot grow a node from an empty subrange".to_string(),
            ));
        }
        if ctx.num_features() == 0 {
            return Err(ClassifierError::InvalidInput(
                "no feature columns configured".to_string(),
            ));
        }

        let (signal, background) = aggregate_weights(table, start, end);

        if end - start < min_size {
            return Ok(Self::leaf(id, start, end, signal, background));
        }

        let table_ref: &Table = table;
        let candidates: Vec<Result<(usize, f64, f64), ClassifierError>> = (0..ctx.num_features())
            .into_par_iter()
            .map(|column| best_threshold_for_column(table_ref, start, end, column, criterion))
            .collect();

        let mut best: Option<(usize, f64, f64)> = None;
        for candidate in candidates {
            let (column, threshold, impurity) = candidate?;
            let better = match &best {
                None => true,
                Some((_, _, best_impurity)) => impurity < *best_impurity,
            };
            if better {
                best = Some((column, threshold, impurity));
            }
        }
        let (column, threshold, _impurity) =
            best.expect("num_features() > 0 guarantees at least one candidate");

        table.sort_range_by_column(start, end, column)?;
        let split_pos = lower_bound_position(table, start, end, column, threshold);
        let left_size = split_pos - start;
        let right_size = end - split_pos;

        if left_size < min_size || right_size < min_size {
            return Ok(Self::leaf(id, start, end, signal, background));
        }

        let left = Self::grow_with_min_size(
            table,
            ctx,
            criterion,
            min_size,
            start,
            split_pos,
            2 * id,
        )?;
        let right = Self::grow_with_min_size(
            table,
            ctx,
            criterion,
            min_size,
            split_pos,
            end,
            2 * id + 1,
        )?;

        Ok(Self {
            id,
            start,
            end,
            signal,
            background,
            split_index: Some(column),
            split_value: threshold,
            left: Some(Box::new(left)),
            right: Some(Box::new(right)),
        })
    }

    /// Collect `(purity, total_weight)` for every leaf, walked while the
    /// growth tree still carries its per-node signal/background weight
    /// (lost once `freeze` drops down to a bare purity). Feeds
    /// `EfficiencyAnalyzer::from_leaf_purities` directly from a just-trained
    /// tree, without a held-out table.
    pub fn leaf_purities(&self, out: &mut Vec<(f64, f64)>) {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => {
                left.leaf_purities(out);
                right.leaf_purities(out);
            }
            _ => {
                let total = self.signal + self.background;
                let purity = if total > 0.0 {
                    self.signal / total
                } else {
                    0.0
                };
                out.push((purity, total));
            }
        }
    }

    fn leaf(id: u64, start: usize, end: usize, signal: f64, background: f64) -> Self {
        Self {
            id,
            start,
            end,
            signal,
            background,
            split_index: None,
            split_value: 0.0,
            left: None,
            right: None,
        }
    }

    /// Walk the growth tree and emit an evaluation tree: leaves carry
    /// `purity = signal/(signal+background)`, branches carry their chosen
    /// `(split_index, split_value)`.
    pub fn freeze(&self) -> EvaluationNode {
        match (&self.left, &self.right, self.split_index) {
            (Some(left), Some(right), Some(index)) => EvaluationNode::branch(
                index,
                self.split_value,
                left.freeze(),
                right.freeze(),
            ),
            _ => {
                let total = self.signal + self.background;
                let purity = if total > 0.0 {
                    self.signal / total
                } else {
                    0.0
                };
                EvaluationNode::leaf(purity)
            }
        }
    }
}

fn aggregate_weights(table: &Table, start: usize, end: usize) -> (f64, f64) {
    let mut signal = 0.0;
    let mut background = 0.0;
    for r in &table.records()[start..end] {
        signal += r.sigwt();
        background += r.bkgwt();
    }
    (signal, background)
}

/// Find the best (threshold, impurity) for one feature column, operating on
/// an owned snapshot of the subrange so the search is safe to parallelize
/// column-by-column without sharing mutable state (§5).
fn best_threshold_for_column(
    table: &Table,
    start: usize,
    end: usize,
    column: usize,
    criterion: &dyn ImpurityCriterion,
) -> Result<(usize, f64, f64), ClassifierError> {
    let mut snapshot: Vec<Record> = table.records()[start..end].to_vec();
    sort_and_prefix_sum(&mut snapshot, column)?;

    let n = snapshot.len();
    let total_sig = snapshot[n - 1].cum_sig();
    let total_bkg = snapshot[n - 1].cum_bkg();
    let parent_impurity = criterion.value(total_sig, total_bkg);

    let gini_at = |x: f64| -> f64 {
        let pos = snapshot.partition_point(|r| r.feature(column) < x);
        let (left_sig, left_bkg) = if pos == n {
            (total_sig, total_bkg)
        } else {
            (snapshot[pos].cum_sig(), snapshot[pos].cum_bkg())
        };
        let right_sig = total_sig - left_sig;
        let right_bkg = total_bkg - left_bkg;
        if left_sig + left_bkg == 0.0 || right_sig + right_bkg == 0.0 {
            return parent_impurity;
        }
        criterion.split_value(left_sig, left_bkg, right_sig, right_bkg)
    };

    let a_idx = n / 8;
    let b_idx = n - n / 8 - 1;
    let a = snapshot[a_idx].feature(column);
    let b = snapshot[b_idx].feature(column);

    let (threshold, impurity) = bracketed_minimize(a, b, ZOOM_LEVELS, gini_at)?;
    Ok((column, threshold, impurity))
}

/// Deterministic bracketed scan minimizer (§4.1 step 3): an initial 9-point
/// scan across `[lo, hi]` followed by `zoom_levels` further 9-point scans,
/// each over 1/8th of the previous bracket width centered on the best point
/// found so far.
fn bracketed_minimize(
    a: f64,
    b: f64,
    zoom_levels: usize,
    mut f: impl FnMut(f64) -> f64,
) -> Result<(f64, f64), ClassifierError> {
    let (mut lo, mut hi) = (a.min(b), a.max(b));
    let mut best_x = lo;
    let mut best_val = f(lo);

    for level in 0..=zoom_levels {
        let r = hi - lo;
        if !r.is_finite() {
            return Err(ClassifierError::NumericError(
                "non-finite split search bracket".to_string(),
            ));
        }
        if r == 0.0 {
            let v = f(lo);
            if v < best_val {
                best_val = v;
                best_x = lo;
            }
            break;
        }

        let mut level_best_x = lo;
        let mut level_best_val = f64::INFINITY;
        for i in 0..SCAN_POINTS {
            let x = lo + r * (i as f64) / (SCAN_POINTS - 1) as f64;
            let v = f(x);
            if v < level_best_val {
                level_best_val = v;
                level_best_x = x;
            }
        }
        if level_best_val < best_val {
            best_val = level_best_val;
            best_x = level_best_x;
        }
        if level == zoom_levels {
            break;
        }
        lo = (level_best_x - r / 8.0).max(a.min(b));
        hi = (level_best_x + r / 8.0).min(a.max(b));
    }

    Ok((best_x, best_val))
}

/// First index `i` in `[start, end)` such that `table[i].feature(column) >= x`,
/// assuming the subrange is already sorted ascending on `column`.
fn lower_bound_position(table: &Table, start: usize, end: usize, column: usize, x: f64) -> usize {
    let slice = &table.records()[start..end];
    start + slice.partition_point(|r| r.feature(column) < x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impurity::Gini;

    fn make_separable_table(n_each: usize) -> Table {
        // Deterministic stand-in for the "Normal(+1,1) vs Normal(-1,1)"
        // scenario: evenly spaced points around each mean rather than a
        // sampled distribution, so the split search is exercised without
        // depending on an RNG.
        let mut records = Vec::with_capacity(2 * n_each);
        for i in 0..n_each {
            let spread = (i as f64 / n_each as f64) - 0.5;
            records.push(Record::signal_record(vec![1.0 + spread, 0.0], 0.5 / n_each as f64));
            records.push(Record::background_record(vec![-1.0 + spread, 0.0], 0.5 / n_each as f64));
        }
        Table::from_records(records)
    }

    #[test]
    fn node_below_min_size_is_a_leaf() {
        let mut table = Table::from_records(
            (0..10)
                .map(|i| Record::signal_record(vec![i as f64], 1.0))
                .collect(),
        );
        let ctx = TrainingContext::new(vec!["x".into()]);
        let node = GrowthNode::grow(&mut table, &ctx, &Gini, 0, 10, 1).unwrap();
        assert!(node.is_leaf());
    }

    #[test]
    fn separable_data_produces_a_confident_split() {
        let mut table = make_separable_table(150);
        let ctx = TrainingContext::new(vec!["x".into(), "y".into()]);
        let node = GrowthNode::grow(&mut table, &ctx, &Gini, 0, table.len(), 1).unwrap();
        assert!(!node.is_leaf());
        let tree = node.freeze();
        let signal_side = tree.evaluate(&[1.0, 0.0]);
        let background_side = tree.evaluate(&[-1.0, 0.0]);
        assert!(signal_side > 0.8, "signal-side purity was {signal_side}");
        assert!(
            background_side < 0.2,
            "background-side purity was {background_side}"
        );
    }

    #[test]
    fn empty_subrange_is_invalid_input() {
        let mut table = Table::new();
        let ctx = TrainingContext::new(vec!["x".into()]);
        let err = GrowthNode::grow(&mut table, &ctx, &Gini, 0, 0, 1).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));
    }

    #[test]
    fn no_feature_columns_is_invalid_input() {
        let mut table = Table::from_records(vec![Record::signal_record(vec![], 1.0)]);
        let ctx = TrainingContext::new(vec![]);
        let err = GrowthNode::grow(&mut table, &ctx, &Gini, 0, 1, 1).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));
    }
}

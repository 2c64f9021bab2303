//! Error rate and cross-tabulation over a held-out table (§4.5).

use crate::errors::ClassifierError;
use crate::forest::Forest;
use crate::table::Table;
use serde::{Deserialize, Serialize};

/// Σ weights of misclassified records / Σ weights of all records, where
/// classification is `forest(row) > cut`.
pub fn error(forest: &Forest, table: &Table, cut: f64) -> Result<f64, ClassifierError> {
    let mut wrong = 0.0;
    let mut total = 0.0;
    for record in table.iter() {
        let predicted_signal = forest.evaluate(record.features())? > cut;
        total += record.weight();
        if predicted_signal != record.signal() {
            wrong += record.weight();
        }
    }
    Ok(if total > 0.0 { wrong / total } else { 0.0 })
}

/// Four weighted counts at cut = 0.5: true-positive, false-negative,
/// false-positive, true-negative. Records with both weights zero are
/// skipped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossTab {
    pub true_positive: f64,
    pub false_negative: f64,
    pub false_positive: f64,
    pub true_negative: f64,
}

pub fn cross_tab(forest: &Forest, table: &Table) -> Result<CrossTab, ClassifierError> {
    const CUT: f64 = 0.5;
    let mut tab = CrossTab::default();
    for record in table.iter() {
        if record.sigwt() == 0.0 && record.bkgwt() == 0.0 {
            continue;
        }
        let predicted_signal = forest.evaluate(record.features())? > CUT;
        match (record.signal(), predicted_signal) {
            (true, true) => tab.true_positive += record.weight(),
            (true, false) => tab.false_negative += record.weight(),
            (false, true) => tab.false_positive += record.weight(),
            (false, false) => tab.true_negative += record.weight(),
        }
    }
    Ok(tab)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::{EvaluationNode, WeightedTree};
    use crate::table::Record;

    fn perfect_forest() -> Forest {
        let mut forest = Forest::new("t");
        forest.push(WeightedTree::new(
            1.0,
            EvaluationNode::branch(
                0,
                0.0,
                EvaluationNode::leaf(0.0),
                EvaluationNode::leaf(1.0),
            ),
        ));
        forest
    }

    #[test]
    fn perfect_classifier_has_zero_error() {
        let forest = perfect_forest();
        let table = Table::from_records(vec![
            Record::signal_record(vec![1.0], 1.0),
            Record::background_record(vec![-1.0], 1.0),
        ]);
        assert_eq!(error(&forest, &table, 0.5).unwrap(), 0.0);
    }

    #[test]
    fn cross_tab_skips_zero_weight_records() {
        let forest = perfect_forest();
        let table = Table::from_records(vec![
            Record::signal_record(vec![1.0], 1.0),
            Record::new(vec![0.0], 0.0, 0.0),
        ]);
        let tab = cross_tab(&forest, &table).unwrap();
        assert_eq!(tab.true_positive, 1.0);
        assert_eq!(
            tab.false_negative + tab.false_positive + tab.true_negative,
            0.0
        );
    }
}

//! AdaBoost-style reweighting driver (§4.4).

use crate::errors::ClassifierError;
use crate::forest::Forest;
use crate::metrics::error;
use crate::table::Table;

/// Default `β` exponent applied to the log-odds factor.
pub const DEFAULT_BETA: f64 = 0.5;
/// Default decision cut: "predicted signal iff `forest(row) > PURITY_CUT`".
pub const DEFAULT_PURITY_CUT: f64 = 0.5;

/// Reweights a table against a single built forest. One `AdaBoost` instance
/// drives one boosting loop over one table.
pub struct AdaBoost {
    beta: f64,
    purity_cut: f64,
}

impl AdaBoost {
    pub fn new() -> Self {
        Self {
            beta: DEFAULT_BETA,
            purity_cut: DEFAULT_PURITY_CUT,
        }
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_purity_cut(mut self, purity_cut: f64) -> Self {
        self.purity_cut = purity_cut;
        self
    }

    /// Apply one boosting round: compute `forest`'s error on `table`,
    /// reweight misclassified records (both weight columns, per the
    /// reference behavior), renormalize, and return the ensemble weight
    /// `α = exp(β · ln((1-e)/e))`.
    ///
    /// A zero or unit error rate makes `ln((1-e)/e)` undefined; rather than
    /// silently produce `NaN`/`±inf`, a zero-error classifier is treated as
    /// converged and this fails with `InvalidInput`.
    pub fn boost(&self, forest: &Forest, table: &mut Table) -> Result<f64, ClassifierError> {
        let err = error(forest, table, self.purity_cut)?;
        if err <= 0.0 || err >= 1.0 {
            return Err(ClassifierError::InvalidInput(format!(
                "AdaBoost requires 0 < error < 1 to compute alpha, got {}",
                err
            )));
        }
        let alpha = (self.beta * ((1.0 - err) / err).ln()).exp();

        log::debug!("AdaBoost round: error={:.6} alpha={:.6}", err, alpha);

        for record in table.records_mut() {
            let classify = forest.evaluate(record.features())? > self.purity_cut;
            if record.signal() != classify {
                record.reweight(alpha);
            }
        }
        table.renormalize_to_unit_weight();

        Ok(alpha)
    }
}

impl Default for AdaBoost {
    fn default() -> Self {
        Self::new()
    }
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
    fn zero_error_classifier_is_rejected() {
        let forest = perfect_forest();
        let mut table = Table::from_records(vec![
            Record::signal_record(vec![1.0], 0.5),
            Record::background_record(vec![-1.0], 0.5),
        ]);
        let err = AdaBoost::new().boost(&forest, &mut table).unwrap_err();
        assert!(matches!(err, ClassifierError::InvalidInput(_)));
    }

    #[test]
    fn misclassified_records_have_both_weights_scaled() {
        let forest = perfect_forest();
        let mut table = Table::from_records(vec![
            Record::signal_record(vec![1.0], 0.4),
            Record::background_record(vec![-1.0], 0.4),
            // misclassified: signal record on the "background" side
            Record::signal_record(vec![-1.0], 0.2),
        ]);
        let alpha = AdaBoost::new().boost(&forest, &mut table).unwrap();
        assert!(alpha > 1.0);
        let (sig, bkg) = table.weight_totals();
        assert!((sig + bkg - 1.0).abs() < 1e-9);
    }
}

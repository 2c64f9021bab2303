//! Impurity criteria: a pure scalar function of (signal, background)
//! weight, fixed at tree-build time. Exposed as a function value plus a
//! name rather than a class hierarchy, per the Design Notes.

/// `(signal_weight, background_weight) -> impurity`. Implementations must be
/// additive across a partition: `criterion(s1+s2, b1+b2)` need not equal
/// `criterion(s1,b1)+criterion(s2,b2)` in general, but candidate-split
/// impurity is always computed as the sum of the two sides' values.
pub trait ImpurityCriterion: Send + Sync {
    fn name(&self) -> &'static str;
    fn value(&self, signal: f64, background: f64) -> f64;

    /// Impurity of a candidate split: the sum of the criterion on both sides.
    fn split_value(&self, left_sig: f64, left_bkg: f64, right_sig: f64, right_bkg: f64) -> f64 {
        self.value(left_sig, left_bkg) + self.value(right_sig, right_bkg)
    }
}

/// `2sb/(s+b)` when `s+b>0`, else 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gini;

impl ImpurityCriterion for Gini {
    fn name(&self) -> &'static str {
        "gini"
    }

    fn value(&self, signal: f64, background: f64) -> f64 {
        let total = signal + background;
        if total > 0.0 {
            2.0 * signal * background / total
        } else {
            0.0
        }
    }
}

/// `-s*log(p) - b*log(1-p)` with `p = s/(s+b)`, when `0 < p < 1`, else 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct Entropy;

impl ImpurityCriterion for Entropy {
    fn name(&self) -> &'static str {
        "entropy"
    }

    fn value(&self, signal: f64, background: f64) -> f64 {
        let total = signal + background;
        if total <= 0.0 {
            return 0.0;
        }
        let p = signal / total;
        if p <= 0.0 || p >= 1.0 {
            return 0.0;
        }
        -signal * p.ln() - background * (1.0 - p).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gini_is_zero_when_pure() {
        assert_eq!(Gini.value(10.0, 0.0), 0.0);
        assert_eq!(Gini.value(0.0, 10.0), 0.0);
    }

    #[test]
    fn gini_is_maximal_at_even_split() {
        let even = Gini.value(5.0, 5.0);
        let uneven = Gini.value(9.0, 1.0);
        assert!(even > uneven);
    }

    #[test]
    fn entropy_is_zero_when_pure() {
        assert_eq!(Entropy.value(10.0, 0.0), 0.0);
        assert_eq!(Entropy.value(0.0, 10.0), 0.0);
    }

    #[test]
    fn split_value_sums_both_sides() {
        let g = Gini;
        let expected = g.value(3.0, 1.0) + g.value(1.0, 3.0);
        assert_eq!(g.split_value(3.0, 1.0, 1.0, 3.0), expected);
    }
}

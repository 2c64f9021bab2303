//! Efficiency analyzer: bins leaf purities and integrates to produce
//! efficiency→background-rate and the signal-resolution estimator σ (§4.6).

use std::collections::BTreeMap;

/// Purity-bin width.
pub const BIN_WIDTH: f64 = 0.01;

fn bin_of(purity: f64) -> OrderedBin {
    OrderedBin((purity / BIN_WIDTH).floor() as i64)
}

/// A purity bin, ordered by its integer index so a `BTreeMap` keyed on it
/// iterates in ascending purity order (§5 Ordering guarantee).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct OrderedBin(i64);

impl OrderedBin {
    fn center(self) -> f64 {
        (self.0 as f64 + 0.5) * BIN_WIDTH
    }
}

/// A total-order key for efficiency values, since `f64` has no `Ord`. Built
/// from the same discretization used for bins; efficiency values are
/// themselves derived from a monotone running subtraction so collisions
/// collapse naturally, matching the reference's `std::map<double,double>`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct EfficiencyKey(f64);

impl Eq for EfficiencyKey {}
impl PartialOrd for EfficiencyKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for EfficiencyKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.partial_cmp(&other.0).expect("efficiency is finite")
    }
}

/// Accumulates `(purity, signal_weight, background_weight)` triples and
/// derives the efficiency/background-rate curve and σ.
pub struct EfficiencyAnalyzer {
    probmap: BTreeMap<OrderedBin, (f64, f64)>,
    total_sig: f64,
    total_bkg: f64,
}

/// Derived output of `EfficiencyAnalyzer::finish`.
pub struct EfficiencyCurve {
    /// purity-bin center -> (efficiency, background_fraction)
    auxmap: BTreeMap<OrderedBin, (f64, f64)>,
    /// efficiency -> background_fraction, ascending in efficiency.
    effmap: BTreeMap<EfficiencyKey, f64>,
    sigma: f64,
}

impl EfficiencyAnalyzer {
    pub fn new() -> Self {
        Self {
            probmap: BTreeMap::new(),
            total_sig: 0.0,
            total_bkg: 0.0,
        }
    }

    /// Add one `(predicted_purity, signal_weight, background_weight)`
    /// triple.
    pub fn add(&mut self, purity: f64, signal_weight: f64, background_weight: f64) {
        let bin = bin_of(purity);
        let entry = self.probmap.entry(bin).or_insert((0.0, 0.0));
        entry.0 += signal_weight;
        entry.1 += background_weight;
        self.total_sig += signal_weight;
        self.total_bkg += background_weight;
    }

    /// Seed directly from a just-trained tree's `(purity, total_weight)`
    /// leaf pairs (see `GrowthNode::leaf_purities`), each leaf contributing
    /// `(purity, purity*weight, (1-purity)*weight)`, matching the
    /// reference's purity-map constructor.
    pub fn from_leaf_purities(leaves: &[(f64, f64)]) -> Self {
        let mut analyzer = Self::new();
        for &(purity, weight) in leaves {
            analyzer.add(purity, weight * purity, weight * (1.0 - purity));
        }
        analyzer
    }

    /// Integrate the accumulated bins into the efficiency/background curve
    /// and signal resolution σ.
    pub fn finish(self) -> EfficiencyCurve {
        let mut auxmap = BTreeMap::new();
        let mut effmap = BTreeMap::new();
        let mut efficiency = 1.0;
        let mut cum_bkg = self.total_bkg;
        let mut inv_var = 0.0;

        for (bin, &(signal, background)) in self.probmap.iter() {
            if self.total_sig > 0.0 {
                efficiency -= signal / self.total_sig;
            }
            if efficiency < 0.0 {
                efficiency = 0.0;
            }
            cum_bkg -= background;
            let bkg_fraction = if self.total_bkg > 0.0 {
                cum_bkg / self.total_bkg
            } else {
                0.0
            };
            auxmap.insert(*bin, (efficiency, bkg_fraction));
            effmap.insert(EfficiencyKey(efficiency), bkg_fraction);
            if signal + background != 0.0 {
                inv_var += signal * signal / (signal + background);
            }
        }

        let sigma = if inv_var > 0.0 {
            (self.total_sig / inv_var).sqrt()
        } else {
            f64::INFINITY
        };

        EfficiencyCurve {
            auxmap,
            effmap,
            sigma,
        }
    }
}

impl Default for EfficiencyAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl EfficiencyCurve {
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// `effmap.lower_bound(eff)`, or 1.0 if `eff` exceeds every observed key.
    pub fn background_at(&self, efficiency: f64) -> f64 {
        self.effmap
            .range(EfficiencyKey(efficiency)..)
            .next()
            .map(|(_, bkg)| *bkg)
            .unwrap_or(1.0)
    }

    /// `(purity_bin_center, efficiency, background_fraction)` triples in
    /// ascending purity order.
    pub fn aux_points(&self) -> Vec<(f64, f64, f64)> {
        self.auxmap
            .iter()
            .map(|(bin, &(eff, bkg))| (bin.center(), eff, bkg))
            .collect()
    }

    /// `effmap` in ascending efficiency order, for the monotonicity check in
    /// §8 ("effmap keys strictly non-decreasing ⇒ values non-increasing").
    pub fn efficiency_points(&self) -> Vec<(f64, f64)> {
        self.effmap.iter().map(|(k, &v)| (k.0, v)).collect()
    }
}

//! Training table: records, the feature schema, and the explicit training
//! context that replaces a process-wide schema singleton.

use crate::errors::ClassifierError;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// One training example: an ordered feature vector plus signal/background
/// weight. Exactly one of `sigwt`, `bkgwt` is non-zero.
///
/// `cum_sig`/`cum_bkg` are only meaningful immediately after the owning
/// subrange has been sorted by some column; they hold the prefix sum of
/// `sigwt`/`bkgwt` through this record under that sort order.
#[derive(Clone, Debug)]
pub struct Record {
    features: Vec<f64>,
    sigwt: f64,
    bkgwt: f64,
    cum_sig: f64,
    cum_bkg: f64,
}

impl Record {
    pub fn new(features: Vec<f64>, sigwt: f64, bkgwt: f64) -> Self {
        Self {
            features,
            sigwt,
            bkgwt,
            cum_sig: 0.0,
            cum_bkg: 0.0,
        }
    }

    pub fn signal_record(features: Vec<f64>, weight: f64) -> Self {
        Self::new(features, weight, 0.0)
    }

    pub fn background_record(features: Vec<f64>, weight: f64) -> Self {
        Self::new(features, 0.0, weight)
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn feature(&self, index: usize) -> f64 {
        self.features[index]
    }

    pub fn sigwt(&self) -> f64 {
        self.sigwt
    }

    pub fn bkgwt(&self) -> f64 {
        self.bkgwt
    }

    pub fn weight(&self) -> f64 {
        self.sigwt + self.bkgwt
    }

    pub fn signal(&self) -> bool {
        self.sigwt > 0.0
    }

    pub fn cum_sig(&self) -> f64 {
        self.cum_sig
    }

    pub fn cum_bkg(&self) -> f64 {
        self.cum_bkg
    }

    /// Multiply both weight columns by `factor`, per the AdaBoost variant's
    /// misclassified-record reweighting (both signal and background are
    /// scaled, not only the mislabeled class).
    pub fn reweight(&mut self, factor: f64) {
        self.sigwt *= factor;
        self.bkgwt *= factor;
    }
}

/// Feature schema plus the loader conventions that were a process-wide
/// singleton in the reference design (see Design Notes: re-architected as
/// an explicit value threaded through construction, sorting and splitting).
#[derive(Clone, Debug)]
pub struct TrainingContext {
    feature_names: Vec<String>,
    weights_are_column_0: bool,
    seed: u64,
}

impl TrainingContext {
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            weights_are_column_0: false,
            seed: 0,
        }
    }

    pub fn with_weights_as_column_0(mut self, enabled: bool) -> Self {
        self.weights_are_column_0 = enabled;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn weights_are_column_0(&self) -> bool {
        self.weights_are_column_0
    }

    /// Resolve a feature name to its column index, appending it if it is not
    /// already present (used by the filter builder, §4.7).
    pub fn resolve_or_append(&mut self, name: &str) -> usize {
        if let Some(pos) = self.feature_names.iter().position(|n| n == name) {
            pos
        } else {
            self.feature_names.push(name.to_string());
            self.feature_names.len() - 1
        }
    }

    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }
}

/// An ordered sequence of records, all with the same feature count.
#[derive(Clone, Debug, Default)]
pub struct Table {
    records: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    /// Sort a contiguous subrange `[start, end)` ascending on feature column
    /// `column`, then recompute `cum_sig`/`cum_bkg` as prefix sums over that
    /// subrange under the new order.
    pub fn sort_range_by_column(
        &mut self,
        start: usize,
        end: usize,
        column: usize,
    ) -> Result<(), ClassifierError> {
        sort_and_prefix_sum(&mut self.records[start..end], column)
    }
}

/// Sort a slice of records ascending on `column`, then overwrite `cum_sig`/
/// `cum_bkg` with prefix sums over the slice. Shared by `Table` and by the
/// per-column split search, which operates on owned snapshots of a node's
/// subrange rather than the live table (§5: read-only snapshot per column).
pub(crate) fn sort_and_prefix_sum(
    slice: &mut [Record],
    column: usize,
) -> Result<(), ClassifierError> {
    for r in slice.iter() {
        let v = r.feature(column);
        if !v.is_finite() {
            return Err(ClassifierError::NumericError(format!(
                "non-finite value in column {} during sort",
                column
            )));
        }
    }
    slice.sort_by(|a, b| {
        a.feature(column)
            .partial_cmp(&b.feature(column))
            .expect("non-finite values already rejected above")
    });

    let mut cum_sig = 0.0;
    let mut cum_bkg = 0.0;
    for r in slice.iter_mut() {
        cum_sig += r.sigwt;
        cum_bkg += r.bkgwt;
        r.cum_sig = cum_sig;
        r.cum_bkg = cum_bkg;
    }
    Ok(())
}

impl Table {
    /// Renormalize so the sum of signal weights equals `target_sig` and the
    /// sum of background weights equals `target_bkg`.
    pub fn normalize(&mut self, target_sig: f64, target_bkg: f64) {
        let (total_sig, total_bkg) = self.weight_totals();
        let sig_scale = if total_sig > 0.0 {
            target_sig / total_sig
        } else {
            1.0
        };
        let bkg_scale = if total_bkg > 0.0 {
            target_bkg / total_bkg
        } else {
            1.0
        };
        for r in self.records.iter_mut() {
            if r.signal() {
                r.sigwt *= sig_scale;
            } else {
                r.bkgwt *= bkg_scale;
            }
        }
    }

    /// Renormalize so the sum of all record weights equals 1, used by the
    /// boosting driver after reweighting misclassified records.
    pub fn renormalize_to_unit_weight(&mut self) {
        let sum: f64 = self.records.iter().map(Record::weight).sum();
        if sum == 0.0 {
            return;
        }
        let inv = 1.0 / sum;
        for r in self.records.iter_mut() {
            r.reweight(inv);
        }
    }

    pub fn weight_totals(&self) -> (f64, f64) {
        let mut sig = 0.0;
        let mut bkg = 0.0;
        for r in &self.records {
            sig += r.sigwt;
            bkg += r.bkgwt;
        }
        (sig, bkg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_range_computes_prefix_sums() {
        let mut table = Table::from_records(vec![
            Record::signal_record(vec![3.0], 2.0),
            Record::signal_record(vec![1.0], 1.0),
            Record::background_record(vec![2.0], 5.0),
        ]);
        table.sort_range_by_column(0, 3, 0).unwrap();
        let recs = table.records();
        assert_eq!(recs[0].feature(0), 1.0);
        assert_eq!(recs[1].feature(0), 2.0);
        assert_eq!(recs[2].feature(0), 3.0);
        assert_eq!(recs[0].cum_sig(), 1.0);
        assert_eq!(recs[1].cum_sig(), 1.0);
        assert_eq!(recs[2].cum_sig(), 3.0);
        assert_eq!(recs[0].cum_bkg(), 0.0);
        assert_eq!(recs[1].cum_bkg(), 5.0);
        assert_eq!(recs[2].cum_bkg(), 5.0);
    }

    #[test]
    fn normalize_scales_each_class_independently() {
        let mut table = Table::from_records(vec![
            Record::signal_record(vec![0.0], 4.0),
            Record::background_record(vec![0.0], 1.0),
        ]);
        table.normalize(0.5, 0.5);
        let (sig, bkg) = table.weight_totals();
        assert!((sig - 0.5).abs() < 1e-12);
        assert!((bkg - 0.5).abs() < 1e-12);
    }

    #[test]
    fn renormalize_to_unit_weight_sums_to_one() {
        let mut table = Table::from_records(vec![
            Record::signal_record(vec![0.0], 3.0),
            Record::background_record(vec![0.0], 7.0),
        ]);
        table.renormalize_to_unit_weight();
        let (sig, bkg) = table.weight_totals();
        assert!((sig + bkg - 1.0).abs() < 1e-12);
    }

    #[test]
    fn resolve_or_append_reuses_existing_index() {
        let mut ctx = TrainingContext::new(vec!["x".into(), "y".into()]);
        assert_eq!(ctx.resolve_or_append("y"), 1);
        assert_eq!(ctx.resolve_or_append("z"), 2);
        assert_eq!(ctx.num_features(), 3);
    }
}

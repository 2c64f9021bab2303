//! Integration-style tests over the public API, one per concrete scenario
//! in the testable-properties section.

use crate::config::TrainerConfig;
use crate::efficiency::EfficiencyAnalyzer;
use crate::filter::FilterBuilder;
use crate::forest::{Forest, WeightedTree};
use crate::impurity::Gini;
use crate::table::{Record, Table, TrainingContext};
use crate::tree::GrowthNode;
use crate::AdaBoost;
use approx::assert_abs_diff_eq;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Box-Muller transform over a seeded RNG; avoids an extra distribution
/// dependency for a single test fixture.
fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen_range(1e-12..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

fn separable_scenario_table(n_each: usize, seed: u64) -> Table {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let weight = 0.5 / n_each as f64;
    let mut records = Vec::with_capacity(2 * n_each);
    for _ in 0..n_each {
        let x = 1.0 + standard_normal(&mut rng);
        records.push(Record::signal_record(vec![x, 0.0], weight));
    }
    for _ in 0..n_each {
        let x = -1.0 + standard_normal(&mut rng);
        records.push(Record::background_record(vec![x, 0.0], weight));
    }
    Table::from_records(records)
}

fn train_scenario_one() -> (Forest, Table) {
    let mut table = separable_scenario_table(1000, 42);
    table.normalize(0.5, 0.5);
    let ctx = TrainingContext::new(vec!["x".into(), "y".into()]);
    let root = GrowthNode::grow(&mut table, &ctx, &Gini, 0, table.len(), 1)
        .unwrap()
        .freeze();
    let mut forest = Forest::new("scenario-1");
    forest.push(WeightedTree::new(1.0, root));
    (forest, table)
}

#[test]
fn scenario_1_separable_1d() {
    let (forest, table) = train_scenario_one();
    let signal_side = forest.evaluate(&[1.0, 0.0]).unwrap();
    let background_side = forest.evaluate(&[-1.0, 0.0]).unwrap();
    assert!(signal_side > 0.8, "signal-side purity was {signal_side}");
    assert!(
        background_side < 0.2,
        "background-side purity was {background_side}"
    );

    let mut analyzer = EfficiencyAnalyzer::new();
    for record in table.records() {
        let purity = forest.evaluate(record.features()).unwrap();
        analyzer.add(purity, record.sigwt(), record.bkgwt());
    }
    let curve = analyzer.finish();
    assert_abs_diff_eq!(curve.sigma(), 0.20, epsilon = 0.02);
}

#[test]
fn scenario_2_round_trip_exact_on_signal_rows() {
    let (forest, table) = train_scenario_one();
    let text = forest.to_text().unwrap();
    let parsed = Forest::from_text(&text).unwrap();

    for record in table.records().iter().filter(|r| r.signal()) {
        let direct = forest.evaluate(record.features()).unwrap();
        let round_tripped = parsed.evaluate(record.features()).unwrap();
        assert_eq!(direct, round_tripped);
    }
}

#[test]
fn scenario_3_filter_shape() {
    let mut ctx = TrainingContext::new(vec!["x".into(), "y".into()]);
    let mut builder = FilterBuilder::new(&mut ctx);
    builder.add_cut("y", "<", 1.0).unwrap();
    builder.add_cut("y", ">=", -1.0).unwrap();
    let filter = builder.close();

    assert_eq!(filter.root.evaluate(&[0.0, 0.0]), 1.0);
    assert_eq!(filter.root.evaluate(&[0.0, 0.99]), 1.0);
    assert_eq!(filter.root.evaluate(&[0.0, 1.01]), 0.0);
    assert_eq!(filter.root.evaluate(&[0.0, -1.01]), 0.0);
}

#[test]
fn scenario_4_filter_and_classifier_composition() {
    let (classifier_forest, _table) = train_scenario_one();
    let mut ctx = TrainingContext::new(vec!["x".into(), "y".into()]);
    let mut builder = FilterBuilder::new(&mut ctx);
    builder.add_cut("y", "<", 1.0).unwrap();
    builder.add_cut("y", ">=", -1.0).unwrap();
    let filter = builder.close();

    let mut composed = Forest::new("scenario-1");
    composed.prepend(filter);
    for tree in classifier_forest.trees() {
        composed.push(tree.clone());
    }

    let at_origin_classifier = classifier_forest.evaluate(&[0.0, 0.0]).unwrap();
    let at_origin_composed = composed.evaluate(&[0.0, 0.0]).unwrap();
    assert_eq!(at_origin_classifier, at_origin_composed);

    assert_eq!(composed.evaluate(&[0.0, 1.01]).unwrap(), 0.0);
}

#[test]
fn scenario_5_adaboost_zero_error_must_fail() {
    let mut forest = Forest::new("perfect");
    forest.push(WeightedTree::new(
        1.0,
        crate::forest::EvaluationNode::branch(
            0,
            0.0,
            crate::forest::EvaluationNode::leaf(0.0),
            crate::forest::EvaluationNode::leaf(1.0),
        ),
    ));
    let mut table = Table::from_records(vec![
        Record::signal_record(vec![1.0], 0.5),
        Record::background_record(vec![-1.0], 0.5),
    ]);
    let err = AdaBoost::new().boost(&forest, &mut table).unwrap_err();
    assert!(matches!(err, crate::errors::ClassifierError::InvalidInput(_)));
}

#[test]
fn scenario_6_efficiency_curve_is_monotone_non_decreasing_in_background() {
    let mut analyzer = EfficiencyAnalyzer::new();
    for i in 0..100 {
        let purity = i as f64 / 100.0;
        analyzer.add(purity, 1.0, 1.0 - purity);
    }
    let curve = analyzer.finish();
    let points = curve.efficiency_points();
    for pair in points.windows(2) {
        let (eff_a, bkg_a) = pair[0];
        let (eff_b, bkg_b) = pair[1];
        assert!(eff_b >= eff_a);
        assert!(bkg_b >= bkg_a - 1e-12);
    }
}

#[test]
fn config_builder_rejects_out_of_range_purity_cut() {
    let err = TrainerConfig::builder().purity_cut(-1.0).build();
    assert!(err.is_err());
}

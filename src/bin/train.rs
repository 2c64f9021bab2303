//! Command-line training driver: a thin composition of the core
//! subsystems. Owns no algorithmic logic of its own.

use anyhow::{Context, Result};
use classifier::config::{Criterion, TrainerConfig};
use classifier::efficiency::EfficiencyAnalyzer;
use classifier::filter::FilterBuilder;
use classifier::forest::{Forest, WeightedTree};
use classifier::io::{CsvLoader, Subset, TableLoader};
use classifier::table::{Table, TrainingContext};
use classifier::tree::GrowthNode;
use classifier::AdaBoost;
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SubsetArg {
    All,
    Even,
    Odd,
    Random,
}

impl From<SubsetArg> for Subset {
    fn from(value: SubsetArg) -> Self {
        match value {
            SubsetArg::All => Subset::All,
            SubsetArg::Even => Subset::Even,
            SubsetArg::Odd => Subset::Odd,
            SubsetArg::Random => Subset::Random,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CriterionArg {
    Gini,
    Entropy,
}

impl From<CriterionArg> for Criterion {
    fn from(value: CriterionArg) -> Self {
        match value {
            CriterionArg::Gini => Criterion::Gini,
            CriterionArg::Entropy => Criterion::Entropy,
        }
    }
}

/// Train a decision-tree/boosted-forest classifier from a delimited table.
#[derive(Parser, Debug)]
#[command(name = "classifier-train", version, about)]
struct Cli {
    /// Input CSV table.
    #[arg(long)]
    input: PathBuf,

    /// Feature column names, in table order (excluding weight/kind columns).
    #[arg(long, value_delimiter = ',', required = true)]
    features: Vec<String>,

    /// The first CSV column carries a per-row weight.
    #[arg(long, default_value_t = false)]
    weights_in_column_0: bool,

    /// Which rows of the input to admit.
    #[arg(long, value_enum, default_value = "all")]
    subset: SubsetArg,

    /// Impurity criterion for split search.
    #[arg(long, value_enum, default_value = "gini")]
    criterion: CriterionArg,

    /// Minimum weighted record count before a node is split.
    #[arg(long)]
    min_size: Option<usize>,

    /// Number of AdaBoost rounds (1 disables boosting beyond the base tree).
    #[arg(long, default_value_t = 1)]
    boosting_rounds: usize,

    /// AdaBoost beta exponent.
    #[arg(long)]
    beta: Option<f64>,

    /// Decision cut separating predicted signal from predicted background.
    #[arg(long)]
    purity_cut: Option<f64>,

    /// Deterministic seed for subset == random.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Output forest text file.
    #[arg(long)]
    output: PathBuf,

    /// Optional cut-file prepended to the forest as a weight-0 filter.
    #[arg(long)]
    filter: Option<PathBuf>,

    /// Optional held-out table for an efficiency/background-rate report.
    #[arg(long)]
    eval: Option<PathBuf>,

    /// Optional path to write the loader's `LoadReport` as JSON.
    #[arg(long)]
    report_json: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config_builder = TrainerConfig::builder().criterion(cli.criterion.into());
    if let Some(min_size) = cli.min_size {
        config_builder = config_builder.min_size(min_size);
    }
    if let Some(beta) = cli.beta {
        config_builder = config_builder.beta(beta);
    }
    if let Some(purity_cut) = cli.purity_cut {
        config_builder = config_builder.purity_cut(purity_cut);
    }
    config_builder = config_builder.boosting_rounds(cli.boosting_rounds);
    let config = config_builder
        .build()
        .map_err(|e| anyhow::anyhow!(e))
        .context("invalid trainer configuration")?;

    let mut ctx = TrainingContext::new(cli.features.clone())
        .with_weights_as_column_0(cli.weights_in_column_0)
        .with_seed(cli.seed);

    let mut table = Table::new();
    let loader = CsvLoader::new(&cli.input).with_subset(cli.subset.into());
    let report = loader
        .load(&ctx, &mut table)
        .with_context(|| format!("loading {}", cli.input.display()))?;
    log::info!(
        "loaded {} records from {} (signal weight {:.3}, background weight {:.3})",
        report.records_loaded,
        report.source,
        report.total_signal_weight,
        report.total_background_weight
    );
    if let Some(report_path) = &cli.report_json {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(report_path, json)
            .with_context(|| format!("writing {}", report_path.display()))?;
    }

    table.normalize(0.5, 0.5);

    let criterion = config.criterion().as_dyn();
    let mut forest = Forest::new("classifier");
    let mut last_growth: Option<GrowthNode> = None;
    for round in 0..config.boosting_rounds() {
        let record_count = table.len();
        let growth_node = GrowthNode::grow_with_min_size(
            &mut table,
            &ctx,
            criterion.as_ref(),
            config.min_size(),
            0,
            record_count,
            1,
        )?;
        let root = growth_node.freeze();

        let single = {
            let mut f = Forest::new("classifier");
            f.push(WeightedTree::new(1.0, root.clone()));
            f
        };
        let alpha = AdaBoost::new()
            .with_beta(config.beta())
            .with_purity_cut(config.purity_cut())
            .boost(&single, &mut table)?;
        log::info!("round {}: alpha = {:.6}", round, alpha);

        forest.push(WeightedTree::new(alpha, root));
        last_growth = Some(growth_node);
    }

    if let Some(growth_node) = &last_growth {
        let mut leaves = Vec::new();
        growth_node.leaf_purities(&mut leaves);
        let curve = EfficiencyAnalyzer::from_leaf_purities(&leaves).finish();
        log::info!(
            "training-set sigma (from the final tree's leaf purities) = {:.4}",
            curve.sigma()
        );
    }

    if let Some(filter_path) = &cli.filter {
        let mut builder = FilterBuilder::new(&mut ctx);
        builder
            .add_cuts_from_file(filter_path)
            .with_context(|| format!("reading filter cuts from {}", filter_path.display()))?;
        forest.prepend(builder.close());
    }

    let out = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    forest.write_to(BufWriter::new(out))?;
    log::info!("wrote forest to {}", cli.output.display());

    if let Some(eval_path) = &cli.eval {
        let mut eval_table = Table::new();
        let eval_loader = CsvLoader::new(eval_path);
        eval_loader.load(&ctx, &mut eval_table)?;

        let mut analyzer = EfficiencyAnalyzer::new();
        for record in eval_table.records() {
            let purity = forest.evaluate(record.features())?;
            if record.signal() {
                analyzer.add(purity, record.sigwt(), 0.0);
            } else {
                analyzer.add(purity, 0.0, record.bkgwt());
            }
        }
        let curve = analyzer.finish();
        log::info!("sigma = {:.4}", curve.sigma());
        for (efficiency, background) in curve.efficiency_points().iter().step_by(10).take(10) {
            log::info!("efficiency={:.3} background={:.3}", efficiency, background);
        }
    }

    Ok(())
}

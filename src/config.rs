//! Trainer configuration: impurity criterion choice and the tunable
//! constants of §6, validated at build time.

use crate::boosting::{DEFAULT_BETA, DEFAULT_PURITY_CUT};
use crate::impurity::{Entropy, Gini, ImpurityCriterion};
use crate::tree::MIN_SIZE;

/// Which built-in impurity criterion to use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Criterion {
    Gini,
    Entropy,
}

impl Criterion {
    pub fn as_dyn(self) -> Box<dyn ImpurityCriterion> {
        match self {
            Criterion::Gini => Box::new(Gini),
            Criterion::Entropy => Box::new(Entropy),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainerConfig {
    criterion: Criterion,
    min_size: usize,
    beta: f64,
    purity_cut: f64,
    boosting_rounds: usize,
}

impl TrainerConfig {
    pub fn builder() -> TrainerConfigBuilder {
        TrainerConfigBuilder::default()
    }

    pub fn criterion(&self) -> Criterion {
        self.criterion
    }

    pub fn min_size(&self) -> usize {
        self.min_size
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn purity_cut(&self) -> f64 {
        self.purity_cut
    }

    pub fn boosting_rounds(&self) -> usize {
        self.boosting_rounds
    }

    fn validate(&self) -> Result<(), String> {
        if self.purity_cut <= 0.0 || self.purity_cut >= 1.0 {
            return Err(format!(
                "configuration parameter 'purityCut' which was equal to {}, must be strictly between 0 and 1",
                self.purity_cut
            ));
        }
        Ok(())
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            criterion: Criterion::Gini,
            min_size: MIN_SIZE,
            beta: DEFAULT_BETA,
            purity_cut: DEFAULT_PURITY_CUT,
            boosting_rounds: 1,
        }
    }
}

#[derive(Default)]
pub struct TrainerConfigBuilder {
    criterion: Option<Criterion>,
    min_size: Option<usize>,
    beta: Option<f64>,
    purity_cut: Option<f64>,
    boosting_rounds: Option<usize>,
}

impl TrainerConfigBuilder {
    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = Some(criterion);
        self
    }

    pub fn min_size(mut self, min_size: usize) -> Self {
        assert!(min_size >= 1, "minSize must be at least 1");
        self.min_size = Some(min_size);
        self
    }

    pub fn beta(mut self, beta: f64) -> Self {
        assert!(beta > 0.0, "beta must be positive");
        self.beta = Some(beta);
        self
    }

    pub fn purity_cut(mut self, purity_cut: f64) -> Self {
        self.purity_cut = Some(purity_cut);
        self
    }

    pub fn boosting_rounds(mut self, boosting_rounds: usize) -> Self {
        assert!(boosting_rounds >= 1, "boostingRounds must be at least 1");
        self.boosting_rounds = Some(boosting_rounds);
        self
    }

    pub fn build(self) -> Result<TrainerConfig, String> {
        let default = TrainerConfig::default();
        let config = TrainerConfig {
            criterion: self.criterion.unwrap_or(default.criterion),
            min_size: self.min_size.unwrap_or(default.min_size),
            beta: self.beta.unwrap_or(default.beta),
            purity_cut: self.purity_cut.unwrap_or(default.purity_cut),
            boosting_rounds: self.boosting_rounds.unwrap_or(default.boosting_rounds),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_numeric_constants() {
        let config = TrainerConfig::builder().build().unwrap();
        assert_eq!(config.min_size(), MIN_SIZE);
        assert_eq!(config.beta(), DEFAULT_BETA);
        assert_eq!(config.purity_cut(), DEFAULT_PURITY_CUT);
    }

    #[test]
    fn out_of_range_purity_cut_is_rejected() {
        let err = TrainerConfig::builder()
            .purity_cut(1.5)
            .build()
            .unwrap_err();
        assert!(err.contains("purityCut"));
    }
}

use std::fmt::Display;

use average::{self, concatenate, Estimate, Max, Mean, Min, Variance};
use itertools::Itertools;

pub use jfr_plot_cli_types::ReductionFunc;

use readable::num::*;

pub trait VecAggregation {
    fn median(&mut self) -> Option<f64>;
}

concatenate!(
    AggStats,
    [Mean, mean],
    [Variance, sample_variance],
    [Min, min],
    [Max, max]
);

pub fn aggregate_measurements(measurements: impl Iterator<Item = f64>) -> Stats {
    let s: AggStats = measurements.collect();
    let len = s.mean.len() as usize;
    Stats {
        mean: s.mean(),
        // sample variance is undefined below two measurements
        stddev: if len < 2 { 0.0 } else { s.sample_variance().sqrt() },
        min: if len == 0 { 0.0 } else { s.min() },
        max: if len == 0 { 0.0 } else { s.max() },
        len,
    }
}

#[derive(Debug)]
pub struct Stats {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub len: usize,
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "μ: {} σ: {} min: {} max: {} n: {}",
            Float::from(self.mean),
            Float::from(self.stddev),
            Float::from(self.min),
            Float::from(self.max),
            Unsigned::from(self.len),
        )
    }
}

impl VecAggregation for Vec<f64> {
    fn median(&mut self) -> Option<f64> {
        self.sort_by(f64::total_cmp);
        match self.len() {
            0 => None,
            even if even % 2 == 0 => {
                let left = self[even / 2 - 1];
                let right = self[even / 2];
                Some((left + right) / 2.0)
            }
            odd => Some(self[odd / 2]),
        }
    }
}

pub trait NumericReductionFunc: Iterator<Item = f64> {
    fn aggregate_by(&mut self, fun: ReductionFunc) -> Option<Self::Item> {
        match fun {
            ReductionFunc::Min => self.reduce(f64::min),
            ReductionFunc::Max => self.reduce(f64::max),
            ReductionFunc::Median => self.collect_vec().median(),
            ReductionFunc::Mean => {
                let stats: AggStats = self.collect();
                if stats.mean.is_empty() {
                    None
                } else {
                    Some(stats.mean())
                }
            }
        }
    }
}

impl<T> NumericReductionFunc for T where T: Iterator<Item = f64> {}

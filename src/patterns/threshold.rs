//! Threshold Effects
//!
//! Detects non-linear "step" relationships: the output barely moves until
//! the input crosses some value, then jumps.

use crate::records::MetricSeries;
use crate::stats::mean;
use serde::Serialize;

/// Number of equal-size quantile bins
pub const QUANTILE_BINS: usize = 5;

/// Minimum aligned pairs (two per bin)
pub const MIN_THRESHOLD_PAIRS: usize = QUANTILE_BINS * 2;

/// One quantile bin of sorted input values
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuantileBin {
    pub mean_input: f64,
    pub mean_output: f64,
    pub min_input: f64,
    pub max_input: f64,
    pub count: usize,
}

/// The largest jump in mean output between adjacent bins
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThresholdEffect {
    pub input_metric: String,
    pub output_metric: String,
    /// Mean input of the bin where the output jumps
    pub inflection_value: f64,
    /// Signed change in mean output across the boundary
    pub effect_size: f64,
    pub bins: Vec<QuantileBin>,
}

/// Find the threshold effect of `input` on `output`
pub fn threshold_effect(input: &MetricSeries, output: &MetricSeries) -> Option<ThresholdEffect> {
    let (x, y) = input.paired_with(output);
    if x.len() < MIN_THRESHOLD_PAIRS {
        return None;
    }

    let mut pairs: Vec<(f64, f64)> = x.into_iter().zip(y).collect();
    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    let size = pairs.len() / QUANTILE_BINS;
    let bins: Vec<QuantileBin> = (0..QUANTILE_BINS)
        .filter_map(|k| {
            let start = k * size;
            let end = if k == QUANTILE_BINS - 1 {
                pairs.len()
            } else {
                start + size
            };
            let slice = &pairs[start..end];
            let inputs: Vec<f64> = slice.iter().map(|p| p.0).collect();
            let outputs: Vec<f64> = slice.iter().map(|p| p.1).collect();

            Some(QuantileBin {
                mean_input: mean(&inputs)?,
                mean_output: mean(&outputs)?,
                min_input: slice.first()?.0,
                max_input: slice.last()?.0,
                count: slice.len(),
            })
        })
        .collect();

    if bins.len() < 2 {
        return None;
    }

    let (boundary, jump) = bins
        .windows(2)
        .enumerate()
        .map(|(k, w)| (k, w[1].mean_output - w[0].mean_output))
        .fold(None::<(usize, f64)>, |best, (k, jump)| match best {
            Some((_, b)) if b.abs() >= jump.abs() => best,
            _ => Some((k, jump)),
        })?;

    Some(ThresholdEffect {
        input_metric: input.name.clone(),
        output_metric: output.name.clone(),
        inflection_value: bins[boundary + 1].mean_input,
        effect_size: jump,
        bins,
    })
}

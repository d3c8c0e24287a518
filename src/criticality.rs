use log::info;
use thiserror::Error;

use crate::avalanche::{self, ActivityHistogram, AvalancheSet};
use crate::density::{self, DensityHistogram};
use crate::params::LayerParams;
use crate::pooling;
use crate::power_law::{self, PowerLawFit};
use crate::recording::DataStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayerError {
    #[error("layer {layer}: populations {missing:?} not part of data store populations {available:?}")]
    MissingPopulations {
        layer: String,
        missing: Vec<String>,
        available: Vec<String>,
    },
    #[error("layer {layer} has no populations")]
    NoPopulations { layer: String },
    #[error("population {population} has {count} spontaneous activity segments, expected exactly one")]
    UnexpectedSegmentCount { population: String, count: usize },
    #[error("population {population} has a segment without spike trains")]
    NoSpikeTrains { population: String },
    #[error("{count} pooled spikes are too few to estimate a bin width")]
    TooFewSpikes { count: usize },
    #[error("estimated bin width {bin_width} is not strictly positive")]
    NonPositiveBinWidth { bin_width: f64 },
    #[error("recording window needs {num_bins} activity bins, at most {max_bins} are supported")]
    TooManyBins { num_bins: f64, max_bins: usize },
}

/// Deviation of the measured size-duration exponent `beta` from the one
/// predicted by the duration and size distribution exponents.
pub fn distance_to_criticality(duration_slope: f64, size_slope: f64, beta: f64) -> f64 {
    let predicted_beta = (-duration_slope - 1.0) / (-size_slope - 1.0);
    (beta - predicted_beta).abs()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriticalityResult {
    pub stimulus_id: String,
    pub distance_to_criticality: f64,
    pub bin_width: f64,
    pub avalanche_set: AvalancheSet,
    pub size_histogram: DensityHistogram,
    pub size_fit: PowerLawFit,
    pub duration_histogram: DensityHistogram,
    pub duration_fit: PowerLawFit,
    pub scaling_fit: PowerLawFit,
}

impl CriticalityResult {
    pub fn beta(&self) -> f64 {
        self.scaling_fit.slope()
    }
}

pub fn analyze_layer(
    store: &dyn DataStore,
    layer_params: &LayerParams,
    bin_length: usize,
) -> Result<CriticalityResult, LayerError> {
    let pooled_spikes = pooling::pool_layer_spikes(store, layer_params)?;
    let bin_width = avalanche::estimate_bin_width(&pooled_spikes.times)?;

    let activity = ActivityHistogram::from_pooled_spikes(&pooled_spikes, bin_width)?;
    let avalanche_set = avalanche::extract_avalanches(&activity);

    let durations = avalanche_set.durations();
    let sizes = avalanche_set.sizes();

    let size_histogram = density::create_density_histogram(&sizes, bin_length);
    let size_fit = power_law::fit_power_law_distribution(&size_histogram, "size");

    let duration_histogram = density::create_density_histogram(&durations, bin_length);
    let duration_fit = power_law::fit_power_law_distribution(&duration_histogram, "duration");

    let scaling_fit = power_law::fit_size_duration_scaling(&durations, &sizes);

    let distance_to_criticality =
        distance_to_criticality(duration_fit.slope(), size_fit.slope(), scaling_fit.slope());

    info!(
        "layer {}: bin width {:.6} s, {} avalanches, distance to criticality {:.4}",
        layer_params.name,
        bin_width,
        avalanche_set.len(),
        distance_to_criticality
    );

    Ok(CriticalityResult {
        stimulus_id: pooled_spikes.stimulus_id,
        distance_to_criticality,
        bin_width,
        avalanche_set,
        size_histogram,
        size_fit,
        duration_histogram,
        duration_fit,
        scaling_fit,
    })
}

use itertools::Itertools;

use crate::criticality::LayerError;
use crate::pooling::PooledSpikes;

/// Upper bound on the number of activity bins of a single layer.
pub const MAX_ACTIVITY_BINS: usize = 1 << 26;

/// Mean inter-spike interval of the pooled spike train.
pub fn estimate_bin_width(spike_times: &[f64]) -> Result<f64, LayerError> {
    if spike_times.len() < 2 {
        return Err(LayerError::TooFewSpikes {
            count: spike_times.len(),
        });
    }

    let mut sorted_times = spike_times.to_vec();
    sorted_times.sort_by(f64::total_cmp);

    let num_intervals = sorted_times.len() - 1;
    let interval_sum: f64 = sorted_times
        .iter()
        .tuple_windows()
        .map(|(earlier, later)| later - earlier)
        .sum();

    let bin_width = interval_sum / num_intervals as f64;

    if bin_width > 0.0 && bin_width.is_finite() {
        Ok(bin_width)
    } else {
        Err(LayerError::NonPositiveBinWidth { bin_width })
    }
}

/// Population activity, one spike count per bin.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityHistogram {
    pub bin_width: f64,
    pub edges: Vec<f64>,
    pub counts: Vec<u64>,
}

impl ActivityHistogram {
    /// Bins `spike_times` with edges `t_start + i * bin_width` strictly below `t_stop`.
    /// The last bin is closed, spikes outside the edges are dropped. Fails
    /// before allocating if the window needs more than [`MAX_ACTIVITY_BINS`] bins.
    pub fn new(
        spike_times: &[f64],
        t_start: f64,
        t_stop: f64,
        bin_width: f64,
    ) -> Result<Self, LayerError> {
        let edges = create_edges(t_start, t_stop, bin_width)?;
        let num_bins = edges.len().saturating_sub(1);
        let mut counts = vec![0; num_bins];

        if num_bins > 0 {
            let first_edge = edges[0];
            let last_edge = edges[num_bins];

            for &t in spike_times {
                if t < first_edge || t > last_edge {
                    continue;
                }

                let bin_idx = (edges.partition_point(|edge| *edge <= t) - 1).min(num_bins - 1);
                counts[bin_idx] += 1;
            }
        }

        Ok(Self {
            bin_width,
            edges,
            counts,
        })
    }

    pub fn from_pooled_spikes(
        pooled_spikes: &PooledSpikes,
        bin_width: f64,
    ) -> Result<Self, LayerError> {
        Self::new(
            &pooled_spikes.times,
            pooled_spikes.t_start,
            pooled_spikes.t_stop,
            bin_width,
        )
    }

    pub fn zero_bin_indices(&self) -> Vec<usize> {
        self.counts
            .iter()
            .positions(|count| *count == 0)
            .collect()
    }
}

fn create_edges(t_start: f64, t_stop: f64, step: f64) -> Result<Vec<f64>, LayerError> {
    let span = t_stop - t_start;

    if !(span > 0.0) || !(step > 0.0) {
        return Ok(Vec::new());
    }

    let num_edges = (span / step).ceil();

    // one more edge than bins
    if !num_edges.is_finite() || num_edges > (MAX_ACTIVITY_BINS + 1) as f64 {
        return Err(LayerError::TooManyBins {
            num_bins: num_edges - 1.0,
            max_bins: MAX_ACTIVITY_BINS,
        });
    }

    Ok((0..num_edges as usize)
        .map(|edge_idx| t_start + edge_idx as f64 * step)
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Avalanche {
    pub duration: f64,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvalancheSet {
    pub avalanches: Vec<Avalanche>,
}

impl AvalancheSet {
    pub fn len(&self) -> usize {
        self.avalanches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avalanches.is_empty()
    }

    pub fn durations(&self) -> Vec<f64> {
        self.avalanches
            .iter()
            .map(|avalanche| avalanche.duration)
            .collect()
    }

    pub fn sizes(&self) -> Vec<f64> {
        self.avalanches
            .iter()
            .map(|avalanche| avalanche.size as f64)
            .collect()
    }
}

/// Splits the activity at its silent bins. Runs shorter than two bins and
/// activity before the first or after the last silent bin are discarded.
pub fn extract_avalanches(histogram: &ActivityHistogram) -> AvalancheSet {
    let bin_width = histogram.bin_width;

    let avalanches = histogram
        .zero_bin_indices()
        .into_iter()
        .tuple_windows()
        .map(|(zero_idx, next_zero_idx)| Avalanche {
            duration: (next_zero_idx - zero_idx) as f64 * bin_width,
            size: histogram.counts[zero_idx..next_zero_idx].iter().sum(),
        })
        .filter(|avalanche| avalanche.duration > bin_width && avalanche.size > 0)
        .collect();

    AvalancheSet { avalanches }
}

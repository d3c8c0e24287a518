use crate::util::uniform_edges;

/// Empirical probability density over equally wide bins.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityHistogram {
    pub density: Vec<f64>,
    pub bin_centers: Vec<f64>,
}

impl DensityHistogram {
    pub fn num_bins(&self) -> usize {
        self.density.len()
    }
}

pub fn create_density_histogram(data: &[f64], num_bins: usize) -> DensityHistogram {
    if num_bins == 0 {
        return DensityHistogram {
            density: Vec::new(),
            bin_centers: Vec::new(),
        };
    }

    let (first_edge, last_edge) = get_outer_edges(data);
    let edges = uniform_edges(first_edge, last_edge, num_bins);
    let counts = count_uniform_bins(data, &edges);

    let total: u64 = counts.iter().sum();

    let density = counts
        .iter()
        .zip(edges.windows(2))
        .map(|(count, edge_pair)| {
            if total == 0 {
                0.0
            } else {
                *count as f64 / total as f64 / (edge_pair[1] - edge_pair[0])
            }
        })
        .collect();

    let half_width = (edges[1] - edges[0]) / 2.0;
    let bin_centers = edges[..num_bins]
        .iter()
        .map(|edge| edge + half_width)
        .collect();

    DensityHistogram {
        density,
        bin_centers,
    }
}

fn get_outer_edges(data: &[f64]) -> (f64, f64) {
    if data.is_empty() {
        return (0.0, 1.0);
    }

    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

fn count_uniform_bins(data: &[f64], edges: &[f64]) -> Vec<u64> {
    let num_bins = edges.len() - 1;
    let first_edge = edges[0];
    let last_edge = edges[num_bins];
    let norm = num_bins as f64 / (last_edge - first_edge);

    let mut counts = vec![0; num_bins];

    for &value in data {
        if !(value >= first_edge && value <= last_edge) {
            continue;
        }

        let mut bin_idx = (((value - first_edge) * norm) as usize).min(num_bins - 1);

        // the scaled index can be off by one near an edge
        if bin_idx > 0 && value < edges[bin_idx] {
            bin_idx -= 1;
        } else if bin_idx < num_bins - 1 && value >= edges[bin_idx + 1] {
            bin_idx += 1;
        }

        counts[bin_idx] += 1;
    }

    counts
}

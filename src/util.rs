pub fn powerlaw(x: f64, amplitude: f64, slope: f64) -> f64 {
    amplitude * x.powf(slope)
}

/// `num_bins + 1` equally spaced edges, the last one pinned to `last`.
pub fn uniform_edges(first: f64, last: f64, num_bins: usize) -> Vec<f64> {
    let step = (last - first) / num_bins as f64;

    (0..=num_bins)
        .map(|edge_idx| {
            if edge_idx == num_bins {
                last
            } else {
                first + edge_idx as f64 * step
            }
        })
        .collect()
}

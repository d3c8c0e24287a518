use crate::criticality::LayerError;
use crate::params::LayerParams;
use crate::recording::DataStore;

/// Spikes of all populations of one layer, in no particular order.
///
/// The recording window and stimulus are those of the first spike train of
/// the last population; all populations of a layer share one window.
#[derive(Debug, Clone, PartialEq)]
pub struct PooledSpikes {
    pub times: Vec<f64>,
    pub t_start: f64,
    pub t_stop: f64,
    pub stimulus_id: String,
}

pub fn pool_layer_spikes(
    store: &dyn DataStore,
    layer_params: &LayerParams,
) -> Result<PooledSpikes, LayerError> {
    let available = store.population_names();

    let missing: Vec<String> = layer_params
        .populations
        .iter()
        .filter(|population| !available.contains(&population.as_str()))
        .cloned()
        .collect();

    if !missing.is_empty() {
        return Err(LayerError::MissingPopulations {
            layer: layer_params.name.clone(),
            missing,
            available: available.iter().map(|name| name.to_string()).collect(),
        });
    }

    let mut times = Vec::new();
    let mut window_and_stimulus = None;

    for population in &layer_params.populations {
        let segments = store.spontaneous_segments(population);

        if segments.len() != 1 {
            return Err(LayerError::UnexpectedSegmentCount {
                population: population.clone(),
                count: segments.len(),
            });
        }

        let segment = segments[0];

        let first_spike_train =
            segment
                .spike_trains
                .first()
                .ok_or_else(|| LayerError::NoSpikeTrains {
                    population: population.clone(),
                })?;

        window_and_stimulus = Some((
            first_spike_train.t_start,
            first_spike_train.t_stop,
            segment.stimulus_id.clone(),
        ));

        for spike_train in &segment.spike_trains {
            times.extend_from_slice(&spike_train.times);
        }
    }

    let (t_start, t_stop, stimulus_id) =
        window_and_stimulus.ok_or_else(|| LayerError::NoPopulations {
            layer: layer_params.name.clone(),
        })?;

    Ok(PooledSpikes {
        times,
        t_start,
        t_stop,
        stimulus_id,
    })
}

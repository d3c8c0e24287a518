use criticality::params::AnalysisParams;
use criticality::recording::{InMemoryDataStore, Segment, SpikeTrain};
use rand::{distributions::Uniform, prelude::Distribution, rngs::StdRng, SeedableRng};
use statrs::distribution::Poisson;

pub fn get_scenario_params() -> AnalysisParams {
    let params_yaml_str = r#"
bin_length: 20
layers:
- name: V1_L2/3
  populations:
  - V1_Exc_L2/3
  - V1_Inh_L2/3
- name: V1_L4
  populations:
  - V1_Exc_L4
  - V1_Inh_L4
"#;

    serde_yaml::from_str(params_yaml_str).unwrap()
}

#[derive(Debug, Clone)]
pub struct BranchingParams {
    pub branching_ratio: f64,
    /// Expected number of externally driven spikes per time step.
    pub drive: f64,
    pub time_step: f64,
    pub num_steps: usize,
    pub max_activity: f64,
    pub num_spike_trains: usize,
}

impl Default for BranchingParams {
    fn default() -> Self {
        Self {
            branching_ratio: 0.98,
            drive: 0.02,
            time_step: 0.004,
            num_steps: 50000,
            max_activity: 200.0,
            num_spike_trains: 50,
        }
    }
}

/// Spontaneous activity of a branching process, every spike assigned to a
/// random spike train of a random population of the layer.
pub fn generate_branching_recording(
    branching_params: &BranchingParams,
    layers: &[Vec<&str>],
    seed: u64,
) -> InMemoryDataStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let jitter_dist = Uniform::new(0.0, branching_params.time_step);
    let t_stop = branching_params.num_steps as f64 * branching_params.time_step;

    let stimulus_id = format!("InternalStimulus(duration={})", t_stop);

    let mut store = InMemoryDataStore::new();

    for populations in layers {
        let train_dist = Uniform::new(0, populations.len() * branching_params.num_spike_trains);
        let mut spike_times = vec![Vec::new(); populations.len() * branching_params.num_spike_trains];
        let mut activity = 0.0;

        for step in 0..branching_params.num_steps {
            let rate = branching_params.branching_ratio * activity + branching_params.drive;
            activity = Poisson::new(rate)
                .unwrap()
                .sample(&mut rng)
                .min(branching_params.max_activity);

            for _ in 0..(activity as usize) {
                let t = step as f64 * branching_params.time_step + jitter_dist.sample(&mut rng);
                spike_times[train_dist.sample(&mut rng)].push(t);
            }
        }

        for (pop_idx, population) in populations.iter().enumerate() {
            let start = pop_idx * branching_params.num_spike_trains;
            let end = start + branching_params.num_spike_trains;

            let spike_trains = spike_times[start..end]
                .iter()
                .map(|times| SpikeTrain::new(times.clone(), 0.0, t_stop))
                .collect();

            store.add_segment(
                population,
                Segment::spontaneous(&stimulus_id, spike_trains),
            );
        }
    }

    store
}

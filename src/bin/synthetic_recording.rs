use std::time::Instant;

use criticality::{analysis, results::InMemoryResultStore};

#[path = "../scenario_params.rs"]
mod scenario_params;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let seed = std::env::args()
        .nth(1)
        .map(|arg| arg.parse().unwrap())
        .unwrap_or(0);

    let params = scenario_params::get_scenario_params();
    let layers: Vec<Vec<&str>> = params
        .layers
        .iter()
        .map(|layer| layer.populations.iter().map(String::as_str).collect())
        .collect();

    let store = scenario_params::generate_branching_recording(
        &scenario_params::BranchingParams::default(),
        &layers,
        seed,
    );

    let analysis = analysis::create_analysis(params.clone())
        .unwrap()
        .with_tags(&["synthetic"]);
    let mut sink = InMemoryResultStore::new();

    let wall_start = Instant::now();
    let outcomes = analysis.perform_analysis(&store, &mut sink);
    let wall_time = wall_start.elapsed();

    for outcome in outcomes {
        match outcome.result {
            Ok(result) => eprintln!(
                "{}: distance to criticality {:.4} (beta {:.4}, {} avalanches)",
                outcome.layer_name,
                result.distance_to_criticality,
                result.beta(),
                result.avalanche_set.len()
            ),
            Err(layer_error) => eprintln!("{}: skipped ({})", outcome.layer_name, layer_error),
        }
    }

    eprintln!("Records emitted: {}", sink.records.len());
    eprintln!("Analysis wall time: {:.3} s", wall_time.as_secs_f64());
}

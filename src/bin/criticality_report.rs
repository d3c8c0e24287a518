use std::error::Error;
use std::{env, fs, process};

use criticality::{
    analysis, params::AnalysisParams, recording::InMemoryDataStore, results::InMemoryResultStore,
};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("usage: {} <params.yaml> <recording.json>", args[0]);
        process::exit(2);
    }

    let params: AnalysisParams = serde_yaml::from_str(&fs::read_to_string(&args[1])?)?;
    let store: InMemoryDataStore = serde_json::from_str(&fs::read_to_string(&args[2])?)?;

    let analysis = analysis::create_analysis(params)?;
    let mut sink = InMemoryResultStore::new();

    let outcomes = analysis.perform_analysis(&store, &mut sink);
    let num_analyzed = outcomes
        .iter()
        .filter(|outcome| outcome.result.is_ok())
        .count();

    eprintln!("Analyzed {} of {} layers", num_analyzed, outcomes.len());
    println!("{}", serde_json::to_string_pretty(&sink)?);

    Ok(())
}

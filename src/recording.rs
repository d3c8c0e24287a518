use serde::{Deserialize, Serialize};

/// Stimulus name under which spontaneous activity is recorded.
pub const SPONTANEOUS_STIMULUS: &str = "InternalStimulus";

/// Spike times in seconds, recorded within `[t_start, t_stop]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeTrain {
    pub times: Vec<f64>,
    pub t_start: f64,
    pub t_stop: f64,
}

impl SpikeTrain {
    pub fn new(times: Vec<f64>, t_start: f64, t_stop: f64) -> Self {
        Self {
            times,
            t_start,
            t_stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub stimulus_name: String,
    pub stimulus_id: String,
    pub spike_trains: Vec<SpikeTrain>,
}

impl Segment {
    pub fn spontaneous(stimulus_id: &str, spike_trains: Vec<SpikeTrain>) -> Self {
        Self {
            stimulus_name: SPONTANEOUS_STIMULUS.to_string(),
            stimulus_id: stimulus_id.to_string(),
            spike_trains,
        }
    }

    pub fn is_spontaneous(&self) -> bool {
        self.stimulus_name == SPONTANEOUS_STIMULUS
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecording {
    pub name: String,
    pub segments: Vec<Segment>,
}

pub trait DataStore {
    fn population_names(&self) -> Vec<&str>;

    fn spontaneous_segments(&self, population: &str) -> Vec<&Segment>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryDataStore {
    pub populations: Vec<PopulationRecording>,
}

impl InMemoryDataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, population: &str, segment: Segment) {
        match self
            .populations
            .iter_mut()
            .find(|recording| recording.name == population)
        {
            Some(recording) => recording.segments.push(segment),
            None => self.populations.push(PopulationRecording {
                name: population.to_string(),
                segments: vec![segment],
            }),
        }
    }

    pub fn remove_population(&mut self, population: &str) {
        self.populations.retain(|recording| recording.name != population);
    }
}

impl DataStore for InMemoryDataStore {
    fn population_names(&self) -> Vec<&str> {
        self.populations
            .iter()
            .map(|recording| recording.name.as_str())
            .collect()
    }

    fn spontaneous_segments(&self, population: &str) -> Vec<&Segment> {
        self.populations
            .iter()
            .filter(|recording| recording.name == population)
            .flat_map(|recording| recording.segments.iter())
            .filter(|segment| segment.is_spontaneous())
            .collect()
    }
}

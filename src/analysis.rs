use crate::criticality::{self, CriticalityResult, LayerError};
use crate::params::{self, AnalysisParams};
use crate::recording::DataStore;
use crate::results::{self, ResultSink};
use log::warn;
use simple_error::{try_with, SimpleError};

pub fn create_analysis(params: AnalysisParams) -> Result<CriticalityAnalysis, SimpleError> {
    try_with!(
        params::validate_analysis_params(&params),
        "invalid analysis parameters"
    );

    Ok(CriticalityAnalysis {
        params,
        tags: Vec::new(),
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerOutcome {
    pub layer_name: String,
    pub result: Result<CriticalityResult, LayerError>,
}

/// Distance to criticality per layer, computed on spontaneous activity.
///
/// Ma Z., Turrigiano G.G., Wessel R., Hengen K.B. (2019). Cortical Circuit
/// Dynamics Are Homeostatically Tuned to Criticality In Vivo. Neuron.
#[derive(Debug, Clone)]
pub struct CriticalityAnalysis {
    params: AnalysisParams,
    tags: Vec<String>,
}

impl CriticalityAnalysis {
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|tag| tag.to_string()).collect();
        self
    }

    pub fn get_params(&self) -> &AnalysisParams {
        &self.params
    }

    pub fn get_tags(&self) -> &[String] {
        &self.tags
    }

    /// Analyzes every configured layer and emits the results of the successful
    /// ones. A failing layer is skipped with a warning.
    pub fn perform_analysis(
        &self,
        store: &dyn DataStore,
        sink: &mut dyn ResultSink,
    ) -> Vec<LayerOutcome> {
        let mut outcomes = Vec::with_capacity(self.params.layers.len());

        for layer_params in &self.params.layers {
            let result = criticality::analyze_layer(store, layer_params, self.params.bin_length);

            match &result {
                Ok(criticality_result) => {
                    results::emit_layer_results(sink, layer_params, criticality_result, &self.tags)
                }
                Err(layer_error) => warn!("Skipping layer {}: {}", layer_params.name, layer_error),
            }

            outcomes.push(LayerOutcome {
                layer_name: layer_params.name.clone(),
                result,
            });
        }

        outcomes
    }
}

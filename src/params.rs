use serde::{Deserialize, Serialize};
use simple_error::SimpleError;

use crate::types::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Number of bins of the avalanche size and duration distributions.
    pub bin_length: usize,
    pub layers: Vec<LayerParams>,
}

/// Anatomical layer whose populations are pooled into a single spike train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerParams {
    pub name: String,
    pub populations: Vec<String>,
}

impl LayerParams {
    pub fn new(name: &str, populations: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            populations: populations.iter().map(|pop| pop.to_string()).collect(),
        }
    }

    pub fn v1_defaults() -> Vec<LayerParams> {
        vec![
            LayerParams::new("V1_L2/3", &["V1_Exc_L2/3", "V1_Inh_L2/3"]),
            LayerParams::new("V1_L4", &["V1_Exc_L4", "V1_Inh_L4"]),
        ]
    }
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            bin_length: 10,
            layers: LayerParams::v1_defaults(),
        }
    }
}

pub fn validate_analysis_params(analysis_params: &AnalysisParams) -> Result<(), SimpleError> {
    if analysis_params.bin_length == 0 {
        return Err(SimpleError::new("bin_length must be strictly positive"));
    }

    if analysis_params.layers.is_empty() {
        return Err(SimpleError::new("at least one layer must be configured"));
    }

    let mut seen_layer_names = HashSet::default();

    for layer_params in &analysis_params.layers {
        if !seen_layer_names.insert(layer_params.name.as_str()) {
            return Err(SimpleError::new(format!(
                "duplicate layer name: {}",
                layer_params.name
            )));
        }

        validate_layer_params(layer_params)?;
    }

    Ok(())
}

fn validate_layer_params(layer_params: &LayerParams) -> Result<(), SimpleError> {
    if layer_params.name.is_empty() {
        return Err(SimpleError::new("layer name must not be empty"));
    }

    if layer_params.populations.is_empty() {
        return Err(SimpleError::new(format!(
            "layer {} must have at least one population",
            layer_params.name
        )));
    }

    let mut seen_populations = HashSet::default();

    for population in &layer_params.populations {
        if !seen_populations.insert(population.as_str()) {
            return Err(SimpleError::new(format!(
                "duplicate population {} in layer {}",
                population, layer_params.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn valid_params() {
        let params = AnalysisParams::default();
        assert!(validate_analysis_params(&params).is_ok());
    }

    #[test]
    fn zero_bin_length() {
        let mut params = AnalysisParams::default();
        params.bin_length = 0;
        let result = validate_analysis_params(&params);

        assert!(result.is_err());

        assert_eq!(
            result.unwrap_err().as_str(),
            "bin_length must be strictly positive"
        );
    }

    #[test]
    fn no_layers() {
        let mut params = AnalysisParams::default();
        params.layers.clear();
        let result = validate_analysis_params(&params);

        assert!(result.is_err());

        assert_eq!(
            result.unwrap_err().as_str(),
            "at least one layer must be configured"
        );
    }

    #[test]
    fn empty_layer_name() {
        let mut params = AnalysisParams::default();
        params.layers[1].name = String::new();
        let result = validate_analysis_params(&params);

        assert!(result.is_err());

        assert_eq!(result.unwrap_err().as_str(), "layer name must not be empty");
    }

    #[test]
    fn duplicate_layer_name() {
        let mut params = AnalysisParams::default();
        params.layers[1].name = "V1_L2/3".to_string();
        let result = validate_analysis_params(&params);

        assert!(result.is_err());

        assert_eq!(
            result.unwrap_err().as_str(),
            "duplicate layer name: V1_L2/3"
        );
    }

    #[test]
    fn layer_without_populations() {
        let mut params = AnalysisParams::default();
        params.layers[0].populations.clear();
        let result = validate_analysis_params(&params);

        assert!(result.is_err());

        assert_eq!(
            result.unwrap_err().as_str(),
            "layer V1_L2/3 must have at least one population"
        );
    }

    #[test]
    fn duplicate_population() {
        let mut params = AnalysisParams::default();
        params.layers[1].populations[1] = "V1_Exc_L4".to_string();
        let result = validate_analysis_params(&params);

        assert!(result.is_err());

        assert_eq!(
            result.unwrap_err().as_str(),
            "duplicate population V1_Exc_L4 in layer V1_L4"
        );
    }

    #[test]
    fn deserialize_from_yaml() {
        let params_yaml_str = r#"
bin_length: 25
layers:
- name: L5
  populations:
  - V1_Exc_L5
  - V1_Inh_L5
"#;

        let params: AnalysisParams = serde_yaml::from_str(params_yaml_str).unwrap();

        assert_eq!(params.bin_length, 25);
        assert_eq!(
            params.layers,
            vec![LayerParams::new("L5", &["V1_Exc_L5", "V1_Inh_L5"])]
        );
        assert!(validate_analysis_params(&params).is_ok());
    }
}

use serde::{Deserialize, Serialize};

use crate::criticality::CriticalityResult;
use crate::params::LayerParams;
use crate::power_law::PowerLawFit;

pub const ANALYSIS_ALGORITHM: &str = "CriticalityAnalysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Seconds,
    Dimensionless,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordTags {
    pub value_name: String,
    pub sheet_name: String,
    pub analysis_algorithm: String,
    pub stimulus_id: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnalysisRecord {
    SingleValue {
        value: f64,
        unit: Unit,
        record_tags: RecordTags,
    },
    SingleValueList {
        values: Vec<f64>,
        unit: Unit,
        record_tags: RecordTags,
    },
}

impl AnalysisRecord {
    pub fn record_tags(&self) -> &RecordTags {
        match self {
            AnalysisRecord::SingleValue { record_tags, .. } => record_tags,
            AnalysisRecord::SingleValueList { record_tags, .. } => record_tags,
        }
    }

    pub fn unit(&self) -> Unit {
        match self {
            AnalysisRecord::SingleValue { unit, .. } => *unit,
            AnalysisRecord::SingleValueList { unit, .. } => *unit,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            AnalysisRecord::SingleValue { value, .. } => Some(*value),
            AnalysisRecord::SingleValueList { .. } => None,
        }
    }

    pub fn values(&self) -> Option<&[f64]> {
        match self {
            AnalysisRecord::SingleValue { .. } => None,
            AnalysisRecord::SingleValueList { values, .. } => Some(values),
        }
    }
}

pub trait ResultSink {
    fn add_analysis_result(&mut self, record: AnalysisRecord);
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryResultStore {
    pub records: Vec<AnalysisRecord>,
}

impl InMemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, sheet_name: &str, value_name: &str) -> Option<&AnalysisRecord> {
        self.records.iter().find(|record| {
            let record_tags = record.record_tags();
            record_tags.sheet_name == sheet_name && record_tags.value_name == value_name
        })
    }

    pub fn records_for_sheet<'a>(
        &'a self,
        sheet_name: &'a str,
    ) -> impl Iterator<Item = &'a AnalysisRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| record.record_tags().sheet_name == sheet_name)
    }
}

impl ResultSink for InMemoryResultStore {
    fn add_analysis_result(&mut self, record: AnalysisRecord) {
        self.records.push(record);
    }
}

struct RecordFactory<'a> {
    sheet_name: &'a str,
    stimulus_id: &'a str,
    tags: &'a [String],
}

impl RecordFactory<'_> {
    fn record_tags(&self, value_name: &str) -> RecordTags {
        RecordTags {
            value_name: value_name.to_string(),
            sheet_name: self.sheet_name.to_string(),
            analysis_algorithm: ANALYSIS_ALGORITHM.to_string(),
            stimulus_id: self.stimulus_id.to_string(),
            tags: self.tags.to_vec(),
        }
    }

    fn single_value(&self, value_name: &str, value: f64, unit: Unit) -> AnalysisRecord {
        AnalysisRecord::SingleValue {
            value,
            unit,
            record_tags: self.record_tags(value_name),
        }
    }

    fn single_value_list(&self, value_name: &str, values: &[f64], unit: Unit) -> AnalysisRecord {
        AnalysisRecord::SingleValueList {
            values: values.to_vec(),
            unit,
            record_tags: self.record_tags(value_name),
        }
    }

    fn fit_records(&self, prefix: &str, fit: &PowerLawFit) -> [AnalysisRecord; 4] {
        let params = fit.params();
        [
            ("Amplitude", params.amplitude),
            ("Slope", params.slope),
            ("ErrorSq", params.error_sq),
            ("ErrorDiff", params.error_diff),
        ]
        .map(|(suffix, value)| {
            self.single_value(&format!("{}{}", prefix, suffix), value, Unit::Dimensionless)
        })
    }

    fn layer_records(&self, result: &CriticalityResult) -> Vec<AnalysisRecord> {
        let mut records = vec![
            self.single_value(
                "DistanceToCriticality",
                result.distance_to_criticality,
                Unit::Dimensionless,
            ),
            self.single_value("AvalancheBinSize", result.bin_width, Unit::Seconds),
            self.single_value_list(
                "AvalancheDurations",
                &result.avalanche_set.durations(),
                Unit::Seconds,
            ),
            self.single_value_list(
                "AvalancheSizes",
                &result.avalanche_set.sizes(),
                Unit::Dimensionless,
            ),
        ];

        records.extend(self.fit_records("SD", &result.scaling_fit));
        records.extend(self.fit_records("S", &result.size_fit));
        records.push(self.single_value_list(
            "SDistr",
            &result.size_histogram.density,
            Unit::Dimensionless,
        ));
        records.push(self.single_value_list(
            "SBins",
            &result.size_histogram.bin_centers,
            Unit::Dimensionless,
        ));
        records.extend(self.fit_records("D", &result.duration_fit));
        records.push(self.single_value_list(
            "DDistr",
            &result.duration_histogram.density,
            Unit::Dimensionless,
        ));
        records.push(self.single_value_list(
            "DBins",
            &result.duration_histogram.bin_centers,
            Unit::Seconds,
        ));

        records
    }
}

/// Emits the full record set once for every population of the layer.
pub fn emit_layer_results(
    sink: &mut dyn ResultSink,
    layer_params: &LayerParams,
    result: &CriticalityResult,
    tags: &[String],
) {
    for population in &layer_params.populations {
        let record_factory = RecordFactory {
            sheet_name: population,
            stimulus_id: &result.stimulus_id,
            tags,
        };

        for record in record_factory.layer_records(result) {
            sink.add_analysis_result(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avalanche::{Avalanche, AvalancheSet};
    use crate::density::DensityHistogram;
    use crate::power_law::{FitFailure, PowerLawParams};
    use itertools::Itertools;

    const RECORD_NAMES: [&str; 20] = [
        "DistanceToCriticality",
        "AvalancheBinSize",
        "AvalancheDurations",
        "AvalancheSizes",
        "SDAmplitude",
        "SDSlope",
        "SDErrorSq",
        "SDErrorDiff",
        "SAmplitude",
        "SSlope",
        "SErrorSq",
        "SErrorDiff",
        "SDistr",
        "SBins",
        "DAmplitude",
        "DSlope",
        "DErrorSq",
        "DErrorDiff",
        "DDistr",
        "DBins",
    ];

    fn make_result() -> CriticalityResult {
        CriticalityResult {
            stimulus_id: "InternalStimulus(duration=10.0)".to_string(),
            distance_to_criticality: 0.25,
            bin_width: 0.004,
            avalanche_set: AvalancheSet {
                avalanches: vec![
                    Avalanche {
                        duration: 0.008,
                        size: 3,
                    },
                    Avalanche {
                        duration: 0.012,
                        size: 7,
                    },
                ],
            },
            size_histogram: DensityHistogram {
                density: vec![0.25, 0.25],
                bin_centers: vec![4.0, 6.0],
            },
            size_fit: PowerLawFit::Converged(PowerLawParams {
                amplitude: 1.5,
                slope: -1.5,
                error_sq: 0.01,
                error_diff: -0.002,
            }),
            duration_histogram: DensityHistogram {
                density: vec![125.0, 125.0],
                bin_centers: vec![0.009, 0.011],
            },
            duration_fit: PowerLawFit::Failed(FitFailure::DegenerateData),
            scaling_fit: PowerLawFit::Converged(PowerLawParams {
                amplitude: 700.0,
                slope: 1.2,
                error_sq: 0.5,
                error_diff: 0.1,
            }),
        }
    }

    fn emit() -> InMemoryResultStore {
        let layer = LayerParams::new("V1_L4", &["V1_Exc_L4", "V1_Inh_L4"]);
        let mut store = InMemoryResultStore::new();
        emit_layer_results(&mut store, &layer, &make_result(), &["spontaneous".to_string()]);
        store
    }

    #[test]
    fn full_record_set_per_population() {
        let store = emit();

        assert_eq!(store.records.len(), 2 * RECORD_NAMES.len());

        for sheet_name in ["V1_Exc_L4", "V1_Inh_L4"] {
            let value_names = store
                .records_for_sheet(sheet_name)
                .map(|record| record.record_tags().value_name.as_str())
                .sorted()
                .collect_vec();

            assert_eq!(value_names, RECORD_NAMES.iter().copied().sorted().collect_vec());
        }
    }

    #[test]
    fn records_are_duplicated_across_populations() {
        let store = emit();

        for value_name in RECORD_NAMES {
            let exc = store.get("V1_Exc_L4", value_name).unwrap();
            let inh = store.get("V1_Inh_L4", value_name).unwrap();

            assert_eq!(exc.value(), inh.value());
            assert_eq!(exc.values(), inh.values());
            assert_eq!(exc.unit(), inh.unit());
        }
    }

    #[test]
    fn units() {
        let store = emit();

        for value_name in RECORD_NAMES {
            let expected_unit = match value_name {
                "AvalancheBinSize" | "AvalancheDurations" | "DBins" => Unit::Seconds,
                _ => Unit::Dimensionless,
            };

            assert_eq!(
                store.get("V1_Exc_L4", value_name).unwrap().unit(),
                expected_unit,
                "{}",
                value_name
            );
        }
    }

    #[test]
    fn record_contents() {
        let store = emit();

        let dcc = store.get("V1_Inh_L4", "DistanceToCriticality").unwrap();
        assert_eq!(dcc.value(), Some(0.25));
        assert_eq!(
            dcc.record_tags(),
            &RecordTags {
                value_name: "DistanceToCriticality".to_string(),
                sheet_name: "V1_Inh_L4".to_string(),
                analysis_algorithm: "CriticalityAnalysis".to_string(),
                stimulus_id: "InternalStimulus(duration=10.0)".to_string(),
                tags: vec!["spontaneous".to_string()],
            }
        );

        assert_eq!(
            store.get("V1_Exc_L4", "AvalancheSizes").unwrap().values(),
            Some(&[3.0, 7.0][..])
        );
        assert_eq!(
            store.get("V1_Exc_L4", "SDSlope").unwrap().value(),
            Some(1.2)
        );
        assert_eq!(
            store.get("V1_Exc_L4", "SSlope").unwrap().value(),
            Some(-1.5)
        );
        assert_eq!(
            store.get("V1_Exc_L4", "SErrorDiff").unwrap().value(),
            Some(-0.002)
        );

        // failed fit is reported as zeros
        for value_name in ["DAmplitude", "DSlope", "DErrorSq", "DErrorDiff"] {
            assert_eq!(
                store.get("V1_Exc_L4", value_name).unwrap().value(),
                Some(0.0)
            );
        }
    }

    #[test]
    fn json_round_trip_preserves_values_and_units() {
        let store = emit();

        let json = serde_json::to_string(&store).unwrap();
        let restored: InMemoryResultStore = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, store);

        for record in &store.records {
            let record_tags = record.record_tags();
            let restored_record = restored
                .get(&record_tags.sheet_name, &record_tags.value_name)
                .unwrap();

            assert_eq!(restored_record.unit(), record.unit());
            assert_eq!(restored_record.value(), record.value());
            assert_eq!(restored_record.values(), record.values());
        }
    }
}

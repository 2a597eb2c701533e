//! The input object of a complete run, loadable from JSON.
//!
//! Every field has a default, so a configuration file only needs to name what it changes:
//!
//! ```
//! use epinet_core::{SimulationConfig, Topology};
//!
//! let config = SimulationConfig::from_json_str(
//!     r#"{
//!         "population_size": 500,
//!         "topology": { "type": "small_world", "neighbors": 6, "rewire_probability": 0.1 },
//!         "seed_spec": { "count": 3, "method": "cluster" },
//!         "intervention_schedule": [
//!             { "start_day": 10, "end_day": 40,
//!               "kind": { "type": "lockdown", "strictness": 0.8, "compliance": 0.9 } }
//!         ],
//!         "random_seed": 7
//!     }"#,
//! )
//! .unwrap();
//! assert_eq!(config.population_size, 500);
//! assert!(matches!(config.topology, Topology::SmallWorld { neighbors: 6, .. }));
//! assert_eq!(config.max_days, 120);
//! ```

use crate::{
    disease::DiseaseProfile,
    engine::{HospitalConfig, RunOptions, SeedSpec},
    error::EpiError,
    graph::{GraphBuilder, Topology, DEFAULT_MAX_POPULATION},
    intervention::{InterventionSchedule, Scenario},
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub population_size: usize,
    pub topology: Topology,
    pub disease_profile: DiseaseProfile,
    pub intervention_schedule: InterventionSchedule,
    pub seed_spec: SeedSpec,
    pub max_days: u32,
    pub random_seed: Option<u64>,
    pub hospital: HospitalConfig,
    /// Hard ceiling on `population_size`.
    pub max_population: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let options = RunOptions::default();
        SimulationConfig {
            population_size: 1000,
            topology: Topology::default(),
            disease_profile: DiseaseProfile::default(),
            intervention_schedule: InterventionSchedule::new(),
            seed_spec: SeedSpec::default(),
            max_days: options.max_days,
            random_seed: options.random_seed,
            hospital: options.hospital,
            max_population: DEFAULT_MAX_POPULATION,
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, EpiError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EpiError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Replaces the intervention schedule with a preset.
    #[must_use]
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.intervention_schedule = scenario.schedule();
        self
    }

    #[must_use]
    pub fn graph_builder(&self) -> GraphBuilder {
        GraphBuilder::new(self.population_size, self.topology.clone())
            .with_max_population(self.max_population)
    }

    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            max_days: self.max_days,
            random_seed: self.random_seed,
            hospital: self.hospital,
        }
    }

    /// Checks every part of the configuration without building or running anything.
    pub fn validate(&self) -> Result<(), EpiError> {
        self.graph_builder().validate()?;
        self.disease_profile.validate()?;
        self.intervention_schedule.validate()?;
        self.seed_spec.validate(self.population_size)?;
        self.run_options().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervention::InterventionKind;
    use std::io::Write;

    #[test]
    fn empty_json_gives_the_defaults() {
        let config = SimulationConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn schedule_is_sorted_when_loaded() {
        let config = SimulationConfig::from_json_str(
            r#"{ "intervention_schedule": [
                { "start_day": 30, "kind": { "type": "school_closure", "compliance": 0.9 } },
                { "start_day": 5, "kind": { "type": "vaccination", "daily_rate": 0.01 } }
            ] }"#,
        )
        .unwrap();
        let interventions = config.intervention_schedule.interventions();
        assert_eq!(interventions[0].start_day, 5);
        assert!(matches!(
            interventions[0].kind,
            InterventionKind::Vaccination(_)
        ));
    }

    #[test]
    fn oversized_population_is_a_capacity_error() {
        let config = SimulationConfig {
            population_size: 2000,
            max_population: 1000,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(EpiError::CapacityExceeded {
                requested: 2000,
                ceiling: 1000
            })
        ));
    }

    #[test]
    fn malformed_json_is_reported() {
        let result = SimulationConfig::from_json_str(r#"{ "population_size": "many" }"#);
        assert!(matches!(result, Err(EpiError::JsonError(_))));
    }

    #[test]
    fn loads_from_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "population_size": 321, "random_seed": 9 }}"#).unwrap();
        let config = SimulationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.population_size, 321);
        assert_eq!(config.run_options().random_seed, Some(9));
    }
}

/*!

Disease parameters. A [`DiseaseProfile`] is a plain value: it carries no behavior beyond
validation and the few pure lookups the engine needs (duration sampling, age bands, vaccine waning
and seasonality).

The numbers in `DiseaseProfile::default()` are an illustrative respiratory-virus parameter set
and are not authoritative for any real pathogen. Callers are expected to supply their own.

*/

use crate::{
    context::Context,
    error::EpiError,
    random::{ContextRandomExt, RngId},
};
use rand::Rng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Disease course category, assigned once when a node becomes infectious.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Asymptomatic,
    Mild,
    Severe,
    Hospitalized,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Asymptomatic,
        Severity::Mild,
        Severity::Severe,
        Severity::Hospitalized,
        Severity::Critical,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Whether the node occupies a hospital bed while infectious.
    #[must_use]
    pub fn requires_hospital(self) -> bool {
        matches!(self, Severity::Hospitalized | Severity::Critical)
    }
}

/// A duration in whole days drawn from a normal distribution, rounded and floored at `minimum`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DurationDistribution {
    pub mean: f64,
    pub std_dev: f64,
    pub minimum: u32,
}

impl DurationDistribution {
    #[must_use]
    pub const fn new(mean: f64, std_dev: f64, minimum: u32) -> Self {
        DurationDistribution {
            mean,
            std_dev,
            minimum,
        }
    }

    pub fn validate(&self, name: &str) -> Result<(), EpiError> {
        if !self.mean.is_finite() || self.mean <= 0.0 {
            return Err(EpiError::InvalidDiseaseProfile(format!(
                "{name} mean must be positive, got {}",
                self.mean
            )));
        }
        if !self.std_dev.is_finite() || self.std_dev < 0.0 {
            return Err(EpiError::InvalidDiseaseProfile(format!(
                "{name} standard deviation must be non-negative, got {}",
                self.std_dev
            )));
        }
        if self.minimum == 0 {
            return Err(EpiError::InvalidDiseaseProfile(format!(
                "{name} minimum must be at least one day"
            )));
        }
        Ok(())
    }

    /// Draws a duration with the mean multiplied by `scale`.
    pub fn sample<R: RngId>(&self, context: &mut Context, scale: f64) -> Result<u32, EpiError>
    where
        R::RngType: Rng,
    {
        let mean = self.mean * scale;
        let normal = Normal::new(mean, self.std_dev).map_err(|e| {
            EpiError::InvalidDiseaseProfile(format!(
                "cannot sample a duration with mean {mean} and standard deviation {}: {e}",
                self.std_dev
            ))
        })?;
        if !mean.is_finite() || mean <= 0.0 {
            return Err(EpiError::InvalidDiseaseProfile(format!(
                "duration mean must be positive, got {mean}"
            )));
        }
        let days = context.sample_distr::<R, f64>(normal).round();
        // Saturating float-to-int conversion; negative draws become zero before the floor.
        Ok((days as u32).max(self.minimum))
    }
}

/// Parameters attached to one severity level.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeverityParameters {
    /// Base probability of the level before age, comorbidity and vaccine adjustment.
    pub probability: f64,
    /// Multiplier on the infectiousness of a node at this level.
    pub infectivity: f64,
    /// Base probability of death before the age multiplier.
    pub mortality: f64,
    /// Multiplier on the mean infectious period.
    pub infectious_period_scale: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeverityTable {
    pub asymptomatic: SeverityParameters,
    pub mild: SeverityParameters,
    pub severe: SeverityParameters,
    pub hospitalized: SeverityParameters,
    pub critical: SeverityParameters,
}

impl SeverityTable {
    #[must_use]
    pub fn get(&self, severity: Severity) -> &SeverityParameters {
        match severity {
            Severity::Asymptomatic => &self.asymptomatic,
            Severity::Mild => &self.mild,
            Severity::Severe => &self.severe,
            Severity::Hospitalized => &self.hospitalized,
            Severity::Critical => &self.critical,
        }
    }

    fn validate(&self) -> Result<(), EpiError> {
        let mut total = 0.0;
        for severity in Severity::ALL {
            let p = self.get(severity);
            let fields = [
                ("probability", p.probability, true),
                ("infectivity", p.infectivity, false),
                ("mortality", p.mortality, true),
                ("infectious_period_scale", p.infectious_period_scale, false),
            ];
            for (field, value, is_probability) in fields {
                let in_domain = if is_probability {
                    (0.0..=1.0).contains(&value)
                } else {
                    value.is_finite() && value >= 0.0
                };
                if !in_domain {
                    return Err(EpiError::InvalidDiseaseProfile(format!(
                        "{severity:?} {field} is out of range: {value}"
                    )));
                }
            }
            if p.infectious_period_scale == 0.0 {
                return Err(EpiError::InvalidDiseaseProfile(format!(
                    "{severity:?} infectious_period_scale must be positive"
                )));
            }
            total += p.probability;
        }
        if (total - 1.0).abs() > 1e-3 {
            return Err(EpiError::InvalidDiseaseProfile(format!(
                "severity probabilities must sum to 1, got {total}"
            )));
        }
        Ok(())
    }
}

/// Age-stratified multipliers that apply from `min_age` up to the next band.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgeBand {
    pub min_age: u8,
    pub susceptibility: f64,
    /// Shifts the severity draw toward severe outcomes.
    pub severity: f64,
    /// Shifts the severity draw toward hospital-level outcomes.
    pub hospitalization: f64,
    /// Multiplier on the severity's base mortality.
    pub mortality: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VaccineProfile {
    pub efficacy_infection: f64,
    pub efficacy_severity: f64,
    pub efficacy_transmission: f64,
    /// Days of full protection before waning starts.
    pub waning_delay_days: u32,
    /// Exponential decay rate per day after the delay.
    pub waning_rate: f64,
    /// A node whose remaining protection falls below this is unprotected again.
    pub protection_threshold: f64,
}

impl Default for VaccineProfile {
    fn default() -> Self {
        VaccineProfile {
            efficacy_infection: 0.7,
            efficacy_severity: 0.8,
            efficacy_transmission: 0.6,
            waning_delay_days: 120,
            waning_rate: 0.003,
            protection_threshold: 0.1,
        }
    }
}

impl VaccineProfile {
    /// Protection left `days_since_vaccination` days after a dose that gave `initial` protection.
    #[must_use]
    pub fn remaining_protection(&self, initial: f64, days_since_vaccination: u32) -> f64 {
        let waned_days = days_since_vaccination.saturating_sub(self.waning_delay_days);
        initial * (-self.waning_rate * f64::from(waned_days)).exp()
    }
}

/// Yearly sinusoidal modulation of transmission.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Seasonality {
    pub amplitude: f64,
    /// Day of the year on which transmission peaks.
    pub peak_day: u32,
}

impl Seasonality {
    #[must_use]
    pub fn factor(&self, day: u32) -> f64 {
        if self.amplitude == 0.0 {
            return 1.0;
        }
        let phase = f64::from(day % 365) - f64::from(self.peak_day);
        1.0 + self.amplitude * (2.0 * PI * phase / 365.0).cos()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseProfile {
    pub name: String,
    pub r0: f64,
    pub incubation: DurationDistribution,
    pub infectious_period: DurationDistribution,
    pub severity: SeverityTable,
    /// Ascending by `min_age`, starting at age 0.
    pub age_bands: Vec<AgeBand>,
    pub vaccine: VaccineProfile,
    pub seasonality: Seasonality,
}

impl Default for DiseaseProfile {
    fn default() -> Self {
        let level = |probability, infectivity, mortality, infectious_period_scale| SeverityParameters {
            probability,
            infectivity,
            mortality,
            infectious_period_scale,
        };
        let band = |min_age, susceptibility, severity, hospitalization, mortality| AgeBand {
            min_age,
            susceptibility,
            severity,
            hospitalization,
            mortality,
        };
        DiseaseProfile {
            name: "respiratory-virus".to_string(),
            r0: 2.5,
            incubation: DurationDistribution::new(5.2, 2.8, 1),
            infectious_period: DurationDistribution::new(10.0, 3.0, 3),
            severity: SeverityTable {
                asymptomatic: level(0.40, 0.5, 0.0, 0.8),
                mild: level(0.40, 1.0, 0.0005, 0.9),
                severe: level(0.12, 1.2, 0.01, 1.2),
                hospitalized: level(0.06, 0.6, 0.05, 1.5),
                critical: level(0.02, 0.6, 0.25, 1.5),
            },
            age_bands: vec![
                band(0, 0.5, 0.01, 0.005, 0.1),
                band(10, 0.7, 0.02, 0.01, 0.2),
                band(20, 0.9, 0.05, 0.02, 0.4),
                band(30, 0.9, 0.1, 0.03, 0.6),
                band(40, 0.9, 0.15, 0.05, 1.0),
                band(50, 0.9, 0.25, 0.08, 2.0),
                band(60, 0.9, 0.4, 0.15, 4.0),
                band(70, 0.9, 0.6, 0.25, 8.0),
                band(80, 0.9, 0.8, 0.35, 15.0),
            ],
            vaccine: VaccineProfile::default(),
            seasonality: Seasonality::default(),
        }
    }
}

impl DiseaseProfile {
    /// The band that covers `age`.
    #[must_use]
    pub fn age_band(&self, age: u8) -> &AgeBand {
        let position = self.age_bands.partition_point(|band| band.min_age <= age);
        // `validate` guarantees a first band starting at 0, so `position >= 1`.
        &self.age_bands[position.saturating_sub(1)]
    }

    pub fn validate(&self) -> Result<(), EpiError> {
        if !self.r0.is_finite() || self.r0 < 0.0 {
            return Err(EpiError::InvalidDiseaseProfile(format!(
                "r0 must be a non-negative number, got {}",
                self.r0
            )));
        }
        self.incubation.validate("incubation")?;
        self.infectious_period.validate("infectious_period")?;
        self.severity.validate()?;

        match self.age_bands.first() {
            Some(first) if first.min_age == 0 => {}
            _ => {
                return Err(EpiError::InvalidDiseaseProfile(
                    "age bands must start at age 0".to_string(),
                ));
            }
        }
        for pair in self.age_bands.windows(2) {
            if pair[1].min_age <= pair[0].min_age {
                return Err(EpiError::InvalidDiseaseProfile(format!(
                    "age bands must be strictly ascending, found {} after {}",
                    pair[1].min_age, pair[0].min_age
                )));
            }
        }
        for band in &self.age_bands {
            let values = [
                band.susceptibility,
                band.severity,
                band.hospitalization,
                band.mortality,
            ];
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(EpiError::InvalidDiseaseProfile(format!(
                    "age band starting at {} has a negative or non-finite multiplier",
                    band.min_age
                )));
            }
        }

        let vaccine = &self.vaccine;
        for (name, value) in [
            ("efficacy_infection", vaccine.efficacy_infection),
            ("efficacy_severity", vaccine.efficacy_severity),
            ("efficacy_transmission", vaccine.efficacy_transmission),
            ("protection_threshold", vaccine.protection_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EpiError::InvalidDiseaseProfile(format!(
                    "vaccine {name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !vaccine.waning_rate.is_finite() || vaccine.waning_rate < 0.0 {
            return Err(EpiError::InvalidDiseaseProfile(format!(
                "vaccine waning_rate must be non-negative, got {}",
                vaccine.waning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.seasonality.amplitude) {
            return Err(EpiError::InvalidDiseaseProfile(format!(
                "seasonality amplitude must be within [0, 1], got {}",
                self.seasonality.amplitude
            )));
        }
        Ok(())
    }
}

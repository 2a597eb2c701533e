//! Severity assignment and outcome odds for nodes becoming infectious.

use crate::{
    define_rng,
    disease::{AgeBand, DiseaseProfile, Severity},
};

define_rng!(ProgressionRng);

/// Unnormalized weights of the severity draw, in `Severity::ALL` order.
///
/// Age severity, age hospitalization and comorbidity shift weight toward the graver levels;
/// vaccine severity protection shifts it back. When the adjustments leave no positive weight,
/// the base probabilities of the profile are used unchanged.
#[must_use]
pub fn severity_weights(
    profile: &DiseaseProfile,
    band: &AgeBand,
    comorbidity: f64,
    severity_protection: f64,
) -> [f64; 5] {
    let table = &profile.severity;
    let s = band.severity;
    let h = band.hospitalization;
    let v = severity_protection;

    let weights = [
        table.asymptomatic.probability,
        table.mild.probability * (1.0 - 0.3 * s),
        table.severe.probability * (1.0 + s + comorbidity) * (1.0 - 0.7 * v),
        table.hospitalized.probability * (1.0 + s + 2.0 * h + comorbidity) * (1.0 - v),
        table.critical.probability * (1.0 + 2.0 * (s + h + comorbidity)) * (1.0 - v),
    ];
    let weights = weights.map(non_negative);
    if weights.iter().sum::<f64>() > 0.0 {
        return weights;
    }
    Severity::ALL.map(|severity| non_negative(table.get(severity).probability))
}

fn non_negative(weight: f64) -> f64 {
    if weight.is_finite() { weight.max(0.0) } else { 0.0 }
}

/// Probability that an infectious episode ends in death.
#[must_use]
pub fn mortality_probability(
    profile: &DiseaseProfile,
    severity: Severity,
    band: &AgeBand,
    hospital_overloaded: bool,
    overflow_multiplier: f64,
    severity_protection: f64,
) -> f64 {
    let mut p = profile.severity.get(severity).mortality * band.mortality;
    if hospital_overloaded {
        p *= overflow_multiplier;
    }
    p *= 1.0 - severity_protection;
    if p.is_nan() { 0.0 } else { p.clamp(0.0, 1.0) }
}

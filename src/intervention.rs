/*!

Dated public-health measures.

An [`InterventionSchedule`] is an ordered list of [`Intervention`]s, each active on the days
`start_day <= day < end_day` (open-ended when `end_day` is `None`). On every simulated day the
engine folds the active entries into an [`ActiveMeasures`] value: contact-reducing measures become
per-layer multipliers read by the transmission pass, while vaccination campaigns and testing
policies are handed to the engine to act on.

*/

use crate::{error::EpiError, graph::EdgeType};
use serde::{Deserialize, Serialize};

/// Order in which eligible nodes receive a vaccine.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaccinationPriority {
    /// Oldest first.
    #[default]
    AgeDescending,
    /// Best connected first.
    DegreeDescending,
    /// Most mobile first, a stand-in for frontline workers.
    MobilityDescending,
    /// Highest underlying risk first.
    ComorbidityDescending,
    Random,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VaccinationCampaign {
    /// Share of the population vaccinated per day.
    pub daily_rate: f64,
    #[serde(default)]
    pub priority: VaccinationPriority,
    /// Initial protection against infection; the disease profile's vaccine efficacy otherwise.
    #[serde(default)]
    pub efficacy: Option<f64>,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestingPolicy {
    /// Share of the currently infectious nodes tested per day.
    pub daily_rate: f64,
    /// Probability that an infectious node tests positive.
    pub accuracy: f64,
    /// Days between a positive test and the start of isolation.
    pub delay_days: u32,
    /// Reduction of an isolated node's infectiousness.
    pub isolation_effectiveness: f64,
    /// Probability that each traced contact of a positive node is isolated too.
    pub tracing_coverage: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InterventionKind {
    Lockdown { strictness: f64, compliance: f64 },
    MaskMandate { efficacy: f64, compliance: f64 },
    SocialDistancing { effectiveness: f64, compliance: f64 },
    SchoolClosure { compliance: f64 },
    WorkplaceClosure { compliance: f64 },
    TravelRestriction { reduction: f64 },
    Vaccination(VaccinationCampaign),
    Testing(TestingPolicy),
}

impl InterventionKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            InterventionKind::Lockdown { .. } => "lockdown",
            InterventionKind::MaskMandate { .. } => "mask mandate",
            InterventionKind::SocialDistancing { .. } => "social distancing",
            InterventionKind::SchoolClosure { .. } => "school closure",
            InterventionKind::WorkplaceClosure { .. } => "workplace closure",
            InterventionKind::TravelRestriction { .. } => "travel restriction",
            InterventionKind::Vaccination(_) => "vaccination campaign",
            InterventionKind::Testing(_) => "testing and tracing",
        }
    }

    fn fractions(&self) -> Vec<(&'static str, f64)> {
        match *self {
            InterventionKind::Lockdown {
                strictness,
                compliance,
            } => vec![("strictness", strictness), ("compliance", compliance)],
            InterventionKind::MaskMandate {
                efficacy,
                compliance,
            } => vec![("efficacy", efficacy), ("compliance", compliance)],
            InterventionKind::SocialDistancing {
                effectiveness,
                compliance,
            } => vec![("effectiveness", effectiveness), ("compliance", compliance)],
            InterventionKind::SchoolClosure { compliance }
            | InterventionKind::WorkplaceClosure { compliance } => {
                vec![("compliance", compliance)]
            }
            InterventionKind::TravelRestriction { reduction } => vec![("reduction", reduction)],
            InterventionKind::Vaccination(campaign) => {
                let mut fractions = vec![("daily_rate", campaign.daily_rate)];
                if let Some(efficacy) = campaign.efficacy {
                    fractions.push(("efficacy", efficacy));
                }
                fractions
            }
            InterventionKind::Testing(policy) => vec![
                ("daily_rate", policy.daily_rate),
                ("accuracy", policy.accuracy),
                ("isolation_effectiveness", policy.isolation_effectiveness),
                ("tracing_coverage", policy.tracing_coverage),
            ],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intervention {
    pub start_day: u32,
    /// First day on which the intervention is no longer active.
    #[serde(default)]
    pub end_day: Option<u32>,
    pub kind: InterventionKind,
}

impl Intervention {
    /// An open-ended intervention starting on `start_day`.
    #[must_use]
    pub fn starting(start_day: u32, kind: InterventionKind) -> Self {
        Intervention {
            start_day,
            end_day: None,
            kind,
        }
    }

    #[must_use]
    pub fn until(mut self, end_day: u32) -> Self {
        self.end_day = Some(end_day);
        self
    }

    #[must_use]
    pub fn is_active(&self, day: u32) -> bool {
        day >= self.start_day && self.end_day.is_none_or(|end| day < end)
    }

    pub fn validate(&self) -> Result<(), EpiError> {
        if let Some(end) = self.end_day {
            if end <= self.start_day {
                return Err(EpiError::InvalidParameter(format!(
                    "{} ends on day {end}, not after its start day {}",
                    self.kind.label(),
                    self.start_day
                )));
            }
        }
        for (name, value) in self.kind.fractions() {
            if !(0.0..=1.0).contains(&value) {
                return Err(EpiError::InvalidParameter(format!(
                    "{} {name} must be within [0, 1], got {value}",
                    self.kind.label()
                )));
            }
        }
        Ok(())
    }
}

/// Interventions ordered by start day. Entries with equal start days keep insertion order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Intervention>", into = "Vec<Intervention>")]
pub struct InterventionSchedule {
    interventions: Vec<Intervention>,
}

impl InterventionSchedule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, intervention: Intervention) {
        let position = self
            .interventions
            .partition_point(|existing| existing.start_day <= intervention.start_day);
        self.interventions.insert(position, intervention);
    }

    #[must_use]
    pub fn with(mut self, intervention: Intervention) -> Self {
        self.add(intervention);
        self
    }

    #[must_use]
    pub fn interventions(&self) -> &[Intervention] {
        &self.interventions
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interventions.is_empty()
    }

    pub fn active_on(&self, day: u32) -> impl Iterator<Item = &Intervention> + '_ {
        self.interventions
            .iter()
            .filter(move |intervention| intervention.is_active(day))
    }

    pub fn validate(&self) -> Result<(), EpiError> {
        self.interventions.iter().try_for_each(Intervention::validate)
    }
}

impl From<Vec<Intervention>> for InterventionSchedule {
    fn from(interventions: Vec<Intervention>) -> Self {
        interventions.into_iter().collect()
    }
}

impl From<InterventionSchedule> for Vec<Intervention> {
    fn from(schedule: InterventionSchedule) -> Self {
        schedule.interventions
    }
}

impl FromIterator<Intervention> for InterventionSchedule {
    fn from_iter<I: IntoIterator<Item = Intervention>>(iter: I) -> Self {
        let mut schedule = InterventionSchedule::new();
        for intervention in iter {
            schedule.add(intervention);
        }
        schedule
    }
}

/// Named intervention programs. The parameters are illustrative.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    NoIntervention,
    DelayedResponse,
    RapidResponse,
    HerdImmunity,
    FullLockdown,
}

impl Scenario {
    pub const ALL: [Scenario; 5] = [
        Scenario::NoIntervention,
        Scenario::DelayedResponse,
        Scenario::RapidResponse,
        Scenario::HerdImmunity,
        Scenario::FullLockdown,
    ];

    #[must_use]
    pub fn schedule(self) -> InterventionSchedule {
        use InterventionKind::*;
        let vaccination = |daily_rate, priority, efficacy| {
            Vaccination(VaccinationCampaign {
                daily_rate,
                priority,
                efficacy: Some(efficacy),
            })
        };

        match self {
            Scenario::NoIntervention => InterventionSchedule::new(),
            Scenario::DelayedResponse => [
                Intervention::starting(
                    30,
                    MaskMandate {
                        efficacy: 0.5,
                        compliance: 0.7,
                    },
                ),
                Intervention::starting(
                    45,
                    SocialDistancing {
                        effectiveness: 0.3,
                        compliance: 0.6,
                    },
                ),
                Intervention::starting(
                    60,
                    vaccination(0.02, VaccinationPriority::AgeDescending, 0.9),
                ),
                Intervention::starting(
                    75,
                    Lockdown {
                        strictness: 0.7,
                        compliance: 0.8,
                    },
                )
                .until(120),
            ]
            .into_iter()
            .collect(),
            Scenario::RapidResponse => [
                Intervention::starting(
                    7,
                    MaskMandate {
                        efficacy: 0.6,
                        compliance: 0.8,
                    },
                ),
                Intervention::starting(
                    14,
                    Testing(TestingPolicy {
                        daily_rate: 0.1,
                        accuracy: 0.95,
                        delay_days: 1,
                        isolation_effectiveness: 0.8,
                        tracing_coverage: 0.5,
                    }),
                ),
                Intervention::starting(
                    21,
                    SocialDistancing {
                        effectiveness: 0.5,
                        compliance: 0.7,
                    },
                ),
                Intervention::starting(
                    30,
                    vaccination(0.03, VaccinationPriority::MobilityDescending, 0.9),
                ),
                Intervention::starting(45, TravelRestriction { reduction: 0.7 }),
            ]
            .into_iter()
            .collect(),
            Scenario::HerdImmunity => [
                Intervention::starting(0, vaccination(0.05, VaccinationPriority::Random, 0.9))
                    .until(30),
                Intervention::starting(30, vaccination(0.03, VaccinationPriority::Random, 0.9))
                    .until(60),
                Intervention::starting(60, vaccination(0.02, VaccinationPriority::Random, 0.9)),
            ]
            .into_iter()
            .collect(),
            Scenario::FullLockdown => [
                Intervention::starting(
                    14,
                    Lockdown {
                        strictness: 0.9,
                        compliance: 0.85,
                    },
                )
                .until(45),
                Intervention::starting(
                    15,
                    MaskMandate {
                        efficacy: 0.7,
                        compliance: 0.9,
                    },
                ),
                Intervention::starting(16, TravelRestriction { reduction: 0.9 }).until(45),
                Intervention::starting(
                    50,
                    vaccination(0.04, VaccinationPriority::ComorbidityDescending, 0.95),
                ),
            ]
            .into_iter()
            .collect(),
        }
    }
}

/// The combined effect of every intervention active on one day.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveMeasures {
    /// Multiplier per edge layer in `EdgeType::ALL` order.
    pub layer_multipliers: [f64; 4],
    /// Per-contact multiplier applied to every non-household edge.
    pub contact_multiplier: f64,
    pub vaccinations: Vec<VaccinationCampaign>,
    pub testing: Vec<TestingPolicy>,
}

impl Default for ActiveMeasures {
    fn default() -> Self {
        ActiveMeasures {
            layer_multipliers: [1.0; 4],
            contact_multiplier: 1.0,
            vaccinations: Vec::new(),
            testing: Vec::new(),
        }
    }
}

impl ActiveMeasures {
    #[must_use]
    pub fn evaluate(schedule: &InterventionSchedule, day: u32) -> Self {
        let mut measures = ActiveMeasures::default();
        for intervention in schedule.active_on(day) {
            measures.apply(&intervention.kind);
        }
        measures
    }

    fn scale(&mut self, layers: &[EdgeType], factor: f64) {
        for layer in layers {
            self.layer_multipliers[layer.index()] *= factor;
        }
    }

    fn apply(&mut self, kind: &InterventionKind) {
        match *kind {
            InterventionKind::Lockdown {
                strictness,
                compliance,
            } => self.scale(
                &[EdgeType::Workplace, EdgeType::School, EdgeType::Community],
                1.0 - strictness * compliance,
            ),
            InterventionKind::SocialDistancing {
                effectiveness,
                compliance,
            } => self.scale(
                &[EdgeType::Workplace, EdgeType::Community],
                1.0 - effectiveness * compliance,
            ),
            InterventionKind::MaskMandate {
                efficacy,
                compliance,
            } => self.contact_multiplier *= 1.0 - efficacy * compliance,
            InterventionKind::SchoolClosure { compliance } => {
                self.scale(&[EdgeType::School], 1.0 - compliance);
            }
            InterventionKind::WorkplaceClosure { compliance } => {
                self.scale(&[EdgeType::Workplace], 1.0 - compliance);
            }
            InterventionKind::TravelRestriction { reduction } => {
                self.scale(&[EdgeType::Community], 1.0 - reduction);
            }
            InterventionKind::Vaccination(campaign) => self.vaccinations.push(campaign),
            InterventionKind::Testing(policy) => self.testing.push(policy),
        }
    }

    /// Combined multiplier for a contact along an edge of type `kind`.
    #[must_use]
    pub fn edge_multiplier(&self, kind: EdgeType) -> f64 {
        let layer = self.layer_multipliers[kind.index()];
        if kind == EdgeType::Household {
            layer
        } else {
            layer * self.contact_multiplier
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn schedule_stays_ordered_by_start_day() {
        let schedule = InterventionSchedule::new()
            .with(Intervention::starting(20, InterventionKind::SchoolClosure { compliance: 1.0 }))
            .with(Intervention::starting(5, InterventionKind::TravelRestriction { reduction: 0.5 }))
            .with(Intervention::starting(20, InterventionKind::WorkplaceClosure { compliance: 1.0 }));
        let starts: Vec<u32> = schedule.interventions().iter().map(|i| i.start_day).collect();
        assert_eq!(starts, vec![5, 20, 20]);
        assert!(matches!(
            schedule.interventions()[2].kind,
            InterventionKind::WorkplaceClosure { .. }
        ));
    }

    #[test]
    fn end_day_is_exclusive() {
        let lockdown = Intervention::starting(
            10,
            InterventionKind::Lockdown {
                strictness: 0.5,
                compliance: 1.0,
            },
        )
        .until(12);
        assert!(!lockdown.is_active(9));
        assert!(lockdown.is_active(10));
        assert!(lockdown.is_active(11));
        assert!(!lockdown.is_active(12));
    }

    #[test]
    fn measures_fold_into_layer_multipliers() {
        let schedule = InterventionSchedule::new()
            .with(Intervention::starting(
                0,
                InterventionKind::Lockdown {
                    strictness: 0.5,
                    compliance: 0.8,
                },
            ))
            .with(Intervention::starting(
                0,
                InterventionKind::MaskMandate {
                    efficacy: 0.5,
                    compliance: 0.5,
                },
            ))
            .with(Intervention::starting(0, InterventionKind::SchoolClosure { compliance: 0.5 }))
            .with(Intervention::starting(0, InterventionKind::TravelRestriction { reduction: 0.5 }));

        let measures = ActiveMeasures::evaluate(&schedule, 3);
        assert!(close(measures.edge_multiplier(EdgeType::Household), 1.0));
        assert!(close(measures.edge_multiplier(EdgeType::Workplace), 0.6 * 0.75));
        assert!(close(measures.edge_multiplier(EdgeType::School), 0.6 * 0.5 * 0.75));
        assert!(close(measures.edge_multiplier(EdgeType::Community), 0.6 * 0.5 * 0.75));
    }

    #[test]
    fn inactive_schedule_is_neutral() {
        let schedule = Scenario::DelayedResponse.schedule();
        assert_eq!(ActiveMeasures::evaluate(&schedule, 0), ActiveMeasures::default());
        let later = ActiveMeasures::evaluate(&schedule, 80);
        assert_eq!(later.vaccinations.len(), 1);
        assert!(later.layer_multipliers[EdgeType::Community.index()] < 1.0);
    }

    #[test]
    fn validation_rejects_bad_windows_and_fractions() {
        let schedule = InterventionSchedule::new().with(
            Intervention::starting(10, InterventionKind::SchoolClosure { compliance: 0.5 })
                .until(10),
        );
        assert!(matches!(
            schedule.validate(),
            Err(EpiError::InvalidParameter(_))
        ));

        let schedule = InterventionSchedule::new().with(Intervention::starting(
            0,
            InterventionKind::MaskMandate {
                efficacy: 1.2,
                compliance: 0.5,
            },
        ));
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn presets_are_valid() {
        for scenario in Scenario::ALL {
            scenario.schedule().validate().unwrap();
        }
        assert!(Scenario::NoIntervention.schedule().is_empty());
    }

    #[test]
    fn schedule_deserializes_in_start_day_order() {
        let json = r#"[
            {"start_day": 3, "kind": {"type": "vaccination", "daily_rate": 0.01}},
            {"start_day": 1, "end_day": 9, "kind": {"type": "lockdown", "strictness": 0.5, "compliance": 0.9}}
        ]"#;
        let schedule: InterventionSchedule = serde_json::from_str(json).unwrap();
        assert_eq!(schedule.interventions().len(), 2);
        assert_eq!(schedule.interventions()[0].end_day, Some(9));
        match schedule.interventions()[1].kind {
            InterventionKind::Vaccination(campaign) => {
                assert_eq!(campaign.priority, VaccinationPriority::AgeDescending);
                assert_eq!(campaign.efficacy, None);
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }
}

use crate::error::EpiError;
use serde::{Deserialize, Serialize};

/// The network generation strategy together with its parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Topology {
    /// Every unordered pair is connected independently with `edge_probability`.
    RandomGraph { edge_probability: f64 },
    /// A ring lattice where each node links to its `neighbors` nearest nodes, after which every
    /// lattice edge is rewired with `rewire_probability`.
    SmallWorld {
        neighbors: usize,
        rewire_probability: f64,
    },
    /// Preferential attachment: each new node attaches `edges_per_node` edges.
    ScaleFree { edges_per_node: usize },
    /// Equal-size blocks with dense intra-block and sparse inter-block connections.
    Community {
        communities: usize,
        intra_probability: f64,
        inter_probability: f64,
    },
    /// Household, workplace, school and community layers over one node set.
    Layered(LayeredParams),
}

impl Default for Topology {
    fn default() -> Self {
        Topology::Layered(LayeredParams::default())
    }
}

impl Topology {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Topology::RandomGraph { .. } => "random_graph",
            Topology::SmallWorld { .. } => "small_world",
            Topology::ScaleFree { .. } => "scale_free",
            Topology::Community { .. } => "community",
            Topology::Layered(_) => "layered",
        }
    }

    /// Checks every parameter against its domain for a graph of `population_size` nodes.
    pub fn validate(&self, population_size: usize) -> Result<(), EpiError> {
        match self {
            Topology::RandomGraph { edge_probability } => {
                check_probability("edge_probability", *edge_probability)
            }
            Topology::SmallWorld {
                neighbors,
                rewire_probability,
            } => {
                if *neighbors < 2 || neighbors % 2 != 0 {
                    return Err(EpiError::InvalidParameter(format!(
                        "small-world neighbors must be an even number of at least 2, got {neighbors}"
                    )));
                }
                if *neighbors >= population_size {
                    return Err(EpiError::InvalidParameter(format!(
                        "small-world neighbors ({neighbors}) must be below the population size ({population_size})"
                    )));
                }
                check_probability("rewire_probability", *rewire_probability)
            }
            Topology::ScaleFree { edges_per_node } => {
                if *edges_per_node == 0 || *edges_per_node >= population_size {
                    return Err(EpiError::InvalidParameter(format!(
                        "scale-free edges_per_node must be in 1..{population_size}, got {edges_per_node}"
                    )));
                }
                Ok(())
            }
            Topology::Community {
                communities,
                intra_probability,
                inter_probability,
            } => {
                if *communities == 0 || *communities > population_size {
                    return Err(EpiError::InvalidParameter(format!(
                        "communities must be in 1..={population_size}, got {communities}"
                    )));
                }
                check_probability("intra_probability", *intra_probability)?;
                check_probability("inter_probability", *inter_probability)
            }
            Topology::Layered(params) => params.validate(),
        }
    }
}

/// An inclusive `[min, max]` range of group sizes or counts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange {
    pub min: usize,
    pub max: usize,
}

impl SizeRange {
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        SizeRange { min, max }
    }

    fn validate(self, name: &str, allow_zero: bool) -> Result<(), EpiError> {
        if (!allow_zero && self.min == 0) || self.min > self.max {
            return Err(EpiError::InvalidParameter(format!(
                "{name} must satisfy {}min <= max, got [{}, {}]",
                if allow_zero { "" } else { "1 <= " },
                self.min,
                self.max
            )));
        }
        Ok(())
    }
}

/// Parameters of the layered composite network. Demographics for the other topologies use the
/// default values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayeredParams {
    /// Relative weights of household sizes `1, 2, ..., len`.
    pub household_size_weights: Vec<f64>,
    pub workplace_size: SizeRange,
    pub school_size: SizeRange,
    /// Chance that a pair of coworkers is in contact.
    pub workplace_contact_probability: f64,
    /// Chance that a pair of schoolmates is in contact.
    pub school_contact_probability: f64,
    /// Share of working-age nodes that hold a workplace.
    pub employment_rate: f64,
    /// Expected number of community edges per node.
    pub community_mean_degree: f64,
    pub household_weight: f64,
    pub workplace_weight: f64,
    pub school_weight: f64,
    pub community_weight: f64,
    /// Share of nodes, taken in decreasing mobility, that become hubs.
    pub hub_fraction: f64,
    /// Number of additional community contacts each hub attempts.
    pub hub_extra_contacts: SizeRange,
}

impl Default for LayeredParams {
    fn default() -> Self {
        LayeredParams {
            household_size_weights: vec![0.1, 0.25, 0.35, 0.2, 0.1],
            workplace_size: SizeRange::new(10, 50),
            school_size: SizeRange::new(20, 40),
            workplace_contact_probability: 0.3,
            school_contact_probability: 0.5,
            employment_rate: 0.9,
            community_mean_degree: 1.0,
            household_weight: 1.0,
            workplace_weight: 0.6,
            school_weight: 0.7,
            community_weight: 0.3,
            hub_fraction: 0.01,
            hub_extra_contacts: SizeRange::new(20, 50),
        }
    }
}

impl LayeredParams {
    pub fn validate(&self) -> Result<(), EpiError> {
        if self.household_size_weights.is_empty()
            || self
                .household_size_weights
                .iter()
                .any(|w| !w.is_finite() || *w < 0.0)
            || self.household_size_weights.iter().sum::<f64>() <= 0.0
        {
            return Err(EpiError::InvalidParameter(
                "household_size_weights must be non-negative with a positive sum".to_string(),
            ));
        }
        self.workplace_size.validate("workplace_size", false)?;
        self.school_size.validate("school_size", false)?;
        self.hub_extra_contacts.validate("hub_extra_contacts", true)?;

        check_probability("workplace_contact_probability", self.workplace_contact_probability)?;
        check_probability("school_contact_probability", self.school_contact_probability)?;
        check_probability("employment_rate", self.employment_rate)?;
        check_probability("hub_fraction", self.hub_fraction)?;
        check_probability("household_weight", self.household_weight)?;
        check_probability("workplace_weight", self.workplace_weight)?;
        check_probability("school_weight", self.school_weight)?;
        check_probability("community_weight", self.community_weight)?;

        if !self.community_mean_degree.is_finite() || self.community_mean_degree < 0.0 {
            return Err(EpiError::InvalidParameter(format!(
                "community_mean_degree must be a non-negative number, got {}",
                self.community_mean_degree
            )));
        }
        Ok(())
    }
}

pub(crate) fn check_probability(name: &str, value: f64) -> Result<(), EpiError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EpiError::InvalidParameter(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domains_are_checked() {
        let bad = [
            Topology::RandomGraph {
                edge_probability: -0.1,
            },
            Topology::RandomGraph {
                edge_probability: f64::NAN,
            },
            Topology::SmallWorld {
                neighbors: 3,
                rewire_probability: 0.1,
            },
            Topology::SmallWorld {
                neighbors: 10,
                rewire_probability: 0.1,
            },
            Topology::ScaleFree { edges_per_node: 0 },
            Topology::ScaleFree { edges_per_node: 10 },
            Topology::Community {
                communities: 11,
                intra_probability: 0.5,
                inter_probability: 0.01,
            },
        ];
        for topology in bad {
            assert!(
                matches!(topology.validate(10), Err(EpiError::InvalidParameter(_))),
                "{topology:?} should be rejected"
            );
        }
        assert!(Topology::default().validate(10).is_ok());
    }

    #[test]
    fn layered_params_reject_inverted_ranges() {
        let params = LayeredParams {
            school_size: SizeRange::new(40, 20),
            ..LayeredParams::default()
        };
        assert!(params.validate().is_err());

        let params = LayeredParams {
            household_size_weights: vec![0.0, 0.0],
            ..LayeredParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn topology_deserializes_from_tagged_json() {
        let topology: Topology =
            serde_json::from_str(r#"{"type": "small_world", "neighbors": 6, "rewire_probability": 0.1}"#)
                .unwrap();
        assert_eq!(
            topology,
            Topology::SmallWorld {
                neighbors: 6,
                rewire_probability: 0.1
            }
        );

        let layered: Topology =
            serde_json::from_str(r#"{"type": "layered", "employment_rate": 0.5}"#).unwrap();
        match layered {
            Topology::Layered(params) => {
                assert!((params.employment_rate - 0.5).abs() < 1e-12);
                assert_eq!(params.school_size, SizeRange::new(20, 40));
            }
            other => panic!("unexpected topology {other:?}"),
        }
    }
}

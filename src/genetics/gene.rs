//! Bounded real-valued genes encoding innate urn biases.

use crate::error::{ConfigError, ProtocolViolation};
use ndarray::{Array2, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a fresh gene is filled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeneInitRepr", into = "GeneInitRepr")]
pub enum GeneInit {
    /// Independent uniform draw per position
    Random,
    /// Same value broadcast to every position
    Constant(f64),
}

impl Default for GeneInit {
    fn default() -> Self {
        GeneInit::Constant(0.0)
    }
}

impl fmt::Display for GeneInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeneInit::Random => f.write_str("random"),
            GeneInit::Constant(v) => write!(f, "{}", v),
        }
    }
}

/// YAML form: the keyword `random` or a plain number
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum GeneInitRepr {
    Value(f64),
    Keyword(String),
}

impl TryFrom<GeneInitRepr> for GeneInit {
    type Error = ConfigError;

    fn try_from(repr: GeneInitRepr) -> Result<Self, Self::Error> {
        match repr {
            GeneInitRepr::Value(v) => Ok(GeneInit::Constant(v)),
            GeneInitRepr::Keyword(k) if k.eq_ignore_ascii_case("random") => Ok(GeneInit::Random),
            GeneInitRepr::Keyword(k) => Err(ConfigError::InvalidInit(k)),
        }
    }
}

impl From<GeneInit> for GeneInitRepr {
    fn from(init: GeneInit) -> Self {
        match init {
            GeneInit::Random => GeneInitRepr::Keyword("random".to_string()),
            GeneInit::Constant(v) => GeneInitRepr::Value(v),
        }
    }
}

/// Check a pair of gene bounds
pub fn validate_bounds(min: f64, max: f64) -> Result<(), ConfigError> {
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(ConfigError::InvalidBounds { min, max });
    }
    Ok(())
}

/// Fixed-shape array of values clamped to `[min, max]`.
///
/// Shape and bounds never change after construction; only the values do,
/// through [`Gene::mutate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    min: f64,
    max: f64,
    values: Array2<f64>,
}

impl Gene {
    /// Build a gene of `shape` filled according to `init`
    pub fn new<R: Rng + ?Sized>(
        shape: (usize, usize),
        min: f64,
        max: f64,
        init: GeneInit,
        rng: &mut R,
    ) -> Result<Self, ConfigError> {
        validate_bounds(min, max)?;
        if shape.0 == 0 || shape.1 == 0 {
            return Err(ConfigError::Zero("gene dimension"));
        }

        let values = match init {
            GeneInit::Random => Array2::from_shape_fn(shape, |_| rng.gen_range(min..=max)),
            GeneInit::Constant(value) => {
                if !(min..=max).contains(&value) {
                    return Err(ConfigError::InitOutOfBounds { value, min, max });
                }
                Array2::from_elem(shape, value)
            }
        };

        Ok(Self { min, max, values })
    }

    /// Wrap explicit values, rejecting any outside the bounds
    pub fn from_values(values: Array2<f64>, min: f64, max: f64) -> Result<Self, ConfigError> {
        validate_bounds(min, max)?;
        if values.is_empty() {
            return Err(ConfigError::Zero("gene dimension"));
        }
        if let Some(&value) = values.iter().find(|v| !(min..=max).contains(*v)) {
            return Err(ConfigError::InitOutOfBounds { value, min, max });
        }
        Ok(Self { min, max, values })
    }

    /// Uniform crossover: each position comes from one parent, picked by a
    /// fair coin. Neither parent is modified.
    pub fn crossover<R: Rng + ?Sized>(&self, other: &Gene, rng: &mut R) -> Result<Gene, ProtocolViolation> {
        if !self.is_compatible(other) {
            return Err(ProtocolViolation::IncompatibleGenes);
        }

        let values = Zip::from(&self.values)
            .and(&other.values)
            .map_collect(|&mine, &theirs| if rng.gen_bool(0.5) { mine } else { theirs });

        Ok(Gene {
            min: self.min,
            max: self.max,
            values,
        })
    }

    /// Reset mutation: each position is redrawn uniformly with probability
    /// `rate`. Returns `self` for chaining.
    pub fn mutate<R: Rng + ?Sized>(&mut self, rate: f64, rng: &mut R) -> &mut Self {
        if rate <= 0.0 {
            return self;
        }
        let (min, max) = (self.min, self.max);
        self.values.mapv_inplace(|v| {
            if rng.gen::<f64>() < rate {
                rng.gen_range(min..=max)
            } else {
                v
            }
        });
        self
    }

    /// Same shape and bounds
    pub fn is_compatible(&self, other: &Gene) -> bool {
        self.values.dim() == other.values.dim() && self.min == other.min && self.max == other.max
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Value at `(row, col)`, if in range
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get((row, col)).copied()
    }

    /// Mean over all positions
    pub fn mean(&self) -> f64 {
        self.values.mean().unwrap_or(0.0)
    }
}

use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::EstimationError;

/// Declaration of a model parameter: its name and open domain `(lower, upper)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    name: String,
    lower: f64,
    upper: f64,
}

impl Parameter {
    /// A strictly positive parameter, the usual case for rates, volumes and error magnitudes
    pub fn positive(name: impl Into<String>) -> Self {
        Self::bounded(name, 0.0, f64::INFINITY)
    }

    /// A parameter restricted to the open interval `(lower, upper)`
    pub fn bounded(name: impl Into<String>, lower: f64, upper: f64) -> Self {
        Parameter {
            name: name.into(),
            lower,
            upper,
        }
    }

    /// A parameter taking any finite value
    pub fn unbounded(name: impl Into<String>) -> Self {
        Self::bounded(name, f64::NEG_INFINITY, f64::INFINITY)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub(crate) fn check(&self, value: f64) -> Result<(), EstimationError> {
        if value.is_finite() && value > self.lower && value < self.upper {
            Ok(())
        } else {
            Err(EstimationError::ParameterDomain {
                name: self.name.clone(),
                value,
                lower: self.lower,
                upper: self.upper,
            })
        }
    }
}

/// Ordered, named parameter values
///
/// The order is fixed for the life of an estimation run. Names are shared between
/// all vectors derived with [ParameterVector::with_values], so the candidates the
/// optimizer creates during the search only allocate their values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterVector {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl ParameterVector {
    pub fn new(names: Vec<String>, values: Vec<f64>) -> Result<Self, EstimationError> {
        if names.len() != values.len() {
            return Err(EstimationError::InvalidData(format!(
                "{} parameter names but {} values",
                names.len(),
                values.len()
            )));
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(EstimationError::InvalidData(format!(
                    "duplicate parameter name {}",
                    name
                )));
            }
        }
        Ok(ParameterVector {
            names: names.into(),
            values,
        })
    }

    /// Build from `(name, value)` pairs, keeping their order
    ///
    /// ```
    /// use pmfit::ParameterVector;
    ///
    /// let theta = ParameterVector::from_pairs(&[("cl", 1.0), ("vc", 20.0)]).unwrap();
    /// assert_eq!(theta.get("vc"), Some(20.0));
    /// ```
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Result<Self, EstimationError> {
        let (names, values) = pairs.iter().map(|(n, v)| (n.to_string(), *v)).unzip();
        Self::new(names, values)
    }

    /// Same names, new values
    pub fn with_values(&self, values: Vec<f64>) -> Result<Self, EstimationError> {
        if values.len() != self.names.len() {
            return Err(EstimationError::InvalidData(format!(
                "expected {} parameter values, got {}",
                self.names.len(),
                values.len()
            )));
        }
        Ok(ParameterVector {
            names: Arc::clone(&self.names),
            values,
        })
    }

    /// Copy with the parameter at `index` shifted by `delta`
    pub(crate) fn perturbed(&self, index: usize, delta: f64) -> Self {
        let mut values = self.values.clone();
        values[index] += delta;
        ParameterVector {
            names: Arc::clone(&self.names),
            values,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl fmt::Display for ParameterVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(name, value)| format!("{} = {:.6}", name, value))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

impl Serialize for ParameterVector {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

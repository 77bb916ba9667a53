//! Named strategy parameters and parameter grids.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// A single parameter value.
///
/// Values are totally ordered (floats by `total_cmp`) so parameter sets can be ranked
/// canonically.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[derive(Debug, Clone)]
pub enum ParamValue {
    /// Boolean parameter.
    Bool(bool),
    /// Integer parameter.
    Int(i64),
    /// Float parameter.
    Float(f64),
    /// String parameter.
    Str(String),
}

impl ParamValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Float(_) => 2,
            Self::Str(_) => 3,
        }
    }
}

impl Ord for ParamValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Str(a), Self::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ParamValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ParamValue {}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

/// Free-form, ordered map of named parameters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Parameters(BTreeMap<String, ParamValue>);

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Parameters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        write!(f, "}}")
    }
}

impl Parameters {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a parameter and returns the updated set.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Returns the raw value of a parameter.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Returns an iterator over the parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no parameter is set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an integer parameter, `default` when absent.
    pub fn int_or(&self, name: &str, default: i64) -> Result<i64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Int(v)) => Ok(*v),
            // 20.0 is accepted as 20, 20.5 is not
            Some(ParamValue::Float(v)) if v.fract() == 0.0 && v.is_finite() => Ok(*v as i64),
            Some(_) => Err(Error::ParameterType {
                name: name.to_string(),
                expected: "an integer",
            }),
        }
    }

    /// Returns a float parameter, `default` when absent.
    pub fn float_or(&self, name: &str, default: f64) -> Result<f64> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(_) => Err(Error::ParameterType {
                name: name.to_string(),
                expected: "a number",
            }),
        }
    }

    /// Returns an optional float parameter.
    pub fn float_opt(&self, name: &str) -> Result<Option<f64>> {
        match self.0.get(name) {
            None => Ok(None),
            Some(_) => self.float_or(name, 0.0).map(Some),
        }
    }

    /// Returns a boolean parameter, `default` when absent.
    pub fn bool_or(&self, name: &str, default: bool) -> Result<bool> {
        match self.0.get(name) {
            None => Ok(default),
            Some(ParamValue::Bool(v)) => Ok(*v),
            Some(_) => Err(Error::ParameterType {
                name: name.to_string(),
                expected: "a boolean",
            }),
        }
    }
}

/// Cartesian grid of candidate parameter values.
///
/// Axes keep their insertion order; combinations are enumerated with the last axis
/// varying fastest.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGrid {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl ParameterGrid {
    /// Creates a new grid builder.
    pub fn builder() -> ParameterGridBuilder {
        ParameterGridBuilder::default()
    }

    /// Returns the axes of the grid.
    pub fn axes(&self) -> &[(String, Vec<ParamValue>)] {
        &self.axes
    }

    /// Returns the number of combinations.
    pub fn total_combinations(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// Returns true if the grid has no combination.
    pub fn is_empty(&self) -> bool {
        self.total_combinations() == 0
    }

    /// Enumerates all parameter combinations.
    pub fn combinations(&self) -> Vec<Parameters> {
        if self.is_empty() {
            return Vec::new();
        }

        let mut result = vec![Parameters::new()];
        for (name, values) in &self.axes {
            let mut next = Vec::with_capacity(result.len() * values.len());
            for combo in &result {
                for value in values {
                    next.push(combo.clone().with(name.clone(), value.clone()));
                }
            }
            result = next;
        }
        result
    }
}

/// Builder for [`ParameterGrid`].
#[derive(Debug, Default)]
pub struct ParameterGridBuilder {
    axes: Vec<(String, Vec<ParamValue>)>,
}

impl ParameterGridBuilder {
    /// Adds an axis of arbitrary values. A repeated name replaces the earlier axis.
    pub fn values<V: Into<ParamValue>>(mut self, name: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        match self.axes.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = values,
            None => self.axes.push((name.to_string(), values)),
        }
        self
    }

    /// Adds an integer axis.
    pub fn int(self, name: &str, values: impl IntoIterator<Item = i64>) -> Self {
        self.values(name, values)
    }

    /// Adds an inclusive integer range axis.
    pub fn int_range(self, name: &str, start: i64, end: i64, step: usize) -> Self {
        self.values(name, (start..=end).step_by(step.max(1)))
    }

    /// Adds a float axis.
    pub fn float(self, name: &str, values: impl IntoIterator<Item = f64>) -> Self {
        self.values(name, values)
    }

    /// Adds a string axis.
    pub fn string<'a>(self, name: &str, values: impl IntoIterator<Item = &'a str>) -> Self {
        self.values(name, values)
    }

    /// Adds a boolean axis.
    pub fn boolean(self, name: &str, values: impl IntoIterator<Item = bool>) -> Self {
        self.values(name, values)
    }

    /// Builds the grid.
    pub fn build(self) -> ParameterGrid {
        ParameterGrid { axes: self.axes }
    }
}

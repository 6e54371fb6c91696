use crate::compare_floats::clamp_to_bounds;
use crate::core::diagnostics::{Diagnostics, MessageKind};
use crate::errors::SizingError;
use itertools::Itertools;

/// A tabulated performance curve over two independent variables.
///
/// Output values are flattened row-major: the value at `(axis1[i], axis2[j])` is found at index
/// `i * axis2.len() + j`.
#[derive(Clone, Debug, PartialEq)]
pub struct LookupTable {
    independent_variables: Vec<Vec<f64>>,
    output_values: Vec<f64>,
    normalization_divisor: Option<f64>,
}

/// Position of a query along one axis: the two bracketing indices and the weight of the upper one.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Bracket {
    lower: usize,
    upper: usize,
    weight: f64,
}

impl Bracket {
    fn is_exact(&self) -> bool {
        self.lower == self.upper
    }
}

impl LookupTable {
    pub fn new(
        independent_variables: Vec<Vec<f64>>,
        output_values: Vec<f64>,
        normalization_divisor: Option<f64>,
    ) -> Self {
        Self {
            independent_variables,
            output_values,
            normalization_divisor,
        }
    }

    pub fn dimensions(&self) -> usize {
        self.independent_variables.len()
    }

    pub fn axis(&self, index: usize) -> Option<&[f64]> {
        self.independent_variables.get(index).map(|a| a.as_slice())
    }

    /// Check the table is usable for bilinear interpolation.
    pub fn validate(&self, curve_name: &str) -> Result<(), SizingError> {
        if self.dimensions() != 2 {
            return Err(SizingError::UnsupportedDimension {
                curve: curve_name.to_string(),
                dimensions: self.dimensions(),
            });
        }

        let axis_lengths = self
            .independent_variables
            .iter()
            .map(|axis| axis.len())
            .collect::<Vec<_>>();
        let expected = axis_lengths.iter().product::<usize>();
        if expected != self.output_values.len() {
            return Err(SizingError::ShapeMismatch {
                curve: curve_name.to_string(),
                axis_lengths,
                expected,
                actual: self.output_values.len(),
            });
        }

        for (axis_index, axis) in self.independent_variables.iter().enumerate() {
            if axis.is_empty() {
                return Err(SizingError::configuration(format!(
                    "Lookup table '{curve_name}' has an empty independent variable {}",
                    axis_index + 1
                )));
            }
            if !axis.iter().tuple_windows().all(|(a, b)| a < b) {
                return Err(SizingError::configuration(format!(
                    "Lookup table '{curve_name}' independent variable {} is not strictly ascending",
                    axis_index + 1
                )));
            }
        }

        if let Some(divisor) = self.normalization_divisor {
            if divisor == 0. {
                return Err(SizingError::configuration(format!(
                    "Lookup table '{curve_name}' has a normalization divisor of zero"
                )));
            }
        }

        Ok(())
    }

    /// Bilinearly interpolate the table at `(x, y)`.
    ///
    /// Queries outside the range of an axis are clamped to that range and a warning is recorded.
    pub fn interpolate(
        &self,
        curve_name: &str,
        x: f64,
        y: f64,
        diagnostics: &mut Diagnostics,
    ) -> Result<f64, SizingError> {
        self.validate(curve_name)?;

        let axis1 = &self.independent_variables[0];
        let axis2 = &self.independent_variables[1];

        let x = clamp_query(curve_name, 1, axis1, x, diagnostics);
        let y = clamp_query(curve_name, 2, axis2, y, diagnostics);

        let bx = bracket(axis1, x);
        let by = bracket(axis2, y);
        let value_at = |i: usize, j: usize| self.output_values[i * axis2.len() + j];

        let value = if bx.is_exact() && by.is_exact() {
            value_at(bx.lower, by.lower)
        } else {
            (1. - bx.weight) * (1. - by.weight) * value_at(bx.lower, by.lower)
                + (1. - bx.weight) * by.weight * value_at(bx.lower, by.upper)
                + bx.weight * (1. - by.weight) * value_at(bx.upper, by.lower)
                + bx.weight * by.weight * value_at(bx.upper, by.upper)
        };

        Ok(match self.normalization_divisor {
            Some(divisor) => value / divisor,
            None => value,
        })
    }
}

fn clamp_query(
    curve_name: &str,
    axis_number: usize,
    axis: &[f64],
    value: f64,
    diagnostics: &mut Diagnostics,
) -> f64 {
    let (min, max) = (axis[0], axis[axis.len() - 1]);
    let (clamped, was_clamped) = clamp_to_bounds(value, Some(min), Some(max));
    if was_clamped {
        diagnostics.warn(
            MessageKind::DomainClamp,
            format!(
                "Lookup table '{curve_name}': variable {axis_number} value {value} is outside [{min}, {max}], using {clamped}"
            ),
        );
    }
    clamped
}

/// Locate `value` (already clamped into the axis range) between two break points.
fn bracket(axis: &[f64], value: f64) -> Bracket {
    // number of break points at or below the value; at least 1 as the value is clamped
    let at_or_below = axis.partition_point(|&a| a <= value);
    let lower = at_or_below.saturating_sub(1);

    if axis[lower] == value || lower + 1 >= axis.len() {
        return Bracket {
            lower,
            upper: lower,
            weight: 0.,
        };
    }

    let upper = lower + 1;
    Bracket {
        lower,
        upper,
        weight: (value - axis[lower]) / (axis[upper] - axis[lower]),
    }
}

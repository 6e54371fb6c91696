use crate::compare_floats::clamp_to_bounds;
use crate::core::diagnostics::{Diagnostics, MessageKind};
use crate::core::performance::lookup_table::LookupTable;
use crate::errors::SizingError;
use crate::input::CurveRecord;
use strum::IntoStaticStr;

/// Domain and range limits of a closed-form curve.
///
/// Each independent variable may have its own lower and upper bound; the output may be bounded too.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurveBounds {
    pub minimum_values: Vec<Option<f64>>,
    pub maximum_values: Vec<Option<f64>>,
    pub minimum_output: Option<f64>,
    pub maximum_output: Option<f64>,
}

impl CurveBounds {
    fn for_variable(&self, index: usize) -> (Option<f64>, Option<f64>) {
        (
            self.minimum_values.get(index).copied().flatten(),
            self.maximum_values.get(index).copied().flatten(),
        )
    }
}

/// Manufacturer performance data, either as a closed-form regression or a lookup table.
#[derive(Clone, Debug, IntoStaticStr, PartialEq)]
pub enum PerformanceCurve {
    Linear {
        coefficients: [f64; 2],
        bounds: CurveBounds,
    },
    Quadratic {
        coefficients: [f64; 3],
        bounds: CurveBounds,
    },
    Cubic {
        coefficients: [f64; 4],
        bounds: CurveBounds,
    },
    BiLinear {
        coefficients: [f64; 4],
        bounds: CurveBounds,
    },
    BiQuadratic {
        coefficients: [f64; 6],
        bounds: CurveBounds,
    },
    BiCubic {
        coefficients: [f64; 10],
        bounds: CurveBounds,
    },
    /// Inputs are ordered (w, x, y, z).
    QuadLinear {
        coefficients: [f64; 5],
        bounds: CurveBounds,
    },
    Table(LookupTable),
}

impl PerformanceCurve {
    pub fn form_name(&self) -> &'static str {
        self.into()
    }

    /// Number of independent variables the curve takes.
    pub fn dimensions(&self) -> usize {
        match self {
            PerformanceCurve::Linear { .. }
            | PerformanceCurve::Quadratic { .. }
            | PerformanceCurve::Cubic { .. } => 1,
            PerformanceCurve::BiLinear { .. }
            | PerformanceCurve::BiQuadratic { .. }
            | PerformanceCurve::BiCubic { .. } => 2,
            PerformanceCurve::QuadLinear { .. } => 4,
            PerformanceCurve::Table(table) => table.dimensions(),
        }
    }

    fn bounds(&self) -> Option<&CurveBounds> {
        match self {
            PerformanceCurve::Linear { bounds, .. }
            | PerformanceCurve::Quadratic { bounds, .. }
            | PerformanceCurve::Cubic { bounds, .. }
            | PerformanceCurve::BiLinear { bounds, .. }
            | PerformanceCurve::BiQuadratic { bounds, .. }
            | PerformanceCurve::BiCubic { bounds, .. }
            | PerformanceCurve::QuadLinear { bounds, .. } => Some(bounds),
            PerformanceCurve::Table(_) => None,
        }
    }

    /// Evaluate the curve.
    ///
    /// Inputs outside the curve's domain are clamped, as is an output outside its range; each clamp
    /// is recorded in `diagnostics`.
    ///
    /// Arguments:
    /// * `curve_name` - name of the curve in the performance dataset, for reporting
    /// * `inputs` - independent variable values, in the order the curve defines them
    pub fn evaluate(
        &self,
        curve_name: &str,
        inputs: &[f64],
        diagnostics: &mut Diagnostics,
    ) -> Result<f64, SizingError> {
        if let PerformanceCurve::Table(table) = self {
            let [x, y] = inputs else {
                return Err(wrong_arity(curve_name, 2, inputs.len()));
            };
            return table.interpolate(curve_name, *x, *y, diagnostics);
        }

        if inputs.len() != self.dimensions() {
            return Err(wrong_arity(curve_name, self.dimensions(), inputs.len()));
        }

        let bounds = self.bounds().cloned().unwrap_or_default();
        let clamped = inputs
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let (lower, upper) = bounds.for_variable(i);
                let (clamped, was_clamped) = clamp_to_bounds(*value, lower, upper);
                if was_clamped {
                    diagnostics.warn(
                        MessageKind::DomainClamp,
                        format!(
                            "Curve '{curve_name}': variable {} value {value} is outside its domain, using {clamped}",
                            i + 1
                        ),
                    );
                }
                clamped
            })
            .collect::<Vec<_>>();

        let raw = match (self, clamped.as_slice()) {
            (PerformanceCurve::Linear { coefficients: c, .. }, [x]) => c[0] + c[1] * x,
            (PerformanceCurve::Quadratic { coefficients: c, .. }, [x]) => {
                c[0] + c[1] * x + c[2] * x.powi(2)
            }
            (PerformanceCurve::Cubic { coefficients: c, .. }, [x]) => {
                c[0] + c[1] * x + c[2] * x.powi(2) + c[3] * x.powi(3)
            }
            (PerformanceCurve::BiLinear { coefficients: c, .. }, [x, y]) => {
                c[0] + c[1] * x + c[2] * y + c[3] * x * y
            }
            (PerformanceCurve::BiQuadratic { coefficients: c, .. }, [x, y]) => {
                c[0] + c[1] * x + c[2] * x.powi(2) + c[3] * y + c[4] * y.powi(2) + c[5] * x * y
            }
            (PerformanceCurve::BiCubic { coefficients: c, .. }, [x, y]) => {
                c[0] + c[1] * x
                    + c[2] * x.powi(2)
                    + c[3] * y
                    + c[4] * y.powi(2)
                    + c[5] * x * y
                    + c[6] * x.powi(3)
                    + c[7] * y.powi(3)
                    + c[8] * x.powi(2) * y
                    + c[9] * x * y.powi(2)
            }
            (PerformanceCurve::QuadLinear { coefficients: c, .. }, [w, x, y, z]) => {
                c[0] + c[1] * w + c[2] * x + c[3] * y + c[4] * z
            }
            _ => unreachable!("arity was checked against the curve form above"),
        };

        let (output, was_clamped) =
            clamp_to_bounds(raw, bounds.minimum_output, bounds.maximum_output);
        if was_clamped {
            diagnostics.warn(
                MessageKind::DomainClamp,
                format!("Curve '{curve_name}': output {raw} is outside its range, using {output}"),
            );
        }
        Ok(output)
    }

    /// Build a curve from its record in the performance dataset.
    pub fn from_record(curve_name: &str, record: &CurveRecord) -> Result<Self, SizingError> {
        match record {
            CurveRecord::ClosedForm {
                form,
                coefficients,
                minimum_values,
                maximum_values,
                minimum_output,
                maximum_output,
            } => {
                let bounds = CurveBounds {
                    minimum_values: minimum_values.clone().unwrap_or_default(),
                    maximum_values: maximum_values.clone().unwrap_or_default(),
                    minimum_output: *minimum_output,
                    maximum_output: *maximum_output,
                };
                let curve = match form.as_str() {
                    "Linear" => PerformanceCurve::Linear {
                        coefficients: fixed_coefficients(curve_name, form, coefficients)?,
                        bounds,
                    },
                    "Quadratic" => PerformanceCurve::Quadratic {
                        coefficients: fixed_coefficients(curve_name, form, coefficients)?,
                        bounds,
                    },
                    "Cubic" => PerformanceCurve::Cubic {
                        coefficients: fixed_coefficients(curve_name, form, coefficients)?,
                        bounds,
                    },
                    "BiLinear" => PerformanceCurve::BiLinear {
                        coefficients: fixed_coefficients(curve_name, form, coefficients)?,
                        bounds,
                    },
                    "BiQuadratic" => PerformanceCurve::BiQuadratic {
                        coefficients: fixed_coefficients(curve_name, form, coefficients)?,
                        bounds,
                    },
                    "BiCubic" => PerformanceCurve::BiCubic {
                        coefficients: fixed_coefficients(curve_name, form, coefficients)?,
                        bounds,
                    },
                    "QuadLinear" => PerformanceCurve::QuadLinear {
                        coefficients: fixed_coefficients(curve_name, form, coefficients)?,
                        bounds,
                    },
                    other => {
                        return Err(SizingError::configuration(format!(
                            "Curve '{curve_name}' has unknown form '{other}'"
                        )))
                    }
                };
                curve.check_bounds_arity(curve_name)?;
                Ok(curve)
            }
            CurveRecord::Table {
                independent_variable_arrays,
                output_values,
                normalization_divisor,
                ..
            } => {
                let table = LookupTable::new(
                    independent_variable_arrays.clone(),
                    output_values.clone(),
                    *normalization_divisor,
                );
                table.validate(curve_name)?;
                Ok(PerformanceCurve::Table(table))
            }
        }
    }

    fn check_bounds_arity(&self, curve_name: &str) -> Result<(), SizingError> {
        if let Some(bounds) = self.bounds() {
            let dimensions = self.dimensions();
            for (label, values) in [
                ("minimum", &bounds.minimum_values),
                ("maximum", &bounds.maximum_values),
            ] {
                if !values.is_empty() && values.len() != dimensions {
                    return Err(SizingError::configuration(format!(
                        "Curve '{curve_name}' gives {} {label} values for {dimensions} variables",
                        values.len()
                    )));
                }
            }
            if let Some((lower, upper)) = bounds
                .minimum_values
                .iter()
                .zip(bounds.maximum_values.iter())
                .filter_map(|(lower, upper)| lower.zip(*upper))
                .find(|(lower, upper)| lower > upper)
            {
                return Err(SizingError::configuration(format!(
                    "Curve '{curve_name}' has a minimum value {lower} above its maximum {upper}"
                )));
            }
        }
        Ok(())
    }
}

fn fixed_coefficients<const N: usize>(
    curve_name: &str,
    form: &str,
    coefficients: &[f64],
) -> Result<[f64; N], SizingError> {
    coefficients.try_into().map_err(|_| {
        SizingError::configuration(format!(
            "Curve '{curve_name}' of form {form} needs {N} coefficients, {} given",
            coefficients.len()
        ))
    })
}

fn wrong_arity(curve_name: &str, expected: usize, actual: usize) -> SizingError {
    SizingError::configuration(format!(
        "Curve '{curve_name}' takes {expected} independent variables but was given {actual}"
    ))
}

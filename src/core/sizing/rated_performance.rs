use crate::compare_floats::{max_of_2, min_of_2};
use crate::core::diagnostics::Diagnostics;
use crate::core::performance::curve::PerformanceCurve;
use crate::core::sizing::staging::Track;
use crate::core::units::{airflow_at_cfm_per_ton, WATTS_PER_KILOWATT};
use crate::errors::SizingError;
use crate::input::CopRegressionInput;
use serde::Serialize;

/// Rated COP of a scenario's product family as a linear function of rated capacity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CopRegression {
    pub intercept: f64,
    /// per kW of rated capacity
    pub coefficient: f64,
    pub minimum: f64,
    pub maximum: f64,
}

impl From<CopRegressionInput> for CopRegression {
    fn from(input: CopRegressionInput) -> Self {
        Self {
            intercept: input.intercept,
            coefficient: input.coefficient,
            minimum: input.minimum,
            maximum: input.maximum,
        }
    }
}

impl CopRegression {
    /// Arguments:
    /// * `rated_capacity` - in W
    pub fn cop_at(&self, rated_capacity: f64) -> f64 {
        let capacity_in_kw = rated_capacity / WATTS_PER_KILOWATT as f64;
        let cop = self.intercept + self.coefficient * capacity_in_kw;
        min_of_2(max_of_2(cop, self.minimum), self.maximum)
    }
}

/// Rated efficiency of one track, adjusted for the airflow it will actually run at.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RatedPerformance {
    pub track: Track,
    /// in W
    pub rated_capacity: f64,
    /// COP before adjustment for airflow
    pub base_cop: f64,
    /// whether the base COP was given explicitly rather than from the regression
    pub explicit_cop: bool,
    pub regression: CopRegression,
    /// in cfm/ton
    pub reference_cfm_per_ton: f64,
    /// actual airflow over the reference airflow at rated capacity
    pub flow_fraction: f64,
    pub eir_modifier: f64,
    pub adjusted_cop: f64,
}

pub struct RatedPerformanceInput<'a> {
    pub track: Track,
    /// in W
    pub rated_capacity: f64,
    /// in m3/s
    pub actual_airflow: f64,
    /// in cfm/ton
    pub reference_cfm_per_ton: f64,
    pub explicit_cop: Option<f64>,
    pub regression: CopRegression,
    pub eir_ff_curve_name: &'a str,
    pub eir_ff_curve: &'a PerformanceCurve,
}

/// Adjust the rated COP of a track for the deviation of its airflow from the reference airflow.
///
/// The energy input ratio grows as airflow falls below the reference, so the COP is divided by
/// the EIR modifier at the actual flow fraction.
pub fn adjust_rated_performance(
    input: &RatedPerformanceInput,
    diagnostics: &mut Diagnostics,
) -> Result<RatedPerformance, SizingError> {
    let track = input.track;
    if input.rated_capacity <= 0. {
        return Err(SizingError::configuration(format!(
            "Rated {track} capacity must be positive, got {} W",
            input.rated_capacity
        )));
    }
    let base_cop = match input.explicit_cop {
        Some(cop) if cop <= 0. => {
            return Err(SizingError::configuration(format!(
                "Rated {track} COP must be positive, got {cop}"
            )))
        }
        Some(cop) => cop,
        None => input.regression.cop_at(input.rated_capacity),
    };

    let reference_airflow = airflow_at_cfm_per_ton(input.reference_cfm_per_ton, input.rated_capacity);
    let flow_fraction = input.actual_airflow / reference_airflow;
    let eir_modifier = eir_modifier(
        input.eir_ff_curve_name,
        input.eir_ff_curve,
        flow_fraction,
        diagnostics,
    )?;

    Ok(RatedPerformance {
        track,
        rated_capacity: input.rated_capacity,
        base_cop,
        explicit_cop: input.explicit_cop.is_some(),
        regression: input.regression,
        reference_cfm_per_ton: input.reference_cfm_per_ton,
        flow_fraction,
        eir_modifier,
        adjusted_cop: base_cop / eir_modifier,
    })
}

fn eir_modifier(
    curve_name: &str,
    curve: &PerformanceCurve,
    flow_fraction: f64,
    diagnostics: &mut Diagnostics,
) -> Result<f64, SizingError> {
    let modifier = match curve {
        // second variable held at rated conditions
        PerformanceCurve::BiQuadratic { .. } => {
            curve.evaluate(curve_name, &[flow_fraction, 1.0], diagnostics)?
        }
        PerformanceCurve::Quadratic { .. } | PerformanceCurve::Cubic { .. } => {
            curve.evaluate(curve_name, &[flow_fraction], diagnostics)?
        }
        _ => {
            return Err(SizingError::UnsupportedCurveForm {
                curve: curve_name.to_string(),
                form: curve.form_name().to_string(),
                allowed: "BiQuadratic, Quadratic, Cubic".to_string(),
            })
        }
    };
    if modifier <= 0. {
        return Err(SizingError::configuration(format!(
            "EIR modifier curve '{curve_name}' gives {modifier} at flow fraction {flow_fraction}"
        )));
    }
    Ok(modifier)
}

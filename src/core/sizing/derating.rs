use crate::core::diagnostics::Diagnostics;
use crate::core::performance::curve::PerformanceCurve;
use crate::errors::SizingError;

/// Fraction of rated capacity available at the given indoor and outdoor temperatures.
///
/// Arguments:
/// * `curve_name` - name of the derate curve, for reporting
/// * `curve` - capacity modifier taking (indoor, outdoor) temperature
/// * `indoor_temperature` - in deg C
/// * `outdoor_temperature` - in deg C
pub fn derate(
    curve_name: &str,
    curve: &PerformanceCurve,
    indoor_temperature: f64,
    outdoor_temperature: f64,
    diagnostics: &mut Diagnostics,
) -> Result<f64, SizingError> {
    match curve {
        PerformanceCurve::BiLinear { .. }
        | PerformanceCurve::BiQuadratic { .. }
        | PerformanceCurve::BiCubic { .. }
        | PerformanceCurve::Table(_) => {}
        _ => {
            return Err(SizingError::UnsupportedCurveForm {
                curve: curve_name.to_string(),
                form: curve.form_name().to_string(),
                allowed: "BiLinear, BiQuadratic, BiCubic, Table".to_string(),
            })
        }
    }

    let fraction = curve.evaluate(
        curve_name,
        &[indoor_temperature, outdoor_temperature],
        diagnostics,
    )?;
    if fraction <= 0. {
        return Err(SizingError::configuration(format!(
            "Capacity derate curve '{curve_name}' gives {fraction} at {indoor_temperature} C indoors and {outdoor_temperature} C outdoors"
        )));
    }
    Ok(fraction)
}

/// Rated capacity needed to deliver `sizing_load` when derated by `derate_fraction`, in W
pub fn required_rated_capacity(sizing_load: f64, derate_fraction: f64) -> f64 {
    sizing_load / derate_fraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::MessageKind;
    use crate::core::performance::curve::CurveBounds;
    use crate::core::performance::lookup_table::LookupTable;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn table() -> PerformanceCurve {
        PerformanceCurve::Table(LookupTable::new(
            vec![vec![15., 25.], vec![-20., 10.]],
            vec![0.5, 1.0, 0.5, 1.0],
            None,
        ))
    }

    #[rstest]
    fn should_interpolate_table_derate(table: PerformanceCurve) {
        let mut diagnostics = Diagnostics::new();
        let fraction = derate("Derate", &table, 21.11, -5., &mut diagnostics).unwrap();
        assert_relative_eq!(fraction, 0.75, max_relative = 1e-12);
        assert!(diagnostics.messages().is_empty());
    }

    #[rstest]
    fn should_clamp_and_warn_outside_table(table: PerformanceCurve) {
        let mut diagnostics = Diagnostics::new();
        let fraction = derate("Derate", &table, 21.11, -30., &mut diagnostics).unwrap();
        assert_relative_eq!(fraction, 0.5, max_relative = 1e-12);
        assert_eq!(diagnostics.count_of(MessageKind::DomainClamp), 1);
    }

    #[rstest]
    fn should_evaluate_closed_form_with_indoor_then_outdoor() {
        let curve = PerformanceCurve::BiLinear {
            coefficients: [0.5, 0.0, 0.02, 0.0],
            bounds: CurveBounds::default(),
        };
        let mut diagnostics = Diagnostics::new();
        assert_relative_eq!(
            derate("Derate", &curve, 21.11, -10., &mut diagnostics).unwrap(),
            0.3,
            max_relative = 1e-12
        );
    }

    #[rstest]
    fn should_reject_single_variable_curve() {
        let curve = PerformanceCurve::Quadratic {
            coefficients: [1., 0., 0.],
            bounds: CurveBounds::default(),
        };
        let mut diagnostics = Diagnostics::new();
        assert!(matches!(
            derate("Derate", &curve, 21.11, -10., &mut diagnostics),
            Err(SizingError::UnsupportedCurveForm { .. })
        ));
    }

    #[rstest]
    fn should_reject_non_positive_derate() {
        let curve = PerformanceCurve::BiLinear {
            coefficients: [0.0, 0.0, 0.02, 0.0],
            bounds: CurveBounds::default(),
        };
        let mut diagnostics = Diagnostics::new();
        assert!(matches!(
            derate("Derate", &curve, 21.11, -10., &mut diagnostics),
            Err(SizingError::Configuration(_))
        ));
    }

    #[rstest]
    fn should_scale_load_up_by_derate() {
        assert_eq!(required_rated_capacity(9_000., 0.75), 12_000.);
    }
}

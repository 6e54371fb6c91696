use crate::core::diagnostics::{Diagnostics, MessageKind};
use crate::errors::SizingError;
use serde::Serialize;
use strum::Display;

/// Which constraint sets the rated capacities of the replacement heat pump.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SizingRegime {
    /// The heating requirement is met by a heat pump sized for cooling.
    CoolingDominated,
    /// Heating sets the size, within the allowed cooling oversizing.
    Moderate,
    /// Heating would oversize cooling beyond the allowance, so the size is capped.
    Large,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizingDecisionInput {
    /// in W
    pub original_cooling_capacity: f64,
    pub cooling_upsizing_estimate: f64,
    /// fraction the cooling capacity may exceed the upsized cooling capacity by
    pub maximum_oversizing: f64,
    pub heating_to_cooling_ratio: f64,
    /// in W
    pub required_heating_capacity: f64,
    /// in m3/s
    pub cooling_design_airflow: f64,
    /// in m3/s
    pub zone_heating_design_airflow: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SizingDecision {
    /// in W
    pub rated_heating_capacity: f64,
    /// in W
    pub rated_cooling_capacity: f64,
    /// in m3/s
    pub design_heating_airflow: f64,
    /// in m3/s
    pub design_cooling_airflow: f64,
    pub regime: SizingRegime,
}

/// Choose rated heating and cooling capacities and the airflows to size stages against.
pub fn decide(
    input: &SizingDecisionInput,
    diagnostics: &mut Diagnostics,
) -> Result<SizingDecision, SizingError> {
    let ratio = input.heating_to_cooling_ratio;
    if ratio <= 0. {
        return Err(SizingError::configuration(format!(
            "Heating to cooling capacity ratio must be positive, got {ratio}"
        )));
    }
    if input.original_cooling_capacity <= 0. {
        return Err(SizingError::configuration(format!(
            "Original cooling capacity must be positive, got {} W",
            input.original_cooling_capacity
        )));
    }

    let upsized_cooling = input.original_cooling_capacity * input.cooling_upsizing_estimate;
    let maximum_cooling = upsized_cooling * (1. + input.maximum_oversizing);
    let maximum_heating = maximum_cooling * ratio;
    let required_heating = input.required_heating_capacity;

    let (regime, rated_heating_capacity, rated_cooling_capacity) =
        if required_heating / upsized_cooling <= ratio {
            (
                SizingRegime::CoolingDominated,
                upsized_cooling * ratio,
                upsized_cooling,
            )
        } else if required_heating <= maximum_heating {
            (
                SizingRegime::Moderate,
                required_heating,
                required_heating / ratio,
            )
        } else {
            (
                SizingRegime::Large,
                maximum_cooling * ratio,
                maximum_cooling,
            )
        };

    let design_heating_airflow = match regime {
        SizingRegime::CoolingDominated => input.cooling_design_airflow,
        SizingRegime::Moderate | SizingRegime::Large => input
            .zone_heating_design_airflow
            .unwrap_or(input.cooling_design_airflow),
    };

    diagnostics.info(
        MessageKind::RegimeSelected,
        format!(
            "Sizing regime {regime}: rated heating {rated_heating_capacity:.0} W, rated cooling {rated_cooling_capacity:.0} W for {required_heating:.0} W required"
        ),
    );

    Ok(SizingDecision {
        rated_heating_capacity,
        rated_cooling_capacity,
        design_heating_airflow,
        design_cooling_airflow: input.cooling_design_airflow,
        regime,
    })
}

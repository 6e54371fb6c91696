use crate::compare_floats::max_of_2;
use crate::core::diagnostics::{Diagnostics, MessageKind};
use crate::core::equipment::OriginalCoil;
use crate::core::units::fahrenheit_to_celsius;
use crate::errors::SizingError;
use crate::sizing_results::{coil_peak_state, SizingResults};

/// Outdoor temperature at which the building needs no heating, in deg C (60 deg F)
pub const BALANCE_POINT_TEMPERATURE: f64 = 15.56;

/// Heating capacity known to meet the load at the heating design day.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReferenceHeatingCapacity {
    /// Capacity of the original heating coil
    Nameplate(f64),
    /// Heat delivered by the original heating coil at its simulated design peak
    SimulationPeak(f64),
}

impl ReferenceHeatingCapacity {
    pub fn value(&self) -> f64 {
        match self {
            ReferenceHeatingCapacity::Nameplate(capacity)
            | ReferenceHeatingCapacity::SimulationPeak(capacity) => *capacity,
        }
    }
}

/// Finer reference capacity, computed from the air-side state of the coil at its design peak.
pub fn reference_capacity_from_run(
    results: &dyn SizingResults,
    coil: &dyn OriginalCoil,
) -> Result<ReferenceHeatingCapacity, SizingError> {
    let peak = coil_peak_state(results, coil)?;
    Ok(ReferenceHeatingCapacity::SimulationPeak(
        peak.heat_transfer_rate(),
    ))
}

/// Heating load falling linearly from the design day to zero at the balance point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DesignLoadLine {
    slope: f64,
    intercept: f64,
    design_day_temperature: f64,
}

/// Load to size heating for, with the temperature it was evaluated at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizingLoad {
    /// in deg C
    pub temperature: f64,
    /// in W
    pub load: f64,
}

impl DesignLoadLine {
    /// Arguments:
    /// * `reference_capacity` - capacity meeting the load at the design day
    /// * `design_day_temperature` - coldest heating design day outdoor temperature, in deg C
    pub fn calibrate(
        reference_capacity: ReferenceHeatingCapacity,
        design_day_temperature: f64,
    ) -> Result<Self, SizingError> {
        if design_day_temperature >= BALANCE_POINT_TEMPERATURE {
            return Err(SizingError::configuration(format!(
                "Heating design day temperature {design_day_temperature} C is not below the balance point of {BALANCE_POINT_TEMPERATURE} C"
            )));
        }
        let reference = reference_capacity.value();
        if reference <= 0. {
            return Err(SizingError::configuration(format!(
                "Reference heating capacity must be positive, got {reference} W"
            )));
        }

        let slope = reference / (design_day_temperature - BALANCE_POINT_TEMPERATURE);
        Ok(Self {
            slope,
            intercept: -slope * BALANCE_POINT_TEMPERATURE,
            design_day_temperature,
        })
    }

    /// Load on the line at an outdoor temperature, in W
    pub fn load_at(&self, outdoor_temperature: f64) -> f64 {
        self.slope * outdoor_temperature + self.intercept
    }

    /// Load to size heating for at the user's sizing temperature.
    ///
    /// The line is not extrapolated below the design day; a colder sizing temperature is replaced
    /// by the design day temperature.
    pub fn sizing_load(
        &self,
        sizing_temperature: f64,
        diagnostics: &mut Diagnostics,
    ) -> SizingLoad {
        let temperature = if sizing_temperature < self.design_day_temperature {
            diagnostics.info(
                MessageKind::SizingTemperatureClamp,
                format!(
                    "Sizing temperature {sizing_temperature} C is colder than the heating design day, using {} C",
                    self.design_day_temperature
                ),
            );
            self.design_day_temperature
        } else {
            sizing_temperature
        };

        SizingLoad {
            temperature,
            load: max_of_2(self.load_at(temperature), 0.),
        }
    }
}

/// Indoor dry bulb temperature heating capacities are rated at, in deg C
pub fn rated_heating_indoor_temperature() -> f64 {
    fahrenheit_to_celsius(70.)
}

/// Indoor wet bulb temperature cooling capacities are rated at, in deg C
pub fn rated_cooling_indoor_temperature() -> f64 {
    fahrenheit_to_celsius(67.)
}

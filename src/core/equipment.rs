use serde::Deserialize;

/// Capabilities shared by the coils found on an air handling unit before retrofit.
pub trait OriginalCoil {
    fn name(&self) -> &str;

    /// Nameplate capacity in W, if the coil was given a hard-sized capacity
    fn rated_capacity(&self) -> Option<f64>;

    /// Component type under which the coil appears in the component sizing results
    fn component_type(&self) -> &'static str;

    /// Column of the component sizing results holding the coil's design capacity
    fn capacity_column(&self) -> &'static str;
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum OriginalCoolingCoil {
    DxSingleSpeed {
        name: String,
        rated_capacity: Option<f64>,
    },
    DxTwoSpeed {
        name: String,
        rated_capacity: Option<f64>,
    },
    DxMultiSpeed {
        name: String,
        rated_capacity: Option<f64>,
    },
    ChilledWater {
        name: String,
        rated_capacity: Option<f64>,
    },
}

impl OriginalCoil for OriginalCoolingCoil {
    fn name(&self) -> &str {
        match self {
            OriginalCoolingCoil::DxSingleSpeed { name, .. }
            | OriginalCoolingCoil::DxTwoSpeed { name, .. }
            | OriginalCoolingCoil::DxMultiSpeed { name, .. }
            | OriginalCoolingCoil::ChilledWater { name, .. } => name,
        }
    }

    fn rated_capacity(&self) -> Option<f64> {
        match self {
            OriginalCoolingCoil::DxSingleSpeed { rated_capacity, .. }
            | OriginalCoolingCoil::DxTwoSpeed { rated_capacity, .. }
            | OriginalCoolingCoil::DxMultiSpeed { rated_capacity, .. }
            | OriginalCoolingCoil::ChilledWater { rated_capacity, .. } => *rated_capacity,
        }
    }

    fn component_type(&self) -> &'static str {
        match self {
            OriginalCoolingCoil::DxSingleSpeed { .. } => "Coil:Cooling:DX:SingleSpeed",
            OriginalCoolingCoil::DxTwoSpeed { .. } => "Coil:Cooling:DX:TwoSpeed",
            OriginalCoolingCoil::DxMultiSpeed { .. } => "Coil:Cooling:DX:MultiSpeed",
            OriginalCoolingCoil::ChilledWater { .. } => "Coil:Cooling:Water",
        }
    }

    fn capacity_column(&self) -> &'static str {
        match self {
            OriginalCoolingCoil::DxSingleSpeed { .. } | OriginalCoolingCoil::DxTwoSpeed { .. } => {
                "Design Size Gross Rated Total Cooling Capacity [W]"
            }
            OriginalCoolingCoil::DxMultiSpeed { .. } => {
                "Design Size Speed 1 Gross Rated Total Cooling Capacity [W]"
            }
            OriginalCoolingCoil::ChilledWater { .. } => "Design Size Design Coil Load [W]",
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(tag = "type", deny_unknown_fields)]
pub enum OriginalHeatingCoil {
    Gas {
        name: String,
        rated_capacity: Option<f64>,
    },
    Electric {
        name: String,
        rated_capacity: Option<f64>,
    },
    HotWater {
        name: String,
        rated_capacity: Option<f64>,
    },
    DxSingleSpeed {
        name: String,
        rated_capacity: Option<f64>,
    },
    DxMultiSpeed {
        name: String,
        rated_capacity: Option<f64>,
    },
}

impl OriginalHeatingCoil {
    /// Whether the coil already is a heat pump coil
    pub fn is_heat_pump(&self) -> bool {
        matches!(
            self,
            OriginalHeatingCoil::DxSingleSpeed { .. } | OriginalHeatingCoil::DxMultiSpeed { .. }
        )
    }
}

impl OriginalCoil for OriginalHeatingCoil {
    fn name(&self) -> &str {
        match self {
            OriginalHeatingCoil::Gas { name, .. }
            | OriginalHeatingCoil::Electric { name, .. }
            | OriginalHeatingCoil::HotWater { name, .. }
            | OriginalHeatingCoil::DxSingleSpeed { name, .. }
            | OriginalHeatingCoil::DxMultiSpeed { name, .. } => name,
        }
    }

    fn rated_capacity(&self) -> Option<f64> {
        match self {
            OriginalHeatingCoil::Gas { rated_capacity, .. }
            | OriginalHeatingCoil::Electric { rated_capacity, .. }
            | OriginalHeatingCoil::HotWater { rated_capacity, .. }
            | OriginalHeatingCoil::DxSingleSpeed { rated_capacity, .. }
            | OriginalHeatingCoil::DxMultiSpeed { rated_capacity, .. } => *rated_capacity,
        }
    }

    fn component_type(&self) -> &'static str {
        match self {
            OriginalHeatingCoil::Gas { .. } => "Coil:Heating:Fuel",
            OriginalHeatingCoil::Electric { .. } => "Coil:Heating:Electric",
            OriginalHeatingCoil::HotWater { .. } => "Coil:Heating:Water",
            OriginalHeatingCoil::DxSingleSpeed { .. } => "Coil:Heating:DX:SingleSpeed",
            OriginalHeatingCoil::DxMultiSpeed { .. } => "Coil:Heating:DX:MultiSpeed",
        }
    }

    fn capacity_column(&self) -> &'static str {
        match self {
            OriginalHeatingCoil::Gas { .. } | OriginalHeatingCoil::Electric { .. } => {
                "Design Size Nominal Capacity [W]"
            }
            OriginalHeatingCoil::HotWater { .. } => "Design Size Rated Capacity [W]",
            OriginalHeatingCoil::DxSingleSpeed { .. } => {
                "Design Size Gross Rated Heating Capacity [W]"
            }
            OriginalHeatingCoil::DxMultiSpeed { .. } => {
                "Design Size Speed 1 Gross Rated Heating Capacity [W]"
            }
        }
    }
}

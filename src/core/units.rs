pub const WATTS_PER_KILOWATT: u32 = 1_000;
pub const WATTS_PER_TON: f64 = 3_516.852_842_067;
pub const CUBIC_METRES_PER_SECOND_PER_CFM: f64 = 0.000_471_947_443;

pub(crate) fn fahrenheit_to_celsius(temp_f: f64) -> f64 {
    (temp_f - 32.) * 5. / 9.
}

pub fn watts_to_tons(capacity_in_w: f64) -> f64 {
    capacity_in_w / WATTS_PER_TON
}

pub fn tons_to_watts(capacity_in_tons: f64) -> f64 {
    capacity_in_tons * WATTS_PER_TON
}

pub fn m3_per_s_to_cfm(airflow_in_m3_per_s: f64) -> f64 {
    airflow_in_m3_per_s / CUBIC_METRES_PER_SECOND_PER_CFM
}

pub fn cfm_to_m3_per_s(airflow_in_cfm: f64) -> f64 {
    airflow_in_cfm * CUBIC_METRES_PER_SECOND_PER_CFM
}

/// Airflow per unit capacity, in cfm/ton
///
/// Arguments:
/// * `airflow_in_m3_per_s` - volumetric airflow, in m3/s
/// * `capacity_in_w` - thermal capacity, in W
pub fn cfm_per_ton(airflow_in_m3_per_s: f64, capacity_in_w: f64) -> f64 {
    m3_per_s_to_cfm(airflow_in_m3_per_s) / watts_to_tons(capacity_in_w)
}

/// Airflow (m3/s) giving the requested cfm/ton at a capacity in W
pub fn airflow_at_cfm_per_ton(cfm_per_ton: f64, capacity_in_w: f64) -> f64 {
    cfm_to_m3_per_s(cfm_per_ton * watts_to_tons(capacity_in_w))
}

/// Capacity (W) at which an airflow in m3/s gives the requested cfm/ton
pub fn capacity_at_cfm_per_ton(cfm_per_ton: f64, airflow_in_m3_per_s: f64) -> f64 {
    tons_to_watts(m3_per_s_to_cfm(airflow_in_m3_per_s) / cfm_per_ton)
}

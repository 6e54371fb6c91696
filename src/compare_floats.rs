pub fn min_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first < second {
        first
    } else {
        second
    }
}

pub fn max_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first > second {
        first
    } else {
        second
    }
}

/// Clamp `value` into `[lower, upper]`, where either bound may be absent.
///
/// Returns the clamped value and whether clamping took place.
pub(crate) fn clamp_to_bounds(value: f64, lower: Option<f64>, upper: Option<f64>) -> (f64, bool) {
    if let Some(lower) = lower {
        if value < lower {
            return (lower, true);
        }
    }
    if let Some(upper) = upper {
        if value > upper {
            return (upper, true);
        }
    }
    (value, false)
}

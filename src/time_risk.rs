//! Time-of-day risk multiplier.
//!
//! A fixed lookup table keyed on the local hour component of the supplied
//! timestamp. The ranges are exhaustive and non-overlapping across the
//! 24-hour day, so exactly one of the four values is always returned:
//!
//! | Hour range  | Multiplier |
//! |-------------|------------|
//! | 05:00-09:59 | 0.7        |
//! | 10:00-16:59 | 0.8        |
//! | 17:00-20:59 | 1.0        |
//! | 21:00-04:59 | 1.3        |

use chrono::Timelike;

/// Risk multiplier for the hour-of-day of `at`.
pub fn multiplier_for<T: Timelike>(at: &T) -> f64 {
    match at.hour() {
        5..=9 => 0.7,
        10..=16 => 0.8,
        17..=20 => 1.0,
        // 21:00 through 04:59
        _ => 1.3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn at(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 30, 0).unwrap()
    }

    #[test]
    fn test_table_boundaries() {
        assert_eq!(multiplier_for(&at(4)), 1.3);
        assert_eq!(multiplier_for(&at(5)), 0.7);
        assert_eq!(multiplier_for(&at(9)), 0.7);
        assert_eq!(multiplier_for(&at(10)), 0.8);
        assert_eq!(multiplier_for(&at(16)), 0.8);
        assert_eq!(multiplier_for(&at(17)), 1.0);
        assert_eq!(multiplier_for(&at(20)), 1.0);
        assert_eq!(multiplier_for(&at(21)), 1.3);
        assert_eq!(multiplier_for(&at(0)), 1.3);
    }

    #[test]
    fn test_every_hour_is_covered() {
        for hour in 0..24 {
            let m = multiplier_for(&at(hour));
            assert!([0.7, 0.8, 1.0, 1.3].contains(&m));
        }
    }
}

//! Sine lookup table for tone synthesis.
//!
//! One entry per integer degree over a full cycle, values in [-1.0, 1.0].
//! Built once on first use and never written afterwards.

use once_cell::sync::Lazy;

/// Number of entries in the table (one per degree).
pub const TABLE_SIZE: usize = 360;

/// Shared sine table.
pub static SINE_TABLE: Lazy<SineTable> = Lazy::new(SineTable::build);

/// Immutable one-degree-resolution sine table.
pub struct SineTable {
    values: [f32; TABLE_SIZE],
}

impl SineTable {
    fn build() -> Self {
        let mut values = [0.0f32; TABLE_SIZE];
        for (degree, value) in values.iter_mut().enumerate() {
            *value = (degree as f64).to_radians().sin() as f32;
        }
        Self { values }
    }

    /// Sine of `degree`, wrapped into one cycle.
    #[inline]
    pub fn at(&self, degree: usize) -> f32 {
        self.values[degree % TABLE_SIZE]
    }

    pub const fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_size() {
        assert_eq!(SINE_TABLE.as_slice().len(), TABLE_SIZE);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_quadrants() {
        assert!(SINE_TABLE.at(0).abs() < 1e-6);
        assert_eq!(SINE_TABLE.at(90), 1.0);
        assert!(SINE_TABLE.at(180).abs() < 1e-6);
        assert_eq!(SINE_TABLE.at(270), -1.0);
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn test_wraps_past_full_cycle() {
        assert_eq!(SINE_TABLE.at(450), SINE_TABLE.at(90));
        assert_eq!(SINE_TABLE.at(360), SINE_TABLE.at(0));
    }

    #[test]
    fn test_range_and_symmetry() {
        for degree in 0..180 {
            let a = SINE_TABLE.at(degree);
            let b = SINE_TABLE.at(degree + 180);
            assert!((-1.0..=1.0).contains(&a));
            assert!((a + b).abs() < 1e-6, "sin(x) != -sin(x + 180) at {degree}");
        }
    }
}

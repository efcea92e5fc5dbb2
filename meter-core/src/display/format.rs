//! Fixed-point readouts for the display.
//!
//! Values are truncated toward zero, never rounded: 14.99 V reads `14.9`.

use core::fmt;

/// Number with a fixed count of fractional digits, truncated toward zero.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fixed {
    value: f32,
    decimals: u8,
}

impl Fixed {
    #[must_use]
    pub const fn new(value: f32, decimals: u8) -> Self {
        Self { value, decimals }
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10_i64.pow(u32::from(self.decimals));
        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let scaled = (f64::from(self.value) * scale as f64) as i64;

        if scaled < 0 {
            f.write_str("-")?;
        }
        let magnitude = scaled.unsigned_abs();
        let scale = scale.unsigned_abs();
        let whole = magnitude / scale;

        if self.decimals == 0 {
            return write!(f, "{whole}");
        }
        let fraction = magnitude % scale;
        write!(
            f,
            "{whole}.{fraction:0width$}",
            width = usize::from(self.decimals)
        )
    }
}

/// Energy readout: whole watt-hours below 1.0, three-decimal kWh from 1.0 up.
///
/// The accumulator value is shown as thousandths below the switch-over, so
/// 0.4567 reads `456Wh` and 1.0 reads `1.000kWh`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Energy(pub f32);

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 1.0 {
            write!(f, "{}Wh", Fixed::new(self.0 * 1_000.0, 0))
        } else {
            write!(f, "{}kWh", Fixed::new(self.0, 3))
        }
    }
}

#[cfg(test)]
mod tests {
    use core::fmt::Write;

    use heapless::String;

    use super::*;

    fn render(value: impl fmt::Display) -> String<24> {
        let mut out = String::new();
        write!(out, "{value}").unwrap();
        out
    }

    #[test]
    fn truncates_instead_of_rounding() {
        assert_eq!(render(Fixed::new(14.99, 1)), "14.9");
        assert_eq!(render(Fixed::new(1.999, 2)), "1.99");
        assert_eq!(render(Fixed::new(0.05, 1)), "0.0");
        assert_eq!(render(Fixed::new(150.0, 1)), "150.0");
    }

    #[test]
    fn pads_fraction_digits() {
        assert_eq!(render(Fixed::new(1.07, 2)), "1.07");
        assert_eq!(render(Fixed::new(0.0625, 2)), "0.06");
        assert_eq!(render(Fixed::new(3.0, 2)), "3.00");
        assert_eq!(render(Fixed::new(2.0625, 3)), "2.062");
    }

    #[test]
    fn negative_values_truncate_toward_zero() {
        assert_eq!(render(Fixed::new(-1.27, 1)), "-1.2");
    }

    #[test]
    fn energy_switches_units_exactly_at_one() {
        assert_eq!(render(Energy(0.0)), "0Wh");
        assert_eq!(render(Energy(0.4567)), "456Wh");
        assert_eq!(render(Energy(0.999_9)), "999Wh");
        assert_eq!(render(Energy(1.0)), "1.000kWh");
        assert_eq!(render(Energy(12.345_6)), "12.345kWh");
    }
}

//! Analog signal conditioning.
//!
//! Pure conversions from pin voltages (or raw on-chip ADC codes) to
//! engineering units for the instrumentation and auxiliary sensors, plus the
//! recursive moving-average filter every slow analog channel runs through.
//! Everything here is stateless except [`ExpMovingAverage`] and fully
//! host-testable.

/// Constants fixed by the instrumentation board layout. Per-deployment
/// tunables live in [`crate::config::SystemConfig`]; these only change when
/// the board is reworked.
pub mod board {
    /// LV-20P secondary/primary output ratio. The datasheet reference value
    /// is 2.50; this one was fitted against multimeter measurements.
    pub const LV20P_CONVERSION_RATIO: f32 = 2.590_81;
    /// Resistor on the primary side of the LV-20P voltage sensor, in ohms.
    pub const LV20P_PRIMARY_RESISTANCE: i32 = 4700;
    /// Resistance of the LV-20P primary coil, in ohms.
    pub const LV20P_PRIMARY_COIL_RESISTANCE: i32 = 250;
    /// Burden resistor on the LV-20P secondary side, in ohms.
    pub const LV20P_BURDEN_RESISTANCE: i32 = 33;
    /// Slope of the battery-voltage correction fitted against a multimeter.
    pub const BATTERY_VOLTAGE_SLOPE: f32 = 1.002_505_9;

    /// Full-scale range selected on the T201 DIP switches, in amperes.
    pub const T201_FULL_SCALE: f32 = 100.0;
    /// LA-55P secondary/primary current ratio.
    pub const LA55_CONVERSION_RATIO: f32 = 0.001;
    /// Burden resistors per channel, in ohms.
    pub const MOTOR_BURDEN_RESISTANCE: i32 = 22;
    pub const BATTERY_BURDEN_RESISTANCE: i32 = 22;
    pub const MPPT_BURDEN_RESISTANCE: i32 = 10;

    /// 4k7-1k divider feeding the auxiliary battery and pump sense inputs.
    pub const AUX_DIVIDER_RATIO: f32 = 1.0 / (4.7 + 1.0);
    /// On-chip ADC reference, in volts.
    pub const AUX_ADC_REFERENCE: f32 = 3.3;
    /// On-chip ADC full-scale code (12-bit).
    pub const AUX_ADC_RESOLUTION: u16 = 4095;
    /// Sensed voltage above which a bilge pump counts as running.
    pub const PUMP_THRESHOLD_VOLTS: f32 = 10.0;
}

/// Apply a linear calibration fitted against reference measurements.
pub fn linear_correction(input: f32, slope: f32, intercept: f32) -> f32 {
    slope * input + intercept
}

/// Voltage drop across the LV-20P primary resistor, recovered from the
/// burden voltage seen at the ADC pin.
pub fn lv20p_primary_drop(
    pin_voltage: f32,
    sensor_output_ratio: f32,
    primary_resistance: i32,
    burden_resistance: i32,
) -> f32 {
    pin_voltage * primary_resistance as f32 / (burden_resistance as f32 * sensor_output_ratio)
}

/// Input voltage at the LV-20P primary side, given the primary resistor drop
/// and the coil/resistor divider ratio.
pub fn lv20p_input_voltage(primary_resistor_drop: f32, divider_ratio: f32) -> f32 {
    primary_resistor_drop + primary_resistor_drop * divider_ratio
}

/// Primary-side current of a LA-55P hall sensor from its burden voltage.
pub fn la55_current(pin_voltage: f32, sensor_output_ratio: f32, burden_resistance: i32) -> f32 {
    pin_voltage / (burden_resistance as f32 * sensor_output_ratio)
}

/// Primary-side current of a Seneca T201DC 4-20mA loop sensor.
///
/// The loop outputs 4mA at zero input and 20mA at full scale; the burden
/// resistor turns that into the voltage the ADC sees. Readings below the
/// 4mA point extrapolate negative, which the caller may treat as a wiring
/// fault indicator.
pub fn t201_current(pin_voltage: f32, full_scale_range: f32, burden_resistance: i32) -> f32 {
    let zero_input_voltage = 4.0 * burden_resistance as f32 * 0.001;
    let full_input_voltage = 20.0 * burden_resistance as f32 * 0.001;
    let slope = full_scale_range / (full_input_voltage - zero_input_voltage);
    let intercept = -slope * zero_input_voltage;
    slope * pin_voltage + intercept
}

/// Undo the auxiliary 4k7-1k divider: raw 12-bit ADC code to source volts.
pub fn aux_divided_voltage(raw_code: u16) -> f32 {
    (f32::from(raw_code) * board::AUX_ADC_REFERENCE)
        / (f32::from(board::AUX_ADC_RESOLUTION) * board::AUX_DIVIDER_RATIO)
}

/// Recursive moving-average filter: `filtered' = (sample + filtered*N) / (N+1)`.
///
/// Seeds from the first sample so startup does not ramp from zero.
#[derive(Debug, Clone, Copy)]
pub struct ExpMovingAverage {
    window: u16,
    filtered: Option<f32>,
}

impl ExpMovingAverage {
    pub fn new(window: u16) -> Self {
        Self {
            window,
            filtered: None,
        }
    }

    /// Fold in one sample and return the updated filtered value.
    pub fn update(&mut self, sample: f32) -> f32 {
        let n = f32::from(self.window);
        let next = match self.filtered {
            Some(filtered) => (sample + filtered * n) / (n + 1.0),
            None => sample,
        };
        self.filtered = Some(next);
        next
    }

    pub fn value(&self) -> Option<f32> {
        self.filtered
    }

    /// Drop filter history, e.g. after a sensor recalibration.
    pub fn reset(&mut self) {
        self.filtered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn t201_zero_point_maps_to_zero_amps() {
        // 4mA through 22R = 0.088V at the pin.
        let amps = t201_current(0.088, 100.0, 22);
        assert!(close(amps, 0.0), "got {amps}");
    }

    #[test]
    fn t201_full_scale_maps_to_full_range() {
        // 20mA through 22R = 0.44V at the pin.
        let amps = t201_current(0.44, 100.0, 22);
        assert!(close(amps, 100.0), "got {amps}");
    }

    #[test]
    fn t201_below_zero_point_extrapolates_negative() {
        assert!(t201_current(0.0, 100.0, 22) < 0.0);
    }

    #[test]
    fn la55_scales_by_burden_and_ratio() {
        // 0.05V across 10R burden at 1:1000 = 5A primary.
        let amps = la55_current(0.05, board::LA55_CONVERSION_RATIO, 10);
        assert!(close(amps, 5.0), "got {amps}");
    }

    #[test]
    fn lv20p_chain_recovers_battery_voltage() {
        // Work the chain backwards from a known 48V battery.
        let divider = board::LV20P_PRIMARY_COIL_RESISTANCE as f32
            / board::LV20P_PRIMARY_RESISTANCE as f32;
        let drop = 48.0 / (1.0 + divider);
        let pin = drop * board::LV20P_BURDEN_RESISTANCE as f32 * board::LV20P_CONVERSION_RATIO
            / board::LV20P_PRIMARY_RESISTANCE as f32;

        let recovered_drop = lv20p_primary_drop(
            pin,
            board::LV20P_CONVERSION_RATIO,
            board::LV20P_PRIMARY_RESISTANCE,
            board::LV20P_BURDEN_RESISTANCE,
        );
        let recovered = lv20p_input_voltage(recovered_drop, divider);
        assert!(close(recovered, 48.0), "got {recovered}");
    }

    #[test]
    fn aux_divider_full_scale() {
        // Full-scale code with a 1:5.7 divider reads 3.3 * 5.7 volts.
        let v = aux_divided_voltage(board::AUX_ADC_RESOLUTION);
        assert!(close(v, 3.3 * 5.7), "got {v}");
    }

    #[test]
    fn moving_average_single_step() {
        let mut filter = ExpMovingAverage::new(4);
        filter.update(10.0);
        let out = filter.update(15.0);
        assert!(close(out, 11.0), "got {out}");
    }

    #[test]
    fn moving_average_seeds_from_first_sample() {
        let mut filter = ExpMovingAverage::new(4);
        assert_eq!(filter.value(), None);
        assert!(close(filter.update(12.5), 12.5));
    }

    #[test]
    fn moving_average_converges_to_constant_input() {
        let mut filter = ExpMovingAverage::new(4);
        filter.update(0.0);
        let mut out = 0.0;
        for _ in 0..100 {
            out = filter.update(20.0);
        }
        assert!(close(out, 20.0), "got {out}");
    }

    #[test]
    fn linear_correction_identity_and_slope() {
        assert!(close(linear_correction(13.0, 1.0, 0.0), 13.0));
        let v = linear_correction(48.0, board::BATTERY_VOLTAGE_SLOPE, 0.0);
        assert!(close(v, 48.12028), "got {v}");
    }
}

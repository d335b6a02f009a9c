//! Inter-task command values carried through mailboxes.
//!
//! These are the typed payloads the command protocol task (and other
//! producers) drop into each consumer's single-slot mailbox.

/// Status beacon rates. Steady rates are symmetric on/off periods; `Pulse`
/// is a transient burst after which the previous steady rate resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkRate {
    Slow,
    Medium,
    Fast,
    Pulse,
}

impl BlinkRate {
    /// Half-period of the blink in milliseconds (time between toggles).
    pub fn period_ms(self) -> u32 {
        match self {
            Self::Slow => 2000,
            Self::Medium => 1000,
            Self::Fast => 300,
            Self::Pulse => 100,
        }
    }

    /// Map the serial `B<code>` payload byte to a steady rate.
    /// `Pulse` is internal-only and has no serial code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'0' => Some(Self::Slow),
            b'1' => Some(Self::Medium),
            b'2' => Some(Self::Fast),
            _ => None,
        }
    }
}

/// Commands for the temperature acquisition task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemperatureCommand {
    /// Re-enumerate the 1-Wire bus and refresh the probe registry.
    RescanProbes,
}

/// Diagnostic output mode of the GPS task, selected by `G<code>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsOutputMode {
    Off,
    Raw,
    Parsed,
}

impl GpsOutputMode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            b'0' => Some(Self::Off),
            b'1' => Some(Self::Raw),
            b'2' => Some(Self::Parsed),
            _ => None,
        }
    }
}

/// Commands for the auxiliary task's calibration machinery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AuxCommand {
    /// Restart the current-sensor calibration from scratch (`Q`).
    Calibrate,
    /// Applied calibration current in amperes (`C<float>`).
    Current(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blink_rate_codes() {
        assert_eq!(BlinkRate::from_code(b'0'), Some(BlinkRate::Slow));
        assert_eq!(BlinkRate::from_code(b'1'), Some(BlinkRate::Medium));
        assert_eq!(BlinkRate::from_code(b'2'), Some(BlinkRate::Fast));
        assert_eq!(BlinkRate::from_code(b'3'), None);
        assert_eq!(BlinkRate::from_code(b'p'), None);
    }

    #[test]
    fn blink_periods_are_ordered() {
        assert!(BlinkRate::Slow.period_ms() > BlinkRate::Medium.period_ms());
        assert!(BlinkRate::Medium.period_ms() > BlinkRate::Fast.period_ms());
        assert!(BlinkRate::Fast.period_ms() > BlinkRate::Pulse.period_ms());
    }

    #[test]
    fn gps_mode_codes() {
        assert_eq!(GpsOutputMode::from_code(b'0'), Some(GpsOutputMode::Off));
        assert_eq!(GpsOutputMode::from_code(b'2'), Some(GpsOutputMode::Parsed));
        assert_eq!(GpsOutputMode::from_code(b'9'), None);
    }
}

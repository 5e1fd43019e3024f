//! Maps `Box<dyn Error>` from collaborator boundaries to typed `ScaleError`.
//!
//! With the `hardware-errors` feature, `nutri_hardware::error::HwError` is
//! downcast for a precise mapping; otherwise the message is inspected.

use crate::error::ScaleError;

/// Which collaborator produced the error; selects the fallback variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Sensor,
    Capture,
    Inference,
    Sink,
}

pub fn map_hw_error(e: &(dyn std::error::Error + 'static), stage: Stage) -> ScaleError {
    #[cfg(feature = "hardware-errors")]
    {
        use nutri_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match (stage, hw) {
                (Stage::Sensor, HwError::Timeout) => ScaleError::SensorTimeout,
                (Stage::Sensor, HwError::Disconnected(what)) => ScaleError::Disconnected(what.clone()),
                (Stage::Sensor, other) => ScaleError::Sensor(other.to_string()),
                (Stage::Capture, other) => ScaleError::Capture(other.to_string()),
                (Stage::Inference, other) => ScaleError::Inference(other.to_string()),
                (Stage::Sink, other) => ScaleError::Sink(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    match stage {
        Stage::Sensor if s.to_lowercase().contains("timeout") => ScaleError::SensorTimeout,
        Stage::Sensor => ScaleError::Sensor(s),
        Stage::Capture => ScaleError::Capture(s),
        Stage::Inference => ScaleError::Inference(s),
        Stage::Sink => ScaleError::Sink(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_fallback_detects_timeout() {
        let e = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timeout");
        assert_eq!(map_hw_error(&e, Stage::Sensor), ScaleError::SensorTimeout);
        assert!(matches!(map_hw_error(&e, Stage::Capture), ScaleError::Capture(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_hardware_disconnect() {
        let e = nutri_hardware::error::HwError::Disconnected("/dev/rfcomm0".into());
        assert_eq!(
            map_hw_error(&e, Stage::Sensor),
            ScaleError::Disconnected("/dev/rfcomm0".into())
        );
    }
}

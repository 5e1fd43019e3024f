//! Weight sensors: a scripted simulator and a line-oriented serial reader.
use crate::error::HwError;
use crossbeam_channel as xch;
use nutri_traits::{BoxError, WeightSensor};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;

/// Extract grams from a text frame by keeping digits and dots only.
///
/// "ST,GS,+ 150.2g" -> 150.2. Signs and units are dropped, so negative
/// readings come through as positive; the scale only ever reports tare-relative
/// weights above zero in practice.
pub fn parse_weight_frame(frame: &str) -> Option<f64> {
    let kept: String = frame
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if kept.is_empty() {
        return None;
    }
    kept.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Place an item, hold it, remove it.
fn builtin_script() -> Vec<f64> {
    let mut v = vec![0.0; 5];
    v.extend([60.0, 140.0, 151.0]);
    v.extend(std::iter::repeat_n(150.3, 15));
    v.extend(std::iter::repeat_n(0.0, 10));
    v
}

/// Replays a weight script forever, one value per read.
pub struct SimulatedScale {
    script: Vec<f64>,
    idx: usize,
}

impl SimulatedScale {
    pub fn new(script: Vec<f64>) -> Self {
        let script = if script.is_empty() {
            builtin_script()
        } else {
            script
        };
        Self { script, idx: 0 }
    }
}

impl Default for SimulatedScale {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl WeightSensor for SimulatedScale {
    fn read(&mut self, _timeout: Duration) -> Result<f64, BoxError> {
        let w = self.script[self.idx % self.script.len()];
        self.idx = self.idx.wrapping_add(1);
        tracing::trace!(weight_g = w, "simulated reading");
        Ok(w)
    }
}

type Frame = Result<f64, String>;

/// Reads newline-terminated weight frames from a character device such as a
/// bound RFCOMM port (`/dev/rfcomm0`).
///
/// A reader thread owns the device and forwards parsed frames; `read` waits
/// on that channel with the caller's timeout. EOF or an I/O error ends the
/// thread and reports the link as disconnected. `reconnect` reopens the device.
pub struct SerialScale {
    device: Option<PathBuf>,
    rx: xch::Receiver<Frame>,
}

impl SerialScale {
    pub fn open(device: impl Into<PathBuf>) -> Result<Self, HwError> {
        let device = device.into();
        let rx = spawn_reader(&device)?;
        tracing::info!(device = %device.display(), "weight device opened");
        Ok(Self {
            device: Some(device),
            rx,
        })
    }

    /// Open `device`, or start disconnected when it is not there yet so the
    /// sampler's reconnect loop picks it up later.
    pub fn open_or_wait(device: impl Into<PathBuf>) -> Self {
        let device = device.into();
        match spawn_reader(&device) {
            Ok(rx) => Self {
                device: Some(device),
                rx,
            },
            Err(e) => {
                tracing::warn!(error = %e, "weight device not available yet");
                let (_, rx) = xch::bounded::<Frame>(0);
                Self {
                    device: Some(device),
                    rx,
                }
            }
        }
    }

    /// Frames from an arbitrary reader; `reconnect` is unsupported.
    pub fn from_reader<R: BufRead + Send + 'static>(name: &str, reader: R) -> Self {
        Self {
            device: None,
            rx: spawn_lines(name.to_string(), reader),
        }
    }
}

fn spawn_reader(device: &std::path::Path) -> Result<xch::Receiver<Frame>, HwError> {
    let file = std::fs::File::open(device)
        .map_err(|e| HwError::Disconnected(format!("{}: {e}", device.display())))?;
    Ok(spawn_lines(
        device.display().to_string(),
        std::io::BufReader::new(file),
    ))
}

fn spawn_lines<R: BufRead + Send + 'static>(name: String, mut reader: R) -> xch::Receiver<Frame> {
    let (tx, rx) = xch::bounded::<Frame>(16);
    std::thread::spawn(move || {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    let _ = tx.send(Err(format!("{name}: end of stream")));
                    break;
                }
                Ok(_) => {
                    let frame = line.trim();
                    if frame.is_empty() {
                        continue;
                    }
                    match parse_weight_frame(frame) {
                        Some(v) => {
                            if tx.send(Ok(v)).is_err() {
                                break;
                            }
                        }
                        None => tracing::debug!(frame, "skipping unparseable frame"),
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(format!("{name}: {e}")));
                    break;
                }
            }
        }
        tracing::trace!(device = %name, "weight reader exiting");
    });
    rx
}

impl WeightSensor for SerialScale {
    fn read(&mut self, timeout: Duration) -> Result<f64, BoxError> {
        match self.rx.recv_timeout(timeout) {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(why)) => Err(Box::new(HwError::Disconnected(why))),
            Err(xch::RecvTimeoutError::Timeout) => Err(Box::new(HwError::Timeout)),
            Err(xch::RecvTimeoutError::Disconnected) => Err(Box::new(HwError::Disconnected(
                "reader stopped".into(),
            ))),
        }
    }

    fn reconnect(&mut self) -> Result<(), BoxError> {
        let Some(device) = self.device.as_deref() else {
            return Err(Box::new(HwError::Disconnected(
                "stream source cannot be reopened".into(),
            )));
        };
        self.rx = spawn_reader(device)?;
        tracing::info!(device = %device.display(), "weight device reopened");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("150.2", Some(150.2))]
    #[case("ST,GS,+ 150.2g", Some(150.2))]
    #[case("W: 0.0 g\r", Some(0.0))]
    #[case("-12.5", Some(12.5))]
    #[case("g", None)]
    #[case("1.2.3", None)]
    fn frames(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_weight_frame(input), expected);
    }

    #[test]
    fn simulated_scale_cycles_its_script() {
        let mut s = SimulatedScale::new(vec![1.0, 2.0]);
        let t = Duration::from_millis(1);
        let got: Vec<f64> = (0..5).map(|_| s.read(t).unwrap()).collect();
        assert_eq!(got, vec![1.0, 2.0, 1.0, 2.0, 1.0]);
    }

    #[test]
    fn builtin_script_places_and_removes_an_item() {
        let script = builtin_script();
        assert!(script.iter().any(|w| *w > 100.0));
        assert_eq!(script.last(), Some(&0.0));
    }
}

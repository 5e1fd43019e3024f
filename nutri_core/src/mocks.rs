//! Test and helper mocks for nutri_core.
use nutri_traits::{
    BoxError, Camera, ImageHandle, InferenceEngine, NutritionFacts, RankedPrediction, ResultSink,
    ScoreScale, WeightSample, WeightSensor, WeightSource,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Camera that hands back a fixed path without touching the filesystem,
/// or fails every capture when built with `failing`.
#[derive(Debug, Clone)]
pub struct StaticCamera {
    path: std::path::PathBuf,
    fail: bool,
    pub captures: Arc<Mutex<u32>>,
}

impl StaticCamera {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            path: path.into(),
            fail: false,
            captures: Arc::new(Mutex::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("unused.jpg")
        }
    }

    pub fn count(&self) -> u32 {
        self.captures.lock().map(|g| *g).unwrap_or(0)
    }
}

impl Camera for StaticCamera {
    fn capture(&mut self) -> Result<ImageHandle, BoxError> {
        if let Ok(mut n) = self.captures.lock() {
            *n += 1;
        }
        if self.fail {
            return Err(Box::new(std::io::Error::other("camera unavailable")));
        }
        Ok(ImageHandle::new(self.path.clone()))
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Engine that returns the same ranked list every time, or an error.
#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    predictions: Option<Vec<RankedPrediction>>,
    scale: ScoreScale,
}

impl ScriptedEngine {
    pub fn new<S: Into<String>>(preds: impl IntoIterator<Item = (S, f32)>) -> Self {
        Self {
            predictions: Some(
                preds
                    .into_iter()
                    .map(|(l, s)| RankedPrediction::new(l, s))
                    .collect(),
            ),
            scale: ScoreScale::Fraction,
        }
    }

    pub fn failing() -> Self {
        Self {
            predictions: None,
            scale: ScoreScale::Fraction,
        }
    }

    pub fn quantized(mut self) -> Self {
        self.scale = ScoreScale::Quantized;
        self
    }
}

impl InferenceEngine for ScriptedEngine {
    fn classify(&mut self, _image: &ImageHandle) -> Result<Vec<RankedPrediction>, BoxError> {
        self.predictions
            .clone()
            .ok_or_else(|| Box::new(std::io::Error::other("model not loaded")) as BoxError)
    }

    fn score_scale(&self) -> ScoreScale {
        self.scale
    }
}

/// Sink that stores every submitted result; clones share storage.
///
/// `slow` holds each submit for a while and `failing` records the attempt
/// and then reports an error, standing in for a flaky uplink.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub seen: Arc<Mutex<Vec<NutritionFacts>>>,
    delay: Duration,
    fail: bool,
}

impl RecordingSink {
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn taken(&self) -> Vec<NutritionFacts> {
        self.seen.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl ResultSink for RecordingSink {
    fn submit(&self, facts: &NutritionFacts) -> Result<(), BoxError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.seen
            .lock()
            .map_err(|_| Box::new(std::io::Error::other("poisoned")) as BoxError)?
            .push(facts.clone());
        if self.fail {
            return Err(Box::new(std::io::Error::other("upload rejected")));
        }
        Ok(())
    }
}

/// Sensor replaying a fixed script of readings or errors, then timing out.
#[derive(Debug, Default)]
pub struct ScriptedSensor {
    script: VecDeque<Result<f64, String>>,
    pub reconnects: Arc<Mutex<u32>>,
}

impl ScriptedSensor {
    pub fn new(script: impl IntoIterator<Item = Result<f64, String>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            reconnects: Arc::new(Mutex::new(0)),
        }
    }
}

impl WeightSensor for ScriptedSensor {
    fn read(&mut self, timeout: Duration) -> Result<f64, BoxError> {
        match self.script.pop_front() {
            Some(Ok(v)) => Ok(v),
            Some(Err(msg)) => Err(Box::new(std::io::Error::other(msg))),
            None => {
                std::thread::sleep(timeout.min(Duration::from_millis(5)));
                Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "read timeout",
                )))
            }
        }
    }

    fn reconnect(&mut self) -> Result<(), BoxError> {
        if let Ok(mut n) = self.reconnects.lock() {
            *n += 1;
        }
        Ok(())
    }
}

/// `WeightSource` that replays one value per `latest()` call, then repeats the last.
#[derive(Debug)]
pub struct ReplaySource {
    values: Mutex<VecDeque<f64>>,
    last: Mutex<Option<f64>>,
    connected: bool,
}

impl ReplaySource {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: Mutex::new(values.into_iter().collect()),
            last: Mutex::new(None),
            connected: true,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new([])
        }
    }
}

impl WeightSource for ReplaySource {
    fn latest(&self) -> Option<WeightSample> {
        let next = self.values.lock().ok().and_then(|mut q| q.pop_front());
        let mut last = self.last.lock().ok()?;
        if next.is_some() {
            *last = next;
        }
        last.map(|value| WeightSample {
            value,
            observed_at: Instant::now(),
        })
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

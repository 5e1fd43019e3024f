//! Still-image capture.
//!
//! Backends, in probe order: `rpicam-still`, `libcamera-still`, and a mock
//! that writes a solid test image. A CLI backend that fails at capture time
//! falls back to the mock so a cycle still has an image to classify.
use crate::error::HwError;
use crate::util::{find_on_path, run_checked};
use image::{Rgb, RgbImage};
use nutri_traits::{BoxError, Camera, ImageHandle};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraBackend {
    Rpicam,
    Libcamera,
    Mock,
}

impl CameraBackend {
    pub fn program(self) -> Option<&'static str> {
        match self {
            CameraBackend::Rpicam => Some("rpicam-still"),
            CameraBackend::Libcamera => Some("libcamera-still"),
            CameraBackend::Mock => None,
        }
    }
}

/// Preferred backend; `Auto` probes `PATH`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPref {
    #[default]
    Auto,
    Rpicam,
    Libcamera,
    Mock,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub warmup: Duration,
    /// Upper bound for a single capture command.
    pub timeout: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            output: PathBuf::from("current_food.jpg"),
            width: 1024,
            height: 768,
            warmup: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Backend that would be used for `pref` on this machine.
pub fn probe(pref: BackendPref) -> CameraBackend {
    match pref {
        BackendPref::Mock => CameraBackend::Mock,
        BackendPref::Rpicam => CameraBackend::Rpicam,
        BackendPref::Libcamera => CameraBackend::Libcamera,
        BackendPref::Auto => [CameraBackend::Rpicam, CameraBackend::Libcamera]
            .into_iter()
            .find(|b| b.program().and_then(find_on_path).is_some())
            .unwrap_or(CameraBackend::Mock),
    }
}

fn absolute(p: &Path) -> PathBuf {
    std::path::absolute(p).unwrap_or_else(|_| p.to_path_buf())
}

/// Shells out to a libcamera still-capture tool.
#[derive(Debug, Clone)]
pub struct CliCamera {
    program: String,
    settings: CaptureSettings,
}

impl CliCamera {
    pub fn new(program: impl Into<String>, mut settings: CaptureSettings) -> Self {
        settings.output = absolute(&settings.output);
        Self {
            program: program.into(),
            settings,
        }
    }

    fn command(&self) -> Command {
        let s = &self.settings;
        let mut cmd = Command::new(&self.program);
        cmd.arg("-o")
            .arg(&s.output)
            .arg("-t")
            .arg(s.warmup.as_millis().to_string())
            .arg("--width")
            .arg(s.width.to_string())
            .arg("--height")
            .arg(s.height.to_string())
            .arg("-n");
        cmd
    }
}

impl Camera for CliCamera {
    fn capture(&mut self) -> Result<ImageHandle, BoxError> {
        // A stale file must not pass for a fresh capture.
        let _ = std::fs::remove_file(&self.settings.output);
        run_checked(&mut self.command(), self.settings.timeout)?;
        if !self.settings.output.is_file() {
            return Err(Box::new(HwError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} wrote no image", self.program),
            ))));
        }
        tracing::debug!(program = %self.program, path = %self.settings.output.display(), "captured");
        Ok(ImageHandle::new(self.settings.output.clone()))
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Writes a solid red test image of the configured size, with a yellow
/// banner across the top rows.
#[derive(Debug, Clone)]
pub struct MockCamera {
    output: PathBuf,
    width: u32,
    height: u32,
}

impl MockCamera {
    pub fn new(settings: &CaptureSettings) -> Self {
        Self {
            output: absolute(&settings.output),
            width: settings.width.max(1),
            height: settings.height.max(1),
        }
    }
}

impl Camera for MockCamera {
    fn capture(&mut self) -> Result<ImageHandle, BoxError> {
        let banner = (self.height / 8).max(1);
        let img = RgbImage::from_fn(self.width, self.height, |_, y| {
            if y < banner {
                Rgb([255, 255, 0])
            } else {
                Rgb([255, 0, 0])
            }
        });
        img.save(&self.output).map_err(HwError::from)?;
        tracing::debug!(path = %self.output.display(), "mock image written");
        Ok(ImageHandle::new(self.output.clone()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Tries `primary`; on failure logs and captures with the mock instead.
pub struct FallbackCamera {
    primary: Box<dyn Camera + Send>,
    fallback: MockCamera,
}

impl FallbackCamera {
    pub fn new(primary: Box<dyn Camera + Send>, fallback: MockCamera) -> Self {
        Self { primary, fallback }
    }
}

impl Camera for FallbackCamera {
    fn capture(&mut self) -> Result<ImageHandle, BoxError> {
        match self.primary.capture() {
            Ok(img) => Ok(img),
            Err(e) => {
                tracing::warn!(camera = self.primary.name(), error = %e, "capture failed, using mock image");
                self.fallback.capture()
            }
        }
    }

    fn name(&self) -> &str {
        self.primary.name()
    }
}

/// Camera for `pref`, with mock fallback around any CLI backend.
pub fn select_camera(pref: BackendPref, settings: CaptureSettings) -> Box<dyn Camera + Send> {
    let backend = probe(pref);
    let mock = MockCamera::new(&settings);
    match backend.program() {
        Some(program) => {
            tracing::info!(program, "camera backend selected");
            Box::new(FallbackCamera::new(
                Box::new(CliCamera::new(program, settings)),
                mock,
            ))
        }
        None => {
            tracing::warn!("no camera tool found, using mock camera");
            Box::new(mock)
        }
    }
}

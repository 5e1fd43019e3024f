//! Background weight sampling.
//!
//! Spawns a thread that owns the `WeightSensor` and publishes the newest
//! reading into a lock-free slot. The control loop reads the slot without
//! blocking; a value is visible until the next reading replaces it.
//!
//! Link failures mark the sampler disconnected, wait `reconnect`, and ask the
//! sensor to reconnect. Timeouts only mean "no data yet" and keep the link.
//!
//! Each `Sampler` spawns exactly one thread, shut down and joined on drop.
use crate::error::ScaleError;
use crate::hw_error::{Stage, map_hw_error};
use nutri_traits::clock::Clock;
use nutri_traits::{WeightSample, WeightSensor, WeightSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Bits of an f64 never produced by `f64::to_bits` on a finite value.
const EMPTY: u64 = u64::MAX;
/// Granularity of interruptible waits.
const WAIT_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct Slot {
    value_bits: AtomicU64,
    observed_ms: AtomicU64,
    connected: AtomicBool,
}

impl Slot {
    fn new() -> Self {
        Self {
            value_bits: AtomicU64::new(EMPTY),
            observed_ms: AtomicU64::new(0),
            connected: AtomicBool::new(false),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    timeout: Duration,
    reconnect: Duration,
    /// `None` relies on the sensor's own blocking read for pacing.
    period: Option<Duration>,
}

pub struct Sampler {
    slot: Arc<Slot>,
    epoch: Instant,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Sampler {
    /// Paced sampler for sensors that return immediately (simulated).
    pub fn spawn<S, C>(sensor: S, hz: u32, timeout: Duration, reconnect: Duration, clock: C) -> Self
    where
        S: WeightSensor + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let period = Duration::from_millis(crate::util::period_ms(hz));
        Self::start(
            sensor,
            Timing {
                timeout,
                reconnect,
                period: Some(period),
            },
            clock,
        )
    }

    /// Event-driven sampler: `read(timeout)` blocks until a frame arrives.
    pub fn spawn_event<S, C>(sensor: S, timeout: Duration, reconnect: Duration, clock: C) -> Self
    where
        S: WeightSensor + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        Self::start(
            sensor,
            Timing {
                timeout,
                reconnect,
                period: None,
            },
            clock,
        )
    }

    fn start<S, C>(mut sensor: S, timing: Timing, clock: C) -> Self
    where
        S: WeightSensor + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let slot = Arc::new(Slot::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let epoch = clock.now();
        let slot_t = slot.clone();
        let shutdown_t = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            loop {
                if shutdown_t.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                match sensor.read(timing.timeout) {
                    Ok(v) if v.is_finite() => {
                        slot_t.value_bits.store(v.to_bits(), Ordering::Release);
                        slot_t
                            .observed_ms
                            .store(clock.ms_since(epoch), Ordering::Release);
                        if !slot_t.connected.swap(true, Ordering::AcqRel) {
                            tracing::info!("weight sensor connected");
                        }
                    }
                    Ok(v) => {
                        tracing::debug!(value = v, "discarding non-finite reading");
                    }
                    Err(e) => match map_hw_error(&*e, Stage::Sensor) {
                        ScaleError::SensorTimeout => {
                            tracing::trace!("sensor read timed out");
                        }
                        err => {
                            if slot_t.connected.swap(false, Ordering::AcqRel) {
                                tracing::warn!(error = %err, "weight sensor lost");
                            } else {
                                tracing::debug!(error = %err, "weight sensor still unavailable");
                            }
                            if !wait(&clock, timing.reconnect, &shutdown_t) {
                                break;
                            }
                            tracing::info!("reconnecting weight sensor");
                            if let Err(e) = sensor.reconnect() {
                                tracing::warn!(error = %e, "reconnect failed");
                            }
                            continue;
                        }
                    },
                }

                if let Some(period) = timing.period {
                    if !wait(&clock, period, &shutdown_t) {
                        break;
                    }
                }
            }
            tracing::trace!("sampler thread exiting cleanly");
        });

        Self {
            slot,
            epoch,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Milliseconds between the epoch and the newest reading.
    pub fn last_ok_ms(&self) -> Option<u64> {
        if self.slot.value_bits.load(Ordering::Acquire) == EMPTY {
            return None;
        }
        Some(self.slot.observed_ms.load(Ordering::Acquire))
    }
}

/// Sleep `total` in slices; false if shutdown was requested meanwhile.
fn wait<C: Clock>(clock: &C, total: Duration, shutdown: &AtomicBool) -> bool {
    let mut left = total;
    while !left.is_zero() {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        let step = left.min(WAIT_SLICE);
        clock.sleep(step);
        left = left.saturating_sub(step);
    }
    !shutdown.load(Ordering::Relaxed)
}

impl WeightSource for Sampler {
    fn latest(&self) -> Option<WeightSample> {
        let bits = self.slot.value_bits.load(Ordering::Acquire);
        if bits == EMPTY {
            return None;
        }
        let ms = self.slot.observed_ms.load(Ordering::Acquire);
        Some(WeightSample {
            value: f64::from_bits(bits),
            observed_at: self.epoch + Duration::from_millis(ms),
        })
    }

    fn is_connected(&self) -> bool {
        self.slot.connected.load(Ordering::Acquire)
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Exits between reads immediately, otherwise once the current read returns
        // (bounded by the read timeout).
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("sampler thread joined successfully"),
                Err(e) => tracing::warn!(?e, "sampler thread panicked during shutdown"),
            }
        }
    }
}

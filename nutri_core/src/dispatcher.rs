//! Background delivery of results to a `ResultSink`.
//!
//! The control loop must not wait on a slow network or a flaky external tool,
//! so results are handed to a worker thread over a bounded channel. A full
//! queue drops the new result with a warning. Dropping the dispatcher closes
//! the channel, lets the worker drain what is queued, and joins it.
use crate::hw_error::{Stage, map_hw_error};
use crossbeam_channel as xch;
use nutri_traits::{NutritionFacts, ResultSink};

/// Results waiting for delivery before new ones are dropped.
pub const DEFAULT_QUEUE: usize = 8;

pub struct SinkDispatcher {
    tx: Option<xch::Sender<NutritionFacts>>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl SinkDispatcher {
    pub fn spawn<S: ResultSink + Send + 'static>(sink: S, queue: usize) -> Self {
        Self::spawn_boxed(Box::new(sink), queue)
    }

    pub fn spawn_boxed(sink: Box<dyn ResultSink + Send>, queue: usize) -> Self {
        let (tx, rx) = xch::bounded::<NutritionFacts>(queue.max(1));
        let join_handle = std::thread::spawn(move || {
            for facts in rx.iter() {
                match sink.submit(&facts) {
                    Ok(()) => {
                        tracing::info!(food = %facts.food_key, weight_g = facts.weight_g, "result delivered");
                    }
                    Err(e) => {
                        let err = map_hw_error(&*e, Stage::Sink);
                        tracing::warn!(food = %facts.food_key, error = %err, "result delivery failed");
                    }
                }
            }
            tracing::trace!("sink worker exiting cleanly");
        });
        Self {
            tx: Some(tx),
            join_handle: Some(join_handle),
        }
    }

    /// Queue a result without blocking. Returns false when it was dropped.
    pub fn dispatch(&self, facts: NutritionFacts) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        match tx.try_send(facts) {
            Ok(()) => true,
            Err(xch::TrySendError::Full(f)) => {
                tracing::warn!(food = %f.food_key, "sink queue full, dropping result");
                false
            }
            Err(xch::TrySendError::Disconnected(f)) => {
                tracing::warn!(food = %f.food_key, "sink worker gone, dropping result");
                false
            }
        }
    }
}

impl Drop for SinkDispatcher {
    fn drop(&mut self) {
        // Closing the channel ends the worker's receive loop after it drains.
        drop(self.tx.take());
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("sink worker joined"),
                Err(e) => tracing::warn!(?e, "sink worker panicked during shutdown"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::RecordingSink;
    use std::time::{Duration, Instant};

    fn facts(food: &str) -> NutritionFacts {
        NutritionFacts {
            food_key: food.into(),
            weight_g: 100.0,
            calories: 52.0,
            protein_g: 0.3,
            carbs_g: 14.0,
            fats_g: 0.2,
        }
    }

    /// Signals when a submit starts, then blocks until released.
    struct GatedSink {
        started: xch::Sender<()>,
        release: xch::Receiver<()>,
        inner: RecordingSink,
    }

    impl ResultSink for GatedSink {
        fn submit(&self, f: &NutritionFacts) -> Result<(), nutri_traits::BoxError> {
            let _ = self.started.send(());
            let _ = self.release.recv();
            self.inner.submit(f)
        }
    }

    #[test]
    fn slow_failing_sink_does_not_block_dispatch() {
        let sink = RecordingSink::slow(Duration::from_millis(300)).failing();
        let d = SinkDispatcher::spawn(sink.clone(), DEFAULT_QUEUE);
        let t0 = Instant::now();
        assert!(d.dispatch(facts("apple")));
        assert!(d.dispatch(facts("kiwi")));
        assert!(t0.elapsed() < Duration::from_millis(100));
        drop(d);
        // Both attempts were made even though every submit failed.
        assert_eq!(sink.taken().len(), 2);
    }

    #[test]
    fn full_queue_drops_new_results() {
        let (started_tx, started_rx) = xch::unbounded();
        let (release_tx, release_rx) = xch::unbounded();
        let inner = RecordingSink::default();
        let d = SinkDispatcher::spawn(
            GatedSink {
                started: started_tx,
                release: release_rx,
                inner: inner.clone(),
            },
            1,
        );

        assert!(d.dispatch(facts("apple")));
        started_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("worker picked up the first result");
        // Worker is busy with "apple"; one slot left in the queue.
        assert!(d.dispatch(facts("banana")));
        assert!(!d.dispatch(facts("cherry")));

        drop(release_tx);
        drop(d);
        let foods: Vec<String> = inner.taken().into_iter().map(|f| f.food_key).collect();
        assert_eq!(foods, vec!["apple", "banana"]);
    }

    #[test]
    fn drop_drains_queue_and_joins_worker() {
        let sink = RecordingSink::slow(Duration::from_millis(20));
        let d = SinkDispatcher::spawn(sink.clone(), DEFAULT_QUEUE);
        for food in ["apple", "banana", "kiwi"] {
            assert!(d.dispatch(facts(food)));
        }
        drop(d);
        let foods: Vec<String> = sink.taken().into_iter().map(|f| f.food_key).collect();
        assert_eq!(foods, vec!["apple", "banana", "kiwi"]);
    }
}

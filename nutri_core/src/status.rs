//! Status returned from each control loop step.

use crate::pipeline::CycleOutcome;
use crate::stabilizer::ScaleState;

#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    /// Nothing notable; `state` is the state after the sample.
    Idle(ScaleState),
    /// State changed without a measurement.
    Transitioned { from: ScaleState, to: ScaleState },
    /// A stable event ran through the pipeline; the engine is now in RESULT.
    Cycle(CycleOutcome),
}

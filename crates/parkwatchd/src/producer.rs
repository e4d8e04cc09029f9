//! The frame-processing thread.
//!
//! One dedicated OS thread runs read -> detect -> assign -> annotate ->
//! publish back to back. Frame reads and detection may block for a long
//! time, which is why this is a plain thread and not a tokio task.
//!
//! Exit conditions:
//! - the source ends (after its restart policy): status becomes `Ended`
//! - the detector fails: status becomes `Failed`, the transport keeps
//!   serving the last known state
//! - the cancellation token fires: checked once per cycle

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use parkwatch_core::{annotate, assign, PipelineStatus, ZoneRegistry};

use crate::detect::{DetectionError, Detector};
use crate::publisher::{ChangePublisher, OccupancySink, PublishOutcome};
use crate::source::FrameSource;

/// Why the producer stopped.
#[derive(Debug)]
pub enum ProducerExit {
    SourceEnded { frames: u64 },
    DetectorFailed(DetectionError),
    Cancelled { frames: u64 },
}

pub struct Producer<S: OccupancySink> {
    source: FrameSource,
    detector: Box<dyn Detector>,
    zones: Arc<ZoneRegistry>,
    publisher: ChangePublisher<S>,
    cycle_delay: Duration,
    cancel_token: CancellationToken,
}

impl<S: OccupancySink + 'static> Producer<S> {
    pub fn new(
        source: FrameSource,
        detector: Box<dyn Detector>,
        zones: Arc<ZoneRegistry>,
        publisher: ChangePublisher<S>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            source,
            detector,
            zones,
            publisher,
            cycle_delay: Duration::ZERO,
            cancel_token,
        }
    }

    /// Fixed pause after each cycle (zero by default).
    pub fn with_cycle_delay(mut self, delay: Duration) -> Self {
        self.cycle_delay = delay;
        self
    }

    /// Runs the producer on a named OS thread.
    pub fn spawn(self) -> std::io::Result<JoinHandle<ProducerExit>> {
        thread::Builder::new()
            .name("producer".to_string())
            .spawn(move || self.run())
    }

    /// Runs the loop on the current thread until it exits.
    pub fn run(mut self) -> ProducerExit {
        info!(
            source = %self.source.describe(),
            kind = %self.source.kind(),
            detector = %self.detector.name(),
            zones = self.zones.len(),
            "Producer starting"
        );

        let mut index: u64 = 0;
        let exit = loop {
            if self.cancel_token.is_cancelled() {
                break ProducerExit::Cancelled { frames: index };
            }

            let Some(frame) = self.source.next_frame() else {
                self.publisher.store().set_status(PipelineStatus::Ended);
                break ProducerExit::SourceEnded { frames: index };
            };

            let detections = match self.detector.detect(&frame) {
                Ok(detections) => detections,
                Err(e) => {
                    error!(error = %e, frame = index, "Detection failed; stopping producer");
                    self.publisher
                        .store()
                        .set_status(PipelineStatus::Failed(e.to_string()));
                    break ProducerExit::DetectorFailed(e);
                }
            };

            let occupancy = assign(&detections, &self.zones);
            let rendered = annotate(frame, &self.zones, &occupancy, &detections, index);
            let occupied = occupancy.occupied_count();
            match self.publisher.publish(occupancy, rendered) {
                PublishOutcome::Changed { version } => {
                    info!(version, occupied, frame = index, "Occupancy changed");
                }
                PublishOutcome::Unchanged => {
                    debug!(frame = index, detections = detections.len(), "Occupancy unchanged");
                }
            }

            index += 1;
            if !self.cycle_delay.is_zero() {
                thread::sleep(self.cycle_delay);
            }
        };

        info!(
            exit = ?exit,
            rewinds = self.source.rewinds(),
            "Producer stopped"
        );
        exit
    }
}

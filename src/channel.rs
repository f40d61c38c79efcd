//! Conduit between the frame producer and the display consumer. Both
//! sides run at their own cadence; the channel is the only shared state.

use crate::telemetry::TelemetrySummary;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Producer half. `put` never blocks.
pub struct SummarySender {
    tx: Sender<TelemetrySummary>,
    overflow: Receiver<TelemetrySummary>,
}

/// Consumer half. Draining never blocks.
pub struct SummaryReceiver {
    rx: Receiver<TelemetrySummary>,
}

/// Creates a bounded channel. A full buffer drops the oldest queued
/// summary rather than stalling the producer, so a slow consumer only
/// ever costs stale data, never memory.
pub fn summary_channel(capacity: usize) -> (SummarySender, SummaryReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    (
        SummarySender {
            tx,
            overflow: rx.clone(),
        },
        SummaryReceiver { rx },
    )
}

impl SummarySender {
    pub fn put(&self, summary: TelemetrySummary) {
        let mut pending = summary;
        loop {
            match self.tx.try_send(pending) {
                Ok(()) => return,
                Err(TrySendError::Full(returned)) => {
                    // Make room by evicting the oldest entry, then retry.
                    let _ = self.overflow.try_recv();
                    pending = returned;
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::trace!("Summary consumer gone, dropping summary");
                    return;
                }
            }
        }
    }
}

impl SummaryReceiver {
    /// Everything queued since the last poll, oldest first.
    pub fn drain_all(&self) -> Vec<TelemetrySummary> {
        self.rx.try_iter().collect()
    }

    /// Last-write-wins: drains the queue and keeps only the newest
    /// summary, if any arrived since the last poll.
    pub fn latest(&self) -> Option<TelemetrySummary> {
        self.rx.try_iter().last()
    }
}

//! Windowed throughput measurement for the example binaries.

use async_trait::async_trait;
use pubsub_session::{ListenerAction, ListenerError, ListenerResult, Sample, SampleListener};
use std::sync::Mutex;
use std::time::Instant;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum MeterEvent {
    Counted,
    WindowComplete { rate: f64, finished: bool },
}

/// Counts samples in windows of `number` and reports the rate of each window.
///
/// The first sample of a window starts the clock and counts as one. Samples keep
/// counting until `number` is reached; the sample after that closes the window,
/// reports `number / elapsed` and resets the count. Once `samples` windows have
/// been reported the meter says it is finished.
#[derive(Debug)]
pub(crate) struct ThroughputMeter {
    number: u64,
    samples: u64,
    count: u64,
    window_start: Option<Instant>,
    windows: u64,
}

impl ThroughputMeter {
    pub(crate) fn new(number: u64, samples: u64) -> Self {
        Self {
            number,
            samples,
            count: 0,
            window_start: None,
            windows: 0,
        }
    }

    pub(crate) fn record(&mut self, now: Instant) -> MeterEvent {
        if self.count == 0 {
            self.window_start = Some(now);
            self.count = 1;
            return MeterEvent::Counted;
        }
        if self.count < self.number {
            self.count += 1;
            return MeterEvent::Counted;
        }

        let elapsed = self
            .window_start
            .map(|start| now.duration_since(start))
            .unwrap_or_default();
        let rate = self.number as f64 / elapsed.as_secs_f64();
        self.count = 0;
        self.windows += 1;

        MeterEvent::WindowComplete {
            rate,
            finished: self.windows >= self.samples,
        }
    }

    #[allow(dead_code)]
    pub(crate) fn windows(&self) -> u64 {
        self.windows
    }
}

pub(crate) fn format_rate(rate: f64) -> String {
    format!("{rate:.6} msgs/sec")
}

/// Subscriber side of the throughput test: prints each window rate and stops the
/// session after the last window.
#[allow(dead_code)]
pub(crate) struct ThroughputListener {
    meter: Mutex<ThroughputMeter>,
}

impl ThroughputListener {
    #[allow(dead_code)]
    pub(crate) fn new(number: u64, samples: u64) -> Self {
        Self {
            meter: Mutex::new(ThroughputMeter::new(number, samples)),
        }
    }

    #[cfg(test)]
    pub(crate) fn windows(&self) -> u64 {
        self.meter.lock().map(|meter| meter.windows()).unwrap_or_default()
    }
}

#[async_trait]
impl SampleListener for ThroughputListener {
    async fn on_sample(&self, _sample: Sample) -> ListenerResult {
        let event = self
            .meter
            .lock()
            .map_err(|_| ListenerError::new("throughput meter lock poisoned"))?
            .record(Instant::now());

        match event {
            MeterEvent::Counted => Ok(ListenerAction::Continue),
            MeterEvent::WindowComplete { rate, finished } => {
                println!("{}", format_rate(rate));
                if finished {
                    info!("all throughput windows measured; stopping session");
                    Ok(ListenerAction::StopSession)
                } else {
                    Ok(ListenerAction::Continue)
                }
            }
        }
    }
}

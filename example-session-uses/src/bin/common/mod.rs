pub(crate) mod cli;
pub(crate) mod throughput;

pub(crate) use cli::SessionArgs;
#[allow(unused_imports)]
pub(crate) use throughput::{format_rate, MeterEvent, ThroughputListener, ThroughputMeter};

/// Resource expression shared by the throughput publisher and subscriber.
pub(crate) const THROUGHPUT_EXPR: &str = "/test/thr";

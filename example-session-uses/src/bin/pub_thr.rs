/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

mod common;

use clap::Parser;
use common::{format_rate, MeterEvent, SessionArgs, ThroughputMeter, THROUGHPUT_EXPR};
use pubsub_session::{LoopbackTransport, Session, SessionError};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pub_thr", version, about = "Session throughput publisher", long_about = None)]
struct Args {
    #[command(flatten)]
    session: SessionArgs,

    /// Number of put-rate measurements.
    #[arg(short, long, value_name = "NUMBER", default_value_t = 10)]
    samples: u64,

    /// Number of puts in each measurement.
    #[arg(short, long, value_name = "NUMBER", default_value_t = 50_000)]
    number: u64,

    /// Payload size in bytes.
    #[arg(long, value_name = "BYTES", default_value_t = 8)]
    payload_size: usize,
}

#[tokio::main]
async fn main() -> Result<(), SessionError> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = Args::parse();
    let config = args.session.to_session_config()?;

    info!("Started pub_thr in {} mode", config.mode());

    let transport = LoopbackTransport::new();
    let publisher = transport.publisher();
    let session = Session::open(config, Arc::new(transport)).await?;
    let rid = session.declare_expr(THROUGHPUT_EXPR).await?;

    let payload: Arc<[u8]> = vec![0u8; args.payload_size].into();
    let mut meter = ThroughputMeter::new(args.number, args.samples);

    loop {
        publisher.put(rid, payload.clone()).await?;

        if let MeterEvent::WindowComplete { rate, finished } = meter.record(Instant::now()) {
            println!("{}", format_rate(rate));
            if finished {
                break;
            }
        }
    }

    session.undeclare_expr(rid).await?;
    session.close().await?;

    let stats = session.stats();
    info!(
        "samples without subscriber: dropped={} discarded={}",
        stats.dropped, stats.discarded
    );
    Ok(())
}

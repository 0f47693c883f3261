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
use common::{SessionArgs, ThroughputListener, THROUGHPUT_EXPR};
use pubsub_session::{
    DeliveryMode, LoopbackPublisher, LoopbackTransport, ReliabilityPolicy, ResourceHandle,
    Session, SessionError,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "sub_thr", version, about = "Session throughput subscriber", long_about = None)]
struct Args {
    #[command(flatten)]
    session: SessionArgs,

    /// Number of throughput measurements.
    #[arg(short, long, value_name = "NUMBER", default_value_t = 10)]
    samples: u64,

    /// Number of messages in each throughput measurement.
    #[arg(short, long, value_name = "NUMBER", default_value_t = 50_000)]
    number: u64,

    /// Payload size in bytes of the in-process publisher.
    #[arg(long, value_name = "BYTES", default_value_t = 8)]
    payload_size: usize,

    /// Seconds to wait for the measurements before giving up.
    #[arg(long, value_name = "SECONDS", default_value_t = 600)]
    timeout: u64,
}

/// Publishes on `handle` until the session stops accepting samples.
async fn drive_publisher(publisher: LoopbackPublisher, handle: ResourceHandle, payload_size: usize) {
    let payload: Arc<[u8]> = vec![0u8; payload_size].into();
    let mut published: u64 = 0;

    loop {
        match publisher.put(handle, payload.clone()).await {
            Ok(()) => published += 1,
            Err(SessionError::SessionClosed) => break,
            Err(err) => {
                warn!("publisher stopped: {err}");
                break;
            }
        }
        if published % 4096 == 0 {
            // give the rest of the runtime a turn between bursts
            tokio::task::yield_now().await;
        }
    }

    debug!("publisher done after {published} samples");
}

#[tokio::main]
async fn main() -> Result<(), SessionError> {
    let _ = tracing_subscriber::fmt::try_init();

    let args = Args::parse();
    let config = args.session.to_session_config()?;

    info!("Started sub_thr in {} mode", config.mode());

    let transport = LoopbackTransport::new();
    let publisher = transport.publisher();
    let session = Session::open(config, Arc::new(transport)).await?;

    let rid = session.declare_expr(THROUGHPUT_EXPR).await?;
    session
        .subscribe(
            rid,
            Arc::new(ThroughputListener::new(args.number, args.samples)),
            ReliabilityPolicy::Reliable,
            DeliveryMode::Push,
        )
        .await?;

    let publishing = tokio::spawn(drive_publisher(publisher, rid, args.payload_size));

    tokio::select! {
        _ = session.closed() => info!("throughput measurements complete"),
        _ = tokio::time::sleep(Duration::from_secs(args.timeout)) => {
            info!("timed out after {} seconds", args.timeout);
        }
    }

    if !session.is_closed() {
        session.undeclare_expr(rid).await?;
    }
    session.close().await?;

    if let Err(err) = publishing.await {
        warn!("publisher task failed: {err}");
    }

    let stats = session.stats();
    info!(
        "delivered={} dropped={} discarded={} faults={}",
        stats.delivered, stats.dropped, stats.discarded, stats.faults
    );
    Ok(())
}

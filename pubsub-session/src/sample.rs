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

use crate::control_plane::resource_table::ResourceHandle;
use std::sync::Arc;
use std::time::SystemTime;

/// One inbound message unit tagged with the handle it was published on.
///
/// The payload is shared read-only, so fanning a sample out to several
/// subscriptions clones a pointer rather than the bytes.
#[derive(Clone, Debug)]
pub struct Sample {
    handle: ResourceHandle,
    payload: Arc<[u8]>,
    timestamp: SystemTime,
}

impl Sample {
    /// Builds a sample stamped with the current wall-clock time.
    pub fn new(handle: ResourceHandle, payload: impl Into<Arc<[u8]>>) -> Self {
        Self::with_timestamp(handle, payload, SystemTime::now())
    }

    pub fn with_timestamp(
        handle: ResourceHandle,
        payload: impl Into<Arc<[u8]>>,
        timestamp: SystemTime,
    ) -> Self {
        Self {
            handle,
            payload: payload.into(),
            timestamp,
        }
    }

    pub fn handle(&self) -> ResourceHandle {
        self.handle
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

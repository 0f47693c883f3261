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

mod integration_test_utils;
pub use integration_test_utils::{init_logging, sequence_payload, sequence_of, wait_until};
mod integration_test_listeners;
pub use integration_test_listeners::{
    FaultyListener, FaultyListenerKind, RecordingListener, SlowListener, StopAfterListener,
};
mod integration_test_transports;
pub use integration_test_transports::{FailingConnectTransport, FailingDisconnectTransport};

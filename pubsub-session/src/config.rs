/********************************************************************************
 * Copyright (c) 2025 Contributors to the Eclipse Foundation
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

//! Typed session configuration, validated once when a session opens.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_INGRESS_QUEUE_SIZE: usize = 256;
pub const DEFAULT_PULL_BUFFER_CAPACITY: usize = 64;

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    Peer,
    Client,
}

impl Display for SessionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Peer => write!(f, "peer"),
            SessionMode::Client => write!(f, "client"),
        }
    }
}

impl FromStr for SessionMode {
    type Err = SessionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "peer" => Ok(SessionMode::Peer),
            "client" => Ok(SessionMode::Client),
            other => Err(SessionError::Config(format!(
                "unrecognized mode '{other}' (expected one of: peer, client)"
            ))),
        }
    }
}

/// Opaque network endpoint string. Only its basic shape is checked.
#[derive(Deserialize, Serialize, Debug, Clone, Eq, Hash, PartialEq)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(&self, option: &str) -> Result<(), SessionError> {
        if self.0.is_empty() {
            return Err(SessionError::Config(format!(
                "{option} contains an empty locator"
            )));
        }
        if self.0.chars().any(|ch| ch.is_whitespace() || ch.is_control()) {
            return Err(SessionError::Config(format!(
                "{option} locator '{}' contains whitespace",
                self.0
            )));
        }
        Ok(())
    }
}

impl From<&str> for Locator {
    fn from(locator: &str) -> Self {
        Self::new(locator)
    }
}

impl From<String> for Locator {
    fn from(locator: String) -> Self {
        Self(locator)
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_ingress_queue_size() -> usize {
    DEFAULT_INGRESS_QUEUE_SIZE
}

fn default_pull_buffer_capacity() -> usize {
    DEFAULT_PULL_BUFFER_CAPACITY
}

/// Session configuration snapshot.
///
/// Absent options fall back to their defaults: `peer` mode, no peers, no listeners,
/// [`DEFAULT_INGRESS_QUEUE_SIZE`] and [`DEFAULT_PULL_BUFFER_CAPACITY`].
#[derive(Deserialize, Serialize, Debug, Clone, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    #[serde(default)]
    pub(crate) mode: SessionMode,
    #[serde(default)]
    pub(crate) peers: Vec<Locator>,
    #[serde(default)]
    pub(crate) listeners: Vec<Locator>,
    #[serde(default = "default_ingress_queue_size")]
    pub(crate) ingress_queue_size: usize,
    #[serde(default = "default_pull_buffer_capacity")]
    pub(crate) pull_buffer_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: SessionMode::default(),
            peers: Vec::new(),
            listeners: Vec::new(),
            ingress_queue_size: DEFAULT_INGRESS_QUEUE_SIZE,
            pull_buffer_capacity: DEFAULT_PULL_BUFFER_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Parses a JSON5 document into a configuration.
    pub fn from_json5_str(contents: &str) -> Result<Self, SessionError> {
        json5::from_str(contents)
            .map_err(|e| SessionError::Config(format!("Unable to parse config: {e}")))
    }

    /// Reads and parses a JSON5 configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SessionError::Config(format!(
                "Unable to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json5_str(&contents)
    }

    pub fn with_mode(mut self, mode: SessionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_peers<I, L>(mut self, peers: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Locator>,
    {
        self.peers = peers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_listeners<I, L>(mut self, listeners: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Locator>,
    {
        self.listeners = listeners.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ingress_queue_size(mut self, ingress_queue_size: usize) -> Self {
        self.ingress_queue_size = ingress_queue_size;
        self
    }

    pub fn with_pull_buffer_capacity(mut self, pull_buffer_capacity: usize) -> Self {
        self.pull_buffer_capacity = pull_buffer_capacity;
        self
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn peers(&self) -> &[Locator] {
        &self.peers
    }

    pub fn listeners(&self) -> &[Locator] {
        &self.listeners
    }

    pub fn ingress_queue_size(&self) -> usize {
        self.ingress_queue_size
    }

    pub fn pull_buffer_capacity(&self) -> usize {
        self.pull_buffer_capacity
    }

    /// Checks every option; called by `Session::open`.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.ingress_queue_size == 0 {
            return Err(SessionError::Config(
                "ingress_queue_size must be greater than zero".to_string(),
            ));
        }
        if self.pull_buffer_capacity == 0 {
            return Err(SessionError::Config(
                "pull_buffer_capacity must be greater than zero".to_string(),
            ));
        }
        for peer in &self.peers {
            peer.validate("peers")?;
        }
        for listener in &self.listeners {
            listener.validate("listeners")?;
        }
        Ok(())
    }
}

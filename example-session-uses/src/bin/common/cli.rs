use clap::Args;
use pubsub_session::{SessionConfig, SessionError, SessionMode};
use std::path::PathBuf;

/// Session flags shared by the throughput binaries.
///
/// A configuration file is loaded first; flags given on the command line then
/// override the matching file values.
#[derive(Args, Debug, Clone)]
pub(crate) struct SessionArgs {
    /// The session mode.
    #[arg(short, long, value_name = "MODE")]
    pub(crate) mode: Option<SessionMode>,

    /// Peer locators used to initiate the session.
    #[arg(short = 'e', long = "peer", value_name = "LOCATOR")]
    pub(crate) peers: Vec<String>,

    /// Locators to listen on.
    #[arg(short, long = "listener", value_name = "LOCATOR")]
    pub(crate) listeners: Vec<String>,

    /// A JSON5 configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,
}

impl SessionArgs {
    pub(crate) fn to_session_config(&self) -> Result<SessionConfig, SessionError> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_file(path)?,
            None => SessionConfig::default(),
        };

        if let Some(mode) = self.mode {
            config = config.with_mode(mode);
        }
        if !self.peers.is_empty() {
            config = config.with_peers(self.peers.iter().cloned());
        }
        if !self.listeners.is_empty() {
            config = config.with_listeners(self.listeners.iter().cloned());
        }

        config.validate()?;
        Ok(config)
    }
}

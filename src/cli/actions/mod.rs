mod run;

use crate::{endpoint::Endpoint, tls::ProbeConfig};
use std::{net::IpAddr, time::Duration};

/// Action enum representing each possible command
#[derive(Debug)]
pub enum Action {
    Monitor {
        endpoints: Vec<Endpoint>,
        interval: Duration,
        listen: Option<IpAddr>,
        port: u16,
        probe: ProbeConfig,
    },
}

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails to execute
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}

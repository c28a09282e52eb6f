//! certpulse probes TLS endpoints on a fixed interval and exports the
//! expiry times of the served certificate chain as prometheus gauges.

pub mod check;
pub mod cli;
pub mod endpoint;
pub mod exporter;
pub mod metrics;
pub mod tls;

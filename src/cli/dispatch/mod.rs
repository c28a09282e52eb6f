use crate::{cli::actions::Action, endpoint::parse_hosts, tls::ProbeConfig};
use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use std::{net::IpAddr, time::Duration};

/// Parse a check interval such as `90`, `45s`, `30m`, `3h`, `1d` or `1h30m`
///
/// Plain numbers are seconds.
///
/// # Errors
///
/// Returns an error for unknown units, missing numbers or a zero interval
pub fn parse_interval(value: &str) -> Result<Duration> {
    let value = value.trim();
    if value.is_empty() {
        bail!("empty check interval");
    }

    if let Ok(secs) = value.parse::<u64>() {
        return non_zero(Duration::from_secs(secs), value);
    }

    let mut total: u64 = 0;
    let mut digits = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let unit: u64 = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => bail!("invalid unit '{c}' in check interval: {value}"),
        };
        let amount = digits
            .parse::<u64>()
            .with_context(|| format!("missing number before '{c}' in check interval: {value}"))?;
        total = amount
            .checked_mul(unit)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(|| anyhow!("check interval is too large: {value}"))?;
        digits.clear();
    }

    if !digits.is_empty() {
        bail!("missing unit after '{digits}' in check interval: {value}");
    }

    non_zero(Duration::from_secs(total), value)
}

fn non_zero(interval: Duration, value: &str) -> Result<Duration> {
    if interval.is_zero() {
        bail!("check interval must be greater than zero: {value}");
    }
    Ok(interval)
}

/// Convert `ArgMatches` into typed Action enum with validation
///
/// # Errors
///
/// Returns an error if no hosts are configured or any value is invalid
pub fn dispatch(matches: &ArgMatches) -> Result<Action> {
    // Extract and parse the host list
    let hosts = matches
        .get_one::<String>("hosts")
        .context("no hosts to check have been configured")?;
    let endpoints = parse_hosts(hosts)?;

    // Extract interval with default
    let interval = parse_interval(
        matches
            .get_one::<String>("interval")
            .map_or("3h", String::as_str),
    )?;

    // Extract and validate listen address
    let listen = matches
        .get_one::<String>("listen")
        .map(|addr| {
            addr.parse::<IpAddr>()
                .with_context(|| format!("Invalid IP address: {addr}"))
        })
        .transpose()?;

    // Extract port with default
    let port = matches.get_one::<u16>("port").copied().unwrap_or(9219);

    // Extract probe timeouts
    let connect_timeout = matches
        .get_one::<u64>("connect-timeout")
        .copied()
        .unwrap_or(10);
    let handshake_timeout = matches
        .get_one::<u64>("handshake-timeout")
        .copied()
        .unwrap_or(10);
    let probe = ProbeConfig::new(
        Duration::from_secs(connect_timeout),
        Duration::from_secs(handshake_timeout),
    );

    Ok(Action::Monitor {
        endpoints,
        interval,
        listen,
        port,
        probe,
    })
}

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

/// Pure clap command definitions with zero business logic
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new(env!("CARGO_PKG_NAME"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new("hosts")
                .env("CHECK_HOSTS")
                .help("comma separated list of <host>[:<port>] to check, port defaults to 443")
                .long("hosts")
                .long_help(
                    "Comma separated list of endpoints to check.\n\
                    Each entry is <host>[:<port>], the port defaults to 443.\n\
                    IPv6 literals go in brackets: [2001:db8::1]:8443\n\
                    Whitespace is ignored.\n\n\
                    Example: example.com,mail.example.com:465,10.0.0.5:8443"
                )
                .short('H')
                .value_name("HOSTS")
                .required(true),
        )
        .arg(
            Arg::new("interval")
                .default_value("3h")
                .env("CHECK_INTERVAL")
                .help("time between checks: <n>[s|m|h|d], plain numbers are seconds")
                .long("interval")
                .short('i')
                .value_name("DURATION"),
        )
        .arg(
            Arg::new("listen")
                .env("LISTEN_ADDR")
                .help("IP address to bind to (default: [::]:port, accepts both IPv6 and IPv4)")
                .long("listen")
                .long_help(
                    "IP address to bind to:\n\
                    Not specified (default) binds to [::]:port which accepts both IPv6 and IPv4 connections.\n\
                    Falls back to 0.0.0.0:port if IPv6 is unavailable.\n\n\
                    Specific IPv4 examples: '0.0.0.0', '127.0.0.1'\n\
                    Specific IPv6: '::', '::1'"
                )
                .short('l')
                .value_name("IP"),
        )
        .arg(
            Arg::new("port")
                .default_value("9219")
                .env("LISTEN_PORT")
                .help("listening port for /metrics and /healthz")
                .long("port")
                .short('p')
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("connect-timeout")
                .default_value("10")
                .env("CONNECT_TIMEOUT")
                .help("seconds allowed for DNS resolution and for the TCP connect")
                .long("connect-timeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("handshake-timeout")
                .default_value("10")
                .env("HANDSHAKE_TIMEOUT")
                .help("seconds allowed for the TLS handshake")
                .long("handshake-timeout")
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("dev")
                .action(ArgAction::SetTrue)
                .env("DEV_MODE")
                .help("development mode, log at debug level")
                .long("dev"),
        )
}

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use certpulse::{endpoint::Endpoint, tls::ensure_crypto_provider};
use rustls::{
    ServerConfig,
    pki_types::{CertificateDer, PrivateKeyDer},
};
use std::{
    collections::BTreeMap,
    env,
    fs::File,
    io::BufReader,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
    time::{Duration, Instant, sleep},
};
use tokio_rustls::TlsAcceptor;

/// `notAfter` of tests/fixtures/leaf.pem, 2030-01-01T00:00:00Z
pub const LEAF_NOT_AFTER: i64 = 1_893_456_000;
/// `notAfter` of tests/fixtures/ca.pem, 2035-06-15T12:00:00Z
pub const CA_NOT_AFTER: i64 = 2_065_521_600;
pub const LEAF_SUBJECT: &str = "O=certpulse test, CN=localhost";
pub const LEAF_ISSUER: &str = "O=certpulse test, CN=certpulse test CA";

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn load_certs(name: &str) -> Vec<CertificateDer<'static>> {
    let file = File::open(fixture_path(name)).expect("failed to open certificate fixture");
    rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .expect("failed to parse certificate fixture")
}

pub fn load_key(name: &str) -> PrivateKeyDer<'static> {
    let file = File::open(fixture_path(name)).expect("failed to open key fixture");
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .expect("failed to parse key fixture")
        .expect("no private key in fixture")
}

/// Leaf followed by its issuer
pub fn full_chain() -> Vec<CertificateDer<'static>> {
    let mut chain = load_certs("leaf.pem");
    chain.extend(load_certs("ca.pem"));
    chain
}

/// Leaf only, the server does not send its issuer
pub fn leaf_only_chain() -> Vec<CertificateDer<'static>> {
    load_certs("leaf.pem")
}

/// TLS server on 127.0.0.1 presenting a fixed chain, aborted on drop
pub struct TlsFixtureServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TlsFixtureServer {
    pub async fn start(chain: Vec<CertificateDer<'static>>) -> Self {
        ensure_crypto_provider();

        let config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(chain, load_key("leaf.key"))
            .expect("invalid fixture certificate or key");
        let acceptor = TlsAcceptor::from(Arc::new(config));

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .expect("failed to bind fixture server");
        let addr = listener.local_addr().expect("failed to read local addr");

        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    if let Ok(mut tls) = acceptor.accept(stream).await {
                        let mut buf = Vec::new();
                        let _ = tls.read_to_end(&mut buf).await;
                        let _ = tls.shutdown().await;
                    }
                });
            }
        });

        Self { addr, handle }
    }

    pub const fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", self.port())
    }
}

impl Drop for TlsFixtureServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn pick_free_port() -> u16 {
    std::net::TcpListener::bind(("127.0.0.1", 0))
        .expect("failed to bind random local port")
        .local_addr()
        .expect("failed to read local addr")
        .port()
}

/// A port on 127.0.0.1 with nothing listening
pub fn refused_endpoint() -> Endpoint {
    Endpoint::new("127.0.0.1", pick_free_port())
}

pub fn certpulse_binary_path() -> PathBuf {
    env::var_os("CARGO_BIN_EXE_certpulse")
        .map_or_else(|| PathBuf::from("target/debug/certpulse"), PathBuf::from)
}

pub async fn fetch(port: u16, path: &str) -> Option<(u16, String)> {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.ok()?;
    let request =
        format!("GET {path} HTTP/1.1\r\nHost: 127.0.0.1:{port}\r\nConnection: close\r\n\r\n");
    // no write shutdown, the server drops half-closed connections unanswered
    stream.write_all(request.as_bytes()).await.ok()?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.ok()?;
    let response = String::from_utf8(response).ok()?;
    let (head, body) = response.split_once("\r\n\r\n")?;
    let status = head.split_whitespace().nth(1)?.parse().ok()?;
    Some((status, body.to_string()))
}

pub async fn fetch_metrics(port: u16) -> Option<String> {
    fetch(port, "/metrics")
        .await
        .and_then(|(status, body)| (status == 200).then_some(body))
}

/// Poll `/metrics` until `ready` accepts the parsed samples
pub async fn wait_for_metrics<F>(port: u16, timeout: Duration, ready: F) -> Option<Vec<Sample>>
where
    F: Fn(&[Sample]) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(body) = fetch_metrics(port).await {
            let samples = parse_exposition(&body);
            if ready(&samples) {
                return Some(samples);
            }
        }

        if Instant::now() >= deadline {
            return None;
        }

        sleep(Duration::from_millis(250)).await;
    }
}

/// One sample line of the text exposition format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: i64,
}

impl Sample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// Parse sample lines, ignoring comments and the order of labels
pub fn parse_exposition(text: &str) -> Vec<Sample> {
    text.lines()
        .filter(|line| !line.starts_with('#') && !line.trim().is_empty())
        .map(parse_sample)
        .collect()
}

pub fn find<'a>(samples: &'a [Sample], name: &str, connect_host: &str) -> Option<&'a Sample> {
    samples
        .iter()
        .find(|s| s.name == name && s.label("connect_host") == Some(connect_host))
}

fn parse_sample(line: &str) -> Sample {
    let (series, value) = line.rsplit_once(' ').expect("sample without value");
    let value = value.parse().expect("sample value is not an integer");

    let Some((name, rest)) = series.split_once('{') else {
        return Sample {
            name: series.to_string(),
            labels: BTreeMap::new(),
            value,
        };
    };

    let mut labels = BTreeMap::new();
    let mut chars = rest.chars();
    loop {
        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        let key = key.trim_start_matches(',').to_string();
        if key.is_empty() || key == "}" {
            break;
        }
        assert_eq!(chars.next(), Some('"'), "label value must be quoted");

        let mut label_value = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => label_value.push('\n'),
                    Some(other) => label_value.push(other),
                    None => break,
                },
                '"' => break,
                _ => label_value.push(c),
            }
        }
        labels.insert(key, label_value);
    }

    Sample {
        name: name.to_string(),
        labels,
        value,
    }
}

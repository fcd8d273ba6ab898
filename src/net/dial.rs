//! Outbound transport establishment for hops.
//!
//! # Responsibilities
//! - Derive host/port/authority from a hop URL
//! - Open a TCP connection and complete the TLS handshake
//! - Insist on ALPN `h2`: HTTP/2 over TLS is the only transport
//!
//! # Design Decisions
//! - One connection per hop; nothing is pooled
//! - Dialing is a trait so tests can route hops to an in-process server

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use url::Url;

use crate::hop::HopError;

/// Where a hop connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopTarget {
    pub host: String,
    pub port: u16,
}

impl HopTarget {
    /// Derive the target from an absolute `https` URL.
    pub fn from_url(url: &Url) -> Result<Self, HopError> {
        if url.scheme() != "https" {
            return Err(HopError::InvalidTarget(format!(
                "unsupported scheme '{}' in {}",
                url.scheme(),
                url
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| HopError::InvalidTarget(format!("no host in {}", url)))?;
        let port = url.port_or_known_default().unwrap_or(443);

        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port,
        })
    }

    /// `host:port` for socket connects.
    pub fn socket_addr(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Opens the byte stream a hop's HTTP/2 session runs over.
pub trait Dial: Send + Sync + 'static {
    type Io: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn dial(&self, target: &HopTarget) -> impl Future<Output = io::Result<Self::Io>> + Send;
}

/// Production dialer: TCP + rustls with Mozilla roots, ALPN `h2` only.
#[derive(Clone)]
pub struct TlsDialer {
    connector: TlsConnector,
}

impl TlsDialer {
    pub fn new() -> Self {
        Self {
            connector: TlsConnector::from(h2_client_config()),
        }
    }
}

impl Default for TlsDialer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dial for TlsDialer {
    type Io = TlsStream<TcpStream>;

    async fn dial(&self, target: &HopTarget) -> io::Result<Self::Io> {
        let tcp = TcpStream::connect(target.socket_addr()).await?;
        tcp.set_nodelay(true)?;

        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?;
        let tls = self.connector.connect(server_name, tcp).await?;

        let negotiated_h2 = tls.get_ref().1.alpn_protocol() == Some(b"h2".as_slice());
        if !negotiated_h2 {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{} did not negotiate HTTP/2", target.host),
            ));
        }

        Ok(tls)
    }
}

fn h2_client_config() -> Arc<ClientConfig> {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let mut config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    config.alpn_protocols = vec![b"h2".to_vec()];
    Arc::new(config)
}

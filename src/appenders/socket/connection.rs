//! Stream connections to the collector.

use std::{
    io::{self, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::Duration,
};

use native_tls::{Certificate, HandshakeError, Identity, TlsConnector, TlsStream};

use crate::core::{Result, ShipperError, TlsMaterial, TransportConfig};

/// Opens connections for the connection manager.
///
/// [`SocketConnector`] is the production implementation; anything able to
/// produce a [`Connection`] can stand in for it. Failures must be classified:
/// a [`ShipperError::TransportTimeout`] is not held against the retry budget.
pub trait Connector: Send + 'static {
    /// `host:port` used in diagnostics.
    fn endpoint(&self) -> String;
    fn connect(&mut self) -> Result<Connection>;
}

enum Stream {
    Plain(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
}

/// An established, send-only connection. Dropping it ends and destroys the
/// socket.
pub struct Connection {
    stream: Stream,
}

impl Connection {
    pub fn plain(stream: TcpStream) -> Self {
        Self {
            stream: Stream::Plain(stream),
        }
    }

    pub fn tls(stream: TlsStream<TcpStream>) -> Self {
        Self {
            stream: Stream::Tls(Box::new(stream)),
        }
    }

    fn tcp(&self) -> &TcpStream {
        match &self.stream {
            Stream::Plain(stream) => stream,
            Stream::Tls(stream) => stream.get_ref(),
        }
    }

    /// A second handle on the underlying TCP socket, used to notice the peer
    /// closing. The collector never sends application data, so nothing read
    /// from it is lost.
    pub fn watch_handle(&self) -> io::Result<TcpStream> {
        self.tcp().try_clone()
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.tcp().set_write_timeout(timeout)
    }

    /// Write `line` followed by a newline.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut frame = Vec::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.push(b'\n');
        match &mut self.stream {
            Stream::Plain(stream) => {
                stream.write_all(&frame)?;
                stream.flush()
            }
            Stream::Tls(stream) => {
                stream.write_all(&frame)?;
                stream.flush()
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Stream::Tls(stream) = &mut self.stream {
            let _ = stream.shutdown();
        }
        let _ = self.tcp().shutdown(Shutdown::Both);
    }
}

/// TCP connector with optional TLS, built once from a [`TransportConfig`].
pub struct SocketConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
    tls: Option<TlsSettings>,
}

struct TlsSettings {
    connector: TlsConnector,
    domain: String,
}

impl SocketConnector {
    /// Load TLS material and build the connector. Missing or invalid
    /// material is a configuration error.
    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        config.validate()?;
        let tls = match &config.tls {
            Some(material) => Some(TlsSettings {
                connector: build_tls_connector(material)?,
                domain: material
                    .domain
                    .clone()
                    .unwrap_or_else(|| config.host.clone()),
            }),
            None => None,
        };
        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            connect_timeout: config.connect_timeout,
            tls,
        })
    }

    fn socket_addrs(&self) -> io::Result<Vec<SocketAddr>> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map(|iter| iter.collect())
    }

    fn connect_tcp(&self) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in self.socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    stream.set_nodelay(true)?;
                    return Ok(stream);
                }
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no addresses resolved for {}:{}", self.host, self.port),
            )
        }))
    }
}

impl Connector for SocketConnector {
    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn connect(&mut self) -> Result<Connection> {
        let endpoint = self.endpoint();
        let stream = self
            .connect_tcp()
            .map_err(|e| ShipperError::connect(endpoint.as_str(), e))?;
        let Some(tls) = &self.tls else {
            return Ok(Connection::plain(stream));
        };

        let limit_handshake = stream
            .set_read_timeout(Some(self.connect_timeout))
            .and_then(|()| stream.set_write_timeout(Some(self.connect_timeout)));
        limit_handshake.map_err(|e| ShipperError::connect(endpoint.as_str(), e))?;

        let stream = match tls.connector.connect(&tls.domain, stream) {
            Ok(stream) => stream,
            // A blocking socket only reports WouldBlock once its timeout ran out.
            Err(HandshakeError::WouldBlock(_)) => {
                return Err(ShipperError::handshake_timeout(endpoint))
            }
            Err(HandshakeError::Failure(err)) => {
                return Err(ShipperError::handshake(endpoint, err))
            }
        };
        stream
            .get_ref()
            .set_read_timeout(None)
            .map_err(|e| ShipperError::connect(endpoint.as_str(), e))?;
        Ok(Connection::tls(stream))
    }
}

fn build_tls_connector(material: &TlsMaterial) -> Result<TlsConnector> {
    let mut builder = TlsConnector::builder();

    let identity = match (&material.key, &material.cert, &material.passphrase) {
        (Some(key), _, Some(passphrase)) => {
            Some(Identity::from_pkcs12(&key.load()?, passphrase).map_err(tls_config_error)?)
        }
        (Some(key), Some(cert), None) => {
            Some(Identity::from_pkcs8(&cert.load()?, &key.load()?).map_err(tls_config_error)?)
        }
        _ => None,
    };
    if let Some(identity) = identity {
        builder.identity(identity);
    }

    for source in &material.ca {
        let bundle = source.load()?;
        let certificates = split_pem_certificates(&bundle);
        if certificates.is_empty() {
            return Err(ShipperError::config(
                "TlsMaterial",
                "CA bundle contains no certificates",
            ));
        }
        for pem in certificates {
            builder.add_root_certificate(Certificate::from_pem(&pem).map_err(tls_config_error)?);
        }
    }

    if !material.reject_unauthorized {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }

    builder.build().map_err(tls_config_error)
}

fn tls_config_error(err: native_tls::Error) -> ShipperError {
    ShipperError::config("TlsMaterial", err.to_string())
}

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Split a PEM bundle into individual certificate blocks.
fn split_pem_certificates(bundle: &[u8]) -> Vec<Vec<u8>> {
    let text = String::from_utf8_lossy(bundle);
    let mut certificates = Vec::new();
    let mut rest = text.as_ref();
    while let Some(start) = rest.find(PEM_BEGIN) {
        let Some(len) = rest[start..].find(PEM_END) else {
            break;
        };
        let end = start + len + PEM_END.len();
        certificates.push(rest[start..end].as_bytes().to_vec());
        rest = &rest[end..];
    }
    certificates
}

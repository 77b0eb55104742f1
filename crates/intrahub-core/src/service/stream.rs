//! TCP and TLS transport for IMAP connections.

use std::sync::{Arc, OnceLock};

use rustls::ClientConfig;
use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use super::mail::MailServiceError;

/// Open a plaintext TCP connection.
pub async fn open(host: &str, port: u16) -> Result<TcpStream, MailServiceError> {
    TcpStream::connect((host, port))
        .await
        .map_err(|e| MailServiceError::Connection(format!("{host}:{port}: {e}")))
}

/// Run the TLS handshake over an open connection, verifying `host` against
/// the webpki root set.
pub async fn secure(host: &str, tcp: TcpStream) -> Result<TlsStream<TcpStream>, MailServiceError> {
    let server_name = ServerName::try_from(host.to_string())
        .map_err(|e| MailServiceError::Connection(format!("{host}: {e}")))?;

    TlsConnector::from(client_config())
        .connect(server_name, tcp)
        .await
        .map_err(|e| MailServiceError::Connection(format!("TLS handshake with {host}: {e}")))
}

fn client_config() -> Arc<ClientConfig> {
    static CONFIG: OnceLock<Arc<ClientConfig>> = OnceLock::new();

    Arc::clone(CONFIG.get_or_init(|| {
        let roots = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        Arc::new(
            ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        )
    }))
}

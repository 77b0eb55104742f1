//! Mail transport for IMAP operations.
//!
//! [`MailConnector`] opens sessions and [`MailSession`] is the small slice of
//! IMAP the ingestion flow needs: select the inbox, fetch one message by
//! sequence number, log out. [`ImapConnector`] implements both over
//! `async-imap`, on plaintext TCP or implicit TLS.

use std::pin::pin;

use async_imap::types::Fetch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::io::{AsyncRead, AsyncWrite};
use futures::StreamExt;
use tokio_util::compat::TokioAsyncReadCompatExt;
use tracing::debug;

use super::extract::{decode_header_value, header_from_source, parse_date};
use super::stream;
use crate::account::{ImapConfig, Security};

/// Name of the only mailbox the ingestion flow reads.
const INBOX: &str = "INBOX";

/// Items requested for each message.
const FETCH_QUERY: &str = "(UID ENVELOPE INTERNALDATE BODY.PEEK[])";

/// Errors that can occur during mail operations.
#[derive(Debug, thiserror::Error)]
pub enum MailServiceError {
    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Operation failed.
    #[error("Operation failed: {0}")]
    Operation(String),
}

/// One message as delivered by the mail server.
#[derive(Debug, Clone, Default)]
pub struct FetchedMessage {
    /// Sequence number in the selected mailbox.
    pub seq: u32,
    /// Server UID, when returned.
    pub uid: Option<u32>,
    /// `Message-ID` header value.
    pub message_id: Option<String>,
    /// Sender display name.
    pub from_name: String,
    /// Sender address.
    pub from_address: String,
    /// Decoded subject.
    pub subject: String,
    /// Date from the envelope, or the server's internal date.
    pub date: Option<DateTime<Utc>>,
    /// Raw RFC 5322 source.
    pub source: Vec<u8>,
}

impl FetchedMessage {
    /// Provider message identifier, synthesized from the UID (or sequence
    /// number) when the message carries no `Message-ID`.
    #[must_use]
    pub fn provider_id(&self) -> String {
        self.message_id
            .clone()
            .unwrap_or_else(|| self.mailbox_id())
    }

    /// Identifier from the server's own numbering: `uid:N`, or `seq:N`
    /// without a UID.
    #[must_use]
    pub fn mailbox_id(&self) -> String {
        match self.uid {
            Some(uid) => format!("uid:{uid}"),
            None => format!("seq:{}", self.seq),
        }
    }
}

/// An open, authenticated mail session.
#[async_trait]
pub trait MailSession: Send {
    /// Select the inbox and return its message count.
    async fn select_inbox(&mut self) -> Result<u32, MailServiceError>;

    /// Fetch a single message by sequence number.
    async fn fetch_message(&mut self, seq: u32) -> Result<Option<FetchedMessage>, MailServiceError>;

    /// End the session.
    async fn logout(&mut self) -> Result<(), MailServiceError>;
}

/// Opens mail sessions.
#[async_trait]
pub trait MailConnector: Send + Sync {
    /// Connect and authenticate.
    async fn connect(&self, config: &ImapConfig) -> Result<Box<dyn MailSession>, MailServiceError>;
}

/// Open and immediately close a session to validate connection parameters.
///
/// A failed logout after a successful login still counts as success.
///
/// # Errors
///
/// Returns the connection or authentication error if the session cannot be
/// established.
pub async fn probe(connector: &dyn MailConnector, config: &ImapConfig) -> Result<(), MailServiceError> {
    let mut session = connector.connect(config).await?;
    if let Err(e) = session.logout().await {
        debug!(host = %config.host, error = %e, "Logout after probe failed");
    }
    debug!(host = %config.host, port = config.port, "Probe succeeded");
    Ok(())
}

/// [`MailConnector`] speaking IMAP over TCP or implicit TLS.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImapConnector;

#[async_trait]
impl MailConnector for ImapConnector {
    async fn connect(&self, config: &ImapConfig) -> Result<Box<dyn MailSession>, MailServiceError> {
        let tcp = stream::open(&config.host, config.port).await?;
        match config.security {
            Security::Plain => login(tcp.compat(), config).await,
            Security::Tls => {
                let tls = stream::secure(&config.host, tcp).await?;
                login(tls.compat(), config).await
            }
        }
    }
}

async fn login<S>(transport: S, config: &ImapConfig) -> Result<Box<dyn MailSession>, MailServiceError>
where
    S: AsyncRead + AsyncWrite + Unpin + std::fmt::Debug + Send + 'static,
{
    let session = async_imap::Client::new(transport)
        .login(&config.username, &config.password)
        .await
        .map_err(|(e, _client)| MailServiceError::Authentication(e.to_string()))?;

    debug!(
        host = %config.host,
        user = %config.username,
        tls = config.security.is_encrypted(),
        "IMAP login succeeded"
    );
    Ok(Box::new(ImapSession { session }))
}

struct ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + std::fmt::Debug + Send,
{
    session: async_imap::Session<S>,
}

#[async_trait]
impl<S> MailSession for ImapSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + std::fmt::Debug + Send + 'static,
{
    async fn select_inbox(&mut self) -> Result<u32, MailServiceError> {
        let mailbox = self
            .session
            .select(INBOX)
            .await
            .map_err(|e| MailServiceError::Operation(format!("select {INBOX}: {e}")))?;
        Ok(mailbox.exists)
    }

    async fn fetch_message(&mut self, seq: u32) -> Result<Option<FetchedMessage>, MailServiceError> {
        let stream = self
            .session
            .fetch(seq.to_string(), FETCH_QUERY)
            .await
            .map_err(|e| MailServiceError::Operation(format!("fetch {seq}: {e}")))?;
        let mut stream = pin!(stream);

        // Drain the whole response so the connection is ready for the next command.
        let mut message = None;
        while let Some(item) = stream.next().await {
            let fetch = item.map_err(|e| MailServiceError::Operation(format!("fetch {seq}: {e}")))?;
            if message.is_none() && fetch.message == seq {
                message = Some(to_fetched_message(&fetch));
            }
        }
        Ok(message)
    }

    async fn logout(&mut self) -> Result<(), MailServiceError> {
        self.session
            .logout()
            .await
            .map_err(|e| MailServiceError::Operation(format!("logout: {e}")))
    }
}

fn to_fetched_message(fetch: &Fetch) -> FetchedMessage {
    let envelope = fetch.envelope();
    let sender = envelope
        .and_then(|e| e.from.as_ref())
        .and_then(|addresses| addresses.first());

    let from_address = sender
        .map(|a| {
            let mailbox = a.mailbox.as_deref().map(String::from_utf8_lossy).unwrap_or_default();
            let host = a.host.as_deref().map(String::from_utf8_lossy).unwrap_or_default();
            if host.is_empty() {
                mailbox.into_owned()
            } else {
                format!("{mailbox}@{host}")
            }
        })
        .unwrap_or_default();

    let source = fetch.body().map(<[u8]>::to_vec).unwrap_or_default();

    FetchedMessage {
        seq: fetch.message,
        uid: fetch.uid,
        message_id: envelope
            .and_then(|e| e.message_id.as_deref())
            .map(|id| String::from_utf8_lossy(id).trim().to_string())
            .or_else(|| header_from_source(&source, "Message-ID"))
            .filter(|id| !id.is_empty()),
        from_name: sender
            .and_then(|a| a.name.as_deref())
            .map(decode_header_value)
            .unwrap_or_default(),
        from_address,
        subject: envelope
            .and_then(|e| e.subject.as_deref())
            .map(decode_header_value)
            .unwrap_or_default(),
        date: envelope
            .and_then(|e| e.date.as_deref())
            .and_then(|raw| parse_date(&String::from_utf8_lossy(raw)))
            .or_else(|| fetch.internal_date().map(|d| d.with_timezone(&Utc))),
        source,
    }
}

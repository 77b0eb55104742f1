//! In-memory [`MailConnector`] for tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::mail::{FetchedMessage, MailConnector, MailServiceError, MailSession};
use crate::account::ImapConfig;

#[derive(Debug, Default)]
struct MockState {
    accepted_password: Option<String>,
    messages: Vec<FetchedMessage>,
    failing: HashSet<u32>,
    unreachable: bool,
    select_fails: bool,
    connects: usize,
    logouts: usize,
    fetched: Vec<u32>,
}

/// A scripted mail server. Clones share state, so a test can keep a handle
/// after passing the connector to the code under test.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    /// The only password the mock accepts.
    pub const PASSWORD: &'static str = "correct-horse";

    /// A reachable server whose inbox holds `count` sample messages.
    #[must_use]
    pub fn with_messages(count: u32) -> Self {
        let connector = Self::default();
        {
            let mut state = connector.lock();
            state.accepted_password = Some(Self::PASSWORD.to_string());
            state.messages = (1..=count).map(sample_message).collect();
        }
        connector
    }

    /// A server that refuses connections.
    #[must_use]
    pub fn unreachable() -> Self {
        let connector = Self::with_messages(0);
        connector.lock().unreachable = true;
        connector
    }

    /// Reject every password from now on.
    pub fn revoke(&self) {
        self.lock().accepted_password = None;
    }

    /// Make fetching `seq` fail.
    pub fn fail_fetch(&self, seq: u32) {
        self.lock().failing.insert(seq);
    }

    /// Make selecting the inbox fail.
    pub fn fail_select(&self) {
        self.lock().select_fails = true;
    }

    /// Append a message to the inbox. Its sequence number is assigned on fetch.
    pub fn push_message(&self, message: FetchedMessage) {
        self.lock().messages.push(message);
    }

    /// Connection attempts so far.
    #[must_use]
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Logouts so far.
    #[must_use]
    pub fn logouts(&self) -> usize {
        self.lock().logouts
    }

    /// Sequence numbers requested so far, in order.
    #[must_use]
    pub fn fetched(&self) -> Vec<u32> {
        self.lock().fetched.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl MailConnector for MockConnector {
    async fn connect(&self, config: &ImapConfig) -> Result<Box<dyn MailSession>, MailServiceError> {
        let mut state = self.lock();
        state.connects += 1;

        if state.unreachable {
            return Err(MailServiceError::Connection(format!(
                "{}:{} refused the connection",
                config.host, config.port
            )));
        }
        if state.accepted_password.as_deref() != Some(config.password.as_str()) {
            return Err(MailServiceError::Authentication(
                "Invalid credentials".to_string(),
            ));
        }

        Ok(Box::new(MockSession {
            connector: self.clone(),
        }))
    }
}

struct MockSession {
    connector: MockConnector,
}

#[async_trait]
impl MailSession for MockSession {
    async fn select_inbox(&mut self) -> Result<u32, MailServiceError> {
        let state = self.connector.lock();
        if state.select_fails {
            return Err(MailServiceError::Operation("select INBOX: NO".to_string()));
        }
        Ok(u32::try_from(state.messages.len()).unwrap_or(u32::MAX))
    }

    async fn fetch_message(&mut self, seq: u32) -> Result<Option<FetchedMessage>, MailServiceError> {
        let mut state = self.connector.lock();
        state.fetched.push(seq);

        if state.failing.contains(&seq) {
            return Err(MailServiceError::Operation(format!("fetch {seq}: BAD")));
        }

        let index = usize::try_from(seq).ok().and_then(|s| s.checked_sub(1));
        Ok(index
            .and_then(|i| state.messages.get(i))
            .cloned()
            .map(|mut message| {
                message.seq = seq;
                message
            }))
    }

    async fn logout(&mut self) -> Result<(), MailServiceError> {
        self.connector.lock().logouts += 1;
        Ok(())
    }
}

/// A message with a distinct `Message-ID`, sender and HTML body.
#[must_use]
pub fn sample_message(seq: u32) -> FetchedMessage {
    let received = DateTime::<Utc>::from_timestamp(1_700_000_000, 0)
        .map(|base| base + Duration::minutes(i64::from(seq)));

    FetchedMessage {
        seq,
        uid: Some(1000 + seq),
        message_id: Some(format!("<msg{seq}@example.com>")),
        from_name: format!("Sender {seq}"),
        from_address: format!("sender{seq}@example.com"),
        subject: format!("Message {seq}"),
        date: received,
        source: format!(
            "Subject: Message {seq}\r\nContent-Type: text/html\r\n\r\n\
             <html><body><p>Body of message {seq}</p></body></html>"
        )
        .into_bytes(),
    }
}

//! Scripted transport for tests

use super::{WhoisError, WhoisTransport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub(crate) enum Canned {
    Reply(&'static str),
    Timeout,
    Refused,
}

/// Answers from canned replies keyed by host and counts every call
#[derive(Default)]
pub(crate) struct MockTransport {
    replies: HashMap<&'static str, Canned>,
    calls: AtomicUsize,
    payloads: Mutex<Vec<String>>,
}

impl MockTransport {
    pub(crate) fn with(mut self, host: &'static str, reply: Canned) -> Self {
        self.replies.insert(host, reply);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn payloads(&self) -> Vec<String> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl WhoisTransport for MockTransport {
    async fn query(
        &self,
        host: &str,
        port: u16,
        payload: &str,
        timeout: Duration,
    ) -> Result<String, WhoisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.payloads.lock().unwrap().push(payload.to_string());
        let server = format!("{}:{}", host, port);
        match self.replies.get(host) {
            Some(Canned::Reply(text)) => Ok(text.to_string()),
            Some(Canned::Timeout) => Err(WhoisError::timeout(server, timeout)),
            Some(Canned::Refused) | None => Err(WhoisError::connection(server, "refused")),
        }
    }
}

//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use brokerlink_models::ConnectionProperties;

use crate::error::SdkError;
use crate::handler::SessionEventHandler;
use crate::session::{Session, SessionBuilder};
use crate::token::TokenProvider;

/// Hands out scripted tokens in order; `Err` entries become auth errors.
pub struct ScriptedTokenProvider {
    script: Mutex<VecDeque<Result<String, String>>>,
    pub calls: AtomicUsize,
}

impl ScriptedTokenProvider {
    pub fn new(script: impl IntoIterator<Item = Result<&'static str, &'static str>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for ScriptedTokenProvider {
    async fn access_token(&self) -> Result<String, SdkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(token)) => Ok(token),
            Some(Err(reason)) => Err(SdkError::Auth(reason)),
            None => Err(SdkError::Auth("script exhausted".into())),
        }
    }
}

/// In-memory session recording every token pushed into it.
pub struct FakeSession {
    properties: Mutex<ConnectionProperties>,
    pub handler: Arc<dyn SessionEventHandler>,
    pub pushed: Mutex<Vec<String>>,
    connected: AtomicBool,
}

impl FakeSession {
    pub fn pushed(&self) -> Vec<String> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Session for FakeSession {
    fn properties(&self) -> ConnectionProperties {
        self.properties.lock().unwrap().clone()
    }

    fn set_access_token(&self, token: String) -> Result<(), SdkError> {
        self.pushed.lock().unwrap().push(token.clone());
        self.properties.lock().unwrap().oauth2_access_token = Some(token);
        Ok(())
    }

    async fn connect(&self) -> Result<(), SdkError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Builds [`FakeSession`]s and keeps the last one for inspection.
#[derive(Default)]
pub struct FakeSessionBuilder {
    pub builds: AtomicUsize,
    pub last: Mutex<Option<Arc<FakeSession>>>,
}

impl FakeSessionBuilder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Arc<FakeSession> {
        self.last.lock().unwrap().clone().expect("no session built")
    }
}

impl SessionBuilder for FakeSessionBuilder {
    fn build(
        &self,
        properties: ConnectionProperties,
        handler: Arc<dyn SessionEventHandler>,
    ) -> Result<Arc<dyn Session>, SdkError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(FakeSession {
            properties: Mutex::new(properties),
            handler,
            pushed: Mutex::new(Vec::new()),
            connected: AtomicBool::new(false),
        });
        *self.last.lock().unwrap() = Some(Arc::clone(&session));
        Ok(session)
    }
}

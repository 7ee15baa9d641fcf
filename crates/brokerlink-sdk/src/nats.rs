//! NATS-backed [`Session`] implementation.
//!
//! Canonical properties map onto [`async_nats::ConnectOptions`]:
//!
//! | Property                   | NATS option                                   |
//! |----------------------------|-----------------------------------------------|
//! | `host` (comma-separated)   | server list, `tcp://` → `nats://`, `tcps://` → `tls://` |
//! | OAuth2 access token        | auth callback, read on every (re)connect      |
//! | username / password        | user + password (BASIC)                       |
//! | `reconnect_retries`        | `max_reconnects` (negative ⇒ unlimited, 0 rejected) |
//! | `reconnect_retry_wait_ms`  | delay between attempts, none before the first |
//! | `connect_retries` ≠ 0      | retry on initial connect                      |
//! | `client_name`              | connection name                               |
//!
//! Client lifecycle events are forwarded to the session's event handler
//! on a dedicated task, one at a time and in order.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use std::time::Duration;

use async_nats::{ConnectOptions, Event, ServerAddr};
use async_trait::async_trait;
use brokerlink_models::{AuthenticationScheme, ConnectionProperties, ReconnectEvent, SessionEventKind};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::SdkError;
use crate::handler::SessionEventHandler;
use crate::session::{Session, SessionBuilder};

/// Property-bag key holding the client certificate path (`CLIENT_CERTIFICATE`).
pub const TLS_CLIENT_CERT_KEY: &str = "TLS_CLIENT_CERT";
/// Property-bag key holding the client private key path (`CLIENT_CERTIFICATE`).
pub const TLS_CLIENT_KEY_KEY: &str = "TLS_CLIENT_KEY";

/// Builds [`NatsSession`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct NatsSessionBuilder;

impl SessionBuilder for NatsSessionBuilder {
    fn build(
        &self,
        properties: ConnectionProperties,
        handler: Arc<dyn SessionEventHandler>,
    ) -> Result<Arc<dyn Session>, SdkError> {
        Ok(Arc::new(NatsSession::new(properties, handler)?))
    }
}

/// A broker session over NATS.
pub struct NatsSession {
    properties: ConnectionProperties,
    servers: Vec<String>,
    name: String,
    max_reconnects: Option<usize>,
    token: Arc<RwLock<Option<String>>>,
    established: Arc<AtomicBool>,
    handler: Arc<dyn SessionEventHandler>,
    client: OnceLock<async_nats::Client>,
}

impl NatsSession {
    /// Validate `properties` and prepare a session. Does not connect.
    pub fn new(
        properties: ConnectionProperties,
        handler: Arc<dyn SessionEventHandler>,
    ) -> Result<Self, SdkError> {
        if properties.authentication_scheme == AuthenticationScheme::Kerberos {
            return Err(SdkError::Config(
                "Kerberos authentication is not supported by the NATS transport".into(),
            ));
        }
        let servers = server_urls(&properties.host)?;
        let max_reconnects = max_reconnects(properties.channel.reconnect_retries)?;
        let name = properties
            .client_name
            .clone()
            .unwrap_or_else(|| format!("brokerlink-{}", uuid::Uuid::new_v4()));
        let token = Arc::new(RwLock::new(properties.oauth2_access_token.clone()));

        Ok(Self {
            properties,
            servers,
            name,
            max_reconnects,
            token,
            established: Arc::new(AtomicBool::new(false)),
            handler,
            client: OnceLock::new(),
        })
    }

    /// Server URLs the session connects to.
    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Connection name announced to the server.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying NATS client, once connected.
    pub fn client(&self) -> Option<&async_nats::Client> {
        self.client.get()
    }

    fn options(&self) -> Result<ConnectOptions, SdkError> {
        let props = &self.properties;

        let options = match props.authentication_scheme {
            AuthenticationScheme::OAuth2 => {
                let token = Arc::clone(&self.token);
                ConnectOptions::with_auth_callback(move |_nonce| {
                    let current = read_token(&token);
                    async move {
                        let mut auth = async_nats::Auth::new();
                        auth.token = current;
                        Ok::<_, async_nats::AuthError>(auth)
                    }
                })
            }
            AuthenticationScheme::Basic => match &props.password {
                Some(password) => {
                    ConnectOptions::with_user_and_password(props.username.clone(), password.clone())
                }
                None => ConnectOptions::new(),
            },
            AuthenticationScheme::ClientCertificate => {
                let options = ConnectOptions::new().require_tls(true);
                match (
                    props.extra.get(TLS_CLIENT_CERT_KEY),
                    props.extra.get(TLS_CLIENT_KEY_KEY),
                ) {
                    (Some(cert), Some(key)) => {
                        options.add_client_certificate(PathBuf::from(cert), PathBuf::from(key))
                    }
                    _ => options,
                }
            }
            AuthenticationScheme::None => ConnectOptions::new(),
            AuthenticationScheme::Kerberos => {
                return Err(SdkError::Config(
                    "Kerberos authentication is not supported by the NATS transport".into(),
                ))
            }
        };

        let channel = props.channel;
        let wait = Duration::from_millis(u64::from(channel.reconnect_retry_wait_ms));
        let established = Arc::clone(&self.established);
        let mut options = options
            .name(&self.name)
            .max_reconnects(self.max_reconnects)
            .reconnect_delay_callback(move |attempts| {
                retry_delay(attempts, established.load(Ordering::Acquire), wait)
            })
            .event_callback(event_forwarder(
                Arc::clone(&self.handler),
                Arc::clone(&self.established),
            ));

        if channel.connect_retries != 0 {
            options = options.retry_on_initial_connect();
        }
        if channel.connect_retries_per_host != 1 {
            debug!(
                connect_retries_per_host = channel.connect_retries_per_host,
                "per-host retry count is managed by the NATS client"
            );
        }

        Ok(options)
    }
}

#[async_trait]
impl Session for NatsSession {
    fn properties(&self) -> ConnectionProperties {
        let mut props = self.properties.clone();
        props.oauth2_access_token = read_token(&self.token);
        props
    }

    fn set_access_token(&self, token: String) -> Result<(), SdkError> {
        if token.is_empty() {
            return Err(SdkError::Session("refusing to install an empty access token".into()));
        }
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }

    async fn connect(&self) -> Result<(), SdkError> {
        if self.client.get().is_some() {
            return Err(SdkError::Session("session is already connected".into()));
        }

        info!(
            servers = ?self.servers,
            name = %self.name,
            vpn = %self.properties.vpn,
            scheme = %self.properties.authentication_scheme,
            "connecting to broker"
        );
        let client = self.options()?.connect(self.servers.as_slice()).await?;

        self.client
            .set(client)
            .map_err(|_| SdkError::Session("session is already connected".into()))
    }

    fn is_connected(&self) -> bool {
        self.client.get().is_some_and(|client| {
            matches!(
                client.connection_state(),
                async_nats::connection::State::Connected
            )
        })
    }
}

/// Map the reconnect retry count onto async-nats' `max_reconnects`.
///
/// async-nats reads both `None` and `0` as "no limit", so a count of zero
/// cannot be expressed and is rejected.
fn max_reconnects(retries: i32) -> Result<Option<usize>, SdkError> {
    match usize::try_from(retries) {
        Err(_) => Ok(None),
        Ok(0) => Err(SdkError::Config(
            "reconnect_retries = 0 cannot be expressed by the NATS client; use a positive count"
                .into(),
        )),
        Ok(n) => Ok(Some(n)),
    }
}

/// Wait before connect attempt `attempts` (1-based). The first attempt of a
/// session that never connected goes out immediately.
fn retry_delay(attempts: usize, established: bool, wait: Duration) -> Duration {
    if attempts <= 1 && !established {
        Duration::ZERO
    } else {
        wait
    }
}

fn read_token(token: &RwLock<Option<String>>) -> Option<String> {
    token.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Split a comma-separated host list into NATS server URLs.
fn server_urls(host: &str) -> Result<Vec<String>, SdkError> {
    let servers: Vec<String> = host
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(|h| {
            if let Some(rest) = h.strip_prefix("tcps://") {
                format!("tls://{rest}")
            } else if let Some(rest) = h.strip_prefix("tcp://") {
                format!("nats://{rest}")
            } else {
                h.to_string()
            }
        })
        .collect();

    if servers.is_empty() {
        return Err(SdkError::Config(format!("no broker host in `{host}`")));
    }
    for server in &servers {
        server
            .parse::<ServerAddr>()
            .map_err(|e| SdkError::Config(format!("invalid broker host `{server}`: {e}")))?;
    }
    Ok(servers)
}

fn event_kind(event: &Event) -> Option<SessionEventKind> {
    match event {
        Event::Disconnected => Some(SessionEventKind::Reconnecting),
        Event::Connected => Some(SessionEventKind::Up),
        Event::Closed | Event::ServerError(_) | Event::ClientError(_) => {
            Some(SessionEventKind::DownError)
        }
        _ => None,
    }
}

/// Build the NATS event callback. Events are queued and handled in order
/// by one task per session.
fn event_forwarder(
    handler: Arc<dyn SessionEventHandler>,
    established: Arc<AtomicBool>,
) -> impl Fn(Event) -> std::future::Ready<()> + Send + Sync + 'static {
    let (tx, mut rx) = mpsc::unbounded_channel::<ReconnectEvent>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            handler.handle_event(event).await;
        }
    });

    move |event| {
        if matches!(event, Event::Connected) {
            established.store(true, Ordering::Release);
        }
        match event_kind(&event) {
            Some(kind) => {
                if tx.send(ReconnectEvent::new(kind, event.to_string())).is_err() {
                    warn!("session event dispatcher stopped");
                }
            }
            None => debug!(event = %event, "ignoring NATS event"),
        }
        std::future::ready(())
    }
}

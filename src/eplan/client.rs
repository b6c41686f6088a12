//! Connection client: instances and sessions.
//!
//! An [`Instance`] is one running, independently addressable copy of EPLAN
//! found by discovery. A [`Session`] is the controller's single active
//! binding to one instance. There is no pooling: this crate holds at most
//! one session per controller process, created by an explicit
//! [`connect`] and released by an explicit (idempotent) disconnect.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{DiscoveryConfig, EplanConfig};
use crate::eplan::discovery;
use crate::eplan::transport::{ActionTransport, TcpTransport, PING_QUERY, VERSION_QUERY};
use crate::error::EplanError;

/// A discovered EPLAN instance. Immutable once found; becomes stale when
/// the host process exits (detected via a failed ping).
#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    /// Identifier assigned at discovery time.
    pub instance_id: Uuid,
    /// Host the remoting endpoint listens on.
    pub host: String,
    /// Remoting port.
    pub port: u16,
    /// Version banner reported during the handshake.
    pub version: String,
    /// When discovery found this instance.
    pub discovered_at: DateTime<Utc>,
}

impl Instance {
    /// Creates an instance record from a successful probe.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, version: impl Into<String>) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            host: host.into(),
            port,
            version: version.into(),
            discovered_at: Utc::now(),
        }
    }

    /// The `host:port` endpoint string.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// How [`connect`] resolves its target instance.
#[derive(Debug, Clone)]
pub enum InstanceSelector {
    /// Run discovery and take the first instance (preferring the configured
    /// target version when one is set).
    FirstDiscovered,
    /// Connect to an explicit port on the configured host, skipping
    /// discovery.
    Port(u16),
}

/// An active binding from the controller to one instance.
///
/// Owned exclusively by the dispatcher; access is serialised there.
pub struct Session<T: ActionTransport> {
    instance: Instance,
    transport: Option<T>,
    connected_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Snapshot of session state for the status tool.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    /// Whether a live session exists.
    pub connected: bool,
    /// The bound instance, when connected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<Instance>,
    /// When the session was established.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
    /// Last time an action crossed the transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_activity: Option<DateTime<Utc>>,
}

impl SessionStatus {
    /// Status value for "no session".
    #[must_use]
    pub const fn disconnected() -> Self {
        Self {
            connected: false,
            instance: None,
            connected_at: None,
            last_activity: None,
        }
    }
}

impl<T: ActionTransport> Session<T> {
    /// Binds an already-handshaken transport to an instance.
    pub fn new(instance: Instance, transport: T) -> Self {
        let now = Utc::now();
        Self {
            instance,
            transport: Some(transport),
            connected_at: now,
            last_activity: now,
        }
    }

    /// The instance this session is bound to.
    #[must_use]
    pub const fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Whether the transport is still held.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    /// Current status snapshot.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            connected: self.is_connected(),
            instance: self.is_connected().then(|| self.instance.clone()),
            connected_at: Some(self.connected_at),
            last_activity: Some(self.last_activity),
        }
    }

    /// Sends one raw line and awaits the response within `timeout`.
    ///
    /// On transport failure or timeout the session is torn down so later
    /// calls fail fast with `NotConnected`. After a timeout the host's late
    /// reply would still be buffered on the socket and answer the *next*
    /// action, so the transport cannot be reused.
    ///
    /// # Errors
    ///
    /// `NotConnected` without any transport I/O when already closed;
    /// `Timeout` when no response arrives in time; `Io` on transport fault.
    pub async fn send(&mut self, line: &str, timeout: Duration) -> Result<String, EplanError> {
        let transport = self.transport.as_mut().ok_or(EplanError::NotConnected)?;

        let response = match tokio::time::timeout(timeout, transport.send(line)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                self.transport = None;
                return Err(EplanError::Io(e));
            }
            Err(_) => {
                if let Some(mut stale) = self.transport.take() {
                    if let Err(e) = stale.shutdown().await {
                        tracing::debug!(error = %e, "transport shutdown failed after timeout");
                    }
                }
                return Err(EplanError::Timeout(timeout));
            }
        };

        self.last_activity = Utc::now();
        Ok(response)
    }

    /// Liveness check. Never errors; any failure (including an already
    /// closed session) is `false`.
    pub async fn ping(&mut self, timeout: Duration) -> bool {
        self.send(PING_QUERY, timeout).await.is_ok()
    }

    /// Releases the transport. Idempotent: closing an already-closed
    /// session is a no-op.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.shutdown().await {
                tracing::debug!(error = %e, "transport shutdown failed during disconnect");
            }
            tracing::info!(endpoint = %self.instance.endpoint(), "Disconnected from EPLAN");
        }
    }
}

/// Resolves a target instance and opens a session to it.
///
/// # Errors
///
/// - `NotFound` when discovery yields no matching instance
/// - `Connection` when the transport opens but the handshake fails
/// - `Timeout`/`Io` surfaced from the underlying transport
pub async fn connect(
    eplan: &EplanConfig,
    discovery_cfg: &DiscoveryConfig,
    selector: InstanceSelector,
    connect_timeout: Duration,
) -> Result<Session<TcpTransport>, EplanError> {
    let instance = match selector {
        InstanceSelector::Port(port) => {
            probe_endpoint(&eplan.host, port, connect_timeout).await?
        }
        InstanceSelector::FirstDiscovered => {
            let instances = discovery::list_instances(eplan, discovery_cfg).await;
            pick_instance(instances, eplan.target_version.as_deref())?
        }
    };

    tracing::info!(endpoint = %instance.endpoint(), version = %instance.version, "Connecting to EPLAN");

    let mut transport = TcpTransport::open(&instance.host, instance.port, connect_timeout)
        .await
        .map_err(|e| EplanError::Connection {
            endpoint: instance.endpoint(),
            message: e.to_string(),
        })?;

    // Handshake: the instance must answer a version query in time.
    match tokio::time::timeout(connect_timeout, transport.send(VERSION_QUERY)).await {
        Ok(Ok(_)) => {}
        Ok(Err(e)) => {
            return Err(EplanError::Connection {
                endpoint: instance.endpoint(),
                message: format!("handshake failed: {e}"),
            });
        }
        Err(_) => {
            return Err(EplanError::Connection {
                endpoint: instance.endpoint(),
                message: format!("handshake timed out after {connect_timeout:?}"),
            });
        }
    }

    Ok(Session::new(instance, transport))
}

/// Probes one explicit endpoint and builds an [`Instance`] from its
/// version banner.
async fn probe_endpoint(
    host: &str,
    port: u16,
    timeout: Duration,
) -> Result<Instance, EplanError> {
    let endpoint = format!("{host}:{port}");
    let mut transport =
        TcpTransport::open(host, port, timeout)
            .await
            .map_err(|e| EplanError::NotFound(format!("no EPLAN endpoint at {endpoint}: {e}")))?;

    let version = tokio::time::timeout(timeout, transport.send(VERSION_QUERY))
        .await
        .map_err(|_| EplanError::Connection {
            endpoint: endpoint.clone(),
            message: format!("version query timed out after {timeout:?}"),
        })?
        .map_err(|e| EplanError::Connection {
            endpoint: endpoint.clone(),
            message: format!("version query failed: {e}"),
        })?;

    let instance = Instance::new(host, port, version);
    if let Err(e) = transport.shutdown().await {
        tracing::debug!(error = %e, "probe transport shutdown failed");
    }
    Ok(instance)
}

/// Picks the instance to bind: prefer one whose version banner contains the
/// target selector, otherwise the first discovered.
fn pick_instance(
    instances: Vec<Instance>,
    target_version: Option<&str>,
) -> Result<Instance, EplanError> {
    if instances.is_empty() {
        return Err(EplanError::NotFound(
            "no running EPLAN instance discovered".to_string(),
        ));
    }

    if let Some(target) = target_version {
        if let Some(matching) = instances.iter().find(|i| i.version.contains(target)) {
            return Ok(matching.clone());
        }
        tracing::warn!(
            target_version = target,
            "no instance matches the target version; using the first discovered"
        );
    }

    Ok(instances.into_iter().next().expect("checked non-empty"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eplan::transport::testing::MockTransport;

    fn test_instance() -> Instance {
        Instance::new("127.0.0.1", 49152, "EPLAN Electric P8 2026.0")
    }

    #[tokio::test]
    async fn send_updates_last_activity() {
        let mut session = Session::new(test_instance(), MockTransport::new());
        let before = session.status().last_activity.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        session.send("Ping", Duration::from_secs(1)).await.unwrap();
        assert!(session.status().last_activity.unwrap() > before);
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let mut session = Session::new(test_instance(), MockTransport::new());
        session.disconnect().await;
        assert!(!session.is_connected());

        // Second disconnect is a no-op, not an error.
        session.disconnect().await;
        assert!(!session.is_connected());
    }

    #[tokio::test]
    async fn send_after_disconnect_fails_fast() {
        let mut session = Session::new(test_instance(), MockTransport::new());
        session.disconnect().await;

        let result = session.send("Ping", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(EplanError::NotConnected)));
    }

    #[tokio::test]
    async fn ping_never_errors() {
        let mut session = Session::new(test_instance(), MockTransport::new());
        assert!(session.ping(Duration::from_secs(1)).await);

        session.disconnect().await;
        assert!(!session.ping(Duration::from_secs(1)).await);
    }

    /// Transport whose responses never arrive.
    struct StalledTransport;

    impl ActionTransport for StalledTransport {
        async fn send(&mut self, _line: &str) -> std::io::Result<String> {
            std::future::pending().await
        }

        async fn shutdown(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn timeout_tears_down_session() {
        let mut session = Session::new(test_instance(), StalledTransport);

        let result = session.send("check", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(EplanError::Timeout(_))));
        assert!(!session.is_connected());

        // A late reply to the timed-out action would answer the next send,
        // so the session must refuse further traffic outright.
        let result = session.send("compress", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(EplanError::NotConnected)));
    }

    #[tokio::test]
    async fn transport_fault_tears_down_session() {
        let failing = MockTransport::with_responses([Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ))]);
        let mut session = Session::new(test_instance(), failing);

        let result = session.send("Ping", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(EplanError::Io(_))));
        assert!(!session.is_connected());
    }

    #[test]
    fn pick_instance_empty_is_not_found() {
        let result = pick_instance(Vec::new(), None);
        assert!(matches!(result, Err(EplanError::NotFound(_))));
    }

    #[test]
    fn pick_instance_prefers_target_version() {
        let older = Instance::new("127.0.0.1", 49152, "EPLAN Electric P8 2024.0");
        let newer = Instance::new("127.0.0.1", 49153, "EPLAN Electric P8 2026.0");
        let picked = pick_instance(vec![older, newer], Some("2026")).unwrap();
        assert_eq!(picked.port, 49153);
    }

    #[test]
    fn pick_instance_falls_back_to_first() {
        let a = Instance::new("127.0.0.1", 49152, "EPLAN Electric P8 2024.0");
        let b = Instance::new("127.0.0.1", 49153, "EPLAN Electric P8 2025.0");
        let picked = pick_instance(vec![a, b], Some("2099")).unwrap();
        assert_eq!(picked.port, 49152);
    }

    #[test]
    fn status_when_connected_carries_instance() {
        let session = Session::new(test_instance(), MockTransport::new());
        let status = session.status();
        assert!(status.connected);
        assert_eq!(status.instance.unwrap().port, 49152);
    }
}

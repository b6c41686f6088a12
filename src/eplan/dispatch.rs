//! Action dispatch against the held session.
//!
//! The dispatcher owns the controller's single session and serialises
//! access to it: at most one action is in flight at a time, and a second
//! concurrent caller is rejected with [`EplanError::Busy`] rather than
//! queued, so two action strings can never interleave on one transport.
//!
//! Dispatch never retries. EPLAN actions are not guaranteed idempotent
//! (closing a project twice means something different the second time), so
//! every failure is surfaced to the caller as-is.

use std::time::Duration;

use tokio::sync::Mutex;

use crate::config::TimeoutConfig;
use crate::eplan::action::{classify_response, ActionRequest, ActionResult};
use crate::eplan::client::{Session, SessionStatus};
use crate::eplan::quiet::QuietBridge;
use crate::eplan::transport::ActionTransport;
use crate::error::EplanError;

/// Owns the session and routes actions either directly over the transport
/// or through the quiet-execution bridge.
pub struct Dispatcher<T: ActionTransport> {
    session: Mutex<Option<Session<T>>>,
    timeouts: TimeoutConfig,
    bridge: QuietBridge,
}

impl<T: ActionTransport> Dispatcher<T> {
    /// Creates a dispatcher with no session installed.
    #[must_use]
    pub fn new(timeouts: TimeoutConfig, bridge: QuietBridge) -> Self {
        Self {
            session: Mutex::new(None),
            timeouts,
            bridge,
        }
    }

    /// Installs a freshly connected session, disconnecting any previous one.
    pub async fn install_session(&self, session: Session<T>) {
        let mut guard = self.session.lock().await;
        if let Some(mut old) = guard.replace(session) {
            old.disconnect().await;
        }
    }

    /// Releases the current session. Idempotent.
    pub async fn disconnect(&self) {
        let mut guard = self.session.lock().await;
        if let Some(mut session) = guard.take() {
            session.disconnect().await;
        }
    }

    /// Liveness check on the current session. Never errors.
    pub async fn ping(&self) -> bool {
        let mut guard = self.session.lock().await;
        match guard.as_mut() {
            Some(session) => session.ping(self.timeouts.ping()).await,
            None => false,
        }
    }

    /// Status snapshot of the current session.
    pub async fn status(&self) -> SessionStatus {
        let guard = self.session.lock().await;
        guard
            .as_ref()
            .map_or_else(SessionStatus::disconnected, Session::status)
    }

    /// Executes one action request.
    ///
    /// Quiet-mode requests are routed through the bridge; everything else
    /// goes straight over the transport and is classified from the raw
    /// textual response.
    ///
    /// # Errors
    ///
    /// - `Busy` when another action is already in flight
    /// - `NotConnected` when no live session exists (no transport I/O)
    /// - `Timeout`, `Host`, `CorruptResult`, `Io` from the exchange itself
    pub async fn execute(&self, request: &ActionRequest) -> Result<ActionResult, EplanError> {
        let mut guard = self.session.try_lock().map_err(|_| EplanError::Busy)?;
        let session = guard.as_mut().ok_or(EplanError::NotConnected)?;
        if !session.is_connected() {
            return Err(EplanError::NotConnected);
        }

        if request.requires_quiet_mode {
            self.bridge
                .run_quiet(session, request, self.timeouts.action())
                .await
        } else {
            execute_plain(session, request, self.timeouts.action()).await
        }
    }
}

/// Sends one request directly over the session and classifies the response.
///
/// Also used by the quiet-execution bridge for script registration and
/// triggering, which never prompt and therefore never need quiet mode.
///
/// # Errors
///
/// `NotConnected`, `Timeout` or `Io` from the underlying send.
pub(crate) async fn execute_plain<T: ActionTransport>(
    session: &mut Session<T>,
    request: &ActionRequest,
    timeout: Duration,
) -> Result<ActionResult, EplanError> {
    let action = request.to_action_string();
    tracing::info!(action = %action, "Executing EPLAN action");

    let raw = session.send(&action, timeout).await?;
    let result = classify_response(&request.name, &raw);

    if result.success {
        tracing::debug!(action = %request.name, "action succeeded");
    } else {
        tracing::warn!(action = %request.name, message = %result.message, "host reported failure");
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eplan::client::Instance;
    use crate::eplan::transport::testing::MockTransport;

    fn dispatcher() -> Dispatcher<MockTransport> {
        Dispatcher::new(
            TimeoutConfig::default(),
            QuietBridge::new(std::env::temp_dir(), Duration::from_secs(1)),
        )
    }

    fn session_with(transport: MockTransport) -> Session<MockTransport> {
        Session::new(
            Instance::new("127.0.0.1", 49152, "EPLAN Electric P8 2026.0"),
            transport,
        )
    }

    #[tokio::test]
    async fn execute_without_session_is_not_connected() {
        let dispatcher = dispatcher();
        let request = ActionRequest::new("ProjectOpen").param("Project", "demo.elk");

        let result = dispatcher.execute(&request).await;
        assert!(matches!(result, Err(EplanError::NotConnected)));
    }

    #[tokio::test]
    async fn execute_sends_serialised_action() {
        let dispatcher = dispatcher();
        dispatcher
            .install_session(session_with(MockTransport::with_responses([Ok(
                "Project opened".to_string()
            )])))
            .await;

        let request = ActionRequest::new("ProjectOpen").param("Project", "demo.elk");
        let result = dispatcher.execute(&request).await.unwrap();

        assert!(result.success);
        assert_eq!(result.message, "Project opened");
    }

    #[tokio::test]
    async fn host_error_marker_yields_failed_result() {
        let dispatcher = dispatcher();
        dispatcher
            .install_session(session_with(MockTransport::with_responses([Ok(
                "ERROR: no project selected".to_string(),
            )])))
            .await;

        let request = ActionRequest::new("compress");
        let result = dispatcher.execute(&request).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.message, "no project selected");
        assert!(result.raw_response.contains("ERROR"));
    }

    #[tokio::test]
    async fn disconnect_then_execute_fails_fast_without_io() {
        let dispatcher = dispatcher();
        dispatcher
            .install_session(session_with(MockTransport::new()))
            .await;
        dispatcher.disconnect().await;

        let request = ActionRequest::new("compress");
        let result = dispatcher.execute(&request).await;
        assert!(matches!(result, Err(EplanError::NotConnected)));
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_at_dispatcher_level() {
        let dispatcher = dispatcher();
        dispatcher
            .install_session(session_with(MockTransport::new()))
            .await;

        dispatcher.disconnect().await;
        dispatcher.disconnect().await;
        assert!(!dispatcher.status().await.connected);
    }

    #[tokio::test]
    async fn ping_without_session_is_false() {
        let dispatcher = dispatcher();
        assert!(!dispatcher.ping().await);
    }

    #[tokio::test]
    async fn status_reflects_installed_session() {
        let dispatcher = dispatcher();
        assert!(!dispatcher.status().await.connected);

        dispatcher
            .install_session(session_with(MockTransport::new()))
            .await;
        let status = dispatcher.status().await;
        assert!(status.connected);
        assert_eq!(status.instance.unwrap().port, 49152);
    }

    #[tokio::test]
    async fn concurrent_execute_is_rejected_as_busy() {
        let dispatcher = dispatcher();
        dispatcher
            .install_session(session_with(MockTransport::new()))
            .await;

        // Hold the session lock to simulate an in-flight action.
        let guard = dispatcher.session.lock().await;

        let request = ActionRequest::new("compress");
        let result = dispatcher.execute(&request).await;
        assert!(matches!(result, Err(EplanError::Busy)));
        drop(guard);

        // Once the in-flight action finishes, execution proceeds again.
        let result = dispatcher.execute(&request).await;
        assert!(result.is_ok());
    }
}

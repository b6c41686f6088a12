//! Port-range discovery of running EPLAN instances.
//!
//! EPLAN allocates its remoting port from the ephemeral range starting at
//! 49152, one port per running instance. Discovery probes the configured
//! range concurrently: each candidate port gets a TCP connect plus a
//! version-query handshake under its own short timeout, and the whole scan
//! is additionally bounded by a total timeout so a wide range cannot stall
//! the caller. Finding nothing is an empty result, not an error.

use std::time::Duration;

use tokio::task::JoinSet;

use crate::config::{DiscoveryConfig, EplanConfig};
use crate::eplan::client::Instance;
use crate::eplan::transport::{ActionTransport, TcpTransport, VERSION_QUERY};

/// Probes the configured port range and returns every instance that
/// completed the handshake, ordered by port.
pub async fn list_instances(eplan: &EplanConfig, discovery: &DiscoveryConfig) -> Vec<Instance> {
    let probe_timeout = discovery.probe_timeout();

    let mut probes = JoinSet::new();
    for port in discovery.port_start..=discovery.port_end {
        let host = eplan.host.clone();
        probes.spawn(async move { probe(host, port, probe_timeout).await });
    }

    let deadline = tokio::time::Instant::now() + discovery.total_timeout();
    let mut instances = Vec::new();
    loop {
        match tokio::time::timeout_at(deadline, probes.join_next()).await {
            Ok(Some(Ok(Some(instance)))) => instances.push(instance),
            Ok(Some(Ok(None))) => {}
            Ok(Some(Err(e))) => tracing::debug!(error = %e, "discovery probe task failed"),
            Ok(None) => break,
            Err(_) => {
                tracing::warn!(
                    total_timeout_ms = discovery.total_timeout_ms,
                    "discovery scan hit the total timeout; returning partial results"
                );
                probes.abort_all();
                break;
            }
        }
    }

    instances.sort_by_key(|i| i.port);

    tracing::info!(
        count = instances.len(),
        port_start = discovery.port_start,
        port_end = discovery.port_end,
        "EPLAN instance discovery complete"
    );

    instances
}

/// Probes one candidate port. `None` means nothing answered the handshake.
async fn probe(host: String, port: u16, timeout: Duration) -> Option<Instance> {
    let Ok(mut transport) = TcpTransport::open(&host, port, timeout).await else {
        return None;
    };

    let version = match tokio::time::timeout(timeout, transport.send(VERSION_QUERY)).await {
        Ok(Ok(version)) if !version.trim().is_empty() => version.trim().to_string(),
        _ => return None,
    };

    if let Err(e) = transport.shutdown().await {
        tracing::debug!(port, error = %e, "probe transport shutdown failed");
    }

    tracing::debug!(port, version = %version, "found EPLAN instance");
    Some(Instance::new(host, port, version))
}

//! Debug port allocation

use std::net::{IpAddr, Ipv4Addr};

use async_trait::async_trait;
use tokio::net::TcpListener;
use tracing::debug;

use crate::error::PortError;
use crate::options::DEFAULT_PORT_SCAN_LIMIT;

/// Finds a port the supervised process can listen on
#[async_trait]
pub trait PortAllocator: Send + Sync {
    /// Return `preferred` or the nearest free port above it
    async fn allocate(&self, preferred: u16) -> Result<u16, PortError>;
}

/// A port must bind on all of these to count as free
const PROBE_HOSTS: [IpAddr; 2] = [
    IpAddr::V4(Ipv4Addr::LOCALHOST),
    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
];

/// Walks upwards from the preferred port until a bind succeeds
#[derive(Debug, Clone)]
pub struct ScanningAllocator {
    scan_limit: u16,
}

impl ScanningAllocator {
    /// Scan at most `scan_limit` ports above the preferred one
    pub fn new(scan_limit: u16) -> Self {
        Self { scan_limit }
    }

    async fn is_free(&self, port: u16) -> bool {
        for host in &PROBE_HOSTS {
            match TcpListener::bind((*host, port)).await {
                Ok(listener) => drop(listener),
                Err(e) => {
                    debug!(port, host = %host, error = %e, "Port unavailable");
                    return false;
                }
            }
        }
        true
    }
}

impl Default for ScanningAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_PORT_SCAN_LIMIT)
    }
}

#[async_trait]
impl PortAllocator for ScanningAllocator {
    async fn allocate(&self, preferred: u16) -> Result<u16, PortError> {
        let start = preferred.max(1);
        let end = start.saturating_add(self.scan_limit);
        for port in start..=end {
            if self.is_free(port).await {
                debug!(preferred, port, "Allocated debug port");
                return Ok(port);
            }
        }
        Err(PortError::Exhausted { start, end })
    }
}

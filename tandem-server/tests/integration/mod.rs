//! Integration tests for tandem-server.
//!
//! - `room_tests` - membership, capacity and leave semantics
//! - `relay_tests` - forwarding between room members
//! - `transport_tests` - the WebSocket and HTTP surface

pub mod room_tests;
pub mod transport_tests;

use tracing::Level;

use tandem_server::{RelayConfig, SignalingService};

/// Initialize tracing for tests (call once per test).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn create_test_router() -> SignalingService {
    SignalingService::spawn(&RelayConfig::default())
}

pub fn create_reporting_router() -> SignalingService {
    SignalingService::spawn(&RelayConfig {
        report_undeliverable: true,
        ..RelayConfig::default()
    })
}

//=====================================================
// File: logging.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Process-wide tracing setup
// Objective: Install a single stderr subscriber filtered by RUST_LOG or a
//            configured fallback level
//=====================================================

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Install the subscriber. Later calls are no-ops, so tests and workers may
/// call this freely.
pub fn init(fallback_level: &str) {
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(fallback_level))
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_level(true);
        // Another subscriber may already be global (embedding hosts).
        let _ = tracing_subscriber::registry().with(layer).with(filter).try_init();
    });
}

//=====================================================
// End of file
//=====================================================

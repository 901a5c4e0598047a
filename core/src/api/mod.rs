//! Public API for the debug overlay

pub mod config;
pub mod debugger;
pub mod logging;
pub mod mock;

pub use config::DebuggerConfig;
pub use debugger::{NetworkDebugger, NetworkIntercepting, NetworkRequestsStore};
pub use logging::init_logging;
pub use mock::MockNetworkInterceptor;

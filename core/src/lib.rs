//! # netdebug core

//! Network traffic recorder behind an in-app debugging overlay.
//!
//! ## Features
//!
//! - Transparent interception of `http`/`https` requests sent through a router
//! - Streaming capture of request and response bodies
//! - Thread-safe request registry with newest-first snapshots
//! - Activity badge counting requests since the last clear
//! - Export to HAR, cURL and plain-text reports
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 Host app / debug overlay                 │
//! ├──────────────────────────────────────────────────────────┤
//! │                  NetworkDebugger (api)                   │
//! │  ┌──────────┐  ┌───────────┐  ┌──────────┐  ┌─────────┐  │
//! │  │  Router  │──│ Recording │──│ EventBus │──│Registry │  │
//! │  │          │  │   hook    │  │          │──│ Badge   │  │
//! │  └──────────┘  └───────────┘  └──────────┘  └─────────┘  │
//! │        │                                                 │
//! │  ┌──────────┐                                            │
//! │  │Transport │ (reqwest)                                  │
//! │  └──────────┘                                            │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod badge;
pub mod error;
pub mod events;
pub mod export;
pub mod intercept;
pub mod models;
pub mod storage;

pub use error::DebuggerError;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Data models for netdebug

pub mod request;

pub use request::*;

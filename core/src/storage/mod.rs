//! In-memory storage for recorded traffic

mod registry;

pub use registry::RequestRegistry;

//! Building blocks shared by the toll calculator services: the wire types
//! exchanged between them, the logging and metrics middleware layers, the
//! prometheus router and the listener shutdown supervision.

pub mod config;
pub mod metrics;
pub mod middleware;
pub mod shutdown;
pub mod time;
pub mod types;

//! pathguard-remedy — applies configuration commands to network
//! devices in response to path transitions.
//!
//! A [`Dispatcher`] maps a symbolic action to the ordered command
//! sequences configured for the primary device and an optional peer,
//! and runs them through an [`EapiClient`] (JSON-RPC over HTTP).
//! Execution is fire-and-forget from the state machine's perspective:
//! failures are reported to the caller for logging but are never
//! retried here and never feed back into the health judgment.

pub mod dispatcher;
pub mod eapi;
pub mod error;

pub use dispatcher::Dispatcher;
pub use eapi::EapiClient;
pub use error::RemedyError;

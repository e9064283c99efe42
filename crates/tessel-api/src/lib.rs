//! Async HTTP transport for the tessel console data layer.
//!
//! Executes single REST exchanges on behalf of `tessel-core`: resolves
//! request paths against a base URL, decodes JSON bodies and collection
//! envelopes, and maps failure payloads into [`Error::Api`] with the
//! server's own message.

pub mod client;
pub mod envelope;
pub mod error;
pub mod transport;

pub use client::{ApiClient, ApiRequest};
pub use envelope::PageEnvelope;
pub use error::Error;
pub use reqwest::Method;
pub use transport::{TlsMode, TransportConfig};

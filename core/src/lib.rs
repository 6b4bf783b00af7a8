//! Synchronous client for the api.ai natural-language-understanding API.
//!
//! # Overview
//! `ApiAiClient` sends text and event queries to an agent and manages the
//! agent's entities. Each operation builds one `HttpRequest`, executes it
//! through a blocking `Transport`, and decodes the JSON reply into a typed
//! result.
//!
//! ```no_run
//! use apiai_core::{ApiAiClient, Options};
//!
//! let client = ApiAiClient::new(Options::new("client-access-token"))?;
//! let response = client.text_query("I'd like a large pizza")?;
//! if let Some(result) = response.result {
//!     println!("{}", result.fulfillment.speech);
//! }
//! # Ok::<(), apiai_core::ApiError>(())
//! ```
//!
//! # Design
//! - `ClientConfig` is resolved once from `Options`; only the session id can
//!   change afterwards.
//! - Every operation has a pure `build_*` counterpart so requests can be
//!   inspected without I/O.
//! - No retries or caching: a call returns a typed result or the first error.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod types;

pub use client::{parse_response, ApiAiClient};
pub use config::{ClientConfig, Options};
pub use error::{ApiError, RequestError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use transport::{Transport, UreqTransport};
pub use types::{Entity, Entry, Event, QueryResponse, QueryResult, Status};

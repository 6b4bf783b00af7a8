//! Request builder, executor, and typed operations for the api.ai v1 API.
//!
//! # Design
//! Every operation is split the same way: a pure `build_*` method produces an
//! `HttpRequest` with the JSON body already serialized, `execute` sends it
//! through the client's `Transport` and checks the status, and
//! `parse_response` decodes the bytes. The convenience method named after the
//! operation chains the three. Nothing is retried; the first error wins.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ClientConfig, Options};
use crate::error::{ApiError, RequestError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    CreateEntityRequest, Entity, Entry, Event, EventQueryRequest, QueryResponse, TextQueryRequest,
};

/// Synchronous client for the api.ai v1 API.
///
/// Holds the resolved `ClientConfig` and a `Transport`. Read operations take
/// `&self`; only `set_session_id` needs `&mut self`.
#[derive(Debug, Clone)]
pub struct ApiAiClient<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl ApiAiClient<UreqTransport> {
    pub fn new(options: Options) -> Result<Self, ApiError> {
        Self::with_transport(options, UreqTransport::new())
    }

    /// Build a client from the `APIAI_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(Options::from_env())
    }
}

impl<T: Transport> ApiAiClient<T> {
    pub fn with_transport(options: Options, transport: T) -> Result<Self, ApiError> {
        Ok(Self::from_config(ClientConfig::new(options)?, transport))
    }

    pub fn from_config(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn session_id(&self) -> &str {
        self.config.session_id()
    }

    /// Switch to another dialogue. Requests already built keep the old id.
    pub fn set_session_id(&mut self, session_id: impl Into<String>) {
        self.config.set_session_id(session_id);
    }

    // -----------------------------------------------------------------------
    // Request builder & executor
    // -----------------------------------------------------------------------

    /// Build a request for the path made of `segments`, relative to the base
    /// URL. Each segment is percent-encoded on its own, so `/`, `?` and `#`
    /// inside an id never leave that segment.
    ///
    /// The API version is always sent as the `v` query parameter, followed by
    /// `query`. A `Some` body is serialized to JSON and marked with a JSON
    /// content type; `None` sends no payload and no content type.
    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<HttpRequest, ApiError> {
        let url = self.endpoint_url(segments, query)?;

        let mut headers = vec![(
            "authorization".to_string(),
            format!("Bearer {}", self.config.access_token()),
        )];

        let body = match body {
            Some(body) => {
                let json = serde_json::to_string(body)
                    .map_err(|e| RequestError::Serialization(e.to_string()))?;
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(json)
            }
            None => None,
        };

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Send `request` and return the body of a 2xx response.
    pub fn execute(&self, request: &HttpRequest) -> Result<Vec<u8>, ApiError> {
        debug!(
            method = %request.method,
            url = %request.url,
            has_body = request.body.is_some(),
            "sending api.ai request"
        );
        let response = self.transport.send(request)?;
        debug!(
            status = response.status,
            bytes = response.body.len(),
            content_type = response.header("content-type").unwrap_or_default(),
            "received api.ai response"
        );
        check_status(response)
    }

    /// Build and execute in one step.
    pub fn perform<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Vec<u8>, ApiError> {
        let request = self.build_request(method, segments, query, body)?;
        self.execute(&request)
    }

    fn endpoint_url(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<String, RequestError> {
        let base = self.config.base_url();
        let mut url =
            Url::parse(base).map_err(|e| RequestError::InvalidUrl(format!("{base}: {e}")))?;
        for segment in segments {
            check_segment(segment)?;
        }
        url.path_segments_mut()
            .map_err(|()| RequestError::InvalidUrl(format!("{base}: cannot be a base URL")))?
            .pop_if_empty()
            .extend(segments);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("v", self.config.api_version());
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url.to_string())
    }

    fn call<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        let body = self.execute(&request)?;
        parse_response(&body)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn build_text_query(&self, query: &str) -> Result<HttpRequest, ApiError> {
        if query.is_empty() {
            return Err(ApiError::Validation("query should not be empty".to_string()));
        }
        let body = TextQueryRequest {
            query,
            lang: self.config.api_lang(),
            session_id: self.config.session_id(),
        };
        self.build_request(HttpMethod::Post, &["query"], &[], Some(&body))
    }

    /// Send a text utterance to the agent.
    pub fn text_query(&self, query: &str) -> Result<QueryResponse, ApiError> {
        self.call(self.build_text_query(query)?)
    }

    pub fn build_event_query(
        &self,
        event_name: &str,
        event_data: HashMap<String, String>,
    ) -> Result<HttpRequest, ApiError> {
        if event_name.is_empty() {
            return Err(ApiError::Validation("event name can not be empty".to_string()));
        }
        let event = Event {
            name: event_name.to_string(),
            data: event_data,
        };
        let body = EventQueryRequest {
            lang: self.config.api_lang(),
            session_id: self.config.session_id(),
            event: &event,
        };
        self.build_request(HttpMethod::Post, &["query"], &[], Some(&body))
    }

    /// Trigger an intent by event name instead of text.
    pub fn event_query(
        &self,
        event_name: &str,
        event_data: HashMap<String, String>,
    ) -> Result<QueryResponse, ApiError> {
        self.call(self.build_event_query(event_name, event_data)?)
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    pub fn build_list_entities(&self) -> Result<HttpRequest, ApiError> {
        self.build_request::<()>(HttpMethod::Get, &["entities"], &[], None)
    }

    /// Retrieve all entities of the agent.
    pub fn list_entities(&self) -> Result<Vec<Entity>, ApiError> {
        self.call(self.build_list_entities()?)
    }

    pub fn build_get_entity(&self, eid: &str) -> Result<HttpRequest, ApiError> {
        self.build_request::<()>(HttpMethod::Get, &["entities", eid], &[], None)
    }

    pub fn get_entity(&self, eid: &str) -> Result<Entity, ApiError> {
        self.call(self.build_get_entity(eid)?)
    }

    pub fn build_create_entity(&self, entity: &Entity) -> Result<HttpRequest, ApiError> {
        let body = CreateEntityRequest {
            lang: self.config.api_lang(),
            session_id: self.config.session_id(),
            name: &entity.name,
            entries: &entity.entries,
        };
        self.build_request(HttpMethod::Post, &["entities"], &[], Some(&body))
    }

    pub fn create_entity(&self, entity: &Entity) -> Result<QueryResponse, ApiError> {
        self.call(self.build_create_entity(entity)?)
    }

    pub fn build_add_entries(&self, eid: &str, entries: &[Entry]) -> Result<HttpRequest, ApiError> {
        self.build_request(
            HttpMethod::Post,
            &["entities", eid, "entries"],
            &[],
            Some(entries),
        )
    }

    /// Append entries to the entity `eid`.
    pub fn add_entries(&self, eid: &str, entries: &[Entry]) -> Result<QueryResponse, ApiError> {
        self.call(self.build_add_entries(eid, entries)?)
    }

    pub fn build_upsert_entities(&self, entities: &[Entity]) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Put, &["entities"], &[], Some(entities))
    }

    /// Create or update several entities at once, matched by name.
    pub fn upsert_entities(&self, entities: &[Entity]) -> Result<QueryResponse, ApiError> {
        self.call(self.build_upsert_entities(entities)?)
    }

    pub fn build_update_entity(&self, eid: &str, entity: &Entity) -> Result<HttpRequest, ApiError> {
        self.build_request(HttpMethod::Put, &["entities", eid], &[], Some(entity))
    }

    pub fn update_entity(&self, eid: &str, entity: &Entity) -> Result<QueryResponse, ApiError> {
        self.call(self.build_update_entity(eid, entity)?)
    }

    pub fn build_replace_entries(
        &self,
        eid: &str,
        entries: &[Entry],
    ) -> Result<HttpRequest, ApiError> {
        self.build_request(
            HttpMethod::Put,
            &["entities", eid, "entries"],
            &[],
            Some(entries),
        )
    }

    /// Update entries of `eid`; entries are matched by value.
    pub fn replace_entries(&self, eid: &str, entries: &[Entry]) -> Result<QueryResponse, ApiError> {
        self.call(self.build_replace_entries(eid, entries)?)
    }

    pub fn build_delete_entity(&self, eid: &str) -> Result<HttpRequest, ApiError> {
        self.build_request::<()>(HttpMethod::Delete, &["entities", eid], &[], None)
    }

    pub fn delete_entity(&self, eid: &str) -> Result<QueryResponse, ApiError> {
        self.call(self.build_delete_entity(eid)?)
    }

    pub fn build_delete_entries<S: AsRef<str>>(
        &self,
        eid: &str,
        values: &[S],
    ) -> Result<HttpRequest, ApiError> {
        let values: Vec<&str> = values.iter().map(AsRef::as_ref).collect();
        self.build_request(
            HttpMethod::Delete,
            &["entities", eid, "entries"],
            &[],
            Some(&values),
        )
    }

    /// Remove the entries of `eid` whose reference value is listed.
    pub fn delete_entries<S: AsRef<str>>(
        &self,
        eid: &str,
        values: &[S],
    ) -> Result<QueryResponse, ApiError> {
        self.call(self.build_delete_entries(eid, values)?)
    }
}

/// Decode a response body into `R`.
pub fn parse_response<R: DeserializeOwned>(body: &[u8]) -> Result<R, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Reject path segments the URL parser would drop or rewrite instead of
/// encoding: empty, `.`, `..`, and anything carrying tabs or line breaks.
fn check_segment(segment: &str) -> Result<(), RequestError> {
    if matches!(segment, "" | "." | "..") || segment.contains(['\t', '\n', '\r']) {
        return Err(RequestError::InvalidUrl(format!(
            "{segment:?} is not a usable path segment"
        )));
    }
    Ok(())
}

/// Turn a non-2xx response into `RequestError::Status`; pass the body of
/// anything else through untouched.
fn check_status(response: HttpResponse) -> Result<Vec<u8>, ApiError> {
    if response.is_success() {
        return Ok(response.body);
    }
    warn!(status = response.status, "api.ai request failed");
    Err(RequestError::Status {
        status: response.status,
        body: response.body_text(),
    }
    .into())
}

//! DTOs for the api.ai v1 wire format.
//!
//! # Design
//! Field names follow the remote schema (camelCase on the wire). Response types
//! default every field so that the same `QueryResponse` decodes both query
//! results and the `{id, status}` acknowledgements returned by entity
//! mutations. The mock-server crate defines its own copies of these shapes;
//! integration tests catch drift between the two.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named set of recognized term groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entity {
    /// Server-assigned identifier; absent on entities built locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Entity {
    pub fn new(name: impl Into<String>, entries: Vec<Entry>) -> Self {
        Self {
            id: None,
            name: name.into(),
            entries,
        }
    }
}

/// One reference value of an entity with its accepted synonyms.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub value: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl Entry {
    pub fn new<I, S>(value: impl Into<String>, synonyms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            value: value.into(),
            synonyms: synonyms.into_iter().map(Into::into).collect(),
        }
    }
}

/// A named trigger with structured data, sent instead of a text utterance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Body of a text query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextQueryRequest<'a> {
    pub query: &'a str,
    pub lang: &'a str,
    pub session_id: &'a str,
}

/// Body of an event query.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQueryRequest<'a> {
    pub lang: &'a str,
    pub session_id: &'a str,
    pub event: &'a Event,
}

/// Body of an entity creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityRequest<'a> {
    pub lang: &'a str,
    pub session_id: &'a str,
    pub name: &'a str,
    pub entries: &'a [Entry],
}

/// Response of a query, or acknowledgement of an entity mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResponse {
    pub id: String,
    pub timestamp: String,
    pub lang: String,
    pub result: Option<QueryResult>,
    pub status: Status,
    pub session_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryResult {
    pub source: String,
    pub resolved_query: String,
    pub action: String,
    pub action_incomplete: bool,
    pub parameters: HashMap<String, Value>,
    pub contexts: Vec<Context>,
    pub metadata: Metadata,
    pub fulfillment: Fulfillment,
    pub score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Context {
    pub name: String,
    pub parameters: HashMap<String, Value>,
    pub lifespan: u32,
}

/// Intent matching details. The webhook flags are strings (`"true"`/`"false"`)
/// in v1 replies and booleans in some older ones, so they stay untyped.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub intent_id: String,
    pub intent_name: String,
    pub webhook_used: Value,
    pub webhook_for_slot_filling_used: Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Fulfillment {
    pub speech: String,
    pub messages: Vec<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct Status {
    pub code: u16,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_roundtrips_through_json() {
        let entities = vec![Entity::new(
            "pizza_type",
            vec![Entry::new("margherita", ["margherita"])],
        )];
        let json = serde_json::to_string(&entities).unwrap();
        let back: Vec<Entity> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entities);
    }

    #[test]
    fn entity_without_id_omits_it() {
        let entity = Entity::new("size", Vec::new());
        let json = serde_json::to_value(&entity).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["entries"], serde_json::json!([]));
    }

    #[test]
    fn entity_listing_without_entries_decodes() {
        let entity: Entity = serde_json::from_str(r#"{"id":"e1","name":"size"}"#).unwrap();
        assert_eq!(entity.id.as_deref(), Some("e1"));
        assert!(entity.entries.is_empty());
    }

    #[test]
    fn text_query_body_uses_camel_case() {
        let body = TextQueryRequest {
            query: "hello",
            lang: "en",
            session_id: "s-1",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"query": "hello", "lang": "en", "sessionId": "s-1"}));
    }

    #[test]
    fn query_response_decodes_full_result() {
        let raw = r#"{
            "id": "b340a1f7",
            "timestamp": "2017-02-09T15:38:26.548Z",
            "lang": "en",
            "result": {
                "source": "agent",
                "resolvedQuery": "my name is Sam",
                "action": "greetings",
                "actionIncomplete": false,
                "parameters": {"name": "Sam"},
                "contexts": [{"name": "greetings", "parameters": {"name": "Sam"}, "lifespan": 5}],
                "metadata": {"intentId": "9f41ef7c", "webhookUsed": "false", "intentName": "greetings"},
                "fulfillment": {"speech": "Hi Sam!", "messages": [{"type": 0, "speech": "Hi Sam!"}]},
                "score": 1
            },
            "status": {"code": 200, "errorType": "success"},
            "sessionId": "4b6a6779"
        }"#;
        let response: QueryResponse = serde_json::from_str(raw).unwrap();
        let result = response.result.unwrap();
        assert_eq!(result.resolved_query, "my name is Sam");
        assert_eq!(result.parameters["name"], "Sam");
        assert_eq!(result.contexts[0].lifespan, 5);
        assert_eq!(result.metadata.intent_name, "greetings");
        assert_eq!(result.fulfillment.speech, "Hi Sam!");
        assert_eq!(response.status.code, 200);
        assert_eq!(response.session_id, "4b6a6779");
    }

    #[test]
    fn mutation_ack_decodes_as_query_response() {
        let raw = r#"{"id":"e1","status":{"code":200,"errorType":"success"}}"#;
        let response: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.id, "e1");
        assert!(response.result.is_none());
        assert_eq!(response.status.error_type, "success");
    }
}

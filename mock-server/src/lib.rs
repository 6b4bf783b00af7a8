//! In-memory stand-in for the api.ai v1 API.
//!
//! Implements `/query` and the `/entities` resource closely enough for the
//! client's integration tests: bearer authentication, the mandatory `v` query
//! parameter, and api.ai-style `{id, status}` acknowledgements.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Entry {
    pub value: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entries: Vec<Entry>,
}

#[derive(Deserialize)]
pub struct EntityInput {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryInput {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub event: Option<EventInput>,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub session_id: String,
}

#[derive(Deserialize)]
pub struct EventInput {
    pub name: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

#[derive(Deserialize)]
struct VersionParam {
    v: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<String, Entity>>>;

#[derive(Clone)]
pub struct AppState {
    db: Db,
    access_token: Arc<str>,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

pub fn app(access_token: &str) -> Router {
    let state = AppState {
        db: Arc::new(RwLock::new(HashMap::new())),
        access_token: Arc::from(access_token),
    };
    Router::new()
        .route("/query", post(query))
        .route(
            "/entities",
            get(list_entities).post(create_entity).put(upsert_entities),
        )
        .route(
            "/entities/{id}",
            get(get_entity).put(update_entity).delete(delete_entity),
        )
        .route(
            "/entities/{id}/entries",
            post(add_entries).put(update_entries).delete(delete_entries),
        )
        .layer(middleware::from_fn_with_state(state.clone(), authorize))
        .with_state(state)
}

pub async fn run(listener: TcpListener, access_token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(access_token)).await
}

/// Reject requests without the expected bearer token or the `v` parameter.
async fn authorize(
    State(state): State<AppState>,
    Query(params): Query<VersionParam>,
    request: Request,
    next: Next,
) -> Response {
    let expected = format!("Bearer {}", state.access_token);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);
    if !authorized {
        return failure(StatusCode::UNAUTHORIZED, "unauthorized", "invalid access token")
            .into_response();
    }
    if params.v.as_deref().map_or(true, str::is_empty) {
        return failure(StatusCode::BAD_REQUEST, "bad_request", "missing protocol version")
            .into_response();
    }
    debug!(method = %request.method(), uri = %request.uri(), "mock api.ai request");
    next.run(request).await
}

fn failure(status: StatusCode, error_type: &str, details: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({
            "status": {
                "code": status.as_u16(),
                "errorType": error_type,
                "errorDetails": details,
            }
        })),
    )
}

fn not_found(id: &str) -> (StatusCode, Json<Value>) {
    failure(
        StatusCode::NOT_FOUND,
        "not_found",
        &format!("entity {id} does not exist"),
    )
}

fn success(id: &str) -> Json<Value> {
    Json(json!({"id": id, "status": {"code": 200, "errorType": "success"}}))
}

async fn query(Json(input): Json<QueryInput>) -> ApiResult {
    let (resolved_query, parameters, speech) = match (input.query, input.event) {
        (Some(query), _) if !query.is_empty() => {
            let speech = format!("You said: {query}");
            (query, HashMap::new(), speech)
        }
        (_, Some(event)) if !event.name.is_empty() => {
            let speech = format!("Event {} received", event.name);
            (event.name, event.data, speech)
        }
        _ => {
            return Err(failure(
                StatusCode::BAD_REQUEST,
                "bad_request",
                "query or event is required",
            ))
        }
    };

    Ok(Json(json!({
        "id": Uuid::new_v4().to_string(),
        "lang": input.lang,
        "result": {
            "source": "agent",
            "resolvedQuery": resolved_query,
            "action": "",
            "actionIncomplete": false,
            "parameters": parameters,
            "contexts": [],
            "metadata": {},
            "fulfillment": {"speech": speech, "messages": [{"type": 0, "speech": speech}]},
            "score": 1.0
        },
        "status": {"code": 200, "errorType": "success"},
        "sessionId": input.session_id,
    })))
}

async fn list_entities(State(state): State<AppState>) -> Json<Vec<Entity>> {
    let entities = state.db.read().await;
    Json(entities.values().cloned().collect())
}

async fn create_entity(State(state): State<AppState>, Json(input): Json<EntityInput>) -> ApiResult {
    let entity = Entity {
        id: Uuid::new_v4().to_string(),
        name: input.name,
        entries: input.entries,
    };
    let id = entity.id.clone();
    state.db.write().await.insert(id.clone(), entity);
    Ok(success(&id))
}

/// Create or update entities, matching existing ones by name.
async fn upsert_entities(
    State(state): State<AppState>,
    Json(inputs): Json<Vec<EntityInput>>,
) -> ApiResult {
    let mut entities = state.db.write().await;
    let mut last_id = String::new();
    for input in inputs {
        let existing = entities
            .values_mut()
            .find(|entity| entity.name == input.name);
        last_id = match existing {
            Some(entity) => {
                entity.entries = input.entries;
                entity.id.clone()
            }
            None => {
                let id = Uuid::new_v4().to_string();
                entities.insert(
                    id.clone(),
                    Entity {
                        id: id.clone(),
                        name: input.name,
                        entries: input.entries,
                    },
                );
                id
            }
        };
    }
    Ok(success(&last_id))
}

async fn get_entity(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let entities = state.db.read().await;
    let entity = entities.get(&id).ok_or_else(|| not_found(&id))?;
    Ok(Json(json!(entity)))
}

async fn update_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<EntityInput>,
) -> ApiResult {
    let mut entities = state.db.write().await;
    let entity = entities.get_mut(&id).ok_or_else(|| not_found(&id))?;
    entity.name = input.name;
    entity.entries = input.entries;
    Ok(success(&id))
}

async fn delete_entity(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult {
    let mut entities = state.db.write().await;
    entities.remove(&id).ok_or_else(|| not_found(&id))?;
    Ok(success(&id))
}

async fn add_entries(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(entries): Json<Vec<Entry>>,
) -> ApiResult {
    let mut entities = state.db.write().await;
    let entity = entities.get_mut(&id).ok_or_else(|| not_found(&id))?;
    entity.entries.extend(entries);
    Ok(success(&id))
}

/// Update entries matched by value; unknown values are appended.
async fn update_entries(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(entries): Json<Vec<Entry>>,
) -> ApiResult {
    let mut entities = state.db.write().await;
    let entity = entities.get_mut(&id).ok_or_else(|| not_found(&id))?;
    for entry in entries {
        match entity.entries.iter_mut().find(|e| e.value == entry.value) {
            Some(existing) => existing.synonyms = entry.synonyms,
            None => entity.entries.push(entry),
        }
    }
    Ok(success(&id))
}

async fn delete_entries(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(values): Json<Vec<String>>,
) -> ApiResult {
    let mut entities = state.db.write().await;
    let entity = entities.get_mut(&id).ok_or_else(|| not_found(&id))?;
    entity.entries.retain(|entry| !values.contains(&entry.value));
    Ok(success(&id))
}

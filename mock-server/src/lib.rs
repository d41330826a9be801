use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

pub const SEED_LIST_ID: &str = "l1";
pub const SEED_CAMPAIGN_ID: &str = "c1";
pub const SEED_EMAIL: &str = "seed@example.com";

#[derive(Clone, Debug)]
pub struct Member {
    pub email: String,
    pub euid: String,
    pub leid: String,
    pub first_name: String,
    pub last_name: String,
    pub subscribed: bool,
}

impl Member {
    fn new(email: &str, merges: Option<&Map<String, Value>>) -> Self {
        let merge = |key: &str| {
            merges
                .and_then(|m| m.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let id = Uuid::new_v4().simple().to_string();
        Self {
            email: email.to_string(),
            euid: id[..10].to_string(),
            leid: id[10..20].to_string(),
            first_name: merge("FNAME"),
            last_name: merge("LNAME"),
            subscribed: true,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MailingList {
    pub name: String,
    pub members: Vec<Member>,
}

#[derive(Clone)]
pub struct AppState {
    secret: Arc<str>,
    lists: Arc<RwLock<HashMap<String, MailingList>>>,
    activity: Arc<HashMap<String, Vec<Value>>>,
}

impl AppState {
    /// Fresh state with one list holding one member and one campaign with
    /// recorded activity.
    pub fn seeded(secret: &str) -> Self {
        let mut seed = Member::new(SEED_EMAIL, None);
        seed.first_name = "Seed".to_string();
        seed.last_name = "Member".to_string();

        let lists = HashMap::from([(
            SEED_LIST_ID.to_string(),
            MailingList {
                name: "Newsletter".to_string(),
                members: vec![seed],
            },
        )]);
        let mut seed_activity = Map::new();
        seed_activity.insert(
            SEED_EMAIL.to_string(),
            json!([
                {"action": "open", "timestamp": "2014-01-01 00:00:00", "url": null, "ip": "127.0.0.1"},
                {"action": "click", "timestamp": "2014-01-01 00:05:00", "url": "https://example.com", "ip": "127.0.0.1"}
            ]),
        );
        let activity = HashMap::from([(SEED_CAMPAIGN_ID.to_string(), vec![Value::Object(seed_activity)])]);

        Self {
            secret: Arc::from(secret),
            lists: Arc::new(RwLock::new(lists)),
            activity: Arc::new(activity),
        }
    }

    fn authorize(&self, params: &Map<String, Value>) -> Result<(), Value> {
        match params.get("apikey").and_then(Value::as_str) {
            Some(key) if key == &*self.secret => Ok(()),
            other => {
                warn!(apikey_present = other.is_some(), "rejecting request with bad apikey");
                Err(error_body(104, "Invalid_ApiKey", "Invalid Mailchimp API key"))
            }
        }
    }
}

/// Router answering with the seeded state for the API secret `secret`.
pub fn app(secret: &str) -> Router {
    Router::new()
        .route("/2.0/{*method}", post(standard))
        .route("/export/1.0/{resource}/", post(export))
        .with_state(AppState::seeded(secret))
}

pub async fn run(listener: TcpListener, secret: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(secret)).await
}

pub fn error_body(code: i64, name: &str, message: &str) -> Value {
    json!({"status": "error", "code": code, "name": name, "error": message})
}

type Reply = Result<Value, Value>;

async fn standard(
    State(state): State<AppState>,
    Path(method): Path<String>,
    Json(params): Json<Map<String, Value>>,
) -> (StatusCode, Json<Value>) {
    debug!(%method, "standard call");
    let reply = match state.authorize(&params) {
        Err(err) => Err(err),
        Ok(()) => match method.strip_suffix(".json") {
            Some("helper/ping") => ping(&params).await,
            Some("lists/list") => lists_list(&state).await,
            Some("lists/subscribe") => lists_subscribe(&state, &params).await,
            Some("lists/members") => lists_members(&state, &params).await,
            Some("lists/unsubscribe") => lists_unsubscribe(&state, &params).await,
            _ => Err(error_body(-32601, "ValidationError", &format!("Method \"{method}\" not found"))),
        },
    };

    match reply {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(body) => (StatusCode::INTERNAL_SERVER_ERROR, Json(body)),
    }
}

async fn export(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    Json(params): Json<Map<String, Value>>,
) -> Response {
    debug!(%resource, "export call");
    let lines = match state.authorize(&params) {
        Err(err) => Err(err),
        Ok(()) => match resource.as_str() {
            "list" => export_list(&state, &params).await,
            "campaignSubscriberActivity" => export_activity(&state, &params),
            _ => Err(error_body(-90, "API_MissingExport", &format!("Unknown export \"{resource}\""))),
        },
    };

    let (status, lines) = match lines {
        Ok(lines) => (StatusCode::OK, lines),
        Err(err) => (StatusCode::INTERNAL_SERVER_ERROR, vec![err]),
    };
    let mut body = String::new();
    for line in lines {
        body.push_str(&line.to_string());
        body.push('\n');
    }
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn string_param<'a>(params: &'a Map<String, Value>, key: &str) -> Result<&'a str, Value> {
    params.get(key).and_then(Value::as_str).ok_or_else(|| {
        error_body(-100, "ValidationError", &format!("\"{key}\" is required"))
    })
}

/// `email` is passed as `{"email": "..."}`, as the real service expects.
fn email_param(params: &Map<String, Value>) -> Result<&str, Value> {
    params
        .get("email")
        .and_then(|e| e.get("email"))
        .and_then(Value::as_str)
        .ok_or_else(|| error_body(-100, "ValidationError", "\"email\" is required"))
}

fn no_such_list(id: &str) -> Value {
    error_body(200, "List_DoesNotExist", &format!("Invalid MailChimp List ID: {id}"))
}

async fn ping(params: &Map<String, Value>) -> Reply {
    if let Some(ms) = params.get("delay_ms").and_then(Value::as_u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
    Ok(json!({"msg": "Everything's Chimpy!"}))
}

async fn lists_list(state: &AppState) -> Reply {
    let lists = state.lists.read().await;
    let mut data: Vec<Value> = lists
        .iter()
        .map(|(id, list)| {
            let count = list.members.iter().filter(|m| m.subscribed).count();
            json!({"id": id, "name": list.name, "stats": {"member_count": count}})
        })
        .collect();
    data.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));
    Ok(json!({"total": data.len(), "data": data}))
}

async fn lists_subscribe(state: &AppState, params: &Map<String, Value>) -> Reply {
    let id = string_param(params, "id")?;
    let email = email_param(params)?;
    let merges = params.get("merge_vars").and_then(Value::as_object);

    let mut lists = state.lists.write().await;
    let list = lists.get_mut(id).ok_or_else(|| no_such_list(id))?;
    if list.members.iter().any(|m| m.email == email && m.subscribed) {
        return Err(error_body(
            214,
            "List_AlreadySubscribed",
            &format!("{email} is already subscribed to the list."),
        ));
    }
    list.members.retain(|m| m.email != email);
    let member = Member::new(email, merges);
    let reply = json!({"email": member.email, "euid": member.euid, "leid": member.leid});
    list.members.push(member);
    Ok(reply)
}

async fn lists_members(state: &AppState, params: &Map<String, Value>) -> Reply {
    let id = string_param(params, "id")?;
    let lists = state.lists.read().await;
    let list = lists.get(id).ok_or_else(|| no_such_list(id))?;
    let data: Vec<Value> = list
        .members
        .iter()
        .filter(|m| m.subscribed)
        .map(|m| json!({"email": m.email, "euid": m.euid, "leid": m.leid, "status": "subscribed"}))
        .collect();
    Ok(json!({"total": data.len(), "data": data}))
}

async fn lists_unsubscribe(state: &AppState, params: &Map<String, Value>) -> Reply {
    let id = string_param(params, "id")?;
    let email = email_param(params)?;
    let mut lists = state.lists.write().await;
    let list = lists.get_mut(id).ok_or_else(|| no_such_list(id))?;
    let member = list
        .members
        .iter_mut()
        .find(|m| m.email == email && m.subscribed)
        .ok_or_else(|| {
            error_body(232, "Email_NotExists", &format!("There is no record of \"{email}\" in the database"))
        })?;
    member.subscribed = false;
    Ok(json!({"complete": true}))
}

/// Header row followed by one value row per subscribed member.
async fn export_list(state: &AppState, params: &Map<String, Value>) -> Result<Vec<Value>, Value> {
    let id = string_param(params, "id")?;
    let lists = state.lists.read().await;
    let list = lists.get(id).ok_or_else(|| no_such_list(id))?;

    let mut lines = vec![json!(["Email Address", "First Name", "Last Name", "EUID", "LEID"])];
    lines.extend(
        list.members
            .iter()
            .filter(|m| m.subscribed)
            .map(|m| json!([m.email, m.first_name, m.last_name, m.euid, m.leid])),
    );
    Ok(lines)
}

/// One object per line, keyed by subscriber email.
fn export_activity(state: &AppState, params: &Map<String, Value>) -> Result<Vec<Value>, Value> {
    let id = string_param(params, "id")?;
    state.activity.get(id).cloned().ok_or_else(|| {
        error_body(300, "Campaign_DoesNotExist", &format!("Invalid campaign ID: {id}"))
    })
}

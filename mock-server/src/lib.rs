//! In-memory dbiler server.
//!
//! Speaks the same form-encoded protocol as the real service: every route is
//! a POST carrying `secret` and `dbName`, structured arguments arrive as JSON
//! text, and every reply is a `{data}` or `{err}` envelope with status 200.

use std::{collections::HashMap, sync::Arc};

use axum::{extract::State, routing::post, Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub mod query;

pub type Document = Map<String, Value>;

#[derive(Debug, Default)]
pub struct Database {
    pub docs: Vec<Document>,
    pub saves: u64,
}

#[derive(Debug)]
pub struct AppState {
    secret: String,
    databases: RwLock<HashMap<String, Database>>,
}

pub type Db = Arc<AppState>;

/// Form fields accepted by every route. Which of the optional ones are read
/// depends on the route.
#[derive(Debug, Deserialize)]
pub struct DbForm {
    pub secret: String,
    #[serde(rename = "dbName")]
    pub db_name: String,
    pub doc: Option<String>,
    pub query: Option<String>,
    pub projection: Option<String>,
    pub update: Option<String>,
    pub options: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MultiOption {
    #[serde(default)]
    multi: bool,
}

type Reply = Result<Value, String>;

pub fn app(secret: &str) -> Router {
    let state: Db = Arc::new(AppState {
        secret: secret.to_string(),
        databases: RwLock::new(HashMap::new()),
    });
    Router::new()
        .route("/insert", post(insert))
        .route("/find", post(find))
        .route("/find-one", post(find_one))
        .route("/count", post(count))
        .route("/update", post(update))
        .route("/remove", post(remove))
        .route("/save", post(save))
        .with_state(state)
}

pub async fn run(listener: TcpListener, secret: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(secret)).await
}

fn envelope(reply: Reply) -> Json<Value> {
    match reply {
        Ok(data) => Json(json!({ "data": data })),
        Err(err) => {
            tracing::debug!(error = %err, "rejecting request");
            Json(json!({ "err": err }))
        }
    }
}

fn authorize(state: &AppState, form: &DbForm) -> Result<(), String> {
    if form.secret == state.secret {
        Ok(())
    } else {
        Err("wrong secret".to_string())
    }
}

/// Decode a JSON-text field, treating an absent field as `{}`.
fn json_field(raw: Option<&str>, name: &str) -> Result<Value, String> {
    match raw {
        None => Ok(Value::Object(Map::new())),
        Some(text) => serde_json::from_str(text).map_err(|e| format!("invalid {name}: {e}")),
    }
}

fn object_field(raw: Option<&str>, name: &str) -> Result<Document, String> {
    match json_field(raw, name)? {
        Value::Object(map) => Ok(map),
        _ => Err(format!("invalid {name}: expected an object")),
    }
}

fn multi(form: &DbForm) -> Result<bool, String> {
    let options = json_field(form.options.as_deref(), "options")?;
    let options: MultiOption = serde_json::from_value(options).map_err(|e| format!("invalid options: {e}"))?;
    Ok(options.multi)
}

async fn insert(State(state): State<Db>, Form(form): Form<DbForm>) -> Json<Value> {
    envelope(insert_doc(&state, &form).await)
}

async fn insert_doc(state: &AppState, form: &DbForm) -> Reply {
    authorize(state, form)?;
    let raw = form.doc.as_deref().ok_or("missing doc")?;
    let mut doc = object_field(Some(raw), "doc")?;
    let id = match doc.get("_id") {
        Some(Value::String(id)) => id.clone(),
        Some(other) => other.to_string(),
        None => {
            let id = Uuid::new_v4().simple().to_string();
            doc.insert("_id".to_string(), Value::String(id.clone()));
            id
        }
    };

    let mut databases = state.databases.write().await;
    let db = databases.entry(form.db_name.clone()).or_default();
    if db.docs.iter().any(|d| d.get("_id") == doc.get("_id")) {
        return Err(format!("duplicate _id: {id}"));
    }
    db.docs.push(doc);
    Ok(Value::String(id))
}

async fn find(State(state): State<Db>, Form(form): Form<DbForm>) -> Json<Value> {
    envelope(select(&state, &form, usize::MAX).await.map(Value::Array))
}

async fn find_one(State(state): State<Db>, Form(form): Form<DbForm>) -> Json<Value> {
    let reply = select(&state, &form, 1)
        .await
        .map(|mut docs| docs.pop().unwrap_or(Value::Null));
    envelope(reply)
}

async fn select(state: &AppState, form: &DbForm, limit: usize) -> Result<Vec<Value>, String> {
    authorize(state, form)?;
    let filter = object_field(form.query.as_deref(), "query")?;
    let projection = object_field(form.projection.as_deref(), "projection")?;

    let databases = state.databases.read().await;
    let Some(db) = databases.get(&form.db_name) else {
        return Ok(Vec::new());
    };
    Ok(db
        .docs
        .iter()
        .filter(|doc| query::matches(doc, &filter))
        .take(limit)
        .map(|doc| Value::Object(query::project(doc, &projection)))
        .collect())
}

async fn count(State(state): State<Db>, Form(form): Form<DbForm>) -> Json<Value> {
    envelope(count_docs(&state, &form).await)
}

async fn count_docs(state: &AppState, form: &DbForm) -> Reply {
    authorize(state, form)?;
    let filter = object_field(form.query.as_deref(), "query")?;
    let databases = state.databases.read().await;
    let n = databases
        .get(&form.db_name)
        .map_or(0, |db| db.docs.iter().filter(|doc| query::matches(doc, &filter)).count());
    Ok(json!(n))
}

async fn update(State(state): State<Db>, Form(form): Form<DbForm>) -> Json<Value> {
    envelope(update_docs(&state, &form).await)
}

async fn update_docs(state: &AppState, form: &DbForm) -> Reply {
    authorize(state, form)?;
    let filter = object_field(form.query.as_deref(), "query")?;
    let update = object_field(form.update.as_deref(), "update")?;
    let multi = multi(form)?;

    let mut databases = state.databases.write().await;
    let Some(db) = databases.get_mut(&form.db_name) else {
        return Ok(json!(0));
    };
    let limit = if multi { usize::MAX } else { 1 };
    // Staged on copies so a failing modifier leaves every document untouched.
    let staged = db
        .docs
        .iter()
        .enumerate()
        .filter(|(_, doc)| query::matches(doc, &filter))
        .take(limit)
        .map(|(i, doc)| {
            let mut doc = doc.clone();
            query::apply_update(&mut doc, &update).map(|()| (i, doc))
        })
        .collect::<Result<Vec<_>, String>>()?;
    let updated = staged.len();
    for (i, doc) in staged {
        db.docs[i] = doc;
    }
    Ok(json!(updated))
}

async fn remove(State(state): State<Db>, Form(form): Form<DbForm>) -> Json<Value> {
    envelope(remove_docs(&state, &form).await)
}

async fn remove_docs(state: &AppState, form: &DbForm) -> Reply {
    authorize(state, form)?;
    let filter = object_field(form.query.as_deref(), "query")?;
    let multi = multi(form)?;

    let mut databases = state.databases.write().await;
    let Some(db) = databases.get_mut(&form.db_name) else {
        return Ok(json!(0));
    };
    let mut removed = 0usize;
    db.docs.retain(|doc| {
        if (multi || removed == 0) && query::matches(doc, &filter) {
            removed += 1;
            false
        } else {
            true
        }
    });
    Ok(json!(removed))
}

async fn save(State(state): State<Db>, Form(form): Form<DbForm>) -> Json<Value> {
    envelope(save_db(&state, &form).await)
}

async fn save_db(state: &AppState, form: &DbForm) -> Reply {
    authorize(state, form)?;
    let mut databases = state.databases.write().await;
    databases.entry(form.db_name.clone()).or_default().saves += 1;
    Ok(Value::Bool(true))
}

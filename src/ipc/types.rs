use std::collections::BTreeSet;
use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub uid: String,
    pub email: String,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub session: Option<Session>,
    /// ISO date fixed at process start; every "today" lookup in this session
    /// uses the same value.
    pub today: String,
    /// Collections with an active snapshot subscription.
    pub watched: BTreeSet<String>,
    /// Collections mutated by the request currently being handled.
    pub changed: BTreeSet<&'static str>,
}

impl AppState {
    pub fn new(today: String) -> Self {
        Self {
            workspace: None,
            db: None,
            session: None,
            today,
            watched: BTreeSet::new(),
            changed: BTreeSet::new(),
        }
    }
}

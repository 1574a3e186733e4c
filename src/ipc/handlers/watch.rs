use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{require_session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

use super::{attendance, exams, students};

const COLLECTIONS: [&str; 3] = ["students", "attendance", "exams"];

fn requested_collections(params: &serde_json::Value) -> Result<Vec<String>, HandlerErr> {
    let Some(raw) = params.get("collections") else {
        return Ok(Vec::new());
    };
    let Some(items) = raw.as_array() else {
        return Err(HandlerErr::new("bad_params", "collections must be an array"));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(name) = item.as_str() else {
            return Err(HandlerErr::new("bad_params", "collections must be strings"));
        };
        if !COLLECTIONS.contains(&name) {
            return Err(HandlerErr::new(
                "bad_params",
                format!("unknown collection: {}", name),
            ));
        }
        out.push(name.to_string());
    }
    Ok(out)
}

fn handle_subscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_session(state) {
        return e.response(&req.id);
    }
    let collections = match requested_collections(&req.params) {
        Ok(c) if !c.is_empty() => c,
        Ok(_) => COLLECTIONS.iter().map(|c| c.to_string()).collect(),
        Err(e) => return e.response(&req.id),
    };
    for collection in collections {
        state.watched.insert(collection);
    }
    let watched: Vec<&String> = state.watched.iter().collect();
    ok(&req.id, json!({ "watched": watched }))
}

fn handle_unsubscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_session(state) {
        return e.response(&req.id);
    }
    let collections = match requested_collections(&req.params) {
        Ok(c) => c,
        Err(e) => return e.response(&req.id),
    };
    if collections.is_empty() {
        state.watched.clear();
    } else {
        for collection in &collections {
            state.watched.remove(collection);
        }
    }
    let watched: Vec<&String> = state.watched.iter().collect();
    ok(&req.id, json!({ "watched": watched }))
}

/// Snapshot events queued by the request that just finished. Each mutated
/// collection with an active subscription produces one full-list snapshot
/// line; the pending set clears either way so stale changes never leak into
/// a later session.
pub fn drain_events(state: &mut AppState) -> Vec<serde_json::Value> {
    let changed = std::mem::take(&mut state.changed);
    if changed.is_empty() || state.watched.is_empty() {
        return Vec::new();
    }
    let Some(session) = state.session.as_ref() else {
        return Vec::new();
    };
    let Some(conn) = state.db.as_ref() else {
        return Vec::new();
    };
    let mut events = Vec::new();
    for collection in changed {
        if !state.watched.contains(collection) {
            continue;
        }
        let rows = match collection {
            "students" => students::list_students_json(conn, &session.uid),
            "attendance" => attendance::list_attendance_json(conn, &session.uid),
            "exams" => exams::list_exams_json(conn, &session.uid, None),
            _ => continue,
        };
        match rows {
            Ok(rows) => events.push(json!({
                "event": "snapshot",
                "collection": collection,
                "rows": rows,
            })),
            Err(e) => {
                tracing::error!(collection, code = e.code, "snapshot query failed");
            }
        }
    }
    events
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "watch.subscribe" => Some(handle_subscribe(state, req)),
        "watch.unsubscribe" => Some(handle_unsubscribe(state, req)),
        _ => None,
    }
}

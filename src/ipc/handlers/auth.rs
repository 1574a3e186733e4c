use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_opt_str, get_required_str, query_failed, HandlerErr};
use crate::ipc::types::{AppState, Request, Session};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::Path;

// Fixed identity error codes, each with a user-readable sentence. The UI
// shell shows these inline on the auth form rather than as blocking alerts.
const MSG_INVALID_EMAIL: &str = "Invalid email address.";
const MSG_WEAK_PASSWORD: &str = "Password is too weak. Please use at least 6 characters.";
const MSG_EMAIL_IN_USE: &str = "This email is already registered. Please sign in instead.";
const MSG_INVALID_CREDENTIALS: &str = "Incorrect email or password.";

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn email_looks_valid(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

fn validate_credentials(email: &str, password: &str) -> Result<(), HandlerErr> {
    if !email_looks_valid(email) {
        return Err(HandlerErr::new("invalid_email", MSG_INVALID_EMAIL));
    }
    if password.len() < 6 {
        return Err(HandlerErr::new("weak_password", MSG_WEAK_PASSWORD));
    }
    Ok(())
}

fn session_json(session: &Session) -> serde_json::Value {
    json!({ "uid": session.uid, "email": session.email })
}

/// Best-effort local profile cache written at sign-up. Nothing reads it back;
/// a write failure must not fail registration.
fn write_profile_cache(workspace: &Path, profile: &serde_json::Value) {
    let path = workspace.join("profile.json");
    match serde_json::to_string_pretty(profile) {
        Ok(text) => {
            if let Err(e) = std::fs::write(&path, text) {
                tracing::warn!(error = %e, "profile cache write failed");
            }
        }
        Err(e) => tracing::warn!(error = %e, "profile cache serialize failed"),
    }
}

fn register(
    conn: &Connection,
    workspace: Option<&Path>,
    params: &serde_json::Value,
) -> Result<Session, HandlerErr> {
    let email = get_required_str(params, "email")?.trim().to_lowercase();
    let password = get_required_str(params, "password")?;
    validate_credentials(&email, &password)?;

    let existing: Option<String> = conn
        .query_row("SELECT id FROM users WHERE email = ?", [&email], |r| {
            r.get(0)
        })
        .optional()
        .map_err(query_failed)?;
    if existing.is_some() {
        return Err(HandlerErr::new("email_in_use", MSG_EMAIL_IN_USE));
    }

    let uid = uuid::Uuid::new_v4().to_string();
    let salt = uuid::Uuid::new_v4().to_string();
    let hash = hash_password(&salt, &password);
    let now = chrono::Utc::now().to_rfc3339();
    let display_name = get_opt_str(params, "name");
    let school = get_opt_str(params, "school");
    let role = get_opt_str(params, "role");

    conn.execute(
        "INSERT INTO users(id, email, pass_salt, pass_hash, display_name, school, role, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &uid,
            &email,
            &salt,
            &hash,
            &display_name,
            &school,
            &role,
            &now,
        ),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "user insert failed");
        HandlerErr::new("db_insert_failed", e.to_string())
    })?;

    if let Some(workspace) = workspace {
        write_profile_cache(
            workspace,
            &json!({
                "uid": uid,
                "name": display_name,
                "email": email,
                "school": school,
                "role": role,
                "createdAt": now,
            }),
        );
    }

    Ok(Session { uid, email })
}

fn sign_in(conn: &Connection, params: &serde_json::Value) -> Result<Session, HandlerErr> {
    let email = get_required_str(params, "email")?.trim().to_lowercase();
    let password = get_required_str(params, "password")?;

    let row: Option<(String, String, String)> = conn
        .query_row(
            "SELECT id, pass_salt, pass_hash FROM users WHERE email = ?",
            [&email],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .optional()
        .map_err(query_failed)?;

    // Unknown email and wrong password collapse into one code on purpose.
    let Some((uid, salt, stored_hash)) = row else {
        return Err(HandlerErr::new(
            "invalid_credentials",
            MSG_INVALID_CREDENTIALS,
        ));
    };
    if hash_password(&salt, &password) != stored_hash {
        return Err(HandlerErr::new(
            "invalid_credentials",
            MSG_INVALID_CREDENTIALS,
        ));
    }
    Ok(Session { uid, email })
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = {
        let Some(conn) = state.db.as_ref() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        register(conn, state.workspace.as_deref(), &req.params)
    };
    match result {
        Ok(session) => {
            let user = session_json(&session);
            state.session = Some(session);
            ok(&req.id, json!({ "user": user }))
        }
        Err(e) => e.response(&req.id),
    }
}

fn handle_sign_in(state: &mut AppState, req: &Request) -> serde_json::Value {
    let result = {
        let Some(conn) = state.db.as_ref() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        sign_in(conn, &req.params)
    };
    match result {
        Ok(session) => {
            let user = session_json(&session);
            state.session = Some(session);
            ok(&req.id, json!({ "user": user }))
        }
        Err(e) => e.response(&req.id),
    }
}

fn handle_sign_out(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Sign-out tears down every snapshot subscription with the session.
    state.session = None;
    state.watched.clear();
    state.changed.clear();
    ok(&req.id, json!({ "signedOut": true }))
}

fn handle_session(state: &mut AppState, req: &Request) -> serde_json::Value {
    let user = state
        .session
        .as_ref()
        .map(session_json)
        .unwrap_or(serde_json::Value::Null);
    ok(&req.id, json!({ "user": user }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.register" => Some(handle_register(state, req)),
        "auth.signIn" => Some(handle_sign_in(state, req)),
        "auth.signOut" => Some(handle_sign_out(state, req)),
        "auth.session" => Some(handle_session(state, req)),
        _ => None,
    }
}

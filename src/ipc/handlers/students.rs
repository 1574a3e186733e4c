use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_opt_str, get_required_str, query_failed, require_session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn get_profile_fields(params: &serde_json::Value) -> Result<(String, String, String, String), HandlerErr> {
    let name = get_required_str(params, "name")?;
    let class = get_required_str(params, "class")?;
    let email = get_required_str(params, "email")?;
    let phone = get_required_str(params, "phone")?;
    for (key, value) in [
        ("name", &name),
        ("class", &class),
        ("email", &email),
        ("phone", &phone),
    ] {
        if value.trim().is_empty() {
            return Err(HandlerErr::new(
                "bad_params",
                format!("{} must not be empty", key),
            ));
        }
    }
    Ok((name, class, email, phone))
}

pub(crate) fn list_students_json(
    conn: &Connection,
    uid: &str,
) -> Result<Vec<serde_json::Value>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, name, class, email, phone, created_at, updated_at
             FROM students
             WHERE created_by = ?
             ORDER BY rowid",
        )
        .map_err(query_failed)?;
    stmt.query_map([uid], |r| {
        Ok(json!({
            "id": r.get::<_, String>(0)?,
            "name": r.get::<_, String>(1)?,
            "class": r.get::<_, String>(2)?,
            "email": r.get::<_, String>(3)?,
            "phone": r.get::<_, String>(4)?,
            "createdAt": r.get::<_, String>(5)?,
            "updatedAt": r.get::<_, String>(6)?,
        }))
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(query_failed)
}

fn create_student(
    conn: &Connection,
    uid: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (name, class, email, phone) = get_profile_fields(params)?;
    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO students(id, name, class, email, phone, created_by, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (&id, &name, &class, &email, &phone, uid, &now, &now),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "student insert failed");
        HandlerErr::new("db_insert_failed", e.to_string())
    })?;
    Ok(json!({ "studentId": id }))
}

fn update_student(
    conn: &Connection,
    uid: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let (name, class, email, phone) = get_profile_fields(params)?;
    let now = chrono::Utc::now().to_rfc3339();
    // Historic attendance/exam rows keep their denormalized name/class copies;
    // edits here do not rewrite them.
    let updated = conn
        .execute(
            "UPDATE students SET name = ?, class = ?, email = ?, phone = ?, updated_at = ?
             WHERE id = ? AND created_by = ?",
            (&name, &class, &email, &phone, &now, &student_id, uid),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "student update failed");
            HandlerErr::new("db_update_failed", e.to_string())
        })?;
    if updated == 0 {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    Ok(json!({ "studentId": student_id }))
}

fn list_students(
    conn: &Connection,
    uid: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let mut students = list_students_json(conn, uid)?;
    if let Some(search) = get_opt_str(params, "search") {
        let needle = search.to_lowercase();
        if !needle.is_empty() {
            students.retain(|s| {
                ["name", "class", "email"].iter().any(|key| {
                    s.get(key)
                        .and_then(|v| v.as_str())
                        .map(|v| v.to_lowercase().contains(&needle))
                        .unwrap_or(false)
                })
            });
        }
    }
    Ok(json!({ "students": students }))
}

fn delete_student(
    conn: &Connection,
    uid: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let removed = conn
        .execute(
            "DELETE FROM students WHERE id = ? AND created_by = ?",
            (&student_id, uid),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "student delete failed");
            HandlerErr::new("db_delete_failed", e.to_string())
        })?;
    if removed == 0 {
        return Err(HandlerErr::new("not_found", "student not found"));
    }

    // Best-effort cascade: each batch runs independently, and a failed batch
    // leaves orphans rather than rolling back the student deletion.
    let mut failed: Vec<&str> = Vec::new();
    let deleted_exams = match conn.execute(
        "DELETE FROM exams WHERE student_id = ? AND created_by = ?",
        (&student_id, uid),
    ) {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, student_id = %student_id, "exam cascade failed");
            failed.push("exams");
            0
        }
    };
    let deleted_attendance = match conn.execute(
        "DELETE FROM attendance WHERE student_id = ? AND created_by = ?",
        (&student_id, uid),
    ) {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, student_id = %student_id, "attendance cascade failed");
            failed.push("attendance");
            0
        }
    };
    if !failed.is_empty() {
        return Err(HandlerErr::new(
            "db_delete_failed",
            format!("student deleted but cascade failed for: {}", failed.join(", ")),
        ));
    }
    Ok(json!({
        "studentId": student_id,
        "deletedExams": deleted_exams,
        "deletedAttendance": deleted_attendance,
    }))
}

fn with_session(
    state: &mut AppState,
    req: &Request,
    f: impl FnOnce(&Connection, &str, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> Result<serde_json::Value, serde_json::Value> {
    let session = require_session(state).map_err(|e| e.response(&req.id))?;
    let Some(conn) = state.db.as_ref() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    f(conn, &session.uid, &req.params)
        .map(|result| ok(&req.id, result))
        .map_err(|e| e.response(&req.id))
}

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    match with_session(state, req, create_student) {
        Ok(resp) => {
            state.changed.insert("students");
            resp
        }
        Err(resp) => resp,
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    match with_session(state, req, update_student) {
        Ok(resp) => {
            state.changed.insert("students");
            resp
        }
        Err(resp) => resp,
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    match with_session(state, req, list_students) {
        Ok(resp) | Err(resp) => resp,
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    match with_session(state, req, delete_student) {
        Ok(resp) => {
            state.changed.insert("students");
            state.changed.insert("exams");
            state.changed.insert("attendance");
            resp
        }
        Err(resp) => resp,
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.create" => Some(handle_create(state, req)),
        "students.update" => Some(handle_update(state, req)),
        "students.list" => Some(handle_list(state, req)),
        "students.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, query_failed, require_session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

const STATUSES: [&str; 2] = ["Present", "Absent"];

pub(crate) fn list_attendance_json(
    conn: &Connection,
    uid: &str,
) -> Result<Vec<serde_json::Value>, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT id, student_id, name, class, date, status, created_at, updated_at
             FROM attendance
             WHERE created_by = ?
             ORDER BY date DESC, created_at DESC",
        )
        .map_err(query_failed)?;
    stmt.query_map([uid], |r| {
        Ok(json!({
            "id": r.get::<_, String>(0)?,
            "studentId": r.get::<_, String>(1)?,
            "name": r.get::<_, String>(2)?,
            "class": r.get::<_, String>(3)?,
            "date": r.get::<_, String>(4)?,
            "status": r.get::<_, String>(5)?,
            "createdAt": r.get::<_, String>(6)?,
            "updatedAt": r.get::<_, String>(7)?,
        }))
    })
    .and_then(|it| it.collect::<Result<Vec<_>, _>>())
    .map_err(query_failed)
}

fn mark_attendance(
    conn: &Connection,
    uid: &str,
    today: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let status = get_required_str(params, "status")?;
    if !STATUSES.contains(&status.as_str()) {
        return Err(HandlerErr::new(
            "bad_params",
            format!("status must be one of: {}", STATUSES.join(", ")),
        ));
    }

    let student: Option<(String, String)> = conn
        .query_row(
            "SELECT name, class FROM students WHERE id = ? AND created_by = ?",
            (&student_id, uid),
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()
        .map_err(query_failed)?;
    let Some((name, class)) = student else {
        return Err(HandlerErr::new("not_found", "student not found"));
    };

    // One row per student per day: re-marking the same day overwrites the
    // status instead of adding a second record.
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM attendance WHERE student_id = ? AND date = ? AND created_by = ?",
            (&student_id, today, uid),
            |r| r.get(0),
        )
        .optional()
        .map_err(query_failed)?;

    let now = chrono::Utc::now().to_rfc3339();
    let (attendance_id, updated) = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE attendance SET status = ?, updated_at = ? WHERE id = ?",
                (&status, &now, &id),
            )
            .map_err(|e| {
                tracing::error!(error = %e, "attendance update failed");
                HandlerErr::new("db_update_failed", e.to_string())
            })?;
            (id, true)
        }
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            conn.execute(
                "INSERT INTO attendance(id, student_id, name, class, date, status, created_by, created_at, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
                (&id, &student_id, &name, &class, today, &status, uid, &now, &now),
            )
            .map_err(|e| {
                tracing::error!(error = %e, "attendance insert failed");
                HandlerErr::new("db_insert_failed", e.to_string())
            })?;
            (id, false)
        }
    };
    Ok(json!({
        "attendanceId": attendance_id,
        "date": today,
        "status": status,
        "updated": updated,
    }))
}

fn handle_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match require_session(state) {
        Ok(s) => s,
        Err(e) => return e.response(&req.id),
    };
    let today = state.today.clone();
    let result = {
        let Some(conn) = state.db.as_ref() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        mark_attendance(conn, &session.uid, &today, &req.params)
    };
    match result {
        Ok(result) => {
            state.changed.insert("attendance");
            ok(&req.id, result)
        }
        Err(e) => e.response(&req.id),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match require_session(state) {
        Ok(s) => s,
        Err(e) => return e.response(&req.id),
    };
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match list_attendance_json(conn, &session.uid) {
        Ok(records) => ok(&req.id, json!({ "records": records })),
        Err(e) => e.response(&req.id),
    }
}

fn handle_today(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match require_session(state) {
        Ok(s) => s,
        Err(e) => return e.response(&req.id),
    };
    let student_id = match get_required_str(&req.params, "studentId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let today = state.today.clone();
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let status: Result<Option<String>, _> = conn
        .query_row(
            "SELECT status FROM attendance WHERE student_id = ? AND date = ? AND created_by = ?",
            (&student_id, &today, &session.uid),
            |r| r.get(0),
        )
        .optional()
        .map_err(query_failed);
    match status {
        Ok(status) => ok(&req.id, json!({ "date": today, "status": status })),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(handle_mark(state, req)),
        "attendance.list" => Some(handle_list(state, req)),
        "attendance.today" => Some(handle_today(state, req)),
        _ => None,
    }
}

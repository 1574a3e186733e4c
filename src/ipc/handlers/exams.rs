use crate::grades;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    get_opt_str, get_required_f64, get_required_str, query_failed, require_session, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

pub(crate) fn list_exams_json(
    conn: &Connection,
    uid: &str,
    student_id: Option<&str>,
) -> Result<Vec<serde_json::Value>, HandlerErr> {
    let sql = match student_id {
        Some(_) => {
            "SELECT id, student_id, student_name, exam_name, subject, date, score, max_score,
                    grade, percentage, notes, created_at
             FROM exams WHERE created_by = ? AND student_id = ? ORDER BY rowid"
        }
        None => {
            "SELECT id, student_id, student_name, exam_name, subject, date, score, max_score,
                    grade, percentage, notes, created_at
             FROM exams WHERE created_by = ? ORDER BY rowid"
        }
    };
    let mut stmt = conn.prepare(sql).map_err(query_failed)?;
    let map_row = |r: &rusqlite::Row<'_>| {
        Ok(json!({
            "id": r.get::<_, String>(0)?,
            "studentId": r.get::<_, String>(1)?,
            "studentName": r.get::<_, String>(2)?,
            "examName": r.get::<_, String>(3)?,
            "subject": r.get::<_, String>(4)?,
            "date": r.get::<_, String>(5)?,
            "score": r.get::<_, f64>(6)?,
            "maxScore": r.get::<_, f64>(7)?,
            "grade": r.get::<_, Option<String>>(8)?,
            "percentage": r.get::<_, i64>(9)?,
            "notes": r.get::<_, Option<String>>(10)?,
            "createdAt": r.get::<_, String>(11)?,
        }))
    };
    let rows = match student_id {
        Some(sid) => stmt
            .query_map((uid, sid), map_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>()),
        None => stmt
            .query_map([uid], map_row)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>()),
    };
    rows.map_err(query_failed)
}

fn record_exam(
    conn: &Connection,
    uid: &str,
    today: &str,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let exam_name = get_required_str(params, "examName")?;
    let subject = get_required_str(params, "subject")?;
    let score = get_required_f64(params, "score")?;
    let max_score = get_required_f64(params, "maxScore")?;
    if max_score <= 0.0 {
        return Err(HandlerErr::new(
            "bad_params",
            "maxScore must be greater than zero",
        ));
    }
    let date = get_opt_str(params, "date").unwrap_or_else(|| today.to_string());
    let notes = get_opt_str(params, "notes");

    let student_name: Option<String> = conn
        .query_row(
            "SELECT name FROM students WHERE id = ? AND created_by = ?",
            (&student_id, uid),
            |r| r.get(0),
        )
        .optional()
        .map_err(query_failed)?;
    let Some(student_name) = student_name else {
        return Err(HandlerErr::new("not_found", "student not found"));
    };

    // Grade and percentage are computed once at write time and stored with
    // the row; later formula changes do not rewrite history.
    let grade = grades::letter_grade(Some(score), Some(max_score));
    let percentage = grades::percentage(score, max_score);

    let id = uuid::Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO exams(id, student_id, student_name, exam_name, subject, date, score,
                           max_score, grade, percentage, notes, created_by, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        rusqlite::params![
            &id,
            &student_id,
            &student_name,
            &exam_name,
            &subject,
            &date,
            score,
            max_score,
            grade,
            percentage,
            &notes,
            uid,
            &now,
            &now
        ],
    )
    .map_err(|e| {
        tracing::error!(error = %e, "exam insert failed");
        HandlerErr::new("db_insert_failed", e.to_string())
    })?;
    Ok(json!({
        "examId": id,
        "grade": grade,
        "percentage": percentage,
    }))
}

fn handle_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match require_session(state) {
        Ok(s) => s,
        Err(e) => return e.response(&req.id),
    };
    let today = state.today.clone();
    let result = {
        let Some(conn) = state.db.as_ref() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        record_exam(conn, &session.uid, &today, &req.params)
    };
    match result {
        Ok(result) => {
            state.changed.insert("exams");
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
    let student_id = get_opt_str(&req.params, "studentId");
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match list_exams_json(conn, &session.uid, student_id.as_deref()) {
        Ok(exams) => ok(&req.id, json!({ "exams": exams })),
        Err(e) => e.response(&req.id),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match require_session(state) {
        Ok(s) => s,
        Err(e) => return e.response(&req.id),
    };
    let exam_id = match get_required_str(&req.params, "examId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let result = {
        let Some(conn) = state.db.as_ref() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        conn.execute(
            "DELETE FROM exams WHERE id = ? AND created_by = ?",
            (&exam_id, &session.uid),
        )
        .map_err(|e| {
            tracing::error!(error = %e, "exam delete failed");
            HandlerErr::new("db_delete_failed", e.to_string())
        })
    };
    match result {
        Ok(0) => err(&req.id, "not_found", "exam record not found", None),
        Ok(_) => {
            state.changed.insert("exams");
            ok(&req.id, json!({ "examId": exam_id }))
        }
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.record" => Some(handle_record(state, req)),
        "exams.list" => Some(handle_list(state, req)),
        "exams.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}

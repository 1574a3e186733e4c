use std::collections::HashMap;

use crate::grades::{self, RankedStudent};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{query_failed, require_session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn overview(conn: &Connection, uid: &str, today: &str) -> Result<serde_json::Value, HandlerErr> {
    let total_students: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM students WHERE created_by = ?",
            [uid],
            |r| r.get(0),
        )
        .map_err(query_failed)?;
    let present_today: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM attendance
             WHERE created_by = ? AND date = ? AND status = 'Present'",
            (uid, today),
            |r| r.get(0),
        )
        .map_err(query_failed)?;

    let mut stmt = conn
        .prepare("SELECT student_id, percentage FROM exams WHERE created_by = ?")
        .map_err(query_failed)?;
    let exam_rows: Vec<(String, i64)> = stmt
        .query_map([uid], |r| Ok((r.get(0)?, r.get(1)?)))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_failed)?;
    let total_exams = exam_rows.len() as i64;

    let mut by_student: HashMap<String, Vec<i64>> = HashMap::new();
    let mut all: Vec<i64> = Vec::with_capacity(exam_rows.len());
    for (student_id, pct) in exam_rows {
        all.push(pct);
        by_student.entry(student_id).or_default().push(pct);
    }
    let average_score = if total_students == 0 {
        0
    } else {
        grades::average_percentage(&all)
    };

    // Roster order before sorting keeps ties ranked by insertion order.
    let mut roster = conn
        .prepare("SELECT id, name, class FROM students WHERE created_by = ? ORDER BY rowid")
        .map_err(query_failed)?;
    let ranked: Vec<RankedStudent> = roster
        .query_map([uid], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_failed)?
        .into_iter()
        .map(|(id, name, class)| {
            let percentages = by_student.get(&id).map(Vec::as_slice).unwrap_or(&[]);
            let average = grades::average_percentage(percentages);
            RankedStudent {
                student_id: id,
                name,
                class,
                average,
                // A student whose exams average to 0 reads the same as one
                // with no exams: display logic hides both from the top list.
                has_results: average > 0,
            }
        })
        .collect();
    let top_performers = grades::top_performers(ranked, 3);

    Ok(json!({
        "totalStudents": total_students,
        "presentToday": present_today,
        "totalExams": total_exams,
        "averageScore": average_score,
        "topPerformers": top_performers,
    }))
}

fn handle_overview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let session = match require_session(state) {
        Ok(s) => s,
        Err(e) => return e.response(&req.id),
    };
    let today = state.today.clone();
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match overview(conn, &session.uid, &today) {
        Ok(result) => ok(&req.id, result),
        Err(e) => e.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "dashboard.overview" => Some(handle_overview(state, req)),
        _ => None,
    }
}

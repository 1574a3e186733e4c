use std::fs;
use std::path::PathBuf;

use crate::grades;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_opt_str, get_required_str, query_failed, require_session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::report::{self, ExamRow, ReportModel};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

fn build_report_model(
    conn: &Connection,
    uid: &str,
    student_id: &str,
) -> Result<ReportModel, HandlerErr> {
    let student: Option<(String, String, String, String)> = conn
        .query_row(
            "SELECT name, class, email, phone FROM students WHERE id = ? AND created_by = ?",
            (student_id, uid),
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()
        .map_err(query_failed)?;
    let Some((name, class, email, phone)) = student else {
        return Err(HandlerErr::new("not_found", "student not found"));
    };

    let mut stmt = conn
        .prepare(
            "SELECT id, exam_name, subject, date, score, max_score, percentage, grade, notes
             FROM exams WHERE student_id = ? AND created_by = ? ORDER BY rowid",
        )
        .map_err(query_failed)?;
    let exams: Vec<ExamRow> = stmt
        .query_map((student_id, uid), |r| {
            Ok(ExamRow {
                exam_id: r.get(0)?,
                exam_name: r.get(1)?,
                subject: r.get(2)?,
                date: r.get(3)?,
                score: r.get(4)?,
                max_score: r.get(5)?,
                percentage: r.get(6)?,
                grade: r.get(7)?,
                notes: r.get(8)?,
            })
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_failed)?;

    let mut stmt = conn
        .prepare("SELECT status FROM attendance WHERE student_id = ? AND created_by = ?")
        .map_err(query_failed)?;
    let statuses: Vec<String> = stmt
        .query_map((student_id, uid), |r| r.get(0))
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_failed)?;
    let attendance = grades::attendance_summary(statuses.iter().map(String::as_str));

    let percentages: Vec<i64> = exams.iter().map(|e| e.percentage).collect();
    let average_score = grades::average_percentage(&percentages);

    Ok(ReportModel {
        student_id: student_id.to_string(),
        name,
        class,
        email,
        phone,
        average_score,
        attendance,
        exams,
        narrative: report::performance_narrative(average_score).to_string(),
    })
}

fn model_for_request(
    state: &AppState,
    req: &Request,
) -> Result<ReportModel, serde_json::Value> {
    let session = require_session(state).map_err(|e| e.response(&req.id))?;
    let student_id =
        get_required_str(&req.params, "studentId").map_err(|e| e.response(&req.id))?;
    let Some(conn) = state.db.as_ref() else {
        return Err(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    build_report_model(conn, &session.uid, &student_id).map_err(|e| e.response(&req.id))
}

fn generated_on() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M").to_string()
}

fn handle_student_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    match model_for_request(state, req) {
        Ok(model) => ok(&req.id, json!(model)),
        Err(resp) => resp,
    }
}

fn handle_print_html(state: &mut AppState, req: &Request) -> serde_json::Value {
    match model_for_request(state, req) {
        Ok(model) => {
            let html = report::render_html(&model, &generated_on(), true);
            ok(&req.id, json!({ "html": html }))
        }
        Err(resp) => resp,
    }
}

fn handle_export_html(state: &mut AppState, req: &Request) -> serde_json::Value {
    let model = match model_for_request(state, req) {
        Ok(model) => model,
        Err(resp) => return resp,
    };
    let out_dir = match get_opt_str(&req.params, "outDir") {
        Some(dir) => PathBuf::from(dir),
        None => match state.workspace.as_ref() {
            Some(ws) => ws.clone(),
            None => return err(&req.id, "no_workspace", "select a workspace first", None),
        },
    };
    let file_name = report::export_file_name(&model.name, &state.today);
    let path = out_dir.join(&file_name);
    let html = report::render_html(&model, &generated_on(), false);
    if let Err(e) = fs::write(&path, html) {
        tracing::error!(error = %e, path = %path.display(), "report write failed");
        return err(&req.id, "report_write_failed", e.to_string(), None);
    }
    ok(
        &req.id,
        json!({ "path": path.to_string_lossy(), "fileName": file_name }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.studentModel" => Some(handle_student_model(state, req)),
        "reports.printHtml" => Some(handle_print_html(state, req)),
        "reports.exportHtml" => Some(handle_export_html(state, req)),
        _ => None,
    }
}

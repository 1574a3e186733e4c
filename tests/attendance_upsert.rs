
use serde_json::json;
use test_support::{
    create_student, open_and_sign_up, request_err, request_ok, spawn_sidecar, temp_dir,
};

#[test]
fn remarking_today_overwrites_instead_of_duplicating() {
    let workspace = temp_dir("trackclass-attendance-upsert");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");
    let student_id = create_student(&mut stdin, &mut reader, "1", "Flip Flop", "10A");

    let first = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": student_id, "status": "Present" }),
    );
    assert_eq!(first.get("updated").and_then(|v| v.as_bool()), Some(false));
    let first_id = first
        .get("attendanceId")
        .and_then(|v| v.as_str())
        .expect("attendanceId")
        .to_string();

    let second = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.mark",
        json!({ "studentId": student_id, "status": "Absent" }),
    );
    assert_eq!(second.get("updated").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        second.get("attendanceId").and_then(|v| v.as_str()),
        Some(first_id.as_str()),
        "same day reuses the same record"
    );

    let listed = request_ok(&mut stdin, &mut reader, "4", "attendance.list", json!({}));
    let records = listed.get("records").and_then(|v| v.as_array()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].get("status").and_then(|v| v.as_str()),
        Some("Absent")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn today_lookup_reports_current_status_or_null() {
    let workspace = temp_dir("trackclass-attendance-today");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");
    let marked_id = create_student(&mut stdin, &mut reader, "1", "Marked", "10A");
    let unmarked_id = create_student(&mut stdin, &mut reader, "2", "Unmarked", "10A");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.mark",
        json!({ "studentId": marked_id, "status": "Present" }),
    );

    let marked = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.today",
        json!({ "studentId": marked_id }),
    );
    assert_eq!(
        marked.get("status").and_then(|v| v.as_str()),
        Some("Present")
    );
    let unmarked = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.today",
        json!({ "studentId": unmarked_id }),
    );
    assert!(unmarked.get("status").map(|v| v.is_null()).unwrap_or(false));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn mark_rejects_bad_status_and_unknown_student() {
    let workspace = temp_dir("trackclass-attendance-errors");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");
    let student_id = create_student(&mut stdin, &mut reader, "1", "Real Kid", "10A");

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "2",
            "attendance.mark",
            json!({ "studentId": student_id, "status": "Late" }),
        ),
        "bad_params"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "3",
            "attendance.mark",
            json!({ "studentId": "ghost", "status": "Present" }),
        ),
        "not_found"
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

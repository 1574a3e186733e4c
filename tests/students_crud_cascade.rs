
use serde_json::json;
use test_support::{
    create_student, open_and_sign_up, request_err, request_ok, spawn_sidecar, temp_dir,
};

#[test]
fn create_requires_every_profile_field() {
    let workspace = temp_dir("trackclass-students-validation");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "1",
            "students.create",
            json!({ "name": "No Contact", "class": "10A" }),
        ),
        "bad_params"
    );
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "2",
            "students.create",
            json!({ "name": "   ", "class": "10A", "email": "x@y.test", "phone": "1" }),
        ),
        "bad_params",
        "whitespace-only fields count as empty"
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn list_filters_by_case_insensitive_search() {
    let workspace = temp_dir("trackclass-students-search");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");

    let _ = create_student(&mut stdin, &mut reader, "1", "Ada Lovelace", "10A");
    let _ = create_student(&mut stdin, &mut reader, "2", "Alan Turing", "10B");
    let _ = create_student(&mut stdin, &mut reader, "3", "Kurt Godel", "11A");

    let all = request_ok(&mut stdin, &mut reader, "4", "students.list", json!({}));
    assert_eq!(
        all.get("students").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(3)
    );

    let by_name = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "students.list",
        json!({ "search": "lovelace" }),
    );
    let rows = by_name
        .get("students")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("name").and_then(|v| v.as_str()),
        Some("Ada Lovelace")
    );

    let by_class = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.list",
        json!({ "search": "10" }),
    );
    assert_eq!(
        by_class
            .get("students")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(2),
        "class field participates in search"
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn update_rewrites_profile_but_not_denormalized_history() {
    let workspace = temp_dir("trackclass-students-update");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");

    let student_id = create_student(&mut stdin, &mut reader, "1", "Old Name", "10A");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "attendance.mark",
        json!({ "studentId": student_id, "status": "Present" }),
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.update",
        json!({
            "studentId": student_id,
            "name": "New Name",
            "class": "10A",
            "email": "new@school.test",
            "phone": "555-0102"
        }),
    );

    let students = request_ok(&mut stdin, &mut reader, "4", "students.list", json!({}));
    let row = &students.get("students").and_then(|v| v.as_array()).unwrap()[0];
    assert_eq!(row.get("name").and_then(|v| v.as_str()), Some("New Name"));

    // The attendance row keeps the name it was written with.
    let attendance = request_ok(&mut stdin, &mut reader, "5", "attendance.list", json!({}));
    let record = &attendance.get("records").and_then(|v| v.as_array()).unwrap()[0];
    assert_eq!(record.get("name").and_then(|v| v.as_str()), Some("Old Name"));

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "6",
            "students.update",
            json!({
                "studentId": "missing-id",
                "name": "X",
                "class": "X",
                "email": "x@y.test",
                "phone": "1"
            }),
        ),
        "not_found"
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn delete_cascades_to_exams_and_attendance() {
    let workspace = temp_dir("trackclass-students-cascade");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");

    let student_id = create_student(&mut stdin, &mut reader, "1", "Doomed Kid", "10A");
    let keeper_id = create_student(&mut stdin, &mut reader, "2", "Kept Kid", "10A");

    for (id, exam) in [("3", "Quiz 1"), ("4", "Quiz 2")] {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            id,
            "exams.record",
            json!({
                "studentId": student_id,
                "examName": exam,
                "subject": "Math",
                "score": 10,
                "maxScore": 20
            }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "exams.record",
        json!({
            "studentId": keeper_id,
            "examName": "Quiz 1",
            "subject": "Math",
            "score": 15,
            "maxScore": 20
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.mark",
        json!({ "studentId": student_id, "status": "Absent" }),
    );

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "students.delete",
        json!({ "studentId": student_id }),
    );
    assert_eq!(deleted.get("deletedExams").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(
        deleted.get("deletedAttendance").and_then(|v| v.as_u64()),
        Some(1)
    );

    let exams = request_ok(&mut stdin, &mut reader, "8", "exams.list", json!({}));
    let remaining = exams.get("exams").and_then(|v| v.as_array()).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(
        remaining[0].get("studentId").and_then(|v| v.as_str()),
        Some(keeper_id.as_str()),
        "other students' exams survive the cascade"
    );
    let attendance = request_ok(&mut stdin, &mut reader, "9", "attendance.list", json!({}));
    assert_eq!(
        attendance
            .get("records")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(0)
    );

    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "10",
            "students.delete",
            json!({ "studentId": student_id }),
        ),
        "not_found",
        "second delete of the same student"
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

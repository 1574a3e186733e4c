
use serde_json::json;
use test_support::{open_and_sign_up, read_line, request_ok, spawn_sidecar, temp_dir};

#[test]
fn mutations_emit_full_list_snapshots_for_subscribed_collections() {
    let workspace = temp_dir("trackclass-watch-snapshots");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");

    let subscribed = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "watch.subscribe",
        json!({ "collections": ["students", "attendance"] }),
    );
    assert_eq!(
        subscribed.get("watched").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );

    // Response first, snapshot line right after it.
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "students.create",
        json!({ "name": "Watched Kid", "class": "10A", "email": "w@x.test", "phone": "1" }),
    );
    let student_id = created
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();
    let event = read_line(&mut reader);
    assert_eq!(event.get("event").and_then(|v| v.as_str()), Some("snapshot"));
    assert_eq!(
        event.get("collection").and_then(|v| v.as_str()),
        Some("students")
    );
    let rows = event.get("rows").and_then(|v| v.as_array()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("name").and_then(|v| v.as_str()),
        Some("Watched Kid")
    );

    // Exams are not subscribed, so recording one emits no event; the next
    // response line belongs to the next request.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "exams.record",
        json!({
            "studentId": student_id,
            "examName": "Quiz",
            "subject": "Math",
            "score": 10,
            "maxScore": 20
        }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "4", "health", json!({}));

    // Attendance is subscribed.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.mark",
        json!({ "studentId": student_id, "status": "Present" }),
    );
    let event = read_line(&mut reader);
    assert_eq!(
        event.get("collection").and_then(|v| v.as_str()),
        Some("attendance")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn delete_snapshots_every_affected_collection_in_order() {
    let workspace = temp_dir("trackclass-watch-delete");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "students.create",
        json!({ "name": "Doomed", "class": "10A", "email": "d@x.test", "phone": "1" }),
    );
    let student_id = created
        .get("studentId")
        .and_then(|v| v.as_str())
        .expect("studentId")
        .to_string();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "exams.record",
        json!({
            "studentId": student_id,
            "examName": "Quiz",
            "subject": "Math",
            "score": 10,
            "maxScore": 20
        }),
    );

    // Subscribe to everything after seeding so no events interleave above.
    let _ = request_ok(&mut stdin, &mut reader, "3", "watch.subscribe", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.delete",
        json!({ "studentId": student_id }),
    );
    // Changed collections snapshot in a fixed alphabetical order.
    let mut seen = Vec::new();
    for _ in 0..3 {
        let event = read_line(&mut reader);
        assert_eq!(event.get("event").and_then(|v| v.as_str()), Some("snapshot"));
        seen.push(
            event
                .get("collection")
                .and_then(|v| v.as_str())
                .unwrap()
                .to_string(),
        );
        assert_eq!(
            event.get("rows").and_then(|v| v.as_array()).map(|a| a.len()),
            Some(0)
        );
    }
    assert_eq!(seen, vec!["attendance", "exams", "students"]);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn sign_out_tears_down_subscriptions() {
    let workspace = temp_dir("trackclass-watch-signout");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    open_and_sign_up(&mut stdin, &mut reader, &workspace, "t@school.test");

    let _ = request_ok(&mut stdin, &mut reader, "1", "watch.subscribe", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "2", "auth.signOut", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "auth.signIn",
        json!({ "email": "t@school.test", "password": "secret123" }),
    );

    // No subscription survives the sign-out, so this mutation emits no
    // snapshot line and the next line answers the next request.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.create",
        json!({ "name": "Quiet Kid", "class": "10A", "email": "q@x.test", "phone": "1" }),
    );
    let health = request_ok(&mut stdin, &mut reader, "5", "health", json!({}));
    assert!(health.get("today").is_some());

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

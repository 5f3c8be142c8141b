mod test_support;

use serde_json::json;
use test_support::{request_err_code, request_ok, spawn_sidecar, temp_dir};

#[test]
fn batch_enter_reports_per_item_errors_and_keeps_successes() {
    let workspace = temp_dir("gradebook-batch-enter");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );

    let course_id = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.create",
        json!({ "courseCode": "CS101", "courseName": "Programming", "maxStudents": 10 }),
    )
    .get("courseId")
    .and_then(|v| v.as_i64())
    .expect("courseId");

    let mut record_ids = Vec::new();
    for i in 0..3 {
        let sid = request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "students.create",
            json!({ "studentNo": format!("S{:03}", i), "name": format!("Student {}", i) }),
        )
        .get("studentId")
        .and_then(|v| v.as_i64())
        .expect("studentId");
        let rec = request_ok(
            &mut stdin,
            &mut reader,
            &format!("e{}", i),
            "enrollment.select",
            json!({ "studentId": sid, "courseId": course_id }),
        );
        record_ids.push(rec.get("id").and_then(|v| v.as_i64()).expect("id"));
    }

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.batchEnter",
        json!({
            "items": [
                { "id": record_ids[0], "usualScore": 90, "midtermScore": 90, "finalScore": 90 },
                { "usualScore": 50, "midtermScore": 50, "finalScore": 50 },
                { "id": record_ids[1], "usualScore": "abc", "midtermScore": 1, "finalScore": 1 },
                "not-an-object",
                { "id": record_ids[2], "usualScore": 120, "midtermScore": 1, "finalScore": 1 },
                { "id": 99999, "usualScore": 1, "midtermScore": 1, "finalScore": 1 },
                { "id": record_ids[1], "usualScore": 61, "midtermScore": 61, "finalScore": 61 }
            ]
        }),
    );
    assert_eq!(res.get("updated").and_then(|v| v.as_u64()), Some(2));
    assert_eq!(res.get("skipped").and_then(|v| v.as_u64()), Some(1));
    let errors = res.get("errors").and_then(|v| v.as_array()).expect("errors");
    let summary: Vec<(i64, &str)> = errors
        .iter()
        .map(|e| {
            (
                e.get("index").and_then(|v| v.as_i64()).expect("index"),
                e.get("code").and_then(|v| v.as_str()).expect("code"),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![
            (2, "bad_params"),
            (3, "bad_params"),
            (4, "invalid_score"),
            (5, "not_found"),
        ]
    );

    let first = request_ok(&mut stdin, &mut reader, "4", "grades.get", json!({ "id": record_ids[0] }));
    assert_eq!(first.get("totalScore").and_then(|v| v.as_f64()), Some(90.0));
    let second = request_ok(&mut stdin, &mut reader, "5", "grades.get", json!({ "id": record_ids[1] }));
    assert_eq!(second.get("totalScore").and_then(|v| v.as_f64()), Some(61.0));
    let third = request_ok(&mut stdin, &mut reader, "6", "grades.get", json!({ "id": record_ids[2] }));
    assert!(third.get("totalScore").map(|v| v.is_null()).unwrap_or(false));

    assert_eq!(
        request_err_code(&mut stdin, &mut reader, "7", "grades.batchEnter", json!({})),
        "bad_params"
    );

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn oversized_batch_is_rejected_whole() {
    let workspace = temp_dir("gradebook-batch-limit");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );

    let items: Vec<serde_json::Value> = (0..5_001)
        .map(|_| json!({ "usualScore": 1, "midtermScore": 1, "finalScore": 1 }))
        .collect();
    let res = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "grades.batchEnter",
        json!({ "items": items }),
    );
    assert_eq!(res.get("limitExceeded").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(res.get("updated").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(res.get("rejected").and_then(|v| v.as_u64()), Some(5_001));

    drop(stdin);
    let _ = child.wait();
}

#[test]
fn non_string_remark_is_bad_params() {
    let workspace = temp_dir("gradebook-remark-type");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let course_id = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "courses.create",
        json!({ "courseCode": "MA201", "courseName": "Algebra", "maxStudents": 5 }),
    )
    .get("courseId")
    .and_then(|v| v.as_i64())
    .expect("courseId");
    let student_id = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "students.create",
        json!({ "studentNo": "S900", "name": "Remark Tester" }),
    )
    .get("studentId")
    .and_then(|v| v.as_i64())
    .expect("studentId");
    let record_id = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "enrollment.select",
        json!({ "studentId": student_id, "courseId": course_id }),
    )
    .get("id")
    .and_then(|v| v.as_i64())
    .expect("id");

    assert_eq!(
        request_err_code(
            &mut stdin,
            &mut reader,
            "5",
            "grades.enter",
            json!({
                "id": record_id,
                "usualScore": 80,
                "midtermScore": 80,
                "finalScore": 80,
                "remark": 5
            }),
        ),
        "bad_params"
    );

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.batchEnter",
        json!({
            "items": [
                { "id": record_id, "usualScore": 70, "midtermScore": 70, "finalScore": 70, "remark": ["x"] }
            ]
        }),
    );
    assert_eq!(res.get("updated").and_then(|v| v.as_u64()), Some(0));
    let errors = res.get("errors").and_then(|v| v.as_array()).expect("errors");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].get("code").and_then(|v| v.as_str()), Some("bad_params"));
    assert_eq!(errors[0].get("id").and_then(|v| v.as_i64()), Some(record_id));

    // Neither refused request touched the record.
    let view = request_ok(&mut stdin, &mut reader, "7", "grades.get", json!({ "id": record_id }));
    assert!(view.get("totalScore").map(|v| v.is_null()).unwrap_or(false));

    let entered = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "grades.enter",
        json!({
            "id": record_id,
            "usualScore": 80,
            "midtermScore": 80,
            "finalScore": 80,
            "remark": null
        }),
    );
    assert_eq!(entered.get("totalScore").and_then(|v| v.as_f64()), Some(80.0));

    drop(stdin);
    let _ = child.wait();
}

mod test_support;

use serde_json::json;
use test_support::{request_err_code, request_ok, spawn_sidecar, temp_dir};

#[test]
fn list_pages_filters_and_orders_newest_first() {
    let workspace = temp_dir("gradebook-grades-list");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );

    let mut course_ids = Vec::new();
    for (code, semester) in [("CS101", "2024-2025-1"), ("CS102", "2024-2025-2")] {
        let cid = request_ok(
            &mut stdin,
            &mut reader,
            &format!("c-{}", code),
            "courses.create",
            json!({
                "courseCode": code,
                "courseName": format!("Course {}", code),
                "semester": semester,
                "maxStudents": 10
            }),
        )
        .get("courseId")
        .and_then(|v| v.as_i64())
        .expect("courseId");
        course_ids.push(cid);
    }

    let mut student_ids = Vec::new();
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
        student_ids.push(sid);
    }

    // 3 students in the first course, 1 in the second: 4 records total.
    let mut n = 0;
    for &sid in &student_ids {
        n += 1;
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("e{}", n),
            "enrollment.select",
            json!({ "studentId": sid, "courseId": course_ids[0] }),
        );
    }
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "e-last",
        "enrollment.select",
        json!({ "studentId": student_ids[0], "courseId": course_ids[1] }),
    );

    let page1 = request_ok(&mut stdin, &mut reader, "2", "grades.list", json!({ "size": 3 }));
    assert_eq!(page1.get("total").and_then(|v| v.as_i64()), Some(4));
    assert_eq!(page1.get("page").and_then(|v| v.as_i64()), Some(1));
    let records = page1.get("records").and_then(|v| v.as_array()).expect("records");
    assert_eq!(records.len(), 3);
    // newest first
    assert_eq!(
        records[0].get("courseId").and_then(|v| v.as_i64()),
        Some(course_ids[1])
    );

    let page2 = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "grades.list",
        json!({ "page": 2, "size": 3 }),
    );
    assert_eq!(
        page2.get("records").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    let by_semester = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "grades.list",
        json!({ "semester": "2024-2025-2" }),
    );
    assert_eq!(by_semester.get("total").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(by_semester.get("size").and_then(|v| v.as_i64()), Some(10));

    let by_student = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "grades.listByStudent",
        json!({ "studentId": student_ids[0] }),
    );
    assert_eq!(
        by_student.get("records").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(2)
    );
    let by_course = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "grades.listByCourse",
        json!({ "courseId": course_ids[0] }),
    );
    assert_eq!(
        by_course.get("records").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(3)
    );

    let course = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "courses.get",
        json!({ "courseId": course_ids[0] }),
    );
    assert_eq!(course.get("currentStudents").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(course.get("maxStudents").and_then(|v| v.as_i64()), Some(10));

    assert_eq!(
        request_err_code(&mut stdin, &mut reader, "8", "grades.list", json!({ "page": 0 })),
        "bad_params"
    );
    assert_eq!(
        request_err_code(&mut stdin, &mut reader, "9", "grades.list", json!({ "size": 501 })),
        "bad_params"
    );
    assert_eq!(
        request_err_code(
            &mut stdin,
            &mut reader,
            "10",
            "courses.create",
            json!({ "courseCode": "CS101", "courseName": "Dup", "maxStudents": 5 }),
        ),
        "bad_params"
    );
    assert_eq!(
        request_err_code(
            &mut stdin,
            &mut reader,
            "11",
            "courses.create",
            json!({ "courseCode": "CS999", "courseName": "None", "maxStudents": 0 }),
        ),
        "bad_params"
    );
    assert_eq!(
        request_err_code(&mut stdin, &mut reader, "12", "grades.get", json!({ "id": 424242 })),
        "not_found"
    );

    drop(stdin);
    let _ = child.wait();
}

mod test_support;

use gradebookd::model::GradeStatus;
use gradebookd::{EnrollmentManager, EnrollmentStore, GradeRecorder, SqliteStore};
use test_support::{add_course, add_student, d, store};

fn current_students(store: &SqliteStore, course_id: i64) -> i64 {
    store
        .find_course(course_id)
        .expect("find course")
        .expect("course exists")
        .current_students
}

fn assert_capacity_consistent(store: &SqliteStore, course_id: i64) {
    let course = store.find_course(course_id).expect("find").expect("exists");
    let records = store.count_records_for_course(course_id).expect("count");
    assert_eq!(course.current_students, records);
    assert!(course.current_students <= course.max_students);
}

#[test]
fn enroll_then_drop_restores_the_seat() {
    let store = store();
    let student = add_student(&store, "S001");
    let course = add_course(&store, "CS101", 2);
    let manager = EnrollmentManager::new(&store);

    let rec = manager.select(student, course).expect("select");
    assert_eq!(rec.status, GradeStatus::Enrolled);
    assert_eq!(rec.student_id, student);
    assert_eq!(rec.course_id, course);
    assert_eq!(rec.semester.as_deref(), Some("2024-2025-1"));
    assert!(rec.usual_score.is_none() && rec.total_score.is_none() && rec.gpa.is_none());
    assert_eq!(current_students(&store, course), 1);

    manager.drop(student, course).expect("drop");
    assert!(store.find_record(student, course).expect("find").is_none());
    assert_eq!(current_students(&store, course), 0);
    assert_capacity_consistent(&store, course);
}

#[test]
fn full_course_refuses_and_keeps_count() {
    let store = store();
    let first = add_student(&store, "S001");
    let second = add_student(&store, "S002");
    let course = add_course(&store, "CS101", 1);
    let manager = EnrollmentManager::new(&store);

    manager.select(first, course).expect("first select");
    let err = manager.select(second, course).expect_err("course full");
    assert_eq!(err.code(), "course_full");
    assert_eq!(current_students(&store, course), 1);
    assert_capacity_consistent(&store, course);
}

#[test]
fn duplicate_select_is_already_enrolled() {
    let store = store();
    let student = add_student(&store, "S001");
    let course = add_course(&store, "CS101", 5);
    let manager = EnrollmentManager::new(&store);

    manager.select(student, course).expect("select");
    let err = manager.select(student, course).expect_err("duplicate");
    assert_eq!(err.code(), "already_enrolled");
    assert_eq!(current_students(&store, course), 1);
}

#[test]
fn unknown_student_or_course_is_not_found() {
    let store = store();
    let student = add_student(&store, "S001");
    let course = add_course(&store, "CS101", 5);
    let manager = EnrollmentManager::new(&store);

    assert_eq!(manager.select(404, course).expect_err("student").code(), "not_found");
    assert_eq!(manager.select(student, 404).expect_err("course").code(), "not_found");
    assert_eq!(manager.drop(student, course).expect_err("no record").code(), "not_found");
    assert_eq!(current_students(&store, course), 0);
}

#[test]
fn confirmed_grade_pins_the_enrollment() {
    let store = store();
    let student = add_student(&store, "S001");
    let course = add_course(&store, "CS101", 5);
    let manager = EnrollmentManager::new(&store);
    let recorder = GradeRecorder::new(&store);

    let rec = manager.select(student, course).expect("select");
    recorder
        .enter(rec.id, Some(d("80")), Some(d("70")), Some(d("90")), None)
        .expect("enter");
    recorder.confirm(rec.id).expect("confirm");

    let err = manager.drop(student, course).expect_err("confirmed");
    assert_eq!(err.code(), "grade_confirmed");
    assert!(store.find_record(student, course).expect("find").is_some());
    assert_eq!(current_students(&store, course), 1);
}

#[test]
fn seats_reopen_after_drop() {
    let store = store();
    let course = add_course(&store, "CS101", 2);
    let students: Vec<i64> = (0..3).map(|i| add_student(&store, &format!("S{i}"))).collect();
    let manager = EnrollmentManager::new(&store);

    manager.select(students[0], course).expect("s0");
    manager.select(students[1], course).expect("s1");
    assert_eq!(manager.select(students[2], course).expect_err("full").code(), "course_full");
    assert!(store.available_courses().expect("available").is_empty());

    manager.drop(students[0], course).expect("drop s0");
    manager.select(students[2], course).expect("s2 takes the seat");
    assert_capacity_consistent(&store, course);
}

#[test]
fn drop_and_delete_never_double_decrement() {
    let store = store();
    let a = add_student(&store, "S001");
    let b = add_student(&store, "S002");
    let course = add_course(&store, "CS101", 5);
    let manager = EnrollmentManager::new(&store);
    let recorder = GradeRecorder::new(&store);

    let rec_a = manager.select(a, course).expect("a");
    manager.select(b, course).expect("b");

    recorder.delete(rec_a.id).expect("delete");
    assert_eq!(manager.drop(a, course).expect_err("already gone").code(), "not_found");
    assert_eq!(recorder.delete(rec_a.id).expect_err("gone").code(), "not_found");
    assert_eq!(current_students(&store, course), 1);
    assert_capacity_consistent(&store, course);
}

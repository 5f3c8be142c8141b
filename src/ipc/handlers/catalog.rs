use crate::ipc::error::{err, grade_err, ok, ok_field, ok_value};
use crate::ipc::params;
use crate::ipc::types::{AppState, Request};
use crate::model::{NewCourse, NewStudent};
use crate::store::EnrollmentStore;
use serde_json::json;

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_no = match params::required_str(req, "studentNo") {
        Ok(v) => v.to_string(),
        Err(resp) => return resp,
    };
    let name = match params::required_str(req, "name") {
        Ok(v) => v.to_string(),
        Err(resp) => return resp,
    };

    match store.create_student(&NewStudent { student_no, name }) {
        Ok(s) => ok(&req.id, json!({ "studentId": s.id })),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match params::required_i64(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match store.find_student(student_id) {
        Ok(Some(s)) => ok_value(&req.id, &s),
        Ok(None) => err(
            &req.id,
            "not_found",
            format!("student not found: {student_id}"),
            Some(json!({ "studentId": student_id })),
        ),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let course_code = match params::required_str(req, "courseCode") {
        Ok(v) => v.to_string(),
        Err(resp) => return resp,
    };
    let course_name = match params::required_str(req, "courseName") {
        Ok(v) => v.to_string(),
        Err(resp) => return resp,
    };
    let max_students = match params::required_i64(req, "maxStudents") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let credit = match req.params.get("credit") {
        None | Some(serde_json::Value::Null) => None,
        Some(v) => match params::decimal_of(v) {
            Some(d) if d >= rust_decimal::Decimal::ZERO => Some(d),
            _ => return err(&req.id, "bad_params", "credit must be a non-negative number", None),
        },
    };

    let course = NewCourse {
        course_code,
        course_name,
        credit,
        semester: params::optional_str(req, "semester"),
        max_students,
    };
    match store.create_course(&course) {
        Ok(c) => ok(&req.id, json!({ "courseId": c.id })),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_courses_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let course_id = match params::required_i64(req, "courseId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match store.find_course(course_id) {
        Ok(Some(c)) => ok_value(&req.id, &c),
        Ok(None) => err(
            &req.id,
            "not_found",
            format!("course not found: {course_id}"),
            Some(json!({ "courseId": course_id })),
        ),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_courses_available(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match store.available_courses() {
        Ok(courses) => ok_field(&req.id, "courses", &courses),
        Err(e) => grade_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.create" => Some(handle_students_create(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.get" => Some(handle_courses_get(state, req)),
        "courses.available" => Some(handle_courses_available(state, req)),
        _ => None,
    }
}

use crate::enrollment::EnrollmentManager;
use crate::ipc::error::{err, grade_err, ok, ok_value};
use crate::ipc::params;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn student_and_course(req: &Request) -> Result<(i64, i64), serde_json::Value> {
    let student_id = params::required_i64(req, "studentId")?;
    let course_id = params::required_i64(req, "courseId")?;
    Ok((student_id, course_id))
}

fn handle_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (student_id, course_id) = match student_and_course(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match EnrollmentManager::new(store.as_ref()).select(student_id, course_id) {
        Ok(rec) => ok_value(&req.id, &rec),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_drop(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (student_id, course_id) = match student_and_course(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match EnrollmentManager::new(store.as_ref()).drop(student_id, course_id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => grade_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "enrollment.select" => Some(handle_select(state, req)),
        "enrollment.drop" => Some(handle_drop(state, req)),
        _ => None,
    }
}

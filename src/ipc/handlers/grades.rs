use crate::ipc::error::{err, grade_err, ok, ok_field, ok_value};
use crate::ipc::params;
use crate::ipc::types::{AppState, Request};
use crate::model::{GradeFilter, ScoreEntry};
use crate::recorder::GradeRecorder;
use serde_json::json;

const BATCH_ENTER_MAX_ITEMS: usize = 5_000;
const LIST_MAX_PAGE_SIZE: i64 = 500;

/// Scores and remark of one entry object. The record id is read separately
/// since `grades.enter` requires it and `grades.batchEnter` tolerates its
/// absence.
fn parse_scores(
    obj: &serde_json::Map<String, serde_json::Value>,
) -> Result<ScoreEntry, String> {
    let remark = match obj.get("remark") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(_) => return Err("remark must be a string".to_string()),
    };
    Ok(ScoreEntry {
        record_id: None,
        usual_score: params::optional_decimal(obj, "usualScore")?,
        midterm_score: params::optional_decimal(obj, "midtermScore")?,
        final_score: params::optional_decimal(obj, "finalScore")?,
        remark,
    })
}

fn handle_enter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match params::required_i64(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(obj) = req.params.as_object() else {
        return err(&req.id, "bad_params", "params must be an object", None);
    };
    let entry = match parse_scores(obj) {
        Ok(v) => v,
        Err(msg) => return err(&req.id, "bad_params", msg, None),
    };

    let recorder = GradeRecorder::new(store.as_ref());
    match recorder.enter(
        id,
        entry.usual_score,
        entry.midterm_score,
        entry.final_score,
        entry.remark.as_deref(),
    ) {
        Ok(rec) => ok_value(&req.id, &rec),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_batch_enter(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(items) = req.params.get("items").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing items[]", None);
    };

    if items.len() > BATCH_ENTER_MAX_ITEMS {
        let rejected = items.len();
        return ok(
            &req.id,
            json!({
                "updated": 0,
                "skipped": 0,
                "rejected": rejected,
                "limitExceeded": true,
                "errors": [{
                    "index": -1,
                    "code": "too_many_items",
                    "message": format!(
                        "batch exceeds max items: {} > {}",
                        rejected, BATCH_ENTER_MAX_ITEMS
                    )
                }]
            }),
        );
    }

    let mut errors: Vec<serde_json::Value> = Vec::new();
    let mut positions: Vec<usize> = Vec::with_capacity(items.len());
    let mut entries: Vec<ScoreEntry> = Vec::with_capacity(items.len());

    for (i, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            errors.push(json!({
                "index": i,
                "code": "bad_params",
                "message": format!("item at index {} must be an object", i),
            }));
            continue;
        };
        let record_id = match obj.get("id") {
            None | Some(serde_json::Value::Null) => None,
            Some(v) => match v.as_i64() {
                Some(id) => Some(id),
                None => {
                    errors.push(json!({
                        "index": i,
                        "code": "bad_params",
                        "message": format!("item at index {} has an invalid id", i),
                    }));
                    continue;
                }
            },
        };
        match parse_scores(obj) {
            Ok(entry) => {
                positions.push(i);
                entries.push(ScoreEntry { record_id, ..entry });
            }
            Err(msg) => errors.push(json!({
                "index": i,
                "id": record_id,
                "code": "bad_params",
                "message": msg,
            })),
        }
    }

    let report = GradeRecorder::new(store.as_ref()).batch_enter_report(&entries);
    for f in &report.failures {
        errors.push(json!({
            "index": positions.get(f.index).copied().unwrap_or(f.index),
            "id": f.record_id,
            "code": f.error.code(),
            "message": f.error.to_string(),
        }));
    }
    errors.sort_by_key(|e| e.get("index").and_then(|v| v.as_i64()).unwrap_or(-1));

    ok(
        &req.id,
        json!({
            "updated": report.updated,
            "skipped": report.skipped,
            "rejected": errors.len(),
            "errors": errors,
        }),
    )
}

fn handle_confirm(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match params::required_i64(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match GradeRecorder::new(store.as_ref()).confirm(id) {
        Ok(rec) => ok_value(&req.id, &rec),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match params::required_i64(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match GradeRecorder::new(store.as_ref()).delete(id) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match params::required_i64(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match store.grade_view(id) {
        Ok(Some(view)) => ok_value(&req.id, &view),
        Ok(None) => err(
            &req.id,
            "not_found",
            format!("grade record not found: {id}"),
            Some(json!({ "id": id })),
        ),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_list_by(state: &mut AppState, req: &Request, key: &str) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match params::required_i64(req, key) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let filter = if key == "studentId" {
        GradeFilter {
            student_id: Some(id),
            ..GradeFilter::default()
        }
    } else {
        GradeFilter {
            course_id: Some(id),
            ..GradeFilter::default()
        }
    };

    match store.list_views(&filter) {
        Ok(records) => ok_field(&req.id, "records", &records),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let page = match params::optional_i64(req, "page") {
        Ok(v) => v.unwrap_or(1),
        Err(resp) => return resp,
    };
    let size = match params::optional_i64(req, "size") {
        Ok(v) => v.unwrap_or(10),
        Err(resp) => return resp,
    };
    if size > LIST_MAX_PAGE_SIZE {
        return err(
            &req.id,
            "bad_params",
            format!("size must be <= {}", LIST_MAX_PAGE_SIZE),
            None,
        );
    }
    let student_id = match params::optional_i64(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let course_id = match params::optional_i64(req, "courseId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let filter = GradeFilter {
        student_id,
        course_id,
        semester: params::optional_str(req, "semester"),
    };

    match store.list_page(&filter, page, size) {
        Ok(p) => ok_value(&req.id, &p),
        Err(e) => grade_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grades.enter" => Some(handle_enter(state, req)),
        "grades.batchEnter" => Some(handle_batch_enter(state, req)),
        "grades.confirm" => Some(handle_confirm(state, req)),
        "grades.delete" => Some(handle_delete(state, req)),
        "grades.get" => Some(handle_get(state, req)),
        "grades.list" => Some(handle_list(state, req)),
        "grades.listByStudent" => Some(handle_list_by(state, req, "studentId")),
        "grades.listByCourse" => Some(handle_list_by(state, req, "courseId")),
        _ => None,
    }
}

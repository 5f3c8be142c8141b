use crate::analytics::GradeAnalytics;
use crate::ipc::error::{err, grade_err, ok, ok_value};
use crate::ipc::params;
use crate::ipc::types::{AppState, Request};
use crate::model::{BandCount, CourseId};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DistributionResult {
    course_id: CourseId,
    total: i64,
    distribution: Vec<BandCount>,
}

fn decimal_json(v: Option<Decimal>) -> serde_json::Value {
    v.and_then(|d| d.to_f64())
        .map(|f| json!(f))
        .unwrap_or(serde_json::Value::Null)
}

fn handle_average(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let analytics = GradeAnalytics::new(store.as_ref());

    let (key, result, field) = match req.method.as_str() {
        "analytics.studentAverage" => match params::required_i64(req, "studentId") {
            Ok(id) => ("studentId", analytics.average_score(id).map(|v| (id, v)), "averageScore"),
            Err(resp) => return resp,
        },
        "analytics.studentGpa" => match params::required_i64(req, "studentId") {
            Ok(id) => ("studentId", analytics.average_gpa(id).map(|v| (id, v)), "averageGpa"),
            Err(resp) => return resp,
        },
        _ => match params::required_i64(req, "courseId") {
            Ok(id) => ("courseId", analytics.course_average(id).map(|v| (id, v)), "averageScore"),
            Err(resp) => return resp,
        },
    };

    match result {
        Ok((id, value)) => {
            let mut obj = serde_json::Map::new();
            obj.insert(key.to_string(), json!(id));
            obj.insert(field.to_string(), decimal_json(value));
            ok(&req.id, serde_json::Value::Object(obj))
        }
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_scores_by_course(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let student_id = match params::required_i64(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match GradeAnalytics::new(store.as_ref()).scores_by_course(student_id) {
        Ok(rows) => {
            let courses: Vec<serde_json::Value> = rows
                .into_iter()
                .map(|r| {
                    json!({
                        "courseName": r.course_name,
                        "averageScore": decimal_json(Some(r.average_score)),
                    })
                })
                .collect();
            ok(&req.id, json!({ "studentId": student_id, "courses": courses }))
        }
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_distribution(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let course_id = match params::required_i64(req, "courseId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match GradeAnalytics::new(store.as_ref()).score_distribution(course_id) {
        Ok(d) => ok_value(
            &req.id,
            &DistributionResult {
                course_id,
                total: d.total(),
                distribution: d.entries(),
            },
        ),
        Err(e) => grade_err(&req.id, &e),
    }
}

fn handle_pass_fail(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let course_id = match params::required_i64(req, "courseId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match GradeAnalytics::new(store.as_ref()).pass_fail(course_id) {
        Ok(pf) => ok(
            &req.id,
            json!({ "courseId": course_id, "passed": pf.passed, "failed": pf.failed }),
        ),
        Err(e) => grade_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.studentAverage" | "analytics.studentGpa" | "analytics.courseAverage" => {
            Some(handle_average(state, req))
        }
        "analytics.scoresByCourse" => Some(handle_scores_by_course(state, req)),
        "analytics.distribution" => Some(handle_distribution(state, req)),
        "analytics.passFail" => Some(handle_pass_fail(state, req)),
        _ => None,
    }
}

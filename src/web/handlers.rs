//! HTTP request handlers for the agent's log endpoint.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::domain::repositories::ProcessSupervisor;

const DEFAULT_LOG_LINES: usize = 20;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub job: String,
    /// Kept as a raw string: a missing or unparseable count falls back to
    /// the default instead of failing the request.
    pub count: Option<String>,
}

/// `GET /logs?job=<id>&count=<n>`
///
/// Returns the last `count` log lines of the job's unit as plain text.
/// An empty `job` is a 400. Any supervisor failure, including a unit this
/// node does not own, is reported as 404.
pub async fn get_logs(
    query: web::Query<LogsQuery>,
    supervisor: web::Data<Arc<dyn ProcessSupervisor>>,
) -> HttpResponse {
    if query.job.is_empty() {
        return HttpResponse::BadRequest().body("no job specified");
    }

    let count = query
        .count
        .as_deref()
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(DEFAULT_LOG_LINES);

    match supervisor.get_logs(&query.job, count).await {
        Ok(logs) => HttpResponse::Ok().content_type("text/plain").body(logs),
        Err(_) => HttpResponse::NotFound().body(format!("job not found: {}", query.job)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use mockall::predicate::eq;

    use crate::domain::errors::ClusterError;
    use crate::domain::repositories::MockProcessSupervisor;

    async fn respond(supervisor: MockProcessSupervisor, uri: &str) -> (StatusCode, String) {
        let supervisor: Arc<dyn ProcessSupervisor> = Arc::new(supervisor);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(supervisor))
                .route("/logs", web::get().to(get_logs)),
        )
        .await;
        let response = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = response.status();
        let body = test::read_body(response).await;
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[actix_web::test]
    async fn missing_job_is_a_bad_request() {
        let (status, _) = respond(MockProcessSupervisor::new(), "/logs").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn unknown_job_is_not_found() {
        let mut supervisor = MockProcessSupervisor::new();
        supervisor
            .expect_get_logs()
            .returning(|id, _| Err(ClusterError::NotFound(id.to_string())));
        let (status, body) = respond(supervisor, "/logs?job=ghost").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("ghost"));
    }

    #[actix_web::test]
    async fn logs_are_returned_as_plain_text() {
        let mut supervisor = MockProcessSupervisor::new();
        supervisor
            .expect_get_logs()
            .with(eq("web"), eq(5))
            .times(1)
            .returning(|_, _| Ok("line one\nline two\n".to_string()));
        let (status, body) = respond(supervisor, "/logs?job=web&count=5").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "line one\nline two\n");
    }

    #[actix_web::test]
    async fn unparseable_count_falls_back_to_the_default() {
        let mut supervisor = MockProcessSupervisor::new();
        supervisor
            .expect_get_logs()
            .with(eq("web"), eq(DEFAULT_LOG_LINES))
            .times(1)
            .returning(|_, _| Ok(String::new()));
        let (status, _) = respond(supervisor, "/logs?job=web&count=lots").await;
        assert_eq!(status, StatusCode::OK);
    }
}

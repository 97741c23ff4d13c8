//! Agent log server
//!
//! A single-route Actix-Web server on the agent's bind address. It shares
//! the supervisor handle with the reconciliation loop, which is why the
//! supervisor contract demands concurrent-use safety.

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use tracing::info;

use crate::domain::repositories::ProcessSupervisor;
use crate::web::handlers;

/// Serves `GET /logs` on `bind` until the server is stopped.
pub async fn start_log_server(
    bind: &str,
    supervisor: Arc<dyn ProcessSupervisor>,
) -> std::io::Result<()> {
    info!("log endpoint listening on {bind}");

    let supervisor_data = web::Data::new(supervisor);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(supervisor_data.clone())
            .route("/logs", web::get().to(handlers::get_logs))
    })
    .bind(bind)?
    .run()
    .await
}

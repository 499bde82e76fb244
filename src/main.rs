//src/main.rs

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;

mod common;
mod config;
mod db;
mod handlers;
mod models;
mod services;

use crate::config::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    // Si la configuración falla, la aplicación no debe arrancar.
    let app_state = AppState::new()
        .await
        .expect("Falló la inicialización del estado de la aplicación.");

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .expect("Fallaron las migraciones de la base de datos.");

    tracing::info!("✅ Migraciones de la base de datos ejecutadas");

    let attendance_routes = Router::new()
        .route("/scan", post(handlers::attendance::scan))
        .route("/my-records", get(handlers::attendance::my_records))
        .route("/admin/all", get(handlers::attendance::admin_all));

    let qr_routes = Router::new()
        .route("/generate-today", post(handlers::qr::generate_today))
        .route("/today", get(handlers::qr::today))
        .route("/fixed/{shift}", get(handlers::qr::fixed));

    let schedule_routes = Router::new().route(
        "/{user_id}/schedule",
        get(handlers::schedule::get_schedule).put(handlers::schedule::replace_schedule),
    );

    let job_routes = Router::new().route("/mark-absences", post(handlers::jobs::mark_absences));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/attendance", attendance_routes)
        .nest("/api/qr", qr_routes)
        .nest("/api/users", schedule_routes)
        .nest("/api/jobs", job_routes)
        .with_state(app_state);

    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falló el arranque del listener TCP");
    tracing::info!("🚀 Servidor escuchando en {}", listener.local_addr().unwrap());
    // ConnectInfo: el handler de escaneo registra la IP de origen en auditoría
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Error en el servidor Axum");
}

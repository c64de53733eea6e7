use actix_web::{HttpResponse, Responder, get};
use chrono::Utc;

use crate::presentation::dto::HealthResponse;

/// Polled by the load balancer; unauthenticated and does not touch the store.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

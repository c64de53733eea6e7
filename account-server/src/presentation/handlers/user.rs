use actix_web::body::{BoxBody, EitherBody};
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{Error, HttpRequest, HttpResponse, Scope, get, post, web};
use serde_json::{Map, Value};
use tracing::info;

use crate::application::user_service::UserService;
use crate::domain::activity::{ActivityQuery, parse_details};
use crate::domain::error::DomainError;
use crate::domain::preferences::PreferencesPatch;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::dto::{
    ActivityEntryResponse, ActivityResponse, RecordActivityRequest, UpdatePreferencesQuery,
    UserResponse,
};
use crate::presentation::error::{ApiError, OrFail, Operation};
use crate::presentation::middleware::JwtAuthMiddleware;
use crate::presentation::utils::{AuthenticatedUser, owned_user_id, request_id};

pub fn scope(
    keys: JwtKeys,
) -> Scope<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<EitherBody<BoxBody>>,
        Error = Error,
        InitError = (),
    >,
> {
    web::scope("/user")
        .wrap(JwtAuthMiddleware::new(keys))
        .service(get_user_stats)
        .service(update_preferences)
        .service(get_user_activity)
        .service(record_activity)
}

fn json_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, DomainError> {
    serde_json::from_slice(body)
        .map_err(|e| DomainError::Validation(format!("malformed request body: {e}")))
}

#[get("/stats")]
async fn get_user_stats(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<UserService>,
) -> Result<HttpResponse, ApiError> {
    let stats = service
        .get_user_stats(&user.id)
        .await
        .or_fail(Operation::FetchStats)?;

    info!(
        request_id = %request_id(&req),
        user_id = %user.id,
        "user stats fetched"
    );

    Ok(HttpResponse::Ok().json(stats))
}

#[post("/update-preferences")]
async fn update_preferences(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<UserService>,
    query: web::Query<UpdatePreferencesQuery>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let operation = Operation::UpdatePreferences;
    let raw_id = query
        .user_id
        .as_deref()
        .ok_or_else(|| DomainError::Validation("userId is required".into()))
        .or_fail(operation)?;
    let user_id = owned_user_id(raw_id, &user).or_fail(operation)?;
    let patch = json_body::<Map<String, Value>>(&body)
        .and_then(|map| PreferencesPatch::from_json(&map))
        .or_fail(operation)?;

    let updated = service
        .update_preferences(&user_id, patch)
        .await
        .or_fail(operation)?;

    info!(
        request_id = %request_id(&req),
        user_id = %user_id,
        preferences = updated.preferences.len(),
        "preferences updated"
    );

    Ok(HttpResponse::Ok().json(UserResponse {
        success: true,
        user: updated,
    }))
}

#[get("/activity/{user_id}")]
async fn get_user_activity(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<UserService>,
    path: web::Path<String>,
    query: Result<web::Query<ActivityQuery>, actix_web::Error>,
) -> Result<HttpResponse, ApiError> {
    let operation = Operation::FetchActivity;
    let user_id = owned_user_id(&path, &user).or_fail(operation)?;
    let query = query
        .map(web::Query::into_inner)
        .map_err(|e| DomainError::Validation(e.to_string()))
        .or_fail(operation)?;

    let activity = service
        .get_user_activity(&user_id, query)
        .await
        .or_fail(operation)?;

    info!(
        request_id = %request_id(&req),
        user_id = %user_id,
        entries = activity.len(),
        "user activity fetched"
    );

    Ok(HttpResponse::Ok().json(ActivityResponse {
        success: true,
        activity,
    }))
}

#[post("/activity/{user_id}")]
async fn record_activity(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<UserService>,
    path: web::Path<String>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let operation = Operation::RecordActivity;
    let user_id = owned_user_id(&path, &user).or_fail(operation)?;
    let request = json_body::<RecordActivityRequest>(&body).or_fail(operation)?;
    let details = parse_details(&request.details).or_fail(operation)?;

    let entry = service
        .record_activity(&user_id, &request.action, details)
        .await
        .or_fail(operation)?;

    info!(
        request_id = %request_id(&req),
        user_id = %user_id,
        action = %entry.action,
        "activity recorded"
    );

    Ok(HttpResponse::Created().json(ActivityEntryResponse {
        success: true,
        entry,
    }))
}

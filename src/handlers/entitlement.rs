use crate::error::AppError;
use crate::models::*;
use crate::services::{EntitlementService, PurchaseService};
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    get,
    path = "/entitlements",
    tag = "entitlement",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's active entitlements", body = [EntitlementResponse]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_entitlements(
    purchase_service: web::Data<PurchaseService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match purchase_service.list_entitlements(user_id).await {
        Ok(resp) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": resp}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/entitlements/{id}/attach",
    tag = "entitlement",
    params(("id" = i64, Path, description = "Entitlement id")),
    request_body = AttachEntitlementRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Entitlement attached to job post", body = EntitlementResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Entitlement or job post not found"),
        (status = 409, description = "Entitlement already attached")
    )
)]
pub async fn attach_entitlement(
    purchase_service: web::Data<PurchaseService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<AttachEntitlementRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let entitlement_id = path.into_inner();
    match purchase_service
        .attach_entitlement(user_id, entitlement_id, request.into_inner().job_post_id)
        .await
    {
        Ok(resp) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": resp}))),
        Err(e) => Ok(e.error_response()),
    }
}

/// Ownership gate shared by the quota endpoints: the entitlement must
/// exist and belong to the caller before any counter moves.
async fn assert_owned(
    entitlement_service: &EntitlementService,
    entitlement_id: i64,
    user_id: i64,
) -> Result<(), AppError> {
    match entitlement_service.find_by_id(entitlement_id).await? {
        Some(e) if e.user_id == user_id => Ok(()),
        _ => Err(AppError::NotFound("Entitlement not found".to_string())),
    }
}

#[utoipa::path(
    post,
    path = "/entitlements/{id}/consume-edit",
    tag = "entitlement",
    params(("id" = i64, Path, description = "Entitlement id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Edit quota consumed", body = EntitlementResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Edit quota exhausted"),
        (status = 404, description = "Entitlement not found")
    )
)]
pub async fn consume_edit(
    entitlement_service: web::Data<EntitlementService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let entitlement_id = path.into_inner();
    let result = async {
        assert_owned(&entitlement_service, entitlement_id, user_id).await?;
        entitlement_service.consume_edit_quota(entitlement_id).await
    }
    .await;
    match result {
        Ok(model) => Ok(HttpResponse::Ok()
            .json(json!({"success": true, "data": EntitlementResponse::from(model)}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/entitlements/{id}/consume-category-change",
    tag = "entitlement",
    params(("id" = i64, Path, description = "Entitlement id")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Category change quota consumed", body = EntitlementResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Category changes not allowed or exhausted"),
        (status = 404, description = "Entitlement not found")
    )
)]
pub async fn consume_category_change(
    entitlement_service: web::Data<EntitlementService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    let entitlement_id = path.into_inner();
    let result = async {
        assert_owned(&entitlement_service, entitlement_id, user_id).await?;
        entitlement_service
            .consume_category_quota(entitlement_id)
            .await
    }
    .await;
    match result {
        Ok(model) => Ok(HttpResponse::Ok()
            .json(json!({"success": true, "data": EntitlementResponse::from(model)}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn entitlement_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/entitlements")
            .route("", web::get().to(list_entitlements))
            .route("/{id}/attach", web::post().to(attach_entitlement))
            .route("/{id}/consume-edit", web::post().to(consume_edit))
            .route(
                "/{id}/consume-category-change",
                web::post().to(consume_category_change),
            ),
    );
}

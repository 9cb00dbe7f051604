use crate::models::*;
use crate::services::PurchaseService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn get_user_id_from_request(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<i64>().copied()
}

#[utoipa::path(
    post,
    path = "/purchases/verify",
    tag = "purchase",
    request_body = VerifyPurchaseRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Purchase verified and entitlement issued", body = VerifyPurchaseResponse),
        (status = 400, description = "Malformed or rejected purchase proof"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown product, plan, or job post"),
        (status = 409, description = "Transaction already processed by another account"),
        (status = 503, description = "Store verification API unreachable")
    )
)]
pub async fn verify_purchase(
    purchase_service: web::Data<PurchaseService>,
    req: HttpRequest,
    request: web::Json<VerifyPurchaseRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match purchase_service
        .verify_purchase(user_id, request.into_inner())
        .await
    {
        Ok(resp) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": resp}))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/purchases/restore",
    tag = "purchase",
    request_body = RestorePurchasesRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active entitlements for the caller", body = RestorePurchasesResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn restore_purchases(
    purchase_service: web::Data<PurchaseService>,
    req: HttpRequest,
    request: web::Json<RestorePurchasesRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);
    match purchase_service
        .restore_purchases(user_id, request.into_inner().platform)
        .await
    {
        Ok(resp) => Ok(HttpResponse::Ok().json(json!({"success": true, "data": resp}))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn purchase_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/purchases")
            .route("/verify", web::post().to(verify_purchase))
            .route("/restore", web::post().to(restore_purchases)),
    );
}

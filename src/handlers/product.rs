use crate::entities::IapPlatform;
use crate::models::*;
use crate::services::CatalogService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/products",
    tag = "product",
    params(
        ("platform" = IapPlatform, Query, description = "Store platform (ios or android)")
    ),
    responses(
        (status = 200, description = "Active product mappings for the platform", body = [ProductResponse]),
        (status = 400, description = "Unknown platform")
    )
)]
pub async fn list_products(
    catalog_service: web::Data<CatalogService>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse> {
    match catalog_service
        .list_products(query.into_inner().platform)
        .await
    {
        Ok(products) => {
            let items: Vec<ProductResponse> =
                products.into_iter().map(ProductResponse::from).collect();
            Ok(HttpResponse::Ok().json(json!({"success": true, "data": items})))
        }
        Err(e) => Ok(e.error_response()),
    }
}

pub fn product_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/products").route("", web::get().to(list_products)));
}

use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{EntitlementStatus, IapPlatform, JobPostStatus, PurchaseSource};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::purchase::verify_purchase,
        handlers::purchase::restore_purchases,
        handlers::entitlement::list_entitlements,
        handlers::entitlement::attach_entitlement,
        handlers::entitlement::consume_edit,
        handlers::entitlement::consume_category_change,
        handlers::product::list_products,
    ),
    components(
        schemas(
            IapPlatform,
            PurchaseSource,
            EntitlementStatus,
            JobPostStatus,
            VerifyPurchaseRequest,
            VerifyPurchaseResponse,
            RestorePurchasesRequest,
            RestorePurchasesResponse,
            RestoredEntitlement,
            AttachEntitlementRequest,
            EntitlementResponse,
            JobPostSummary,
            ProductQuery,
            ProductResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "purchase", description = "IAP verification and restore"),
        (name = "entitlement", description = "Entitlement lifecycle and quotas"),
        (name = "product", description = "Purchasable product catalog")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    );
}

use actix_web::web;
use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, Set};
use validator::Validate;

use crate::error::{unique_violation, ApiError};
use crate::models::currency;
use crate::models::dto::{CurrencyCreate, CurrencyPatch};
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};

pub struct CurrencyViewSet;

const DUPLICATE_SYMBOL: &str = "currency with this symbol already exists.";

#[async_trait(?Send)]
impl ViewSet for CurrencyViewSet {
    type Entity = currency::Entity;
    type Model = currency::Model;
    type Create = CurrencyCreate;
    type Patch = CurrencyPatch;

    const ENTITY: &'static str = "Currency";

    fn pk() -> currency::Column {
        currency::Column::Id
    }

    async fn create(ctx: &RequestContext, payload: CurrencyCreate) -> Result<currency::Model, ApiError> {
        payload.validate()?;

        currency::ActiveModel {
            symbol: Set(payload.symbol.to_uppercase()),
            name: Set(payload.name),
            ..Default::default()
        }
        .insert(ctx.db())
        .await
        .map_err(|e| unique_violation(e, "symbol", DUPLICATE_SYMBOL))
    }

    async fn update(ctx: &RequestContext, current: currency::Model, patch: CurrencyPatch) -> Result<currency::Model, ApiError> {
        patch.validate()?;

        let mut active: currency::ActiveModel = current.into();
        if let Some(symbol) = patch.symbol {
            active.symbol = Set(symbol.to_uppercase());
        }
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        active
            .update(ctx.db())
            .await
            .map_err(|e| unique_violation(e, "symbol", DUPLICATE_SYMBOL))
    }
}

pub fn currency_routes(cfg: &mut web::ServiceConfig) {
    crud_routes::<CurrencyViewSet>(cfg);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{http::StatusCode, test};

    use crate::cache::memory::MemoryStore;
    use crate::db::test_support::*;
    use crate::routes::test_app;

    #[actix_web::test]
    async fn test_symbol_uppercased_and_unique() {
        let db = setup_db().await;
        let fx = Fixture::new(&db).await;
        insert_currency(&db, "USD").await;
        let app = test_app!(db, Arc::new(MemoryStore::default()));

        let req = test::TestRequest::post()
            .uri("/api/currency")
            .insert_header(bearer(&fx.owner))
            .set_json(serde_json::json!({"symbol": "inr", "name": "Indian Rupee"}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["symbol"], "INR");

        let req = test::TestRequest::post()
            .uri("/api/currency")
            .insert_header(bearer(&fx.owner))
            .set_json(serde_json::json!({"symbol": "usd", "name": "Dollar"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["errors"]["symbol"][0], "currency with this symbol already exists.");
    }
}

use actix_web::{get, web, HttpResponse};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use validator::Validate;

use crate::error::{success, ApiError, FieldErrors};
use crate::models::dto::{CurrencyRatesQuery, ExchangeRatesCreate, ExchangeRatesPatch};
use crate::models::exchange_rates;
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};

pub struct ExchangeRatesViewSet;

#[async_trait(?Send)]
impl ViewSet for ExchangeRatesViewSet {
    type Entity = exchange_rates::Entity;
    type Model = exchange_rates::Model;
    type Create = ExchangeRatesCreate;
    type Patch = ExchangeRatesPatch;

    const ENTITY: &'static str = "ExchangeRates";

    fn pk() -> exchange_rates::Column {
        exchange_rates::Column::Id
    }

    async fn create(ctx: &RequestContext, payload: ExchangeRatesCreate) -> Result<exchange_rates::Model, ApiError> {
        payload.validate()?;

        Ok(exchange_rates::ActiveModel {
            applied_date: Set(payload.applied_date),
            base_currency: Set(payload.base_currency.to_uppercase()),
            rates: Set(serde_json::to_value(payload.rates)?),
            created_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(ctx.db())
        .await?)
    }

    async fn update(
        ctx: &RequestContext,
        current: exchange_rates::Model,
        patch: ExchangeRatesPatch,
    ) -> Result<exchange_rates::Model, ApiError> {
        patch.validate()?;

        let mut active: exchange_rates::ActiveModel = current.into();
        if let Some(applied_date) = patch.applied_date {
            active.applied_date = Set(applied_date);
        }
        if let Some(base_currency) = patch.base_currency {
            active.base_currency = Set(base_currency.to_uppercase());
        }
        if let Some(rates) = patch.rates {
            active.rates = Set(serde_json::to_value(rates)?);
        }
        Ok(active.update(ctx.db()).await?)
    }
}

/// Dernière ligne pour la date demandée, ou dernière ligne tout court
pub async fn latest_rates(
    db: &DatabaseConnection,
    request_date: Option<&str>,
) -> Result<Option<exchange_rates::Model>, ApiError> {
    let mut select = exchange_rates::Entity::find().order_by_desc(exchange_rates::Column::Id);

    if let Some(raw) = request_date.filter(|raw| !raw.trim().is_empty()) {
        let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
            ApiError::Validation(FieldErrors::single(
                "request_date",
                "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
            ))
        })?;
        select = select.filter(exchange_rates::Column::AppliedDate.eq(date));
    }

    Ok(select.one(db).await?)
}

/// GET /api/exchange_rates/get_currency_rates?request_date=YYYY-MM-DD
#[get("/get_currency_rates")]
pub async fn get_currency_rates(
    ctx: RequestContext,
    query: web::Query<CurrencyRatesQuery>,
) -> Result<HttpResponse, ApiError> {
    let rates = latest_rates(ctx.db(), query.request_date.as_deref()).await?;
    Ok(success(rates))
}

pub fn exchange_rates_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_currency_rates);
    crud_routes::<ExchangeRatesViewSet>(cfg);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;

    async fn insert_rates(db: &DatabaseConnection, date: &str, inr: f64) {
        exchange_rates::ActiveModel {
            applied_date: Set(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
            base_currency: Set("USD".to_string()),
            rates: Set(serde_json::json!({ "INR": inr })),
            created_date: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[actix_web::test]
    async fn test_latest_rates_by_date() {
        let db = setup_db().await;
        assert!(latest_rates(&db, None).await.unwrap().is_none());

        insert_rates(&db, "2024-03-01", 82.9).await;
        insert_rates(&db, "2024-03-01", 83.1).await;
        insert_rates(&db, "2024-03-02", 83.4).await;

        let day = latest_rates(&db, Some("2024-03-01")).await.unwrap().unwrap();
        assert_eq!(day.rates["INR"], 83.1);

        let latest = latest_rates(&db, None).await.unwrap().unwrap();
        assert_eq!(latest.rates["INR"], 83.4);

        assert!(latest_rates(&db, Some("2024-12-25")).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn test_malformed_date_is_field_error() {
        let db = setup_db().await;
        let err = latest_rates(&db, Some("01/03/2024")).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref e) if e.contains("request_date")));
    }
}

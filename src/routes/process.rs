// ============================================================================
// ROUTES : PROCESS (STRATEGY)
// ============================================================================
//
// Endpoints:
//   CRUD          /api/process[/{id}]
//   POST          /api/process/{id}/copy_process
//   POST          /api/process/api_post   (comptes API de sous-équipe)
//   GET           /api/process/pnl?region_name=&strategy_names=a,b
//
// Points d'attention:
//   - list / retrieve suivent la règle de visibilité recon, pas les PATCH
//
// ============================================================================

use actix_web::{get, post, web, HttpResponse};
use async_trait::async_trait;
use sea_orm::{EntityTrait, Select};

use crate::error::{created, success, ApiError};
use crate::models::dto::{CopyProcessRequest, PnlQuery, StrategyDraft, StrategyPatch, StrategySlugRequest};
use crate::models::strategy;
use crate::routes::viewset::{crud_routes, find_in, RequestContext, ViewSet};
use crate::services::access::{strategy_scope, Capability};
use crate::services::copy_service::CopyService;
use crate::services::pnl_service;
use crate::services::strategy_service::StrategyService;

pub struct ProcessViewSet;

#[async_trait(?Send)]
impl ViewSet for ProcessViewSet {
    type Entity = strategy::Entity;
    type Model = strategy::Model;
    type Create = StrategyDraft;
    type Patch = StrategyPatch;

    const ENTITY: &'static str = "Process";

    fn pk() -> strategy::Column {
        strategy::Column::Id
    }

    async fn scope(ctx: &RequestContext) -> Result<Select<strategy::Entity>, ApiError> {
        let scope = strategy_scope(ctx.db(), &ctx.principal).await?;
        Ok(scope.apply(strategy::Entity::find()))
    }

    async fn edit_scope(_ctx: &RequestContext) -> Result<Select<strategy::Entity>, ApiError> {
        Ok(strategy::Entity::find())
    }

    async fn create(ctx: &RequestContext, payload: StrategyDraft) -> Result<strategy::Model, ApiError> {
        StrategyService::create(ctx.db(), payload, ctx.user_id()).await
    }

    async fn update(ctx: &RequestContext, current: strategy::Model, patch: StrategyPatch) -> Result<strategy::Model, ApiError> {
        tracing::info!(
            process = %current.name,
            user = %ctx.principal.user.username,
            params = ?patch,
            "Process partial update requested"
        );
        StrategyService::update(ctx.db(), current, patch).await
    }
}

/// POST /api/process/{id}/copy_process
#[post("/{id}/copy_process")]
pub async fn copy_process(
    ctx: RequestContext,
    path: web::Path<i32>,
    body: web::Json<CopyProcessRequest>,
) -> Result<HttpResponse, ApiError> {
    let select = ProcessViewSet::edit_scope(&ctx).await?;
    let source = find_in::<ProcessViewSet>(&ctx, select, path.into_inner()).await?;

    let copy = CopyService::copy_process(ctx.db(), source, ctx.user_id(), body.into_inner()).await?;
    Ok(success(copy))
}

/// POST /api/process/api_post - création par une sous-équipe, relations par nom
#[post("/api_post")]
pub async fn api_post(ctx: RequestContext, body: web::Json<StrategySlugRequest>) -> Result<HttpResponse, ApiError> {
    ctx.principal.require(Capability::SubteamStrategyApi)?;

    let draft = StrategyService::draft_from_slugs(ctx.db(), body.into_inner()).await?;
    let process = StrategyService::create(ctx.db(), draft, ctx.user_id()).await?;

    if let Some(subteam) = &ctx.principal.api_subteam {
        ctx.collaborators()
            .tasks
            .add_strategy_to_subteam(process.id, &subteam.name)
            .await;
    }

    Ok(created(process))
}

/// GET /api/process/pnl
#[get("/pnl")]
pub async fn pnl(ctx: RequestContext, query: web::Query<PnlQuery>) -> Result<HttpResponse, ApiError> {
    let run_status = ctx.collaborators().run_status.clone();
    let snapshot = pnl_service::pnl_snapshot(ctx.db(), run_status.as_ref(), query.into_inner()).await?;
    Ok(success(snapshot))
}

pub fn process_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(api_post).service(pnl).service(copy_process);
    crud_routes::<ProcessViewSet>(cfg);
}

use actix_web::{get, http::header, post, web, HttpRequest, HttpResponse};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Select};

use crate::error::{success, ApiError};
use crate::models::dto::{
    CompletePendingRequest, PendingActionsQuery, PendingProcessCreate, PendingUpdateRequest,
};
use crate::models::pending_process;
use crate::routes::viewset::{crud_routes, find_in, RequestContext, ViewSet};
use crate::services::access::strategy_scope;
use crate::services::pending_process_service::PendingProcessService;

pub struct PendingProcessViewSet;

#[async_trait(?Send)]
impl ViewSet for PendingProcessViewSet {
    type Entity = pending_process::Entity;
    type Model = pending_process::Model;
    type Create = PendingProcessCreate;
    type Patch = PendingUpdateRequest;

    const ENTITY: &'static str = "PendingProcess";

    fn pk() -> pending_process::Column {
        pending_process::Column::Id
    }

    /// Chacun ne voit que ses propres demandes
    async fn scope(ctx: &RequestContext) -> Result<Select<pending_process::Entity>, ApiError> {
        Ok(pending_process::Entity::find().filter(pending_process::Column::OwnerId.eq(ctx.user_id())))
    }

    /// Le staff peut valider les demandes des autres
    async fn edit_scope(ctx: &RequestContext) -> Result<Select<pending_process::Entity>, ApiError> {
        if ctx.principal.user.is_staff {
            Ok(pending_process::Entity::find())
        } else {
            Self::scope(ctx).await
        }
    }

    async fn create(ctx: &RequestContext, payload: PendingProcessCreate) -> Result<pending_process::Model, ApiError> {
        PendingProcessService::stage(ctx.db(), &ctx.principal, payload).await
    }

    async fn update(
        ctx: &RequestContext,
        current: pending_process::Model,
        patch: PendingUpdateRequest,
    ) -> Result<pending_process::Model, ApiError> {
        tracing::info!(
            pending_id = current.id,
            create_strategy = patch.create_strategy,
            user = ctx.user_id(),
            "Pending process update requested"
        );
        PendingProcessService::partial_update(ctx.db(), current, patch).await
    }
}

/// GET /api/pending_process/fetch_process_pending_actions?process_id=&process_type=
#[get("/fetch_process_pending_actions")]
pub async fn fetch_process_pending_actions(
    ctx: RequestContext,
    query: web::Query<PendingActionsQuery>,
) -> Result<HttpResponse, ApiError> {
    let scope = strategy_scope(ctx.db(), &ctx.principal).await?;
    let actions = PendingProcessService::pending_actions(ctx.db(), &scope, query.into_inner()).await?;
    Ok(success(actions))
}

/// Corps JSON ou formulaire; seul un corps vide vaut la valeur par défaut
fn parse_complete_body(req: &HttpRequest, body: &[u8]) -> Result<CompletePendingRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CompletePendingRequest::default());
    }

    let is_form = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        let raw = std::str::from_utf8(body)
            .map_err(|_| ApiError::BadRequest("Form body is not valid UTF-8".to_string()))?;
        web::Query::<CompletePendingRequest>::from_query(raw)
            .map(web::Query::into_inner)
            .map_err(|e| ApiError::BadRequest(format!("Invalid form body: {}", e)))
    } else {
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
    }
}

/// POST /api/pending_process/{id}/complete_pending_process
#[post("/{id}/complete_pending_process")]
pub async fn complete_pending_process(
    ctx: RequestContext,
    req: HttpRequest,
    path: web::Path<i32>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let request = parse_complete_body(&req, &body)?;
    let select = PendingProcessViewSet::edit_scope(&ctx).await?;
    let pending = find_in::<PendingProcessViewSet>(&ctx, select, path.into_inner()).await?;

    PendingProcessService::complete(ctx.db(), pending, request.mark_active).await?;
    Ok(success(serde_json::json!({ "ok": true })))
}

pub fn pending_process_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(fetch_process_pending_actions)
        .service(complete_pending_process);
    crud_routes::<PendingProcessViewSet>(cfg);
}

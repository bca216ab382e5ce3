// ============================================================================
// VIEWSET GÉNÉRIQUE
// ============================================================================
//
// Description:
//   Routes CRUD communes à toutes les ressources de /api:
//     GET    /x        -> list (pagination optionnelle ?page=&page_size=)
//     POST   /x        -> create
//     GET    /x/{id}   -> retrieve
//     PATCH  /x/{id}   -> partial_update
//     DELETE /x/{id}   -> destroy
//   Chaque ressource implémente ViewSet et peut ajouter ses propres routes.
//
// Points d'attention:
//   - list / retrieve passent par scope(), update / destroy par edit_scope()
//   - une ligne hors scope donne 404, jamais 403
//
// ============================================================================

use actix_web::{dev::Payload, web, FromRequest, HttpRequest, HttpResponse};
use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::AppConfig;
use crate::error::{created, success, ApiError};
use crate::middleware::AuthUser;
use crate::models::dto::ListParams;
use crate::routes::Collaborators;
use crate::services::access::Principal;

const MAX_PAGE_SIZE: u64 = 1000;

/// Contexte d'une requête authentifiée
pub struct RequestContext {
    pub principal: Principal,
    db: web::Data<DatabaseConnection>,
    collaborators: web::Data<Collaborators>,
}

impl RequestContext {
    pub fn db(&self) -> &DatabaseConnection {
        self.db.get_ref()
    }

    pub fn collaborators(&self) -> &Collaborators {
        self.collaborators.get_ref()
    }

    pub fn user_id(&self) -> i32 {
        self.principal.user_id()
    }
}

impl FromRequest for RequestContext {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let auth = AuthUser::from_request(req, payload).into_inner();
        let db = req.app_data::<web::Data<DatabaseConnection>>().cloned();
        let collaborators = req.app_data::<web::Data<Collaborators>>().cloned();

        Box::pin(async move {
            let auth = auth?;
            let db = db.ok_or_else(|| ApiError::Internal("database missing from app data".to_string()))?;
            let collaborators = collaborators
                .ok_or_else(|| ApiError::Internal("collaborators missing from app data".to_string()))?;
            let principal = Principal::load(db.get_ref(), &auth).await?;

            Ok(Self {
                principal,
                db,
                collaborators,
            })
        })
    }
}

#[async_trait(?Send)]
pub trait ViewSet: 'static {
    type Entity: EntityTrait<Model = Self::Model>;
    type Model: sea_orm::FromQueryResult + Serialize + Send + Sync + 'static;
    type Create: DeserializeOwned + 'static;
    type Patch: DeserializeOwned + 'static;

    /// Nom utilisé dans les erreurs 404
    const ENTITY: &'static str;

    fn pk() -> <Self::Entity as EntityTrait>::Column;

    /// Lignes visibles par le demandeur
    async fn scope(_ctx: &RequestContext) -> Result<Select<Self::Entity>, ApiError> {
        Ok(Self::Entity::find())
    }

    /// Lignes modifiables par le demandeur
    async fn edit_scope(ctx: &RequestContext) -> Result<Select<Self::Entity>, ApiError> {
        Self::scope(ctx).await
    }

    async fn create(ctx: &RequestContext, payload: Self::Create) -> Result<Self::Model, ApiError>;

    async fn update(ctx: &RequestContext, current: Self::Model, patch: Self::Patch) -> Result<Self::Model, ApiError>;

    async fn represent(_ctx: &RequestContext, models: Vec<Self::Model>) -> Result<Vec<Value>, ApiError> {
        models
            .iter()
            .map(|model| serde_json::to_value(model).map_err(ApiError::from))
            .collect()
    }

    async fn destroy(ctx: &RequestContext, id: i32) -> Result<(), ApiError> {
        Self::Entity::delete_many()
            .filter(Self::pk().eq(id))
            .exec(ctx.db())
            .await?;
        Ok(())
    }
}

async fn represent_one<V: ViewSet>(ctx: &RequestContext, model: V::Model) -> Result<Value, ApiError> {
    V::represent(ctx, vec![model])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal(format!("{} representation is empty", V::ENTITY)))
}

/// Charge une ligne dans le scope donné, 404 sinon
pub async fn find_in<V: ViewSet>(
    ctx: &RequestContext,
    select: Select<V::Entity>,
    id: i32,
) -> Result<V::Model, ApiError> {
    select
        .filter(V::pk().eq(id))
        .one(ctx.db())
        .await?
        .ok_or_else(|| ApiError::not_found(V::ENTITY, id))
}

pub async fn list<V: ViewSet>(
    ctx: RequestContext,
    query: web::Query<ListParams>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse, ApiError> {
    let select = V::scope(&ctx).await?.order_by_asc(V::pk());

    let Some(page) = query.page else {
        let models = select.all(ctx.db()).await?;
        return Ok(success(V::represent(&ctx, models).await?));
    };

    let page = page.max(1);
    let page_size = query
        .page_size
        .unwrap_or(config.default_page_size)
        .clamp(1, MAX_PAGE_SIZE);
    let paginator = select.paginate(ctx.db(), page_size);
    let totals = paginator.num_items_and_pages().await?;
    let models = paginator.fetch_page(page - 1).await?;

    Ok(success(serde_json::json!({
        "count": totals.number_of_items,
        "num_pages": totals.number_of_pages,
        "page": page,
        "results": V::represent(&ctx, models).await?,
    })))
}

pub async fn retrieve<V: ViewSet>(ctx: RequestContext, path: web::Path<i32>) -> Result<HttpResponse, ApiError> {
    let select = V::scope(&ctx).await?;
    let model = find_in::<V>(&ctx, select, path.into_inner()).await?;
    Ok(success(represent_one::<V>(&ctx, model).await?))
}

pub async fn create<V: ViewSet>(ctx: RequestContext, body: web::Json<V::Create>) -> Result<HttpResponse, ApiError> {
    let model = V::create(&ctx, body.into_inner()).await?;
    Ok(created(represent_one::<V>(&ctx, model).await?))
}

pub async fn partial_update<V: ViewSet>(
    ctx: RequestContext,
    path: web::Path<i32>,
    body: web::Json<V::Patch>,
) -> Result<HttpResponse, ApiError> {
    let select = V::edit_scope(&ctx).await?;
    let current = find_in::<V>(&ctx, select, path.into_inner()).await?;
    let model = V::update(&ctx, current, body.into_inner()).await?;
    Ok(success(represent_one::<V>(&ctx, model).await?))
}

pub async fn destroy<V: ViewSet>(ctx: RequestContext, path: web::Path<i32>) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let select = V::edit_scope(&ctx).await?;
    find_in::<V>(&ctx, select, id).await?;
    V::destroy(&ctx, id).await?;

    tracing::info!(entity = V::ENTITY, id, user = ctx.user_id(), "Row deleted");
    Ok(HttpResponse::NoContent().finish())
}

/// Enregistre les 5 routes CRUD. Les routes spécifiques doivent être
/// enregistrées avant pour ne pas être masquées.
pub fn crud_routes<V: ViewSet>(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(list::<V>))
            .route(web::post().to(create::<V>)),
    )
    .service(
        web::resource("/{id:\\d+}")
            .route(web::get().to(retrieve::<V>))
            .route(web::patch().to(partial_update::<V>))
            .route(web::delete().to(destroy::<V>)),
    );
}

/// Les erreurs de désérialisation passent par ApiError
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

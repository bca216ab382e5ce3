use std::collections::HashMap;

use actix_web::web;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde_json::Value;
use validator::Validate;

use crate::error::{unique_violation, ApiError};
use crate::models::dto::{TeamCreate, TeamPatch};
use crate::models::team_lead;
use crate::models::teams::{self, TeamType};
use crate::routes::viewset::{crud_routes, RequestContext, ViewSet};

pub struct TeamsViewSet;

const DUPLICATE_NAME: &str = "teams with this name already exists.";

#[async_trait(?Send)]
impl ViewSet for TeamsViewSet {
    type Entity = teams::Entity;
    type Model = teams::Model;
    type Create = TeamCreate;
    type Patch = TeamPatch;

    const ENTITY: &'static str = "Teams";

    fn pk() -> teams::Column {
        teams::Column::Id
    }

    async fn create(ctx: &RequestContext, payload: TeamCreate) -> Result<teams::Model, ApiError> {
        payload.validate()?;

        let now = Utc::now();
        teams::ActiveModel {
            slack_id: Set(payload.slack_id),
            secondary_slack_id: Set(payload.secondary_slack_id),
            name: Set(payload.name),
            team_type: Set(payload.team_type.unwrap_or(TeamType::Internal)),
            email: Set(payload.email),
            api_hash: Set(payload.api_hash),
            created_date: Set(Some(now)),
            modified_date: Set(Some(now)),
            ..Default::default()
        }
        .insert(ctx.db())
        .await
        .map_err(|e| unique_violation(e, "name", DUPLICATE_NAME))
    }

    async fn update(ctx: &RequestContext, current: teams::Model, patch: TeamPatch) -> Result<teams::Model, ApiError> {
        patch.validate()?;

        let mut active: teams::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(team_type) = patch.team_type {
            active.team_type = Set(team_type);
        }
        if let Some(slack_id) = patch.slack_id {
            active.slack_id = Set(slack_id);
        }
        if let Some(secondary_slack_id) = patch.secondary_slack_id {
            active.secondary_slack_id = Set(secondary_slack_id);
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(api_hash) = patch.api_hash {
            active.api_hash = Set(api_hash);
        }
        active.modified_date = Set(Some(Utc::now()));

        active
            .update(ctx.db())
            .await
            .map_err(|e| unique_violation(e, "name", DUPLICATE_NAME))
    }

    /// Ajoute les ids des leads de chaque équipe
    async fn represent(ctx: &RequestContext, models: Vec<teams::Model>) -> Result<Vec<Value>, ApiError> {
        let ids: Vec<i32> = models.iter().map(|t| t.id).collect();
        let mut leads: HashMap<i32, Vec<i32>> = HashMap::new();
        for lead in team_lead::Entity::find()
            .filter(team_lead::Column::TeamsId.is_in(ids))
            .all(ctx.db())
            .await?
        {
            leads.entry(lead.teams_id).or_default().push(lead.user_id);
        }

        models
            .into_iter()
            .map(|team| -> Result<Value, ApiError> {
                let team_leads = leads.remove(&team.id).unwrap_or_default();
                let mut value = serde_json::to_value(team)?;
                if let Value::Object(map) = &mut value {
                    map.insert("leads".to_string(), Value::from(team_leads));
                }
                Ok(value)
            })
            .collect()
    }
}

pub fn teams_routes(cfg: &mut web::ServiceConfig) {
    crud_routes::<TeamsViewSet>(cfg);
}

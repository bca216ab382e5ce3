// ============================================================================
// SERVICE : COPIE DE PROCESS
// ============================================================================
//
// Description:
//   Duplique un process sur une autre box, sous un nouveau nom.
//   Le process source est consommé: l'appelant ne peut plus l'utiliser.
//
// Copie:
//   - toujours: PnL info, PnL limits (kill switch neuf)
//   - sur option: trading sessions, routes d'erreur, abonnements aux rapports
//
// Points d'attention:
//   - la copie est DORMANT, appartient au demandeur, sans coeur CPU
//   - tout se fait dans une seule transaction
//
// ============================================================================

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};

use crate::error::{ApiError, FieldErrors};
use crate::models::dto::CopyProcessRequest;
use crate::models::strategy::{self, ProcessState};
use crate::models::{
    boxes, pnl_info, pnl_limits, report_subscription, trading_session, universal_error_route,
};
use crate::services::strategy_service::{create_kill_switch, name_taken, unique_name_error};

pub struct CopyService;

impl CopyService {
    pub async fn copy_process(
        db: &DatabaseConnection,
        source: strategy::Model,
        requester_id: i32,
        request: CopyProcessRequest,
    ) -> Result<strategy::Model, ApiError> {
        let mut errors = FieldErrors::new();

        let new_name = request.new_name.filter(|name| !name.trim().is_empty());
        match &new_name {
            None => errors.required("new_name"),
            Some(name) if name_taken(db, name, None).await? => {
                errors.add("new_name", "strategy with this name already exists.")
            }
            Some(_) => {}
        }

        match request.new_box {
            None => errors.required("new_box"),
            Some(box_id) => {
                if boxes::Entity::find_by_id(box_id).one(db).await?.is_none() {
                    errors.add("new_box", format!("Invalid pk \"{}\" - object does not exist.", box_id));
                }
            }
        }

        errors.into_result()?;
        let (Some(new_name), Some(new_box)) = (new_name, request.new_box) else {
            return Err(ApiError::Internal("validated copy request is incomplete".to_string()));
        };

        let source_id = source.id;
        let txn = db.begin().await?;

        let now = Utc::now();
        let copy = strategy::ActiveModel {
            name: Set(new_name),
            state: Set(ProcessState::Dormant),
            owner_id: Set(requester_id),
            box_id: Set(new_box),
            e_region_id: Set(source.e_region_id),
            team_id: Set(source.team_id),
            currency_id: Set(source.currency_id),
            cpu: Set(None),
            config_path: Set(source.config_path),
            description: Set(source.description),
            created_date: Set(now),
            modified_date: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(unique_name_error)?;

        create_kill_switch(&txn, copy.id).await?;
        copy_pnl(&txn, source_id, copy.id).await?;

        if request.copy_trading_session_flag {
            copy_trading_sessions(&txn, source_id, copy.id).await?;
        }
        if request.copy_universal_error_flag {
            copy_error_routes(&txn, source_id, copy.id).await?;
        }
        if request.copy_reports_flag {
            copy_reports(&txn, source_id, copy.id).await?;
        }

        txn.commit().await?;

        tracing::info!(source_id, copy_id = copy.id, name = %copy.name, "Process copied");
        Ok(copy)
    }
}

async fn copy_pnl<C: ConnectionTrait>(db: &C, from: i32, to: i32) -> Result<(), DbErr> {
    if let Some(info) = pnl_info::Entity::find()
        .filter(pnl_info::Column::StrategyId.eq(from))
        .one(db)
        .await?
    {
        pnl_info::ActiveModel {
            strategy_id: Set(to),
            book: Set(info.book),
            pnl_source: Set(info.pnl_source),
            account: Set(info.account),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    if let Some(limits) = pnl_limits::Entity::find()
        .filter(pnl_limits::Column::StrategyId.eq(from))
        .one(db)
        .await?
    {
        pnl_limits::ActiveModel {
            strategy_id: Set(to),
            daily_loss_limit: Set(limits.daily_loss_limit),
            max_drawdown: Set(limits.max_drawdown),
            max_position: Set(limits.max_position),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn copy_trading_sessions<C: ConnectionTrait>(db: &C, from: i32, to: i32) -> Result<(), DbErr> {
    let sessions = trading_session::Entity::find()
        .filter(trading_session::Column::StrategyId.eq(from))
        .all(db)
        .await?;
    for session in sessions {
        trading_session::ActiveModel {
            strategy_id: Set(to),
            start_time: Set(session.start_time),
            end_time: Set(session.end_time),
            days: Set(session.days),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn copy_error_routes<C: ConnectionTrait>(db: &C, from: i32, to: i32) -> Result<(), DbErr> {
    let routes = universal_error_route::Entity::find()
        .filter(universal_error_route::Column::StrategyId.eq(from))
        .all(db)
        .await?;
    for route in routes {
        universal_error_route::ActiveModel {
            strategy_id: Set(to),
            error_code: Set(route.error_code),
            route_to: Set(route.route_to),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn copy_reports<C: ConnectionTrait>(db: &C, from: i32, to: i32) -> Result<(), DbErr> {
    let reports = report_subscription::Entity::find()
        .filter(report_subscription::Column::StrategyId.eq(from))
        .all(db)
        .await?;
    for report in reports {
        report_subscription::ActiveModel {
            strategy_id: Set(to),
            report_name: Set(report.report_name),
            recipients: Set(report.recipients),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

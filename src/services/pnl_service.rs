// ============================================================================
// SERVICE : PNL
// ============================================================================
//
// Description:
//   Photo des process ACTIVE qui ont une config PnL, avec box, régions,
//   devise, équipe et présence d'un mail d'erreur "crash".
//   Le statut d'exécution vient d'un RunStatusProvider.
//
// Points d'attention:
//   - les relations sont chargées en lot (une requête par table)
//   - is_running vaut None si le statut n'a pas pu être lu
//   - les statuts sont lus en un seul appel pour tout le lot
//
// ============================================================================

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

use crate::cache::{heartbeat_key, KvStore};
use crate::models::dto::{PnlEntry, PnlQuery};
use crate::models::strategy::{self, ProcessState};
use crate::models::{boxes, currency, error_mail, pnl_info, region, teams};

/// Indique si des process tournent actuellement
#[async_trait]
pub trait RunStatusProvider: Send + Sync {
    /// Un statut par process, dans le même ordre; None si illisible
    async fn run_states(&self, processes: &[strategy::Model]) -> Vec<Option<bool>>;
}

/// Un process qui tourne rafraîchit sa clé process_heartbeat_<name>
pub struct HeartbeatRunStatus {
    store: Arc<dyn KvStore>,
}

impl HeartbeatRunStatus {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RunStatusProvider for HeartbeatRunStatus {
    async fn run_states(&self, processes: &[strategy::Model]) -> Vec<Option<bool>> {
        let keys: Vec<String> = processes.iter().map(|p| heartbeat_key(&p.name)).collect();
        match self.store.exists_many(&keys).await {
            Ok(alive) => alive.into_iter().map(Some).collect(),
            Err(e) => {
                tracing::warn!(processes = processes.len(), "Failed to read heartbeats: {}", e);
                vec![None; processes.len()]
            }
        }
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn pnl_snapshot(
    db: &DatabaseConnection,
    run_status: &dyn RunStatusProvider,
    query: PnlQuery,
) -> Result<BTreeMap<String, PnlEntry>, DbErr> {
    let mut select = strategy::Entity::find()
        .find_also_related(pnl_info::Entity)
        .filter(strategy::Column::State.eq(ProcessState::Active))
        .filter(pnl_info::Column::Id.is_not_null());

    if let Some(region_name) = query.region_name.as_deref().filter(|name| !name.is_empty()) {
        let Some(found) = region::Entity::find()
            .filter(region::Column::Name.eq(region_name))
            .one(db)
            .await?
        else {
            return Ok(BTreeMap::new());
        };
        select = select.filter(strategy::Column::ERegionId.eq(found.id));
    }

    if let Some(raw) = query.strategy_names.as_deref() {
        let names = split_names(raw);
        if !names.is_empty() {
            select = select.filter(strategy::Column::Name.is_in(names));
        }
    }

    let (processes, infos): (Vec<strategy::Model>, Vec<pnl_info::Model>) = select
        .all(db)
        .await?
        .into_iter()
        .filter_map(|(process, info)| info.map(|info| (process, info)))
        .unzip();
    if processes.is_empty() {
        return Ok(BTreeMap::new());
    }
    let running = run_status.run_states(&processes).await;
    let rows: Vec<(strategy::Model, pnl_info::Model)> = processes.into_iter().zip(infos).collect();

    // Chargement en lot des relations
    let box_ids: HashSet<i32> = rows.iter().map(|(p, _)| p.box_id).collect();
    let box_map: HashMap<i32, boxes::Model> = boxes::Entity::find()
        .filter(boxes::Column::Id.is_in(box_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();

    let region_ids: HashSet<i32> = rows
        .iter()
        .map(|(p, _)| p.e_region_id)
        .chain(box_map.values().map(|b| b.region_id))
        .collect();
    let region_map: HashMap<i32, String> = region::Entity::find()
        .filter(region::Column::Id.is_in(region_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    let currency_ids: HashSet<i32> = rows.iter().filter_map(|(p, _)| p.currency_id).collect();
    let currency_map: HashMap<i32, String> = currency::Entity::find()
        .filter(currency::Column::Id.is_in(currency_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.symbol))
        .collect();

    let team_ids: HashSet<i32> = rows.iter().filter_map(|(p, _)| p.team_id).collect();
    let team_map: HashMap<i32, String> = teams::Entity::find()
        .filter(teams::Column::Id.is_in(team_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let strategy_ids: Vec<i32> = rows.iter().map(|(p, _)| p.id).collect();
    let crashed: HashSet<i32> = error_mail::Entity::find()
        .filter(error_mail::Column::StrategyId.is_in(strategy_ids))
        .filter(error_mail::Column::ErrorType.eq("crash"))
        .all(db)
        .await?
        .into_iter()
        .map(|mail| mail.strategy_id)
        .collect();

    let mut snapshot = BTreeMap::new();
    for (index, (process, info)) in rows.into_iter().enumerate() {
        let process_box = box_map.get(&process.box_id);
        let entry = PnlEntry {
            id: process.id,
            name: process.name.clone(),
            state: process.state,
            box_name: process_box.map(|b| b.name.clone()),
            box_region: process_box.and_then(|b| region_map.get(&b.region_id).cloned()),
            region: region_map.get(&process.e_region_id).cloned(),
            currency: process.currency_id.and_then(|id| currency_map.get(&id).cloned()),
            team: process.team_id.and_then(|id| team_map.get(&id).cloned()),
            pnl_info: info,
            has_crash_error: crashed.contains(&process.id),
            is_running: running.get(index).copied().flatten(),
        };
        snapshot.insert(process.name, entry);
    }

    Ok(snapshot)
}

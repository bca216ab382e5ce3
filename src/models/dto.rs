//pour les requêtes et les réponses structurées
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::strategy::ProcessState;
use crate::models::teams::TeamType;
use crate::models::{pending_process, pnl_info};

/// Distingue "champ absent" (None) de "champ à null" (Some(None)) dans un PATCH
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn default_true() -> bool {
    true
}

// ----------------------------------------------------------------------------
// Listes
// ----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

// ----------------------------------------------------------------------------
// Users / Groups
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct UserCreate {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(length(min = 8, message = "Password must contain at least 8 characters."))]
    pub password: String,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UserPatch {
    #[validate(email)]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(length(min = 8, message = "Password must contain at least 8 characters."))]
    pub password: Option<String>,
    pub is_staff: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GroupPayload {
    #[validate(length(min = 1, max = 150))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GroupPatch {
    #[validate(length(min = 1, max = 150))]
    pub name: Option<String>,
}

// ----------------------------------------------------------------------------
// Référentiels: Box, Region, Currency, Teams
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct BoxCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub region_id: i32,
    pub ip_address: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BoxPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub region_id: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub ip_address: Option<Option<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegionCreate {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub timezone: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegionPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CurrencyCreate {
    #[validate(length(equal = 3, message = "Currency symbol must be 3 letters."))]
    pub symbol: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CurrencyPatch {
    #[validate(length(equal = 3, message = "Currency symbol must be 3 letters."))]
    pub symbol: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TeamCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub team_type: Option<TeamType>,
    #[validate(length(max = 20))]
    pub slack_id: Option<String>,
    #[validate(length(max = 20))]
    pub secondary_slack_id: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[serde(default)]
    pub api_hash: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TeamPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub team_type: Option<TeamType>,
    #[serde(default, deserialize_with = "nullable")]
    pub slack_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub secondary_slack_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    pub api_hash: Option<String>,
}

// ----------------------------------------------------------------------------
// Strategy / Process
// ----------------------------------------------------------------------------

/// Données d'un process à créer. Tout est optionnel ici: les champs requis
/// sont vérifiés par StrategyService pour produire des erreurs par champ.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StrategyDraft {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub state: Option<ProcessState>,
    pub owner_id: Option<i32>,
    pub box_id: Option<i32>,
    pub e_region_id: Option<i32>,
    pub team_id: Option<i32>,
    pub currency_id: Option<i32>,
    #[validate(range(min = 0, max = 255))]
    pub cpu: Option<i32>,
    #[validate(length(max = 500))]
    pub config_path: Option<String>,
    pub description: Option<String>,
}

impl StrategyDraft {
    /// Champs actuels du pending process, base de la fusion pour create_strategy
    pub fn from_pending(pending: &pending_process::Model) -> Self {
        Self {
            name: Some(pending.name.clone()),
            state: None,
            owner_id: Some(pending.owner_id),
            box_id: pending.box_id,
            e_region_id: pending.e_region_id,
            team_id: pending.team_id,
            currency_id: pending.currency_id,
            cpu: pending.cpu,
            config_path: pending.config_path.clone(),
            description: pending.description.clone(),
        }
    }

    /// Applique un patch par-dessus le brouillon (le patch gagne)
    pub fn overlay(mut self, patch: StrategyPatch) -> Self {
        if let Some(name) = patch.name {
            self.name = Some(name);
        }
        if let Some(state) = patch.state {
            self.state = Some(state);
        }
        if let Some(owner_id) = patch.owner_id {
            self.owner_id = Some(owner_id);
        }
        if let Some(box_id) = patch.box_id {
            self.box_id = Some(box_id);
        }
        if let Some(e_region_id) = patch.e_region_id {
            self.e_region_id = Some(e_region_id);
        }
        if let Some(team_id) = patch.team_id {
            self.team_id = team_id;
        }
        if let Some(currency_id) = patch.currency_id {
            self.currency_id = currency_id;
        }
        if let Some(cpu) = patch.cpu {
            self.cpu = cpu;
        }
        if let Some(config_path) = patch.config_path {
            self.config_path = config_path;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct StrategyPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub state: Option<ProcessState>,
    pub owner_id: Option<i32>,
    pub box_id: Option<i32>,
    pub e_region_id: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub team_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub currency_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cpu: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub config_path: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    /// Autorise un coeur CPU déjà utilisé par un autre process de la même box
    #[serde(default)]
    pub allow_force_cpu_update: bool,
}

/// POST /process/api_post: les relations sont données par leur nom (slug)
#[derive(Debug, Deserialize, Validate)]
pub struct StrategySlugRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub state: Option<ProcessState>,
    #[serde(rename = "box")]
    pub box_name: Option<String>,
    pub owner: Option<String>,
    pub currency: Option<String>,
    #[serde(rename = "ERegion")]
    pub e_region: Option<String>,
    pub team: Option<String>,
    #[validate(range(min = 0, max = 255))]
    pub cpu: Option<i32>,
    #[validate(length(max = 500))]
    pub config_path: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CopyProcessRequest {
    pub new_name: Option<String>,
    pub new_box: Option<i32>,
    #[serde(default)]
    pub copy_trading_session_flag: bool,
    #[serde(default)]
    pub copy_universal_error_flag: bool,
    #[serde(default)]
    pub copy_reports_flag: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PnlQuery {
    pub region_name: Option<String>,
    pub strategy_names: Option<String>,
}

/// Une ligne de la réponse PnL
#[derive(Debug, Clone, Serialize)]
pub struct PnlEntry {
    pub id: i32,
    pub name: String,
    pub state: ProcessState,
    #[serde(rename = "box")]
    pub box_name: Option<String>,
    pub box_region: Option<String>,
    pub region: Option<String>,
    pub currency: Option<String>,
    pub team: Option<String>,
    pub pnl_info: pnl_info::Model,
    pub has_crash_error: bool,
    /// None si le statut d'exécution n'a pas pu être déterminé
    pub is_running: Option<bool>,
}

// ----------------------------------------------------------------------------
// Pending process
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct PendingProcessCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub box_id: Option<i32>,
    pub e_region_id: Option<i32>,
    pub team_id: Option<i32>,
    pub currency_id: Option<i32>,
    #[validate(range(min = 0, max = 255))]
    pub cpu: Option<i32>,
    #[validate(length(max = 500))]
    pub config_path: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct PendingProcessPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub box_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub e_region_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub team_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub currency_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub cpu: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub config_path: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
}

/// PATCH /pending_process/{id}: {"patch": {...}, "create_strategy": bool}
#[derive(Debug, Default, Deserialize)]
pub struct PendingUpdateRequest {
    #[serde(default)]
    pub patch: serde_json::Map<String, Value>,
    #[serde(default)]
    pub create_strategy: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompletePendingRequest {
    #[serde(default)]
    pub mark_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingActionsQuery {
    pub process_id: Option<String>,
    pub process_type: Option<String>,
}

/// Résumé d'un objet lié (id + libellé éventuel)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedEntry {
    pub id: i32,
    pub msg: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorMailSummary {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingActions {
    pub process: String,
    pub subteam: Vec<FormattedEntry>,
    pub killswitch: Option<FormattedEntry>,
    pub errormail: ErrorMailSummary,
    pub binrelease: Vec<FormattedEntry>,
    pub unittest: Vec<FormattedEntry>,
    pub strat_userid_mapping: Vec<FormattedEntry>,
    pub phl_mapping: Vec<FormattedEntry>,
    pub pnl_info: Option<FormattedEntry>,
    pub pnllimits: Option<FormattedEntry>,
}

// ----------------------------------------------------------------------------
// Kill switch
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct KillSwitchCreate {
    pub strategy_id: i32,
    #[serde(default)]
    pub engaged: bool,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct KillSwitchPatch {
    pub engaged: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub reason: Option<Option<String>>,
}

// ----------------------------------------------------------------------------
// Préférences utilisateur
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegionStrategyManageCreate {
    pub region_id: i32,
    #[serde(default)]
    pub strategies: Vec<String>,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegionStrategyManagePatch {
    pub region_id: Option<i32>,
    pub strategies: Option<Vec<String>>,
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WatchlistCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub config: Value,
}

#[derive(Debug, Deserialize, Validate)]
pub struct WatchlistPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub config: Option<Value>,
}

// ----------------------------------------------------------------------------
// Taux de change
// ----------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct ExchangeRatesCreate {
    pub applied_date: NaiveDate,
    #[validate(length(equal = 3))]
    pub base_currency: String,
    pub rates: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ExchangeRatesPatch {
    pub applied_date: Option<NaiveDate>,
    #[validate(length(equal = 3))]
    pub base_currency: Option<String>,
    pub rates: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CurrencyRatesQuery {
    pub request_date: Option<String>,
}

// ----------------------------------------------------------------------------
// Token / annuaire
// ----------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct TokenRefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TokenRefreshResponse {
    pub access: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct DirectoryQuery {
    pub is_api: Option<String>,
    pub users: Option<String>,
}

/// Une ligne de l'annuaire (profil + équipes + congé du jour)
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    pub user_id: i32,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub designation: Option<String>,
    pub phone: Option<String>,
    pub doj: Option<NaiveDate>,
    pub image_location: Option<String>,
    pub teams: String,
    pub on_holiday: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryLookup {
    pub email: String,
    pub teams: String,
    pub doj: Option<NaiveDate>,
    pub image_location: String,
}

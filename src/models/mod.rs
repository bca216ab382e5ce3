// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table du schéma existant (SeaORM).
//
// Liste des modules:
//   - users, groups : comptes et groupes (tables auth_*)
//   - teams, team_membership, team_lead, user_profile : annuaire
//   - region, boxes, currency : référentiels
//   - strategy : process de trading (ACTIVE / DORMANT / INACTIVE)
//   - pending_process : process en attente d'approbation
//   - kill_switch : arrêt d'urgence (1:1 avec strategy)
//   - subteam, subteam_member, subteam_strategy : sous-équipes
//   - pnl_info, pnl_limits, error_mail, bin_release, unit_test_config,
//     strategy_user_mapping, phl_name_mapping, trading_session,
//     universal_error_route, report_subscription : satellites d'un process
//   - region_strategy_manage, user_watchlist_config : préférences utilisateur
//   - exchange_rates : taux de change par date d'application
//   - dto : Data Transfer Objects pour les requêtes / réponses API
//
// Points d'attention:
//   - Le schéma et les migrations sont gérés ailleurs, ces modèles le reflètent
//   - Les satellites d'un process sont supprimés en cascade avec lui
//
// ============================================================================

pub mod users;
pub mod groups;
pub mod teams;
pub mod team_membership;
pub mod team_lead;
pub mod user_profile;
pub mod region;
pub mod boxes;
pub mod currency;
pub mod strategy;
pub mod pending_process;
pub mod kill_switch;
pub mod subteam;
pub mod subteam_member;
pub mod subteam_strategy;
pub mod pnl_info;
pub mod pnl_limits;
pub mod error_mail;
pub mod bin_release;
pub mod unit_test_config;
pub mod strategy_user_mapping;
pub mod phl_name_mapping;
pub mod trading_session;
pub mod universal_error_route;
pub mod report_subscription;
pub mod region_strategy_manage;
pub mod user_watchlist_config;
pub mod exchange_rates;
pub mod dto;

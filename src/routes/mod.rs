// ============================================================================
// ROUTES
// ============================================================================
//
//   /api/health                         -> état du service
//   /api/token/refresh                  -> refresh JWT (sans authentification)
//   /api/{users,groups,box,teams,currency,region,region_strategy_manage,
//         pending_process,killswitch,process,exchange_rates,
//         user_watchlist_config}        -> viewsets CRUD (Bearer requis)
//   /directory/{users,inactive_users}   -> annuaire
//
// ============================================================================

/// Application de test complète sur une base sqlite en mémoire
#[cfg(test)]
macro_rules! test_app {
    ($db:expr, $store:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($db.clone()))
                .app_data(actix_web::web::Data::new(crate::db::test_support::test_config()))
                .app_data(actix_web::web::Data::new(crate::db::test_support::collaborators($store)))
                .configure(crate::routes::configure_routes),
        )
        .await
    };
}
#[cfg(test)]
pub(crate) use test_app;

pub mod boxes;
pub mod currency;
pub mod directory;
pub mod exchange_rates;
pub mod groups;
pub mod health;
pub mod killswitch;
pub mod pending_process;
pub mod process;
pub mod region;
pub mod region_strategy_manage;
pub mod teams;
pub mod token;
pub mod user_watchlist_config;
pub mod users;
pub mod viewset;

use std::sync::Arc;

use actix_web::web;

use crate::cache::KvStore;
use crate::services::pnl_service::RunStatusProvider;
use crate::tasks::TaskQueue;

/// Services externes partagés par les routes (web::Data)
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn KvStore>,
    pub run_status: Arc<dyn RunStatusProvider>,
    pub tasks: TaskQueue,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(viewset::json_config())
        .app_data(viewset::query_config())
        .app_data(viewset::path_config())
        .service(
            web::scope("/api")
                .service(health::health_check)
                .service(web::scope("/token").configure(token::token_routes))
                .service(web::scope("/users").configure(users::user_routes))
                .service(web::scope("/groups").configure(groups::group_routes))
                .service(web::scope("/box").configure(boxes::box_routes))
                .service(web::scope("/teams").configure(teams::teams_routes))
                .service(web::scope("/currency").configure(currency::currency_routes))
                .service(web::scope("/region").configure(region::region_routes))
                .service(
                    web::scope("/region_strategy_manage")
                        .configure(region_strategy_manage::region_strategy_manage_routes),
                )
                .service(web::scope("/pending_process").configure(pending_process::pending_process_routes))
                .service(web::scope("/killswitch").configure(killswitch::killswitch_routes))
                .service(web::scope("/process").configure(process::process_routes))
                .service(web::scope("/exchange_rates").configure(exchange_rates::exchange_rates_routes))
                .service(
                    web::scope("/user_watchlist_config")
                        .configure(user_watchlist_config::user_watchlist_config_routes),
                ),
        )
        .service(web::scope("/directory").configure(directory::directory_routes));
}

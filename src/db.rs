// connexion BD

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

use crate::config::AppConfig;

pub async fn establish_connection(config: &AppConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(20)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    Database::connect(options).await
}

/// Base sqlite en mémoire et jeux de données pour les tests
#[cfg(test)]
pub mod test_support {
    use chrono::{Duration as ChronoDuration, Utc};
    use sea_orm::{
        ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend,
        EntityTrait, Schema, Set,
    };
    use std::sync::Arc;

    use crate::cache::memory::MemoryStore;
    use crate::cache::KvStore;
    use crate::config::{AppConfig, JwtSettings};
    use crate::middleware::AuthUser;
    use crate::models::strategy::ProcessState;
    use crate::models::teams::TeamType;
    use crate::models::*;
    use crate::routes::Collaborators;
    use crate::services::access::Principal;
    use crate::services::pnl_service::HeartbeatRunStatus;
    use crate::services::strategy_service::create_kill_switch;
    use crate::tasks::TaskQueue;
    use crate::utils::jwt::{generate_token, TokenType};

    async fn create_table<C, E>(db: &C, entity: E)
    where
        C: ConnectionTrait,
        E: EntityTrait,
    {
        let schema = Schema::new(DbBackend::Sqlite);
        let statement = DbBackend::Sqlite.build(&schema.create_table_from_entity(entity));
        db.execute(statement).await.unwrap();
    }

    pub async fn setup_db() -> DatabaseConnection {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();

        create_table(&db, users::Entity).await;
        create_table(&db, groups::Entity).await;
        create_table(&db, region::Entity).await;
        create_table(&db, boxes::Entity).await;
        create_table(&db, currency::Entity).await;
        create_table(&db, teams::Entity).await;
        create_table(&db, team_membership::Entity).await;
        create_table(&db, team_lead::Entity).await;
        create_table(&db, user_profile::Entity).await;
        create_table(&db, strategy::Entity).await;
        create_table(&db, pending_process::Entity).await;
        create_table(&db, kill_switch::Entity).await;
        create_table(&db, subteam::Entity).await;
        create_table(&db, subteam_member::Entity).await;
        create_table(&db, subteam_strategy::Entity).await;
        create_table(&db, pnl_info::Entity).await;
        create_table(&db, pnl_limits::Entity).await;
        create_table(&db, error_mail::Entity).await;
        create_table(&db, bin_release::Entity).await;
        create_table(&db, unit_test_config::Entity).await;
        create_table(&db, strategy_user_mapping::Entity).await;
        create_table(&db, phl_name_mapping::Entity).await;
        create_table(&db, trading_session::Entity).await;
        create_table(&db, universal_error_route::Entity).await;
        create_table(&db, report_subscription::Entity).await;
        create_table(&db, region_strategy_manage::Entity).await;
        create_table(&db, user_watchlist_config::Entity).await;
        create_table(&db, exchange_rates::Entity).await;

        db
    }

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            redis_url: "redis://127.0.0.1:6379/".to_string(),
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            jwt: JwtSettings {
                secret: "test-secret".to_string(),
                access_ttl: ChronoDuration::minutes(5),
                refresh_ttl: ChronoDuration::hours(1),
            },
            log_level: "debug".to_string(),
            log_json: false,
            default_page_size: 50,
        }
    }

    pub fn collaborators(store: Arc<MemoryStore>) -> Collaborators {
        let store: Arc<dyn KvStore> = store;
        Collaborators {
            store: store.clone(),
            run_status: Arc::new(HeartbeatRunStatus::new(store.clone())),
            tasks: TaskQueue::new(store),
        }
    }

    /// Header Authorization avec un access token valide pour `user`
    pub fn bearer(user: &users::Model) -> (&'static str, String) {
        let token = generate_token(user.id, &user.username, TokenType::Access, &test_config().jwt).unwrap();
        ("Authorization", format!("Bearer {}", token))
    }

    pub fn auth_for(user: &users::Model) -> AuthUser {
        AuthUser {
            user_id: user.id,
            username: user.username.clone(),
        }
    }

    pub async fn load_principal(db: &DatabaseConnection, user: &users::Model) -> Principal {
        Principal::load(db, &auth_for(user)).await.unwrap()
    }

    /// Un owner staff, une région APAC et une box box-01
    pub struct Fixture {
        pub owner: users::Model,
        pub apac: region::Model,
        pub box_01: boxes::Model,
    }

    impl Fixture {
        pub async fn new(db: &DatabaseConnection) -> Self {
            let owner = insert_user(db, "owner", true).await;
            let apac = insert_region(db, "APAC").await;
            let box_01 = insert_box(db, "box-01", apac.id).await;
            Self { owner, apac, box_01 }
        }
    }

    pub async fn insert_user(db: &DatabaseConnection, username: &str, is_staff: bool) -> users::Model {
        users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            first_name: Set(username.to_string()),
            last_name: Set(String::new()),
            password: Set("pbkdf2_sha256$1000$salt$hash".to_string()),
            is_staff: Set(is_staff),
            is_active: Set(true),
            is_superuser: Set(false),
            date_joined: Set(Utc::now()),
            last_login: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn deactivate_user(db: &DatabaseConnection, user_id: i32) {
        let user = users::Entity::find_by_id(user_id).one(db).await.unwrap().unwrap();
        let mut active: users::ActiveModel = user.into();
        active.is_active = Set(false);
        active.update(db).await.unwrap();
    }

    pub async fn insert_region(db: &DatabaseConnection, name: &str) -> region::Model {
        region::ActiveModel {
            name: Set(name.to_string()),
            timezone: Set("Asia/Kolkata".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn insert_box(db: &DatabaseConnection, name: &str, region_id: i32) -> boxes::Model {
        boxes::ActiveModel {
            name: Set(name.to_string()),
            region_id: Set(region_id),
            ip_address: Set(None),
            is_active: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn insert_currency(db: &DatabaseConnection, symbol: &str) -> currency::Model {
        currency::ActiveModel {
            symbol: Set(symbol.to_string()),
            name: Set(symbol.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn insert_team(db: &DatabaseConnection, name: &str) -> teams::Model {
        teams::ActiveModel {
            slack_id: Set(None),
            secondary_slack_id: Set(None),
            name: Set(name.to_string()),
            team_type: Set(TeamType::Internal),
            email: Set(None),
            api_hash: Set(String::new()),
            created_date: Set(Some(Utc::now())),
            modified_date: Set(Some(Utc::now())),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn add_team_member(db: &DatabaseConnection, team_id: i32, user_id: i32) {
        team_membership::ActiveModel {
            user_id: Set(user_id),
            team_id: Set(team_id),
            date_joined: Set(Utc::now()),
            created_date: Set(None),
            modified_date: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    pub async fn add_team_lead(db: &DatabaseConnection, team_id: i32, user_id: i32) {
        team_lead::ActiveModel {
            teams_id: Set(team_id),
            user_id: Set(user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    pub async fn insert_profile(db: &DatabaseConnection, user_id: i32) -> user_profile::Model {
        user_profile::ActiveModel {
            user_id: Set(user_id),
            primary_team_id: Set(None),
            box_username: Set(None),
            is_internal: Set(true),
            sound_choice: Set(false),
            slack_id: Set(None),
            asana_id: Set(None),
            phone: Set(None),
            extension_no: Set(None),
            image_location: Set(None),
            institution: Set(None),
            dob: Set(None),
            doj: Set(None),
            emp_id: Set(None),
            anniversary_date: Set(None),
            designation: Set(Some("Developer".to_string())),
            created_date: Set(None),
            modified_date: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    /// Process DORMANT avec son kill switch
    pub async fn insert_strategy(
        db: &DatabaseConnection,
        name: &str,
        owner_id: i32,
        box_id: i32,
        e_region_id: i32,
    ) -> strategy::Model {
        let now = Utc::now();
        let created = strategy::ActiveModel {
            name: Set(name.to_string()),
            state: Set(ProcessState::Dormant),
            owner_id: Set(owner_id),
            box_id: Set(box_id),
            e_region_id: Set(e_region_id),
            team_id: Set(None),
            currency_id: Set(None),
            cpu: Set(None),
            config_path: Set(None),
            description: Set(None),
            created_date: Set(now),
            modified_date: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
        create_kill_switch(db, created.id).await.unwrap();
        created
    }

    pub async fn set_state(db: &DatabaseConnection, strategy_id: i32, state: ProcessState) {
        let process = strategy::Entity::find_by_id(strategy_id).one(db).await.unwrap().unwrap();
        let mut active: strategy::ActiveModel = process.into();
        active.state = Set(state);
        active.update(db).await.unwrap();
    }

    pub async fn insert_subteam(db: &DatabaseConnection, name: &str, api_user_id: Option<i32>) -> subteam::Model {
        subteam::ActiveModel {
            name: Set(name.to_string()),
            api_user_id: Set(api_user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn add_subteam_member(db: &DatabaseConnection, subteam_id: i32, user_id: i32) {
        subteam_member::ActiveModel {
            subteam_id: Set(subteam_id),
            user_id: Set(user_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    pub async fn link_subteam_strategy(db: &DatabaseConnection, subteam_id: i32, strategy_id: i32) {
        subteam_strategy::ActiveModel {
            subteam_id: Set(subteam_id),
            strategy_id: Set(strategy_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    pub async fn insert_pending(
        db: &DatabaseConnection,
        name: &str,
        owner_id: i32,
        box_id: Option<i32>,
        e_region_id: Option<i32>,
    ) -> pending_process::Model {
        let now = Utc::now();
        pending_process::ActiveModel {
            name: Set(name.to_string()),
            owner_id: Set(owner_id),
            process_id: Set(None),
            box_id: Set(box_id),
            e_region_id: Set(e_region_id),
            team_id: Set(None),
            currency_id: Set(None),
            cpu: Set(None),
            config_path: Set(None),
            description: Set(None),
            created_date: Set(now),
            modified_date: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    pub async fn link_pending(
        db: &DatabaseConnection,
        pending: pending_process::Model,
        process_id: i32,
    ) -> pending_process::Model {
        let mut active: pending_process::ActiveModel = pending.into();
        active.process_id = Set(Some(process_id));
        active.update(db).await.unwrap()
    }

    pub async fn insert_error_mail(db: &DatabaseConnection, strategy_id: i32, error_type: &str) {
        error_mail::ActiveModel {
            strategy_id: Set(strategy_id),
            error_type: Set(error_type.to_string()),
            recipients: Set("desk@example.com".to_string()),
            subject: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    pub async fn insert_pnl_info(db: &DatabaseConnection, strategy_id: i32, book: &str) {
        pnl_info::ActiveModel {
            strategy_id: Set(strategy_id),
            book: Set(book.to_string()),
            pnl_source: Set("exchange".to_string()),
            account: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    pub async fn insert_pnl_limits(db: &DatabaseConnection, strategy_id: i32, daily_loss_limit: i64) {
        pnl_limits::ActiveModel {
            strategy_id: Set(strategy_id),
            daily_loss_limit: Set(rust_decimal::Decimal::new(daily_loss_limit, 0)),
            max_drawdown: Set(rust_decimal::Decimal::new(daily_loss_limit * 2, 0)),
            max_position: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    pub async fn insert_trading_session(db: &DatabaseConnection, strategy_id: i32) {
        trading_session::ActiveModel {
            strategy_id: Set(strategy_id),
            start_time: Set("09:15".to_string()),
            end_time: Set("15:30".to_string()),
            days: Set("MON-FRI".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    pub async fn insert_report_subscription(db: &DatabaseConnection, strategy_id: i32) {
        report_subscription::ActiveModel {
            strategy_id: Set(strategy_id),
            report_name: Set("daily_pnl".to_string()),
            recipients: Set("desk@example.com".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }
}

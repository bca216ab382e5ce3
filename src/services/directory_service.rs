// Annuaire: profils, équipes et congés du jour

use std::collections::HashMap;

use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde_json::{Map, Value};

use crate::models::dto::{DirectoryEntry, DirectoryLookup};
use crate::models::{team_membership, teams, user_profile, users};

pub const DEFAULT_PROFILE_IMAGE: &str = "/static/img/profile/default.jpg";

/// Noms d'équipes par utilisateur, dans l'ordre d'adhésion, joints par ", "
async fn team_names(db: &DatabaseConnection, user_ids: Vec<i32>) -> Result<HashMap<i32, String>, DbErr> {
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let memberships = team_membership::Entity::find()
        .filter(team_membership::Column::UserId.is_in(user_ids))
        .order_by_asc(team_membership::Column::Id)
        .find_also_related(teams::Entity)
        .all(db)
        .await?;

    let mut names: HashMap<i32, Vec<String>> = HashMap::new();
    for (membership, team) in memberships {
        if let Some(team) = team {
            names.entry(membership.user_id).or_default().push(team.name);
        }
    }

    Ok(names
        .into_iter()
        .map(|(user_id, teams)| (user_id, teams.join(", ")))
        .collect())
}

/// Profils des utilisateurs actifs (ou inactifs), triés par username
pub async fn list_profiles(
    db: &DatabaseConnection,
    active: bool,
    holidays: &Map<String, Value>,
) -> Result<Vec<DirectoryEntry>, DbErr> {
    let rows = user_profile::Entity::find()
        .find_also_related(users::Entity)
        .filter(users::Column::IsActive.eq(active))
        .order_by_asc(users::Column::Username)
        .all(db)
        .await?;

    let user_ids = rows.iter().map(|(profile, _)| profile.user_id).collect();
    let mut teams = team_names(db, user_ids).await?;

    Ok(rows
        .into_iter()
        .filter_map(|(profile, user)| user.map(|user| (profile, user)))
        .map(|(profile, user)| DirectoryEntry {
            user_id: user.id,
            on_holiday: holidays.contains_key(&user.username),
            teams: teams.remove(&user.id).unwrap_or_default(),
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            designation: profile.designation,
            phone: profile.phone,
            doj: profile.doj,
            image_location: profile.image_location,
        })
        .collect())
}

/// Recherche par usernames pour les autres services
pub async fn lookup_users(db: &DatabaseConnection, usernames: Vec<String>) -> Result<Vec<DirectoryLookup>, DbErr> {
    let found = users::Entity::find()
        .filter(users::Column::Username.is_in(usernames))
        .order_by_asc(users::Column::Username)
        .find_also_related(user_profile::Entity)
        .all(db)
        .await?;

    let user_ids = found.iter().map(|(user, _)| user.id).collect();
    let mut teams = team_names(db, user_ids).await?;

    Ok(found
        .into_iter()
        .map(|(user, profile)| DirectoryLookup {
            teams: teams.remove(&user.id).unwrap_or_default(),
            email: user.email,
            doj: profile.and_then(|p| p.doj),
            image_location: DEFAULT_PROFILE_IMAGE.to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::*;

    #[actix_web::test]
    async fn test_active_and_inactive_lists() {
        let db = setup_db().await;
        let bob = insert_user(&db, "bob", false).await;
        let alice = insert_user(&db, "alice", false).await;
        let gone = insert_user(&db, "gone", false).await;
        for user in [&bob, &alice, &gone] {
            insert_profile(&db, user.id).await;
        }
        deactivate_user(&db, gone.id).await;

        let desk = insert_team(&db, "Desk").await;
        let ops = insert_team(&db, "Ops").await;
        add_team_member(&db, desk.id, alice.id).await;
        add_team_member(&db, ops.id, alice.id).await;

        let mut holidays = Map::new();
        holidays.insert("bob".into(), Value::String("Vacation".into()));

        let active = list_profiles(&db, true, &holidays).await.unwrap();
        let names: Vec<&str> = active.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
        assert_eq!(active[0].teams, "Desk, Ops");
        assert!(active[1].on_holiday);

        let inactive = list_profiles(&db, false, &holidays).await.unwrap();
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].username, "gone");
    }

    #[actix_web::test]
    async fn test_lookup_uses_default_image() {
        let db = setup_db().await;
        let alice = insert_user(&db, "alice", false).await;
        insert_user(&db, "bob", false).await;
        let desk = insert_team(&db, "Desk").await;
        add_team_member(&db, desk.id, alice.id).await;

        let found = lookup_users(&db, vec!["alice".into(), "nobody".into()]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].teams, "Desk");
        assert_eq!(found[0].image_location, DEFAULT_PROFILE_IMAGE);
        assert!(found[0].doj.is_none());
    }
}

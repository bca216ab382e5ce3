use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::error::FieldErrors;

/// Résout un champ "slug" (nom lisible) en clé primaire.
/// Une valeur inconnue ajoute une erreur sur `field` et renvoie None.
pub async fn resolve<E, C>(
    db: &C,
    field: &str,
    column: E::Column,
    slug_name: &str,
    value: &str,
    id_of: fn(&E::Model) -> i32,
    errors: &mut FieldErrors,
) -> Result<Option<i32>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    match E::find().filter(column.eq(value)).one(db).await? {
        Some(model) => Ok(Some(id_of(&model))),
        None => {
            errors.add(field, format!("Object with {}={} does not exist.", slug_name, value));
            Ok(None)
        }
    }
}

/// Comme `resolve`, mais le champ est obligatoire
pub async fn resolve_required<E, C>(
    db: &C,
    field: &str,
    column: E::Column,
    slug_name: &str,
    value: Option<&str>,
    id_of: fn(&E::Model) -> i32,
    errors: &mut FieldErrors,
) -> Result<Option<i32>, DbErr>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    match value {
        Some(value) if !value.trim().is_empty() => {
            resolve::<E, C>(db, field, column, slug_name, value, id_of, errors).await
        }
        _ => {
            errors.required(field);
            Ok(None)
        }
    }
}

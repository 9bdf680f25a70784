use crate::{db::DbPool, entities::operators, errors::ServiceError};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use std::sync::Arc;
use tracing::instrument;

/// Builds the display name recorded on counts and activity entries.
/// Every mutation path goes through this one function so the fallback
/// chain stays consistent: first+last, else first, else last, else a
/// masked actor id.
pub fn format_display_name(
    actor_id: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> String {
    let first = first_name.map(str::trim).filter(|s| !s.is_empty());
    let last = last_name.map(str::trim).filter(|s| !s.is_empty());

    match (first, last) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(first), None) => first.to_string(),
        (None, Some(last)) => last.to_string(),
        (None, None) => masked_actor_id(actor_id),
    }
}

/// Masked placeholder shown when no profile name is available. Operators
/// always see something human-readable; the tail keeps it attributable.
pub fn masked_actor_id(actor_id: &str) -> String {
    let skip = actor_id.chars().count().saturating_sub(6);
    let tail: String = actor_id.chars().skip(skip).collect();
    format!("operator-{}", tail)
}

/// Service resolving actor ids to display names
#[derive(Clone)]
pub struct OperatorService {
    db: Arc<DbPool>,
}

impl OperatorService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Resolves an actor id to a display name, falling back to the masked
    /// id when no profile exists.
    #[instrument(skip(self))]
    pub async fn resolve_display_name(&self, actor_id: &str) -> Result<String, ServiceError> {
        let actor_id = actor_id.trim();
        if actor_id.is_empty() {
            return Err(ServiceError::Unauthorized(
                "an actor id is required".to_string(),
            ));
        }

        let profile = operators::Entity::find_by_id(actor_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(match profile {
            Some(p) => format_display_name(actor_id, p.first_name.as_deref(), p.last_name.as_deref()),
            None => masked_actor_id(actor_id),
        })
    }

    /// Creates or updates an operator profile.
    #[instrument(skip(self))]
    pub async fn upsert_profile(
        &self,
        actor_id: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<operators::Model, ServiceError> {
        let actor_id = actor_id.trim();
        if actor_id.is_empty() {
            return Err(ServiceError::InvalidInput(
                "operator id must not be empty".to_string(),
            ));
        }

        let existing = operators::Entity::find_by_id(actor_id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let model = match existing {
            Some(profile) => {
                let mut active: operators::ActiveModel = profile.into();
                active.first_name = Set(first_name);
                active.last_name = Set(last_name);
                active
                    .update(self.db.as_ref())
                    .await
                    .map_err(ServiceError::db_error)?
            }
            None => operators::ActiveModel {
                id: Set(actor_id.to_string()),
                first_name: Set(first_name),
                last_name: Set(last_name),
                created_at: Set(Utc::now()),
            }
            .insert(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?,
        };

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_full_name() {
        assert_eq!(
            format_display_name("user_1", Some("Ada"), Some("Lovelace")),
            "Ada Lovelace"
        );
    }

    #[test]
    fn falls_back_through_partial_names() {
        assert_eq!(format_display_name("user_1", Some("Ada"), None), "Ada");
        assert_eq!(format_display_name("user_1", None, Some("Lovelace")), "Lovelace");
        assert_eq!(
            format_display_name("user_1", Some("  "), Some("")),
            "operator-user_1"
        );
    }

    #[test]
    fn masked_id_keeps_last_six_characters() {
        assert_eq!(
            masked_actor_id("user_abcdef123456"),
            "operator-123456"
        );
        assert_eq!(masked_actor_id("ab12"), "operator-ab12");
    }
}

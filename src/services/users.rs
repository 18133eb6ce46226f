//! Profiles and plan changes

use chrono::{DateTime, Utc};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{Result, SocialLeafError};
use crate::plans::{Plan, apply_plan};
use crate::store::{Profile, Store};

/// Load the caller's profile, creating a starter profile on first login
pub async fn get_or_create_profile(
    store: &dyn Store,
    user: &AuthUser,
    name: Option<String>,
) -> Result<Profile> {
    if let Some(profile) = store.get_profile(&user.user_id).await? {
        return Ok(profile);
    }
    let email = user.email.clone().unwrap_or_default();
    info!(user_id = %user.user_id, "creating profile on first login");
    store
        .upsert_profile(Profile::new(&user.user_id, &email, name))
        .await
}

pub async fn update_name(store: &dyn Store, user: &AuthUser, name: Option<String>) -> Result<Profile> {
    let name = name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
    let mut profile = get_or_create_profile(store, user, name.clone()).await?;
    match name {
        Some(name) if profile.name.as_deref() != Some(name.as_str()) => {
            profile.name = Some(name);
            store.upsert_profile(profile).await
        }
        _ => Ok(profile),
    }
}

pub async fn update_plan(
    store: &dyn Store,
    user: &AuthUser,
    plan_name: &str,
    now: DateTime<Utc>,
) -> Result<Profile> {
    let plan = Plan::parse(plan_name.trim()).ok_or_else(|| SocialLeafError::Validation {
        message: format!(
            "Invalid plan. Must be one of: {}",
            Plan::ALL.map(|p| p.as_str()).join(", ")
        ),
    })?;
    let mut profile = get_or_create_profile(store, user, None).await?;
    apply_plan(&mut profile, plan, now);
    info!(user_id = %user.user_id, plan = plan.as_str(), "plan updated");
    store.upsert_profile(profile).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn user() -> AuthUser {
        AuthUser {
            user_id: "u1".into(),
            email: Some("u1@example.com".into()),
        }
    }

    #[tokio::test]
    async fn first_login_creates_starter_profile() {
        let store = MemoryStore::new();
        let profile = get_or_create_profile(&store, &user(), None).await.unwrap();
        assert_eq!(profile.plan.as_deref(), Some("starter"));
        assert_eq!(profile.email, "u1@example.com");
        assert!(store.get_profile("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn name_update_is_persisted() {
        let store = MemoryStore::new();
        get_or_create_profile(&store, &user(), None).await.unwrap();
        let p = update_name(&store, &user(), Some(" Ana ".into())).await.unwrap();
        assert_eq!(p.name.as_deref(), Some("Ana"));
        let stored = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn invalid_plan_is_rejected() {
        let store = MemoryStore::new();
        let err = update_plan(&store, &user(), "gold", Utc::now()).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("starter, professional, business"));
    }

    #[tokio::test]
    async fn professional_starts_trial() {
        let store = MemoryStore::new();
        let p = update_plan(&store, &user(), "professional", Utc::now()).await.unwrap();
        assert_eq!(p.plan_status.as_deref(), Some("trialing"));
        assert!(p.trial_ends_at.is_some());
    }
}

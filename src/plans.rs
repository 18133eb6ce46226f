//! Plan-based feature access

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SocialLeafError};
use crate::store::Profile;

pub const TRIAL_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Starter,
    Professional,
    Business,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    VoiceCoach,
    Vlm,
    CreatePost,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::VoiceCoach => "voice_coach",
            Feature::Vlm => "vlm",
            Feature::CreatePost => "create_post",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Feature::VoiceCoach => "AI Voice Coach",
            Feature::Vlm => "Hook Detector (VLM)",
            Feature::CreatePost => "Create Post",
        }
    }
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Starter, Plan::Professional, Plan::Business];

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Starter => "starter",
            Plan::Professional => "professional",
            Plan::Business => "business",
        }
    }

    pub fn parse(name: &str) -> Option<Plan> {
        Plan::ALL.into_iter().find(|p| p.as_str() == name)
    }

    /// Unknown or missing plan names are treated as starter
    pub fn from_profile(profile: &Profile) -> Plan {
        profile
            .plan
            .as_deref()
            .and_then(Plan::parse)
            .unwrap_or(Plan::Starter)
    }

    pub fn allows(&self, feature: Feature) -> bool {
        match (self, feature) {
            (Plan::Starter, _) => false,
            (Plan::Professional, Feature::VoiceCoach) => true,
            (Plan::Professional, _) => false,
            (Plan::Business, _) => true,
        }
    }

    /// Status and trial end applied when a user switches to this plan
    pub fn activation(&self, now: DateTime<Utc>) -> (&'static str, Option<DateTime<Utc>>) {
        match self {
            Plan::Starter => ("active", None),
            Plan::Professional | Plan::Business => {
                ("trialing", Some(now + Duration::days(TRIAL_DAYS)))
            }
        }
    }
}

pub fn can_access(profile: &Profile, feature: Feature) -> bool {
    profile.role == "developer" || Plan::from_profile(profile).allows(feature)
}

/// 403 `plan_restriction` unless the profile's plan (or developer role) grants `feature`
pub fn assert_feature_access(profile: &Profile, feature: Feature) -> Result<()> {
    if can_access(profile, feature) {
        return Ok(());
    }
    Err(SocialLeafError::PlanRestriction {
        feature: feature.as_str().to_string(),
        display_name: feature.display_name().to_string(),
        current_plan: profile
            .plan
            .clone()
            .unwrap_or_else(|| Plan::Starter.as_str().to_string()),
        required_plans: Plan::ALL
            .into_iter()
            .filter(|p| p.allows(feature))
            .map(|p| p.as_str().to_string())
            .collect(),
    })
}

/// Apply a plan change to a profile
pub fn apply_plan(profile: &mut Profile, plan: Plan, now: DateTime<Utc>) {
    let (status, trial_ends_at) = plan.activation(now);
    profile.plan = Some(plan.as_str().to_string());
    profile.plan_status = Some(status.to_string());
    profile.trial_ends_at = trial_ends_at;
}

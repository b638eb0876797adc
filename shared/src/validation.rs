use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use crate::shared_upgrade_game::SpinError;

/// Spin frame payload as sent by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SpinRequest {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub user_item_ids: Vec<String>,
    #[serde(default)]
    #[validate(length(min = 1))]
    pub site_item_ids: Vec<String>,
}

/// A spin request that passed shape validation. Ids are unique per side and
/// keep the order the client sent them in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinClaim {
    pub user_item_ids: Vec<String>,
    pub site_item_ids: Vec<String>,
}

pub fn validate_item_ids(ids: &[String]) -> Result<(), ValidationError> {
    if ids.iter().any(|id| id.trim().is_empty()) {
        return Err(ValidationError::new("blank_item_id"));
    }
    Ok(())
}

pub fn validate_spin_request(request: &SpinRequest) -> Result<SpinClaim, SpinError> {
    request.validate().map_err(|_| SpinError::InvalidRequest)?;
    validate_item_ids(&request.user_item_ids).map_err(|_| SpinError::InvalidRequest)?;
    validate_item_ids(&request.site_item_ids).map_err(|_| SpinError::InvalidRequest)?;

    Ok(SpinClaim {
        user_item_ids: dedup_ids(&request.user_item_ids),
        site_item_ids: dedup_ids(&request.site_item_ids),
    })
}

/// Drops repeated ids, keeping the first occurrence of each.
pub fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(id.clone());
        }
    }
    unique
}

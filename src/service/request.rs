//! Request records for the service operations

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AdjustPointsRequest {
    /// Defaults to the caller; another user requires the admin role
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub delta_points: i64,
    #[serde(default)]
    pub delta_experience: i64,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LikeRequest {
    pub post_id: String,
    pub target_user_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SignRequest {
    /// Defaults to the caller; another user requires the admin role
    #[serde(default)]
    pub user_id: Option<String>,
}

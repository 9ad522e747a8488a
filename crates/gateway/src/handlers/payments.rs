//! Membership status

use axum::Json;
use serde::Serialize;

use crate::middleware::CurrentUser;

#[derive(Debug, Serialize)]
pub struct MembershipStatus {
    pub status: &'static str,
}

pub async fn membership_status(current: CurrentUser) -> Json<MembershipStatus> {
    let status = if current.user.is_premium { "active" } else { "inactive" };
    Json(MembershipStatus { status })
}

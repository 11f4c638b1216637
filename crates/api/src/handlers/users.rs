//! Handlers for the caller's aggregate and achievements (`/users/me`).

use ailingo_core::types::DayKey;
use ailingo_db::models::achievement::Achievement;
use ailingo_db::models::user::UserAggregate;
use ailingo_db::repositories::{AchievementRepo, UserRepo};
use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Public view of a user's aggregate. A user who has never completed a
/// lesson has no row yet and is reported with zeroes.
#[derive(Debug, Serialize)]
pub struct UserStats {
    pub uid: String,
    pub xp_total: i64,
    pub lessons_completed_count: i64,
    pub streak: i32,
    pub last_active_date: Option<DayKey>,
}

impl UserStats {
    fn from_aggregate(uid: String, aggregate: Option<UserAggregate>) -> Self {
        match aggregate {
            Some(a) => Self {
                uid: a.uid,
                xp_total: a.xp_total,
                lessons_completed_count: a.lessons_completed_count,
                streak: a.streak,
                last_active_date: a.last_active_date,
            },
            None => Self {
                uid,
                xp_total: 0,
                lessons_completed_count: 0,
                streak: 0,
                last_active_date: None,
            },
        }
    }
}

/// GET /api/v1/users/me
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<UserStats>>> {
    let aggregate = UserRepo::find(&state.pool, &user.uid).await?;
    Ok(Json(DataResponse {
        data: UserStats::from_aggregate(user.uid, aggregate),
    }))
}

/// GET /api/v1/users/me/achievements
pub async fn list_achievements(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<Achievement>>>> {
    let achievements = AchievementRepo::list_for_user(&state.pool, &user.uid).await?;
    Ok(Json(DataResponse { data: achievements }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_aggregate_reports_zeroes() {
        let stats = UserStats::from_aggregate("learner-1".into(), None);
        assert_eq!(stats.uid, "learner-1");
        assert_eq!(stats.xp_total, 0);
        assert_eq!(stats.lessons_completed_count, 0);
        assert_eq!(stats.streak, 0);
        assert!(stats.last_active_date.is_none());
    }
}

//! Handlers for the caller's progress records (`/users/me/progress`).
//!
//! A successful write publishes a [`ProgressChange`] carrying the record's
//! before- and after-images; settlement happens asynchronously in the
//! progress trigger.

use std::collections::BTreeMap;

use ailingo_core::error::CoreError;
use ailingo_core::progress::{validate_course_id, ProgressKey, ProgressStatus};
use ailingo_core::rewards::MAX_XP_REWARD;
use ailingo_db::models::progress::{ProgressRecord, WriteProgress};
use ailingo_db::repositories::ProgressRepo;
use ailingo_events::ProgressChange;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `PUT /users/me/progress/{doc_id}`.
#[derive(Debug, Deserialize, Validate)]
pub struct WriteProgressRequest {
    /// `pending` or `completed`.
    pub status: String,
    #[validate(range(min = 0, max = MAX_XP_REWARD))]
    pub xp_reward: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CourseProgressParams {
    pub course_id: String,
}

/// PUT /api/v1/users/me/progress/{doc_id}
pub async fn put_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(doc_id): Path<String>,
    Json(input): Json<WriteProgressRequest>,
) -> AppResult<Json<DataResponse<ProgressRecord>>> {
    input.validate()?;
    let key = ProgressKey::parse(&doc_id)?;
    let status: ProgressStatus = input.status.parse()?;

    let write = ProgressRepo::write_from_client(
        &state.pool,
        &user.uid,
        &key,
        &WriteProgress {
            status,
            xp_reward: input.xp_reward,
        },
    )
    .await?;

    tracing::debug!(
        uid = %user.uid,
        doc_id = %write.after.doc_id,
        status = %status,
        created = write.before.is_none(),
        "Progress written",
    );

    let after = write.after.clone();
    state.bus.publish(ProgressChange::from_write(write));

    Ok(Json(DataResponse { data: after }))
}

/// GET /api/v1/users/me/progress/{doc_id}
pub async fn get_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(doc_id): Path<String>,
) -> AppResult<Json<DataResponse<ProgressRecord>>> {
    let key = ProgressKey::parse(&doc_id)?;
    let record = ProgressRepo::find(&state.pool, &user.uid, &key.doc_id())
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Progress",
            id: doc_id,
        }))?;
    Ok(Json(DataResponse { data: record }))
}

/// GET /api/v1/users/me/progress?course_id=...
///
/// Maps each lesson of the course the caller has touched to whether it
/// should be displayed as done.
pub async fn course_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<CourseProgressParams>,
) -> AppResult<Json<DataResponse<BTreeMap<String, bool>>>> {
    validate_course_id(&params.course_id)?;
    let records = ProgressRepo::list_for_course(&state.pool, &user.uid, &params.course_id).await?;
    let done = records
        .iter()
        .map(|r| (r.lesson_id.clone(), r.is_done()))
        .collect();
    Ok(Json(DataResponse { data: done }))
}

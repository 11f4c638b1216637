//! Reward rules applied when a completed lesson is finalized.
//!
//! Everything here is pure: the settlement transaction reads the current
//! progress and user rows, feeds them through [`plan_settlement`], and writes
//! back whatever the returned [`SettlementPlan`] says.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::types::{DayKey, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// XP awarded when neither the stored record nor the triggering write names an amount.
pub const LESSON_DEFAULT_XP: i32 = 10;

/// Streak lengths (in days) that unlock a badge.
pub const STREAK_BADGES: [i32; 3] = [3, 7, 30];

/// Upper bound on the XP a client may propose for one lesson.
pub const MAX_XP_REWARD: i32 = 1000;

/// Prefix of streak achievement codes (`STREAK_3`, `STREAK_7`, ...).
pub const STREAK_CODE_PREFIX: &str = "STREAK_";

// ---------------------------------------------------------------------------
// XP award
// ---------------------------------------------------------------------------

/// The candidate XP values for one finalization, in priority order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct XpSources {
    /// `xp_earned` already stored on the progress record.
    pub stored_xp_earned: Option<i32>,
    /// `xp_earned` carried by the triggering after-image.
    pub after_xp_earned: Option<i32>,
    /// `xp_reward` proposed by the client in the after-image.
    pub after_xp_reward: Option<i32>,
}

impl XpSources {
    /// First present value, falling back to [`LESSON_DEFAULT_XP`].
    pub fn resolve(&self) -> i32 {
        self.stored_xp_earned
            .or(self.after_xp_earned)
            .or(self.after_xp_reward)
            .unwrap_or(LESSON_DEFAULT_XP)
    }
}

// ---------------------------------------------------------------------------
// Streak
// ---------------------------------------------------------------------------

/// Calendar day of `now` as seen from `offset`.
pub fn day_key(now: Timestamp, offset: FixedOffset) -> DayKey {
    now.with_timezone(&offset).date_naive()
}

/// Streak after a finalization on `today`.
///
/// - no previous active day: `1`
/// - same day: unchanged
/// - the day after: `+1`
/// - any other gap, including a clock that moved backwards: reset to `1`
pub fn next_streak(current: i32, last_active: Option<DayKey>, today: DayKey) -> i32 {
    let Some(last) = last_active else {
        return 1;
    };
    match (today - last).num_days() {
        0 => current,
        1 => current.saturating_add(1),
        _ => 1,
    }
}

// ---------------------------------------------------------------------------
// Badges
// ---------------------------------------------------------------------------

/// A streak achievement unlocked by reaching one of [`STREAK_BADGES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakBadge {
    pub code: String,
    pub title: String,
    pub streak: i32,
}

impl StreakBadge {
    /// JSON stored in the achievement's `meta` column.
    pub fn meta(&self) -> serde_json::Value {
        serde_json::json!({ "streak": self.streak })
    }
}

/// The badge for `streak`, if it is exactly one of the thresholds.
pub fn badge_for_streak(streak: i32) -> Option<StreakBadge> {
    STREAK_BADGES.contains(&streak).then(|| StreakBadge {
        code: format!("{STREAK_CODE_PREFIX}{streak}"),
        title: format!("{streak}-day Streak"),
        streak,
    })
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Streak state read from the user aggregate. A missing aggregate is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreakState {
    pub streak: i32,
    pub last_active_date: Option<DayKey>,
}

/// What one finalization writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementPlan {
    pub xp_award: i32,
    pub today: DayKey,
    pub streak: i32,
    pub badge: Option<StreakBadge>,
}

/// Compute the reward delta for one not-yet-finalized completion.
pub fn plan_settlement(
    xp: XpSources,
    state: StreakState,
    now: Timestamp,
    offset: FixedOffset,
) -> SettlementPlan {
    let today = day_key(now, offset);
    let streak = next_streak(state.streak, state.last_active_date, today);
    SettlementPlan {
        xp_award: xp.resolve(),
        today,
        streak,
        badge: badge_for_streak(streak),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

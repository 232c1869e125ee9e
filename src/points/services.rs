use tracing::{error, info, warn};

use super::{
    dto::HistoryResponse,
    repo_types::{PointEntry, RankingRow},
};
use crate::{error::AppError, state::AppState};

/// Points for a tray photo, keyed by the number of food sections with leftovers.
pub fn score_for_leftover(sections: u8) -> Result<i64, AppError> {
    match sections {
        0 => Ok(20),
        1 => Ok(15),
        2 => Ok(10),
        3 => Ok(5),
        4 => Ok(0),
        5 => Ok(-1),
        n => Err(AppError::validation(format!(
            "leftover section count must be within 0..=5, got {n}"
        ))),
    }
}

/// Append an entry and update the user's cached total atomically.
pub async fn add_entry(
    st: &AppState,
    user_id: i64,
    delta: i64,
    reason: &str,
) -> Result<PointEntry, AppError> {
    if delta == 0 {
        return Err(AppError::validation("point must be non-zero"));
    }
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(AppError::validation("missing required field: description"));
    }

    let entry = st.store.append_point(user_id, delta, reason).await?;
    info!(user_id, entry_id = entry.id, delta, "points recorded");
    Ok(entry)
}

/// Nickname, ledger total and entries newest first, from one snapshot.
pub async fn history(st: &AppState, user_id: i64) -> Result<HistoryResponse, AppError> {
    let snapshot = st
        .store
        .ledger(user_id)
        .await?
        .ok_or(AppError::NotFound("user"))?;

    let Some(total) = snapshot.ledger_total() else {
        error!(user_id, entries = snapshot.entries.len(), "ledger total out of range");
        return Err(AppError::Internal(anyhow::anyhow!(
            "ledger total for user {user_id} exceeds i64"
        )));
    };
    if total != snapshot.user.points {
        warn!(
            user_id,
            ledger = total,
            cached = snapshot.user.points,
            "cached points diverge from ledger"
        );
    }

    Ok(HistoryResponse {
        user_id,
        nick_name: snapshot.user.nick_name,
        total_points: total,
        entries: snapshot.entries,
    })
}

pub async fn ranking(st: &AppState) -> Result<Vec<RankingRow>, AppError> {
    Ok(st.store.ranking().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::NewUser;

    async fn seed_user(st: &AppState, school_number: &str) -> i64 {
        st.store
            .insert_user(NewUser {
                name: "Kim",
                nick_name: school_number,
                school_number,
                password_hash: "$argon2id$fake",
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn scoring_table_is_exact() {
        let expected = [20, 15, 10, 5, 0, -1];
        for (sections, want) in expected.iter().enumerate() {
            assert_eq!(score_for_leftover(sections as u8).unwrap(), *want);
        }
    }

    #[test]
    fn scoring_rejects_out_of_domain() {
        for n in [6u8, 7, 100, u8::MAX] {
            assert!(matches!(score_for_leftover(n), Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn history_total_is_sum_newest_first() {
        let st = AppState::fake();
        let uid = seed_user(&st, "2021001").await;
        add_entry(&st, uid, 10, "promo").await.unwrap();
        add_entry(&st, uid, -3, "penalty").await.unwrap();

        let h = history(&st, uid).await.unwrap();
        assert_eq!(h.total_points, 7);
        assert_eq!(h.nick_name, "2021001");
        assert_eq!(h.entries.len(), 2);
        assert_eq!(h.entries[0].description, "penalty");
        assert_eq!(h.entries[1].description, "promo");
    }

    #[tokio::test]
    async fn unknown_user_is_not_found_and_nothing_written() {
        let st = AppState::fake();
        let err = add_entry(&st, 999, 5, "x").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(matches!(history(&st, 999).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn zero_delta_and_blank_reason_rejected() {
        let st = AppState::fake();
        let uid = seed_user(&st, "2021001").await;
        assert!(matches!(add_entry(&st, uid, 0, "x").await, Err(AppError::Validation(_))));
        assert!(matches!(add_entry(&st, uid, 3, "  ").await, Err(AppError::Validation(_))));
        assert!(history(&st, uid).await.unwrap().entries.is_empty());
    }

    #[tokio::test]
    async fn history_total_handles_extreme_entries_in_any_order() {
        let st = AppState::fake();
        let uid = seed_user(&st, "2021001").await;
        add_entry(&st, uid, -i64::MAX, "debit").await.unwrap();
        add_entry(&st, uid, i64::MAX, "credit").await.unwrap();
        add_entry(&st, uid, i64::MAX, "credit").await.unwrap();

        let h = history(&st, uid).await.unwrap();
        assert_eq!(h.total_points, i64::MAX);
        assert_eq!(h.entries.len(), 3);
    }

    #[tokio::test]
    async fn cached_total_overflow_is_refused_without_writing() {
        let st = AppState::fake();
        let uid = seed_user(&st, "2021001").await;
        add_entry(&st, uid, i64::MAX, "credit").await.unwrap();

        assert!(add_entry(&st, uid, 1, "one too many").await.is_err());
        let h = history(&st, uid).await.unwrap();
        assert_eq!(h.entries.len(), 1);
        assert_eq!(h.total_points, i64::MAX);
    }

    #[tokio::test]
    async fn concurrent_additions_keep_cache_and_ledger_equal() {
        let st = AppState::fake();
        let uid = seed_user(&st, "2021001").await;

        let mut handles = Vec::new();
        for i in 1..=50i64 {
            let st = st.clone();
            let delta = if i % 3 == 0 { -i } else { i };
            handles.push(tokio::spawn(async move {
                add_entry(&st, uid, delta, "batch").await.map(|_| delta)
            }));
        }
        let mut expected = 0;
        for h in handles {
            expected += h.await.unwrap().unwrap();
        }

        let h = history(&st, uid).await.unwrap();
        assert_eq!(h.entries.len(), 50);
        assert_eq!(h.total_points, expected);

        let cached = ranking(&st).await.unwrap()[0].points;
        assert_eq!(cached, expected);
    }

    #[tokio::test]
    async fn ranking_sorted_by_points_then_school_number() {
        let st = AppState::fake();
        let a = seed_user(&st, "2021003").await;
        let b = seed_user(&st, "2021001").await;
        let c = seed_user(&st, "2021002").await;
        add_entry(&st, a, 5, "x").await.unwrap();
        add_entry(&st, b, 5, "x").await.unwrap();
        add_entry(&st, c, 20, "x").await.unwrap();

        let rows = ranking(&st).await.unwrap();
        let order: Vec<&str> = rows.iter().map(|r| r.school_number.as_str()).collect();
        assert_eq!(order, ["2021002", "2021001", "2021003"]);

        let descending = |rs: &[RankingRow]| rs.windows(2).all(|w| w[0].points >= w[1].points);
        assert!(descending(&rows));
        let mut reversed = rows.clone();
        reversed.reverse();
        assert!(!descending(&reversed));
    }
}

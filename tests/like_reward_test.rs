//! Like rewards: once per (liker, post), paid to the post's author

mod common;

use common::{admin, alice, bob, ledger};
use points_ledger::ledger::{LedgerError, PointsRepository, SqlitePointsRepository};
use points_ledger::service::{AdjustPointsRequest, ErrorCode, LikeRequest};

fn like(post_id: &str, target_user_id: &str) -> LikeRequest {
    LikeRequest {
        post_id: post_id.to_string(),
        target_user_id: target_user_id.to_string(),
    }
}

#[test]
fn test_record_like_twice_rewards_once() {
    let t = ledger();
    t.service.get_user_info(&bob(), None).unwrap();
    let points = SqlitePointsRepository::new(t.db.clone());

    points.record_like("1001", "post-7", "1002").unwrap();
    let err = points.record_like("1001", "post-7", "1002").unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyExists { .. }));

    assert_eq!(t.service.get_user_info(&bob(), None).unwrap().points, 1201);
    assert_eq!(t.count("SELECT COUNT(*) FROM like_records"), 1);
}

#[test]
fn test_duplicate_like_is_business_failure() {
    let t = ledger();
    t.service.get_user_info(&bob(), None).unwrap();

    let first = t.service.process_like(&alice(), &like("post-7", "1002")).unwrap();
    assert!(first.success);

    let second = t.service.process_like(&alice(), &like("post-7", "1002")).unwrap();
    assert!(!second.success);
    assert_eq!(second.error_code, ErrorCode::AlreadyLiked);
    assert_eq!(second.message, "already liked this post");

    assert_eq!(t.service.get_user_info(&bob(), None).unwrap().points, 1201);
}

#[test]
fn test_like_reward_writes_no_ledger_entry() {
    let t = ledger();
    t.service.get_user_info(&bob(), None).unwrap();

    for post in ["p1", "p2", "p3"] {
        t.service.process_like(&alice(), &like(post, "1002")).unwrap();
    }

    assert_eq!(t.service.get_user_info(&bob(), None).unwrap().points, 1203);
    assert!(t.entries(&bob().user_id).is_empty());
    assert!(t.entries(&alice().user_id).is_empty());
}

/// Like rewards move balances outside the ledger, so a user's ledger sum
/// does not explain their balance once they have received likes.
#[test]
fn test_like_rewards_are_invisible_to_ledger_views() {
    let t = ledger();
    let bob_info = t.service.get_user_info(&bob(), None).unwrap();
    let seed = bob_info.points;

    t.service
        .adjust_points_and_experience(
            &bob(),
            &AdjustPointsRequest {
                user_id: None,
                delta_points: -100,
                delta_experience: 0,
                reason: "shop".into(),
            },
        )
        .unwrap();
    t.service.process_like(&alice(), &like("p1", "1002")).unwrap();
    t.service.process_like(&admin(), &like("p1", "1002")).unwrap();

    let balance = t.service.get_user_info(&bob(), None).unwrap().points;
    let ledger_sum: i64 = t.entries(&bob().user_id).iter().map(|e| e.points).sum();

    assert_eq!(balance - seed, -98);
    assert_eq!(ledger_sum, -100);
    assert_ne!(balance - seed, ledger_sum);

    // Monthly consumption only sees the ledger
    let stats = t.service.get_admin_stats(&admin()).unwrap();
    assert_eq!(stats.monthly_points_used, 100);
}

#[test]
fn test_same_post_different_likers() {
    let t = ledger();
    t.service.get_user_info(&bob(), None).unwrap();

    assert!(t.service.process_like(&alice(), &like("p1", "1002")).unwrap().success);
    assert!(t.service.process_like(&admin(), &like("p1", "1002")).unwrap().success);
    assert_eq!(t.service.get_user_info(&bob(), None).unwrap().points, 1202);
}

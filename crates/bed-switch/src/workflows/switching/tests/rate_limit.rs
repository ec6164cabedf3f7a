use chrono::Duration;

use super::common::*;
use crate::workflows::switching::domain::{
    ApproverId, BedId, PropertyId, RoomId, SwitchRequest, SwitchRequestDraft, SwitchRequestId,
    SwitchRequestState, TenantId,
};
use crate::workflows::switching::error::SwitchError;
use crate::workflows::switching::rate_limit::{RateLimiter, WindowPolicy};

fn pending_on(days_ago: i64, id: &str) -> SwitchRequest {
    SwitchRequestDraft::new(
        TenantId::new(TENANT),
        PropertyId::new("P1"),
        RoomId::new("R1"),
        BedId::new("B1"),
        RoomId::new("R2"),
        BedId::new("B2"),
    )
    .expect("valid draft")
    .into_pending(SwitchRequestId::new(id), start() - Duration::days(days_ago))
}

#[test]
fn pending_request_inside_window_blocks() {
    let limiter = RateLimiter::default();
    let history = vec![pending_on(10, "swr-a")];

    assert!(!limiter.can_submit(&history, start()));
    match limiter.check(&TenantId::new(TENANT), &history, start()) {
        Err(SwitchError::RateLimited { eligible_after, .. }) => {
            assert_eq!(eligible_after, Some(start() + Duration::days(20)));
        }
        other => panic!("expected rate limited, got {other:?}"),
    }
}

#[test]
fn window_edge_is_inclusive() {
    let limiter = RateLimiter::default();
    let history = vec![pending_on(30, "swr-a")];

    assert!(!limiter.can_submit(&history, start()));
    assert!(limiter.can_submit(&history, start() + Duration::seconds(1)));
}

#[test]
fn rolling_window_frees_tenant_once_request_ages_out() {
    let limiter = RateLimiter::new(30, WindowPolicy::Rolling);
    let history = vec![pending_on(31, "swr-a")];

    assert!(limiter.can_submit(&history, start()));
}

#[test]
fn until_resolved_keeps_blocking_stale_requests() {
    let limiter = RateLimiter::new(30, WindowPolicy::UntilResolved);
    let history = vec![pending_on(120, "swr-a")];

    match limiter.check(&TenantId::new(TENANT), &history, start()) {
        Err(SwitchError::RateLimited { eligible_after, .. }) => assert_eq!(eligible_after, None),
        other => panic!("expected rate limited, got {other:?}"),
    }
}

#[test]
fn resolved_requests_never_block() {
    let limiter = RateLimiter::new(30, WindowPolicy::UntilResolved);
    let mut resolved = pending_on(1, "swr-a");
    resolved.state = SwitchRequestState::Rejected {
        resolved_at: start(),
        resolved_by: ApproverId::new(LANDLORD),
        rejection_reason: "room too small".to_string(),
    };

    assert!(limiter.can_submit(&[resolved], start()));
}

#[test]
fn blocking_request_is_the_most_recent_pending_one() {
    let limiter = RateLimiter::default();
    let history = vec![pending_on(12, "swr-old"), pending_on(3, "swr-new")];

    let blocking = limiter
        .blocking_request(&history, start())
        .expect("a request blocks");
    assert_eq!(blocking.request_id, SwitchRequestId::new("swr-new"));
}

#[test]
fn window_policy_parses_config_spellings() {
    assert_eq!("rolling".parse::<WindowPolicy>(), Ok(WindowPolicy::Rolling));
    assert_eq!(
        "Until-Resolved".parse::<WindowPolicy>(),
        Ok(WindowPolicy::UntilResolved)
    );
    assert!("forever".parse::<WindowPolicy>().is_err());
}

#[test]
fn second_submission_ten_days_later_is_rate_limited() {
    let fixture = Fixture::new();
    fixture
        .service
        .submit(&tenant(), to_b2())
        .expect("first submission");

    fixture.clock.advance(Duration::days(10));
    assert!(!fixture.service.can_submit(&tenant()).expect("check"));

    match fixture.service.submit(&tenant(), to_b3()) {
        Err(SwitchError::RateLimited { tenant_id, .. }) => {
            assert_eq!(tenant_id, TenantId::new(TENANT))
        }
        other => panic!("expected rate limited, got {other:?}"),
    }
}

#[test]
fn rolling_policy_accepts_new_submission_after_window() {
    let fixture = Fixture::new();
    fixture
        .service
        .submit(&tenant(), to_b2())
        .expect("first submission");

    fixture.clock.advance(Duration::days(31));
    fixture
        .service
        .submit(&tenant(), to_b3())
        .expect("window has elapsed");

    let history = fixture
        .service
        .store()
        .list_by_tenant(&TenantId::new(TENANT))
        .expect("history");
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(SwitchRequest::is_pending));
}

//! Rate limiter boundary tests, run under paused tokio time for
//! deterministic spacing.

use std::time::Duration;
use uuid::Uuid;

use linkup_realtime::realtime::ratelimit::RateLimiter;

#[tokio::test(start_paused = true)]
async fn test_first_event_always_allowed() {
    let limiter = RateLimiter::new(Duration::from_millis(100));
    assert!(limiter.allow(Uuid::now_v7(), "sendMessage"));
}

#[tokio::test(start_paused = true)]
async fn test_event_inside_min_interval_rejected() {
    let limiter = RateLimiter::new(Duration::from_millis(100));
    let conn = Uuid::now_v7();

    assert!(limiter.allow(conn, "sendMessage"));
    tokio::time::advance(Duration::from_millis(50)).await;
    assert!(!limiter.allow(conn, "sendMessage"));
}

#[tokio::test(start_paused = true)]
async fn test_event_outside_min_interval_accepted() {
    let limiter = RateLimiter::new(Duration::from_millis(100));
    let conn = Uuid::now_v7();

    assert!(limiter.allow(conn, "sendMessage"));
    tokio::time::advance(Duration::from_millis(150)).await;
    assert!(limiter.allow(conn, "sendMessage"));
}

#[tokio::test(start_paused = true)]
async fn test_rejection_does_not_reset_the_window() {
    let limiter = RateLimiter::new(Duration::from_millis(100));
    let conn = Uuid::now_v7();

    assert!(limiter.allow(conn, "sendMessage"));
    tokio::time::advance(Duration::from_millis(50)).await;
    assert!(!limiter.allow(conn, "sendMessage"));

    // 110ms after the accepted event, 60ms after the rejected one: the
    // window is measured from acceptance, so this passes.
    tokio::time::advance(Duration::from_millis(60)).await;
    assert!(limiter.allow(conn, "sendMessage"));
}

#[tokio::test(start_paused = true)]
async fn test_connections_are_limited_independently() {
    let limiter = RateLimiter::new(Duration::from_millis(100));
    let conn_a = Uuid::now_v7();
    let conn_b = Uuid::now_v7();

    assert!(limiter.allow(conn_a, "sendMessage"));
    assert!(limiter.allow(conn_b, "sendMessage"));
    assert!(!limiter.allow(conn_a, "sendMessage"));
    assert!(!limiter.allow(conn_b, "sendMessage"));
}

#[tokio::test(start_paused = true)]
async fn test_event_types_are_limited_independently() {
    let limiter = RateLimiter::new(Duration::from_millis(100));
    let conn = Uuid::now_v7();

    assert!(limiter.allow(conn, "sendMessage"));
    assert!(limiter.allow(conn, "reaction"));
    assert!(!limiter.allow(conn, "sendMessage"));
}

#[tokio::test(start_paused = true)]
async fn test_forget_discards_connection_state() {
    let limiter = RateLimiter::new(Duration::from_millis(100));
    let conn = Uuid::now_v7();

    assert!(limiter.allow(conn, "sendMessage"));
    assert!(!limiter.allow(conn, "sendMessage"));

    limiter.forget(conn);

    // State was discarded with the connection, so the next event is free.
    assert!(limiter.allow(conn, "sendMessage"));
}

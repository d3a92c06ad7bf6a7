use super::FanoutError;
use super::logging;
use crate::auth::AuthError;

#[test]
fn logging_init_accepts_levels() {
    // Should not panic
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("WARNING"), tracing::Level::WARN);
    assert_eq!(logging::parse_level("trace"), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("loud"), tracing::Level::INFO);
}

#[test]
fn error_kinds_match_wire_names() {
    assert_eq!(FanoutError::validation("bad lat").kind(), "validation");
    assert_eq!(FanoutError::not_found("connection c1").kind(), "not_found");
    assert_eq!(FanoutError::internal("boom").kind(), "internal");
    assert_eq!(FanoutError::from(AuthError::InvalidToken).kind(), "auth");
}

#[test]
fn only_not_found_is_benign() {
    assert!(FanoutError::not_found("connection c1").is_benign());
    assert!(!FanoutError::validation("bad lat").is_benign());
    assert!(!FanoutError::from(AuthError::InvalidToken).is_benign());
}

#[test]
fn error_messages_are_readable() {
    let err = FanoutError::not_found("connection c1");
    assert_eq!(err.to_string(), "connection c1 not found");
    let err = FanoutError::validation("latitude 91 out of range");
    assert_eq!(err.to_string(), "validation failed: latitude 91 out of range");
}

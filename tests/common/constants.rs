//! Shared constants for end-to-end tests

#![allow(dead_code)]

// ============================================================================
// Server Timing
// ============================================================================

/// How long to wait for a spawned server to answer `GET /`
pub const SERVER_READY_TIMEOUT_MS: u64 = 5000;

/// Delay between readiness polls
pub const SERVER_READY_POLL_INTERVAL_MS: u64 = 20;

/// Timeout for every request made by `TestClient`
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Patient Fixtures
// ============================================================================

pub const PATIENT_NAME: &str = "홍길동";
pub const PATIENT_BIRTH: &str = "19850315";
pub const PATIENT_BIRTH_ISO: &str = "1985-03-15";
pub const PATIENT_ID_PREFIX: &str = "850315";
pub const PATIENT_ID_SUFFIX: &str = "1234567";

pub const OTHER_PATIENT_NAME: &str = "김영희";

pub const FAMILY_CODE: &str = "F-2024-001";

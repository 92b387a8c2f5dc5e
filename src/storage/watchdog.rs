//! Watchdog descriptor: what to run against a storage and how often.

use std::time::Duration;

use thiserror::Error;

use crate::storage::rule::{dup_str, AllocationError};

/// Default number of query attempts per iteration.
pub const DEFAULT_CHECK_RETRY: u32 = 10;

/// Default cooldown between iterations.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    #[error("watchdog query is empty")]
    EmptyQuery,
    #[error("watchdog route user/database is empty")]
    EmptyRoute,
    #[error("check_retry must be at least 1")]
    ZeroCheckRetry,
    #[error("watchdog interval must be greater than zero")]
    ZeroInterval,
}

/// Settings of the lag polling watchdog of one storage.
#[derive(Debug, PartialEq, Eq)]
pub struct Watchdog {
    query: String,
    route_usr: String,
    route_db: String,
    check_retry: u32,
    interval: Duration,
}

impl Watchdog {
    pub fn new(
        query: impl Into<String>,
        route_usr: impl Into<String>,
        route_db: impl Into<String>,
    ) -> Result<Self, WatchdogError> {
        let query = query.into();
        let route_usr = route_usr.into();
        let route_db = route_db.into();
        if query.trim().is_empty() {
            return Err(WatchdogError::EmptyQuery);
        }
        if route_usr.is_empty() || route_db.is_empty() {
            return Err(WatchdogError::EmptyRoute);
        }
        Ok(Self {
            query,
            route_usr,
            route_db,
            check_retry: DEFAULT_CHECK_RETRY,
            interval: DEFAULT_INTERVAL,
        })
    }

    pub fn with_check_retry(mut self, check_retry: u32) -> Result<Self, WatchdogError> {
        if check_retry == 0 {
            return Err(WatchdogError::ZeroCheckRetry);
        }
        self.check_retry = check_retry;
        Ok(self)
    }

    pub fn with_interval(mut self, interval: Duration) -> Result<Self, WatchdogError> {
        if interval.is_zero() {
            return Err(WatchdogError::ZeroInterval);
        }
        self.interval = interval;
        Ok(self)
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn route_usr(&self) -> &str {
        &self.route_usr
    }

    pub fn route_db(&self) -> &str {
        &self.route_db
    }

    pub fn check_retry(&self) -> u32 {
        self.check_retry
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn try_copy(&self) -> Result<Self, AllocationError> {
        Ok(Self {
            query: dup_str(&self.query)?,
            route_usr: dup_str(&self.route_usr)?,
            route_db: dup_str(&self.route_db)?,
            check_retry: self.check_retry,
            interval: self.interval,
        })
    }
}

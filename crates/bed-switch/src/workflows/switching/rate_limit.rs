use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{SwitchRequest, TenantId};
use super::error::SwitchError;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// How long a pending request blocks new submissions from the same tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// A pending request blocks only while its request date is inside the window, measured
    /// against "now" at check time. Old unresolved requests stop blocking.
    #[default]
    Rolling,
    /// Any pending request blocks until it is resolved, regardless of age.
    UntilResolved,
}

impl WindowPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            WindowPolicy::Rolling => "rolling",
            WindowPolicy::UntilResolved => "until_resolved",
        }
    }
}

impl FromStr for WindowPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "rolling" => Ok(Self::Rolling),
            "until_resolved" => Ok(Self::UntilResolved),
            other => Err(format!("unknown window policy '{other}'")),
        }
    }
}

/// One pending switch request per tenant per window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiter {
    window: Duration,
    policy: WindowPolicy,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_DAYS, WindowPolicy::default())
    }
}

impl RateLimiter {
    pub fn new(window_days: u32, policy: WindowPolicy) -> Self {
        Self {
            window: Duration::days(i64::from(window_days)),
            policy,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }

    /// The most recent pending request that blocks a new submission at `now`, if any.
    pub fn blocking_request<'a>(
        &self,
        history: &'a [SwitchRequest],
        now: DateTime<Utc>,
    ) -> Option<&'a SwitchRequest> {
        history
            .iter()
            .filter(|request| request.is_pending())
            .filter(|request| match self.policy {
                WindowPolicy::Rolling => now - request.request_date <= self.window,
                WindowPolicy::UntilResolved => true,
            })
            .max_by_key(|request| request.request_date)
    }

    pub fn can_submit(&self, history: &[SwitchRequest], now: DateTime<Utc>) -> bool {
        self.blocking_request(history, now).is_none()
    }

    pub fn check(
        &self,
        tenant_id: &TenantId,
        history: &[SwitchRequest],
        now: DateTime<Utc>,
    ) -> Result<(), SwitchError> {
        match self.blocking_request(history, now) {
            None => Ok(()),
            Some(blocking) => Err(SwitchError::RateLimited {
                tenant_id: tenant_id.clone(),
                eligible_after: match self.policy {
                    WindowPolicy::Rolling => Some(blocking.request_date + self.window),
                    WindowPolicy::UntilResolved => None,
                },
            }),
        }
    }
}

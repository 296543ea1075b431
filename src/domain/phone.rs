//! Simulated phone calls and their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Call lifecycle:
///
/// ```text
/// ringing ──answer──▶ active ──hang_up──▶ ended
///    │ └──reject──▶ rejected
///    └────hang_up──▶ missed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Ringing,
    Active,
    Rejected,
    Missed,
    Ended,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Ringing => "ringing",
            CallStatus::Active => "active",
            CallStatus::Rejected => "rejected",
            CallStatus::Missed => "missed",
            CallStatus::Ended => "ended",
        }
    }

    /// Ringing or active calls occupy both parties' lines.
    pub fn is_live(&self) -> bool {
        matches!(self, CallStatus::Ringing | CallStatus::Active)
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ringing" => Ok(CallStatus::Ringing),
            "active" => Ok(CallStatus::Active),
            "rejected" => Ok(CallStatus::Rejected),
            "missed" => Ok(CallStatus::Missed),
            "ended" => Ok(CallStatus::Ended),
            other => Err(AppError::internal(format!("Unknown call status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhoneCall {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub caller_id: Uuid,
    pub callee_id: Uuid,
    pub status: CallStatus,
    pub started_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl PhoneCall {
    pub fn dial(tenant_id: Uuid, caller_id: Uuid, callee_id: Uuid) -> AppResult<Self> {
        if caller_id == callee_id {
            return Err(AppError::validation("You cannot call yourself"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            caller_id,
            callee_id,
            status: CallStatus::Ringing,
            started_at: Utc::now(),
            answered_at: None,
            ended_at: None,
        })
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.caller_id == user_id || self.callee_id == user_id
    }

    /// The other party from `user_id`'s point of view.
    pub fn peer_of(&self, user_id: Uuid) -> Uuid {
        if self.caller_id == user_id {
            self.callee_id
        } else {
            self.caller_id
        }
    }

    pub fn answer(&mut self, by: Uuid) -> AppResult<()> {
        self.require_callee(by)?;
        self.require_status(CallStatus::Ringing, "answer")?;
        self.status = CallStatus::Active;
        self.answered_at = Some(Utc::now());
        Ok(())
    }

    pub fn reject(&mut self, by: Uuid) -> AppResult<()> {
        self.require_callee(by)?;
        self.require_status(CallStatus::Ringing, "reject")?;
        self.status = CallStatus::Rejected;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    pub fn hang_up(&mut self, by: Uuid) -> AppResult<()> {
        if !self.involves(by) {
            return Err(AppError::Forbidden);
        }
        self.status = match self.status {
            CallStatus::Ringing => CallStatus::Missed,
            CallStatus::Active => CallStatus::Ended,
            other => {
                return Err(AppError::validation(format!(
                    "Cannot hang up a call that is {}",
                    other
                )))
            }
        };
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// Talk time in seconds; zero for calls that were never answered.
    pub fn duration_seconds(&self) -> i64 {
        match (self.answered_at, self.ended_at) {
            (Some(answered), Some(ended)) => (ended - answered).num_seconds().max(0),
            (Some(answered), None) => (Utc::now() - answered).num_seconds().max(0),
            _ => 0,
        }
    }

    fn require_callee(&self, by: Uuid) -> AppResult<()> {
        if self.callee_id == by {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    fn require_status(&self, expected: CallStatus, action: &str) -> AppResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Cannot {} a call that is {}",
                action, self.status
            )))
        }
    }
}

/// Call as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PhoneCallResponse {
    #[serde(flatten)]
    pub call: PhoneCall,
    pub duration_seconds: i64,
}

impl From<PhoneCall> for PhoneCallResponse {
    fn from(call: PhoneCall) -> Self {
        let duration_seconds = call.duration_seconds();
        Self {
            call,
            duration_seconds,
        }
    }
}

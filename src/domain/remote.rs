//! Remote desktop session brokerage.
//!
//! The service never touches a screen. The host agent captures frames and
//! injects input; this module only models the session lifecycle and checks
//! the shape of what gets relayed between the two parties.

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::MAX_REMOTE_FRAME_BYTES;
use crate::errors::{AppError, AppResult};

/// Largest accepted screen edge in pixels
pub const MAX_SCREEN_EDGE: u32 = 16_384;

const MAX_KEY_LENGTH: usize = 32;
const MAX_SCROLL_DELTA: i32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Active,
    Rejected,
    Closed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Active => "active",
            SessionStatus::Rejected => "rejected",
            SessionStatus::Closed => "closed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, SessionStatus::Pending | SessionStatus::Active)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "active" => Ok(SessionStatus::Active),
            "rejected" => Ok(SessionStatus::Rejected),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(AppError::internal(format!(
                "Unknown session status '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RemoteSession {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// User whose machine is being controlled
    pub host_id: Uuid,
    pub controller_id: Uuid,
    pub status: SessionStatus,
    /// Last reported screen size, taken from frames
    pub screen_width: Option<i32>,
    pub screen_height: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RemoteSession {
    pub fn request(tenant_id: Uuid, controller_id: Uuid, host_id: Uuid) -> AppResult<Self> {
        if controller_id == host_id {
            return Err(AppError::validation("You cannot control your own session"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            host_id,
            controller_id,
            status: SessionStatus::Pending,
            screen_width: None,
            screen_height: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        })
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.host_id == user_id || self.controller_id == user_id
    }

    pub fn peer_of(&self, user_id: Uuid) -> Uuid {
        if self.host_id == user_id {
            self.controller_id
        } else {
            self.host_id
        }
    }

    pub fn accept(&mut self, by: Uuid) -> AppResult<()> {
        self.require_host(by)?;
        self.require_pending("accept")?;
        self.status = SessionStatus::Active;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn reject(&mut self, by: Uuid) -> AppResult<()> {
        self.require_host(by)?;
        self.require_pending("reject")?;
        self.status = SessionStatus::Rejected;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    pub fn close(&mut self, by: Uuid) -> AppResult<()> {
        if !self.involves(by) {
            return Err(AppError::Forbidden);
        }
        if !self.status.is_open() {
            return Err(AppError::validation(format!(
                "Cannot close a session that is {}",
                self.status
            )));
        }
        self.status = SessionStatus::Closed;
        self.ended_at = Some(Utc::now());
        Ok(())
    }

    /// Only the controller of an active session may send input.
    pub fn check_input(&self, by: Uuid, event: &InputEvent) -> AppResult<()> {
        if self.controller_id != by {
            return Err(AppError::Forbidden);
        }
        self.require_active()?;
        event.validate(self.screen_size())
    }

    /// Only the host of an active session may stream frames.
    pub fn check_frame(&self, by: Uuid, frame: &Frame) -> AppResult<()> {
        if self.host_id != by {
            return Err(AppError::Forbidden);
        }
        self.require_active()?;
        frame.validate()
    }

    pub fn screen_size(&self) -> Option<(u32, u32)> {
        match (self.screen_width, self.screen_height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w as u32, h as u32)),
            _ => None,
        }
    }

    fn require_host(&self, by: Uuid) -> AppResult<()> {
        if self.host_id == by {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    fn require_pending(&self, action: &str) -> AppResult<()> {
        if self.status == SessionStatus::Pending {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Cannot {} a session that is {}",
                action, self.status
            )))
        }
    }

    fn require_active(&self) -> AppResult<()> {
        if self.status == SessionStatus::Active {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Session is {}, not active",
                self.status
            )))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Input event relayed from controller to host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    MouseMove {
        x: u32,
        y: u32,
    },
    MouseButton {
        button: MouseButton,
        pressed: bool,
        x: u32,
        y: u32,
    },
    Scroll {
        dx: i32,
        dy: i32,
    },
    Key {
        /// Key name such as `a`, `Enter` or `ArrowLeft`
        key: String,
        pressed: bool,
        #[serde(default)]
        shift: bool,
        #[serde(default)]
        ctrl: bool,
        #[serde(default)]
        alt: bool,
        #[serde(default)]
        meta: bool,
    },
}

impl InputEvent {
    /// Coordinates must fall inside the last reported screen, or inside the
    /// largest accepted screen before the first frame arrives.
    pub fn validate(&self, screen: Option<(u32, u32)>) -> AppResult<()> {
        let (width, height) = screen.unwrap_or((MAX_SCREEN_EDGE, MAX_SCREEN_EDGE));
        match self {
            InputEvent::MouseMove { x, y } | InputEvent::MouseButton { x, y, .. } => {
                if *x >= width || *y >= height {
                    return Err(AppError::validation(format!(
                        "Pointer ({}, {}) is outside the {}x{} screen",
                        x, y, width, height
                    )));
                }
            }
            InputEvent::Scroll { dx, dy } => {
                if dx.abs() > MAX_SCROLL_DELTA || dy.abs() > MAX_SCROLL_DELTA {
                    return Err(AppError::validation("Scroll delta too large"));
                }
            }
            InputEvent::Key { key, .. } => {
                let length = key.chars().count();
                if length == 0 || length > MAX_KEY_LENGTH || key.chars().any(char::is_control) {
                    return Err(AppError::validation(format!("Invalid key '{}'", key)));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    Png,
    Jpeg,
}

impl FrameFormat {
    fn matches(&self, bytes: &[u8]) -> bool {
        match self {
            FrameFormat::Png => bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
            FrameFormat::Jpeg => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        }
    }
}

/// Screen frame relayed from host to controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Frame {
    pub format: FrameFormat,
    pub width: u32,
    pub height: u32,
    /// Base64 (standard alphabet) encoded image
    pub data: String,
}

impl Frame {
    pub fn validate(&self) -> AppResult<()> {
        if self.width == 0
            || self.height == 0
            || self.width > MAX_SCREEN_EDGE
            || self.height > MAX_SCREEN_EDGE
        {
            return Err(AppError::validation(format!(
                "Frame size {}x{} is out of range",
                self.width, self.height
            )));
        }
        if self.data.len() > MAX_REMOTE_FRAME_BYTES {
            return Err(AppError::validation("Frame payload too large"));
        }
        let bytes = STANDARD
            .decode(self.data.as_bytes())
            .map_err(|_| AppError::validation("Frame data is not valid base64"))?;
        if !self.format.matches(&bytes) {
            return Err(AppError::validation(format!(
                "Frame data is not a {:?} image",
                self.format
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> (RemoteSession, Uuid, Uuid) {
        let controller = Uuid::new_v4();
        let host = Uuid::new_v4();
        (
            RemoteSession::request(Uuid::new_v4(), controller, host).unwrap(),
            controller,
            host,
        )
    }

    fn png_frame() -> Frame {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0u8; 16]);
        Frame {
            format: FrameFormat::Png,
            width: 1920,
            height: 1080,
            data: STANDARD.encode(bytes),
        }
    }

    #[test]
    fn test_lifecycle() {
        let (mut session, controller, host) = pending();
        assert!(matches!(session.accept(controller), Err(AppError::Forbidden)));
        session.accept(host).unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert!(session.started_at.is_some());
        assert!(session.reject(host).is_err());

        session.close(controller).unwrap();
        assert_eq!(session.status, SessionStatus::Closed);
        assert!(session.close(host).is_err());
    }

    #[test]
    fn test_reject_pending() {
        let (mut session, _, host) = pending();
        session.reject(host).unwrap();
        assert_eq!(session.status, SessionStatus::Rejected);
        assert!(session.accept(host).is_err());
    }

    #[test]
    fn test_cannot_request_self() {
        let me = Uuid::new_v4();
        assert!(RemoteSession::request(Uuid::new_v4(), me, me).is_err());
    }

    #[test]
    fn test_input_requires_active_controller() {
        let (mut session, controller, host) = pending();
        let click = InputEvent::MouseButton {
            button: MouseButton::Left,
            pressed: true,
            x: 10,
            y: 10,
        };
        assert!(session.check_input(controller, &click).is_err());

        session.accept(host).unwrap();
        assert!(session.check_input(controller, &click).is_ok());
        assert!(matches!(
            session.check_input(host, &click),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn test_pointer_bounded_by_screen() {
        let moved = InputEvent::MouseMove { x: 1920, y: 5 };
        assert!(moved.validate(Some((1920, 1080))).is_err());
        assert!(moved.validate(None).is_ok());
        assert!(InputEvent::MouseMove { x: 1919, y: 1079 }
            .validate(Some((1920, 1080)))
            .is_ok());
    }

    #[test]
    fn test_key_and_scroll_validation() {
        let key = |k: &str| InputEvent::Key {
            key: k.into(),
            pressed: true,
            shift: false,
            ctrl: false,
            alt: false,
            meta: false,
        };
        assert!(key("Enter").validate(None).is_ok());
        assert!(key("").validate(None).is_err());
        assert!(key("\u{7}").validate(None).is_err());
        assert!(InputEvent::Scroll { dx: 0, dy: -120 }.validate(None).is_ok());
        assert!(InputEvent::Scroll { dx: 0, dy: 20_000 }.validate(None).is_err());
    }

    #[test]
    fn test_input_event_wire_format() {
        let event: InputEvent =
            serde_json::from_str(r#"{"type":"key","key":"a","pressed":true,"ctrl":true}"#)
                .unwrap();
        assert!(matches!(event, InputEvent::Key { ctrl: true, shift: false, .. }));
    }

    #[test]
    fn test_frame_validation() {
        assert!(png_frame().validate().is_ok());

        let mut wrong_format = png_frame();
        wrong_format.format = FrameFormat::Jpeg;
        assert!(wrong_format.validate().is_err());

        let mut garbage = png_frame();
        garbage.data = "***".into();
        assert!(garbage.validate().is_err());

        let mut zero = png_frame();
        zero.width = 0;
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_frame_only_from_active_host() {
        let (mut session, controller, host) = pending();
        assert!(session.check_frame(host, &png_frame()).is_err());
        session.accept(host).unwrap();
        assert!(session.check_frame(host, &png_frame()).is_ok());
        assert!(session.check_frame(controller, &png_frame()).is_err());
    }
}

//! Typed error kinds that flow to the room-side status-event channel (spec §7).
//!
//! The teacher maps failures straight to HTTP status codes inline at each route;
//! there's no HTTP layer here; instead every failure needs to carry a stable
//! `kind` all the way out to `MatrixApi::send_message_status`, so a closed
//! `thiserror` enum replaces the teacher's ad hoc `(Status, Json<Value>)` pairs.

use crate::ids::{PartId, RemoteMessageId, RoomEventId};
use thiserror::Error;

/// One of the error kinds named in spec §7, plus the generic catch-alls.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("user is not logged in to any network account for this portal")]
    NotLoggedIn,

    #[error("reactions from a relayed user are not allowed")]
    RelayedReactionForbidden,

    #[error("message content did not match the expected parsed type")]
    UnexpectedParsedContentType,

    #[error("capability not supported: {0}")]
    CapabilityMissing(#[from] CapabilityMissing),

    #[error("edit target is older than the allowed edit window")]
    EditTargetTooOld,

    #[error("edit target has already been edited too many times")]
    EditTargetTooManyEdits,

    #[error("{action} target not found")]
    TargetMessageNotFound { action: &'static str },

    #[error("storage error: {0}")]
    Database(#[from] anyhow::Error),

    #[error("{0}")]
    Retriable(String),
}

/// Specializations of `CapabilityMissing` (spec §7).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityMissing {
    #[error("network client does not support editing messages")]
    EditsNotSupported,
    #[error("this portal does not support editing messages")]
    EditsNotSupportedInPortal,
    #[error("network client does not support reactions")]
    ReactionsNotSupported,
    #[error("network client does not support redactions")]
    RedactionsNotSupported,
    #[error("network room does not allow captions")]
    CaptionsNotAllowed,
    #[error("network room does not allow location messages")]
    LocationMessagesNotAllowed,
}

impl PortalError {
    pub fn edit_target_not_found() -> Self {
        PortalError::TargetMessageNotFound { action: "edit" }
    }

    pub fn redaction_target_not_found() -> Self {
        PortalError::TargetMessageNotFound { action: "redaction" }
    }

    /// The status kind reported alongside this error on the room-side status
    /// channel. Defaults to `Retriable` per spec §7 unless the variant names
    /// a more specific, non-retriable reason.
    pub fn status_kind(&self) -> StatusKind {
        match self {
            PortalError::NotLoggedIn
            | PortalError::RelayedReactionForbidden
            | PortalError::UnexpectedParsedContentType
            | PortalError::CapabilityMissing(_)
            | PortalError::EditTargetTooOld
            | PortalError::EditTargetTooManyEdits
            | PortalError::TargetMessageNotFound { .. } => StatusKind::Fail,
            PortalError::Database(_) | PortalError::Retriable(_) => StatusKind::Retriable,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            PortalError::NotLoggedIn => "NotLoggedIn",
            PortalError::RelayedReactionForbidden => "RelayedReactionForbidden",
            PortalError::UnexpectedParsedContentType => "UnexpectedParsedContentType",
            PortalError::CapabilityMissing(c) => c.reason(),
            PortalError::EditTargetTooOld => "EditTargetTooOld",
            PortalError::EditTargetTooManyEdits => "EditTargetTooManyEdits",
            PortalError::TargetMessageNotFound { .. } => "TargetMessageNotFound",
            PortalError::Database(_) => "DatabaseError",
            PortalError::Retriable(_) => "Retriable",
        }
    }
}

impl CapabilityMissing {
    fn reason(&self) -> &'static str {
        match self {
            CapabilityMissing::EditsNotSupported => "EditsNotSupported",
            CapabilityMissing::EditsNotSupportedInPortal => "EditsNotSupportedInPortal",
            CapabilityMissing::ReactionsNotSupported => "ReactionsNotSupported",
            CapabilityMissing::RedactionsNotSupported => "RedactionsNotSupported",
            CapabilityMissing::CaptionsNotAllowed => "CaptionsNotAllowed",
            CapabilityMissing::LocationMessagesNotAllowed => "LocationMessagesNotAllowed",
        }
    }
}

/// Default status kind is `Retriable`; a specific error can override it (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Fail,
    Retriable,
}

/// A status event emitted back to the room side for every non-ephemeral
/// room-side event handled (spec §4.5, §7).
#[derive(Debug, Clone)]
pub struct MessageStatus {
    pub event_id: RoomEventId,
    pub kind: StatusKind,
    pub reason: Option<&'static str>,
    pub message: Option<String>,
}

impl MessageStatus {
    pub fn success(event_id: RoomEventId) -> Self {
        MessageStatus {
            event_id,
            kind: StatusKind::Success,
            reason: None,
            message: None,
        }
    }

    pub fn from_error(event_id: RoomEventId, err: &PortalError) -> Self {
        MessageStatus {
            event_id,
            kind: err.status_kind(),
            reason: Some(err.reason()),
            message: Some(err.to_string()),
        }
    }
}

/// The in-room notice sent when converting an incoming network-side event
/// fails (spec §7: "An error occurred while processing an incoming <kind>").
#[derive(Debug, Clone)]
pub struct ConversionFailureNotice {
    pub text: String,
    pub internal_error: String,
}

impl ConversionFailureNotice {
    pub fn new(event_kind: &str, err: &anyhow::Error) -> Self {
        ConversionFailureNotice {
            text: format!("An error occurred while processing an incoming {event_kind}"),
            internal_error: err.to_string(),
        }
    }
}

/// Context attached to a `TargetMessageNotFound` lookup, kept for logging only.
#[derive(Debug, Clone)]
pub struct TargetLookup {
    pub remote_message_id: Option<RemoteMessageId>,
    pub part_id: Option<PartId>,
    pub room_event_id: Option<RoomEventId>,
}

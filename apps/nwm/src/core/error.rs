use thiserror::Error;
use tracing::{debug, warn};
use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::protocol::ErrorKind;

#[derive(Debug, Error)]
pub enum WmError {
    #[error("cannot open display: {0}")]
    Connect(#[from] ConnectError),

    #[error("connection to the X server failed: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("X request failed: {0}")]
    ReplyOrId(#[from] ReplyOrIdError),

    #[error("another window manager is already running")]
    OtherWmRunning,
}

const SET_INPUT_FOCUS: u8 = 42;
const CONFIGURE_WINDOW: u8 = 12;
const GRAB_BUTTON: u8 = 28;
const GRAB_KEY: u8 = 33;
const COPY_AREA: u8 = 62;
const POLY_SEGMENT: u8 = 66;
const POLY_FILL_RECTANGLE: u8 = 70;
const POLY_TEXT8: u8 = 74;

/// Errors that routinely follow a client destroying its window while
/// requests about it are still in flight.
pub fn is_expected_error(kind: ErrorKind, major_opcode: u8) -> bool {
    match kind {
        ErrorKind::Window => true,
        ErrorKind::Match => matches!(major_opcode, SET_INPUT_FOCUS | CONFIGURE_WINDOW),
        ErrorKind::Drawable => matches!(
            major_opcode,
            POLY_TEXT8 | POLY_FILL_RECTANGLE | POLY_SEGMENT | COPY_AREA
        ),
        ErrorKind::Access => matches!(major_opcode, GRAB_BUTTON | GRAB_KEY),
        _ => false,
    }
}

/// Log and ignore X11 errors (for cleanup operations)
pub fn log_and_ignore<T, E: std::fmt::Display>(result: Result<T, E>, operation: &str) {
    if let Err(e) = result {
        debug!("Ignoring error in {}: {}", operation, e);
    }
}

/// Log warning for non-critical errors
pub fn log_warn<T, E: std::fmt::Display>(result: Result<T, E>, operation: &str) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!("Warning in {}: {}", operation, e);
            None
        }
    }
}

//! The display-server seam. Window management logic only talks to the X
//! server through [`DisplayServer`], which the x11rb backend in
//! [`super::x11`] implements and tests replace with a recording mock.

use x11rb::protocol::xproto::{StackMode, Window};

use crate::core::error::WmError;
use crate::core::events::WmEvent;
use crate::input::keysyms::Keysym;
use crate::window::client::{SizeHints, WmHints};
use crate::window::layout::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    DeleteWindow,
    TakeFocus,
}

/// ICCCM `WM_STATE` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmState {
    Withdrawn = 0,
    Normal = 1,
    Iconic = 3,
}

impl WmState {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(WmState::Withdrawn),
            1 => Some(WmState::Normal),
            3 => Some(WmState::Iconic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub override_redirect: bool,
    pub viewable: bool,
    pub geometry: Rect,
    pub border_width: i32,
}

/// `WM_CLASS` split into its two strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowClass {
    pub instance: String,
    pub class: String,
}

/// What `_NET_WM_WINDOW_TYPE` and `_NET_WM_STATE` say about a new window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowType {
    pub fullscreen: bool,
    pub dialog: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerCursor {
    Normal,
    Move,
    Resize,
}

/// A client's ConfigureRequest; unset fields were not asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigureRequest {
    pub window: Window,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub border_width: Option<i32>,
    pub sibling: Option<Window>,
    pub stack_mode: Option<StackMode>,
}

impl ConfigureRequest {
    pub fn changes_size(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }

    pub fn changes_position(&self) -> bool {
        self.x.is_some() || self.y.is_some()
    }
}

/// Every request the window manager makes of the display server.
///
/// Commands are fire-and-forget: failures on windows that vanished in the
/// meantime are expected and are logged by the implementation, never
/// propagated. Only [`DisplayServer::next_event`] can fail, and only when the
/// connection itself is gone.
pub trait DisplayServer {
    fn screen_rect(&self) -> Rect;
    /// Output rectangles, falling back to the whole screen.
    fn monitor_rects(&self) -> Vec<Rect>;
    fn next_event(&self) -> Result<WmEvent, WmError>;

    fn window_attributes(&self, window: Window) -> Option<WindowAttributes>;
    fn title(&self, window: Window) -> Option<String>;
    fn class(&self, window: Window) -> Option<WindowClass>;
    fn normal_hints(&self, window: Window) -> SizeHints;
    fn wm_hints(&self, window: Window) -> WmHints;
    fn window_type(&self, window: Window) -> WindowType;
    fn transient_for(&self, window: Window) -> Option<Window>;
    fn supports_protocol(&self, window: Window, protocol: Protocol) -> bool;
    fn wm_state(&self, window: Window) -> Option<WmState>;
    fn top_level_windows(&self) -> Vec<Window>;
    fn pointer_position(&self) -> Option<(i32, i32)>;

    fn map(&self, window: Window);
    fn configure(&self, window: Window, geometry: Rect, border_width: i32);
    fn move_window(&self, window: Window, x: i32, y: i32);
    /// Pass a request from an unmanaged window through unchanged.
    fn configure_unmanaged(&self, request: &ConfigureRequest);
    fn send_configure_notify(&self, window: Window, geometry: Rect, border_width: i32);
    fn set_border_color(&self, window: Window, pixel: u32);
    /// Order windows top to bottom.
    fn restack(&self, windows: &[Window]);
    /// Drop pending EnterNotify events caused by our own restacking.
    fn discard_enter_events(&self);
    /// `None` hands focus back to the root window.
    fn set_input_focus(&self, window: Option<Window>);
    fn set_active_window(&self, window: Option<Window>);
    fn set_client_list(&self, windows: &[Window]);
    fn set_fullscreen_state(&self, window: Window, fullscreen: bool);
    fn set_wm_state(&self, window: Window, state: WmState);
    fn set_urgency(&self, window: Window, urgent: bool);
    fn send_protocol(&self, window: Window, protocol: Protocol);
    fn kill(&self, window: Window);
    fn select_client_events(&self, window: Window);
    /// Undo everything `manage` did to a window that outlives its client.
    fn release_client(&self, window: Window, border_width: i32);

    fn grab_keys(&self, keys: &[(u16, Keysym)]);
    fn ungrab_keys(&self);
    fn grab_buttons(&self, window: Window, focused: bool, buttons: &[(u16, u8)]);
    /// Let a click that focused a client through to the client.
    fn replay_pointer(&self);
    fn grab_pointer(&self, cursor: PointerCursor) -> bool;
    fn ungrab_pointer(&self);
    fn warp_pointer(&self, window: Window, x: i32, y: i32);
    fn refresh_keyboard(&self);

    fn grab_server(&self);
    fn ungrab_server(&self);
    /// While relaxed, protocol errors are dropped instead of reported.
    fn set_relaxed_errors(&self, relaxed: bool);
    fn flush(&self);
}

/// Holds the server grab and relaxed error reporting for its lifetime.
pub struct ServerGrab<'a, D: DisplayServer + ?Sized> {
    display: &'a D,
}

impl<'a, D: DisplayServer + ?Sized> ServerGrab<'a, D> {
    pub fn new(display: &'a D) -> Self {
        display.grab_server();
        display.set_relaxed_errors(true);
        Self { display }
    }
}

impl<D: DisplayServer + ?Sized> Drop for ServerGrab<'_, D> {
    fn drop(&mut self) {
        self.display.set_relaxed_errors(false);
        self.display.ungrab_server();
        self.display.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::testing::{Command, MockDisplay};

    #[test]
    fn test_server_grab_restores_on_drop() {
        let display = MockDisplay::new();
        {
            let _grab = ServerGrab::new(&display);
            display.kill(7);
        }
        assert_eq!(
            display.take_commands(),
            vec![
                Command::GrabServer,
                Command::RelaxErrors(true),
                Command::Kill(7),
                Command::RelaxErrors(false),
                Command::UngrabServer,
            ]
        );
    }

    #[test]
    fn test_wm_state_raw_values() {
        assert_eq!(WmState::from_raw(1), Some(WmState::Normal));
        assert_eq!(WmState::from_raw(3), Some(WmState::Iconic));
        assert_eq!(WmState::from_raw(2), None);
    }
}

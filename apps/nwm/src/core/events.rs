use x11rb::protocol::xproto::Window;

use super::display::ConfigureRequest;
use crate::input::keysyms::Keysym;

/// Where a button press landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Click {
    ClientWindow,
    RootWindow,
}

/// `_NET_WM_STATE` client message actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateAction {
    Remove,
    Add,
    Toggle,
}

impl StateAction {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(StateAction::Remove),
            1 => Some(StateAction::Add),
            2 => Some(StateAction::Toggle),
            _ => None,
        }
    }

    /// Resolve against the current state.
    pub fn apply(self, current: bool) -> bool {
        match self {
            StateAction::Remove => false,
            StateAction::Add => true,
            StateAction::Toggle => !current,
        }
    }
}

/// Client properties the manager tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Title,
    NormalHints,
    Hints,
    TransientFor,
    WindowType,
}

/// Everything the state machine reacts to, already decoded from the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum WmEvent {
    MapRequest { window: Window },
    UnmapNotify { window: Window, synthetic: bool },
    DestroyNotify { window: Window },
    ConfigureRequest(ConfigureRequest),
    /// The root window changed size, e.g. after an output was added.
    RootConfigured { width: i32, height: i32 },
    /// `_NET_WM_STATE` request touching `_NET_WM_STATE_FULLSCREEN`.
    FullscreenRequest { window: Window, action: StateAction },
    ActivateRequest { window: Window },
    PropertyChanged { window: Window, property: PropertyKind },
    EnterNotify { window: Window, root_x: i32, root_y: i32 },
    FocusIn { window: Window },
    KeyPress { modifiers: u16, keysym: Keysym },
    ButtonPress {
        window: Window,
        click: Click,
        modifiers: u16,
        button: u8,
        root_x: i32,
        root_y: i32,
    },
    MotionNotify { root_x: i32, root_y: i32, time: u32 },
    ButtonRelease { button: u8 },
    KeyboardMappingChanged,
    ProtocolError { expected: bool, description: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_action() {
        assert_eq!(StateAction::from_raw(3), None);
        assert!(StateAction::from_raw(1).unwrap().apply(false));
        assert!(!StateAction::from_raw(0).unwrap().apply(true));
        assert!(StateAction::Toggle.apply(false));
        assert!(!StateAction::Toggle.apply(true));
    }
}

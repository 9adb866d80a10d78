use nwm_config::TAG_COUNT;

use super::keysyms::*;
use crate::core::events::Click;
use crate::window::layout::LayoutMode;

pub const MODKEY: u16 = MOD1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launcher {
    Terminal,
    Menu,
}

/// Everything a binding can do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Spawn(Launcher),
    ToggleBar,
    FocusStack(i32),
    AdjustMasterCount(i32),
    AdjustMasterFactor(f32),
    Zoom,
    ViewPrevious,
    KillClient,
    SetLayout(LayoutMode),
    ToggleLayout,
    ToggleFloating,
    ToggleFullscreen,
    View(usize),
    ViewAll,
    ToggleView(usize),
    Tag(usize),
    TagAll,
    ToggleTag(usize),
    FocusMonitor(i32),
    TagMonitor(i32),
    MoveMouse,
    ResizeMouse,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyBinding {
    pub modifiers: u16,
    pub keysym: Keysym,
    pub action: Action,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonBinding {
    pub click: Click,
    pub modifiers: u16,
    pub button: u8,
    pub action: Action,
}

const fn key(modifiers: u16, keysym: Keysym, action: Action) -> KeyBinding {
    KeyBinding { modifiers, keysym, action }
}

pub fn default_keys() -> Vec<KeyBinding> {
    let mut keys = vec![
        key(MODKEY, XK_P, Action::Spawn(Launcher::Menu)),
        key(MODKEY | SHIFT, XK_RETURN, Action::Spawn(Launcher::Terminal)),
        key(MODKEY, XK_B, Action::ToggleBar),
        key(MODKEY, XK_J, Action::FocusStack(1)),
        key(MODKEY, XK_K, Action::FocusStack(-1)),
        key(MODKEY, XK_I, Action::AdjustMasterCount(1)),
        key(MODKEY, XK_D, Action::AdjustMasterCount(-1)),
        key(MODKEY, XK_H, Action::AdjustMasterFactor(-0.05)),
        key(MODKEY, XK_L, Action::AdjustMasterFactor(0.05)),
        key(MODKEY, XK_RETURN, Action::Zoom),
        key(MODKEY, XK_TAB, Action::ViewPrevious),
        key(MODKEY | SHIFT, XK_C, Action::KillClient),
        key(MODKEY, XK_T, Action::SetLayout(LayoutMode::Tiled)),
        key(MODKEY, XK_F, Action::SetLayout(LayoutMode::Floating)),
        key(MODKEY, XK_M, Action::SetLayout(LayoutMode::Monocle)),
        key(MODKEY, XK_SPACE, Action::ToggleLayout),
        key(MODKEY | SHIFT, XK_SPACE, Action::ToggleFloating),
        key(MODKEY | SHIFT, XK_F, Action::ToggleFullscreen),
        key(MODKEY, XK_0, Action::ViewAll),
        key(MODKEY | SHIFT, XK_0, Action::TagAll),
        key(MODKEY, XK_COMMA, Action::FocusMonitor(-1)),
        key(MODKEY, XK_PERIOD, Action::FocusMonitor(1)),
        key(MODKEY | SHIFT, XK_COMMA, Action::TagMonitor(-1)),
        key(MODKEY | SHIFT, XK_PERIOD, Action::TagMonitor(1)),
        key(MODKEY | SHIFT, XK_Q, Action::Quit),
    ];
    for tag in 0..TAG_COUNT {
        let sym = XK_1 + tag as Keysym;
        keys.push(key(MODKEY, sym, Action::View(tag)));
        keys.push(key(MODKEY | CONTROL, sym, Action::ToggleView(tag)));
        keys.push(key(MODKEY | SHIFT, sym, Action::Tag(tag)));
        keys.push(key(MODKEY | CONTROL | SHIFT, sym, Action::ToggleTag(tag)));
    }
    keys
}

pub fn default_buttons() -> Vec<ButtonBinding> {
    let button = |click, modifiers, button, action| ButtonBinding { click, modifiers, button, action };
    vec![
        button(Click::ClientWindow, MODKEY, 1, Action::MoveMouse),
        button(Click::ClientWindow, MODKEY, 2, Action::ToggleFloating),
        button(Click::ClientWindow, MODKEY, 3, Action::ResizeMouse),
    ]
}

/// First binding matching the cleaned modifiers and keysym.
pub fn find_key(keys: &[KeyBinding], modifiers: u16, keysym: Keysym) -> Option<Action> {
    keys.iter()
        .find(|k| k.keysym == keysym && k.modifiers == modifiers)
        .map(|k| k.action)
}

pub fn find_button(buttons: &[ButtonBinding], click: Click, modifiers: u16, button: u8) -> Option<Action> {
    buttons
        .iter()
        .find(|b| b.click == click && b.modifiers == modifiers && b.button == button)
        .map(|b| b.action)
}

//! Recording stand-in for the X server used by the window-management tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::Window;

use crate::core::display::{
    ConfigureRequest, DisplayServer, PointerCursor, Protocol, WindowAttributes, WindowClass, WindowType,
    WmState,
};
use crate::core::error::WmError;
use crate::core::events::WmEvent;
use crate::input::keysyms::Keysym;
use crate::window::client::{SizeHints, WmHints};
use crate::window::layout::Rect;

pub const ROOT: Window = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Map(Window),
    Configure(Window, Rect, i32),
    Move(Window, i32, i32),
    ConfigureUnmanaged(Window),
    ConfigureNotify(Window, Rect, i32),
    BorderColor(Window, u32),
    Restack(Vec<Window>),
    InputFocus(Option<Window>),
    ActiveWindow(Option<Window>),
    ClientList(Vec<Window>),
    FullscreenState(Window, bool),
    SetWmState(Window, WmState),
    Urgency(Window, bool),
    SendProtocol(Window, Protocol),
    Kill(Window),
    SelectEvents(Window),
    Release(Window, i32),
    GrabKeys(usize),
    UngrabKeys,
    GrabButtons(Window, bool),
    ReplayPointer,
    GrabPointer(PointerCursor),
    UngrabPointer,
    WarpPointer(Window, i32, i32),
    GrabServer,
    UngrabServer,
    RelaxErrors(bool),
}

#[derive(Debug, Clone)]
pub struct MockWindow {
    pub attributes: WindowAttributes,
    pub title: Option<String>,
    pub class: WindowClass,
    pub size_hints: SizeHints,
    pub wm_hints: WmHints,
    pub window_type: WindowType,
    pub transient_for: Option<Window>,
    pub protocols: Vec<Protocol>,
    pub wm_state: Option<WmState>,
}

impl MockWindow {
    fn new(geometry: Rect) -> Self {
        Self {
            attributes: WindowAttributes {
                override_redirect: false,
                viewable: true,
                geometry,
                border_width: 0,
            },
            title: None,
            class: WindowClass::default(),
            size_hints: SizeHints::default(),
            wm_hints: WmHints::default(),
            window_type: WindowType::default(),
            transient_for: None,
            protocols: Vec::new(),
            wm_state: None,
        }
    }
}

pub struct MockDisplay {
    commands: RefCell<Vec<Command>>,
    windows: RefCell<HashMap<Window, MockWindow>>,
    order: RefCell<Vec<Window>>,
    events: RefCell<VecDeque<WmEvent>>,
    monitors: RefCell<Vec<Rect>>,
    pointer: Cell<(i32, i32)>,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self::with_monitors(vec![Rect::new(0, 0, 1280, 800)])
    }

    pub fn with_monitors(monitors: Vec<Rect>) -> Self {
        Self {
            commands: RefCell::new(Vec::new()),
            windows: RefCell::new(HashMap::new()),
            order: RefCell::new(Vec::new()),
            events: RefCell::new(VecDeque::new()),
            monitors: RefCell::new(monitors),
            pointer: Cell::new((0, 0)),
        }
    }

    pub fn add_window(&self, window: Window, geometry: Rect) {
        self.windows.borrow_mut().insert(window, MockWindow::new(geometry));
        self.order.borrow_mut().push(window);
    }

    pub fn edit_window(&self, window: Window, edit: impl FnOnce(&mut MockWindow)) {
        if let Some(w) = self.windows.borrow_mut().get_mut(&window) {
            edit(w);
        }
    }

    pub fn remove_window(&self, window: Window) {
        self.windows.borrow_mut().remove(&window);
        self.order.borrow_mut().retain(|&w| w != window);
    }

    pub fn set_monitors(&self, monitors: Vec<Rect>) {
        *self.monitors.borrow_mut() = monitors;
    }

    pub fn set_pointer(&self, x: i32, y: i32) {
        self.pointer.set((x, y));
    }

    pub fn push_event(&self, event: WmEvent) {
        self.events.borrow_mut().push_back(event);
    }

    pub fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.borrow().clone()
    }

    fn record(&self, command: Command) {
        self.commands.borrow_mut().push(command);
    }

    fn with<T>(&self, window: Window, read: impl FnOnce(&MockWindow) -> T) -> Option<T> {
        self.windows.borrow().get(&window).map(read)
    }
}

impl DisplayServer for MockDisplay {
    fn screen_rect(&self) -> Rect {
        let monitors = self.monitors.borrow();
        let right = monitors.iter().map(Rect::right).max().unwrap_or(0);
        let bottom = monitors.iter().map(Rect::bottom).max().unwrap_or(0);
        Rect::new(0, 0, right, bottom)
    }

    fn monitor_rects(&self) -> Vec<Rect> {
        self.monitors.borrow().clone()
    }

    fn next_event(&self) -> Result<WmEvent, WmError> {
        self.events
            .borrow_mut()
            .pop_front()
            .ok_or(WmError::Connection(ConnectionError::UnknownError))
    }

    fn window_attributes(&self, window: Window) -> Option<WindowAttributes> {
        self.with(window, |w| w.attributes)
    }

    fn title(&self, window: Window) -> Option<String> {
        self.with(window, |w| w.title.clone()).flatten()
    }

    fn class(&self, window: Window) -> Option<WindowClass> {
        self.with(window, |w| w.class.clone())
    }

    fn normal_hints(&self, window: Window) -> SizeHints {
        self.with(window, |w| w.size_hints).unwrap_or_default()
    }

    fn wm_hints(&self, window: Window) -> WmHints {
        self.with(window, |w| w.wm_hints).unwrap_or_default()
    }

    fn window_type(&self, window: Window) -> WindowType {
        self.with(window, |w| w.window_type).unwrap_or_default()
    }

    fn transient_for(&self, window: Window) -> Option<Window> {
        self.with(window, |w| w.transient_for).flatten()
    }

    fn supports_protocol(&self, window: Window, protocol: Protocol) -> bool {
        self.with(window, |w| w.protocols.contains(&protocol)).unwrap_or(false)
    }

    fn wm_state(&self, window: Window) -> Option<WmState> {
        self.with(window, |w| w.wm_state).flatten()
    }

    fn top_level_windows(&self) -> Vec<Window> {
        self.order.borrow().clone()
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        Some(self.pointer.get())
    }

    fn map(&self, window: Window) {
        self.record(Command::Map(window));
    }

    fn configure(&self, window: Window, geometry: Rect, border_width: i32) {
        self.record(Command::Configure(window, geometry, border_width));
    }

    fn move_window(&self, window: Window, x: i32, y: i32) {
        self.record(Command::Move(window, x, y));
    }

    fn configure_unmanaged(&self, request: &ConfigureRequest) {
        self.record(Command::ConfigureUnmanaged(request.window));
    }

    fn send_configure_notify(&self, window: Window, geometry: Rect, border_width: i32) {
        self.record(Command::ConfigureNotify(window, geometry, border_width));
    }

    fn set_border_color(&self, window: Window, pixel: u32) {
        self.record(Command::BorderColor(window, pixel));
    }

    fn restack(&self, windows: &[Window]) {
        self.record(Command::Restack(windows.to_vec()));
    }

    fn discard_enter_events(&self) {}

    fn set_input_focus(&self, window: Option<Window>) {
        self.record(Command::InputFocus(window));
    }

    fn set_active_window(&self, window: Option<Window>) {
        self.record(Command::ActiveWindow(window));
    }

    fn set_client_list(&self, windows: &[Window]) {
        self.record(Command::ClientList(windows.to_vec()));
    }

    fn set_fullscreen_state(&self, window: Window, fullscreen: bool) {
        self.record(Command::FullscreenState(window, fullscreen));
    }

    fn set_wm_state(&self, window: Window, state: WmState) {
        self.record(Command::SetWmState(window, state));
    }

    fn set_urgency(&self, window: Window, urgent: bool) {
        self.record(Command::Urgency(window, urgent));
    }

    fn send_protocol(&self, window: Window, protocol: Protocol) {
        self.record(Command::SendProtocol(window, protocol));
    }

    fn kill(&self, window: Window) {
        self.record(Command::Kill(window));
    }

    fn select_client_events(&self, window: Window) {
        self.record(Command::SelectEvents(window));
    }

    fn release_client(&self, window: Window, border_width: i32) {
        self.record(Command::Release(window, border_width));
    }

    fn grab_keys(&self, keys: &[(u16, Keysym)]) {
        self.record(Command::GrabKeys(keys.len()));
    }

    fn ungrab_keys(&self) {
        self.record(Command::UngrabKeys);
    }

    fn grab_buttons(&self, window: Window, focused: bool, _buttons: &[(u16, u8)]) {
        self.record(Command::GrabButtons(window, focused));
    }

    fn replay_pointer(&self) {
        self.record(Command::ReplayPointer);
    }

    fn grab_pointer(&self, cursor: PointerCursor) -> bool {
        self.record(Command::GrabPointer(cursor));
        true
    }

    fn ungrab_pointer(&self) {
        self.record(Command::UngrabPointer);
    }

    fn warp_pointer(&self, window: Window, x: i32, y: i32) {
        self.record(Command::WarpPointer(window, x, y));
    }

    fn refresh_keyboard(&self) {}

    fn grab_server(&self) {
        self.record(Command::GrabServer);
    }

    fn ungrab_server(&self) {
        self.record(Command::UngrabServer);
    }

    fn set_relaxed_errors(&self, relaxed: bool) {
        self.record(Command::RelaxErrors(relaxed));
    }

    fn flush(&self) {}
}

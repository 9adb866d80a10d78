//! x11rb backend: decodes wire events into [`WmEvent`]s and carries out the
//! manager's requests on the live connection.

use tracing::{debug, warn};
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{
    Allow, Atom, AtomEnum, ButtonIndex, ChangeWindowAttributesAux, ClientMessageEvent, CloseDown,
    ConfigWindow, ConfigureNotifyEvent, ConfigureWindowAux, ConnectionExt, EventMask, Grab, GrabMode, GrabStatus,
    InputFocus, MapState, Mapping, ModMask, NotifyDetail, NotifyMode, PropMode, Property, StackMode, Window,
    CONFIGURE_NOTIFY_EVENT,
};
use x11rb::protocol::Event;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::CURRENT_TIME;

use super::context::Context;
use super::display::{
    ConfigureRequest, DisplayServer, PointerCursor, Protocol, WindowAttributes, WindowClass, WindowType, WmState,
};
use super::error::{is_expected_error, log_and_ignore, log_warn, WmError};
use super::events::{Click, PropertyKind, StateAction, WmEvent};
use crate::input::keysyms::{clean_mask, lock_variants, Keysym};
use crate::window::client::{SizeHints, WmHints};
use crate::window::layout::Rect;

const URGENCY_HINT: u32 = 1 << 8;
const SEND_EVENT_BIT: u8 = 0x80;

impl Context {
    fn property32(&self, window: Window, property: impl Into<Atom>, type_: impl Into<Atom>, length: u32) -> Vec<u32> {
        self.conn
            .get_property(false, window, property, type_, 0, length)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .and_then(|reply| reply.value32().map(|values| values.collect()))
            .unwrap_or_default()
    }

    fn text_property(&self, window: Window, property: impl Into<Atom>) -> Option<String> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, 256)
            .ok()?
            .reply()
            .ok()?;
        let text = String::from_utf8_lossy(&reply.value).trim_end_matches('\0').to_string();
        (!text.is_empty()).then_some(text)
    }

    fn protocol_atom(&self, protocol: Protocol) -> Atom {
        match protocol {
            Protocol::DeleteWindow => self.atoms.WM_DELETE_WINDOW,
            Protocol::TakeFocus => self.atoms.WM_TAKE_FOCUS,
        }
    }

    fn property_kind(&self, atom: Atom) -> Option<PropertyKind> {
        if atom == u32::from(AtomEnum::WM_TRANSIENT_FOR) {
            Some(PropertyKind::TransientFor)
        } else if atom == u32::from(AtomEnum::WM_NORMAL_HINTS) {
            Some(PropertyKind::NormalHints)
        } else if atom == u32::from(AtomEnum::WM_HINTS) {
            Some(PropertyKind::Hints)
        } else if atom == u32::from(AtomEnum::WM_NAME) || atom == self.atoms._NET_WM_NAME {
            Some(PropertyKind::Title)
        } else if atom == self.atoms._NET_WM_WINDOW_TYPE {
            Some(PropertyKind::WindowType)
        } else {
            None
        }
    }

    /// Decode one wire event; `None` for events the manager does not need.
    fn translate(&self, event: Event) -> Option<WmEvent> {
        let numlock = self.numlock.get();
        match event {
            Event::MapRequest(e) => Some(WmEvent::MapRequest { window: e.window }),
            Event::UnmapNotify(e) => Some(WmEvent::UnmapNotify {
                window: e.window,
                synthetic: e.response_type & SEND_EVENT_BIT != 0,
            }),
            Event::DestroyNotify(e) => Some(WmEvent::DestroyNotify { window: e.window }),
            Event::ConfigureRequest(e) => {
                let mask = e.value_mask;
                let has = |flag: ConfigWindow| mask.contains(flag);
                Some(WmEvent::ConfigureRequest(ConfigureRequest {
                    window: e.window,
                    x: has(ConfigWindow::X).then_some(e.x as i32),
                    y: has(ConfigWindow::Y).then_some(e.y as i32),
                    width: has(ConfigWindow::WIDTH).then_some(e.width as i32),
                    height: has(ConfigWindow::HEIGHT).then_some(e.height as i32),
                    border_width: has(ConfigWindow::BORDER_WIDTH).then_some(e.border_width as i32),
                    sibling: has(ConfigWindow::SIBLING).then_some(e.sibling),
                    stack_mode: has(ConfigWindow::STACK_MODE).then_some(e.stack_mode),
                }))
            }
            Event::ConfigureNotify(e) if e.window == self.root_window => {
                self.screen_size.set((e.width, e.height));
                Some(WmEvent::RootConfigured { width: e.width as i32, height: e.height as i32 })
            }
            Event::ClientMessage(e) => {
                let data = e.data.as_data32();
                if e.type_ == self.atoms._NET_WM_STATE {
                    let fullscreen = self.atoms._NET_WM_STATE_FULLSCREEN;
                    if data[1] != fullscreen && data[2] != fullscreen {
                        return None;
                    }
                    let action = StateAction::from_raw(data[0])?;
                    Some(WmEvent::FullscreenRequest { window: e.window, action })
                } else if e.type_ == self.atoms._NET_ACTIVE_WINDOW {
                    Some(WmEvent::ActivateRequest { window: e.window })
                } else {
                    None
                }
            }
            Event::PropertyNotify(e) if e.state != Property::DELETE => {
                let property = self.property_kind(e.atom)?;
                Some(WmEvent::PropertyChanged { window: e.window, property })
            }
            Event::EnterNotify(e) => {
                if (e.mode != NotifyMode::NORMAL || e.detail == NotifyDetail::INFERIOR) && e.event != self.root_window {
                    return None;
                }
                Some(WmEvent::EnterNotify { window: e.event, root_x: e.root_x as i32, root_y: e.root_y as i32 })
            }
            Event::FocusIn(e) => Some(WmEvent::FocusIn { window: e.event }),
            Event::KeyPress(e) => Some(WmEvent::KeyPress {
                modifiers: clean_mask(u16::from(e.state), numlock),
                keysym: self.keyboard.borrow().keysym(e.detail),
            }),
            Event::ButtonPress(e) => Some(WmEvent::ButtonPress {
                window: e.event,
                click: if e.event == self.root_window { Click::RootWindow } else { Click::ClientWindow },
                modifiers: clean_mask(u16::from(e.state), numlock),
                button: e.detail,
                root_x: e.root_x as i32,
                root_y: e.root_y as i32,
            }),
            Event::MotionNotify(e) => Some(WmEvent::MotionNotify {
                root_x: e.root_x as i32,
                root_y: e.root_y as i32,
                time: e.time,
            }),
            Event::ButtonRelease(e) => Some(WmEvent::ButtonRelease { button: e.detail }),
            Event::MappingNotify(e) if e.request == Mapping::KEYBOARD || e.request == Mapping::MODIFIER => {
                Some(WmEvent::KeyboardMappingChanged)
            }
            Event::Error(e) if self.relaxed.get() => {
                debug!("Dropped X error while relaxed: {:?}", e.error_kind);
                None
            }
            Event::Error(e) => Some(WmEvent::ProtocolError {
                expected: is_expected_error(e.error_kind, e.major_opcode),
                description: format!(
                    "{:?} (request {}.{}, resource {:#x})",
                    e.error_kind, e.major_opcode, e.minor_opcode, e.bad_value
                ),
            }),
            _ => None,
        }
    }

    /// Sync with the server and move everything it sent into `pending`,
    /// keeping only the events `keep` accepts.
    fn drain_events(&self, keep: impl Fn(&Event) -> bool) {
        log_and_ignore(self.conn.sync(), "sync");
        let mut pending = self.pending.borrow_mut();
        while let Ok(Some(event)) = self.conn.poll_for_event() {
            if keep(&event) {
                pending.push_back(event);
            }
        }
    }
}

impl DisplayServer for Context {
    fn screen_rect(&self) -> Rect {
        let (width, height) = self.screen_size.get();
        Rect::new(0, 0, width as i32, height as i32)
    }

    fn monitor_rects(&self) -> Vec<Rect> {
        let monitors = self
            .conn
            .randr_get_monitors(self.root_window, true)
            .ok()
            .and_then(|cookie| cookie.reply().ok());
        match monitors {
            Some(reply) if !reply.monitors.is_empty() => reply
                .monitors
                .iter()
                .map(|m| Rect::new(m.x as i32, m.y as i32, m.width as i32, m.height as i32))
                .collect(),
            _ => {
                debug!("RandR monitors unavailable, using the whole screen");
                vec![self.screen_rect()]
            }
        }
    }

    fn next_event(&self) -> Result<WmEvent, WmError> {
        loop {
            let queued = self.pending.borrow_mut().pop_front();
            let event = match queued {
                Some(event) => event,
                None => self.conn.wait_for_event()?,
            };
            if let Some(event) = self.translate(event) {
                return Ok(event);
            }
        }
    }

    fn window_attributes(&self, window: Window) -> Option<WindowAttributes> {
        let attrs = self.conn.get_window_attributes(window).ok()?.reply().ok()?;
        let geometry = self.conn.get_geometry(window).ok()?.reply().ok()?;
        Some(WindowAttributes {
            override_redirect: attrs.override_redirect,
            viewable: attrs.map_state == MapState::VIEWABLE,
            geometry: Rect::new(
                geometry.x as i32,
                geometry.y as i32,
                geometry.width as i32,
                geometry.height as i32,
            ),
            border_width: geometry.border_width as i32,
        })
    }

    fn title(&self, window: Window) -> Option<String> {
        self.text_property(window, self.atoms._NET_WM_NAME)
            .or_else(|| self.text_property(window, AtomEnum::WM_NAME))
    }

    fn class(&self, window: Window) -> Option<WindowClass> {
        let raw = self.text_property(window, AtomEnum::WM_CLASS)?;
        let mut parts = raw.split('\0');
        Some(WindowClass {
            instance: parts.next().unwrap_or_default().to_string(),
            class: parts.next().unwrap_or_default().to_string(),
        })
    }

    fn normal_hints(&self, window: Window) -> SizeHints {
        let raw = self.property32(window, AtomEnum::WM_NORMAL_HINTS, AtomEnum::WM_SIZE_HINTS, 18);
        SizeHints::from_wm_normal_hints(&raw)
    }

    fn wm_hints(&self, window: Window) -> WmHints {
        let raw = self.property32(window, AtomEnum::WM_HINTS, AtomEnum::WM_HINTS, 9);
        WmHints::from_wm_hints(&raw)
    }

    fn window_type(&self, window: Window) -> WindowType {
        let state = self.property32(window, self.atoms._NET_WM_STATE, AtomEnum::ATOM, 32);
        let types = self.property32(window, self.atoms._NET_WM_WINDOW_TYPE, AtomEnum::ATOM, 32);
        WindowType {
            fullscreen: state.contains(&self.atoms._NET_WM_STATE_FULLSCREEN),
            dialog: types.contains(&self.atoms._NET_WM_WINDOW_TYPE_DIALOG),
        }
    }

    fn transient_for(&self, window: Window) -> Option<Window> {
        self.property32(window, AtomEnum::WM_TRANSIENT_FOR, AtomEnum::WINDOW, 1)
            .first()
            .copied()
            .filter(|&w| w != x11rb::NONE)
    }

    fn supports_protocol(&self, window: Window, protocol: Protocol) -> bool {
        self.property32(window, self.atoms.WM_PROTOCOLS, AtomEnum::ATOM, 32)
            .contains(&self.protocol_atom(protocol))
    }

    fn wm_state(&self, window: Window) -> Option<WmState> {
        let raw = self.property32(window, self.atoms.WM_STATE, self.atoms.WM_STATE, 2);
        raw.first().copied().and_then(WmState::from_raw)
    }

    fn top_level_windows(&self) -> Vec<Window> {
        self.conn
            .query_tree(self.root_window)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
            .map(|tree| tree.children)
            .unwrap_or_default()
    }

    fn pointer_position(&self) -> Option<(i32, i32)> {
        let pointer = self.conn.query_pointer(self.root_window).ok()?.reply().ok()?;
        Some((pointer.root_x as i32, pointer.root_y as i32))
    }

    fn map(&self, window: Window) {
        log_and_ignore(self.conn.map_window(window), "map window");
    }

    fn configure(&self, window: Window, geometry: Rect, border_width: i32) {
        let values = ConfigureWindowAux::new()
            .x(geometry.x)
            .y(geometry.y)
            .width(geometry.width as u32)
            .height(geometry.height as u32)
            .border_width(border_width as u32);
        log_and_ignore(self.conn.configure_window(window, &values), "configure window");
    }

    fn move_window(&self, window: Window, x: i32, y: i32) {
        let values = ConfigureWindowAux::new().x(x).y(y);
        log_and_ignore(self.conn.configure_window(window, &values), "move window");
    }

    fn configure_unmanaged(&self, request: &ConfigureRequest) {
        let values = ConfigureWindowAux::new()
            .x(request.x)
            .y(request.y)
            .width(request.width.map(|w| w as u32))
            .height(request.height.map(|h| h as u32))
            .border_width(request.border_width.map(|b| b as u32))
            .sibling(request.sibling)
            .stack_mode(request.stack_mode);
        log_and_ignore(self.conn.configure_window(request.window, &values), "configure unmanaged window");
    }

    fn send_configure_notify(&self, window: Window, geometry: Rect, border_width: i32) {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: geometry.x as i16,
            y: geometry.y as i16,
            width: geometry.width as u16,
            height: geometry.height as u16,
            border_width: border_width as u16,
            override_redirect: false,
        };
        log_and_ignore(
            self.conn.send_event(false, window, EventMask::STRUCTURE_NOTIFY, event),
            "send configure notify",
        );
    }

    fn set_border_color(&self, window: Window, pixel: u32) {
        let values = ChangeWindowAttributesAux::new().border_pixel(pixel);
        log_and_ignore(self.conn.change_window_attributes(window, &values), "set border color");
    }

    fn restack(&self, windows: &[Window]) {
        let mut above: Option<Window> = None;
        for &window in windows {
            let values = match above {
                None => ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
                Some(sibling) => ConfigureWindowAux::new().sibling(sibling).stack_mode(StackMode::BELOW),
            };
            log_and_ignore(self.conn.configure_window(window, &values), "restack window");
            above = Some(window);
        }
    }

    fn discard_enter_events(&self) {
        self.drain_events(|event| !matches!(event, Event::EnterNotify(_)));
    }

    fn set_input_focus(&self, window: Option<Window>) {
        let target = window.unwrap_or(self.root_window);
        log_and_ignore(
            self.conn.set_input_focus(InputFocus::POINTER_ROOT, target, CURRENT_TIME),
            "set input focus",
        );
    }

    fn set_active_window(&self, window: Option<Window>) {
        let result = match window {
            Some(window) => self.conn.change_property32(
                PropMode::REPLACE,
                self.root_window,
                self.atoms._NET_ACTIVE_WINDOW,
                AtomEnum::WINDOW,
                &[window],
            ),
            None => self.conn.delete_property(self.root_window, self.atoms._NET_ACTIVE_WINDOW),
        };
        log_and_ignore(result, "set active window");
    }

    fn set_client_list(&self, windows: &[Window]) {
        log_and_ignore(
            self.conn.change_property32(
                PropMode::REPLACE,
                self.root_window,
                self.atoms._NET_CLIENT_LIST,
                AtomEnum::WINDOW,
                windows,
            ),
            "set client list",
        );
    }

    fn set_fullscreen_state(&self, window: Window, fullscreen: bool) {
        let state: &[Atom] = if fullscreen { &[self.atoms._NET_WM_STATE_FULLSCREEN] } else { &[] };
        log_and_ignore(
            self.conn.change_property32(PropMode::REPLACE, window, self.atoms._NET_WM_STATE, AtomEnum::ATOM, state),
            "set fullscreen state",
        );
    }

    fn set_wm_state(&self, window: Window, state: WmState) {
        log_and_ignore(
            self.conn.change_property32(
                PropMode::REPLACE,
                window,
                self.atoms.WM_STATE,
                self.atoms.WM_STATE,
                &[state as u32, x11rb::NONE],
            ),
            "set WM_STATE",
        );
    }

    fn set_urgency(&self, window: Window, urgent: bool) {
        let mut raw = self.property32(window, AtomEnum::WM_HINTS, AtomEnum::WM_HINTS, 9);
        let Some(flags) = raw.first_mut() else {
            return;
        };
        if urgent {
            *flags |= URGENCY_HINT;
        } else {
            *flags &= !URGENCY_HINT;
        }
        log_and_ignore(
            self.conn.change_property32(PropMode::REPLACE, window, AtomEnum::WM_HINTS, AtomEnum::WM_HINTS, &raw),
            "set urgency",
        );
    }

    fn send_protocol(&self, window: Window, protocol: Protocol) {
        let data = [self.protocol_atom(protocol), CURRENT_TIME, 0, 0, 0];
        let event = ClientMessageEvent::new(32, window, self.atoms.WM_PROTOCOLS, data);
        log_and_ignore(self.conn.send_event(false, window, EventMask::NO_EVENT, event), "send protocol");
    }

    fn kill(&self, window: Window) {
        log_and_ignore(self.conn.set_close_down_mode(CloseDown::DESTROY_ALL), "set close down mode");
        log_and_ignore(self.conn.kill_client(window), "kill client");
    }

    fn select_client_events(&self, window: Window) {
        let values = ChangeWindowAttributesAux::new().event_mask(
            EventMask::ENTER_WINDOW | EventMask::FOCUS_CHANGE | EventMask::PROPERTY_CHANGE | EventMask::STRUCTURE_NOTIFY,
        );
        log_and_ignore(self.conn.change_window_attributes(window, &values), "select client events");
    }

    fn release_client(&self, window: Window, border_width: i32) {
        let values = ChangeWindowAttributesAux::new().event_mask(EventMask::NO_EVENT);
        log_and_ignore(self.conn.change_window_attributes(window, &values), "release events");
        let values = ConfigureWindowAux::new().border_width(border_width as u32);
        log_and_ignore(self.conn.configure_window(window, &values), "restore border");
        log_and_ignore(self.conn.ungrab_button(ButtonIndex::ANY, window, ModMask::ANY), "ungrab buttons");
    }

    fn grab_keys(&self, keys: &[(u16, Keysym)]) {
        self.ungrab_keys();
        let numlock = self.numlock.get();
        let keyboard = self.keyboard.borrow();
        for &(modifiers, keysym) in keys {
            for keycode in keyboard.keycodes(keysym) {
                for variant in lock_variants(modifiers, numlock) {
                    log_and_ignore(
                        self.conn.grab_key(
                            true,
                            self.root_window,
                            ModMask::from(variant),
                            keycode,
                            GrabMode::ASYNC,
                            GrabMode::ASYNC,
                        ),
                        "grab key",
                    );
                }
            }
        }
    }

    fn ungrab_keys(&self) {
        log_and_ignore(self.conn.ungrab_key(Grab::ANY, self.root_window, ModMask::ANY), "ungrab keys");
    }

    fn grab_buttons(&self, window: Window, focused: bool, buttons: &[(u16, u8)]) {
        let mask = EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE;
        log_and_ignore(self.conn.ungrab_button(ButtonIndex::ANY, window, ModMask::ANY), "ungrab buttons");
        if !focused {
            // any click on an unfocused client is caught to focus it
            log_and_ignore(
                self.conn.grab_button(
                    false,
                    window,
                    mask,
                    GrabMode::SYNC,
                    GrabMode::SYNC,
                    x11rb::NONE,
                    x11rb::NONE,
                    ButtonIndex::ANY,
                    ModMask::ANY,
                ),
                "grab any button",
            );
        }
        let numlock = self.numlock.get();
        for &(modifiers, button) in buttons {
            for variant in lock_variants(modifiers, numlock) {
                log_and_ignore(
                    self.conn.grab_button(
                        false,
                        window,
                        mask,
                        GrabMode::ASYNC,
                        GrabMode::SYNC,
                        x11rb::NONE,
                        x11rb::NONE,
                        ButtonIndex::from(button),
                        ModMask::from(variant),
                    ),
                    "grab button",
                );
            }
        }
    }

    fn replay_pointer(&self) {
        log_and_ignore(self.conn.allow_events(Allow::REPLAY_POINTER, CURRENT_TIME), "replay pointer");
    }

    fn grab_pointer(&self, cursor: PointerCursor) -> bool {
        let reply = self
            .conn
            .grab_pointer(
                false,
                self.root_window,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                self.cursors.get(cursor),
                CURRENT_TIME,
            )
            .map_err(WmError::from)
            .and_then(|cookie| Ok(cookie.reply()?));
        log_warn(reply, "grab pointer").map_or(false, |r| r.status == GrabStatus::SUCCESS)
    }

    fn ungrab_pointer(&self) {
        log_and_ignore(self.conn.ungrab_pointer(CURRENT_TIME), "ungrab pointer");
    }

    fn warp_pointer(&self, window: Window, x: i32, y: i32) {
        log_and_ignore(
            self.conn.warp_pointer(x11rb::NONE, window, 0, 0, 0, 0, x as i16, y as i16),
            "warp pointer",
        );
    }

    fn refresh_keyboard(&self) {
        if let Err(e) = self.load_keyboard() {
            warn!("Failed to reload keyboard mapping: {}", e);
        }
    }

    fn grab_server(&self) {
        log_and_ignore(self.conn.grab_server(), "grab server");
    }

    fn ungrab_server(&self) {
        log_and_ignore(self.conn.ungrab_server(), "ungrab server");
    }

    fn set_relaxed_errors(&self, relaxed: bool) {
        if !relaxed {
            // errors caused while relaxed are still in flight
            self.drain_events(|event| !matches!(event, Event::Error(_)));
        }
        self.relaxed.set(relaxed);
    }

    fn flush(&self) {
        log_and_ignore(self.conn.flush(), "flush");
    }
}

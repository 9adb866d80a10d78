use tracing::{debug, trace, warn};
use x11rb::protocol::xproto::Window;

use crate::core::display::{ConfigureRequest, DisplayServer, WmState};
use crate::core::events::{Click, PropertyKind, StateAction, WmEvent};
use crate::input::bindings::{find_button, find_key};

use super::manager::WindowManager;
use super::registry::ClientId;

impl<D: DisplayServer> WindowManager<D> {
    pub fn handle_event(&mut self, event: WmEvent) {
        trace!("Event: {:?}", event);
        match event {
            WmEvent::MapRequest { window } => self.manage(window),
            WmEvent::UnmapNotify { window, synthetic } => self.on_unmap(window, synthetic),
            WmEvent::DestroyNotify { window } => {
                if let Some(id) = self.clients.find(window) {
                    self.unmanage(id, true);
                }
            }
            WmEvent::ConfigureRequest(request) => self.on_configure_request(request),
            WmEvent::RootConfigured { width, height } => {
                debug!("Root resized to {}x{}", width, height);
                if self.update_monitors() {
                    self.focus(self.focused);
                    self.arrange(None);
                }
            }
            WmEvent::FullscreenRequest { window, action } => self.on_fullscreen_request(window, action),
            WmEvent::ActivateRequest { window } => self.on_activate_request(window),
            WmEvent::PropertyChanged { window, property } => self.on_property_changed(window, property),
            WmEvent::EnterNotify { window, root_x, root_y } => self.on_enter(window, root_x, root_y),
            WmEvent::FocusIn { window } => {
                if let Some(id) = self.focused {
                    if self.clients.window(id) != Some(window) {
                        self.give_input_focus(id);
                    }
                }
            }
            WmEvent::KeyPress { modifiers, keysym } => {
                if let Some(action) = find_key(&self.keys, modifiers, keysym) {
                    self.run_action(action);
                }
            }
            WmEvent::ButtonPress { window, click, modifiers, button, root_x, root_y } => {
                self.on_button_press(window, click, modifiers, button, root_x, root_y)
            }
            WmEvent::MotionNotify { root_x, root_y, time } => self.drag_motion(root_x, root_y, time),
            WmEvent::ButtonRelease { .. } => self.end_drag(),
            WmEvent::KeyboardMappingChanged => {
                self.display.refresh_keyboard();
                self.display.grab_keys(&self.key_specs());
            }
            WmEvent::ProtocolError { expected: true, description } => debug!("Ignored X error: {}", description),
            WmEvent::ProtocolError { expected: false, description } => warn!("X error: {}", description),
        }
    }

    fn on_unmap(&mut self, window: Window, synthetic: bool) {
        let Some(id) = self.clients.find(window) else {
            return;
        };
        if synthetic {
            self.display.set_wm_state(window, WmState::Withdrawn);
        } else {
            self.unmanage(id, false);
        }
    }

    /// Floating clients get what they ask for, within reason; tiled and
    /// fullscreen clients are told their current geometry instead.
    fn on_configure_request(&mut self, request: ConfigureRequest) {
        let Some(id) = self.clients.find(request.window) else {
            self.display.configure_unmanaged(&request);
            return;
        };
        let visible = self.is_visible(id);
        let Some(c) = self.clients.get_mut(id) else {
            return;
        };
        let mon = &self.monitors[c.monitor];
        let (area, arranges) = (mon.area, mon.layout.arranges());

        if let Some(border_width) = request.border_width {
            c.border_width = border_width;
        } else if !c.is_fullscreen && (c.is_floating || !arranges) {
            if let Some(x) = request.x {
                c.geometry.x = x;
            }
            if let Some(y) = request.y {
                c.geometry.y = y;
            }
            if let Some(width) = request.width {
                c.geometry.width = width.max(1);
            }
            if let Some(height) = request.height {
                c.geometry.height = height.max(1);
            }
            if c.is_floating && c.geometry.x + c.outer_width() > area.right() {
                c.geometry.x = area.x + (area.width - c.outer_width()) / 2;
            }
            if c.is_floating && c.geometry.y + c.outer_height() > area.bottom() {
                c.geometry.y = area.y + (area.height - c.outer_height()) / 2;
            }
            let (window, geometry, border) = (c.window, c.geometry, c.border_width);
            if request.changes_position() && !request.changes_size() {
                self.display.send_configure_notify(window, geometry, border);
            }
            if visible {
                self.display.configure(window, geometry, border);
            }
        } else {
            self.display.send_configure_notify(c.window, c.geometry, c.border_width);
        }
    }

    fn on_fullscreen_request(&mut self, window: Window, action: StateAction) {
        let Some(id) = self.clients.find(window) else {
            return;
        };
        if let Some(c) = self.clients.get(id) {
            let fullscreen = action.apply(c.is_fullscreen);
            self.set_fullscreen(id, fullscreen);
        }
    }

    fn on_activate_request(&mut self, window: Window) {
        let Some(id) = self.clients.find(window) else {
            return;
        };
        if self.is_visible(id) {
            self.focus(Some(id));
        } else if self.focused != Some(id) {
            if let Some(c) = self.clients.get_mut(id) {
                c.is_urgent = true;
            }
            self.display.set_urgency(window, true);
        }
    }

    fn on_property_changed(&mut self, window: Window, property: PropertyKind) {
        let Some(id) = self.clients.find(window) else {
            return;
        };
        match property {
            PropertyKind::TransientFor => {
                let parent_managed = self
                    .display
                    .transient_for(window)
                    .map_or(false, |parent| self.clients.find(parent).is_some());
                if let Some(c) = self.clients.get_mut(id) {
                    if parent_managed && !c.is_floating {
                        c.is_floating = true;
                        let monitor = c.monitor;
                        self.arrange(Some(monitor));
                    }
                }
            }
            PropertyKind::NormalHints => {
                let hints = self.display.normal_hints(window);
                if let Some(c) = self.clients.get_mut(id) {
                    c.apply_hints(hints);
                    if c.is_tiled() {
                        let monitor = c.monitor;
                        self.arrange(Some(monitor));
                    }
                }
            }
            PropertyKind::Hints => {
                let hints = self.display.wm_hints(window);
                let focused = self.focused == Some(id);
                if let Some(c) = self.clients.get_mut(id) {
                    c.apply_wm_hints(hints, focused);
                }
                if hints.urgent && focused {
                    self.display.set_urgency(window, false);
                }
            }
            PropertyKind::Title => {
                let title = self.display.title(window);
                if let Some(c) = self.clients.get_mut(id) {
                    c.name = title.unwrap_or_else(|| "broken".to_string());
                }
            }
            PropertyKind::WindowType => self.update_window_type(id),
        }
    }

    fn update_window_type(&mut self, id: ClientId) {
        let Some(window) = self.clients.window(id) else {
            return;
        };
        let window_type = self.display.window_type(window);
        if window_type.fullscreen {
            self.set_fullscreen(id, true);
        }
        if window_type.dialog {
            if let Some(c) = self.clients.get_mut(id) {
                if !c.is_floating {
                    c.is_floating = true;
                    let monitor = c.monitor;
                    self.arrange(Some(monitor));
                }
            }
        }
    }

    fn on_enter(&mut self, window: Window, root_x: i32, root_y: i32) {
        if self.drag.is_active() || !self.config.focus_follows_pointer {
            return;
        }
        let client = self.clients.find(window);
        let monitor = client
            .and_then(|id| self.clients.get(id))
            .map_or_else(|| self.monitor_at(root_x, root_y), |c| c.monitor);
        if monitor != self.selected_monitor {
            self.switch_monitor(monitor);
        } else if client.is_none() || client == self.focused {
            return;
        }
        self.focus(client);
    }

    fn on_button_press(&mut self, window: Window, click: Click, modifiers: u16, button: u8, root_x: i32, root_y: i32) {
        let mut click = click;
        if let Some(id) = self.clients.find(window) {
            self.focus(Some(id));
            self.display.replay_pointer();
            click = Click::ClientWindow;
        } else {
            let monitor = self.monitor_at(root_x, root_y);
            if monitor != self.selected_monitor {
                self.switch_monitor(monitor);
                self.focus(None);
            }
        }
        if let Some(action) = find_button(&self.buttons, click, modifiers, button) {
            self.run_action(action);
        }
    }

    /// Drop focus on the current monitor and make `monitor` the selected one.
    pub(crate) fn switch_monitor(&mut self, monitor: usize) {
        if let Some(previous) = self.focused.take() {
            self.unfocus(previous, true);
        }
        self.selected_monitor = monitor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::display::{Protocol, WindowType};
    use crate::input::bindings::MODKEY;
    use crate::input::keysyms::XK_1;
    use crate::window::layout::Rect;
    use crate::window::testing::{Command, MockDisplay, ROOT};
    use nwm_config::Config;

    fn manager() -> WindowManager<MockDisplay> {
        let config = Config { show_bar: false, ..Config::default() };
        WindowManager::new(MockDisplay::new(), config)
    }

    fn open(wm: &mut WindowManager<MockDisplay>, window: Window) -> ClientId {
        wm.display.add_window(window, Rect::new(10, 10, 300, 200));
        wm.handle_event(WmEvent::MapRequest { window });
        wm.clients.find(window).unwrap()
    }

    fn request(window: Window) -> ConfigureRequest {
        ConfigureRequest { window, ..ConfigureRequest::default() }
    }

    #[test]
    fn test_unmap_and_destroy() {
        let mut wm = manager();
        let a = open(&mut wm, 10);
        open(&mut wm, 20);

        wm.handle_event(WmEvent::UnmapNotify { window: 10, synthetic: true });
        assert!(wm.clients.contains(a));
        assert!(wm.display.commands().contains(&Command::SetWmState(10, WmState::Withdrawn)));

        wm.handle_event(WmEvent::UnmapNotify { window: 10, synthetic: false });
        assert!(!wm.clients.contains(a));

        wm.handle_event(WmEvent::DestroyNotify { window: 20 });
        assert!(wm.clients.is_empty());
        // late events for forgotten windows are harmless
        wm.handle_event(WmEvent::DestroyNotify { window: 20 });
        wm.handle_event(WmEvent::UnmapNotify { window: 10, synthetic: false });
    }

    #[test]
    fn test_configure_request_from_unmanaged_window_passes_through() {
        let mut wm = manager();
        wm.display.take_commands();
        wm.handle_event(WmEvent::ConfigureRequest(ConfigureRequest { x: Some(5), ..request(77) }));
        assert_eq!(wm.display.take_commands(), vec![Command::ConfigureUnmanaged(77)]);
    }

    #[test]
    fn test_configure_request_tiled_gets_current_geometry() {
        let mut wm = manager();
        let a = open(&mut wm, 10);
        let geometry = wm.clients.get(a).unwrap().geometry;
        wm.display.take_commands();
        wm.handle_event(WmEvent::ConfigureRequest(ConfigureRequest {
            width: Some(50),
            height: Some(50),
            ..request(10)
        }));
        assert_eq!(wm.display.take_commands(), vec![Command::ConfigureNotify(10, geometry, 1)]);
        assert_eq!(wm.clients.get(a).unwrap().geometry, geometry);
    }

    #[test]
    fn test_configure_request_floating_is_honoured() {
        let mut wm = manager();
        let a = open(&mut wm, 10);
        wm.toggle_floating(a);
        wm.display.take_commands();

        let wanted = Rect::new(100, 120, 400, 300);
        wm.handle_event(WmEvent::ConfigureRequest(ConfigureRequest {
            x: Some(100),
            y: Some(120),
            width: Some(400),
            height: Some(300),
            ..request(10)
        }));
        assert_eq!(wm.clients.get(a).unwrap().geometry, wanted);
        assert_eq!(wm.display.take_commands(), vec![Command::Configure(10, wanted, 1)]);

        // a pure move also gets a synthetic notify
        wm.handle_event(WmEvent::ConfigureRequest(ConfigureRequest { x: Some(40), ..request(10) }));
        let moved = Rect::new(40, 120, 400, 300);
        assert_eq!(
            wm.display.take_commands(),
            vec![Command::ConfigureNotify(10, moved, 1), Command::Configure(10, moved, 1)]
        );
    }

    #[test]
    fn test_configure_request_off_monitor_is_centred() {
        let mut wm = manager();
        let a = open(&mut wm, 10);
        wm.toggle_floating(a);
        wm.handle_event(WmEvent::ConfigureRequest(ConfigureRequest {
            x: Some(5000),
            y: Some(10),
            width: Some(398),
            height: Some(200),
            ..request(10)
        }));
        let c = wm.clients.get(a).unwrap();
        assert_eq!((c.geometry.x, c.geometry.y), ((1280 - 400) / 2, 10));
    }

    #[test]
    fn test_configure_request_border_only() {
        let mut wm = manager();
        let a = open(&mut wm, 10);
        wm.handle_event(WmEvent::ConfigureRequest(ConfigureRequest { border_width: Some(5), ..request(10) }));
        assert_eq!(wm.clients.get(a).unwrap().border_width, 5);
    }

    #[test]
    fn test_fullscreen_requests() {
        let mut wm = manager();
        let a = open(&mut wm, 10);
        wm.handle_event(WmEvent::FullscreenRequest { window: 10, action: StateAction::Add });
        assert!(wm.clients.get(a).unwrap().is_fullscreen);
        wm.handle_event(WmEvent::FullscreenRequest { window: 10, action: StateAction::Add });
        assert!(wm.clients.get(a).unwrap().is_fullscreen);
        wm.handle_event(WmEvent::FullscreenRequest { window: 10, action: StateAction::Toggle });
        assert!(!wm.clients.get(a).unwrap().is_fullscreen);

        // a fullscreen client is not moved by its own requests
        wm.handle_event(WmEvent::FullscreenRequest { window: 10, action: StateAction::Toggle });
        wm.handle_event(WmEvent::ConfigureRequest(ConfigureRequest { x: Some(300), ..request(10) }));
        assert_eq!(wm.clients.get(a).unwrap().geometry, Rect::new(0, 0, 1280, 800));
    }

    #[test]
    fn test_activate_request() {
        let mut wm = manager();
        let b = open(&mut wm, 20);
        let a = open(&mut wm, 10);
        wm.handle_event(WmEvent::ActivateRequest { window: 20 });
        assert_eq!(wm.focused, Some(b));

        wm.clients.get_mut(a).unwrap().tags = 1 << 5;
        wm.arrange(None);
        wm.handle_event(WmEvent::ActivateRequest { window: 10 });
        assert_eq!(wm.focused, Some(b));
        assert!(wm.clients.get(a).unwrap().is_urgent);
        assert!(wm.display.commands().contains(&Command::Urgency(10, true)));
    }

    #[test]
    fn test_property_updates() {
        let mut wm = manager();
        let a = open(&mut wm, 10);
        assert_eq!(wm.clients.get(a).unwrap().name, "broken");

        wm.display.edit_window(10, |w| w.title = Some("editor".into()));
        wm.handle_event(WmEvent::PropertyChanged { window: 10, property: PropertyKind::Title });
        assert_eq!(wm.clients.get(a).unwrap().name, "editor");

        wm.display.edit_window(10, |w| w.window_type = WindowType { fullscreen: false, dialog: true });
        wm.handle_event(WmEvent::PropertyChanged { window: 10, property: PropertyKind::WindowType });
        assert!(wm.clients.get(a).unwrap().is_floating);
    }

    #[test]
    fn test_urgency_hint_ignored_for_focused_client() {
        let mut wm = manager();
        let b = open(&mut wm, 20);
        let a = open(&mut wm, 10);
        for w in [10, 20] {
            wm.display.edit_window(w, |w| w.wm_hints.urgent = true);
            wm.handle_event(WmEvent::PropertyChanged { window: w, property: PropertyKind::Hints });
        }
        assert!(!wm.clients.get(a).unwrap().is_urgent);
        assert!(wm.clients.get(b).unwrap().is_urgent);
        assert!(wm.display.commands().contains(&Command::Urgency(10, false)));
    }

    #[test]
    fn test_transient_property_floats_client() {
        let mut wm = manager();
        open(&mut wm, 20);
        let a = open(&mut wm, 10);
        wm.display.edit_window(10, |w| w.transient_for = Some(20));
        wm.handle_event(WmEvent::PropertyChanged { window: 10, property: PropertyKind::TransientFor });
        assert!(wm.clients.get(a).unwrap().is_floating);
    }

    #[test]
    fn test_enter_focuses_client() {
        let mut wm = manager();
        let b = open(&mut wm, 20);
        open(&mut wm, 10);
        wm.handle_event(WmEvent::EnterNotify { window: 20, root_x: 900, root_y: 10 });
        assert_eq!(wm.focused, Some(b));

        let mut wm = WindowManager::new(MockDisplay::new(), Config { focus_follows_pointer: false, ..Config::default() });
        open(&mut wm, 20);
        let a = open(&mut wm, 10);
        wm.handle_event(WmEvent::EnterNotify { window: 20, root_x: 900, root_y: 10 });
        assert_eq!(wm.focused, Some(a));
    }

    #[test]
    fn test_enter_on_other_monitor_switches_selection() {
        let display = MockDisplay::with_monitors(vec![Rect::new(0, 0, 1280, 800), Rect::new(1280, 0, 1024, 768)]);
        let mut wm = WindowManager::new(display, Config::default());
        let a = open(&mut wm, 10);
        wm.handle_event(WmEvent::EnterNotify { window: ROOT, root_x: 1500, root_y: 100 });
        assert_eq!(wm.selected_monitor, 1);
        assert_eq!(wm.focused, None);
        assert!(wm.display.commands().contains(&Command::BorderColor(10, wm.config.border_normal.pixel())));

        wm.handle_event(WmEvent::EnterNotify { window: 10, root_x: 100, root_y: 100 });
        assert_eq!(wm.selected_monitor, 0);
        assert_eq!(wm.focused, Some(a));
    }

    #[test]
    fn test_focus_in_from_other_window_reasserts() {
        let mut wm = manager();
        open(&mut wm, 10);
        wm.display.edit_window(10, |w| w.protocols.push(Protocol::TakeFocus));
        wm.display.take_commands();
        wm.handle_event(WmEvent::FocusIn { window: 10 });
        assert!(wm.display.take_commands().is_empty());
        wm.handle_event(WmEvent::FocusIn { window: 99 });
        let commands = wm.display.take_commands();
        assert!(commands.contains(&Command::InputFocus(Some(10))));
        assert!(commands.contains(&Command::SendProtocol(10, Protocol::TakeFocus)));
    }

    #[test]
    fn test_key_press_runs_binding() {
        let mut wm = manager();
        wm.handle_event(WmEvent::KeyPress { modifiers: MODKEY, keysym: XK_1 + 2 });
        assert_eq!(wm.monitors[0].visible_tags(), 1 << 2);
        // unbound keys do nothing
        wm.handle_event(WmEvent::KeyPress { modifiers: 0, keysym: XK_1 });
        assert_eq!(wm.monitors[0].visible_tags(), 1 << 2);
    }

    #[test]
    fn test_click_focuses_and_replays() {
        let mut wm = manager();
        let b = open(&mut wm, 20);
        open(&mut wm, 10);
        wm.display.take_commands();
        wm.handle_event(WmEvent::ButtonPress {
            window: 20,
            click: Click::ClientWindow,
            modifiers: 0,
            button: 1,
            root_x: 900,
            root_y: 10,
        });
        assert_eq!(wm.focused, Some(b));
        assert!(wm.display.commands().contains(&Command::ReplayPointer));
        assert!(!wm.drag.is_active());
    }

    #[test]
    fn test_root_resize_redetects_monitors() {
        let mut wm = manager();
        let a = open(&mut wm, 10);
        wm.display.set_monitors(vec![Rect::new(0, 0, 1920, 1080)]);
        wm.handle_event(WmEvent::RootConfigured { width: 1920, height: 1080 });
        assert_eq!(wm.monitors[0].screen, Rect::new(0, 0, 1920, 1080));
        assert_eq!(wm.clients.get(a).unwrap().geometry, Rect::new(0, 0, 1918, 1078));
        assert_eq!(wm.focused, Some(a));
    }

    #[test]
    fn test_root_resize_keeps_stack_focus() {
        let mut wm = manager();
        let a = open(&mut wm, 10);
        let b = open(&mut wm, 20);
        assert_eq!(wm.monitors[0].clients[0], b);
        wm.focus(Some(a));
        wm.display.set_monitors(vec![Rect::new(0, 0, 1920, 1080)]);
        wm.handle_event(WmEvent::RootConfigured { width: 1920, height: 1080 });
        assert_eq!(wm.focused, Some(a));
    }

    #[test]
    fn test_mapping_change_regrabs_keys() {
        let mut wm = manager();
        wm.display.take_commands();
        wm.handle_event(WmEvent::KeyboardMappingChanged);
        assert!(matches!(wm.display.take_commands().as_slice(), [Command::GrabKeys(n)] if *n == wm.keys.len()));
    }
}

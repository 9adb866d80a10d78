use nwm_config::{Config, TAG_COUNT};
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::Window;

use crate::core::display::{DisplayServer, Protocol, ServerGrab, WmState};
use crate::core::error::WmError;
use crate::input::bindings::{default_buttons, default_keys, ButtonBinding, KeyBinding};
use crate::input::keysyms::Keysym;

use super::client::{Client, FullscreenRestore, TagMask};
use super::drag::DragState;
use super::layout::{self, Rect};
use super::monitor::Monitor;
use super::placement;
use super::registry::{ClientId, ClientRegistry};

pub const ALL_TAGS: TagMask = (1 << TAG_COUNT) - 1;

pub struct WindowManager<D: DisplayServer> {
    pub(crate) display: D,
    pub(crate) config: Config,
    pub(crate) clients: ClientRegistry,
    pub(crate) monitors: Vec<Monitor>,
    pub(crate) selected_monitor: usize,
    pub(crate) focused: Option<ClientId>,
    pub(crate) drag: DragState,
    pub(crate) keys: Vec<KeyBinding>,
    pub(crate) buttons: Vec<ButtonBinding>,
    running: bool,
}

impl<D: DisplayServer> WindowManager<D> {
    pub fn new(display: D, config: Config) -> Self {
        let mut wm = Self {
            display,
            config,
            clients: ClientRegistry::new(),
            monitors: Vec::new(),
            selected_monitor: 0,
            focused: None,
            drag: DragState::None,
            keys: default_keys(),
            buttons: default_buttons(),
            running: true,
        };
        wm.update_monitors();
        wm.display.grab_keys(&wm.key_specs());
        wm.focus(None);
        wm
    }

    pub(crate) fn key_specs(&self) -> Vec<(u16, Keysym)> {
        self.keys.iter().map(|k| (k.modifiers, k.keysym)).collect()
    }

    pub(crate) fn button_specs(&self) -> Vec<(u16, u8)> {
        self.buttons.iter().map(|b| (b.modifiers, b.button)).collect()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn quit(&mut self) {
        info!("Quit requested");
        self.running = false;
    }

    /// Process events until quit is requested or the connection drops.
    pub fn run(&mut self) -> Result<(), WmError> {
        while self.is_running() {
            self.display.flush();
            let event = self.display.next_event()?;
            self.handle_event(event);
        }
        Ok(())
    }

    /// Manage every window that existed before we started. Transients go
    /// second so their parents are already known.
    pub fn scan_windows(&mut self) {
        let windows = self.display.top_level_windows();
        let eligible = |wm: &Self, window: Window| {
            wm.display.window_attributes(window).map_or(false, |attrs| {
                !attrs.override_redirect
                    && (attrs.viewable || wm.display.wm_state(window) == Some(WmState::Iconic))
            })
        };

        let (transients, normal): (Vec<Window>, Vec<Window>) = windows
            .into_iter()
            .filter(|&w| eligible(self, w))
            .partition(|&w| self.display.transient_for(w).is_some());

        info!("Adopting {} existing windows", normal.len() + transients.len());
        for window in normal.into_iter().chain(transients) {
            self.manage(window);
        }
    }

    pub fn is_visible(&self, id: ClientId) -> bool {
        self.clients
            .get(id)
            .map_or(false, |c| c.is_visible_on(self.monitors[c.monitor].visible_tags()))
    }

    // Lifecycle

    pub fn manage(&mut self, window: Window) {
        if self.clients.find(window).is_some() {
            return;
        }
        let Some(attrs) = self.display.window_attributes(window) else {
            return;
        };
        if attrs.override_redirect {
            return;
        }

        let mut client = Client::new(window, attrs.geometry, attrs.border_width);
        if let Some(title) = self.display.title(window) {
            client.name = title;
        }

        let parent = self
            .display
            .transient_for(window)
            .and_then(|w| self.clients.find(w))
            .and_then(|id| self.clients.get(id));
        let is_transient = parent.is_some();
        if let Some(parent) = parent {
            client.monitor = parent.monitor;
            client.tags = parent.tags;
        } else {
            client.monitor = self.selected_monitor;
            self.apply_rules(&mut client);
        }

        client.border_width = self.config.border_px as i32;
        let area = self.monitors[client.monitor].area;
        client.geometry = placement::clamp_into(area, client.geometry, client.border_width);

        self.display.configure(window, client.geometry, client.border_width);
        self.display.set_border_color(window, self.config.border_normal.pixel());
        self.display.send_configure_notify(window, client.geometry, client.border_width);

        let window_type = self.display.window_type(window);
        if window_type.dialog {
            client.is_floating = true;
        }
        client.apply_hints(self.display.normal_hints(window));
        client.apply_wm_hints(self.display.wm_hints(window), false);
        client.is_floating |= is_transient || client.is_fixed;
        client.saved_geometry = client.geometry;

        self.display.select_client_events(window);
        self.display.grab_buttons(window, false, &self.button_specs());

        let monitor = client.monitor;
        let name = client.name.clone();
        let Some(id) = self.clients.insert(client) else {
            return;
        };
        self.monitors[monitor].attach(id);
        self.monitors[monitor].attach_stack(id);
        self.update_client_list();
        self.display.set_wm_state(window, WmState::Normal);
        debug!("Managing window {} as {} ({:?})", window, id, name);

        if window_type.fullscreen {
            self.set_fullscreen(id, true);
        }
        self.arrange(Some(monitor));
        self.display.map(window);
        if monitor == self.selected_monitor && self.is_visible(id) {
            self.focus(Some(id));
        } else {
            self.focus(self.focused);
        }
    }

    fn apply_rules(&self, client: &mut Client) {
        let class = self.display.class(client.window).unwrap_or_default();
        let title = client.name.clone();
        let mut tags = 0;
        for rule in self
            .config
            .rules
            .iter()
            .filter(|r| r.matches(&class.class, &class.instance, &title))
        {
            client.is_floating |= rule.floating;
            tags |= rule.tag_mask();
            if let Some(m) = rule.monitor.filter(|&m| m < self.monitors.len()) {
                client.monitor = m;
            }
        }
        client.tags = match tags & ALL_TAGS {
            0 => self.monitors[client.monitor].new_client_tags(),
            mask => mask,
        };
    }

    /// Stop managing a client. A second call for the same client does nothing.
    pub fn unmanage(&mut self, id: ClientId, destroyed: bool) {
        let Some(client) = self.clients.get(id) else {
            return;
        };
        let (window, monitor, original_border) = (client.window, client.monitor, client.original_border);
        self.monitors[monitor].detach(id);
        self.monitors[monitor].detach_stack(id);

        if !destroyed {
            let _grab = ServerGrab::new(&self.display);
            self.display.release_client(window, original_border);
            self.display.set_wm_state(window, WmState::Withdrawn);
        }

        self.clients.remove(id);
        debug!("Unmanaged window {} ({}), destroyed: {}", window, id, destroyed);
        if self.drag.client() == Some(id) {
            self.drag = DragState::None;
            self.display.ungrab_pointer();
        }
        if self.focused == Some(id) {
            self.focused = None;
            self.focus(None);
        } else {
            self.focus(self.focused);
        }
        self.update_client_list();
        self.arrange(Some(monitor));
    }

    pub(crate) fn update_client_list(&self) {
        let windows: Vec<Window> = self
            .monitors
            .iter()
            .flat_map(|m| m.clients.iter())
            .filter_map(|&id| self.clients.window(id))
            .collect();
        self.display.set_client_list(&windows);
    }

    /// Release every client and hand the display back in a usable state.
    pub fn shutdown(&mut self) {
        for monitor in &mut self.monitors {
            monitor.view_all();
        }
        let ids: Vec<ClientId> = self.monitors.iter().flat_map(|m| m.stack.clone()).collect();
        for id in ids {
            self.unmanage(id, false);
        }
        self.display.ungrab_keys();
        self.display.set_input_focus(None);
        self.display.set_active_window(None);
        self.display.flush();
    }

    // Geometry

    /// Re-layout one monitor, or all of them.
    pub fn arrange(&mut self, monitor: Option<usize>) {
        let targets: Vec<usize> = match monitor {
            Some(m) => vec![m],
            None => (0..self.monitors.len()).collect(),
        };
        for &m in &targets {
            self.show_hide(m);
        }
        for &m in &targets {
            self.arrange_monitor(m);
            self.restack(m);
        }
    }

    /// Move visible clients into place and hidden ones off screen.
    fn show_hide(&mut self, m: usize) {
        let visible_tags = self.monitors[m].visible_tags();
        let arranges = self.monitors[m].layout.arranges();
        for id in self.monitors[m].stack.clone() {
            let Some(c) = self.clients.get(id) else {
                continue;
            };
            let (window, geometry) = (c.window, c.geometry);
            if c.is_visible_on(visible_tags) {
                let free = (!arranges || c.is_floating) && !c.is_fullscreen;
                self.display.move_window(window, geometry.x, geometry.y);
                if free {
                    self.resize(id, geometry, false);
                }
            } else {
                self.display.move_window(window, -2 * c.outer_width(), geometry.y);
            }
        }
    }

    fn arrange_monitor(&mut self, m: usize) {
        let mon = &self.monitors[m];
        let visible_tags = mon.visible_tags();
        let visible: Vec<&Client> = mon
            .clients
            .iter()
            .filter_map(|&id| self.clients.get(id))
            .filter(|c| c.is_visible_on(visible_tags))
            .collect();
        let tiled: Vec<(ClientId, i32)> = visible
            .iter()
            .filter(|c| c.is_tiled())
            .map(|c| (c.id, c.border_width))
            .collect();
        let fullscreen: Vec<ClientId> = visible.iter().filter(|c| c.is_fullscreen).map(|c| c.id).collect();

        let placements = layout::arrange(mon.area, &tiled, mon.layout_params());
        let screen = mon.screen;
        for (id, rect) in placements {
            self.resize(id, rect, false);
        }
        for id in fullscreen {
            self.resize_client(id, screen);
        }
    }

    /// Resize honouring size hints; nothing is sent when the result is unchanged.
    pub(crate) fn resize(&mut self, id: ClientId, rect: Rect, interact: bool) {
        if let Some(geometry) = self.apply_size_hints(id, rect, interact) {
            self.resize_client(id, geometry);
        }
    }

    fn apply_size_hints(&self, id: ClientId, rect: Rect, interact: bool) -> Option<Rect> {
        let c = self.clients.get(id)?;
        let mon = &self.monitors[c.monitor];
        let mut r = Rect::new(rect.x, rect.y, rect.width.max(1), rect.height.max(1));
        let bounds = if interact { self.display.screen_rect() } else { mon.area };
        r = placement::keep_reachable(bounds, r, c.border_width);

        if self.config.respect_size_hints || c.is_floating || !mon.layout.arranges() {
            let (width, height) = c.hints.constrain(r.width, r.height);
            r.width = width;
            r.height = height;
        }
        (r != c.geometry).then_some(r)
    }

    pub(crate) fn resize_client(&mut self, id: ClientId, rect: Rect) {
        let Some(c) = self.clients.get_mut(id) else {
            return;
        };
        c.geometry = rect;
        self.display.configure(c.window, rect, c.border_width);
        self.display.send_configure_notify(c.window, rect, c.border_width);
    }

    // Client state toggles

    /// Float or tile a client. Fixed-size and fullscreen clients are left alone.
    pub fn toggle_floating(&mut self, id: ClientId) {
        let Some(c) = self.clients.get_mut(id) else {
            return;
        };
        if c.is_fullscreen || c.is_fixed {
            return;
        }
        c.is_floating = !c.is_floating;
        let monitor = c.monitor;
        if c.is_floating {
            c.saved_geometry = c.geometry;
            let area = self.monitors[monitor].area;
            let centered = placement::center_in(area, c.geometry.width, c.geometry.height, c.border_width);
            self.resize(id, centered, false);
        } else {
            let saved = c.saved_geometry;
            self.resize(id, saved, false);
        }
        self.arrange(Some(monitor));
    }

    /// Float a tiled client where it currently is, as a mouse drag does.
    pub(crate) fn float_in_place(&mut self, id: ClientId) {
        if let Some(c) = self.clients.get_mut(id) {
            if !c.is_floating && !c.is_fullscreen {
                c.is_floating = true;
                c.saved_geometry = c.geometry;
                let monitor = c.monitor;
                self.arrange(Some(monitor));
            }
        }
    }

    pub fn toggle_fullscreen(&mut self, id: ClientId) {
        if let Some(c) = self.clients.get(id) {
            let fullscreen = !c.is_fullscreen;
            self.set_fullscreen(id, fullscreen);
        }
    }

    pub fn set_fullscreen(&mut self, id: ClientId, fullscreen: bool) {
        let Some(c) = self.clients.get_mut(id) else {
            return;
        };
        if c.is_fullscreen == fullscreen {
            return;
        }
        let (window, monitor) = (c.window, c.monitor);
        if fullscreen {
            c.fullscreen_restore = Some(FullscreenRestore {
                floating: c.is_floating,
                border_width: c.border_width,
                geometry: c.geometry,
            });
            c.is_fullscreen = true;
            c.is_floating = true;
            c.border_width = 0;
            self.display.set_fullscreen_state(window, true);
            let screen = self.monitors[monitor].screen;
            self.resize_client(id, screen);
            self.arrange(Some(monitor));
        } else {
            c.is_fullscreen = false;
            let restore = c.fullscreen_restore.take();
            let geometry = match restore {
                Some(saved) => {
                    c.is_floating = saved.floating;
                    c.border_width = saved.border_width;
                    saved.geometry
                }
                None => c.geometry,
            };
            self.display.set_fullscreen_state(window, false);
            self.resize_client(id, geometry);
            self.arrange(Some(monitor));
        }
    }

    /// Ask the client to close; force it when it cannot or did not listen.
    pub fn kill_client(&mut self, id: ClientId) {
        let Some(c) = self.clients.get_mut(id) else {
            return;
        };
        let window = c.window;
        if !c.close_requested && self.display.supports_protocol(window, Protocol::DeleteWindow) {
            debug!("Asking window {} to close", window);
            c.close_requested = true;
            self.display.send_protocol(window, Protocol::DeleteWindow);
        } else {
            warn!("Killing window {}", window);
            let _grab = ServerGrab::new(&self.display);
            self.display.kill(window);
        }
    }

    // Monitors

    /// Sync monitors with the display's outputs. Returns whether anything changed.
    pub fn update_monitors(&mut self) -> bool {
        let mut rects: Vec<Rect> = Vec::new();
        for rect in self.display.monitor_rects() {
            if !rects.contains(&rect) {
                rects.push(rect);
            }
        }
        if rects.is_empty() {
            rects.push(self.display.screen_rect());
        }

        let mut changed = rects.len() != self.monitors.len();
        for (i, &rect) in rects.iter().enumerate() {
            match self.monitors.get_mut(i) {
                Some(mon) if mon.screen != rect => {
                    mon.set_screen(rect);
                    changed = true;
                }
                Some(_) => {}
                None => self.monitors.push(Monitor::new(i, rect, &self.config)),
            }
        }

        while self.monitors.len() > rects.len() {
            let Some(gone) = self.monitors.pop() else {
                break;
            };
            info!("Monitor {} removed, moving {} clients", gone.index, gone.clients.len());
            let tags = self.monitors[0].new_client_tags();
            for &id in gone.clients.iter().rev() {
                if let Some(c) = self.clients.get_mut(id) {
                    c.monitor = 0;
                    c.tags = tags;
                }
                self.monitors[0].attach(id);
            }
            for &id in gone.stack.iter().rev() {
                self.monitors[0].attach_stack(id);
            }
        }
        if self.selected_monitor >= self.monitors.len() {
            self.selected_monitor = 0;
        }
        changed
    }

    /// Monitor covering most of `rect`, defaulting to the selected one.
    pub(crate) fn monitor_for_rect(&self, rect: Rect) -> usize {
        let mut best = (self.selected_monitor, 0);
        for (i, mon) in self.monitors.iter().enumerate() {
            let area = mon.area.intersection_area(&rect);
            if area > best.1 {
                best = (i, area);
            }
        }
        best.0
    }

    pub(crate) fn monitor_at(&self, x: i32, y: i32) -> usize {
        self.monitors
            .iter()
            .position(|m| m.screen.contains_point(x, y))
            .unwrap_or(self.selected_monitor)
    }

    pub(crate) fn monitor_in_direction(&self, dir: i32) -> usize {
        let n = self.monitors.len() as i32;
        (self.selected_monitor as i32 + dir).rem_euclid(n) as usize
    }

    pub fn send_to_monitor(&mut self, id: ClientId, target: usize) {
        let Some(c) = self.clients.get_mut(id) else {
            return;
        };
        if c.monitor == target || target >= self.monitors.len() {
            return;
        }
        let from = c.monitor;
        c.monitor = target;
        c.tags = self.monitors[target].new_client_tags();
        self.monitors[from].detach(id);
        self.monitors[from].detach_stack(id);
        self.monitors[target].attach(id);
        self.monitors[target].attach_stack(id);
        if self.focused == Some(id) {
            self.unfocus(id, false);
            self.focused = None;
        }
        self.focus(None);
        self.arrange(None);
    }
}

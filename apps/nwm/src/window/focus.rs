use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::core::display::{DisplayServer, Protocol};

use super::client::TagMask;
use super::manager::WindowManager;
use super::registry::{ClientId, ClientRegistry};

/// Default focus target: the first visible tiled client in layout order,
/// else the first visible client of any kind.
pub fn select_focus(order: &[ClientId], clients: &ClientRegistry, visible_tags: TagMask) -> Option<ClientId> {
    let visible = || {
        order
            .iter()
            .filter_map(|&id| clients.get(id))
            .filter(move |c| c.is_visible_on(visible_tags))
    };
    visible()
        .find(|c| !c.is_floating)
        .or_else(|| visible().next())
        .map(|c| c.id)
}

impl<D: DisplayServer> WindowManager<D> {
    /// Move focus to `target`, or to the default client of the selected
    /// monitor when no visible target is given.
    pub fn focus(&mut self, target: Option<ClientId>) {
        let target = target.filter(|&id| self.is_visible(id)).or_else(|| {
            let mon = &self.monitors[self.selected_monitor];
            select_focus(&mon.clients, &self.clients, mon.visible_tags())
        });

        if let Some(previous) = self.focused.filter(|&p| Some(p) != target) {
            self.unfocus(previous, false);
        }

        let Some(id) = target else {
            self.display.set_input_focus(None);
            self.display.set_active_window(None);
            self.focused = None;
            return;
        };
        let Some(c) = self.clients.get_mut(id) else {
            return;
        };
        let (window, monitor) = (c.window, c.monitor);
        if c.is_urgent {
            c.is_urgent = false;
            self.display.set_urgency(window, false);
        }
        self.selected_monitor = monitor;
        self.monitors[monitor].bring_to_front(id);
        self.display.grab_buttons(window, true, &self.button_specs());
        self.display.set_border_color(window, self.config.border_selected.pixel());
        self.restack(monitor);
        self.give_input_focus(id);
        self.focused = Some(id);
        debug!("Focused window {} ({})", window, id);
    }

    /// Hand X input focus to a client that accepts it.
    pub(crate) fn give_input_focus(&self, id: ClientId) {
        let Some(c) = self.clients.get(id) else {
            return;
        };
        if !c.never_focus {
            self.display.set_input_focus(Some(c.window));
            self.display.set_active_window(Some(c.window));
        }
        if self.display.supports_protocol(c.window, Protocol::TakeFocus) {
            self.display.send_protocol(c.window, Protocol::TakeFocus);
        }
    }

    pub(crate) fn unfocus(&mut self, id: ClientId, release_input: bool) {
        let Some(window) = self.clients.window(id) else {
            return;
        };
        self.display.grab_buttons(window, false, &self.button_specs());
        self.display.set_border_color(window, self.config.border_normal.pixel());
        if release_input {
            self.display.set_input_focus(None);
            self.display.set_active_window(None);
        }
    }

    /// Cycle focus through the visible clients of the selected monitor.
    pub fn focus_stack(&mut self, dir: i32) {
        let Some(current) = self.focused else {
            return;
        };
        let mon = &self.monitors[self.selected_monitor];
        let visible_tags = mon.visible_tags();
        let visible: Vec<ClientId> = mon
            .clients
            .iter()
            .copied()
            .filter(|&id| self.clients.get(id).map_or(false, |c| c.is_visible_on(visible_tags)))
            .collect();
        let Some(pos) = visible.iter().position(|&id| id == current) else {
            return;
        };
        let n = visible.len() as i32;
        let next = visible[(pos as i32 + dir).rem_euclid(n) as usize];
        if next != current {
            self.focus(Some(next));
        }
    }

    /// Apply stacking order: fullscreen on top, then floating, then tiled;
    /// within each layer the most recently focused client is highest.
    pub(crate) fn restack(&mut self, m: usize) {
        let mon = &self.monitors[m];
        let visible_tags = mon.visible_tags();
        let arranges = mon.layout.arranges();
        let mut layers: [Vec<Window>; 3] = Default::default();
        for c in mon.stack.iter().filter_map(|&id| self.clients.get(id)) {
            if !c.is_visible_on(visible_tags) {
                continue;
            }
            let layer = if c.is_fullscreen {
                0
            } else if c.is_floating || !arranges {
                1
            } else {
                2
            };
            layers[layer].push(c.window);
        }
        let order = layers.concat();
        self.display.restack(&order);
        self.display.discard_enter_events();
    }
}

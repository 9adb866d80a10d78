use nwm_config::TAG_COUNT;
use tracing::{debug, warn};

use crate::core::display::DisplayServer;
use crate::input::bindings::{Action, Launcher};
use crate::spawn;

use super::client::TagMask;
use super::manager::{WindowManager, ALL_TAGS};

impl<D: DisplayServer> WindowManager<D> {
    /// Execute a bound action against the selected monitor and client.
    pub fn run_action(&mut self, action: Action) {
        debug!("Action: {:?}", action);
        let m = self.selected_monitor;
        match action {
            Action::Spawn(launcher) => self.launch(launcher),
            Action::ToggleBar => {
                self.monitors[m].toggle_bar();
                self.arrange(Some(m));
            }
            Action::FocusStack(dir) => self.focus_stack(dir),
            Action::AdjustMasterCount(delta) => {
                if self.monitors[m].adjust_master_count(delta) {
                    self.arrange(Some(m));
                }
            }
            Action::AdjustMasterFactor(delta) => {
                if self.monitors[m].layout.arranges() && self.monitors[m].adjust_master_factor(delta) {
                    self.arrange(Some(m));
                }
            }
            Action::Zoom => self.zoom(),
            Action::ViewPrevious => {
                if self.monitors[m].view_previous() {
                    self.refresh_view(m);
                }
            }
            Action::KillClient => {
                if let Some(id) = self.focused {
                    self.kill_client(id);
                }
            }
            Action::SetLayout(mode) => {
                self.monitors[m].set_layout(mode);
                debug!("Monitor {} layout {}", m, mode.symbol());
                self.arrange(Some(m));
            }
            Action::ToggleLayout => {
                self.monitors[m].toggle_layout();
                debug!("Monitor {} layout {}", m, self.monitors[m].layout.symbol());
                self.arrange(Some(m));
            }
            Action::ToggleFloating => {
                if let Some(id) = self.focused {
                    self.toggle_floating(id);
                }
            }
            Action::ToggleFullscreen => {
                if let Some(id) = self.focused {
                    self.toggle_fullscreen(id);
                }
            }
            Action::View(n) => {
                if self.monitors[m].view_tag(n) {
                    debug!("Viewing tag {}", self.monitors[m].tags[n].name);
                    self.refresh_view(m);
                }
            }
            Action::ViewAll => {
                if self.monitors[m].view_all() {
                    self.refresh_view(m);
                }
            }
            Action::ToggleView(n) => {
                if self.monitors[m].toggle_tag(n) {
                    self.refresh_view(m);
                }
            }
            Action::Tag(n) if n < TAG_COUNT => self.tag_client(1 << n),
            Action::Tag(_) => {}
            Action::TagAll => self.tag_client(ALL_TAGS),
            Action::ToggleTag(n) => self.toggle_client_tag(n),
            Action::FocusMonitor(dir) => self.focus_monitor(dir),
            Action::TagMonitor(dir) => {
                if let Some(id) = self.focused {
                    let target = self.monitor_in_direction(dir);
                    self.send_to_monitor(id, target);
                }
            }
            Action::MoveMouse => self.start_move(),
            Action::ResizeMouse => self.start_resize(),
            Action::Quit => self.quit(),
        }
    }

    fn launch(&self, launcher: Launcher) {
        let command = match launcher {
            Launcher::Terminal => &self.config.terminal,
            Launcher::Menu => &self.config.menu,
        };
        if let Err(e) = spawn::spawn(command) {
            warn!("Failed to launch {:?}: {}", command, e);
        }
    }

    /// Keep focus on the current client if it is still shown, then re-layout.
    fn refresh_view(&mut self, m: usize) {
        self.focus(self.focused);
        self.arrange(Some(m));
    }

    /// Replace the focused client's tags with `mask`.
    pub fn tag_client(&mut self, mask: TagMask) {
        let mask = mask & ALL_TAGS;
        let Some(id) = self.focused else {
            return;
        };
        if mask == 0 {
            return;
        }
        if let Some(c) = self.clients.get_mut(id) {
            c.tags = mask;
        }
        let m = self.selected_monitor;
        self.refresh_view(m);
    }

    /// Flip one tag on the focused client; the last tag is never removed.
    pub fn toggle_client_tag(&mut self, n: usize) {
        if n >= TAG_COUNT {
            return;
        }
        let Some(id) = self.focused else {
            return;
        };
        let Some(c) = self.clients.get_mut(id) else {
            return;
        };
        let tags = c.tags ^ (1 << n);
        if tags == 0 {
            return;
        }
        c.tags = tags;
        let m = self.selected_monitor;
        self.refresh_view(m);
    }

    /// Swap the focused tiled client with the master, or promote the next
    /// tiled client when the master is already focused.
    pub fn zoom(&mut self) {
        let m = self.selected_monitor;
        if !self.monitors[m].layout.arranges() {
            return;
        }
        let Some(focused) = self.focused.filter(|&id| self.clients.get(id).map_or(false, |c| c.is_tiled())) else {
            return;
        };
        let visible_tags = self.monitors[m].visible_tags();
        let tiled: Vec<_> = self.monitors[m]
            .clients
            .iter()
            .copied()
            .filter(|&id| {
                self.clients
                    .get(id)
                    .map_or(false, |c| c.is_tiled() && c.is_visible_on(visible_tags))
            })
            .collect();
        let target = if tiled.first() == Some(&focused) {
            match tiled.get(1) {
                Some(&next) => next,
                None => return,
            }
        } else {
            focused
        };
        self.monitors[m].detach(target);
        self.monitors[m].attach(target);
        self.focus(Some(target));
        self.arrange(Some(m));
    }

    pub fn focus_monitor(&mut self, dir: i32) {
        if self.monitors.len() < 2 {
            return;
        }
        let target = self.monitor_in_direction(dir);
        if target == self.selected_monitor {
            return;
        }
        if let Some(previous) = self.focused.take() {
            self.unfocus(previous, false);
        }
        self.selected_monitor = target;
        self.focus(None);
    }
}

use tracing::debug;

use crate::core::display::{DisplayServer, PointerCursor};

use super::layout::Rect;
use super::manager::WindowManager;
use super::placement::snap;
use super::registry::ClientId;

/// Motion events closer together than this are dropped while dragging.
const MOTION_INTERVAL_MS: u32 = 1000 / 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragState {
    None,
    Moving {
        client: ClientId,
        start_pointer_x: i32,
        start_pointer_y: i32,
        start_x: i32,
        start_y: i32,
        last_motion: u32,
    },
    Resizing {
        client: ClientId,
        last_motion: u32,
    },
}

impl DragState {
    pub fn client(&self) -> Option<ClientId> {
        match *self {
            DragState::None => None,
            DragState::Moving { client, .. } | DragState::Resizing { client, .. } => Some(client),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, DragState::None)
    }

    /// Record `time` and report whether enough time passed since the last motion.
    fn accept_motion(&mut self, time: u32) -> bool {
        match self {
            DragState::None => false,
            DragState::Moving { last_motion, .. } | DragState::Resizing { last_motion, .. } => {
                if time.wrapping_sub(*last_motion) <= MOTION_INTERVAL_MS {
                    return false;
                }
                *last_motion = time;
                true
            }
        }
    }
}

impl<D: DisplayServer> WindowManager<D> {
    pub fn start_move(&mut self) {
        let Some(id) = self.focused else {
            return;
        };
        let Some(c) = self.clients.get(id) else {
            return;
        };
        if c.is_fullscreen {
            return;
        }
        let (start_x, start_y, monitor) = (c.geometry.x, c.geometry.y, c.monitor);
        self.restack(monitor);
        let Some((px, py)) = self.display.pointer_position() else {
            return;
        };
        if !self.display.grab_pointer(PointerCursor::Move) {
            return;
        }
        debug!("Moving {}", id);
        self.drag = DragState::Moving {
            client: id,
            start_pointer_x: px,
            start_pointer_y: py,
            start_x,
            start_y,
            last_motion: 0,
        };
    }

    /// Begin a resize drag. Fixed-size clients cannot be resized.
    pub fn start_resize(&mut self) {
        let Some(id) = self.focused else {
            return;
        };
        let Some(c) = self.clients.get(id) else {
            return;
        };
        if c.is_fullscreen || c.is_fixed {
            return;
        }
        let (window, geometry, border, monitor) = (c.window, c.geometry, c.border_width, c.monitor);
        self.restack(monitor);
        if !self.display.grab_pointer(PointerCursor::Resize) {
            return;
        }
        self.display.warp_pointer(window, geometry.width + border - 1, geometry.height + border - 1);
        debug!("Resizing {}", id);
        self.drag = DragState::Resizing { client: id, last_motion: 0 };
    }

    pub fn drag_motion(&mut self, root_x: i32, root_y: i32, time: u32) {
        if !self.drag.accept_motion(time) {
            return;
        }
        match self.drag {
            DragState::None => {}
            DragState::Moving { client, start_pointer_x, start_pointer_y, start_x, start_y, .. } => {
                self.drag_move(client, start_x + root_x - start_pointer_x, start_y + root_y - start_pointer_y);
            }
            DragState::Resizing { client, .. } => self.drag_resize(client, root_x, root_y),
        }
    }

    fn drag_move(&mut self, id: ClientId, mut x: i32, mut y: i32) {
        let Some(c) = self.clients.get(id) else {
            return;
        };
        let mon = &self.monitors[self.selected_monitor];
        let area = mon.area;
        let distance = self.config.snap_px as i32;
        let (width, height) = (c.outer_width(), c.outer_height());

        x = snap(x, area.x, distance)
            .or_else(|| snap(x + width, area.right(), distance).map(|r| r - width))
            .unwrap_or(x);
        y = snap(y, area.y, distance)
            .or_else(|| snap(y + height, area.bottom(), distance).map(|b| b - height))
            .unwrap_or(y);

        let arranges = mon.layout.arranges();
        let geometry = c.geometry;
        let mut floating = c.is_floating;
        if !floating
            && arranges
            && ((x - geometry.x).abs() > distance || (y - geometry.y).abs() > distance)
        {
            self.float_in_place(id);
            floating = true;
        }
        if !arranges || floating {
            self.resize(id, Rect::new(x, y, geometry.width, geometry.height), true);
        }
    }

    fn drag_resize(&mut self, id: ClientId, root_x: i32, root_y: i32) {
        let Some(c) = self.clients.get(id) else {
            return;
        };
        let geometry = c.geometry;
        let border = c.border_width;
        let width = (root_x - geometry.x - 2 * border + 1).max(1);
        let height = (root_y - geometry.y - 2 * border + 1).max(1);

        let arranges = self.monitors[c.monitor].layout.arranges();
        let distance = self.config.snap_px as i32;
        let mut floating = c.is_floating;
        if !floating
            && arranges
            && ((width - geometry.width).abs() > distance || (height - geometry.height).abs() > distance)
        {
            self.float_in_place(id);
            floating = true;
        }
        if !arranges || floating {
            self.resize(id, Rect::new(geometry.x, geometry.y, width, height), true);
        }
    }

    /// Finish a drag; a client dropped onto another monitor moves there.
    pub fn end_drag(&mut self) {
        let drag = std::mem::replace(&mut self.drag, DragState::None);
        let Some(id) = drag.client() else {
            return;
        };
        let Some(c) = self.clients.get(id) else {
            self.display.ungrab_pointer();
            return;
        };
        let (window, geometry, border, monitor) = (c.window, c.geometry, c.border_width, c.monitor);
        if matches!(drag, DragState::Resizing { .. }) {
            self.display.warp_pointer(window, geometry.width + border - 1, geometry.height + border - 1);
        }
        self.display.ungrab_pointer();

        let target = self.monitor_for_rect(geometry.outer(border));
        if target != monitor {
            self.send_to_monitor(id, target);
            self.selected_monitor = target;
            self.focus(None);
        }
    }
}

use nwm_config::{Config, TAG_COUNT};

use super::client::TagMask;
use super::layout::{LayoutMode, LayoutParams, Rect};
use super::registry::ClientId;

pub const MIN_MASTER_FACTOR: f32 = 0.05;
pub const MAX_MASTER_FACTOR: f32 = 0.95;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub visible: bool,
}

#[derive(Debug, Clone)]
pub struct Monitor {
    pub index: usize,
    /// Full output rectangle.
    pub screen: Rect,
    /// Part of `screen` available to clients.
    pub area: Rect,
    pub show_bar: bool,
    top_bar: bool,
    bar_height: i32,
    pub tags: Vec<Tag>,
    pub selected_tag: usize,
    pub previous_tag: usize,
    pub layout: LayoutMode,
    pub previous_layout: LayoutMode,
    pub master_factor: f32,
    pub master_count: u32,
    /// Client order used by the layout; new clients go first.
    pub clients: Vec<ClientId>,
    /// Focus history, most recent first; drives stacking.
    pub stack: Vec<ClientId>,
}

impl Monitor {
    pub fn new(index: usize, screen: Rect, config: &Config) -> Self {
        let mut tags: Vec<Tag> = config
            .tags
            .iter()
            .take(TAG_COUNT)
            .map(|name| Tag { name: name.clone(), visible: false })
            .collect();
        while tags.len() < TAG_COUNT {
            let name = (tags.len() + 1).to_string();
            tags.push(Tag { name, visible: false });
        }
        tags[0].visible = true;

        let mut monitor = Self {
            index,
            screen,
            area: screen,
            show_bar: config.show_bar,
            top_bar: config.top_bar,
            bar_height: config.bar_height as i32,
            tags,
            selected_tag: 0,
            previous_tag: 0,
            layout: LayoutMode::Tiled,
            previous_layout: LayoutMode::Floating,
            master_factor: config.master_factor.clamp(MIN_MASTER_FACTOR, MAX_MASTER_FACTOR),
            master_count: config.master_count,
            clients: Vec::new(),
            stack: Vec::new(),
        };
        monitor.update_area();
        monitor
    }

    pub fn set_screen(&mut self, screen: Rect) {
        self.screen = screen;
        self.update_area();
    }

    fn update_area(&mut self) {
        self.area = self.screen;
        if self.show_bar && self.bar_height < self.screen.height {
            self.area.height -= self.bar_height;
            if self.top_bar {
                self.area.y += self.bar_height;
            }
        }
    }

    pub fn toggle_bar(&mut self) {
        self.show_bar = !self.show_bar;
        self.update_area();
    }

    pub fn visible_tags(&self) -> TagMask {
        self.tags
            .iter()
            .enumerate()
            .filter(|(_, t)| t.visible)
            .fold(0, |mask, (i, _)| mask | 1 << i)
    }

    /// Tags given to a client created on this monitor.
    pub fn new_client_tags(&self) -> TagMask {
        match self.visible_tags() {
            0 => 1 << self.selected_tag,
            mask => mask,
        }
    }

    fn show_only(&mut self, tags: TagMask) {
        for (i, tag) in self.tags.iter_mut().enumerate() {
            tag.visible = tags & (1 << i) != 0;
        }
    }

    /// Show tag `n` alone. Returns false when nothing changes.
    pub fn view_tag(&mut self, n: usize) -> bool {
        if n >= TAG_COUNT || self.visible_tags() == 1 << n {
            return false;
        }
        self.previous_tag = self.selected_tag;
        self.show_only(1 << n);
        self.selected_tag = n;
        true
    }

    pub fn view_previous(&mut self) -> bool {
        self.view_tag(self.previous_tag)
    }

    pub fn view_all(&mut self) -> bool {
        let all = (1 << TAG_COUNT) - 1;
        if self.visible_tags() == all {
            return false;
        }
        self.show_only(all);
        true
    }

    /// Flip the visibility of tag `n` independently of the others.
    pub fn toggle_tag(&mut self, n: usize) -> bool {
        if n >= TAG_COUNT {
            return false;
        }
        self.tags[n].visible = !self.tags[n].visible;
        if !self.tags[self.selected_tag].visible {
            if let Some(first) = self.tags.iter().position(|t| t.visible) {
                self.selected_tag = first;
            }
        }
        true
    }

    pub fn adjust_master_factor(&mut self, delta: f32) -> bool {
        let factor = (self.master_factor + delta).clamp(MIN_MASTER_FACTOR, MAX_MASTER_FACTOR);
        if (factor - self.master_factor).abs() < f32::EPSILON {
            return false;
        }
        self.master_factor = factor;
        true
    }

    pub fn adjust_master_count(&mut self, delta: i32) -> bool {
        let count = (self.master_count as i64 + delta as i64).max(0) as u32;
        let changed = count != self.master_count;
        self.master_count = count;
        changed
    }

    pub fn set_layout(&mut self, mode: LayoutMode) -> bool {
        if mode == self.layout {
            return false;
        }
        self.previous_layout = self.layout;
        self.layout = mode;
        true
    }

    pub fn toggle_layout(&mut self) {
        std::mem::swap(&mut self.layout, &mut self.previous_layout);
    }

    pub fn layout_params(&self) -> LayoutParams {
        LayoutParams {
            mode: self.layout,
            master_factor: self.master_factor,
            master_count: self.master_count,
        }
    }

    pub fn attach(&mut self, id: ClientId) {
        self.clients.insert(0, id);
    }

    pub fn attach_stack(&mut self, id: ClientId) {
        self.stack.insert(0, id);
    }

    pub fn detach(&mut self, id: ClientId) {
        self.clients.retain(|&c| c != id);
    }

    pub fn detach_stack(&mut self, id: ClientId) {
        self.stack.retain(|&c| c != id);
    }

    /// Move `id` to the front of the focus history.
    pub fn bring_to_front(&mut self, id: ClientId) {
        self.detach_stack(id);
        self.attach_stack(id);
    }
}

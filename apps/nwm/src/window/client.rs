use x11rb::protocol::xproto::Window;

use super::layout::Rect;
use super::registry::ClientId;

/// Bitset over a monitor's tags; bit `n` is tag `n`.
pub type TagMask = u32;

const P_MIN_SIZE: u32 = 1 << 4;
const P_MAX_SIZE: u32 = 1 << 5;
const P_RESIZE_INC: u32 = 1 << 6;
const P_ASPECT: u32 = 1 << 7;
const P_BASE_SIZE: u32 = 1 << 8;

const INPUT_HINT: u32 = 1 << 0;
const URGENCY_HINT: u32 = 1 << 8;

/// ICCCM size constraints, normalized so zero means "unset".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SizeHints {
    pub base_width: i32,
    pub base_height: i32,
    pub inc_width: i32,
    pub inc_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl SizeHints {
    /// Decode the 18-word `WM_NORMAL_HINTS` property.
    pub fn from_wm_normal_hints(raw: &[u32]) -> Self {
        if raw.len() < 18 {
            return Self::default();
        }
        let flags = raw[0];
        let field = |i: usize| raw[i] as i32;
        let mut hints = Self::default();

        if flags & P_BASE_SIZE != 0 {
            hints.base_width = field(15);
            hints.base_height = field(16);
        } else if flags & P_MIN_SIZE != 0 {
            hints.base_width = field(5);
            hints.base_height = field(6);
        }
        if flags & P_RESIZE_INC != 0 {
            hints.inc_width = field(9);
            hints.inc_height = field(10);
        }
        if flags & P_MAX_SIZE != 0 {
            hints.max_width = field(7);
            hints.max_height = field(8);
        }
        if flags & P_MIN_SIZE != 0 {
            hints.min_width = field(5);
            hints.min_height = field(6);
        } else if flags & P_BASE_SIZE != 0 {
            hints.min_width = field(15);
            hints.min_height = field(16);
        }
        if flags & P_ASPECT != 0 && raw[11] != 0 && raw[14] != 0 {
            hints.min_aspect = raw[12] as f32 / raw[11] as f32;
            hints.max_aspect = raw[13] as f32 / raw[14] as f32;
        }
        hints
    }

    /// A window whose minimum and maximum sizes coincide cannot be resized.
    pub fn is_fixed(&self) -> bool {
        self.max_width > 0
            && self.max_height > 0
            && self.max_width == self.min_width
            && self.max_height == self.min_height
    }

    /// Bring a requested content size in line with the hints.
    pub fn constrain(&self, mut width: i32, mut height: i32) -> (i32, i32) {
        let base_is_min = self.base_width == self.min_width && self.base_height == self.min_height;
        if !base_is_min {
            // aspect ratio is computed without the base size
            width -= self.base_width;
            height -= self.base_height;
        }
        if self.min_aspect > 0.0 && self.max_aspect > 0.0 && width > 0 && height > 0 {
            if self.max_aspect < width as f32 / height as f32 {
                width = (height as f32 * self.max_aspect + 0.5) as i32;
            } else if self.min_aspect < height as f32 / width as f32 {
                height = (width as f32 * self.min_aspect + 0.5) as i32;
            }
        }
        if base_is_min {
            width -= self.base_width;
            height -= self.base_height;
        }
        if self.inc_width > 0 {
            width -= width % self.inc_width;
        }
        if self.inc_height > 0 {
            height -= height % self.inc_height;
        }
        width = (width + self.base_width).max(self.min_width);
        height = (height + self.base_height).max(self.min_height);
        if self.max_width > 0 {
            width = width.min(self.max_width);
        }
        if self.max_height > 0 {
            height = height.min(self.max_height);
        }
        (width.max(1), height.max(1))
    }
}

/// The parts of `WM_HINTS` the manager acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WmHints {
    /// `Some(false)` marks a window that never wants input focus.
    pub input: Option<bool>,
    pub urgent: bool,
}

impl WmHints {
    pub fn from_wm_hints(raw: &[u32]) -> Self {
        let Some(&flags) = raw.first() else {
            return Self::default();
        };
        Self {
            input: (flags & INPUT_HINT != 0).then(|| raw.get(1).copied().unwrap_or(1) != 0),
            urgent: flags & URGENCY_HINT != 0,
        }
    }
}

/// State saved on entering fullscreen so leaving it restores the client exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FullscreenRestore {
    pub floating: bool,
    pub border_width: i32,
    pub geometry: Rect,
}

#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
    pub window: Window,
    pub name: String,
    pub geometry: Rect,
    /// Geometry before the last switch to floating; restored when tiled again.
    pub saved_geometry: Rect,
    pub border_width: i32,
    /// Border the window had before it was managed; restored on release.
    pub original_border: i32,
    pub hints: SizeHints,
    pub is_floating: bool,
    pub is_fullscreen: bool,
    pub is_fixed: bool,
    pub is_urgent: bool,
    pub never_focus: bool,
    /// A polite close was sent and has not been honoured yet.
    pub close_requested: bool,
    pub fullscreen_restore: Option<FullscreenRestore>,
    /// Index of the owning monitor.
    pub monitor: usize,
    pub tags: TagMask,
}

impl Client {
    pub fn new(window: Window, geometry: Rect, original_border: i32) -> Self {
        Self {
            id: ClientId::default(),
            window,
            name: String::from("broken"),
            geometry,
            saved_geometry: geometry,
            border_width: original_border,
            original_border,
            hints: SizeHints::default(),
            is_floating: false,
            is_fullscreen: false,
            is_fixed: false,
            is_urgent: false,
            never_focus: false,
            close_requested: false,
            fullscreen_restore: None,
            monitor: 0,
            tags: 0,
        }
    }

    pub fn is_visible_on(&self, visible_tags: TagMask) -> bool {
        self.tags & visible_tags != 0
    }

    /// Tiled clients are the ones the layout engine positions.
    pub fn is_tiled(&self) -> bool {
        !self.is_floating && !self.is_fullscreen
    }

    /// Width including both borders.
    pub fn outer_width(&self) -> i32 {
        self.geometry.width + 2 * self.border_width
    }

    pub fn outer_height(&self) -> i32 {
        self.geometry.height + 2 * self.border_width
    }

    pub fn apply_hints(&mut self, hints: SizeHints) {
        self.hints = hints;
        self.is_fixed = hints.is_fixed();
    }

    pub fn apply_wm_hints(&mut self, hints: WmHints, focused: bool) {
        // the focused client's urgency is cleared rather than recorded
        self.is_urgent = hints.urgent && !focused;
        self.never_focus = hints.input == Some(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal_hints(flags: u32, values: &[(usize, u32)]) -> Vec<u32> {
        let mut raw = vec![0u32; 18];
        raw[0] = flags;
        for &(i, v) in values {
            raw[i] = v;
        }
        raw
    }

    #[test]
    fn test_fixed_size_detection() {
        let raw = normal_hints(P_MIN_SIZE | P_MAX_SIZE, &[(5, 300), (6, 200), (7, 300), (8, 200)]);
        let hints = SizeHints::from_wm_normal_hints(&raw);
        assert!(hints.is_fixed());
        assert_eq!(hints.constrain(800, 600), (300, 200));
        assert_eq!(hints.constrain(10, 10), (300, 200));
    }

    #[test]
    fn test_min_size_doubles_as_base() {
        let raw = normal_hints(P_MIN_SIZE, &[(5, 50), (6, 40)]);
        let hints = SizeHints::from_wm_normal_hints(&raw);
        assert_eq!(hints.base_width, 50);
        assert_eq!(hints.min_height, 40);
        assert!(!hints.is_fixed());
        assert_eq!(hints.constrain(20, 20), (50, 40));
    }

    #[test]
    fn test_resize_increments_snap_down() {
        // terminal style: base 4x4, cells of 10x20
        let raw = normal_hints(P_BASE_SIZE | P_RESIZE_INC, &[(15, 4), (16, 4), (9, 10), (10, 20)]);
        let hints = SizeHints::from_wm_normal_hints(&raw);
        assert_eq!(hints.constrain(4 + 95, 4 + 67), (4 + 90, 4 + 60));
    }

    #[test]
    fn test_aspect_ratio_limits_width() {
        let raw = normal_hints(P_ASPECT, &[(11, 1), (12, 1), (13, 1), (14, 1)]);
        let hints = SizeHints::from_wm_normal_hints(&raw);
        assert_eq!(hints.constrain(400, 200), (200, 200));
    }

    #[test]
    fn test_empty_hints_pass_through() {
        let hints = SizeHints::from_wm_normal_hints(&[]);
        assert_eq!(hints, SizeHints::default());
        assert_eq!(hints.constrain(640, 480), (640, 480));
        assert_eq!(hints.constrain(0, -3), (1, 1));
    }

    #[test]
    fn test_wm_hints_input_and_urgency() {
        assert_eq!(WmHints::from_wm_hints(&[]), WmHints::default());
        let hints = WmHints::from_wm_hints(&[INPUT_HINT | URGENCY_HINT, 0]);
        assert_eq!(hints.input, Some(false));
        assert!(hints.urgent);

        let mut client = Client::new(1, Rect::new(0, 0, 10, 10), 0);
        client.apply_wm_hints(hints, true);
        assert!(!client.is_urgent);
        assert!(client.never_focus);
    }
}

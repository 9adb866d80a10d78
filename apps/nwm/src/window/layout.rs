/// Screen-space rectangle. Width and height exclude the border unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Area shared with `other`, zero when disjoint.
    pub fn intersection_area(&self, other: &Rect) -> i64 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w <= 0 || h <= 0 {
            0
        } else {
            w as i64 * h as i64
        }
    }

    /// Grow by `border` on every side.
    pub fn outer(&self, border: i32) -> Rect {
        Rect::new(self.x, self.y, self.width + 2 * border, self.height + 2 * border)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Tiled,
    Floating,
    Monocle,
}

impl LayoutMode {
    pub fn symbol(self) -> &'static str {
        match self {
            LayoutMode::Tiled => "[]=",
            LayoutMode::Floating => "><>",
            LayoutMode::Monocle => "[M]",
        }
    }

    /// Whether the mode positions clients at all.
    pub fn arranges(self) -> bool {
        self != LayoutMode::Floating
    }
}

/// Layout parameters shared by every mode.
#[derive(Debug, Clone, Copy)]
pub struct LayoutParams {
    pub mode: LayoutMode,
    pub master_factor: f32,
    pub master_count: u32,
}

/// Compute placements for the tiled (non-floating, non-fullscreen) clients of
/// one monitor, in client order. Each entry is `(id, border_width)`; the
/// returned rectangles are content geometry with the border already removed.
pub fn arrange<T: Copy>(area: Rect, clients: &[(T, i32)], params: LayoutParams) -> Vec<(T, Rect)> {
    match params.mode {
        LayoutMode::Tiled => tile(area, clients, params.master_factor, params.master_count),
        LayoutMode::Monocle => monocle(area, clients),
        LayoutMode::Floating => Vec::new(),
    }
}

pub fn tile<T: Copy>(area: Rect, clients: &[(T, i32)], master_factor: f32, master_count: u32) -> Vec<(T, Rect)> {
    let n = clients.len();
    if n == 0 {
        return Vec::new();
    }

    let nmaster = master_count as usize;
    let master_width = if n > nmaster {
        if nmaster == 0 {
            0
        } else {
            (area.width as f32 * master_factor) as i32
        }
    } else {
        area.width
    };

    let mut placements = Vec::with_capacity(n);
    let mut master_y = 0;
    let mut stack_y = 0;
    for (i, &(id, border)) in clients.iter().enumerate() {
        let cell = if i < nmaster {
            let height = (area.height - master_y) / (n.min(nmaster) - i) as i32;
            let cell = Rect::new(area.x, area.y + master_y, master_width, height);
            master_y += height;
            cell
        } else {
            let height = (area.height - stack_y) / (n - i) as i32;
            let cell = Rect::new(area.x + master_width, area.y + stack_y, area.width - master_width, height);
            stack_y += height;
            cell
        };
        placements.push((id, shrink(cell, border)));
    }
    placements
}

pub fn monocle<T: Copy>(area: Rect, clients: &[(T, i32)]) -> Vec<(T, Rect)> {
    clients.iter().map(|&(id, border)| (id, shrink(area, border))).collect()
}

/// Remove the border from a cell; content never collapses below 1x1.
fn shrink(cell: Rect, border: i32) -> Rect {
    Rect::new(
        cell.x,
        cell.y,
        (cell.width - 2 * border).max(1),
        (cell.height - 2 * border).max(1),
    )
}

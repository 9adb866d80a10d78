//! The handful of X keysyms and modifier bits the default bindings use.

pub type Keysym = u32;

pub const XK_SPACE: Keysym = 0x0020;
pub const XK_COMMA: Keysym = 0x002c;
pub const XK_PERIOD: Keysym = 0x002e;
pub const XK_0: Keysym = 0x0030;
pub const XK_1: Keysym = 0x0031;
pub const XK_B: Keysym = 0x0062;
pub const XK_C: Keysym = 0x0063;
pub const XK_D: Keysym = 0x0064;
pub const XK_F: Keysym = 0x0066;
pub const XK_H: Keysym = 0x0068;
pub const XK_I: Keysym = 0x0069;
pub const XK_J: Keysym = 0x006a;
pub const XK_K: Keysym = 0x006b;
pub const XK_L: Keysym = 0x006c;
pub const XK_M: Keysym = 0x006d;
pub const XK_P: Keysym = 0x0070;
pub const XK_Q: Keysym = 0x0071;
pub const XK_T: Keysym = 0x0074;
pub const XK_TAB: Keysym = 0xff09;
pub const XK_RETURN: Keysym = 0xff0d;
pub const XK_NUM_LOCK: Keysym = 0xff7f;

pub const SHIFT: u16 = 1 << 0;
pub const LOCK: u16 = 1 << 1;
pub const CONTROL: u16 = 1 << 2;
pub const MOD1: u16 = 1 << 3;
pub const MOD2: u16 = 1 << 4;
pub const MOD3: u16 = 1 << 5;
pub const MOD4: u16 = 1 << 6;
pub const MOD5: u16 = 1 << 7;

const RELEVANT: u16 = SHIFT | CONTROL | MOD1 | MOD2 | MOD3 | MOD4 | MOD5;

/// Strip lock modifiers and pointer-button bits from an event state.
pub fn clean_mask(state: u16, numlock: u16) -> u16 {
    state & !(numlock | LOCK) & RELEVANT
}

/// Every lock-modifier combination a grab must cover for `modifiers` to
/// fire regardless of CapsLock/NumLock.
pub fn lock_variants(modifiers: u16, numlock: u16) -> [u16; 4] {
    [modifiers, modifiers | LOCK, modifiers | numlock, modifiers | numlock | LOCK]
}

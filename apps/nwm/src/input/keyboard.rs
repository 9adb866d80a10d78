use x11rb::protocol::xproto::Keycode;

use super::keysyms::{Keysym, XK_NUM_LOCK};

/// Snapshot of the server's keycode to keysym table.
#[derive(Debug, Clone, Default)]
pub struct KeyboardMap {
    min_keycode: Keycode,
    keysyms_per_keycode: usize,
    keysyms: Vec<Keysym>,
}

impl KeyboardMap {
    pub fn new(min_keycode: Keycode, keysyms_per_keycode: u8, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            keysyms_per_keycode: keysyms_per_keycode as usize,
            keysyms,
        }
    }

    /// Unshifted keysym for a keycode, 0 (NoSymbol) when unmapped.
    pub fn keysym(&self, keycode: Keycode) -> Keysym {
        if keycode < self.min_keycode || self.keysyms_per_keycode == 0 {
            return 0;
        }
        let index = (keycode - self.min_keycode) as usize * self.keysyms_per_keycode;
        self.keysyms.get(index).copied().unwrap_or(0)
    }

    /// Keycodes producing `keysym` in any column.
    pub fn keycodes(&self, keysym: Keysym) -> Vec<Keycode> {
        if self.keysyms_per_keycode == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(self.keysyms_per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.contains(&keysym))
            .filter_map(|(i, _)| Keycode::try_from(self.min_keycode as usize + i).ok())
            .collect()
    }

    /// Modifier bit NumLock is bound to, given the server's modifier map
    /// (eight rows of `per_modifier` keycodes).
    pub fn numlock_mask(&self, modifier_map: &[Keycode], per_modifier: usize) -> u16 {
        if per_modifier == 0 {
            return 0;
        }
        let numlock = self.keycodes(XK_NUM_LOCK);
        modifier_map
            .chunks(per_modifier)
            .take(8)
            .position(|row| row.iter().any(|k| *k != 0 && numlock.contains(k)))
            .map_or(0, |bit| 1 << bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::keysyms::{MOD2, XK_J, XK_RETURN};

    fn map() -> KeyboardMap {
        // keycodes 8..=11, two columns each
        KeyboardMap::new(8, 2, vec![XK_J, 0x4a, XK_RETURN, 0, XK_NUM_LOCK, 0, 0, 0])
    }

    #[test]
    fn test_keysym_lookup() {
        let map = map();
        assert_eq!(map.keysym(8), XK_J);
        assert_eq!(map.keysym(9), XK_RETURN);
        assert_eq!(map.keysym(7), 0);
        assert_eq!(map.keysym(200), 0);
    }

    #[test]
    fn test_keycodes_for_keysym() {
        let map = map();
        assert_eq!(map.keycodes(XK_RETURN), vec![9]);
        assert_eq!(map.keycodes(0x4a), vec![8]);
        assert!(map.keycodes(0x1234).is_empty());
    }

    #[test]
    fn test_numlock_on_mod2() {
        let map = map();
        // shift, lock, control, mod1, mod2 (numlock), mod3, mod4, mod5
        let modifiers = [50, 0, 66, 0, 37, 0, 64, 0, 10, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(map.numlock_mask(&modifiers, 2), MOD2);
        assert_eq!(map.numlock_mask(&[0; 16], 2), 0);
    }
}

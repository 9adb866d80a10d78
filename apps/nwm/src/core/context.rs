use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{ChangeWindowAttributesAux, ConnectionExt, CreateWindowAux, EventMask, Window, WindowClass};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use crate::core::error::WmError;
use crate::ewmh::atoms::AtomCollection;
use crate::input::keyboard::KeyboardMap;
use crate::window::cursors::Cursors;

/// The live X connection plus the state the backend keeps between requests.
pub struct Context {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub root_window: Window,
    pub atoms: AtomCollection,
    pub(crate) screen_size: Cell<(u16, u16)>,
    pub(crate) cursors: Cursors,
    pub(crate) keyboard: RefCell<KeyboardMap>,
    pub(crate) numlock: Cell<u16>,
    pub(crate) relaxed: Cell<bool>,
    /// Events read ahead of the main loop, e.g. while discarding EnterNotify.
    pub(crate) pending: RefCell<VecDeque<Event>>,
}

impl Context {
    pub fn new(display: Option<&str>) -> Result<Self, WmError> {
        let (conn, screen_num) = x11rb::connect(display)?;
        let screen = &conn.setup().roots[screen_num];
        let root_window = screen.root;
        let screen_size = Cell::new((screen.width_in_pixels, screen.height_in_pixels));

        let atoms = AtomCollection::new(&conn)?.reply()?;
        let cursors = Cursors::new(&conn, screen_num)?;

        let ctx = Self {
            conn,
            screen_num,
            root_window,
            atoms,
            screen_size,
            cursors,
            keyboard: RefCell::new(KeyboardMap::default()),
            numlock: Cell::new(0),
            relaxed: Cell::new(false),
            pending: RefCell::new(VecDeque::new()),
        };
        ctx.load_keyboard()?;
        Ok(ctx)
    }

    /// Take over the root window. Fails when another window manager holds
    /// substructure redirection or the ICCCM manager selection.
    pub fn become_wm(&self) -> Result<(), WmError> {
        let values = ChangeWindowAttributesAux::new()
            .event_mask(
                EventMask::SUBSTRUCTURE_REDIRECT
                    | EventMask::SUBSTRUCTURE_NOTIFY
                    | EventMask::BUTTON_PRESS
                    | EventMask::ENTER_WINDOW
                    | EventMask::LEAVE_WINDOW
                    | EventMask::STRUCTURE_NOTIFY
                    | EventMask::PROPERTY_CHANGE,
            )
            .cursor(self.cursors.normal);
        match self.conn.change_window_attributes(self.root_window, &values)?.check() {
            Err(ReplyError::X11Error(_)) => return Err(WmError::OtherWmRunning),
            other => other?,
        }
        self.acquire_wm_selection()
    }

    /// ICCCM 2.8 manager selection `WM_S{screen}`.
    fn acquire_wm_selection(&self) -> Result<(), WmError> {
        let atom_name = format!("WM_S{}", self.screen_num);
        let wm_sn_atom = self.conn.intern_atom(false, atom_name.as_bytes())?.reply()?.atom;

        let owner = self.conn.get_selection_owner(wm_sn_atom)?.reply()?.owner;
        if owner != x11rb::NONE {
            return Err(WmError::OtherWmRunning);
        }

        let selection_win = self.conn.generate_id()?;
        self.conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            selection_win,
            self.root_window,
            -1, -1, 1, 1, 0,
            WindowClass::INPUT_ONLY,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
        )?;
        self.conn.set_selection_owner(selection_win, wm_sn_atom, x11rb::CURRENT_TIME)?;

        let new_owner = self.conn.get_selection_owner(wm_sn_atom)?.reply()?.owner;
        if new_owner != selection_win {
            return Err(WmError::OtherWmRunning);
        }
        info!("Acquired WM selection: {}", atom_name);
        Ok(())
    }

    /// Re-read the keyboard and modifier mappings.
    pub(crate) fn load_keyboard(&self) -> Result<(), WmError> {
        let setup = self.conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let mapping = self.conn.get_keyboard_mapping(min, max - min + 1)?.reply()?;
        let keyboard = KeyboardMap::new(min, mapping.keysyms_per_keycode, mapping.keysyms);

        let modifiers = self.conn.get_modifier_mapping()?.reply()?;
        let per_modifier = modifiers.keycodes.len() / 8;
        let numlock = keyboard.numlock_mask(&modifiers.keycodes, per_modifier);
        debug!("Keyboard loaded, numlock mask {:#x}", numlock);

        self.numlock.set(numlock);
        *self.keyboard.borrow_mut() = keyboard;
        Ok(())
    }
}

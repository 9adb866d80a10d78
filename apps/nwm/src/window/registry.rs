use std::collections::HashMap;
use std::fmt;

use x11rb::protocol::xproto::Window;

use super::client::Client;

/// Stable handle for a managed client. Ids are never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClientId(u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena of managed clients with a reverse index from X window to id.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Client>,
    by_window: HashMap<Window, ClientId>,
    next_id: u64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a client under a fresh id. Returns `None` if the window is already managed.
    pub fn insert(&mut self, mut client: Client) -> Option<ClientId> {
        if self.by_window.contains_key(&client.window) {
            return None;
        }
        self.next_id += 1;
        let id = ClientId(self.next_id);
        client.id = id;
        self.by_window.insert(client.window, id);
        self.clients.insert(id, client);
        Some(id)
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        let client = self.clients.remove(&id)?;
        self.by_window.remove(&client.window);
        Some(client)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn find(&self, window: Window) -> Option<ClientId> {
        self.by_window.get(&window).copied()
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn window(&self, id: ClientId) -> Option<Window> {
        self.get(id).map(|c| c.window)
    }
}

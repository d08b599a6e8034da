//! The two roles of the signaling game and per-role storage.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Which side of the game a creature is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Observes the hidden state, emits a message
    Sender,
    /// Observes the message, guesses the state
    Receiver,
}

impl Role {
    /// Both roles in turn order
    pub const ALL: [Role; 2] = [Role::Sender, Role::Receiver];

    pub fn name(self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per role, addressed by [`Role`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleMap<T> {
    pub sender: T,
    pub receiver: T,
}

impl<T> RoleMap<T> {
    pub fn new(sender: T, receiver: T) -> Self {
        Self { sender, receiver }
    }

    /// Build both slots from a function of the role
    pub fn from_fn<F: FnMut(Role) -> T>(mut f: F) -> Self {
        Self {
            sender: f(Role::Sender),
            receiver: f(Role::Receiver),
        }
    }

    /// Iterate `(role, value)` pairs in turn order
    pub fn iter(&self) -> impl Iterator<Item = (Role, &T)> {
        [(Role::Sender, &self.sender), (Role::Receiver, &self.receiver)].into_iter()
    }
}

impl<T> Index<Role> for RoleMap<T> {
    type Output = T;

    fn index(&self, role: Role) -> &T {
        match role {
            Role::Sender => &self.sender,
            Role::Receiver => &self.receiver,
        }
    }
}

impl<T> IndexMut<Role> for RoleMap<T> {
    fn index_mut(&mut self, role: Role) -> &mut T {
        match role {
            Role::Sender => &mut self.sender,
            Role::Receiver => &mut self.receiver,
        }
    }
}

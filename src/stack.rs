use serde::{Deserialize, Serialize};

/// Unbounded LIFO of raw cells, shared by push/pop and call/ret.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stack {
    items: Vec<u16>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: u16) {
        self.items.push(value);
    }

    /// Returns `None` on underflow.
    pub fn pop(&mut self) -> Option<u16> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<u16> {
        self.items.last().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bottom-to-top view.
    pub fn as_slice(&self) -> &[u16] {
        &self.items
    }
}

impl From<Vec<u16>> for Stack {
    fn from(items: Vec<u16>) -> Self {
        Self { items }
    }
}

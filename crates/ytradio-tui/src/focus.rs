//! FocusRing: keyboard focus cycling between panes.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = if self.current == 0 {
            self.items.len() - 1
        } else {
            self.current - 1
        };
        self.current()
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.current() == Some(id)
    }

    /// Replace the ring when panes appear or disappear. Focus stays on the
    /// same pane if it is still there, else falls back to the first.
    pub fn set_items(&mut self, items: Vec<ComponentId>) {
        let old = self.current();
        self.items = items;
        self.current = old
            .and_then(|id| self.items.iter().position(|&x| x == id))
            .unwrap_or(0);
    }
}

impl Default for FocusRing {
    fn default() -> Self {
        Self::new(vec![ComponentId::Results])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycles_both_ways() {
        let mut ring = FocusRing::new(vec![ComponentId::Results, ComponentId::Queue]);
        assert_eq!(ring.next(), Some(ComponentId::Queue));
        assert_eq!(ring.next(), Some(ComponentId::Results));
        assert_eq!(ring.prev(), Some(ComponentId::Queue));
    }

    #[test]
    fn test_set_items_keeps_focus_when_possible() {
        let mut ring = FocusRing::new(vec![ComponentId::Results, ComponentId::Queue]);
        ring.next();
        ring.set_items(vec![
            ComponentId::Results,
            ComponentId::Queue,
            ComponentId::LogPanel,
        ]);
        assert!(ring.is_focused(ComponentId::Queue));
        ring.set_items(vec![ComponentId::Results]);
        assert!(ring.is_focused(ComponentId::Results));
    }
}

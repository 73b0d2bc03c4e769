use model::shipment::ShipmentId;

/// Selected shipments, most recently selected on top.
#[derive(Debug, Clone, Default)]
pub struct SelectionStack {
    // oldest first
    items: Vec<ShipmentId>,
}

impl SelectionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `id` on top. An id that is already selected moves to the top.
    pub fn push(&mut self, id: ShipmentId) {
        self.items.retain(|item| *item != id);
        self.items.push(id);
    }

    /// Removes `id` without reordering the rest.
    pub fn remove(&mut self, id: &ShipmentId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item != id);
        self.items.len() != before
    }

    pub fn contains(&self, id: &ShipmentId) -> bool {
        self.items.contains(id)
    }

    pub fn top(&self) -> Option<&ShipmentId> {
        self.items.last()
    }

    pub fn most_recent_first(&self) -> Vec<ShipmentId> {
        self.items.iter().rev().cloned().collect()
    }

    pub fn clear(&mut self) -> Vec<ShipmentId> {
        std::mem::take(&mut self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use utility::id::Id;

    use super::*;

    fn id(raw: &str) -> ShipmentId {
        Id::new(raw.to_owned())
    }

    #[test]
    fn most_recent_selection_comes_first() {
        let mut stack = SelectionStack::new();
        stack.push(id("a"));
        stack.push(id("b"));
        stack.push(id("c"));
        assert_eq!(stack.most_recent_first(), vec![id("c"), id("b"), id("a")]);
        assert_eq!(stack.top(), Some(&id("c")));
    }

    #[test]
    fn removing_keeps_remaining_order() {
        let mut stack = SelectionStack::new();
        for raw in ["a", "b", "c", "d"] {
            stack.push(id(raw));
        }
        assert!(stack.remove(&id("b")));
        assert!(!stack.remove(&id("b")));
        assert_eq!(
            stack.most_recent_first(),
            vec![id("d"), id("c"), id("a")]
        );
    }

    #[test]
    fn reselecting_moves_to_top() {
        let mut stack = SelectionStack::new();
        stack.push(id("a"));
        stack.push(id("b"));
        stack.push(id("a"));
        assert_eq!(stack.most_recent_first(), vec![id("a"), id("b")]);
        assert_eq!(stack.len(), 2);
    }
}

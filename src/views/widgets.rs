use ratatui::widgets::ListState;

pub struct StatefulList<T> {
    pub state: ListState,
    pub items: Vec<T>,
}

impl<T> StatefulList<T> {
    pub fn with_items(items: Vec<T>) -> StatefulList<T> {
        let mut state = ListState::default();
        // Start with the first item selected
        if !items.is_empty() {
            state.select(Some(0));
        }
        StatefulList {
            state,
            items,
        }
    }

    /// Swap in a fresh copy of the items, keeping the selection in range.
    pub fn replace_items(&mut self, items: Vec<T>) {
        self.items = items;
        let selected = match (self.state.selected(), self.items.len()) {
            (_, 0) => None,
            (Some(i), len) => Some(i.min(len - 1)),
            (None, _) => Some(0),
        };
        self.state.select(selected);
    }

    pub fn selected(&self) -> Option<&T> {
        self.state.selected().and_then(|i| self.items.get(i))
    }

    pub fn is_at_end(&self) -> bool {
        match self.state.selected() {
            Some(i) => i + 1 >= self.items.len(),
            None => self.items.is_empty(),
        }
    }

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= self.items.len() - 1 {
                    i
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn first(&mut self) {
        if !self.items.is_empty() {
            self.state.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        if !self.items.is_empty() {
            self.state.select(Some(self.items.len() - 1));
        }
    }

    pub fn jump_up(&mut self, offset: usize) {
        if self.items.is_empty() {
            return;
        }
        let i = self.state.selected().unwrap_or(0).saturating_sub(offset);
        self.state.select(Some(i));
    }

    pub fn jump_down(&mut self, offset: usize) {
        if self.items.is_empty() {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| (i + offset).min(self.items.len() - 1))
            .unwrap_or(0);
        self.state.select(Some(i));
    }
}

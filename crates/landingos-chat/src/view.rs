/// Load state of a pane (channel list or message list).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing selected yet.
    #[default]
    Unselected,
    Loading,
    Ready,
    Empty,
}

impl LoadState {
    /// State a pane settles into once its fetch resolved.
    pub fn settled(has_items: bool) -> Self {
        if has_items { Self::Ready } else { Self::Empty }
    }
}

/// Side effects the renderer has to carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEffect {
    ScrollToEnd,
    /// Put this text back into the compose field.
    RestoreCompose(String),
    /// Inline alert for a failed administrative action.
    Alert(String),
}

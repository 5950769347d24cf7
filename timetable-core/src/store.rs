use std::{cell::RefCell, rc::Rc};

use crate::{Result, SavedState, Theme};

/// Device-local storage for the user's selection and preferences
///
/// Implementations are called synchronously after every mutation, so they
/// should be cheap. Errors are logged by the engine and never surface from
/// selection operations.
pub trait Persistence {
    /// Previously saved state, `None` on first run
    fn load(&self) -> Result<Option<SavedState>>;

    /// Replace the saved state
    fn save(&self, state: &SavedState) -> Result<()>;
}

/// Receives the active theme whenever it changes
pub trait ThemeSink {
    /// Switch the presentation to `theme`
    fn apply(&self, theme: Theme);
}

/// In-memory persistence, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<Option<SavedState>>>,
    saves: Rc<RefCell<usize>>,
}

impl MemoryStore {
    /// Empty store, as on first run
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that already holds a saved state
    pub fn with_state(state: SavedState) -> Self {
        Self {
            state: Rc::new(RefCell::new(Some(state))),
            saves: Rc::default(),
        }
    }

    /// Last saved state
    pub fn snapshot(&self) -> Option<SavedState> {
        self.state.borrow().clone()
    }

    /// Number of saves performed so far
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl Persistence for MemoryStore {
    fn load(&self) -> Result<Option<SavedState>> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &SavedState) -> Result<()> {
        *self.state.borrow_mut() = Some(state.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}

/// Persistence that forgets everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPersistence;

impl Persistence for NoPersistence {
    fn load(&self) -> Result<Option<SavedState>> {
        Ok(None)
    }

    fn save(&self, _state: &SavedState) -> Result<()> {
        Ok(())
    }
}

/// Theme sink for front ends without styling
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopThemeSink;

impl ThemeSink for NoopThemeSink {
    fn apply(&self, _theme: Theme) {}
}

/// Remembers every theme it was given
#[derive(Debug, Clone, Default)]
pub struct RecordingThemeSink {
    applied: Rc<RefCell<Vec<Theme>>>,
}

impl RecordingThemeSink {
    /// Sink with nothing recorded yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Themes applied so far, oldest first
    pub fn applied(&self) -> Vec<Theme> {
        self.applied.borrow().clone()
    }
}

impl ThemeSink for RecordingThemeSink {
    fn apply(&self, theme: Theme) {
        self.applied.borrow_mut().push(theme);
    }
}

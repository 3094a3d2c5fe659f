//! Session state with explicit mutation operations.

use std::collections::VecDeque;

use crate::model::{CarModel, ConfigOptions};

/// Maximum number of concepts retained in the archive.
pub const HISTORY_LIMIT: usize = 10;

/// Most-recent-first archive of generated concepts.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: VecDeque<CarModel>,
}

impl History {
    /// Prepends `car`, evicting the oldest entries beyond [`HISTORY_LIMIT`].
    pub fn push(&mut self, car: CarModel) {
        self.entries.push_front(car);
        self.entries.truncate(HISTORY_LIMIT);
    }

    pub fn get(&self, id: &str) -> Option<&CarModel> {
        self.iter().find(|car| car.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CarModel> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<CarModel> {
        self.iter().cloned().collect()
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    config: ConfigOptions,
    current: Option<CarModel>,
    history: History,
}

impl SessionStore {
    pub fn new(config: ConfigOptions) -> Self {
        Self {
            config,
            current: None,
            history: History::default(),
        }
    }

    pub fn config(&self) -> &ConfigOptions {
        &self.config
    }

    pub fn current(&self) -> Option<&CarModel> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn set_config(&mut self, config: ConfigOptions) {
        self.config = config;
    }

    pub fn set_result(&mut self, car: CarModel) {
        self.current = Some(car);
    }

    pub fn push_history(&mut self, car: CarModel) {
        self.history.push(car);
    }

    /// Makes the archived entry with `id` current. History order is untouched.
    pub fn select_history(&mut self, id: &str) -> Option<CarModel> {
        let car = self.history.get(id)?.clone();
        self.current = Some(car.clone());
        Some(car)
    }

    /// Looks `id` up in the current slot, then the archive.
    pub fn find(&self, id: &str) -> Option<&CarModel> {
        self.current
            .as_ref()
            .filter(|car| car.id == id)
            .or_else(|| self.history.get(id))
    }
}

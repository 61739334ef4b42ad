//! User settings consulted while aggregating
//!
//! Settings are owned by whoever persists them; the core only reads through
//! [`SettingsProvider`] at dispatch time.

use std::sync::RwLock;

/// Source of the settings aggregators consult on every event
pub trait SettingsProvider: Send + Sync {
    /// Entity names always treated as the player's pets
    fn pet_names(&self) -> Vec<String>;

    /// Whether rank suffixes are stripped from skill names before bucketing
    fn normalize_skill_names(&self) -> bool;

    fn is_pet_name(&self, name: &str) -> bool {
        self.pet_names().iter().any(|pet| names_match(pet, name))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub pet_names: Vec<String>,
    pub normalize_skill_names: bool,
}

impl SettingsProvider for Settings {
    fn pet_names(&self) -> Vec<String> {
        self.pet_names.clone()
    }

    fn normalize_skill_names(&self) -> bool {
        self.normalize_skill_names
    }

    fn is_pet_name(&self, name: &str) -> bool {
        self.pet_names.iter().any(|pet| names_match(pet, name))
    }
}

/// Settings that can be swapped while a session is running
#[derive(Debug, Default)]
pub struct SharedSettings {
    inner: RwLock<Settings>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
        }
    }

    pub fn replace(&self, settings: Settings) {
        match self.inner.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }

    pub fn snapshot(&self) -> Settings {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SettingsProvider for SharedSettings {
    fn pet_names(&self) -> Vec<String> {
        self.snapshot().pet_names
    }

    fn normalize_skill_names(&self) -> bool {
        self.snapshot().normalize_skill_names
    }
}

/// Compare names ignoring case and whitespace
pub fn names_match(a: &str, b: &str) -> bool {
    let squash = |s: &str| -> String {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect()
    };
    squash(a) == squash(b)
}

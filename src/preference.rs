// The persisted page variant ("rude" / "normal") and its visibility toggle.
// One owner, one setter: every change persists and emits the DOM commands together.

use js_sys::{Function, Reflect};
use wasm_bindgen::{JsCast, JsValue};

use crate::types::{PageCommand, Preference};

/// Key/value persistence with no expiry (`localStorage` in the browser).
pub trait PreferenceStore {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, value: &str);
}

/// In-memory store for tests and non-browser hosts.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    value: Option<(String, String)>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        MemoryStore {
            value: Some((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.value
            .as_ref()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl PreferenceStore for MemoryStore {
    fn load(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    fn save(&mut self, key: &str, value: &str) {
        self.value = Some((key.to_string(), value.to_string()));
    }
}

/// A JS `Storage` object (normally `window.localStorage`) driven through reflection.
/// Storage exceptions (private mode, quota) are logged and otherwise ignored.
pub struct JsStorage {
    storage: JsValue,
}

impl JsStorage {
    pub fn new(storage: JsValue) -> Self {
        JsStorage { storage }
    }

    fn method(&self, name: &str) -> Option<Function> {
        if self.storage.is_undefined() || self.storage.is_null() {
            return None;
        }
        Reflect::get(&self.storage, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
    }
}

impl PreferenceStore for JsStorage {
    fn load(&self, key: &str) -> Option<String> {
        let get_item = self.method("getItem")?;
        match get_item.call1(&self.storage, &JsValue::from_str(key)) {
            Ok(value) => value.as_string(),
            Err(err) => {
                log::warn!("storage read failed for {key}: {err:?}");
                None
            }
        }
    }

    fn save(&mut self, key: &str, value: &str) {
        let Some(set_item) = self.method("setItem") else {
            log::warn!("storage unavailable; preference {value} not persisted");
            return;
        };
        if let Err(err) = set_item.call2(
            &self.storage,
            &JsValue::from_str(key),
            &JsValue::from_str(value),
        ) {
            log::warn!("storage write failed for {key}: {err:?}");
        }
    }
}

/// Owns the current preference and its persistence.
pub struct PreferenceGate<S: PreferenceStore> {
    store: S,
    key: String,
    current: Option<Preference>,
}

impl<S: PreferenceStore> PreferenceGate<S> {
    /// Reads the stored value. Unknown values count as absent.
    pub fn new(store: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let current = store.load(&key).and_then(|raw| match raw.parse::<Preference>() {
            Ok(pref) => Some(pref),
            Err(err) => {
                log::warn!("ignoring stored preference: {err}");
                None
            }
        });
        PreferenceGate {
            store,
            key,
            current,
        }
    }

    pub fn current(&self) -> Option<Preference> {
        self.current
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist `pref` and emit its visibility toggle.
    pub fn set_preference(&mut self, pref: Preference) -> Vec<PageCommand> {
        log::info!("preference set to {pref}");
        self.current = Some(pref);
        self.store.save(&self.key, pref.as_str());
        Self::toggle_commands(pref)
    }

    /// Flip between the two variants; with nothing chosen yet, "rude" is assumed current.
    pub fn toggle(&mut self) -> Vec<PageCommand> {
        let next = self.current.unwrap_or(Preference::Rude).toggled();
        self.set_preference(next)
    }

    /// Re-emit the toggle for the current value without persisting.
    pub fn apply_current(&self) -> Vec<PageCommand> {
        self.current.map(Self::toggle_commands).unwrap_or_default()
    }

    fn toggle_commands(pref: Preference) -> Vec<PageCommand> {
        vec![
            PageCommand::ApplyVariant { variant: pref },
            PageCommand::SetVersionSwitch { current: pref },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "cnmsb-version";

    #[test]
    fn reads_stored_value() {
        let gate = PreferenceGate::new(MemoryStore::with_value(KEY, "rude"), KEY);
        assert_eq!(gate.current(), Some(Preference::Rude));
        assert_eq!(
            gate.apply_current(),
            vec![
                PageCommand::ApplyVariant {
                    variant: Preference::Rude
                },
                PageCommand::SetVersionSwitch {
                    current: Preference::Rude
                },
            ]
        );
    }

    #[test]
    fn unknown_stored_value_is_absent() {
        let gate = PreferenceGate::new(MemoryStore::with_value(KEY, "sarcastic"), KEY);
        assert_eq!(gate.current(), None);
        assert!(gate.apply_current().is_empty());
    }

    #[test]
    fn other_keys_are_ignored() {
        let gate = PreferenceGate::new(MemoryStore::with_value("theme", "rude"), KEY);
        assert_eq!(gate.current(), None);
    }

    #[test]
    fn set_persists_and_toggles_visibility() {
        let mut gate = PreferenceGate::new(MemoryStore::new(), KEY);
        let commands = gate.set_preference(Preference::Normal);
        assert_eq!(gate.store().get(KEY), Some("normal"));
        assert!(commands.contains(&PageCommand::ApplyVariant {
            variant: Preference::Normal
        }));
    }

    #[test]
    fn toggle_flips_and_repersists() {
        let mut gate = PreferenceGate::new(MemoryStore::new(), KEY);
        gate.toggle();
        assert_eq!(gate.current(), Some(Preference::Normal));
        gate.toggle();
        assert_eq!(gate.current(), Some(Preference::Rude));
        assert_eq!(gate.store().get(KEY), Some("rude"));
    }
}

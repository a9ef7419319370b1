//! Name mangling: user-visible names to identifiers valid in every
//! target language.
//!
//! ASCII letters and digits are kept. Any other character, `_` included,
//! becomes `_<code>_` where `<code>` is its decimal code point. Escapes
//! are self-delimiting, so the mapping is injective.

use std::collections::HashMap;
use std::fmt::Write;

/// Memoizing name mangler.
///
/// Owned by the caller and passed into every compilation, so repeated
/// compilations in one process share the cache without global state.
#[derive(Debug, Default, Clone)]
pub struct NameMangler {
    cache: HashMap<String, String>,
}

impl NameMangler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mangled form of `name`.
    pub fn mangle(&mut self, name: &str) -> String {
        if let Some(mangled) = self.cache.get(name) {
            return mangled.clone();
        }
        let mangled = mangle_name(name);
        self.cache.insert(name.to_string(), mangled.clone());
        mangled
    }

    /// Base name of the lists holding instances of `object`
    /// (the depth is appended by the backend).
    pub fn objects_list_name(&mut self, object: &str) -> String {
        format!("GD{}Objects", self.mangle(object))
    }

    /// Entry point of a layout's events in the native backend.
    pub fn scene_events_function_name(&mut self, layout: &str) -> String {
        format!("GDSceneEvents{}", self.mangle(layout))
    }

    /// Entry point of external events in the native backend.
    pub fn external_events_function_name(&mut self, name: &str) -> String {
        format!("GDExternalEvents{}", self.mangle(name))
    }

    /// Number of memoized names.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

fn mangle_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            // Writing to a String cannot fail.
            let _ = write!(out, "_{}_", c as u32);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphanumeric_kept() {
        let mut m = NameMangler::new();
        assert_eq!(m.mangle("Player2"), "Player2");
    }

    #[test]
    fn test_other_characters_escaped() {
        let mut m = NameMangler::new();
        assert_eq!(m.mangle("My Enemy"), "My_32_Enemy");
        assert_eq!(m.mangle("a_b"), "a_95_b");
        assert_eq!(m.mangle("é"), "_233_");
    }

    #[test]
    fn test_injective_on_lookalikes() {
        let mut m = NameMangler::new();
        let names = ["a b", "a_b", "a_32_b", "a__b", "ab", "a-b", "a_95_b"];
        let mut seen = std::collections::HashSet::new();
        for name in names {
            assert!(seen.insert(m.mangle(name)), "collision for {name:?}");
        }
    }

    #[test]
    fn test_memoized() {
        let mut m = NameMangler::new();
        let first = m.mangle("Hero Ship");
        assert_eq!(m.len(), 1);
        assert_eq!(m.mangle("Hero Ship"), first);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_derived_names() {
        let mut m = NameMangler::new();
        assert_eq!(m.objects_list_name("Coin"), "GDCoinObjects");
        assert_eq!(m.scene_events_function_name("Level 1"), "GDSceneEventsLevel_32_1");
        assert_eq!(m.external_events_function_name("HUD"), "GDExternalEventsHUD");
    }
}

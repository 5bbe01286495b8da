use crate::reflection::Reflect;

/// An ordered set of named values.
///
/// The custom save/load protocol speaks in bags: `save` fills one,
/// `load` drains one. Entries keep insertion order and duplicate names
/// are allowed, with lookups taking the first match.
#[derive(Default)]
pub struct PropertyBag {
    entries: Vec<(String, Box<dyn Reflect>)>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Box<dyn Reflect>) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Reflect> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| &**v)
    }

    /// Removes and returns the first entry with the given name.
    pub fn take(&mut self, name: &str) -> Option<Box<dyn Reflect>> {
        let index = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Removes the first entry with the given name and downcasts it.
    /// `None` covers both a missing entry and a type mismatch.
    pub fn remove<T: Reflect>(&mut self, name: &str) -> Option<T> {
        let value = self.take(name)?;
        value.take::<T>().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Reflect)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), &**v))
    }

    pub fn into_entries(self) -> Vec<(String, Box<dyn Reflect>)> {
        self.entries
    }

    /// Drains the bag front to back.
    pub fn drain(&mut self) -> impl Iterator<Item = (String, Box<dyn Reflect>)> + '_ {
        self.entries.drain(..)
    }
}

impl core::fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in self.iter() {
            map.entry(&name, &value);
        }
        map.finish()
    }
}

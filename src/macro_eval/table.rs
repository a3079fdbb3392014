use crate::ir::Value;
use std::collections::HashMap;

/// Values of previously resolved macros and enum constants, by identifier
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    values: HashMap<String, Value>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value. A later definition replaces an earlier one.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for MacroTable {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        MacroTable {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

use std::collections::HashMap;

/// A bidirectional index for mapping between strings and integer ids
///
/// Ids are assigned contiguously from zero in insertion order. An index is
/// grown by the dataset while groups are added; trained models keep their own
/// clone, which is never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    /// Map from string to ID
    str_to_id: HashMap<String, u32>,
    /// Map from ID to string
    id_to_str: Vec<String>,
}

impl Index {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            str_to_id: HashMap::new(),
            id_to_str: Vec::new(),
        }
    }

    /// Get the number of entries in the index
    pub fn len(&self) -> usize {
        self.id_to_str.len()
    }

    /// Returns `true` if the index contains no entries
    pub fn is_empty(&self) -> bool {
        self.id_to_str.is_empty()
    }

    /// Get or create an ID for a string
    pub fn get_or_insert(&mut self, s: &str) -> u32 {
        if let Some(&id) = self.str_to_id.get(s) {
            id
        } else {
            let id = self.id_to_str.len() as u32;
            self.str_to_id.insert(s.to_string(), id);
            self.id_to_str.push(s.to_string());
            id
        }
    }

    /// Look up the ID of a string without inserting it
    pub fn index_of(&self, s: &str) -> Option<u32> {
        self.str_to_id.get(s).copied()
    }

    /// Look up the string for an ID
    pub fn get(&self, id: u32) -> Option<&str> {
        self.id_to_str.get(id as usize).map(String::as_str)
    }

    /// Returns `true` if the string has an ID
    pub fn contains(&self, s: &str) -> bool {
        self.str_to_id.contains_key(s)
    }

    /// Iterate over all (string, id) pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.id_to_str
            .iter()
            .enumerate()
            .map(|(id, s)| (s.as_str(), id as u32))
    }
}

impl<S: AsRef<str>> FromIterator<S> for Index {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut index = Index::new();
        for s in iter {
            index.get_or_insert(s.as_ref());
        }
        index
    }
}

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// An ordered, de-duplicated list of tags. The first insertion fixes a tag's position;
/// later inserts of the same tag are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(IndexSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the tag was already present.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

impl<S: Into<String>> Extend<S> for TagSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for tag in iter {
            self.insert(tag);
        }
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = TagSet::new();
        set.extend(iter);
        set
    }
}

impl From<TagSet> for Vec<String> {
    fn from(set: TagSet) -> Self {
        set.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_occurrence_wins() {
        let set: TagSet = ["Everyday", "Work", "Everyday", "Casual", "Work"]
            .into_iter()
            .collect();
        assert_eq!(set.into_vec(), vec!["Everyday", "Work", "Casual"]);
    }

    #[test]
    fn insert_reports_duplicates() {
        let mut set = TagSet::new();
        assert!(set.insert("Blush"));
        assert!(!set.insert(String::from("Blush")));
        assert_eq!(set.len(), 1);
        assert!(set.contains("Blush"));
    }

    #[test]
    fn serializes_as_a_plain_list() {
        let set: TagSet = ["a", "b"].into_iter().collect();
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["a","b"]"#);
    }
}

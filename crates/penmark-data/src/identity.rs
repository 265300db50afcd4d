// IdentityIndex: writer id -> dense integer code

use std::collections::{BTreeMap, BTreeSet};

/// Dense codes `0..n` for the distinct writer ids of a corpus, assigned in
/// sorted id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityIndex {
    codes: BTreeMap<String, usize>,
}

impl IdentityIndex {
    pub fn build<I, S>(writer_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = writer_ids
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let codes = distinct
            .into_iter()
            .enumerate()
            .map(|(code, id)| (id, code))
            .collect();
        Self { codes }
    }

    /// Number of distinct writers.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn code(&self, writer_id: &str) -> Option<usize> {
        self.codes.get(writer_id).copied()
    }

    /// The code in its string form, e.g. `"3"`.
    pub fn code_string(&self, writer_id: &str) -> Option<String> {
        self.code(writer_id).map(|c| c.to_string())
    }

    /// Writer ids in code order.
    pub fn writer_ids(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(String::as_str)
    }

    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.codes
            .iter()
            .map(|(id, code)| (id.clone(), code.to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_sorted_order() {
        let idx = IdentityIndex::build(["w3", "w1", "w3", "w2", "w1"]);
        assert_eq!(idx.len(), 3);
        assert_eq!(idx.code("w1"), Some(0));
        assert_eq!(idx.code("w2"), Some(1));
        assert_eq!(idx.code("w3"), Some(2));
        assert_eq!(idx.code("w4"), None);
        assert_eq!(idx.code_string("w3").as_deref(), Some("2"));
        assert_eq!(idx.writer_ids().collect::<Vec<_>>(), vec!["w1", "w2", "w3"]);
    }

    #[test]
    fn string_map_matches_codes() {
        let idx = IdentityIndex::build(vec!["b".to_string(), "a".to_string()]);
        let map = idx.to_string_map();
        assert_eq!(map.get("a").map(String::as_str), Some("0"));
        assert_eq!(map.get("b").map(String::as_str), Some("1"));
    }

    #[test]
    fn empty_input_gives_empty_map() {
        let idx = IdentityIndex::build(Vec::<String>::new());
        assert!(idx.is_empty());
        assert!(idx.to_string_map().is_empty());
    }
}

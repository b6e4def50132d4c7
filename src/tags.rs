/// a single tag (array of strings)
pub type Tag = Vec<String>;

/// most strings a locally built tag may carry
pub const MAX_TAG_LEN: usize = 5;

/// collection of tags
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tags(pub Vec<Tag>);

impl Tags {
    /// drop tags outside 1 to `MAX_TAG_LEN` strings and repeated (key, first value) pairs,
    /// first occurrence wins
    pub fn deduplicated(self) -> Self {
        let mut seen = std::collections::HashSet::with_capacity(self.0.len());
        Self(
            self.0
                .into_iter()
                .filter(|tag| (1..=MAX_TAG_LEN).contains(&tag.len()))
                .filter(|tag| seen.insert((tag[0].clone(), tag.get(1).cloned())))
                .collect(),
        )
    }

    /// get the first "d" tag value or empty string
    pub fn get_d(&self) -> String {
        self.find("d")
            .map(|tag| tag[1].clone())
            .unwrap_or_default()
    }

    /// find the first tag with the given key that has at least one value
    pub fn find(&self, key: &str) -> Option<&Tag> {
        self.0.iter().find(|&tag| tag.len() >= 2 && tag[0] == key)
    }

    pub fn push(&mut self, tag: Tag) {
        self.0.push(tag);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }
}

impl IntoIterator for Tags {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl std::fmt::Display for Tags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => write!(f, "{json}"),
            Err(err) => write!(f, "Tags({err})"),
        }
    }
}

impl From<Vec<Tag>> for Tags {
    fn from(tags: Vec<Tag>) -> Self {
        Self(tags)
    }
}

impl From<Tags> for Vec<Tag> {
    fn from(tags: Tags) -> Self {
        tags.0
    }
}

/// a REQ/COUNT filter; every set field must match, values inside a field are alternatives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub ids: Option<Vec<crate::ID>>,
    pub kinds: Option<Vec<crate::Kind>>,
    pub authors: Option<Vec<crate::PubKey>>,
    pub tags: Option<Vec<TagQuery>>,
    pub since: Option<crate::Timestamp>,
    pub until: Option<crate::Timestamp>,
    pub limit: Option<usize>,
    pub search: Option<String>,
}

/// `#<key>: [values]`
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TagQuery(pub String, pub Vec<String>);

impl TagQuery {
    pub fn new(key: impl Into<String>, values: Vec<String>) -> Self {
        Self(key.into(), values)
    }

    pub fn key(&self) -> &str {
        self.0.as_str()
    }

    pub fn values(&self) -> &Vec<String> {
        &self.1
    }
}

impl Filter {
    /// number of map entries this filter serializes to
    fn field_count(&self) -> usize {
        let plain = [
            self.ids.is_some(),
            self.authors.is_some(),
            self.kinds.is_some(),
            self.since.is_some(),
            self.until.is_some(),
            self.limit.is_some(),
            self.search.is_some(),
        ];
        plain.into_iter().filter(|set| *set).count()
            + self.tags.as_ref().map_or(0, |tags| tags.len())
    }
}

impl serde::Serialize for Filter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.field_count()))?;
        if let Some(ids) = &self.ids {
            map.serialize_entry("ids", ids)?;
        }
        if let Some(authors) = &self.authors {
            map.serialize_entry("authors", authors)?;
        }
        if let Some(kinds) = &self.kinds {
            map.serialize_entry("kinds", kinds)?;
        }
        if let Some(since) = &self.since {
            map.serialize_entry("since", since)?;
        }
        if let Some(until) = &self.until {
            map.serialize_entry("until", until)?;
        }
        if let Some(limit) = &self.limit {
            map.serialize_entry("limit", limit)?;
        }
        if let Some(search) = &self.search {
            map.serialize_entry("search", search)?;
        }
        for query in self.tags.iter().flatten() {
            map.serialize_entry(&format!("#{}", query.key()), query.values())?;
        }
        map.end()
    }
}

struct FilterVisitor;

impl<'de> serde::de::Visitor<'de> for FilterVisitor {
    type Value = Filter;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a filter object")
    }

    fn visit_map<M: serde::de::MapAccess<'de>>(self, mut map: M) -> Result<Filter, M::Error> {
        let mut filter = Filter::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "ids" => filter.ids = Some(map.next_value()?),
                "authors" => filter.authors = Some(map.next_value()?),
                "kinds" => filter.kinds = Some(map.next_value()?),
                "since" => filter.since = Some(map.next_value()?),
                "until" => filter.until = Some(map.next_value()?),
                "limit" => filter.limit = Some(map.next_value()?),
                "search" => filter.search = Some(map.next_value()?),
                _ => match key.strip_prefix('#').filter(|name| !name.is_empty()) {
                    Some(name) => {
                        let query = TagQuery::new(name, map.next_value()?);
                        filter.tags.get_or_insert_with(Vec::new).push(query);
                    }
                    None => {
                        map.next_value::<serde::de::IgnoredAny>()?;
                    }
                },
            }
        }
        Ok(filter)
    }
}

impl<'de> serde::Deserialize<'de> for Filter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FilterVisitor)
    }
}

impl std::fmt::Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        f.write_str(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Kind, Timestamp};

    #[test]
    fn test_filter_json() {
        let filter = Filter {
            kinds: Some(vec![Kind(1), Kind(6)]),
            tags: Some(vec![TagQuery::new("e", vec!["abc".to_string()])]),
            since: Some(Timestamp(100)),
            limit: Some(20),
            ..Default::default()
        };
        let json = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kinds": [1, 6], "since": 100, "limit": 20, "#e": ["abc"]})
        );

        let parsed: Filter =
            serde_json::from_str(r##"{"#p":["x","y"],"search":"q","unknown":3}"##).unwrap();
        assert_eq!(
            parsed.tags,
            Some(vec![TagQuery::new("p", vec!["x".to_string(), "y".to_string()])])
        );
        assert_eq!(parsed.search.as_deref(), Some("q"));
        assert!(parsed.kinds.is_none());
    }
}

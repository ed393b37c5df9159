use crate::document::{Item, StructuredRecord};

/// Which field of an item satisfied the topic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Title,
    Description,
}

/// Counts items mentioning a topic.
///
/// Matching is a case-sensitive substring test. The title is checked first and
/// an item is counted at most once, so a topic present in both fields still
/// contributes one.
#[derive(Debug, Clone)]
pub struct TopicMatcher {
    topic: String,
}

impl TopicMatcher {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Returns the field that matched, title first
    pub fn match_item(&self, item: &Item) -> Option<MatchField> {
        if item.title.contains(self.topic.as_str()) {
            Some(MatchField::Title)
        } else if item.description.contains(self.topic.as_str()) {
            Some(MatchField::Description)
        } else {
            None
        }
    }

    /// Number of matching items in `record`
    pub fn count(&self, record: &StructuredRecord) -> usize {
        record
            .items
            .iter()
            .filter(|item| self.match_item(item).is_some())
            .count()
    }
}

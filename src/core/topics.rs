//! Static catalog of DSA topics offered in the topic panel.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topic {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
}

impl Topic {
    /// The first user turn sent when this topic is picked.
    pub fn prompt(&self) -> String {
        format!("Tell me about {}", self.title)
    }
}

pub const TOPICS: &[Topic] = &[
    Topic {
        id: "arrays",
        title: "Arrays & Strings",
        description: "Basic blocks of DSA",
        icon: "📊",
    },
    Topic {
        id: "linkedlists",
        title: "Linked Lists",
        description: "Nodes and pointers",
        icon: "🔗",
    },
    Topic {
        id: "trees",
        title: "Trees & BST",
        description: "Hierarchical structures",
        icon: "🌳",
    },
    Topic {
        id: "graphs",
        title: "Graphs",
        description: "Nodes and edges",
        icon: "🕸️",
    },
    Topic {
        id: "dp",
        title: "Dynamic Programming",
        description: "Optimization problems",
        icon: "🧠",
    },
    Topic {
        id: "sorting",
        title: "Sorting & Searching",
        description: "Algorithmic efficiency",
        icon: "🔍",
    },
];

/// Looks a topic up by id or, failing that, by case-insensitive title.
pub fn find_topic(key: &str) -> Option<&'static Topic> {
    let key = key.trim();
    TOPICS
        .iter()
        .find(|topic| topic.id == key)
        .or_else(|| TOPICS.iter().find(|topic| topic.title.eq_ignore_ascii_case(key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        for (i, topic) in TOPICS.iter().enumerate() {
            assert!(TOPICS[i + 1..].iter().all(|other| other.id != topic.id));
        }
    }

    #[test]
    fn find_topic_matches_id_and_title() {
        assert_eq!(find_topic("dp").map(|t| t.title), Some("Dynamic Programming"));
        assert_eq!(find_topic(" graphs ").map(|t| t.id), Some("graphs"));
        assert_eq!(find_topic("trees & bst").map(|t| t.id), Some("trees"));
        assert!(find_topic("heaps").is_none());
    }

    #[test]
    fn prompt_uses_title() {
        let topic = find_topic("arrays").unwrap();
        assert_eq!(topic.prompt(), "Tell me about Arrays & Strings");
    }
}

//! Pure derivation of the visible list from the cached collection.
use crate::models::Entity;
use feruca::Collator;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Free-text query plus an optional exact category-name filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Matched case-insensitively against title and content.
    pub query: String,
    /// Matched exactly (case-sensitive) against the category name.
    /// `None` or an empty string disables the filter.
    pub category: Option<String>,
}

impl FilterState {
    pub fn new(query: impl Into<String>, category: Option<String>) -> Self {
        Self {
            query: query.into(),
            category,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.category_filter().is_none()
    }

    fn category_filter(&self) -> Option<&str> {
        self.category.as_deref().filter(|c| !c.is_empty())
    }

    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        let query_ok = self.query.is_empty() || {
            let needle = self.query.to_lowercase();
            entity.title().to_lowercase().contains(&needle)
                || entity.content().to_lowercase().contains(&needle)
        };
        let category_ok = self
            .category_filter()
            .map_or(true, |wanted| entity.category_name() == Some(wanted));
        query_ok && category_ok
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    /// Most recently created first.
    #[default]
    Newest,
    /// Title ascending, case-insensitive.
    Title,
}

impl SortKey {
    /// Value of the `sort` query parameter for server-paged listings.
    pub fn as_param(self) -> &'static str {
        match self {
            SortKey::Newest => "newest",
            SortKey::Title => "title",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(SortKey::Newest),
            "title" => Ok(SortKey::Title),
            other => Err(format!("unknown sort '{other}' (expected newest or title)")),
        }
    }
}

/// Unicode collation order (CLDR root), so accented and cased titles sit
/// beside their base letters. Code-point order breaks collation ties.
pub fn compare_titles(collator: &mut Collator, a: &str, b: &str) -> Ordering {
    collator.collate(a, b).then_with(|| a.cmp(b))
}

/// Filter then stable-sort the collection.
///
/// Entities comparing equal under `sort` keep their server order.
pub fn derive<'a, E: Entity>(items: &'a [E], filter: &FilterState, sort: SortKey) -> Vec<&'a E> {
    let mut visible: Vec<&E> = items.iter().filter(|e| filter.matches(*e)).collect();
    match sort {
        SortKey::Newest => visible.sort_by(|a, b| b.created_at().cmp(&a.created_at())),
        SortKey::Title => {
            let mut collator = Collator::default();
            visible.sort_by(|a, b| compare_titles(&mut collator, a.title(), b.title()));
        }
    }
    visible
}

/// Distinct category names in first-seen order, for the category filter choices.
pub fn category_options<E: Entity>(items: &[E]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for name in items.iter().filter_map(Entity::category_name) {
        if !name.is_empty() && !seen.iter().any(|s| s == name) {
            seen.push(name.to_owned());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::test_support::{article, category};
    use crate::models::Article;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn titles(items: &[&Article]) -> Vec<String> {
        items.iter().map(|a| a.title.clone()).collect()
    }

    #[test]
    fn test_query_matches_title_or_content() {
        let items = vec![
            article("1", "Intro", "<p>react basics</p>", "Tech", 0),
            article("2", "Go", "<p>none</p>", "Tech", 1),
        ];
        let filter = FilterState::new("react", None);
        let out = derive(&items, &filter, SortKey::Newest);
        assert_eq!(titles(&out), vec!["Intro"]);
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let items = vec![article("1", "Learning RUST", "", "Tech", 0)];
        assert!(FilterState::new("rust", None).matches(&items[0]));
        assert!(FilterState::new("LEARN", None).matches(&items[0]));
    }

    #[test]
    fn test_category_is_exact_and_case_sensitive() {
        let items = vec![
            article("1", "A", "", "Tech", 0),
            article("2", "B", "", "tech", 1),
            article("3", "C", "", "Technology", 2),
        ];
        let filter = FilterState::new("", Some("Tech".into()));
        let out = derive(&items, &filter, SortKey::Title);
        assert_eq!(titles(&out), vec!["A"]);
    }

    #[test]
    fn test_empty_category_string_means_no_filter() {
        let items = vec![article("1", "A", "", "Tech", 0)];
        let filter = FilterState::new("", Some(String::new()));
        assert!(filter.is_empty());
        assert_eq!(derive(&items, &filter, SortKey::Newest).len(), 1);
    }

    #[test]
    fn test_newest_first() {
        let items = vec![
            article("1", "old", "", "T", 0),
            article("2", "new", "", "T", 10),
            article("3", "mid", "", "T", 5),
        ];
        let out = derive(&items, &FilterState::default(), SortKey::Newest);
        assert_eq!(titles(&out), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_title_sort_ignores_case_first_and_is_stable() {
        let items = vec![
            article("1", "banana", "", "T", 0),
            article("2", "Apple", "", "T", 1),
            article("3", "apple", "", "T", 2),
            article("4", "Cherry", "", "T", 3),
            article("5", "apple", "", "T", 4),
        ];
        let out = derive(&items, &FilterState::default(), SortKey::Title);
        let ids: Vec<&str> = out.iter().map(|a| a.id.as_str()).collect();
        // Lowercase before uppercase on a case-only difference; equal titles keep server order.
        assert_eq!(ids, vec!["3", "5", "2", "1", "4"]);
    }

    #[test]
    fn test_title_sort_places_accents_with_base_letter() {
        let items = vec![
            article("1", "zebra", "", "T", 0),
            article("2", "Éclair", "", "T", 1),
            article("3", "apple", "", "T", 2),
            article("4", "über", "", "T", 3),
            article("5", "eclair", "", "T", 4),
        ];
        let out = derive(&items, &FilterState::default(), SortKey::Title);
        assert_eq!(titles(&out), vec!["apple", "eclair", "Éclair", "über", "zebra"]);
    }

    #[test]
    fn test_categories_filter_by_name() {
        let items = vec![category("1", "Tech"), category("2", "Sports")];
        let out = derive(&items, &FilterState::new("spo", None), SortKey::Title);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name, "Sports");

        // Categories carry no category name, so a category filter excludes all.
        let out = derive(&items, &FilterState::new("", Some("Tech".into())), SortKey::Title);
        assert!(out.is_empty());
    }

    #[test]
    fn test_category_options_distinct_in_order() {
        let items = vec![
            article("1", "A", "", "Tech", 0),
            article("2", "B", "", "Sports", 1),
            article("3", "C", "", "Tech", 2),
        ];
        assert_eq!(category_options(&items), vec!["Tech", "Sports"]);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("Title".parse::<SortKey>().unwrap(), SortKey::Title);
        assert_eq!("newest".parse::<SortKey>().unwrap(), SortKey::Newest);
        assert!("oldest".parse::<SortKey>().is_err());
        assert_eq!(SortKey::default().as_param(), "newest");
    }

    fn arb_articles() -> impl Strategy<Value = Vec<Article>> {
        prop::collection::vec(
            ("[a-cA-C ]{0,6}", "[a-cA-C<>/p ]{0,10}", prop::sample::select(vec!["Tech", "News", "tech"])),
            0..30,
        )
        .prop_map(|rows| {
            rows.into_iter()
                .enumerate()
                .map(|(i, (title, content, cat))| {
                    article(&i.to_string(), &title, &content, cat, (i * 7 % 11) as i64)
                })
                .collect()
        })
    }

    fn arb_filter() -> impl Strategy<Value = FilterState> {
        (
            "[a-cA-C]{0,2}",
            prop::option::of(prop::sample::select(vec!["Tech", "News", ""])),
        )
            .prop_map(|(q, c)| FilterState::new(q, c.map(str::to_owned)))
    }

    proptest! {
        #[test]
        fn prop_filter_sound_and_complete(items in arb_articles(), filter in arb_filter()) {
            let out = derive(&items, &filter, SortKey::Newest);
            for a in &out {
                prop_assert!(filter.matches(*a));
            }
            let expected = items.iter().filter(|a| filter.matches(*a)).count();
            prop_assert_eq!(out.len(), expected);
        }

        #[test]
        fn prop_derive_is_idempotent(items in arb_articles(), filter in arb_filter(), by_title in any::<bool>()) {
            let sort = if by_title { SortKey::Title } else { SortKey::Newest };
            let once: Vec<Article> = derive(&items, &filter, sort).into_iter().cloned().collect();
            let twice: Vec<Article> = derive(&once, &filter, sort).into_iter().cloned().collect();
            prop_assert_eq!(once, twice);
        }
    }
}

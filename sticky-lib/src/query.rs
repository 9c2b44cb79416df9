//! Searching and ordering the board. Pure functions over a mirror.

use std::{cmp::Ordering, fmt};

use chrono::{DateTime, Local, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{Note, scheduler::next_due};

const TAG_PREFIX: &str = "tag:";
const FOLDER_PREFIX: &str = "folder:";

#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortKey {
    /// Most recently edited first
    #[default]
    Updated,
    /// Newest first
    Created,
    /// Alphabetical, ignoring case
    Title,
}

/// Notes matching `search`, in their original order.
///
/// `tag:<text>` and `folder:<text>` restrict the match to tags or the folder; anything else is
/// looked up in the title, content and color. Matching ignores case and an empty search matches
/// everything.
pub fn filter<'a>(notes: &'a [Note], search: &str, pinned_only: bool) -> Vec<&'a Note> {
    let query = search.trim().to_lowercase();

    notes
        .iter()
        .filter(|note| !pinned_only || note.pinned)
        .filter(|note| matches(note, &query))
        .collect()
}

fn matches(note: &Note, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }

    if let Some(tag) = query.strip_prefix(TAG_PREFIX) {
        let tag = tag.trim();
        return note.tags.iter().any(|t| t.to_lowercase().contains(tag));
    }

    if let Some(folder) = query.strip_prefix(FOLDER_PREFIX) {
        return note.folder.to_lowercase().contains(folder.trim());
    }

    [note.title.as_str(), note.content.as_str(), note.color.hex()]
        .iter()
        .any(|field| field.to_lowercase().contains(query))
}

/// Order by `key`, then move pinned notes to the front. Both passes are stable, so each group
/// keeps the `key` order.
pub fn sort(mut notes: Vec<&Note>, key: SortKey) -> Vec<&Note> {
    notes.sort_by(|a, b| compare(a, b, key));
    notes.sort_by_key(|note| !note.pinned);
    notes
}

fn compare(a: &Note, b: &Note, key: SortKey) -> Ordering {
    match key {
        SortKey::Updated => b.updated_at().cmp(&a.updated_at()),
        SortKey::Created => b.created_at().cmp(&a.created_at()),
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    }
}

/// Counts shown in the board header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub visible: usize,
    pub total: usize,
    pub next_reminder: Option<DateTime<Utc>>,
}

pub fn summarize(notes: &[Note], visible: usize, now: DateTime<Utc>) -> Summary {
    Summary {
        visible,
        total: notes.len(),
        next_reminder: next_due(notes, now),
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} visible • {} total", self.visible, self.total)?;
        if let Some(at) = self.next_reminder {
            let at = at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
            write!(f, " • Next reminder: {at}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::cmp::Ordering;

    use chrono::{TimeDelta, TimeZone, Utc};
    use proptest::{prelude::*, sample};

    use super::{SortKey, compare, filter, sort, summarize};
    use crate::{Note, repository::Color, testing::arb_notes};

    fn board() -> Vec<Note> {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let at = |minutes: i64| start + TimeDelta::minutes(minutes);

        let mut groceries = Note::mock("groceries", at(0));
        groceries.title = "Groceries".into();
        groceries.content = "Milk, eggs".into();
        groceries.tags = vec!["Home".into()];
        groceries.touch(at(50));

        let mut standup = Note::mock("standup", at(10));
        standup.title = "standup".into();
        standup.tags = vec!["work".into(), "daily".into()];
        standup.folder = "Projects".into();
        standup.pinned = true;
        standup.touch(at(20));

        let mut review = Note::mock("review", at(20));
        review.title = "Code review".into();
        review.tags = vec!["Homework".into()];
        review.color = Color::Sky;
        review.touch(at(40));

        let mut ideas = Note::mock("ideas", at(30));
        ideas.title = "ideas".into();
        ideas.pinned = true;
        ideas.touch(at(60));

        vec![groceries, standup, review, ideas]
    }

    fn ids(notes: &[&Note]) -> Vec<String> {
        notes.iter().map(|n| n.id().to_string()).collect()
    }

    #[test]
    fn test_empty_search_matches_all() {
        let notes = board();

        assert_eq!(filter(&notes, "   ", false).len(), 4);
        assert_eq!(ids(&filter(&notes, "", true)), vec!["standup", "ideas"]);
    }

    #[test]
    fn test_tag_search() {
        let notes = board();

        assert_eq!(ids(&filter(&notes, "tag:work", false)), vec!["standup", "review"]);
        assert_eq!(ids(&filter(&notes, "TAG: HOME", false)), vec!["groceries", "review"]);
        assert!(filter(&notes, "tag:urgent", false).is_empty());
    }

    #[test]
    fn test_folder_search() {
        let notes = board();

        assert_eq!(ids(&filter(&notes, "folder:proj", false)), vec!["standup"]);
        assert_eq!(filter(&notes, "folder:default", false).len(), 3);
    }

    #[test]
    fn test_text_search() {
        let notes = board();

        assert_eq!(ids(&filter(&notes, "EGGS", false)), vec!["groceries"]);
        assert_eq!(ids(&filter(&notes, "#38bdf8", false)), vec!["review"]);
        assert_eq!(ids(&filter(&notes, "review", true)), Vec::<String>::new());
    }

    #[test]
    fn test_sort_pinned_first_under_every_key() {
        let notes = board();
        let all = || filter(&notes, "", false);

        assert_eq!(
            ids(&sort(all(), SortKey::Updated)),
            vec!["ideas", "standup", "groceries", "review"]
        );
        assert_eq!(
            ids(&sort(all(), SortKey::Created)),
            vec!["ideas", "standup", "review", "groceries"]
        );
        assert_eq!(
            ids(&sort(all(), SortKey::Title)),
            vec!["ideas", "standup", "review", "groceries"]
        );
    }

    #[test]
    fn test_summary() {
        let notes = board();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

        let summary = summarize(&notes, 2, now);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.next_reminder, None);
        assert_eq!(summary.to_string(), "2 visible • 4 total");

        let mut with_reminder = notes.clone();
        if let Some(note) = with_reminder.first_mut() {
            note.reminder_at = Some(now + TimeDelta::hours(2));
        }
        let summary = summarize(&with_reminder, 4, now);
        assert!(summary.to_string().contains(" • Next reminder: "));
    }

    fn arb_key() -> impl Strategy<Value = SortKey> {
        sample::select(vec![SortKey::Updated, SortKey::Created, SortKey::Title])
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        /// `tag:` keeps exactly the notes with a tag containing the text, in stored order.
        #[test]
        fn prop_tag_filter_is_the_matching_subset(
            notes in arb_notes(0..8),
            needle in "[a-zA-Z]{1,3}",
        ) {
            let found = filter(&notes, &format!("tag:{needle}"), false);

            let needle = needle.to_lowercase();
            let expected: Vec<&Note> = notes
                .iter()
                .filter(|n| n.tags.iter().any(|t| t.to_lowercase().contains(&needle)))
                .collect();
            prop_assert_eq!(found, expected);
        }

        /// Pinned notes come first and each group follows the sort key.
        #[test]
        fn prop_sort_pinned_first_then_key(notes in arb_notes(0..8), key in arb_key()) {
            let sorted = sort(filter(&notes, "", false), key);
            prop_assert_eq!(sorted.len(), notes.len());

            let pinned = sorted.iter().take_while(|n| n.pinned).count();
            prop_assert!(sorted.iter().skip(pinned).all(|n| !n.pinned));

            for pair in sorted.windows(2) {
                if let [a, b] = pair
                    && a.pinned == b.pinned
                {
                    prop_assert_ne!(compare(a, b, key), Ordering::Greater);
                }
            }
        }
    }
}

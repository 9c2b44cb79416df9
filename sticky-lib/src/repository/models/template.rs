use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::repository::models::UNTITLED;

/// Starting point offered when creating a note.
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
    EnumIter,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Template {
    #[default]
    Blank,
    Todo,
    Meeting,
    Shopping,
}

impl Template {
    pub fn title(&self) -> &'static str {
        match self {
            Template::Blank => UNTITLED,
            Template::Todo => "Todo List",
            Template::Meeting => "Meeting Notes",
            Template::Shopping => "Shopping List",
        }
    }

    pub fn content(&self) -> &'static str {
        match self {
            Template::Blank => "",
            Template::Todo => "- [ ] Item 1\n- [ ] Item 2\n- [ ] Item 3",
            Template::Meeting => "Date: \nAttendees: \nTopics:\n- \nAction Items:\n- ",
            Template::Shopping => "- \n- \n- \n- \n- ",
        }
    }
}

#[cfg(test)]
mod test {
    use super::Template;

    #[test]
    fn test_todo_is_three_item_checklist() {
        assert_eq!(Template::Todo.title(), "Todo List");
        assert_eq!(Template::Todo.content().lines().count(), 3);
        assert!(Template::Todo.content().lines().all(|l| l.starts_with("- [ ] ")));
    }

    #[test]
    fn test_parse() {
        assert_eq!("meeting".parse::<Template>().unwrap(), Template::Meeting);
        assert!("nope".parse::<Template>().is_err());
    }
}

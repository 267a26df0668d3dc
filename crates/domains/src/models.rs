//! # Domain Models
//!
//! These structs represent the core entities of the catalog. Relations are
//! explicit foreign-key fields; joined data travels in [`CardDetail`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CardId = i64;
pub type TagId = i64;
pub type CategoryId = i64;
pub type UserId = i64;

pub const QUESTION_MAX_LEN: usize = 255;
pub const ANSWER_MAX_LEN: usize = 5000;
pub const TAG_NAME_MAX_LEN: usize = 100;
pub const CATEGORY_NAME_MAX_LEN: usize = 100;
pub const USERNAME_MAX_LEN: usize = 150;

/// Marker whose presence in an answer means it carries a code block.
pub const CODE_FENCE: &str = "```";

/// Moderation state of a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStatus {
    #[default]
    Unchecked,
    Checked,
}

impl CardStatus {
    pub fn from_checked(checked: bool) -> Self {
        if checked {
            Self::Checked
        } else {
            Self::Unchecked
        }
    }

    pub fn is_checked(self) -> bool {
        matches!(self, Self::Checked)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unchecked => "Unchecked",
            Self::Checked => "Checked",
        }
    }
}

/// The fundamental unit of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub question: String,
    /// Markdown source, rendered at display time
    pub answer: String,
    pub category_id: CategoryId,
    /// Set once at creation
    pub upload_date: DateTime<Utc>,
    pub views: i64,
    pub favorites: i64,
    pub status: CardStatus,
    /// Cleared when the author account is deleted
    pub author_id: Option<UserId>,
}

impl Card {
    pub fn has_code(&self) -> bool {
        self.answer.contains(CODE_FENCE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    /// Always lowercase
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub card_count: i64,
}

/// A card together with everything a page needs to display it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetail {
    pub card: Card,
    pub category: Category,
    /// Sorted by name
    pub tags: Vec<Tag>,
    pub author: Option<String>,
}

impl CardDetail {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

/// Fields accepted when inserting a card; the store assigns the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCard {
    pub question: String,
    pub answer: String,
    pub category_id: CategoryId,
    pub author_id: Option<UserId>,
}

/// Editable fields of an existing card. `status` is only set by moderators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardChanges {
    pub question: String,
    pub answer: String,
    pub category_id: CategoryId,
    pub status: Option<CardStatus>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
}

impl UserRole {
    /// Moderators and admins may edit anyone's cards and enter the back-office.
    pub fn can_moderate(self) -> bool {
        matches!(self, Self::Moderator | Self::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Self::User),
            "moderator" => Some(Self::Moderator),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// PHC string produced by the password hasher
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Whether this user may change or delete `card`.
    pub fn can_manage(&self, card: &Card) -> bool {
        card.author_id == Some(self.id) || self.role.can_moderate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
}

/// Emitted once per newly created card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardCreated {
    pub card_id: CardId,
    pub author: Option<String>,
    pub category: String,
    pub question: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(author_id: Option<UserId>, answer: &str) -> Card {
        Card {
            id: 1,
            question: "What is ownership?".into(),
            answer: answer.into(),
            category_id: 1,
            upload_date: Utc::now(),
            views: 0,
            favorites: 0,
            status: CardStatus::Unchecked,
            author_id,
        }
    }

    fn user(id: UserId, role: UserRole) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: None,
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            role,
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn author_and_moderators_can_manage() {
        let c = card(Some(7), "text");
        assert!(user(7, UserRole::User).can_manage(&c));
        assert!(!user(8, UserRole::User).can_manage(&c));
        assert!(user(8, UserRole::Moderator).can_manage(&c));
        assert!(user(8, UserRole::Admin).can_manage(&c));
    }

    #[test]
    fn orphaned_card_is_only_manageable_by_moderators() {
        let c = card(None, "text");
        assert!(!user(1, UserRole::User).can_manage(&c));
        assert!(user(1, UserRole::Moderator).can_manage(&c));
    }

    #[test]
    fn has_code_detects_fences() {
        assert!(card(None, "```rust\nfn main() {}\n```").has_code());
        assert!(!card(None, "plain `inline` code").has_code());
    }

    #[test]
    fn role_round_trips_through_str() {
        for role in [UserRole::User, UserRole::Moderator, UserRole::Admin] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("root"), None);
    }
}

//! Core domain types, sprint grouping, and slide pagination
//! for sprint deck generation.

pub mod board;
pub mod config;
pub mod deck;
pub mod error;
pub mod group;
pub mod normalize;
pub mod types;

pub use board::{BoardData, EntityId};
pub use config::SprintConfig;
pub use deck::DeckBuilder;
pub use error::{Error, Result};
pub use group::{group_issues, rank_epics};
pub use normalize::normalize_text;
pub use types::{Deck, Epic, FontSize, Grouping, Issue, Paragraph, SlideContent};

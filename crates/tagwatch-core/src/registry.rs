//! Immutable registry of authorized cards.
//!
//! The registry is built once at startup from `(identifier, name)` pairs and
//! never changes afterwards. Classification is a plain membership test: an
//! unknown identifier is a valid [`Outcome::Unauthorized`], not an error.
//!
//! # Examples
//!
//! ```
//! use tagwatch_core::{CardId, CardRegistry, Outcome};
//!
//! let registry = CardRegistry::new([(CardId::new(1036396588), "Wies")]).unwrap();
//!
//! assert!(registry.classify(CardId::new(1036396588)).is_authorized());
//! assert_eq!(
//!     registry.classify(CardId::new(999999999)),
//!     Outcome::Unauthorized { id: CardId::new(999999999) }
//! );
//! ```

use std::collections::HashMap;

use crate::{CardId, Error, Outcome, Result};

/// Mapping from card identifier to display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardRegistry {
    cards: HashMap<CardId, String>,
}

impl CardRegistry {
    /// Build a registry from `(identifier, name)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is blank or an identifier appears twice.
    pub fn new<I, N>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (CardId, N)>,
        N: Into<String>,
    {
        let mut cards = HashMap::new();

        for (id, name) in entries {
            let name = name.into();
            if name.trim().is_empty() {
                return Err(Error::InvalidCardEntry(format!(
                    "Card {id} has an empty name"
                )));
            }
            if cards.insert(id, name).is_some() {
                return Err(Error::DuplicateCard(id.to_string()));
            }
        }

        Ok(Self { cards })
    }

    /// Default enrolment used when no card list is configured.
    pub fn reference() -> Self {
        let cards = [
            (CardId::new(1036396588), "Wies".to_string()),
            (CardId::new(571511444), "Tim".to_string()),
        ];
        Self {
            cards: cards.into_iter().collect(),
        }
    }

    /// Classify a scanned identifier.
    ///
    /// Pure lookup: no side effects, never fails.
    #[must_use]
    pub fn classify(&self, id: CardId) -> Outcome {
        match self.cards.get(&id) {
            Some(name) => Outcome::Authorized {
                id,
                name: name.clone(),
            },
            None => Outcome::Unauthorized { id },
        }
    }

    /// Display name of a registered card.
    pub fn name_of(&self, id: CardId) -> Option<&str> {
        self.cards.get(&id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate over registered cards in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (CardId, &str)> {
        let mut entries: Vec<_> = self
            .cards
            .iter()
            .map(|(id, name)| (*id, name.as_str()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries.into_iter()
    }
}

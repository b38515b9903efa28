use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::card::{Card, Catalog};
use crate::storage::{DocumentStore, PlayerDocument, PlayerRecord, StoreError};

pub const MAX_HAND_SIZE: usize = 6;

/// A player's hand together with the number of cards left in their deck.
///
/// Serializes as `[hand, deck_size]`.
#[derive(Serialize, Debug, PartialEq, Clone)]
pub struct HandState(pub Vec<Card>, pub usize);

impl HandState {
    fn new(hand: &[Card], deck: &[Card]) -> Self {
        HandState(hand.to_vec(), deck.len())
    }

    pub fn hand(&self) -> &[Card] {
        &self.0
    }

    pub fn deck_size(&self) -> usize {
        self.1
    }
}

/// Deck and hand of a stored player, for operations that must not repair a record.
fn complete_record<'a>(
    players: &'a mut PlayerDocument,
    username: &str,
) -> Result<(&'a mut Vec<Card>, &'a mut Vec<Card>), StoreError> {
    let record = players
        .get_mut(username)
        .ok_or_else(|| StoreError::NotFound(username.to_string()))?;

    match (record.deck.as_mut(), record.hand.as_mut()) {
        (Some(deck), Some(hand)) => Ok((deck, hand)),
        _ => {
            log::warn!("Player {} is stored without a hand or deck", username);
            Err(StoreError::NotFound(username.to_string()))
        }
    }
}

/// Read-modify-write operations over the player document.
///
/// Every operation loads the whole document, changes one record and writes the
/// document back only if it differs from what was loaded.
pub struct PlayerStore<S> {
    storage: S,
    catalog: Catalog,
    rng: StdRng,
}

impl<S: DocumentStore> PlayerStore<S> {
    pub fn new(storage: S, catalog: Catalog) -> Self {
        Self::with_rng(storage, catalog, StdRng::from_entropy())
    }

    pub fn with_rng(storage: S, catalog: Catalog, rng: StdRng) -> Self {
        Self {
            storage,
            catalog,
            rng,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Loads the document, starting over from an empty one if it is not JSON at all.
    /// Well-formed JSON of the wrong shape is an error, so it never gets overwritten.
    fn load_or_empty(&self) -> Result<PlayerDocument, StoreError> {
        match self.storage.load() {
            Err(StoreError::Corrupt { path, source }) => {
                log::warn!(
                    "Player document {:?} is unreadable ({}), starting from an empty one",
                    path,
                    source
                );
                Ok(PlayerDocument::new())
            }
            result => result,
        }
    }

    /// Loads the document for an operation that needs an existing player.
    /// An unreadable document holds no players as far as the caller is concerned.
    fn load_existing(&self, username: &str) -> Result<PlayerDocument, StoreError> {
        match self.storage.load() {
            Err(e @ (StoreError::Corrupt { .. } | StoreError::Invalid { .. })) => {
                log::warn!("{}", e);
                Err(StoreError::NotFound(username.to_string()))
            }
            result => result,
        }
    }

    fn commit(&self, original: &PlayerDocument, players: &PlayerDocument) -> Result<(), StoreError> {
        if original != players {
            self.storage.save(players)?;
        }
        Ok(())
    }

    pub fn reset_player(&mut self, username: &str) -> Result<HandState, StoreError> {
        let original = self.load_or_empty()?;
        let mut players = original.clone();

        let deck = self.catalog.build_deck();
        let state = HandState(Vec::new(), deck.len());
        players.insert(username.to_string(), PlayerRecord::new(deck));

        self.commit(&original, &players)?;
        log::debug!("Reset {} with a deck of {}", username, state.deck_size());
        Ok(state)
    }

    /// Returns the player's hand, creating the player or refilling an exhausted deck as needed.
    pub fn get_or_init_hand(&mut self, username: &str) -> Result<HandState, StoreError> {
        let original = self.load_or_empty()?;
        let mut players = original.clone();

        let catalog = &self.catalog;
        let record = players.entry(username.to_string()).or_insert_with(|| {
            log::info!("Creating player {}", username);
            PlayerRecord::new(catalog.build_deck())
        });

        let hand = record.hand.get_or_insert_with(Vec::new).clone();
        let deck = record.deck.get_or_insert_with(Vec::new);
        if deck.is_empty() {
            log::debug!("Deck of {} is empty, rebuilding", username);
            *deck = catalog.build_deck();
        }
        let state = HandState(hand, deck.len());

        self.commit(&original, &players)?;
        Ok(state)
    }

    pub fn draw_card(&mut self, username: &str) -> Result<HandState, StoreError> {
        let original = self.load_existing(username)?;
        let mut players = original.clone();
        let (deck, hand) = complete_record(&mut players, username)?;

        if deck.is_empty() || hand.len() >= MAX_HAND_SIZE {
            log::debug!(
                "{} cannot draw: {} in deck, {} in hand",
                username,
                deck.len(),
                hand.len()
            );
            return Ok(HandState::new(hand, deck));
        }

        let index = self.rng.gen_range(0..deck.len());
        let card = deck.remove(index);
        log::debug!("{} drew card {} ({})", username, card.id, card.title);
        hand.push(card);
        let state = HandState::new(hand, deck);

        self.commit(&original, &players)?;
        Ok(state)
    }

    /// Removes the first card in the hand with `card_id`. Unknown ids leave the hand as is.
    pub fn discard_card(&mut self, username: &str, card_id: i64) -> Result<HandState, StoreError> {
        let original = self.load_existing(username)?;
        let mut players = original.clone();
        let (deck, hand) = complete_record(&mut players, username)?;

        match hand.iter().position(|card| card.id == card_id) {
            Some(index) => {
                hand.remove(index);
                log::debug!("{} discarded card {}", username, card_id);
            }
            None => log::debug!("{} holds no card {}", username, card_id),
        }
        let state = HandState::new(hand, deck);

        self.commit(&original, &players)?;
        Ok(state)
    }
}

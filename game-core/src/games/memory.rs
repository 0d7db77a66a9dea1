use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::{GameAction, GameError, GameEvent, Outcome};
use crate::scheduler::Scheduler;

const EMOJIS: [&str; 8] = ["😏", "😈", "🫦", "👅", "😘", "💋", "❤️", "🔥"];
const PENALTY_PER_FLIP: u32 = 50;
const INITIAL_SCORE: u32 = 100 * 2 * PENALTY_PER_FLIP;
const HIDE_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone)]
struct Card {
    emoji: &'static str,
    flipped: bool,
    matched: bool,
}

/// Face-down cards carry no emoji.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CardView {
    pub emoji: Option<&'static str>,
    pub matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryView {
    pub score: u32,
    pub cards: Vec<CardView>,
}

#[derive(Debug, Clone, Copy)]
enum Tick {
    Hide(usize, usize),
}

#[derive(Debug)]
pub struct MemoryGame {
    cards: Vec<Card>,
    face_up: Vec<usize>,
    scheduler: Scheduler<Tick>,
    score: u32,
    prize: u32,
    finished: bool,
}

impl MemoryGame {
    pub fn new(rng: &mut impl Rng, prize: u32) -> Self {
        let mut emojis: Vec<&'static str> = EMOJIS.iter().chain(EMOJIS.iter()).copied().collect();
        emojis.shuffle(rng);
        Self {
            cards: emojis
                .into_iter()
                .map(|emoji| Card {
                    emoji,
                    flipped: false,
                    matched: false,
                })
                .collect(),
            face_up: Vec::with_capacity(2),
            scheduler: Scheduler::new(),
            score: INITIAL_SCORE,
            prize,
            finished: false,
        }
    }

    pub(super) fn apply(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Flip { card } => self.flip(card),
            GameAction::Advance { ms } => Ok(self.advance(ms)),
            _ => Err(GameError::WrongGame),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.finished.then_some(Outcome::Won { points: self.prize })
    }

    pub fn view(&self) -> MemoryView {
        MemoryView {
            score: self.score,
            cards: self
                .cards
                .iter()
                .map(|c| CardView {
                    emoji: (c.flipped || c.matched).then_some(c.emoji),
                    matched: c.matched,
                })
                .collect(),
        }
    }

    fn flip(&mut self, index: usize) -> Result<Vec<GameEvent>, GameError> {
        if self.face_up.len() == 2 {
            return Err(GameError::BoardBusy);
        }
        let card = self.cards.get_mut(index).ok_or(GameError::CardUnavailable)?;
        if card.flipped || card.matched {
            return Err(GameError::CardUnavailable);
        }

        card.flipped = true;
        let emoji = card.emoji;
        self.face_up.push(index);
        self.score = self.score.saturating_sub(PENALTY_PER_FLIP);

        let mut events = vec![GameEvent::CardFlipped {
            card: index,
            emoji: emoji.to_string(),
        }];

        if let &[first, second] = self.face_up.as_slice() {
            if self.cards[first].emoji == self.cards[second].emoji {
                for i in [first, second] {
                    self.cards[i].matched = true;
                    self.cards[i].flipped = false;
                }
                self.face_up.clear();
                events.push(GameEvent::PairMatched { first, second });

                if self.cards.iter().all(|c| c.matched) {
                    self.finished = true;
                    events.push(GameEvent::GameFinished {
                        outcome: Outcome::Won { points: self.prize },
                    });
                }
            } else {
                self.scheduler.after(HIDE_DELAY_MS, Tick::Hide(first, second));
            }
        }
        Ok(events)
    }

    fn advance(&mut self, ms: u64) -> Vec<GameEvent> {
        let until = self.scheduler.now_ms().saturating_add(ms);
        let mut events = Vec::new();
        while let Some(Tick::Hide(first, second)) = self.scheduler.poll_until(until) {
            for i in [first, second] {
                self.cards[i].flipped = false;
            }
            self.face_up.clear();
            events.push(GameEvent::CardsHidden { first, second });
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn game() -> MemoryGame {
        MemoryGame::new(&mut ChaCha8Rng::seed_from_u64(4), 300)
    }

    fn partner_of(game: &MemoryGame, index: usize) -> usize {
        (0..game.cards.len())
            .find(|&i| i != index && game.cards[i].emoji == game.cards[index].emoji)
            .unwrap()
    }

    fn mismatch_of(game: &MemoryGame, index: usize) -> usize {
        (0..game.cards.len())
            .find(|&i| game.cards[i].emoji != game.cards[index].emoji)
            .unwrap()
    }

    #[test]
    fn deck_holds_each_emoji_twice_face_down() {
        let game = game();
        assert_eq!(game.cards.len(), 16);
        for emoji in EMOJIS {
            assert_eq!(game.cards.iter().filter(|c| c.emoji == emoji).count(), 2);
        }
        assert!(game.view().cards.iter().all(|c| c.emoji.is_none()));
        assert_eq!(game.score, 10_000);
    }

    #[test]
    fn mismatched_pair_hides_after_a_second() {
        let mut game = game();
        let other = mismatch_of(&game, 0);

        game.flip(0).unwrap();
        game.flip(other).unwrap();
        assert_eq!(game.flip(partner_of(&game, 0)).unwrap_err(), GameError::BoardBusy);

        assert!(game.advance(999).is_empty());
        let events = game.advance(1);
        assert_eq!(events, vec![GameEvent::CardsHidden { first: 0, second: other }]);
        assert!(game.view().cards.iter().all(|c| c.emoji.is_none()));
        assert_eq!(game.score, 9_900);
    }

    #[test]
    fn flipped_or_matched_cards_are_unavailable() {
        let mut game = game();
        game.flip(0).unwrap();
        assert_eq!(game.flip(0).unwrap_err(), GameError::CardUnavailable);
        assert_eq!(game.flip(16).unwrap_err(), GameError::CardUnavailable);

        let partner = partner_of(&game, 0);
        let events = game.flip(partner).unwrap();
        assert!(events.contains(&GameEvent::PairMatched { first: 0, second: partner }));
        assert_eq!(game.flip(partner).unwrap_err(), GameError::CardUnavailable);
        assert_eq!(game.view().cards[0].emoji, Some(game.cards[0].emoji));
    }

    #[test]
    fn perfect_game_wins_the_prize() {
        let mut game = game();
        let mut last = Vec::new();
        for index in 0..16 {
            if game.cards[index].matched {
                continue;
            }
            game.flip(index).unwrap();
            last = game.flip(partner_of(&game, index)).unwrap();
        }

        assert_eq!(game.score, 9_200);
        assert_eq!(game.outcome(), Some(Outcome::Won { points: 300 }));
        assert_eq!(
            last.last(),
            Some(&GameEvent::GameFinished {
                outcome: Outcome::Won { points: 300 }
            })
        );
    }
}

mod dinner;
mod hangman;
mod kiss;
mod memory;
mod nature;
mod picnic;
mod scratch;
mod trivia;

pub use dinner::{DinnerGame, DinnerView, Ingredient};
pub use hangman::{Hangman, HangmanView};
pub use kiss::{KissGame, KissKind, KissTarget, KissView};
pub use memory::{CardView, MemoryGame, MemoryView};
pub use nature::{Creature, CreatureKind, NatureGame, NatureView};
pub use picnic::{Ant, PicnicGame, PicnicView};
pub use scratch::{cleared_percentage, ScratchCard, ScratchGame, ScratchView};
pub use trivia::{Trivia, TriviaView};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GameKind {
    #[serde(rename = "kiss-game")]
    Kiss,
    #[serde(rename = "dinner")]
    Dinner,
    #[serde(rename = "massage")]
    Massage,
    #[serde(rename = "memory-game")]
    Memory,
    #[serde(rename = "picnic")]
    Picnic,
    #[serde(rename = "nature")]
    Nature,
    #[serde(rename = "boardgames")]
    BoardGames,
    #[serde(rename = "mystery")]
    Mystery,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum Outcome {
    Won { points: u32 },
    Lost,
}

impl Outcome {
    /// Timed games pay out their final score; nothing at or below zero wins.
    fn from_score(score: i64) -> Self {
        if score > 0 {
            Outcome::Won {
                points: u32::try_from(score).unwrap_or(u32::MAX),
            }
        } else {
            Outcome::Lost
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum GameAction {
    /// Lets `ms` milliseconds of game time pass.
    Advance { ms: u64 },
    Tap { target: u64 },
    TapAt { x: f32, y: f32 },
    Guess { letter: char },
    Flip { card: usize },
    Pick { ingredient: u32 },
    Scratch { x: f32, y: f32 },
    Release,
    Answer { option: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum GameEvent {
    Spawned { target: u64 },
    Vanished { target: u64 },
    Scored { delta: i64, score: i64 },
    Missed,
    Clock { time_left: u32 },
    SnackEaten { remaining: usize },
    LetterGuessed { letter: char, hit: bool },
    WordSolved { index: usize },
    CardFlipped { card: usize, emoji: String },
    PairMatched { first: usize, second: usize },
    CardsHidden { first: usize, second: usize },
    IngredientPicked { ingredient: u32 },
    DishServed { index: usize },
    NextDish { index: usize },
    ScratchProgress { cleared: f64 },
    Revealed,
    Answered { question: u32, correct: bool },
    GameFinished { outcome: Outcome },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("game already finished")]
    Finished,
    #[error("action not supported by this game")]
    WrongGame,
    #[error("target not found")]
    TargetNotFound,
    #[error("not a letter")]
    NotALetter,
    #[error("letter already guessed")]
    AlreadyGuessed,
    #[error("card unavailable")]
    CardUnavailable,
    #[error("two cards already face up")]
    BoardBusy,
    #[error("ingredient not on offer")]
    IngredientNotOffered,
    #[error("ingredient already picked")]
    AlreadyPicked,
    #[error("selection closed")]
    SelectionClosed,
    #[error("no such answer")]
    OptionOutOfRange,
    #[error("point outside the card")]
    OutOfBounds,
}

#[derive(Debug)]
pub enum Game {
    Kiss(KissGame),
    Dinner(DinnerGame),
    Massage(ScratchGame),
    Memory(MemoryGame),
    Picnic(PicnicGame),
    Nature(NatureGame),
    BoardGames(Hangman),
    Mystery(Trivia),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "game")]
pub enum GameView {
    Kiss(KissView),
    Dinner(DinnerView),
    Massage(ScratchView),
    Memory(MemoryView),
    Picnic(PicnicView),
    Nature(NatureView),
    BoardGames(HangmanView),
    Mystery(TriviaView),
}

impl Game {
    /// `prize` is what puzzle games pay out on a win; timed games pay their score.
    pub fn new(kind: GameKind, prize: u32, seed: Option<u64>) -> Self {
        let mut rng = seed
            .map(ChaCha8Rng::seed_from_u64)
            .unwrap_or_else(ChaCha8Rng::from_entropy);
        match kind {
            GameKind::Kiss => Game::Kiss(KissGame::new(rng)),
            GameKind::Dinner => Game::Dinner(DinnerGame::new(rng, prize)),
            GameKind::Massage => Game::Massage(ScratchGame::new(prize)),
            GameKind::Memory => Game::Memory(MemoryGame::new(&mut rng, prize)),
            GameKind::Picnic => Game::Picnic(PicnicGame::new(rng)),
            GameKind::Nature => Game::Nature(NatureGame::new(rng)),
            GameKind::BoardGames => Game::BoardGames(Hangman::new(&mut rng, prize)),
            GameKind::Mystery => Game::Mystery(Trivia::new(&mut rng, prize)),
        }
    }

    pub fn kind(&self) -> GameKind {
        match self {
            Game::Kiss(_) => GameKind::Kiss,
            Game::Dinner(_) => GameKind::Dinner,
            Game::Massage(_) => GameKind::Massage,
            Game::Memory(_) => GameKind::Memory,
            Game::Picnic(_) => GameKind::Picnic,
            Game::Nature(_) => GameKind::Nature,
            Game::BoardGames(_) => GameKind::BoardGames,
            Game::Mystery(_) => GameKind::Mystery,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Game::Kiss(g) => g.outcome(),
            Game::Dinner(g) => g.outcome(),
            Game::Massage(g) => g.outcome(),
            Game::Memory(g) => g.outcome(),
            Game::Picnic(g) => g.outcome(),
            Game::Nature(g) => g.outcome(),
            Game::BoardGames(g) => g.outcome(),
            Game::Mystery(g) => g.outcome(),
        }
    }

    pub fn view(&self) -> GameView {
        match self {
            Game::Kiss(g) => GameView::Kiss(g.view()),
            Game::Dinner(g) => GameView::Dinner(g.view()),
            Game::Massage(g) => GameView::Massage(g.view()),
            Game::Memory(g) => GameView::Memory(g.view()),
            Game::Picnic(g) => GameView::Picnic(g.view()),
            Game::Nature(g) => GameView::Nature(g.view()),
            Game::BoardGames(g) => GameView::BoardGames(g.view()),
            Game::Mystery(g) => GameView::Mystery(g.view()),
        }
    }
}

pub fn apply_action(game: &mut Game, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
    if game.outcome().is_some() {
        return Err(GameError::Finished);
    }

    match game {
        Game::Kiss(g) => g.apply(action),
        Game::Dinner(g) => g.apply(action),
        Game::Massage(g) => g.apply(action),
        Game::Memory(g) => g.apply(action),
        Game::Picnic(g) => g.apply(action),
        Game::Nature(g) => g.apply(action),
        Game::BoardGames(g) => g.apply(action),
        Game::Mystery(g) => g.apply(action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [GameKind; 8] = [
        GameKind::Kiss,
        GameKind::Dinner,
        GameKind::Massage,
        GameKind::Memory,
        GameKind::Picnic,
        GameKind::Nature,
        GameKind::BoardGames,
        GameKind::Mystery,
    ];

    #[test]
    fn every_kind_starts_unfinished() {
        for kind in ALL {
            let game = Game::new(kind, 100, Some(7));
            assert_eq!(game.kind(), kind);
            assert_eq!(game.outcome(), None, "{kind:?}");
        }
    }

    #[test]
    fn rejects_actions_meant_for_other_games() {
        let mut game = Game::new(GameKind::BoardGames, 200, Some(1));
        let err = apply_action(&mut game, GameAction::Flip { card: 0 }).unwrap_err();
        assert_eq!(err, GameError::WrongGame);

        let mut game = Game::new(GameKind::Massage, 150, Some(1));
        let err = apply_action(&mut game, GameAction::Guess { letter: 'a' }).unwrap_err();
        assert_eq!(err, GameError::WrongGame);
    }

    #[test]
    fn finished_games_reject_further_actions() {
        let mut game = Game::new(GameKind::Kiss, 100, Some(3));
        let events = apply_action(&mut game, GameAction::Advance { ms: 60_000 }).unwrap();
        assert!(matches!(events.last(), Some(GameEvent::GameFinished { .. })));
        assert!(game.outcome().is_some());

        let err = apply_action(&mut game, GameAction::Advance { ms: 1 }).unwrap_err();
        assert_eq!(err, GameError::Finished);
    }

    #[test]
    fn huge_advances_end_timed_rounds_without_overflow() {
        for kind in [
            GameKind::Kiss,
            GameKind::Dinner,
            GameKind::Picnic,
            GameKind::Nature,
            GameKind::Memory,
        ] {
            let mut game = Game::new(kind, 300, Some(9));
            apply_action(&mut game, GameAction::Advance { ms: 1 }).unwrap();
            apply_action(&mut game, GameAction::Advance { ms: u64::MAX }).unwrap();
            if kind != GameKind::Memory {
                assert!(game.outcome().is_some(), "{kind:?}");
            }
        }
    }

    #[test]
    fn actions_and_views_use_tagged_json() {
        let action: GameAction = serde_json::from_str(r#"{"type":"guess","letter":"a"}"#).unwrap();
        assert_eq!(action, GameAction::Guess { letter: 'a' });
        let action: GameAction = serde_json::from_str(r#"{"type":"tap_at","x":1.5,"y":2}"#).unwrap();
        assert_eq!(action, GameAction::TapAt { x: 1.5, y: 2.0 });

        let kind: GameKind = serde_json::from_str("\"memory-game\"").unwrap();
        assert_eq!(kind, GameKind::Memory);

        let view = serde_json::to_value(Game::new(GameKind::Memory, 300, Some(9)).view()).unwrap();
        assert_eq!(view["game"], "memory");
        assert_eq!(view["cards"].as_array().unwrap().len(), 16);
    }

    #[test]
    fn score_outcomes_require_positive_score() {
        assert_eq!(Outcome::from_score(0), Outcome::Lost);
        assert_eq!(Outcome::from_score(-300), Outcome::Lost);
        assert_eq!(Outcome::from_score(450), Outcome::Won { points: 450 });
    }
}

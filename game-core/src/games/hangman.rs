use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::{GameAction, GameError, GameEvent, Outcome};

const MAX_MISSES: u32 = 7;
const WORDS_PER_ROUND: usize = 3;

const WORDS: [&str; 30] = [
    "Amor",
    "Ternura",
    "Cariños",
    "Comprension",
    "Compañia",
    "Pasion",
    "Dulzura",
    "Afecto",
    "Romance",
    "Corazon",
    "Besos",
    "Abrazos",
    "Fidelidad",
    "Confianza",
    "Respeto",
    "Admiracion",
    "Lealtad",
    "Complicidad",
    "Intimidad",
    "Devocion",
    "Entrega",
    "Felicidad",
    "Armonia",
    "Empatia",
    "Caricias",
    "Enamoramiento",
    "Adoracion",
    "Seduccion",
    "Atraccion",
    "Compromiso",
];

#[derive(Debug, Clone, Serialize)]
pub struct HangmanView {
    pub word_index: usize,
    pub word_count: usize,
    pub masked: String,
    pub guessed: Vec<char>,
    pub tries_left: u32,
}

#[derive(Debug)]
pub struct Hangman {
    words: Vec<&'static str>,
    current: usize,
    guessed: BTreeSet<char>,
    tries_left: u32,
    prize: u32,
    outcome: Option<Outcome>,
}

impl Hangman {
    pub fn new(rng: &mut impl Rng, prize: u32) -> Self {
        let words = WORDS.choose_multiple(rng, WORDS_PER_ROUND).copied().collect();
        Self::with_words(words, prize)
    }

    fn with_words(words: Vec<&'static str>, prize: u32) -> Self {
        Self {
            words,
            current: 0,
            guessed: BTreeSet::new(),
            tries_left: MAX_MISSES,
            prize,
            outcome: None,
        }
    }

    pub(super) fn apply(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Guess { letter } => self.guess(letter),
            _ => Err(GameError::WrongGame),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn view(&self) -> HangmanView {
        HangmanView {
            word_index: self.current,
            word_count: self.words.len(),
            masked: self.masked(),
            guessed: self.guessed.iter().copied().collect(),
            tries_left: self.tries_left,
        }
    }

    fn word(&self) -> &'static str {
        self.words[self.current]
    }

    /// Letters not yet guessed become `_`, separated by spaces.
    fn masked(&self) -> String {
        self.word()
            .chars()
            .map(|c| if self.guessed.contains(&lower(c)) { c } else { '_' })
            .map(String::from)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn guess(&mut self, letter: char) -> Result<Vec<GameEvent>, GameError> {
        if !letter.is_alphabetic() {
            return Err(GameError::NotALetter);
        }
        let letter = lower(letter);
        if !self.guessed.insert(letter) {
            return Err(GameError::AlreadyGuessed);
        }

        let hit = self.word().chars().any(|c| lower(c) == letter);
        if !hit {
            self.tries_left -= 1;
        }
        let mut events = vec![GameEvent::LetterGuessed { letter, hit }];

        let solved = self.word().chars().all(|c| self.guessed.contains(&lower(c)));
        if solved {
            events.push(GameEvent::WordSolved {
                index: self.current,
            });
            if self.current + 1 == self.words.len() {
                self.finish(Outcome::Won { points: self.prize }, &mut events);
            } else {
                self.current += 1;
                self.guessed.clear();
                self.tries_left = MAX_MISSES;
            }
        } else if self.tries_left == 0 {
            self.finish(Outcome::Lost, &mut events);
        }
        Ok(events)
    }

    fn finish(&mut self, outcome: Outcome, events: &mut Vec<GameEvent>) {
        self.outcome = Some(outcome);
        events.push(GameEvent::GameFinished { outcome });
    }
}

fn lower(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn game() -> Hangman {
        Hangman::with_words(vec!["Amor", "Besos", "Cariños"], 200)
    }

    fn solve(game: &mut Hangman, letters: &str) -> Vec<GameEvent> {
        letters
            .chars()
            .flat_map(|c| game.guess(c).unwrap())
            .collect()
    }

    #[test]
    fn round_draws_distinct_words() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let game = Hangman::new(&mut rng, 200);
        assert_eq!(game.words.len(), 3);
        assert_ne!(game.words[0], game.words[1]);
        assert_ne!(game.words[1], game.words[2]);
        assert_ne!(game.words[0], game.words[2]);
    }

    #[test]
    fn guesses_are_case_insensitive_and_keep_the_word_casing() {
        let mut game = game();
        assert_eq!(game.masked(), "_ _ _ _");

        let events = game.guess('A').unwrap();
        assert_eq!(events, vec![GameEvent::LetterGuessed { letter: 'a', hit: true }]);
        assert_eq!(game.masked(), "A _ _ _");
        assert_eq!(game.guess('a').unwrap_err(), GameError::AlreadyGuessed);
    }

    #[test]
    fn non_letters_are_rejected() {
        let mut game = game();
        assert_eq!(game.guess('3').unwrap_err(), GameError::NotALetter);
        assert_eq!(game.guess(' ').unwrap_err(), GameError::NotALetter);
        assert_eq!(game.tries_left, MAX_MISSES);
    }

    #[test]
    fn solving_a_word_moves_to_the_next_with_fresh_tries() {
        let mut game = game();
        game.guess('z').unwrap();
        assert_eq!(game.tries_left, 6);

        let events = solve(&mut game, "amor");
        assert!(events.contains(&GameEvent::WordSolved { index: 0 }));
        assert_eq!(game.current, 1);
        assert_eq!(game.tries_left, MAX_MISSES);
        assert!(game.guessed.is_empty());
    }

    #[test]
    fn seven_misses_lose_the_round() {
        let mut game = game();
        let events = solve(&mut game, "zxqwtyu");
        assert_eq!(game.tries_left, 0);
        assert_eq!(
            events.last(),
            Some(&GameEvent::GameFinished {
                outcome: Outcome::Lost
            })
        );
    }

    #[test]
    fn three_words_win_the_prize() {
        let mut game = game();
        solve(&mut game, "amor");
        solve(&mut game, "beso");
        assert_eq!(game.masked(), "_ _ _ _ _ _ _");
        let events = solve(&mut game, "cariños");

        assert_eq!(game.outcome(), Some(Outcome::Won { points: 200 }));
        assert_eq!(
            events.last(),
            Some(&GameEvent::GameFinished {
                outcome: Outcome::Won { points: 200 }
            })
        );
    }
}

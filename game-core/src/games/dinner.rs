use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::{GameAction, GameError, GameEvent, Outcome};
use crate::scheduler::{Scheduler, TimerHandle};

const DISHES_PER_ROUND: usize = 5;
const INGREDIENTS_OFFERED: usize = 6;
const INGREDIENTS_TO_PICK: usize = 3;
const SECONDS_PER_DISH: u32 = 5;
const NEXT_DISH_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Ingredient {
    pub id: u32,
    pub name: &'static str,
    pub emoji: &'static str,
}

#[derive(Debug)]
struct Dish {
    name: &'static str,
    emoji: &'static str,
    required: [u32; INGREDIENTS_TO_PICK],
}

static INGREDIENTS: [Ingredient; 19] = [
    Ingredient { id: 1, name: "Arroz", emoji: "🍚" },
    Ingredient { id: 2, name: "Pescado", emoji: "🐟" },
    Ingredient { id: 3, name: "Alga", emoji: "🌿" },
    Ingredient { id: 4, name: "Fideos", emoji: "🍜" },
    Ingredient { id: 5, name: "Caldo", emoji: "🥣" },
    Ingredient { id: 6, name: "Huevo", emoji: "🥚" },
    Ingredient { id: 7, name: "Pasta", emoji: "🍝" },
    Ingredient { id: 8, name: "Queso", emoji: "🧀" },
    Ingredient { id: 9, name: "Masa", emoji: "🥖" },
    Ingredient { id: 10, name: "Tomate", emoji: "🍅" },
    Ingredient { id: 11, name: "Vino", emoji: "🍷" },
    Ingredient { id: 12, name: "Azafrán", emoji: "🌱" },
    Ingredient { id: 13, name: "Mariscos", emoji: "🦐" },
    Ingredient { id: 14, name: "Tortilla", emoji: "🌯" },
    Ingredient { id: 15, name: "Carne", emoji: "🥩" },
    Ingredient { id: 16, name: "Salsa", emoji: "🥫" },
    Ingredient { id: 17, name: "Especias", emoji: "🌶️" },
    Ingredient { id: 18, name: "Verduras", emoji: "🥦" },
    Ingredient { id: 19, name: "Pan", emoji: "🍞" },
];

static DISHES: [Dish; 10] = [
    Dish { name: "Sushi", emoji: "🍣", required: [1, 2, 3] },
    Dish { name: "Ramen", emoji: "🍜", required: [4, 5, 6] },
    Dish { name: "Pasta Carbonara", emoji: "🍝", required: [7, 6, 8] },
    Dish { name: "Pizza", emoji: "🍕", required: [9, 8, 10] },
    Dish { name: "Risotto", emoji: "🍚", required: [1, 5, 11] },
    Dish { name: "Paella", emoji: "🥘", required: [1, 12, 13] },
    Dish { name: "Tacos", emoji: "🌮", required: [14, 15, 16] },
    Dish { name: "Curry", emoji: "🍛", required: [1, 17, 18] },
    Dish { name: "Fondue", emoji: "🧀", required: [8, 19, 11] },
    Dish { name: "Sopa de Mariscos", emoji: "🦞", required: [5, 13, 18] },
];

fn ingredient(id: u32) -> Option<Ingredient> {
    INGREDIENTS.iter().copied().find(|i| i.id == id)
}

#[derive(Debug, Clone, Serialize)]
pub struct DinnerView {
    pub dish_index: usize,
    pub dish_count: usize,
    pub dish: &'static str,
    pub emoji: &'static str,
    pub time_left: u32,
    pub offered: Vec<Ingredient>,
    pub picked: Vec<u32>,
    /// Filled in once the round is lost so the right answer can be shown.
    pub answer: Option<Vec<&'static str>>,
}

#[derive(Debug, Clone, Copy)]
enum Tick {
    Second,
    NextDish,
}

/// Pick the three ingredients of each dish before its countdown runs out.
#[derive(Debug)]
pub struct DinnerGame {
    rng: ChaCha8Rng,
    scheduler: Scheduler<Tick>,
    countdown: Option<TimerHandle>,
    dishes: Vec<&'static Dish>,
    current: usize,
    offered: Vec<u32>,
    picked: Vec<u32>,
    time_left: u32,
    prize: u32,
    outcome: Option<Outcome>,
}

impl DinnerGame {
    pub fn new(mut rng: ChaCha8Rng, prize: u32) -> Self {
        let dishes = DISHES
            .choose_multiple(&mut rng, DISHES_PER_ROUND)
            .collect();
        let mut game = Self {
            rng,
            scheduler: Scheduler::new(),
            countdown: None,
            dishes,
            current: 0,
            offered: Vec::new(),
            picked: Vec::new(),
            time_left: SECONDS_PER_DISH,
            prize,
            outcome: None,
        };
        game.set_table();
        game
    }

    pub(super) fn apply(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Pick { ingredient } => self.pick(ingredient),
            GameAction::Advance { ms } => Ok(self.advance(ms)),
            _ => Err(GameError::WrongGame),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn view(&self) -> DinnerView {
        let dish = self.dish();
        DinnerView {
            dish_index: self.current,
            dish_count: self.dishes.len(),
            dish: dish.name,
            emoji: dish.emoji,
            time_left: self.time_left,
            offered: self.offered.iter().filter_map(|&id| ingredient(id)).collect(),
            picked: self.picked.clone(),
            answer: matches!(self.outcome, Some(Outcome::Lost)).then(|| {
                dish.required
                    .iter()
                    .filter_map(|&id| ingredient(id).map(|i| i.name))
                    .collect()
            }),
        }
    }

    fn dish(&self) -> &'static Dish {
        self.dishes[self.current]
    }

    /// Lays out the current dish's ingredients among random decoys and
    /// restarts the countdown.
    fn set_table(&mut self) {
        let required = self.dish().required;
        let decoys: Vec<u32> = INGREDIENTS
            .iter()
            .map(|i| i.id)
            .filter(|id| !required.contains(id))
            .collect();

        let mut offered = required.to_vec();
        offered.extend(
            decoys.choose_multiple(&mut self.rng, INGREDIENTS_OFFERED - required.len()),
        );
        offered.shuffle(&mut self.rng);

        self.offered = offered;
        self.picked.clear();
        self.time_left = SECONDS_PER_DISH;
        if let Some(countdown) = self.countdown.take() {
            self.scheduler.cancel(&countdown);
        }
        self.countdown = Some(self.scheduler.every(1000, Tick::Second));
    }

    fn pick(&mut self, id: u32) -> Result<Vec<GameEvent>, GameError> {
        if self.picked.len() >= INGREDIENTS_TO_PICK {
            return Err(GameError::SelectionClosed);
        }
        if !self.offered.contains(&id) {
            return Err(GameError::IngredientNotOffered);
        }
        if self.picked.contains(&id) {
            return Err(GameError::AlreadyPicked);
        }

        self.picked.push(id);
        let mut events = vec![GameEvent::IngredientPicked { ingredient: id }];
        if self.picked.len() < INGREDIENTS_TO_PICK {
            return Ok(events);
        }

        if let Some(countdown) = self.countdown.take() {
            self.scheduler.cancel(&countdown);
        }
        let correct = self.dish().required.iter().all(|id| self.picked.contains(id));
        if !correct {
            self.finish(Outcome::Lost, &mut events);
            return Ok(events);
        }

        events.push(GameEvent::DishServed {
            index: self.current,
        });
        if self.current + 1 == self.dishes.len() {
            self.finish(Outcome::Won { points: self.prize }, &mut events);
        } else {
            self.scheduler.after(NEXT_DISH_DELAY_MS, Tick::NextDish);
        }
        Ok(events)
    }

    fn advance(&mut self, ms: u64) -> Vec<GameEvent> {
        let until = self.scheduler.now_ms().saturating_add(ms);
        let mut events = Vec::new();
        while self.outcome.is_none() {
            let Some(tick) = self.scheduler.poll_until(until) else {
                break;
            };
            match tick {
                Tick::Second => {
                    self.time_left = self.time_left.saturating_sub(1);
                    events.push(GameEvent::Clock {
                        time_left: self.time_left,
                    });
                    if self.time_left == 0 {
                        self.finish(Outcome::Lost, &mut events);
                    }
                }
                Tick::NextDish => {
                    self.current += 1;
                    self.set_table();
                    events.push(GameEvent::NextDish {
                        index: self.current,
                    });
                }
            }
        }
        events
    }

    fn finish(&mut self, outcome: Outcome, events: &mut Vec<GameEvent>) {
        self.outcome = Some(outcome);
        self.scheduler.cancel_all();
        events.push(GameEvent::GameFinished { outcome });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn game() -> DinnerGame {
        DinnerGame::new(ChaCha8Rng::seed_from_u64(12), 250)
    }

    fn serve(game: &mut DinnerGame) -> Vec<GameEvent> {
        let mut events = Vec::new();
        for id in game.dish().required {
            events.extend(game.pick(id).unwrap());
        }
        events
    }

    fn decoy(game: &DinnerGame) -> u32 {
        game.offered
            .iter()
            .copied()
            .find(|id| !game.dish().required.contains(id))
            .unwrap()
    }

    #[test]
    fn every_dish_uses_known_ingredients() {
        for dish in &DISHES {
            assert!(dish.required.iter().all(|&id| ingredient(id).is_some()), "{}", dish.name);
        }
    }

    #[test]
    fn table_offers_the_recipe_among_decoys() {
        let game = game();
        assert_eq!(game.dishes.len(), 5);
        assert_eq!(game.offered.len(), 6);
        assert!(game.dish().required.iter().all(|id| game.offered.contains(id)));

        let mut unique = game.offered.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn picks_are_validated() {
        let mut game = game();
        let missing = INGREDIENTS
            .iter()
            .map(|i| i.id)
            .find(|id| !game.offered.contains(id))
            .unwrap();
        assert_eq!(game.pick(missing).unwrap_err(), GameError::IngredientNotOffered);

        let first = game.dish().required[0];
        game.pick(first).unwrap();
        assert_eq!(game.pick(first).unwrap_err(), GameError::AlreadyPicked);
    }

    #[test]
    fn correct_dish_moves_on_after_a_pause() {
        let mut game = game();
        let events = serve(&mut game);
        assert_eq!(events.last(), Some(&GameEvent::DishServed { index: 0 }));
        assert_eq!(game.pick(game.offered[0]).unwrap_err(), GameError::SelectionClosed);

        // The countdown is stopped while waiting for the next dish.
        let events = game.advance(1000);
        assert_eq!(events, vec![GameEvent::NextDish { index: 1 }]);
        assert_eq!(game.time_left, 5);
        assert!(game.picked.is_empty());
    }

    #[test]
    fn wrong_ingredient_loses_and_shows_the_answer() {
        let mut game = game();
        let required = game.dish().required;
        game.pick(required[0]).unwrap();
        game.pick(required[1]).unwrap();
        let events = game.pick(decoy(&game)).unwrap();

        assert_eq!(
            events.last(),
            Some(&GameEvent::GameFinished {
                outcome: Outcome::Lost
            })
        );
        assert_eq!(game.view().answer.map(|a| a.len()), Some(3));
    }

    #[test]
    fn countdown_expiry_loses() {
        let mut game = game();
        game.advance(4999);
        assert_eq!(game.outcome(), None);
        assert_eq!(game.time_left, 1);
        game.advance(1);
        assert_eq!(game.outcome(), Some(Outcome::Lost));
    }

    #[test]
    fn five_correct_dishes_win_the_prize() {
        let mut game = game();
        for _ in 0..4 {
            serve(&mut game);
            game.advance(NEXT_DISH_DELAY_MS);
        }
        let events = serve(&mut game);

        assert_eq!(game.current, 4);
        assert_eq!(
            events.last(),
            Some(&GameEvent::GameFinished {
                outcome: Outcome::Won { points: 250 }
            })
        );
        assert!(game.view().answer.is_none());
    }
}

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::{GameAction, GameError, GameEvent, Outcome};
use crate::scheduler::Scheduler;

const GAME_SECONDS: u32 = 30;
const SPAWN_MS: u64 = 1000;
const STEP_MS: u64 = 50;
const ANT_STEP: f32 = 0.5;
const POINTS_PER_SECOND: i64 = 10;
const TAP_BONUS: i64 = 5;
const BITE_PENALTY: i64 = 50;
const BITES_PER_SNACK: u32 = 3;
const CENTRE: f32 = 50.0;
const SNACKS: [&str; 6] = ["🍎", "🍏", "🍌", "🥪", "🥗", "🧃"];

/// Coordinates are percentages of the blanket; the food sits in the centre.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Ant {
    pub id: u64,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PicnicView {
    pub score: i64,
    pub time_left: u32,
    pub snacks: Vec<&'static str>,
    pub ants: Vec<Ant>,
}

#[derive(Debug, Clone, Copy)]
enum Tick {
    Spawn,
    Step,
    Second,
}

#[derive(Debug)]
pub struct PicnicGame {
    rng: ChaCha8Rng,
    scheduler: Scheduler<Tick>,
    ants: Vec<Ant>,
    next_id: u64,
    score: i64,
    time_left: u32,
    snacks_left: usize,
    bites: u32,
    finished: bool,
}

impl PicnicGame {
    pub fn new(rng: ChaCha8Rng) -> Self {
        let mut scheduler = Scheduler::new();
        scheduler.every(STEP_MS, Tick::Step);
        scheduler.every(SPAWN_MS, Tick::Spawn);
        scheduler.every(1000, Tick::Second);
        Self {
            rng,
            scheduler,
            ants: Vec::new(),
            next_id: 1,
            score: 0,
            time_left: GAME_SECONDS,
            snacks_left: SNACKS.len(),
            bites: 0,
            finished: false,
        }
    }

    pub(super) fn apply(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Advance { ms } => Ok(self.advance(ms)),
            GameAction::Tap { target } => self.tap(target),
            _ => Err(GameError::WrongGame),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.finished.then(|| Outcome::from_score(self.score))
    }

    pub fn view(&self) -> PicnicView {
        PicnicView {
            score: self.score,
            time_left: self.time_left,
            snacks: SNACKS[..self.snacks_left].to_vec(),
            ants: self.ants.clone(),
        }
    }

    fn advance(&mut self, ms: u64) -> Vec<GameEvent> {
        let until = self.scheduler.now_ms().saturating_add(ms);
        let mut events = Vec::new();
        while !self.finished {
            let Some(tick) = self.scheduler.poll_until(until) else {
                break;
            };
            match tick {
                Tick::Spawn => self.spawn(&mut events),
                Tick::Step => self.step(&mut events),
                Tick::Second => {
                    self.time_left = self.time_left.saturating_sub(1);
                    events.push(GameEvent::Clock {
                        time_left: self.time_left,
                    });
                    if self.time_left == 0 {
                        self.finish(&mut events);
                    } else {
                        self.score += POINTS_PER_SECOND;
                    }
                }
            }
        }
        events
    }

    fn spawn(&mut self, events: &mut Vec<GameEvent>) {
        let along = self.rng.gen_range(0.0..100.0);
        let (x, y) = match self.rng.gen_range(0..4) {
            0 => (along, 0.0),
            1 => (100.0, along),
            2 => (along, 100.0),
            _ => (0.0, along),
        };
        let id = self.next_id;
        self.next_id += 1;
        self.ants.push(Ant { id, x, y });
        events.push(GameEvent::Spawned { target: id });
    }

    fn step(&mut self, events: &mut Vec<GameEvent>) {
        let mut arrived = 0;
        self.ants.retain_mut(|ant| {
            let dx = CENTRE - ant.x;
            let dy = CENTRE - ant.y;
            let distance = dx.hypot(dy);
            if distance < ANT_STEP {
                arrived += 1;
                return false;
            }
            let ratio = ANT_STEP / distance;
            ant.x += dx * ratio;
            ant.y += dy * ratio;
            true
        });

        for _ in 0..arrived {
            self.bites += 1;
            self.score = (self.score - BITE_PENALTY).max(0);
            if self.bites % BITES_PER_SNACK == 0 && self.snacks_left > 0 {
                self.snacks_left -= 1;
                events.push(GameEvent::SnackEaten {
                    remaining: self.snacks_left,
                });
            }
        }

        if self.snacks_left == 0 {
            self.finish(events);
        }
    }

    fn finish(&mut self, events: &mut Vec<GameEvent>) {
        self.finished = true;
        self.scheduler.cancel_all();
        self.ants.clear();
        events.push(GameEvent::GameFinished {
            outcome: Outcome::from_score(self.score),
        });
    }

    fn tap(&mut self, target: u64) -> Result<Vec<GameEvent>, GameError> {
        let index = self
            .ants
            .iter()
            .position(|a| a.id == target)
            .ok_or(GameError::TargetNotFound)?;
        self.ants.remove(index);
        self.score += TAP_BONUS;
        Ok(vec![GameEvent::Scored {
            delta: TAP_BONUS,
            score: self.score,
        }])
    }
}

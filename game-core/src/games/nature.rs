use std::f32::consts::{PI, TAU};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::{GameAction, GameError, GameEvent, Outcome};
use crate::scheduler::Scheduler;

const FIELD: f32 = 400.0;
const GAME_SECONDS: u32 = 30;
const SPAWN_MS: u64 = 1000;
const FRAME_MS: u64 = 16;
const CATCH_RADIUS: f32 = 30.0;
const WANDER_CHANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CreatureKind {
    Butterfly,
    Blossom,
    Rainbow,
    Bee,
    Ladybug,
    Caterpillar,
}

impl CreatureKind {
    /// Butterflies are listed twice so they show up more often.
    const SPAWN_TABLE: [CreatureKind; 7] = [
        CreatureKind::Butterfly,
        CreatureKind::Butterfly,
        CreatureKind::Blossom,
        CreatureKind::Rainbow,
        CreatureKind::Bee,
        CreatureKind::Ladybug,
        CreatureKind::Caterpillar,
    ];

    pub fn points(self) -> i64 {
        match self {
            CreatureKind::Butterfly => 10,
            CreatureKind::Blossom => 15,
            CreatureKind::Rainbow => 30,
            CreatureKind::Bee | CreatureKind::Ladybug | CreatureKind::Caterpillar => -10,
        }
    }
}

/// Position in field pixels; `speed` is pixels per frame.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Creature {
    pub id: u64,
    pub kind: CreatureKind,
    pub x: f32,
    pub y: f32,
    pub speed: f32,
    pub heading: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct NatureView {
    pub score: i64,
    pub time_left: u32,
    pub creatures: Vec<Creature>,
}

#[derive(Debug, Clone, Copy)]
enum Tick {
    Frame,
    Spawn,
    Second,
}

#[derive(Debug)]
pub struct NatureGame {
    rng: ChaCha8Rng,
    scheduler: Scheduler<Tick>,
    creatures: Vec<Creature>,
    next_id: u64,
    score: i64,
    time_left: u32,
    finished: bool,
}

impl NatureGame {
    pub fn new(rng: ChaCha8Rng) -> Self {
        let mut scheduler = Scheduler::new();
        scheduler.every(FRAME_MS, Tick::Frame);
        scheduler.every(SPAWN_MS, Tick::Spawn);
        scheduler.every(1000, Tick::Second);
        let mut game = Self {
            rng,
            scheduler,
            creatures: Vec::new(),
            next_id: 1,
            score: 0,
            time_left: GAME_SECONDS,
            finished: false,
        };
        game.spawn();
        game
    }

    pub(super) fn apply(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Advance { ms } => Ok(self.advance(ms)),
            GameAction::TapAt { x, y } => Ok(self.catch_at(x, y)),
            _ => Err(GameError::WrongGame),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.finished.then(|| Outcome::from_score(self.score))
    }

    pub fn view(&self) -> NatureView {
        NatureView {
            score: self.score,
            time_left: self.time_left,
            creatures: self.creatures.clone(),
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
                Tick::Frame => self.move_creatures(),
                Tick::Spawn => {
                    let id = self.spawn();
                    events.push(GameEvent::Spawned { target: id });
                }
                Tick::Second => {
                    self.time_left = self.time_left.saturating_sub(1);
                    events.push(GameEvent::Clock {
                        time_left: self.time_left,
                    });
                    if self.time_left == 0 {
                        self.finished = true;
                        self.scheduler.cancel_all();
                        events.push(GameEvent::GameFinished {
                            outcome: Outcome::from_score(self.score),
                        });
                    }
                }
            }
        }
        events
    }

    fn spawn(&mut self) -> u64 {
        let table = CreatureKind::SPAWN_TABLE;
        let kind = table[self.rng.gen_range(0..table.len())];
        let id = self.next_id;
        self.next_id += 1;
        self.creatures.push(Creature {
            id,
            kind,
            x: self.rng.gen_range(0.0..FIELD),
            y: self.rng.gen_range(0.0..FIELD),
            speed: self.rng.gen_range(1.0..3.0),
            heading: self.rng.gen_range(0.0..TAU),
        });
        id
    }

    fn move_creatures(&mut self) {
        for creature in &mut self.creatures {
            if self.rng.gen_bool(WANDER_CHANCE) {
                creature.heading += self.rng.gen_range(-0.25..0.25);
            }
            creature.x += creature.heading.cos() * creature.speed;
            creature.y += creature.heading.sin() * creature.speed;
            bounce(creature);
        }
    }

    /// Catches the nearest creature within reach of the tap.
    fn catch_at(&mut self, x: f32, y: f32) -> Vec<GameEvent> {
        let nearest = self
            .creatures
            .iter()
            .enumerate()
            .map(|(index, c)| (index, (c.x - x).hypot(c.y - y)))
            .filter(|(_, distance)| *distance <= CATCH_RADIUS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index);

        let Some(index) = nearest else {
            return vec![GameEvent::Missed];
        };
        let caught = self.creatures.remove(index);
        let delta = caught.kind.points();
        self.score += delta;
        vec![GameEvent::Scored {
            delta,
            score: self.score,
        }]
    }
}

fn bounce(creature: &mut Creature) {
    if creature.x < 0.0 {
        creature.x = 0.0;
        creature.heading = PI - creature.heading;
    } else if creature.x > FIELD {
        creature.x = FIELD;
        creature.heading = PI - creature.heading;
    }

    if creature.y < 0.0 {
        creature.y = 0.0;
        creature.heading = -creature.heading;
    } else if creature.y > FIELD {
        creature.y = FIELD;
        creature.heading = -creature.heading;
    }
}

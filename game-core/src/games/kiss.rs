use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use super::{GameAction, GameError, GameEvent, Outcome};
use crate::scheduler::{Scheduler, TimerHandle};

const GAME_SECONDS: u32 = 45;
const INITIAL_SPAWN_MS: u64 = 3500;
const MIN_SPAWN_MS: u64 = 1000;
const INITIAL_VANISH_MS: u64 = 4000;
const MIN_VANISH_MS: u64 = 500;
const VANISH_JITTER_MS: u64 = 300;
const SPEEDUP_EVERY_SECONDS: u32 = 5;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum KissKind {
    Smooch,
    Lips,
    Heart,
    Oops,
    Ghost,
    Present,
}

impl KissKind {
    const ALL: [KissKind; 6] = [
        KissKind::Smooch,
        KissKind::Lips,
        KissKind::Heart,
        KissKind::Oops,
        KissKind::Ghost,
        KissKind::Present,
    ];

    /// Spawn weight out of 100.
    fn weight(self) -> u32 {
        match self {
            KissKind::Smooch => 15,
            KissKind::Lips => 20,
            KissKind::Heart => 25,
            KissKind::Oops => 15,
            KissKind::Ghost => 15,
            KissKind::Present => 10,
        }
    }

    pub fn points(self) -> i64 {
        match self {
            KissKind::Smooch => 100,
            KissKind::Lips => 200,
            KissKind::Heart => 300,
            KissKind::Oops => -100,
            KissKind::Ghost => -200,
            KissKind::Present => 1000,
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            KissKind::Smooch => "😘",
            KissKind::Lips => "💋",
            KissKind::Heart => "❤️",
            KissKind::Oops => "🫢",
            KissKind::Ghost => "👻",
            KissKind::Present => "💝",
        }
    }

    fn roll(rng: &mut impl Rng) -> Self {
        let mut roll = rng.gen_range(0..100);
        for kind in Self::ALL {
            if roll < kind.weight() {
                return kind;
            }
            roll -= kind.weight();
        }
        KissKind::Present
    }
}

/// Position is a percentage of the play area.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct KissTarget {
    pub id: u64,
    pub kind: KissKind,
    pub emoji: &'static str,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct KissView {
    pub score: i64,
    pub time_left: u32,
    pub targets: Vec<KissTarget>,
}

#[derive(Debug, Clone, Copy)]
enum Tick {
    Spawn,
    Second,
    Vanish(u64),
}

/// Timed tap-catch: emojis pop up faster and linger less as the clock runs down.
#[derive(Debug)]
pub struct KissGame {
    rng: ChaCha8Rng,
    scheduler: Scheduler<Tick>,
    spawn_timer: TimerHandle,
    spawn_ms: u64,
    vanish_ms: u64,
    targets: Vec<KissTarget>,
    next_id: u64,
    score: i64,
    time_left: u32,
    finished: bool,
}

impl KissGame {
    pub fn new(rng: ChaCha8Rng) -> Self {
        let mut scheduler = Scheduler::new();
        let spawn_timer = scheduler.every(INITIAL_SPAWN_MS, Tick::Spawn);
        scheduler.every(1000, Tick::Second);
        Self {
            rng,
            scheduler,
            spawn_timer,
            spawn_ms: INITIAL_SPAWN_MS,
            vanish_ms: INITIAL_VANISH_MS,
            targets: Vec::new(),
            next_id: 1,
            score: 0,
            time_left: GAME_SECONDS,
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

    pub fn view(&self) -> KissView {
        KissView {
            score: self.score,
            time_left: self.time_left,
            targets: self.targets.clone(),
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
                Tick::Vanish(id) => {
                    let before = self.targets.len();
                    self.targets.retain(|t| t.id != id);
                    if self.targets.len() != before {
                        events.push(GameEvent::Vanished { target: id });
                    }
                }
                Tick::Second => self.second(&mut events),
            }
        }
        events
    }

    fn spawn(&mut self, events: &mut Vec<GameEvent>) {
        let kind = KissKind::roll(&mut self.rng);
        let id = self.next_id;
        self.next_id += 1;
        self.targets.push(KissTarget {
            id,
            kind,
            emoji: kind.emoji(),
            x: self.rng.gen_range(10.0..90.0),
            y: self.rng.gen_range(10.0..90.0),
        });

        let linger = (self.vanish_ms * 9 / 10 + self.rng.gen_range(0..VANISH_JITTER_MS)).max(MIN_VANISH_MS);
        self.scheduler.after(linger, Tick::Vanish(id));
        events.push(GameEvent::Spawned { target: id });
    }

    fn second(&mut self, events: &mut Vec<GameEvent>) {
        self.time_left = self.time_left.saturating_sub(1);
        events.push(GameEvent::Clock {
            time_left: self.time_left,
        });

        if self.time_left == 0 {
            self.finished = true;
            self.scheduler.cancel_all();
            self.targets.clear();
            events.push(GameEvent::GameFinished {
                outcome: Outcome::from_score(self.score),
            });
            return;
        }

        if self.time_left % SPEEDUP_EVERY_SECONDS == 0 {
            self.spawn_ms = (self.spawn_ms * 4 / 5).max(MIN_SPAWN_MS);
            self.vanish_ms = (self.vanish_ms * 9 / 10).max(MIN_VANISH_MS);
            self.scheduler.reschedule(&self.spawn_timer, self.spawn_ms);
        }
    }

    fn tap(&mut self, target: u64) -> Result<Vec<GameEvent>, GameError> {
        let index = self
            .targets
            .iter()
            .position(|t| t.id == target)
            .ok_or(GameError::TargetNotFound)?;
        let caught = self.targets.remove(index);
        let delta = caught.kind.points();
        self.score += delta;
        Ok(vec![GameEvent::Scored {
            delta,
            score: self.score,
        }])
    }
}

use serde::Serialize;
use tracing::debug;

use super::{GameAction, GameError, GameEvent, Outcome};

pub const CARD_SIZE: usize = 400;
const BRUSH_RADIUS: f32 = 20.0;
const OPAQUE: u8 = 255;
const CLEAR_BELOW: u8 = 128;
const REVEAL_AT: f64 = 90.0;

/// Share of pixels, in percent, whose alpha has dropped below half.
///
/// An empty buffer counts as untouched.
pub fn cleared_percentage(alpha: &[u8]) -> f64 {
    if alpha.is_empty() {
        return 0.0;
    }
    let cleared = alpha.iter().filter(|&&a| a < CLEAR_BELOW).count();
    cleared as f64 * 100.0 / alpha.len() as f64
}

/// Alpha mask over the prize, one byte per pixel, row-major.
#[derive(Debug, Clone)]
pub struct ScratchCard {
    width: usize,
    height: usize,
    alpha: Vec<u8>,
    last: Option<(f32, f32)>,
}

impl ScratchCard {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            alpha: vec![OPAQUE; width * height],
            last: None,
        }
    }

    pub fn alpha(&self) -> &[u8] {
        &self.alpha
    }

    pub fn cleared(&self) -> f64 {
        cleared_percentage(&self.alpha)
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x <= self.width as f32 && y <= self.height as f32
    }

    /// Erases a brush stroke from the previous point of contact to `(x, y)`.
    pub fn scratch(&mut self, x: f32, y: f32) {
        let from = self.last.unwrap_or((x, y));
        self.erase_segment(from, (x, y));
        self.last = Some((x, y));
    }

    /// Lifts the brush; the next scratch starts a new stroke.
    pub fn release(&mut self) {
        self.last = None;
    }

    pub fn clear(&mut self) {
        self.alpha.fill(0);
        self.last = None;
    }

    fn erase_segment(&mut self, (ax, ay): (f32, f32), (bx, by): (f32, f32)) {
        let min_x = clamp_index(ax.min(bx) - BRUSH_RADIUS, self.width);
        let max_x = clamp_index(ax.max(bx) + BRUSH_RADIUS, self.width);
        let min_y = clamp_index(ay.min(by) - BRUSH_RADIUS, self.height);
        let max_y = clamp_index(ay.max(by) + BRUSH_RADIUS, self.height);

        for py in min_y..max_y {
            for px in min_x..max_x {
                let centre = (px as f32 + 0.5, py as f32 + 0.5);
                if distance_to_segment(centre, (ax, ay), (bx, by)) <= BRUSH_RADIUS {
                    self.alpha[py * self.width + px] = 0;
                }
            }
        }
    }
}

fn clamp_index(value: f32, limit: usize) -> usize {
    (value.max(0.0) as usize).min(limit)
}

fn distance_to_segment((px, py): (f32, f32), (ax, ay): (f32, f32), (bx, by): (f32, f32)) -> f32 {
    let (dx, dy) = (bx - ax, by - ay);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq == 0.0 {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / length_sq).clamp(0.0, 1.0)
    };
    (px - (ax + t * dx)).hypot(py - (ay + t * dy))
}

#[derive(Debug, Clone, Serialize)]
pub struct ScratchView {
    pub cleared: f64,
    pub revealed: bool,
    pub prize: u32,
}

/// Scratch-off coupon: the massage is revealed once most of the foil is gone.
#[derive(Debug)]
pub struct ScratchGame {
    card: ScratchCard,
    prize: u32,
    revealed: bool,
}

impl ScratchGame {
    pub fn new(prize: u32) -> Self {
        Self {
            card: ScratchCard::new(CARD_SIZE, CARD_SIZE),
            prize,
            revealed: false,
        }
    }

    pub(super) fn apply(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Scratch { x, y } => self.scratch(x, y),
            GameAction::Release => {
                self.card.release();
                Ok(Vec::new())
            }
            _ => Err(GameError::WrongGame),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.revealed.then_some(Outcome::Won { points: self.prize })
    }

    pub fn view(&self) -> ScratchView {
        ScratchView {
            cleared: self.card.cleared(),
            revealed: self.revealed,
            prize: self.prize,
        }
    }

    fn scratch(&mut self, x: f32, y: f32) -> Result<Vec<GameEvent>, GameError> {
        if !self.card.contains(x, y) {
            return Err(GameError::OutOfBounds);
        }
        self.card.scratch(x, y);
        let cleared = self.card.cleared();
        debug!(cleared, "scratch progress");

        let mut events = vec![GameEvent::ScratchProgress { cleared }];
        if cleared >= REVEAL_AT {
            self.card.clear();
            self.revealed = true;
            events.push(GameEvent::Revealed);
            events.push(GameEvent::GameFinished {
                outcome: Outcome::Won { points: self.prize },
            });
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_counts_mostly_transparent_pixels() {
        assert_eq!(cleared_percentage(&[]), 0.0);
        assert_eq!(cleared_percentage(&[255, 255, 255, 255]), 0.0);
        assert_eq!(cleared_percentage(&[0, 127, 128, 255]), 50.0);
        assert_eq!(cleared_percentage(&[0; 10]), 100.0);
    }

    #[test]
    fn single_touch_clears_a_disc() {
        let mut card = ScratchCard::new(100, 100);
        card.scratch(50.0, 50.0);

        let cleared = card.alpha().iter().filter(|&&a| a == 0).count();
        // Roughly pi * 20^2.
        assert!((1200..1320).contains(&cleared), "{cleared}");
        assert_eq!(card.alpha()[50 * 100 + 50], 0);
        assert_eq!(card.alpha()[0], OPAQUE);
    }

    #[test]
    fn release_breaks_the_stroke() {
        let mut joined = ScratchCard::new(200, 100);
        joined.scratch(10.0, 50.0);
        joined.scratch(190.0, 50.0);

        let mut split = ScratchCard::new(200, 100);
        split.scratch(10.0, 50.0);
        split.release();
        split.scratch(190.0, 50.0);

        assert_eq!(joined.alpha()[50 * 200 + 100], 0);
        assert_eq!(split.alpha()[50 * 200 + 100], OPAQUE);
        assert!(joined.cleared() > split.cleared());
    }

    #[test]
    fn points_off_the_card_are_rejected() {
        let mut game = ScratchGame::new(150);
        assert_eq!(game.scratch(-1.0, 10.0).unwrap_err(), GameError::OutOfBounds);
        assert_eq!(game.scratch(10.0, 401.0).unwrap_err(), GameError::OutOfBounds);
        assert_eq!(game.view().cleared, 0.0);
    }

    #[test]
    fn scratching_most_of_the_card_reveals_the_prize() {
        let mut game = ScratchGame::new(150);
        let mut events = Vec::new();
        for row in 0..10 {
            let y = 20.0 + 40.0 * row as f32;
            events.extend(game.apply(GameAction::Scratch { x: 0.0, y }).unwrap());
            events.extend(game.apply(GameAction::Scratch { x: 400.0, y }).unwrap());
            game.apply(GameAction::Release).unwrap();
            if game.outcome().is_some() {
                break;
            }
        }

        assert_eq!(game.outcome(), Some(Outcome::Won { points: 150 }));
        assert!(events.contains(&GameEvent::Revealed));
        let view = game.view();
        assert!(view.revealed);
        assert_eq!(view.cleared, 100.0);
    }
}

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use super::{GameAction, GameError, GameEvent, Outcome};

const QUESTIONS_PER_ROUND: usize = 5;

#[derive(Debug)]
struct Question {
    id: u32,
    text: &'static str,
    options: [&'static str; 4],
    correct: &'static str,
    /// Optional questions count towards the score but not towards winning.
    optional: bool,
}

static QUESTIONS: [Question; 9] = [
    Question {
        id: 1,
        text: "¿Cuándo fue nuestra primera cita?",
        options: ["13/2/19", "14/2/19", "12/2/19", "15/2/19"],
        correct: "13/2/19",
        optional: false,
    },
    Question {
        id: 2,
        text: "¿Qué película vimos en nuestra primera cita?",
        options: ["Glass", "Split", "Unbreakable", "Signs"],
        correct: "Glass",
        optional: false,
    },
    Question {
        id: 3,
        text: "¿En qué calle quedaba el lugar donde comimos sushi por primera vez?",
        options: ["Olazabal", "Cabildo", "Santa Fe", "Corrientes"],
        correct: "Olazabal",
        optional: false,
    },
    Question {
        id: 4,
        text: "¿Nombre del parque de nuestra segunda cita?",
        options: ["Parque de la costa", "Temaikén", "Parque Centenario", "Parque Sarmiento"],
        correct: "Parque de la costa",
        optional: false,
    },
    Question {
        id: 5,
        text: "¿En qué lugar de Buenos Aires te pedí la mano?",
        options: ["Lujan", "San Isidro", "Tigre", "Pilar"],
        correct: "Lujan",
        optional: false,
    },
    Question {
        id: 6,
        text: "¿Cuántos besos nos hemos dado?",
        options: ["11000", "10000", "12000", "9000"],
        correct: "11000",
        optional: true,
    },
    Question {
        id: 7,
        text: "¿Cuántos sobre nombres que empiezan por 'Mi amor cosita' te he dicho?",
        options: ["33", "30", "35", "40"],
        correct: "33",
        optional: false,
    },
    Question {
        id: 8,
        text: "¿A cuántos lugares hemos ido a cenar?",
        options: ["900", "800", "1000", "700"],
        correct: "900",
        optional: true,
    },
    Question {
        id: 9,
        text: "¿Cuántos kilómetros hemos recorrido juntos? Incluyendo auto y vuelos",
        options: ["50000", "45000", "55000", "60000"],
        correct: "50000",
        optional: true,
    },
];

#[derive(Debug)]
struct Asked {
    question: &'static Question,
    options: Vec<&'static str>,
    correct: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TriviaView {
    pub question_index: usize,
    pub question_count: usize,
    pub question: &'static str,
    pub options: Vec<&'static str>,
    pub optional: bool,
    pub correct_answers: usize,
}

#[derive(Debug)]
pub struct Trivia {
    asked: Vec<Asked>,
    current: usize,
    prize: u32,
    outcome: Option<Outcome>,
}

impl Trivia {
    pub fn new(rng: &mut impl Rng, prize: u32) -> Self {
        let picked: Vec<&'static Question> =
            QUESTIONS.choose_multiple(rng, QUESTIONS_PER_ROUND).collect();
        let asked = picked
            .into_iter()
            .map(|question| {
                let mut options = question.options.to_vec();
                options.shuffle(rng);
                Asked {
                    question,
                    options,
                    correct: None,
                }
            })
            .collect();
        Self::with_round(asked, prize)
    }

    fn with_round(asked: Vec<Asked>, prize: u32) -> Self {
        Self {
            asked,
            current: 0,
            prize,
            outcome: None,
        }
    }

    pub(super) fn apply(&mut self, action: GameAction) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::Answer { option } => self.answer(option),
            _ => Err(GameError::WrongGame),
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn view(&self) -> TriviaView {
        // Once finished the last question stays on screen.
        let shown = &self.asked[self.current.min(self.asked.len() - 1)];
        TriviaView {
            question_index: self.current,
            question_count: self.asked.len(),
            question: shown.question.text,
            options: shown.options.clone(),
            optional: shown.question.optional,
            correct_answers: self.asked.iter().filter(|a| a.correct == Some(true)).count(),
        }
    }

    fn answer(&mut self, option: usize) -> Result<Vec<GameEvent>, GameError> {
        let asked = &mut self.asked[self.current];
        let chosen = *asked.options.get(option).ok_or(GameError::OptionOutOfRange)?;
        let correct = chosen == asked.question.correct;
        asked.correct = Some(correct);

        let mut events = vec![GameEvent::Answered {
            question: asked.question.id,
            correct,
        }];

        self.current += 1;
        if self.current == self.asked.len() {
            let won = self
                .asked
                .iter()
                .filter(|a| !a.question.optional)
                .all(|a| a.correct == Some(true));
            let outcome = if won {
                Outcome::Won { points: self.prize }
            } else {
                Outcome::Lost
            };
            self.outcome = Some(outcome);
            events.push(GameEvent::GameFinished { outcome });
        }
        Ok(events)
    }
}

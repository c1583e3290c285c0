//! Quiz mode: find the country on the map.
//!
//! [`QuizController`] is the single owner of the current selection and of
//! the quiz state; the view reads both through it.

use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::catalog::Region;

/// Message shown on the quiz prompt line
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feedback {
    Find(String),
    Correct,
    TryAgain,
    PoolEmpty,
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feedback::Find(name) => write!(f, "Find: {name}"),
            Feedback::Correct => f.write_str("✅ Correct!"),
            Feedback::TryAgain => f.write_str("❌ Not that one. Try again…"),
            Feedback::PoolEmpty => f.write_str("No countries with a playable song yet"),
        }
    }
}

/// How a click was interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Quiz inactive: just show the region
    Plain,
    Correct,
    Miss,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuizState {
    pub active: bool,
    pub target: Option<Region>,
    pub revealed: bool,
    pub score: u32,
    pub question_number: u32,
    /// Regions eligible as targets (those with a playable track)
    pub pool: Vec<Region>,
}

pub struct QuizController<R = StdRng> {
    state: QuizState,
    selected: Option<Region>,
    feedback: Option<Feedback>,
    rng: R,
}

impl QuizController<StdRng> {
    pub fn new(pool: Vec<Region>) -> Self {
        Self::with_rng(pool, StdRng::from_entropy())
    }
}

impl<R: Rng> QuizController<R> {
    pub fn with_rng(pool: Vec<Region>, rng: R) -> Self {
        Self {
            state: QuizState {
                pool,
                ..QuizState::default()
            },
            selected: None,
            feedback: None,
            rng,
        }
    }

    pub fn state(&self) -> &QuizState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn selected(&self) -> Option<&Region> {
        self.selected.as_ref()
    }

    pub fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// Target whose song may be played as a clue: set, and not yet revealed
    pub fn clue(&self) -> Option<&Region> {
        self.state
            .target
            .as_ref()
            .filter(|_| self.state.active && !self.state.revealed)
    }

    /// Code of the answer to highlight, once revealed
    pub fn revealed_code(&self) -> Option<&str> {
        self.state
            .target
            .as_ref()
            .filter(|_| self.state.revealed)
            .map(|r| r.code.as_str())
    }

    fn draw(&mut self) -> Option<Region> {
        self.state.pool.choose(&mut self.rng).cloned()
    }

    /// Begin a quiz at question 1. Returns false (and says why) on an empty pool.
    pub fn start(&mut self) -> bool {
        let Some(target) = self.draw() else {
            info!("quiz not started: pool is empty");
            self.feedback = Some(Feedback::PoolEmpty);
            return false;
        };

        info!(pool = self.state.pool.len(), "quiz started");
        debug!(target = %target.code, "quiz target");
        self.feedback = Some(Feedback::Find(target.name.clone()));
        self.state.active = true;
        self.state.target = Some(target);
        self.state.revealed = false;
        self.state.score = 0;
        self.state.question_number = 1;
        self.selected = None;
        true
    }

    /// Draw another target. Immediate repeats are possible. No-op outside a quiz.
    pub fn next(&mut self) {
        if !self.state.active {
            return;
        }
        let Some(target) = self.draw() else {
            return;
        };

        debug!(target = %target.code, question = self.state.question_number + 1, "next question");
        self.feedback = Some(Feedback::Find(target.name.clone()));
        self.state.target = Some(target);
        self.state.revealed = false;
        self.state.question_number += 1;
        self.selected = None;
    }

    pub fn end(&mut self) {
        info!(
            score = self.state.score,
            questions = self.state.question_number,
            "quiz ended"
        );
        self.state.active = false;
        self.state.target = None;
        self.state.revealed = false;
        self.state.score = 0;
        self.state.question_number = 0;
        self.feedback = None;
    }

    pub fn reveal(&mut self) {
        if self.state.target.is_some() {
            self.state.revealed = true;
        }
    }

    /// A region was clicked. Always becomes the displayed selection;
    /// in a quiz it is also checked against the target.
    pub fn submit_selection(&mut self, region: Region) -> SelectionOutcome {
        let outcome = match (&self.state.target, self.state.active) {
            (Some(target), true) if target.code == region.code => {
                self.state.revealed = true;
                self.state.score += 1;
                self.feedback = Some(Feedback::Correct);
                SelectionOutcome::Correct
            }
            (_, true) => {
                self.feedback = Some(Feedback::TryAgain);
                SelectionOutcome::Miss
            }
            (_, false) => SelectionOutcome::Plain,
        };

        debug!(code = %region.code, ?outcome, "selection");
        self.selected = Some(region);
        outcome
    }
}

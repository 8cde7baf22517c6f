//! Level 8: the multiplication riddle
//!
//! The final code is the product of every digit unlocked so far. The player
//! types it in; non-numbers are bounced locally, wrong numbers are signalled.

use crate::error::{Error, Result};
use crate::platform::{Input, SensorHost};

use super::{Level, LevelContext, LevelKind, Reveal, Signal, Step};

/// Product of all symbols, each parsed as an integer
pub fn final_product<S: AsRef<str>>(digits: &[S]) -> Result<u64> {
    digits.iter().try_fold(1u64, |acc, symbol| {
        let symbol = symbol.as_ref();
        let value: u64 = symbol
            .trim()
            .parse()
            .map_err(|_| Error::InvalidInput(format!("digit {:?} is not a number", symbol)))?;
        acc.checked_mul(value).ok_or(Error::DigitOverflow)
    })
}

#[derive(Debug, Default)]
pub struct MultiplyLevel {
    expected: Option<u64>,
    attempts: u32,
    solved: bool,
}

impl MultiplyLevel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expected(&self) -> Option<u64> {
        self.expected
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Level for MultiplyLevel {
    fn kind(&self) -> LevelKind {
        LevelKind::Multiply
    }

    fn start(&mut self, ctx: &mut LevelContext<'_>) -> Result<()> {
        let product = final_product(ctx.digits)?;
        log::debug!("Final code is {} from {:?}", product, ctx.digits);
        self.expected = Some(product);
        self.attempts = 0;
        self.solved = false;
        Ok(())
    }

    fn handle(&mut self, ctx: &mut LevelContext<'_>, input: &Input) -> Step {
        let (Input::Answer(text), Some(expected)) = (input, self.expected) else {
            return Step::Continue;
        };

        let Ok(answer) = text.trim().parse::<i128>() else {
            ctx.signal(Signal::InvalidEntry(text.clone()));
            return Step::Continue;
        };

        self.attempts += 1;
        if answer == expected as i128 {
            log::info!("Final code entered after {} attempt(s)", self.attempts);
            self.solved = true;
            Step::Complete(Reveal::FinalCode(expected.to_string()))
        } else {
            ctx.signal(Signal::WrongAnswer);
            Step::Continue
        }
    }

    fn progress(&self) -> f32 {
        if self.solved { 1.0 } else { 0.0 }
    }

    fn cleanup(&mut self, _host: &mut dyn SensorHost) {}
}

//! Note-name parsing.
//!
//! Names follow a fixed grammar: one of the twelve pitch classes
//! `c c# d d# e f f# g g# a a# h` followed by a single octave digit,
//! e.g. `a4`, `f#2`, `h3`. `e#` and `h#` are rejected.

use std::fmt;
use std::str::FromStr;

use crate::math::step_to_frequency;
use crate::{Error, Result};

const PITCH_CLASSES: [&str; 12] = [
    "c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "h",
];

/// A parsed note name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteName {
    pitch_class: u8,
    octave: u8,
}

impl NoteName {
    /// Build a note from a pitch class (0 = c .. 11 = h) and octave digit.
    pub fn new(pitch_class: u8, octave: u8) -> Result<Self> {
        if pitch_class > 11 || octave > 9 {
            return Err(Error::NoteName(format!("{pitch_class}/{octave}")));
        }
        Ok(Self {
            pitch_class,
            octave,
        })
    }

    /// Pitch class, 0 = c .. 11 = h.
    pub fn pitch_class(self) -> u8 {
        self.pitch_class
    }

    /// Octave digit.
    pub fn octave(self) -> u8 {
        self.octave
    }

    /// Scale step (MIDI note number), with `c4` = 60.
    pub fn note_number(self) -> u8 {
        (self.octave + 1) * 12 + self.pitch_class
    }

    /// Equal-tempered frequency in Hz.
    pub fn frequency(self) -> f64 {
        step_to_frequency(f64::from(self.note_number()))
    }

    /// Note for a scale step, if it is representable with a single octave digit.
    pub fn from_note_number(number: u8) -> Option<Self> {
        let octave = (number / 12).checked_sub(1)?;
        (octave <= 9).then_some(Self {
            pitch_class: number % 12,
            octave,
        })
    }
}

impl FromStr for NoteName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        if !(2..=3).contains(&lower.len()) || !lower.is_ascii() {
            return Err(Error::NoteName(s.to_string()));
        }
        let (name, octave) = lower.split_at(lower.len() - 1);
        let octave: u8 = octave
            .parse()
            .map_err(|_| Error::NoteName(s.to_string()))?;
        let pitch_class = PITCH_CLASSES
            .iter()
            .position(|&pc| pc == name)
            .ok_or_else(|| Error::NoteName(s.to_string()))?;
        Ok(Self {
            pitch_class: pitch_class as u8,
            octave,
        })
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            PITCH_CLASSES[self.pitch_class as usize], self.octave
        )
    }
}

//! Instruments: analysed notes plus synthesis of the missing ones.

use std::collections::BTreeMap;

use resynth_core::{CancellationToken, DspContext, Error, Result, Wave};

use crate::note::{NoteModels, NoteSpan, RenderOptions};
use crate::params::ModelParams;

/// Notes of one instrument keyed by scale step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Instrument {
    notes: BTreeMap<u8, NoteModels>,
}

impl Instrument {
    /// Instrument without notes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyse every span of `wave`.
    ///
    /// Each note gets a context forked from `ctx` with its note number, so
    /// results do not depend on span order.
    pub fn analyze(
        ctx: &DspContext,
        wave: &Wave,
        spans: &[NoteSpan],
        params: &ModelParams,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let mut instrument = Self::new();
        for span in spans {
            cancel.check()?;
            if span.end <= span.start {
                return Err(Error::invalid_parameter(
                    "span",
                    format!("note {} ends before it starts", span.note_number),
                ));
            }
            let samples = wave.mono_range(span.start, span.end);
            let mut note_ctx = ctx.fork(u64::from(span.note_number));
            let models = NoteModels::build(
                &mut note_ctx,
                samples,
                wave.sample_rate(),
                span.note_number,
                params,
                cancel,
            )?;
            instrument.insert(models);
        }
        tracing::info!(notes = instrument.len(), "instrument analysed");
        Ok(instrument)
    }

    /// Add or replace a note.
    pub fn insert(&mut self, models: NoteModels) {
        self.notes.insert(models.note_number(), models);
    }

    /// Analysed note, if present.
    pub fn note(&self, note_number: u8) -> Option<&NoteModels> {
        self.notes.get(&note_number)
    }

    /// Analysed notes in ascending order.
    pub fn notes(&self) -> impl Iterator<Item = &NoteModels> {
        self.notes.values()
    }

    /// Number of analysed notes.
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    /// Whether no note has been analysed.
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Models for `note_number`.
    ///
    /// An analysed note is returned as is. Otherwise the nearest analysed
    /// notes below and above are transposed to `note_number` and blended by
    /// their relative distance in semitones; with a neighbour on one side
    /// only, that neighbour is transposed. Returns `None` for an empty
    /// instrument.
    pub fn generate_note(&self, ctx: &DspContext, note_number: u8) -> Option<NoteModels> {
        if let Some(models) = self.notes.get(&note_number) {
            return Some(models.clone());
        }
        let below = self.notes.range(..note_number).next_back();
        let above = self.notes.range(note_number..).next();
        let shift = |from: u8| i32::from(note_number) - i32::from(from);

        let generated = match (below, above) {
            (Some((&lo, low)), Some((&hi, high))) => {
                let ratio = f32::from(note_number - lo) / f32::from(hi - lo);
                let a = low.transposed(ctx, shift(lo));
                let b = high.transposed(ctx, shift(hi));
                NoteModels::interpolate(ctx, &a, &b, ratio)
            }
            (Some((&n, only)), None) | (None, Some((&n, only))) => only.transposed(ctx, shift(n)),
            (None, None) => return None,
        };
        tracing::debug!(
            note_number,
            below = below.map(|(&n, _)| n),
            above = above.map(|(&n, _)| n),
            "note generated from neighbours"
        );
        Some(generated)
    }

    /// Render `note_number`, generating it if needed.
    pub fn render_note(
        &self,
        ctx: &mut DspContext,
        note_number: u8,
        options: RenderOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Vec<f32>>> {
        match self.generate_note(ctx, note_number) {
            Some(models) => models.render(ctx, options, cancel).map(Some),
            None => Ok(None),
        }
    }
}

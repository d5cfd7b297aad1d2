//! Upload flow state machine backing the single-page frontend.
//!
//! The browser UI in `static/app.js` walks a small state machine: empty until
//! a photo is chosen, selected while one is staged (with an optional preview),
//! and resolved once processing has produced a result. This module is the
//! canonical definition of those transitions; the tests pin the rules the
//! frontend implements:
//!
//! - only `image/*` files can be selected, and selecting clears any prior result
//! - a submission needs a staged file and at most one can be in flight
//! - nothing cancels an in-flight submission: re-selecting or resetting while
//!   one is outstanding keeps the slot occupied, and the response that
//!   eventually lands is dropped rather than shown against the newer state
//! - a preview is cosmetic: submission does not wait for it, and a preview
//!   arriving after a reset is dropped
//! - failure keeps the staged file so the user can retry
//! - reset returns to empty no matter what

use crate::api::models::whiteboard::ProcessingResult;

/// Coarse view of the flow, driving which controls the UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No file staged; show the drop zone
    Empty,
    /// A file is staged (possibly mid-flight); show preview and submit controls
    Selected,
    /// A result is available; show extracted text and summary
    Resolved,
}

/// Metadata of the staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
}

/// State of one whiteboard capture flow.
#[derive(Debug, Default)]
pub struct Capture {
    file: Option<SelectedFile>,
    preview: Option<String>,
    is_processing: bool,
    abandoned: bool,
    result: Option<ProcessingResult>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.result.is_some() {
            Phase::Resolved
        } else if self.file.is_some() {
            Phase::Selected
        } else {
            Phase::Empty
        }
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    pub fn result(&self) -> Option<&ProcessingResult> {
        self.result.as_ref()
    }

    /// Stage a file for processing. Returns false (leaving the state
    /// untouched) for anything that isn't an image.
    ///
    /// Staging a new file discards the previous preview and result. A
    /// submission still in flight is abandoned: its slot stays occupied until
    /// the response lands, and that response is then dropped.
    pub fn select(&mut self, name: &str, media_type: &str) -> bool {
        if !media_type.starts_with("image/") {
            return false;
        }

        // An in-flight request cannot be cancelled; its response just no
        // longer belongs to what is staged.
        if self.is_processing {
            self.abandoned = true;
        }

        self.file = Some(SelectedFile {
            name: name.to_string(),
            media_type: media_type.to_string(),
        });
        self.preview = None;
        self.result = None;
        true
    }

    /// Record the preview data URI once the file reader finishes.
    ///
    /// Readers race with resets: a preview landing after the file was cleared
    /// belongs to a flow that no longer exists and is dropped.
    pub fn preview_loaded(&mut self, data_uri: impl Into<String>) {
        if self.file.is_none() {
            return;
        }
        self.preview = Some(data_uri.into());
    }

    /// Start a submission. Returns false if there is nothing to submit, a
    /// submission is already in flight, or a result is already showing.
    ///
    /// The preview is deliberately not required: it only exists for display.
    pub fn begin_submit(&mut self) -> bool {
        if self.file.is_none() || self.is_processing || self.result.is_some() {
            return false;
        }
        self.is_processing = true;
        true
    }

    /// Complete the in-flight submission with a result.
    ///
    /// The result is recorded only when it still belongs to the staged file:
    /// a response landing after a reset or a re-selection is dropped, and the
    /// slot is freed for the next submission.
    pub fn resolve(&mut self, result: ProcessingResult) {
        if !self.is_processing {
            return;
        }
        self.is_processing = false;
        if self.abandoned {
            self.abandoned = false;
            return;
        }
        self.result = Some(result);
    }

    /// Complete the in-flight submission with a failure. The staged file and
    /// preview are kept so the user can retry.
    pub fn fail(&mut self) {
        if !self.is_processing {
            return;
        }
        self.is_processing = false;
        self.abandoned = false;
    }

    /// Return to the empty state, clearing everything. An outstanding
    /// submission keeps its slot until its response lands and is dropped.
    pub fn reset(&mut self) {
        let in_flight = self.is_processing;
        *self = Self::default();
        self.is_processing = in_flight;
        self.abandoned = in_flight;
    }
}

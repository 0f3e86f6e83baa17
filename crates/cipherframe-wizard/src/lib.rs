#![warn(missing_docs)]
//! # cipherframe-wizard
//!
//! ## Purpose
//! Drives the two-page input wizard that collects a cryptographic job.
//!
//! ## Responsibilities
//! - Own per-field [`FieldState`] for the primary (videos, output directory)
//!   and secondary (password, key) pages.
//! - Re-validate eagerly on value change and blur, and on demand through
//!   [`Wizard::force_validate`].
//! - Gate page advance on required-field validity and assemble the final
//!   [`JobRequest`] on submit.
//! - Resolve concurrent validations per field with last-write-wins.
//!
//! ## Data flow
//! UI event -> [`Wizard::set_value`] / [`Wizard::blur`] -> [`ValidationTicket`]
//! -> [`ValidationTicket::run`] against the injected [`PathProbe`] ->
//! [`Wizard::apply`] -> [`Wizard::submit_page`] -> [`PageTransition`].
//!
//! ## Ownership and lifetimes
//! The wizard owns all field values. Tickets carry an owned copy of the value
//! they validate, so they can run while the wizard keeps receiving input.
//!
//! ## Error model
//! Invalid pages surface as [`WizardError::PageInvalid`] with the offending
//! fields; field reasons stay inline in [`FieldState::message`].
//!
//! ## Security and privacy notes
//! The password lives only in the password field and the assembled request.
//! It is never logged; tracing output names fields, not values.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cipherframe_core::{Algorithm, CoreError, JobKind, JobRequest};
use cipherframe_validate::{
    FieldVerdict, PathProbe, split_paths, validate_path, validate_password_field, validate_paths,
};
use futures_util::future::join_all;
use thiserror::Error;
use tracing::debug;

/// Wizard page holding a group of fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WizardPage {
    /// Input videos and output directory.
    Primary,
    /// Password and key location.
    Secondary,
}

/// Input field identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    /// Input video paths, one per line.
    InputPaths,
    /// Output directory (optional).
    OutputDir,
    /// Password.
    Password,
    /// Key output directory (encrypt) or key file (decrypt).
    KeyPath,
}

impl FieldId {
    /// Every field in display order.
    pub const ALL: [FieldId; 4] = [
        FieldId::InputPaths,
        FieldId::OutputDir,
        FieldId::Password,
        FieldId::KeyPath,
    ];

    /// Page this field belongs to.
    pub fn page(&self) -> WizardPage {
        match self {
            FieldId::InputPaths | FieldId::OutputDir => WizardPage::Primary,
            FieldId::Password | FieldId::KeyPath => WizardPage::Secondary,
        }
    }

    /// Whether the field must hold a value for the given job direction.
    pub fn is_required(&self, kind: JobKind) -> bool {
        match self {
            FieldId::InputPaths | FieldId::Password => true,
            FieldId::OutputDir => false,
            FieldId::KeyPath => kind == JobKind::Decrypt,
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldId::InputPaths => "input videos",
            FieldId::OutputDir => "output directory",
            FieldId::Password => "password",
            FieldId::KeyPath => "key",
        };
        f.write_str(label)
    }
}

/// Wizard lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    /// Collecting the primary page.
    CollectingPrimary,
    /// Collecting the secondary page.
    CollectingSecondary,
    /// Request assembled and handed off.
    Submitted,
}

/// Display state of one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldState {
    /// Current raw value.
    pub value: String,
    /// Last resolved validity.
    pub is_valid: bool,
    /// Inline reason for the last resolved validity; empty when valid.
    pub message: String,
    /// Whether the user left the field at least once (or validation was forced).
    pub touched: bool,
}

impl FieldState {
    fn fresh(required: bool) -> Self {
        Self {
            value: String::new(),
            is_valid: !required,
            message: String::new(),
            touched: false,
        }
    }

    /// Returns `true` when an inline error should be displayed.
    pub fn shows_error(&self) -> bool {
        self.touched && !self.is_valid
    }
}

#[derive(Debug, Clone)]
struct FieldSlot {
    state: FieldState,
    revision: u64,
}

/// Capability for native file/folder pickers.
///
/// `None` means the user cancelled the dialog.
#[async_trait]
pub trait DialogProvider: Send + Sync {
    /// Picks one or more files.
    async fn pick_files(&self) -> Option<Vec<String>>;
    /// Picks a single file.
    async fn pick_file(&self) -> Option<String>;
    /// Picks a folder.
    async fn pick_folder(&self) -> Option<String>;
}

/// Dialog provider that always reports a cancelled dialog.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDialogs;

#[async_trait]
impl DialogProvider for NoDialogs {
    async fn pick_files(&self) -> Option<Vec<String>> {
        None
    }

    async fn pick_file(&self) -> Option<String> {
        None
    }

    async fn pick_folder(&self) -> Option<String> {
        None
    }
}

/// Pending validation of one field value.
///
/// Tickets run independently of the wizard. Applying a ticket whose field has
/// changed since it was issued is a no-op.
#[derive(Debug, Clone)]
pub struct ValidationTicket {
    field: FieldId,
    revision: u64,
    value: String,
    kind: JobKind,
}

impl ValidationTicket {
    /// Field being validated.
    pub fn field(&self) -> FieldId {
        self.field
    }

    /// Runs the validator for this field.
    pub async fn run(self, probe: &dyn PathProbe) -> ValidationOutcome {
        let required = self.field.is_required(self.kind);
        let verdict = match self.field {
            FieldId::InputPaths => validate_paths(&self.value, required, probe).await,
            FieldId::OutputDir | FieldId::KeyPath => {
                validate_path(&self.value, required, probe).await
            }
            FieldId::Password => validate_password_field(self.kind, &self.value),
        };

        ValidationOutcome {
            field: self.field,
            revision: self.revision,
            verdict,
        }
    }
}

/// Resolved validation ready to be applied to the wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Validated field.
    pub field: FieldId,
    /// Field revision the verdict was computed for.
    pub revision: u64,
    /// Validator verdict.
    pub verdict: FieldVerdict,
}

/// Result of a successful [`Wizard::submit_page`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTransition {
    /// Wizard moved to the next page.
    Advanced(WizardState),
    /// Wizard finished; the request is ready for the orchestrator.
    Submitted(JobRequest),
}

/// Explicit finite-state wizard for one job.
pub struct Wizard {
    kind: JobKind,
    algorithm: Algorithm,
    state: WizardState,
    focused: Option<FieldId>,
    fields: BTreeMap<FieldId, FieldSlot>,
    probe: Arc<dyn PathProbe>,
    dialogs: Arc<dyn DialogProvider>,
}

impl Wizard {
    /// Creates a wizard with fresh fields for the given job direction.
    pub fn new(kind: JobKind, probe: Arc<dyn PathProbe>, dialogs: Arc<dyn DialogProvider>) -> Self {
        Self {
            kind,
            algorithm: Algorithm::default(),
            state: WizardState::CollectingPrimary,
            focused: None,
            fields: fresh_fields(kind),
            probe,
            dialogs,
        }
    }

    /// Job direction.
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// Selected algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Selects the algorithm.
    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithm = algorithm;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Page currently shown; `None` once submitted.
    pub fn current_page(&self) -> Option<WizardPage> {
        match self.state {
            WizardState::CollectingPrimary => Some(WizardPage::Primary),
            WizardState::CollectingSecondary => Some(WizardPage::Secondary),
            WizardState::Submitted => None,
        }
    }

    /// Currently focused field.
    pub fn focused(&self) -> Option<FieldId> {
        self.focused
    }

    /// Field state snapshot.
    pub fn field(&self, field: FieldId) -> &FieldState {
        &self.slot(field).state
    }

    /// Fields on the given page, in display order.
    pub fn page_fields(page: WizardPage) -> impl Iterator<Item = FieldId> {
        FieldId::ALL.into_iter().filter(move |field| field.page() == page)
    }

    /// Fields on `page` whose last resolved state is invalid.
    ///
    /// Empty optional fields are always valid, so only required fields and
    /// filled-in optional fields can appear here.
    pub fn invalid_fields(&self, page: WizardPage) -> Vec<FieldId> {
        Self::page_fields(page)
            .filter(|field| !self.field(*field).is_valid)
            .collect()
    }

    /// Records a new value and returns the ticket validating it.
    ///
    /// Any ticket issued earlier for this field becomes stale.
    pub fn set_value(&mut self, field: FieldId, value: impl Into<String>) -> ValidationTicket {
        let slot = self.slot_mut(field);
        slot.state.value = value.into();
        slot.revision += 1;
        self.ticket(field)
    }

    /// Marks the field focused.
    pub fn focus(&mut self, field: FieldId) {
        self.focused = Some(field);
    }

    /// Marks the field touched and returns a ticket re-validating it.
    pub fn blur(&mut self, field: FieldId) -> ValidationTicket {
        if self.focused == Some(field) {
            self.focused = None;
        }
        self.slot_mut(field).state.touched = true;
        self.ticket(field)
    }

    /// Returns a ticket for the field's current value without changing it.
    pub fn ticket(&self, field: FieldId) -> ValidationTicket {
        let slot = self.slot(field);
        ValidationTicket {
            field,
            revision: slot.revision,
            value: slot.state.value.clone(),
            kind: self.kind,
        }
    }

    /// Applies a resolved validation.
    ///
    /// Returns `false` and leaves the field untouched when the outcome is stale.
    pub fn apply(&mut self, outcome: ValidationOutcome) -> bool {
        let slot = self.slot_mut(outcome.field);
        if slot.revision != outcome.revision {
            debug!(field = %outcome.field, "discarding stale validation");
            return false;
        }

        slot.state.is_valid = outcome.verdict.valid;
        slot.state.message = outcome.verdict.message;
        true
    }

    /// Sets a value and validates it immediately.
    pub async fn update(&mut self, field: FieldId, value: impl Into<String>) -> bool {
        let ticket = self.set_value(field, value);
        self.resolve(ticket).await
    }

    /// Blurs a field and validates it immediately.
    pub async fn leave(&mut self, field: FieldId) -> bool {
        let ticket = self.blur(field);
        self.resolve(ticket).await
    }

    /// Validates every field on the current page and marks them touched.
    ///
    /// All validations resolve before the page verdict is computed. Returns
    /// `true` when no required field on the page is invalid.
    pub async fn force_validate(&mut self) -> bool {
        let Some(page) = self.current_page() else {
            return false;
        };

        let tickets: Vec<ValidationTicket> = Self::page_fields(page)
            .map(|field| {
                self.slot_mut(field).state.touched = true;
                self.ticket(field)
            })
            .collect();

        let probe = Arc::clone(&self.probe);
        let outcomes = join_all(tickets.into_iter().map(|ticket| ticket.run(probe.as_ref()))).await;
        for outcome in outcomes {
            self.apply(outcome);
        }

        self.invalid_fields(page).is_empty()
    }

    /// Attempts to leave the current page.
    ///
    /// From the primary page this advances to the secondary page. From the
    /// secondary page this assembles the [`JobRequest`] and enters
    /// [`WizardState::Submitted`].
    ///
    /// # Errors
    /// Returns [`WizardError::PageInvalid`] when any required field on the
    /// page is invalid, and [`WizardError::AlreadySubmitted`] after submission.
    pub async fn submit_page(&mut self) -> Result<PageTransition, WizardError> {
        let Some(page) = self.current_page() else {
            return Err(WizardError::AlreadySubmitted);
        };

        if !self.force_validate().await {
            let fields = self.invalid_fields(page);
            debug!(?page, ?fields, "page blocked by invalid fields");
            return Err(WizardError::PageInvalid { page, fields });
        }

        match page {
            WizardPage::Primary => {
                self.state = WizardState::CollectingSecondary;
                debug!("wizard advanced to secondary page");
                Ok(PageTransition::Advanced(self.state))
            }
            WizardPage::Secondary => {
                let request = self.assemble()?;
                self.state = WizardState::Submitted;
                debug!(kind = %self.kind, "wizard submitted");
                Ok(PageTransition::Submitted(request))
            }
        }
    }

    /// Steps back one page, keeping every entered value.
    ///
    /// From [`WizardState::Submitted`] this reopens the secondary page so the
    /// user can correct the password or key after a failed job.
    pub fn back(&mut self) -> WizardState {
        self.state = match self.state {
            WizardState::CollectingPrimary | WizardState::CollectingSecondary => {
                WizardState::CollectingPrimary
            }
            WizardState::Submitted => WizardState::CollectingSecondary,
        };
        self.state
    }

    /// Discards all values and returns to the first page.
    pub fn reset(&mut self) {
        self.state = WizardState::CollectingPrimary;
        self.focused = None;
        self.algorithm = Algorithm::default();
        self.fields = fresh_fields(self.kind);
    }

    /// Opens the multi-file picker for input videos.
    ///
    /// Returns `false` when the dialog was cancelled; the field is unchanged.
    pub async fn choose_input_files(&mut self) -> bool {
        let dialogs = Arc::clone(&self.dialogs);
        match dialogs.pick_files().await {
            Some(paths) => {
                self.update(FieldId::InputPaths, paths.join("\n")).await;
                true
            }
            None => false,
        }
    }

    /// Opens the folder picker for the output directory.
    pub async fn choose_output_dir(&mut self) -> bool {
        let dialogs = Arc::clone(&self.dialogs);
        match dialogs.pick_folder().await {
            Some(path) => {
                self.update(FieldId::OutputDir, path).await;
                true
            }
            None => false,
        }
    }

    /// Opens the key picker: a folder when encrypting, a file when decrypting.
    pub async fn choose_key_path(&mut self) -> bool {
        let dialogs = Arc::clone(&self.dialogs);
        let picked = match self.kind {
            JobKind::Encrypt => dialogs.pick_folder().await,
            JobKind::Decrypt => dialogs.pick_file().await,
        };
        match picked {
            Some(path) => {
                self.update(FieldId::KeyPath, path).await;
                true
            }
            None => false,
        }
    }

    async fn resolve(&mut self, ticket: ValidationTicket) -> bool {
        let probe = Arc::clone(&self.probe);
        let outcome = ticket.run(probe.as_ref()).await;
        self.apply(outcome)
    }

    fn assemble(&self) -> Result<JobRequest, WizardError> {
        let inputs = split_paths(&self.field(FieldId::InputPaths).value)
            .into_iter()
            .map(str::to_string)
            .collect();

        let request = JobRequest::new(self.kind, self.algorithm, inputs)?
            .with_output_dir(self.field(FieldId::OutputDir).value.clone())
            .with_password(self.field(FieldId::Password).value.clone())
            .with_key_path(self.field(FieldId::KeyPath).value.clone());
        Ok(request)
    }

    fn slot(&self, field: FieldId) -> &FieldSlot {
        // Every FieldId is inserted by fresh_fields and never removed.
        &self.fields[&field]
    }

    fn slot_mut(&mut self, field: FieldId) -> &mut FieldSlot {
        let required = field.is_required(self.kind);
        self.fields.entry(field).or_insert_with(|| FieldSlot {
            state: FieldState::fresh(required),
            revision: 0,
        })
    }
}

impl fmt::Debug for Wizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wizard")
            .field("kind", &self.kind)
            .field("algorithm", &self.algorithm)
            .field("state", &self.state)
            .field("focused", &self.focused)
            .finish_non_exhaustive()
    }
}

fn fresh_fields(kind: JobKind) -> BTreeMap<FieldId, FieldSlot> {
    FieldId::ALL
        .into_iter()
        .map(|field| {
            (
                field,
                FieldSlot {
                    state: FieldState::fresh(field.is_required(kind)),
                    revision: 0,
                },
            )
        })
        .collect()
}

/// Wizard navigation errors.
#[derive(Debug, Error)]
pub enum WizardError {
    /// Required fields on the page are invalid.
    #[error("{page:?} page has invalid fields: {fields:?}")]
    PageInvalid {
        /// Page that could not be left.
        page: WizardPage,
        /// Invalid fields in display order.
        fields: Vec<FieldId>,
    },
    /// The wizard already handed off its request.
    #[error("wizard already submitted")]
    AlreadySubmitted,
    /// Request assembly violated the core model.
    #[error("request assembly failed: {0}")]
    Request(#[from] CoreError),
}

#[cfg(test)]
mod tests {
    //! Unit tests for field defaults and stale-outcome handling.

    use super::*;

    struct NothingExists;

    #[async_trait]
    impl PathProbe for NothingExists {
        async fn exists(&self, _path: &str) -> bool {
            false
        }
    }

    fn wizard(kind: JobKind) -> Wizard {
        Wizard::new(kind, Arc::new(NothingExists), Arc::new(NoDialogs))
    }

    #[test]
    fn fresh_fields_are_default_invalid_only_when_required() {
        let encrypt = wizard(JobKind::Encrypt);
        assert!(!encrypt.field(FieldId::InputPaths).is_valid);
        assert!(encrypt.field(FieldId::OutputDir).is_valid);
        assert!(encrypt.field(FieldId::KeyPath).is_valid);

        let decrypt = wizard(JobKind::Decrypt);
        assert!(!decrypt.field(FieldId::KeyPath).is_valid);
    }

    #[test]
    fn stale_outcome_is_discarded() {
        let mut wizard = wizard(JobKind::Encrypt);
        let first = wizard.set_value(FieldId::Password, "weak");
        let _second = wizard.set_value(FieldId::Password, "Str0ng!Pwd");

        let applied = wizard.apply(ValidationOutcome {
            field: first.field(),
            revision: first.revision,
            verdict: FieldVerdict::invalid("stale"),
        });
        assert!(!applied);
        assert!(wizard.field(FieldId::Password).message.is_empty());
    }
}

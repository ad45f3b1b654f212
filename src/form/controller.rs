use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use super::validation::ValidationError;

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

/// Lifecycle of one submission attempt. `Failed` is transient: every failure
/// path returns the controller to a retryable `Idle` on its own, with the
/// fields left as last entered.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitStatus {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationMode {
    OnChange,
    OnBlur,
    OnSubmit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RevalidateMode {
    OnChange,
    OnBlur,
    OnSubmit,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FormOptions {
    pub validate_mode: ValidationMode,
    pub revalidate_mode: RevalidateMode,
    pub validate_first_error_only: bool,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            validate_mode: ValidationMode::OnSubmit,
            revalidate_mode: RevalidateMode::OnChange,
            validate_first_error_only: false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldMeta<E> {
    pub dirty: bool,
    pub touched: bool,
    pub validating: bool,
    pub errors: Vec<E>,
}

impl<E> Default for FieldMeta<E> {
    fn default() -> Self {
        Self {
            dirty: false,
            touched: false,
            validating: false,
            errors: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormSnapshot<T, E> {
    pub model: T,
    pub status: SubmitStatus,
    pub submit_count: u32,
    pub is_dirty: bool,
    pub is_valid: bool,
    pub field_meta: BTreeMap<FieldKey, FieldMeta<E>>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    InvalidTransition { from: SubmitStatus, to: SubmitStatus },
    AlreadySubmitting,
    SubmitInFlight(FieldKey),
    DraftLoadFailed(String),
    DraftSaveFailed(String),
    DraftClearFailed(String),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::InvalidTransition { from, to } => {
                write!(f, "invalid submit status transition: {from:?} -> {to:?}")
            }
            FormError::AlreadySubmitting => f.write_str("form submit is already in progress"),
            FormError::SubmitInFlight(key) => {
                write!(f, "field {key} cannot change while a submit is in flight")
            }
            FormError::DraftLoadFailed(error) => write!(f, "failed to load draft: {error}"),
            FormError::DraftSaveFailed(error) => write!(f, "failed to save draft: {error}"),
            FormError::DraftClearFailed(error) => write!(f, "failed to clear draft: {error}"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub(super) type SyncFieldValidatorFn<T, E> = Arc<dyn Fn(&T) -> Result<(), E> + Send + Sync>;
pub(super) type SyncFormValidatorFn<T, E> = Arc<dyn Fn(&T) -> Vec<(FieldKey, E)> + Send + Sync>;
pub(super) type AsyncFieldValidatorFn<T, E> =
    Arc<dyn Fn(T) -> Pin<Box<dyn Future<Output = Result<(), E>> + Send + 'static>> + Send + Sync>;

#[derive(Clone)]
pub(super) struct AsyncFieldValidatorEntry<T, E> {
    pub(super) debounce: Duration,
    pub(super) validator: AsyncFieldValidatorFn<T, E>,
}

pub(super) struct FormState<T, E> {
    pub(super) id: FormId,
    pub(super) initial_model: T,
    pub(super) model: T,
    pub(super) status: SubmitStatus,
    pub(super) submit_count: u32,
    pub(super) dirty_fields: BTreeSet<FieldKey>,
    pub(super) revealed_fields: BTreeSet<FieldKey>,
    pub(super) field_meta: BTreeMap<FieldKey, FieldMeta<E>>,
    pub(super) tickets: BTreeMap<FieldKey, ValidationTicket>,
    pub(super) first_error: Option<FieldKey>,
}

impl<T, E> FormState<T, E> {
    pub(super) fn ensure_meta(&mut self, key: FieldKey) -> &mut FieldMeta<E> {
        self.field_meta.entry(key).or_default()
    }

    /// Allocates the next validation ticket for `key` and marks the field as
    /// validating. Results carrying a stale ticket are discarded on arrival.
    pub(super) fn next_ticket(&mut self, key: FieldKey) -> ValidationTicket {
        let next = ValidationTicket(
            self.tickets
                .get(&key)
                .copied()
                .unwrap_or(ValidationTicket(0))
                .0
                + 1,
        );
        self.tickets.insert(key, next);
        self.ensure_meta(key).validating = true;
        next
    }
}

/// Drives one form through collect -> validate -> submit -> resolve. The
/// controller is the sole owner of its `FormState`; cloning shares the same
/// underlying instance.
#[derive(Clone)]
pub struct FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub(super) options: FormOptions,
    pub(super) state: Arc<RwLock<FormState<T, E>>>,
    pub(super) sync_field_validators:
        Arc<RwLock<BTreeMap<FieldKey, Vec<SyncFieldValidatorFn<T, E>>>>>,
    pub(super) async_field_validators:
        Arc<RwLock<BTreeMap<FieldKey, Vec<AsyncFieldValidatorEntry<T, E>>>>>,
    pub(super) form_validators: Arc<RwLock<Vec<SyncFormValidatorFn<T, E>>>>,
    pub(super) dependencies: Arc<RwLock<BTreeMap<FieldKey, BTreeSet<FieldKey>>>>,
    pub(super) required_fields: Arc<RwLock<BTreeSet<FieldKey>>>,
}

impl<T, E> FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub fn new(initial: T, options: FormOptions) -> Self {
        Self {
            options,
            state: Arc::new(RwLock::new(FormState {
                id: FormId::next(),
                initial_model: initial.clone(),
                model: initial,
                status: SubmitStatus::Idle,
                submit_count: 0,
                dirty_fields: BTreeSet::new(),
                revealed_fields: BTreeSet::new(),
                field_meta: BTreeMap::new(),
                tickets: BTreeMap::new(),
                first_error: None,
            })),
            sync_field_validators: Arc::new(RwLock::new(BTreeMap::new())),
            async_field_validators: Arc::new(RwLock::new(BTreeMap::new())),
            form_validators: Arc::new(RwLock::new(Vec::new())),
            dependencies: Arc::new(RwLock::new(BTreeMap::new())),
            required_fields: Arc::new(RwLock::new(BTreeSet::new())),
        }
    }

    pub fn form_id(&self) -> FormResult<FormId> {
        Ok(read_lock(&self.state, "reading form id")?.id)
    }

    pub fn status(&self) -> FormResult<SubmitStatus> {
        Ok(read_lock(&self.state, "reading submit status")?.status)
    }

    /// Concurrency guard entry point: moves the machine into `Submitting` and
    /// rejects when another attempt is already in flight. The guard holds on
    /// the state itself, never on UI disablement.
    pub fn begin_submit(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "beginning submit")?;
        if state.status == SubmitStatus::Submitting {
            return Err(FormError::AlreadySubmitting);
        }
        transition(&mut state, SubmitStatus::Submitting)?;
        state.submit_count = state.submit_count.saturating_add(1);
        Ok(())
    }

    /// Records a validation rejection: the attempt never enters `Submitting`,
    /// passes through `Failed` and settles back on `Idle` so the user may
    /// retry with the fields as last entered. Valid from a resting
    /// `Succeeded` as well, since fields stay editable after a success.
    pub fn reject_submit(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "rejecting submit")?;
        state.submit_count = state.submit_count.saturating_add(1);
        transition(&mut state, SubmitStatus::Failed)?;
        transition(&mut state, SubmitStatus::Idle)?;
        Ok(())
    }

    /// Applies the resolution of the in-flight backing operation. A failed
    /// resolution returns the machine to `Idle` automatically.
    pub fn resolve_submit(&self, succeeded: bool) -> FormResult<()> {
        let mut state = write_lock(&self.state, "resolving submit")?;
        if succeeded {
            transition(&mut state, SubmitStatus::Succeeded)?;
        } else {
            transition(&mut state, SubmitStatus::Failed)?;
            transition(&mut state, SubmitStatus::Idle)?;
        }
        Ok(())
    }

    /// Validate-then-submit convenience over the three primitives. `f` runs
    /// only when every registered validator passes; validation completes
    /// fully before the machine enters `Submitting`.
    pub fn submit(&self, f: impl FnOnce(&T) -> FormResult<()> + 'static) -> FormResult<()> {
        {
            let state = read_lock(&self.state, "checking submit guard")?;
            if state.status == SubmitStatus::Submitting {
                return Err(FormError::AlreadySubmitting);
            }
        }

        if !self.validate_form()? {
            self.reject_submit()?;
            return Ok(());
        }

        self.begin_submit()?;
        let model = read_lock(&self.state, "reading model for submit")?
            .model
            .clone();
        let submit_result = f(&model);
        self.resolve_submit(submit_result.is_ok())?;
        submit_result
    }

    pub async fn submit_async<F, Fut>(&self, f: F) -> FormResult<()>
    where
        F: FnOnce(&T) -> Fut + 'static,
        Fut: Future<Output = FormResult<()>> + Send + 'static,
    {
        {
            let state = read_lock(&self.state, "checking async submit guard")?;
            if state.status == SubmitStatus::Submitting {
                return Err(FormError::AlreadySubmitting);
            }
        }

        if !self.validate_form_async().await? {
            self.reject_submit()?;
            return Ok(());
        }

        self.begin_submit()?;
        let model = read_lock(&self.state, "reading model for async submit")?
            .model
            .clone();
        let submit_result = f(&model).await;
        self.resolve_submit(submit_result.is_ok())?;
        submit_result
    }

    pub fn register_required_field<L>(&self, lens: L) -> FormResult<()>
    where
        L: super::validation::FieldLens<T>,
    {
        let mut required = write_lock(&self.required_fields, "registering required field")?;
        required.insert(lens.key());
        Ok(())
    }

    pub fn unregister_required_field<L>(&self, lens: L) -> FormResult<()>
    where
        L: super::validation::FieldLens<T>,
    {
        let mut required = write_lock(&self.required_fields, "unregistering required field")?;
        required.remove(&lens.key());
        Ok(())
    }

    pub fn is_required<L>(&self, lens: L) -> FormResult<bool>
    where
        L: super::validation::FieldLens<T>,
    {
        Ok(read_lock(&self.required_fields, "reading required fields")?.contains(&lens.key()))
    }

    /// Marks a secret field as shown in clear text. Purely presentational;
    /// validation and the status machine never consult this set.
    pub fn toggle_reveal<L>(&self, lens: L) -> FormResult<bool>
    where
        L: super::validation::FieldLens<T>,
    {
        let key = lens.key();
        let mut state = write_lock(&self.state, "toggling field reveal")?;
        let revealed = if state.revealed_fields.contains(&key) {
            state.revealed_fields.remove(&key);
            false
        } else {
            state.revealed_fields.insert(key);
            true
        };
        Ok(revealed)
    }

    pub fn is_revealed<L>(&self, lens: L) -> FormResult<bool>
    where
        L: super::validation::FieldLens<T>,
    {
        Ok(read_lock(&self.state, "reading revealed fields")?
            .revealed_fields
            .contains(&lens.key()))
    }

    pub fn conceal_all(&self) -> FormResult<()> {
        write_lock(&self.state, "concealing all fields")?
            .revealed_fields
            .clear();
        Ok(())
    }

    pub fn reset_to_initial(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "resetting form")?;
        state.model = state.initial_model.clone();
        state.status = SubmitStatus::Idle;
        state.dirty_fields.clear();
        state.revealed_fields.clear();
        state.tickets.clear();
        state.first_error = None;
        for meta in state.field_meta.values_mut() {
            meta.dirty = false;
            meta.touched = false;
            meta.validating = false;
            meta.errors.clear();
        }
        Ok(())
    }

    pub fn reset_field<L>(&self, lens: L) -> FormResult<()>
    where
        L: super::validation::FieldLens<T>,
    {
        let key = lens.key();
        let mut state = write_lock(&self.state, "resetting field")?;
        let initial_value = lens.get(&state.initial_model).clone();
        lens.set(&mut state.model, initial_value);
        state.dirty_fields.remove(&key);
        let meta = state.ensure_meta(key);
        meta.dirty = false;
        meta.touched = false;
        meta.validating = false;
        meta.errors.clear();
        state.first_error = first_error_key(&state.field_meta);
        Ok(())
    }

    pub fn clear_errors(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "clearing all field errors")?;
        for meta in state.field_meta.values_mut() {
            meta.errors.clear();
            meta.validating = false;
        }
        state.first_error = None;
        Ok(())
    }

    pub fn clear_field_errors<L>(&self, lens: L) -> FormResult<()>
    where
        L: super::validation::FieldLens<T>,
    {
        let key = lens.key();
        let mut state = write_lock(&self.state, "clearing field errors")?;
        if let Some(meta) = state.field_meta.get_mut(&key) {
            meta.errors.clear();
            meta.validating = false;
        }
        state.first_error = first_error_key(&state.field_meta);
        Ok(())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<T, E>> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        let is_valid = state.field_meta.values().all(|meta| meta.errors.is_empty());
        Ok(FormSnapshot {
            model: state.model.clone(),
            status: state.status,
            submit_count: state.submit_count,
            is_dirty: !state.dirty_fields.is_empty(),
            is_valid,
            field_meta: state.field_meta.clone(),
        })
    }

    pub fn field_meta<L>(&self, lens: L) -> FormResult<Option<FieldMeta<E>>>
    where
        L: super::validation::FieldLens<T>,
    {
        Ok(read_lock(&self.state, "reading field meta")?
            .field_meta
            .get(&lens.key())
            .cloned())
    }

    /// First error message that should be surfaced for a field. Hidden until
    /// the field was touched or a submit happened.
    pub fn field_error_for_display<L>(&self, lens: L) -> FormResult<Option<String>>
    where
        L: super::validation::FieldLens<T>,
    {
        let state = read_lock(&self.state, "reading display error message")?;
        let Some(meta) = state.field_meta.get(&lens.key()) else {
            return Ok(None);
        };
        if !meta.touched && state.submit_count == 0 {
            return Ok(None);
        }
        Ok(meta.errors.first().map(ValidationError::message))
    }
}

pub(super) fn transition<T, E>(state: &mut FormState<T, E>, next: SubmitStatus) -> FormResult<()> {
    let current = state.status;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitStatus::Idle, SubmitStatus::Submitting)
            | (SubmitStatus::Idle, SubmitStatus::Failed)
            | (SubmitStatus::Submitting, SubmitStatus::Succeeded)
            | (SubmitStatus::Submitting, SubmitStatus::Failed)
            | (SubmitStatus::Succeeded, SubmitStatus::Submitting)
            | (SubmitStatus::Succeeded, SubmitStatus::Failed)
            | (_, SubmitStatus::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidTransition {
            from: current,
            to: next,
        });
    }
    state.status = next;
    Ok(())
}

pub(super) fn first_error_key<E>(
    field_meta: &BTreeMap<FieldKey, FieldMeta<E>>,
) -> Option<FieldKey> {
    field_meta
        .iter()
        .find_map(|(key, meta)| (!meta.errors.is_empty()).then_some(*key))
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}

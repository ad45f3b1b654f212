use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures::executor::block_on;

use crate::feedback::{NoticeKind, NoticeManager};
use crate::form::{FormError, FormModel, SubmitStatus};

use super::identity::{
    BoxedIdentityFuture, IdentityError, IdentityGateway, Navigator, ProviderId, ReasonKey,
    SubmissionOutcome,
};
use super::login::{LoginFlow, LoginModel};
use super::register::{RegisterFlow, RegisterModel};

#[derive(Clone, Copy)]
enum CredentialScript {
    Accept,
    Reject(ReasonKey),
    Raise,
}

struct ScriptedGateway {
    credential_script: CredentialScript,
    provider_raises: bool,
    delay_ms: u64,
    credential_calls: AtomicUsize,
    provider_calls: AtomicUsize,
    provider_targets: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    fn new(credential_script: CredentialScript) -> Arc<Self> {
        Arc::new(Self {
            credential_script,
            provider_raises: false,
            delay_ms: 0,
            credential_calls: AtomicUsize::new(0),
            provider_calls: AtomicUsize::new(0),
            provider_targets: Mutex::new(Vec::new()),
        })
    }

    fn with_delay(credential_script: CredentialScript, delay_ms: u64) -> Arc<Self> {
        Arc::new(Self {
            delay_ms,
            ..Self::unwrapped(credential_script)
        })
    }

    fn with_provider_raise() -> Arc<Self> {
        Arc::new(Self {
            provider_raises: true,
            ..Self::unwrapped(CredentialScript::Accept)
        })
    }

    fn unwrapped(credential_script: CredentialScript) -> Self {
        Self {
            credential_script,
            provider_raises: false,
            delay_ms: 0,
            credential_calls: AtomicUsize::new(0),
            provider_calls: AtomicUsize::new(0),
            provider_targets: Mutex::new(Vec::new()),
        }
    }

    fn credential_calls(&self) -> usize {
        self.credential_calls.load(Ordering::SeqCst)
    }

    fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::SeqCst)
    }
}

impl IdentityGateway for ScriptedGateway {
    fn sign_in_with_credentials(
        &self,
        _email: &str,
        _password: &str,
    ) -> BoxedIdentityFuture<SubmissionOutcome> {
        self.credential_calls.fetch_add(1, Ordering::SeqCst);
        let script = self.credential_script;
        let delay_ms = self.delay_ms;
        Box::pin(async move {
            if delay_ms > 0 {
                thread::sleep(Duration::from_millis(delay_ms));
            }
            match script {
                CredentialScript::Accept => Ok(SubmissionOutcome::Success { redirect: None }),
                CredentialScript::Reject(reason) => Ok(SubmissionOutcome::Failure { reason }),
                CredentialScript::Raise => {
                    Err(IdentityError::Transport("connection reset".to_string()))
                }
            }
        })
    }

    fn sign_in_with_provider(
        &self,
        _provider: ProviderId,
        redirect_target: &str,
    ) -> BoxedIdentityFuture<()> {
        self.provider_calls.fetch_add(1, Ordering::SeqCst);
        self.provider_targets
            .lock()
            .expect("provider targets poisoned")
            .push(redirect_target.to_string());
        let raises = self.provider_raises;
        Box::pin(async move {
            if raises {
                Err(IdentityError::Misconfigured(
                    "missing client secret".to_string(),
                ))
            } else {
                Ok(())
            }
        })
    }
}

#[derive(Default)]
struct RecordingNavigator {
    targets: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    fn visited(&self) -> Vec<String> {
        self.targets.lock().expect("navigator poisoned").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn go(&self, target: &str) {
        self.targets
            .lock()
            .expect("navigator poisoned")
            .push(target.to_string());
    }
}

fn login_flow(
    gateway: Arc<ScriptedGateway>,
) -> (LoginFlow<ScriptedGateway>, NoticeManager, Arc<RecordingNavigator>) {
    let notices = NoticeManager::new();
    let navigator = Arc::new(RecordingNavigator::default());
    let flow = LoginFlow::new(gateway, notices.clone(), navigator.clone())
        .expect("login flow constructs");
    (flow, notices, navigator)
}

fn register_flow(
    gateway: Arc<ScriptedGateway>,
) -> (
    RegisterFlow<ScriptedGateway>,
    NoticeManager,
    Arc<RecordingNavigator>,
) {
    let notices = NoticeManager::new();
    let navigator = Arc::new(RecordingNavigator::default());
    let flow = RegisterFlow::new(gateway, notices.clone(), navigator.clone())
        .expect("register flow constructs");
    (flow, notices, navigator)
}

fn fill_login(flow: &LoginFlow<ScriptedGateway>, email: &str, password: &str) {
    let fields = LoginModel::fields();
    flow.controller()
        .set(fields.email(), email.to_string())
        .expect("set email");
    flow.controller()
        .set(fields.password(), password.to_string())
        .expect("set password");
}

fn fill_register(
    flow: &RegisterFlow<ScriptedGateway>,
    name: &str,
    email: &str,
    password: &str,
    confirm: &str,
    accept_terms: bool,
) {
    let fields = RegisterModel::fields();
    let controller = flow.controller();
    controller
        .set(fields.name(), name.to_string())
        .expect("set name");
    controller
        .set(fields.email(), email.to_string())
        .expect("set email");
    controller
        .set(fields.password(), password.to_string())
        .expect("set password");
    controller
        .set(fields.confirm_password(), confirm.to_string())
        .expect("set confirm password");
    controller
        .set(fields.accept_terms(), accept_terms)
        .expect("set accept terms");
}

#[test]
fn login_success_notifies_and_navigates_to_dashboard() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, navigator) = login_flow(gateway.clone());
    fill_login(&flow, "user@example.com", "longenough1");

    block_on(flow.submit()).expect("submit succeeds");

    assert_eq!(flow.status().expect("status"), SubmitStatus::Succeeded);
    assert_eq!(gateway.credential_calls(), 1);
    assert_eq!(navigator.visited(), vec!["/dashboard".to_string()]);

    let pending = notices.take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, NoticeKind::Success);
    assert_eq!(pending[0].title_key, "auth.login.success");
    assert_eq!(pending[0].message_key, "auth.login.welcomeBack");
}

#[test]
fn login_invalid_credentials_returns_to_idle() {
    let gateway =
        ScriptedGateway::new(CredentialScript::Reject(ReasonKey::InvalidCredentials));
    let (flow, notices, navigator) = login_flow(gateway.clone());
    fill_login(&flow, "user@example.com", "wrong-password");

    block_on(flow.submit()).expect("submit resolves");

    assert_eq!(flow.status().expect("status"), SubmitStatus::Idle);
    assert!(navigator.visited().is_empty());

    let pending = notices.take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, NoticeKind::Error);
    assert_eq!(pending[0].message_key, "auth.login.invalidCredentials");
}

#[test]
fn login_gateway_fault_maps_to_generic_reason() {
    let gateway = ScriptedGateway::new(CredentialScript::Raise);
    let (flow, notices, navigator) = login_flow(gateway.clone());
    fill_login(&flow, "user@example.com", "longenough1");

    block_on(flow.submit()).expect("submit resolves");

    assert_eq!(flow.status().expect("status"), SubmitStatus::Idle);
    assert!(navigator.visited().is_empty());
    let pending = notices.take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].message_key, "auth.login.somethingWrong");
}

#[test]
fn second_submit_while_in_flight_never_reaches_gateway() {
    let gateway = ScriptedGateway::with_delay(CredentialScript::Accept, 60);
    let (flow, _notices, _navigator) = login_flow(gateway.clone());
    fill_login(&flow, "user@example.com", "longenough1");

    let flow = Arc::new(flow);
    let in_flight = {
        let flow = flow.clone();
        thread::spawn(move || block_on(flow.submit()))
    };
    thread::sleep(Duration::from_millis(15));

    assert_eq!(
        block_on(flow.submit()),
        Err(FormError::AlreadySubmitting)
    );
    assert!(block_on(flow.submit_ignoring_repeat()).is_ok());

    in_flight
        .join()
        .expect("in-flight thread joins")
        .expect("original attempt resolves");
    assert_eq!(gateway.credential_calls(), 1);
}

#[test]
fn sequential_resubmissions_are_independent_cycles() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, navigator) = login_flow(gateway.clone());
    fill_login(&flow, "user@example.com", "longenough1");

    block_on(flow.submit()).expect("first attempt");
    block_on(flow.submit()).expect("second attempt");

    assert_eq!(gateway.credential_calls(), 2);
    assert_eq!(navigator.visited().len(), 2);
    assert_eq!(notices.take_all().len(), 2);
    assert_eq!(
        flow.controller().snapshot().expect("snapshot").submit_count,
        2
    );
}

#[test]
fn disposed_flow_drops_late_resolution() {
    let gateway = ScriptedGateway::with_delay(CredentialScript::Accept, 40);
    let (flow, notices, navigator) = login_flow(gateway.clone());
    fill_login(&flow, "user@example.com", "longenough1");

    let flow = Arc::new(flow);
    let in_flight = {
        let flow = flow.clone();
        thread::spawn(move || block_on(flow.submit()))
    };
    thread::sleep(Duration::from_millis(10));
    flow.dispose();

    in_flight
        .join()
        .expect("in-flight thread joins")
        .expect("resolution is a quiet no-op");

    assert!(flow.is_disposed());
    assert!(notices.take_all().is_empty());
    assert!(navigator.visited().is_empty());
    assert_eq!(gateway.credential_calls(), 1);
}

#[test]
fn oauth_success_is_fire_and_forget() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, navigator) = login_flow(gateway.clone());

    block_on(flow.submit_with_provider(ProviderId::Github)).expect("provider submit");

    // The gateway navigates the page away itself; locally the flow never
    // observes a success.
    assert_eq!(flow.status().expect("status"), SubmitStatus::Submitting);
    assert!(notices.take_all().is_empty());
    assert!(navigator.visited().is_empty());
    assert_eq!(gateway.provider_calls(), 1);
    assert_eq!(
        gateway
            .provider_targets
            .lock()
            .expect("targets")
            .clone(),
        vec!["/dashboard".to_string()]
    );
}

#[test]
fn oauth_fault_before_redirect_is_observable() {
    let gateway = ScriptedGateway::with_provider_raise();
    let (flow, notices, _navigator) = login_flow(gateway.clone());

    block_on(flow.submit_with_provider(ProviderId::Google)).expect("provider submit");

    assert_eq!(flow.status().expect("status"), SubmitStatus::Idle);
    let pending = notices.take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].message_key, "auth.login.somethingWrong");
}

#[test]
fn register_reports_only_first_violated_rule() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, _navigator) = register_flow(gateway.clone());
    // Every rule fails at once; only the first in rule order may surface.
    fill_register(&flow, "", "", "short", "different", false);

    block_on(flow.submit()).expect("submit resolves");

    assert_eq!(flow.status().expect("status"), SubmitStatus::Idle);
    assert_eq!(gateway.credential_calls(), 0);
    let pending = notices.take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, NoticeKind::Error);
    assert_eq!(pending[0].title_key, "auth.register.error");
    assert_eq!(pending[0].message_key, "auth.register.nameRequired");
}

#[test]
fn register_missing_name_with_otherwise_valid_fields() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, _navigator) = register_flow(gateway.clone());
    fill_register(&flow, "", "a@b.com", "longenough1", "longenough1", true);

    block_on(flow.submit()).expect("submit resolves");

    assert_eq!(gateway.credential_calls(), 0);
    let pending = notices.take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].message_key, "auth.register.nameRequired");
}

#[test]
fn register_short_password_fails_before_mismatch_check() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, _navigator) = register_flow(gateway.clone());
    fill_register(&flow, "Ada Lovelace", "a@b.com", "short", "short", true);

    block_on(flow.submit()).expect("submit resolves");

    assert_eq!(gateway.credential_calls(), 0);
    assert_eq!(
        notices.take_all()[0].message_key,
        "auth.register.passwordTooShort"
    );
}

#[test]
fn register_password_mismatch_is_reported_after_length() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, _navigator) = register_flow(gateway.clone());
    fill_register(
        &flow,
        "Ada Lovelace",
        "a@b.com",
        "longenough1",
        "longenough2",
        true,
    );

    block_on(flow.submit()).expect("submit resolves");

    assert_eq!(gateway.credential_calls(), 0);
    assert_eq!(
        notices.take_all()[0].message_key,
        "auth.register.passwordMismatch"
    );
}

#[test]
fn register_whitespace_only_name_is_rejected() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, _navigator) = register_flow(gateway.clone());
    fill_register(&flow, "   ", "a@b.com", "longenough1", "longenough1", true);

    block_on(flow.submit()).expect("submit resolves");

    assert_eq!(gateway.credential_calls(), 0);
    assert_eq!(
        notices.take_all()[0].message_key,
        "auth.register.nameRequired"
    );
}

#[test]
fn register_success_creates_account_and_navigates() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, navigator) = register_flow(gateway.clone());
    fill_register(
        &flow,
        "Ada Lovelace",
        "ada@example.com",
        "longenough1",
        "longenough1",
        true,
    );

    block_on(flow.submit()).expect("submit succeeds");

    assert_eq!(flow.status().expect("status"), SubmitStatus::Succeeded);
    assert_eq!(gateway.credential_calls(), 1);
    assert_eq!(navigator.visited(), vec!["/dashboard".to_string()]);

    let pending = notices.take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, NoticeKind::Success);
    assert_eq!(pending[0].message_key, "auth.register.accountCreated");
}

#[test]
fn register_resubmit_after_success_reports_validation_failure() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, notices, _navigator) = register_flow(gateway.clone());
    let fields = RegisterModel::fields();
    fill_register(
        &flow,
        "Ada Lovelace",
        "ada@example.com",
        "longenough1",
        "longenough1",
        true,
    );

    block_on(flow.submit()).expect("first submit succeeds");
    assert_eq!(flow.status().expect("status"), SubmitStatus::Succeeded);
    notices.take_all();

    // Fields stay editable after a success; an invalid edit must still be
    // reported on the next attempt.
    flow.controller()
        .set(fields.name(), String::new())
        .expect("edit after success");
    block_on(flow.submit()).expect("rejected resubmit resolves quietly");

    assert_eq!(flow.status().expect("status"), SubmitStatus::Idle);
    assert_eq!(gateway.credential_calls(), 1);
    let pending = notices.take_all();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].message_key, "auth.register.nameRequired");
}

#[test]
fn register_validation_errors_become_visible_after_submit() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, _notices, _navigator) = register_flow(gateway.clone());
    let fields = RegisterModel::fields();
    fill_register(&flow, "", "a@b.com", "longenough1", "longenough1", true);

    assert_eq!(
        flow.controller()
            .field_error_for_display(fields.name())
            .expect("display error"),
        None
    );

    block_on(flow.submit()).expect("submit resolves");

    assert_eq!(
        flow.controller()
            .field_error_for_display(fields.name())
            .expect("display error"),
        Some("nameRequired".to_string())
    );
}

#[test]
fn register_required_fields_back_browser_constraints() {
    let gateway = ScriptedGateway::new(CredentialScript::Accept);
    let (flow, _notices, _navigator) = register_flow(gateway);
    let fields = RegisterModel::fields();

    assert!(flow
        .controller()
        .is_required(fields.email())
        .expect("required lookup"));
    assert!(!flow
        .controller()
        .is_required(fields.accept_terms())
        .expect("required lookup"));
}

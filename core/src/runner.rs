//! # Device Runner
//!
//! Inspects a single device: one session, the plan's actions in order, then close.
//!
//! ```text
//! Connecting ──▶ Executing(0) ──▶ Validating(0) ──▶ Executing(1) ──▶ … ──▶ Done
//!     │                │
//!     └── fatal ───────┴──▶ Failed
//! ```
//!
//! The session is closed on every exit path once it has been opened.

use std::sync::Arc;
use std::time::Duration;

use patrol_common::config::{Credentials, RunConfig};
use patrol_common::device::Device;
use patrol_common::error::InspectError;
use patrol_common::executor::{RemoteExecutor, RemoteSession};
use patrol_common::inspection::{
    ActionFailure, DeviceFailure, DeviceOutcome, ExecutionResult, FailureStage,
};
use patrol_plugins::HookRegistry;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::plan::{ActionPlan, PlannedAction};

/// How a device run reacts to failures.
#[derive(Debug, Clone, Copy)]
pub struct RunnerPolicy {
    pub command_timeout: Duration,
    pub abort_on_connection_error: bool,
    pub abort_on_command_timeout: bool,
}

impl From<&RunConfig> for RunnerPolicy {
    fn from(config: &RunConfig) -> Self {
        Self {
            command_timeout: config.command_timeout,
            abort_on_connection_error: config.abort_on_connection_error,
            abort_on_command_timeout: config.abort_on_command_timeout,
        }
    }
}

impl RunnerPolicy {
    /// Whether `err`, raised by an action, abandons the rest of the device run.
    pub fn is_device_fatal(&self, err: &InspectError) -> bool {
        match err {
            InspectError::Connection { .. } => self.abort_on_connection_error,
            InspectError::CommandTimeout { .. } => self.abort_on_command_timeout,
            InspectError::Schema(_) => false,
            InspectError::TaskAborted(_) => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Connecting,
    Executing(usize),
    Validating(usize),
    Done,
}

#[derive(Clone)]
pub struct DeviceRunner {
    executor: Arc<dyn RemoteExecutor>,
    hooks: Arc<HookRegistry>,
    plan: Arc<ActionPlan>,
    policy: RunnerPolicy,
}

impl DeviceRunner {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        hooks: Arc<HookRegistry>,
        plan: Arc<ActionPlan>,
        policy: RunnerPolicy,
    ) -> Self {
        Self {
            executor,
            hooks,
            plan,
            policy,
        }
    }

    /// Runs the whole plan against `device`. Never fails: every error ends up in the outcome.
    pub async fn run(&self, device: &Device, credentials: &Credentials) -> DeviceOutcome {
        trace_stage(device, Stage::Connecting);
        let mut session = match self.executor.open(device, credentials).await {
            Ok(session) => session,
            Err(err) => {
                warn!(sn = %device.sn, ip = %device.ip, "session could not be opened: {err}");
                return DeviceOutcome::Failed(DeviceFailure::new(FailureStage::Connecting, &err));
            }
        };

        let outcome = self.execute_plan(device, session.as_mut()).await;

        if let Err(err) = session.close().await {
            warn!(sn = %device.sn, "failed to close session: {err}");
        }
        outcome
    }

    async fn execute_plan(&self, device: &Device, session: &mut dyn RemoteSession) -> DeviceOutcome {
        let mut results = Vec::with_capacity(self.plan.len());
        let mut skipped = Vec::new();

        for (index, step) in self.plan.steps().iter().enumerate() {
            trace_stage(device, Stage::Executing(index));
            match self.execute_step(device, session, index, step).await {
                Ok(result) => results.push(result),
                Err(err) if self.policy.is_device_fatal(&err) => {
                    warn!(sn = %device.sn, action = %step.action.name, "device abandoned: {err}");
                    let stage = FailureStage::Executing {
                        index,
                        action: step.action.name.clone(),
                    };
                    return DeviceOutcome::Failed(DeviceFailure::new(stage, &err));
                }
                Err(err) => {
                    warn!(sn = %device.sn, action = %step.action.name, "action skipped: {err}");
                    skipped.push(ActionFailure::new(step.action.id, &step.action.name, &err));
                }
            }
        }

        trace_stage(device, Stage::Done);
        DeviceOutcome::Completed { results, skipped }
    }

    async fn execute_step(
        &self,
        device: &Device,
        session: &mut dyn RemoteSession,
        index: usize,
        step: &PlannedAction,
    ) -> Result<ExecutionResult, InspectError> {
        let action = &step.action;
        let parser = step.parser.as_ref().map_err(|err| err.clone())?;
        let output = timeout(self.policy.command_timeout, session.execute(&action.cmd))
            .await
            .map_err(|_| InspectError::CommandTimeout {
                command: action.cmd.clone(),
                timeout: self.policy.command_timeout,
            })??;

        let parse_result = parser.parse(&output);

        trace_stage(device, Stage::Validating(index));
        let validation_result = self.hooks.validate(&action.name, &parse_result);

        Ok(ExecutionResult {
            action_id: action.id,
            action_name: action.name.clone(),
            output,
            parse_result,
            validation_result,
        })
    }
}

fn trace_stage(device: &Device, stage: Stage) {
    debug!(sn = %device.sn, ?stage, "device stage");
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use patrol_common::action::{Action, ParseStrategy};
    use patrol_common::error::ErrorClass;
    use serde_json::json;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Reply {
        Output(&'static str),
        Fail(InspectError),
        Hang,
    }

    #[derive(Default)]
    struct Scripted {
        replies: Mutex<HashMap<&'static str, Reply>>,
        refuse: bool,
        closed: Arc<AtomicUsize>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    struct ScriptedSession {
        replies: HashMap<&'static str, Reply>,
        closed: Arc<AtomicUsize>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Scripted {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteExecutor for Scripted {
        async fn open(
            &self,
            device: &Device,
            _credentials: &Credentials,
        ) -> Result<Box<dyn RemoteSession>, InspectError> {
            if self.refuse {
                return Err(InspectError::connection(device.ip.to_string(), "refused"));
            }
            let replies = std::mem::take(&mut *self.replies.lock().unwrap());
            Ok(Box::new(ScriptedSession {
                replies,
                closed: self.closed.clone(),
                calls: self.calls.clone(),
            }))
        }
    }

    #[async_trait]
    impl RemoteSession for ScriptedSession {
        async fn execute(&mut self, command: &str) -> Result<String, InspectError> {
            self.calls.lock().unwrap().push(command.to_string());
            match self.replies.get(command) {
                Some(Reply::Output(out)) => Ok(out.to_string()),
                Some(Reply::Fail(err)) => Err(err.clone()),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(String::new())
                }
                None => Ok(String::new()),
            }
        }

        async fn close(&mut self) -> Result<(), InspectError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn scripted(replies: Vec<(&'static str, Reply)>) -> Scripted {
        Scripted {
            replies: Mutex::new(replies.into_iter().collect()),
            ..Default::default()
        }
    }

    fn device() -> Device {
        Device::new("SN001", IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), "leaf-01")
    }

    fn actions() -> Vec<Action> {
        vec![
            Action::new(1, "check_version", "show version")
                .with_parser(ParseStrategy::Pattern, r"Version (?P<version>\S+)"),
            Action::new(2, "clock", "show clock"),
        ]
    }

    fn policy() -> RunnerPolicy {
        RunnerPolicy::from(&RunConfig {
            command_timeout: Duration::from_millis(100),
            ..RunConfig::default()
        })
    }

    fn runner(executor: Arc<Scripted>, hooks: HookRegistry, policy: RunnerPolicy) -> DeviceRunner {
        DeviceRunner::new(
            executor,
            Arc::new(hooks),
            Arc::new(ActionPlan::compile(actions())),
            policy,
        )
    }

    #[tokio::test]
    async fn runs_every_action_in_order() {
        let executor = Arc::new(scripted(vec![
            ("show version", Reply::Output("Version 9.3(8)\nuptime 3 days")),
            ("show clock", Reply::Output("12:00:00 UTC")),
        ]));
        let outcome = runner(executor.clone(), HookRegistry::builtin(), policy())
            .run(&device(), &Credentials::default())
            .await;

        let results = outcome.results();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].action_name, "check_version");
        assert_eq!(
            results[0].validation_result,
            json!([{"consistent": true, "versions": ["9.3(8)"]}])
        );
        assert_eq!(results[1].output, "12:00:00 UTC");
        assert!(results[1].parse_result.is_empty());
        assert_eq!(results[1].validation_result, json!([]));
        assert_eq!(executor.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn open_failure_marks_device_failed() {
        let executor = Arc::new(Scripted {
            refuse: true,
            ..Default::default()
        });
        let outcome = runner(executor.clone(), HookRegistry::new(), policy())
            .run(&device(), &Credentials::default())
            .await;

        match outcome {
            DeviceOutcome::Failed(failure) => {
                assert_eq!(failure.stage, FailureStage::Connecting);
                assert_eq!(failure.class, ErrorClass::Connection);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(executor.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn timeout_abandons_device_by_default() {
        let executor = Arc::new(scripted(vec![("show version", Reply::Hang)]));
        let outcome = runner(executor.clone(), HookRegistry::new(), policy())
            .run(&device(), &Credentials::default())
            .await;

        let DeviceOutcome::Failed(failure) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(failure.class, ErrorClass::Timeout);
        assert_eq!(
            failure.stage,
            FailureStage::Executing {
                index: 0,
                action: "check_version".into()
            }
        );
        assert_eq!(executor.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn timeout_skips_action_when_configured() {
        let executor = Arc::new(scripted(vec![
            ("show version", Reply::Hang),
            ("show clock", Reply::Output("12:00:00 UTC")),
        ]));
        let policy = RunnerPolicy {
            abort_on_command_timeout: false,
            ..policy()
        };
        let outcome = runner(executor, HookRegistry::new(), policy)
            .run(&device(), &Credentials::default())
            .await;

        let DeviceOutcome::Completed { results, skipped } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].action_name, "clock");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].class, ErrorClass::Timeout);
    }

    #[tokio::test]
    async fn mid_run_connection_loss_can_be_tolerated() {
        let executor = Arc::new(scripted(vec![(
            "show version",
            Reply::Fail(InspectError::connection("10.0.0.1", "reset by peer")),
        )]));
        let policy = RunnerPolicy {
            abort_on_connection_error: false,
            ..policy()
        };
        let outcome = runner(executor, HookRegistry::new(), policy)
            .run(&device(), &Credentials::default())
            .await;

        assert!(!outcome.is_failed());
        assert_eq!(outcome.results().len(), 1);
    }

    #[tokio::test]
    async fn broken_schema_skips_only_that_action() {
        let executor = Arc::new(scripted(vec![("show clock", Reply::Output("12:00"))]));
        let plan = ActionPlan::compile(vec![
            Action::new(7, "broken", "show broken").with_parser(ParseStrategy::Pattern, "("),
            Action::new(8, "clock", "show clock"),
        ]);
        let runner = DeviceRunner::new(
            executor.clone(),
            Arc::new(HookRegistry::new()),
            Arc::new(plan),
            policy(),
        );
        let outcome = runner.run(&device(), &Credentials::default()).await;

        let DeviceOutcome::Completed { results, skipped } = outcome else {
            panic!("expected completion");
        };
        assert_eq!(results.len(), 1);
        assert_eq!(skipped[0].action_id, 7);
        assert_eq!(skipped[0].class, ErrorClass::Schema);
        assert_eq!(executor.calls(), ["show clock"]);
    }

    #[tokio::test]
    async fn mid_run_connection_loss_fails_the_device_by_default() {
        let executor = Arc::new(scripted(vec![
            ("show version", Reply::Output("Version 9.3(8)")),
            (
                "show clock",
                Reply::Fail(InspectError::connection("10.0.0.1", "reset by peer")),
            ),
        ]));
        let plan = ActionPlan::compile(vec![
            Action::new(1, "check_version", "show version"),
            Action::new(2, "clock", "show clock"),
            Action::new(3, "uptime", "show uptime"),
        ]);
        let runner = DeviceRunner::new(
            executor.clone(),
            Arc::new(HookRegistry::new()),
            Arc::new(plan),
            policy(),
        );
        let outcome = runner.run(&device(), &Credentials::default()).await;

        let DeviceOutcome::Failed(failure) = &outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert_eq!(failure.class, ErrorClass::Connection);
        assert_eq!(
            failure.stage,
            FailureStage::Executing {
                index: 1,
                action: "clock".into()
            }
        );
        assert!(outcome.results().is_empty());
        assert_eq!(executor.calls(), ["show version", "show clock"]);
        assert_eq!(executor.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn task_abort_is_always_fatal() {
        let lenient = RunnerPolicy {
            abort_on_connection_error: false,
            abort_on_command_timeout: false,
            ..policy()
        };
        assert!(lenient.is_device_fatal(&InspectError::TaskAborted("panic".into())));
        assert!(!lenient.is_device_fatal(&InspectError::connection("h", "x")));
    }
}

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use common::{eventually, CallLog, MockSubsystem};
use gateway_control::lifecycle::exit::{
    ExitCause, ExitReport, EXIT_ADMIN_START, EXIT_ENGINE_START, EXIT_FORCED,
};
use gateway_control::lifecycle::signals::Terminator;
use gateway_control::lifecycle::{
    Coordinator, Interrupt, InterruptHandler, LifecycleHandle, LifecycleState,
};

const STOP_TIMEOUT: Option<Duration> = Some(Duration::from_secs(1));

async fn started(log: &CallLog, name: &str) {
    let entry = format!("{name}.start");
    assert!(
        eventually(Duration::from_secs(2), || {
            let entry = entry.clone();
            async move { log.entries().contains(&entry) }
        })
        .await,
        "{name} never started"
    );
}

async fn finish(run: tokio::task::JoinHandle<ExitReport>) -> ExitReport {
    tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .expect("coordinator did not finish")
        .unwrap()
}

#[tokio::test]
async fn test_failure_stops_everything_in_reverse_order() {
    let log = CallLog::default();
    let engine = MockSubsystem::new("engine", &log);
    let api = MockSubsystem::new("api", &log);
    let engine_done = engine.trigger();

    let lifecycle = LifecycleHandle::new();
    let coordinator = Coordinator::new(lifecycle.clone(), STOP_TIMEOUT)
        .supervise(engine, EXIT_ENGINE_START)
        .supervise(api, EXIT_ADMIN_START);
    let run = tokio::spawn(coordinator.run());

    started(&log, "api").await;
    engine_done.finish(Some("listener closed"));

    let report = finish(run).await;
    assert_eq!(report.code, 1);
    assert_eq!(
        report.cause,
        ExitCause::Failed {
            subsystem: "engine".into(),
            error: "listener closed".into(),
        }
    );
    assert_eq!(
        report.cause.to_string(),
        "exit from engine due to error: listener closed"
    );
    assert_eq!(
        log.entries(),
        vec!["engine.start", "api.start", "api.stop", "api.close", "engine.stop", "engine.close"]
    );
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_start_failure_unwinds_only_started_subsystems() {
    let log = CallLog::default();
    let engine = MockSubsystem::new("engine", &log);
    let api = MockSubsystem::new("api", &log).failing_start("address in use");

    let lifecycle = LifecycleHandle::new();
    let report = Coordinator::new(lifecycle.clone(), STOP_TIMEOUT)
        .supervise(engine, EXIT_ENGINE_START)
        .supervise(api, EXIT_ADMIN_START)
        .run()
        .await;

    assert_eq!(report.code, EXIT_ADMIN_START);
    assert_eq!(report.cause.subsystem(), Some("api"));
    assert_eq!(report.cause.to_string(), "start api failed: address in use");
    assert_eq!(
        log.entries(),
        vec!["engine.start", "api.start", "engine.stop", "engine.close"]
    );
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_first_start_failure_uses_its_exit_code() {
    let log = CallLog::default();
    let engine = MockSubsystem::new("engine", &log).failing_start("bad listener");
    let api = MockSubsystem::new("api", &log);

    let report = Coordinator::new(LifecycleHandle::new(), STOP_TIMEOUT)
        .supervise(engine, EXIT_ENGINE_START)
        .supervise(api, EXIT_ADMIN_START)
        .run()
        .await;

    assert_eq!(report.code, EXIT_ENGINE_START);
    assert_eq!(log.entries(), vec!["engine.start"]);
}

#[tokio::test]
async fn test_operator_request_exits_zero() {
    let log = CallLog::default();
    let lifecycle = LifecycleHandle::new();
    let coordinator = Coordinator::new(lifecycle.clone(), STOP_TIMEOUT)
        .supervise(MockSubsystem::new("engine", &log), EXIT_ENGINE_START)
        .supervise(MockSubsystem::new("api", &log), EXIT_ADMIN_START);
    let run = tokio::spawn(coordinator.run());

    started(&log, "api").await;
    assert!(lifecycle.request_stop());

    let report = finish(run).await;
    assert_eq!(report.cause, ExitCause::OperatorRequest);
    assert_eq!(report.code, 0);
    assert_eq!(
        log.entries(),
        vec!["engine.start", "api.start", "api.stop", "api.close", "engine.stop", "engine.close"]
    );
    assert!(!lifecycle.request_stop());
}

#[tokio::test]
async fn test_clean_exit_exits_zero() {
    let log = CallLog::default();
    let engine = MockSubsystem::new("engine", &log);
    let engine_done = engine.trigger();

    let coordinator = Coordinator::new(LifecycleHandle::new(), STOP_TIMEOUT)
        .supervise(engine, EXIT_ENGINE_START)
        .supervise(MockSubsystem::new("api", &log), EXIT_ADMIN_START);
    let run = tokio::spawn(coordinator.run());

    started(&log, "api").await;
    engine_done.finish(None);

    let report = finish(run).await;
    assert_eq!(
        report.cause,
        ExitCause::Exited {
            subsystem: "engine".into()
        }
    );
    assert_eq!(report.code, 0);
}

#[tokio::test]
async fn test_late_failure_does_not_change_narrative() {
    let log = CallLog::default();
    let lifecycle = LifecycleHandle::new();
    let coordinator = Coordinator::new(lifecycle.clone(), STOP_TIMEOUT)
        .supervise(
            MockSubsystem::new("engine", &log).stop_with_error("connection reset"),
            EXIT_ENGINE_START,
        )
        .supervise(
            MockSubsystem::new("api", &log).stop_with_error("listener closed"),
            EXIT_ADMIN_START,
        );
    let run = tokio::spawn(coordinator.run());

    started(&log, "api").await;
    lifecycle.request_stop();

    let report = finish(run).await;
    assert_eq!(report.cause, ExitCause::OperatorRequest);
    assert_eq!(report.code, 0);
}

#[tokio::test]
async fn test_stop_timeout_does_not_block_shutdown() {
    let log = CallLog::default();
    let lifecycle = LifecycleHandle::new();
    let coordinator = Coordinator::new(lifecycle.clone(), Some(Duration::from_millis(100)))
        .supervise(MockSubsystem::new("engine", &log), EXIT_ENGINE_START)
        .supervise(
            MockSubsystem::new("api", &log).slow_stop(Duration::from_secs(30)),
            EXIT_ADMIN_START,
        );
    let run = tokio::spawn(coordinator.run());

    started(&log, "api").await;
    lifecycle.request_stop();

    let report = finish(run).await;
    assert_eq!(report.code, 0);
    assert_eq!(
        log.entries(),
        vec!["engine.start", "api.start", "api.stop", "api.close", "engine.stop", "engine.close"]
    );
    assert_eq!(lifecycle.state(), LifecycleState::Stopped);
}

#[tokio::test]
async fn test_second_interrupt_during_shutdown_forces_exit() {
    let log = CallLog::default();
    let lifecycle = LifecycleHandle::new();
    let coordinator = Coordinator::new(lifecycle.clone(), Some(Duration::from_secs(30)))
        .supervise(MockSubsystem::new("engine", &log), EXIT_ENGINE_START)
        .supervise(
            MockSubsystem::new("api", &log).slow_stop(Duration::from_secs(30)),
            EXIT_ADMIN_START,
        );
    let run = tokio::spawn(coordinator.run());

    let codes: Arc<Mutex<Vec<u8>>> = Arc::default();
    let sink = codes.clone();
    let terminator: Terminator = Arc::new(move |code: u8| sink.lock().unwrap().push(code));
    let (interrupts, rx) = mpsc::channel(4);
    tokio::spawn(InterruptHandler::new(lifecycle.clone(), terminator).run(rx));

    started(&log, "api").await;
    interrupts.send(Interrupt::Interrupt).await.unwrap();
    assert!(
        eventually(Duration::from_secs(2), || {
            let log = log.clone();
            async move { log.entries().contains(&"api.stop".to_string()) }
        })
        .await
    );

    interrupts.send(Interrupt::Terminate).await.unwrap();
    assert!(
        eventually(Duration::from_secs(2), || {
            let codes = codes.clone();
            async move { !codes.lock().unwrap().is_empty() }
        })
        .await
    );

    assert_eq!(*codes.lock().unwrap(), vec![EXIT_FORCED]);
    assert!(lifecycle.force_exit_requested());
    assert!(!log.entries().contains(&"engine.stop".to_string()));
    assert!(!run.is_finished());
    run.abort();
}

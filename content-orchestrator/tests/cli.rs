use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use std::path::Path;
use tempfile::{tempdir, NamedTempFile};

/// Config whose collaborators are never reachable; only offline paths may be exercised with it.
fn create_config(ledger_path: &Path) -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    let yaml = format!(
        "ledger:\n  path: {}\ncollaborators:\n  viral_url: http://127.0.0.1:9/viral\n  thumbnail_url: http://127.0.0.1:9/thumbnail\n  ad_url: http://127.0.0.1:9/ad\n  poster_url: http://127.0.0.1:9/post\n  scheduler_url: http://127.0.0.1:9/schedule\n",
        ledger_path.display()
    );
    write(config.path(), yaml).expect("Writing temp config failed");
    config
}

fn create_input(yaml: &str) -> NamedTempFile {
    let input = NamedTempFile::new().expect("Creating temp input file failed");
    write(input.path(), yaml).expect("Writing temp input failed");
    input
}

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("content-orchestrator").expect("Binary exists");
    cmd.env_remove("COLLABORATOR_API_KEY");
    cmd
}

#[test]
fn help_lists_every_subcommand() {
    cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("orchestrate")
            .and(predicate::str::contains("rerun"))
            .and(predicate::str::contains("show-content"))
            .and(predicate::str::contains("show-run"))
            .and(predicate::str::contains("list-content"))
            .and(predicate::str::contains("sweep")),
    );
}

#[test]
fn draft_orchestration_is_persisted_and_readable() {
    let dir = tempdir().unwrap();
    let config = create_config(&dir.path().join("ledger.json"));
    let input = create_input(
        "owner_id: owner-7\ntitle: Test Video\ntarget_platforms: [youtube, tiktok]\npublish_strategy: draft\n",
    );

    let output = cmd()
        .arg("orchestrate")
        .arg("--config")
        .arg(config.path())
        .arg("--input")
        .arg(input.path())
        .output()
        .expect("running orchestrate");
    assert!(output.status.success(), "orchestrate failed: {output:?}");

    let result: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("orchestrate prints JSON");
    assert_eq!(result["status"], "ready");
    assert_eq!(result["platform_adaptations"]["youtube"]["title"], "Test Video");
    assert!(result["distribution_results"].is_null());
    let content_id = result["content_id"].as_str().expect("content id").to_string();
    let run_id = result["run_id"].as_str().expect("run id").to_string();

    cmd()
        .arg("show-content")
        .arg("--config")
        .arg(config.path())
        .arg("--id")
        .arg(&content_id)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"ready\"").and(predicate::str::contains(&run_id)));

    cmd()
        .arg("show-run")
        .arg("--config")
        .arg(config.path())
        .arg("--id")
        .arg(&run_id)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"completed\""));

    cmd()
        .arg("list-content")
        .arg("--config")
        .arg(config.path())
        .arg("--owner")
        .arg("owner-7")
        .assert()
        .success()
        .stdout(predicate::str::contains(&content_id));

    cmd()
        .arg("rerun")
        .arg("--config")
        .arg(config.path())
        .arg("--content-id")
        .arg(&content_id)
        .assert()
        .success()
        .stdout(predicate::str::contains(&content_id).and(predicate::str::contains("\"ready\"")));
}

#[test]
fn unknown_ids_print_not_found() {
    let dir = tempdir().unwrap();
    let config = create_config(&dir.path().join("ledger.json"));

    for sub in ["show-content", "show-run"] {
        cmd()
            .arg(sub)
            .arg("--config")
            .arg(config.path())
            .arg("--id")
            .arg("missing")
            .assert()
            .success()
            .stdout(predicate::str::contains("not found"));
    }
    cmd()
        .arg("rerun")
        .arg("--config")
        .arg(config.path())
        .arg("--content-id")
        .arg("missing")
        .assert()
        .success()
        .stdout(predicate::str::contains("not found"));
}

#[test]
fn scheduled_submission_without_time_is_rejected() {
    let dir = tempdir().unwrap();
    let config = create_config(&dir.path().join("ledger.json"));
    let input = create_input(
        "owner_id: owner-7\ntitle: Later\ntarget_platforms: [youtube]\npublish_strategy: scheduled\n",
    );

    cmd()
        .arg("orchestrate")
        .arg("--config")
        .arg(config.path())
        .arg("--input")
        .arg(input.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("schedule time"));

    cmd()
        .arg("list-content")
        .arg("--config")
        .arg(config.path())
        .arg("--owner")
        .arg("owner-7")
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn sweep_on_an_empty_ledger_reports_nothing() {
    let dir = tempdir().unwrap();
    let config = create_config(&dir.path().join("ledger.json"));

    cmd()
        .arg("sweep")
        .arg("--config")
        .arg(config.path())
        .arg("--stale-after-secs")
        .arg("3600")
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{event:?}"));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use content_orchestrator::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::ShowContent {
            config: std::path::PathBuf::from("dummy.yaml"),
            id: "anything".to_string(),
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "a missing config file must fail");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}

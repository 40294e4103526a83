//! Behaviour-driven tests for the job lifecycle.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use recon_plugins::{PluginRegistry, Profile};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::{Value, json};
use time::OffsetDateTime;

use super::{PluginSetup, Script};
use crate::job::{Job, JobId, JobResults, JobStatus, JobSummary, StatusCounts};
use crate::manager::{JobError, JobManager, RetryPolicy};
use crate::store::{InMemoryJobStore, JobStore, StoreError};

// ---------------------------------------------------------------------------
// Status history store
// ---------------------------------------------------------------------------

/// In-memory store that remembers every status it accepted.
#[derive(Default)]
struct HistoryStore {
    inner: InMemoryJobStore,
    history: Mutex<Vec<(JobId, JobStatus)>>,
}

impl HistoryStore {
    fn history_for(&self, id: &JobId) -> Vec<JobStatus> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(job, _)| job == id)
            .map(|(_, status)| *status)
            .collect()
    }

    fn remember(&self, id: &JobId, status: JobStatus) {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id.clone(), status));
    }
}

impl JobStore for HistoryStore {
    fn create(&self, job: Job) -> Result<(), StoreError> {
        let (id, status) = (job.id.clone(), job.status);
        self.inner.create(job)?;
        self.remember(&id, status);
        Ok(())
    }

    fn set_status(
        &self,
        id: &JobId,
        status: JobStatus,
        at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        self.inner.set_status(id, status, at)?;
        self.remember(id, status);
        Ok(())
    }

    fn append_log(&self, id: &JobId, line: &str) -> Result<(), StoreError> {
        self.inner.append_log(id, line)
    }

    fn record_result(&self, id: &JobId, plugin: &str, value: Value) -> Result<(), StoreError> {
        self.inner.record_result(id, plugin, value)
    }

    fn set_results(&self, id: &JobId, results: JobResults) -> Result<(), StoreError> {
        self.inner.set_results(id, results)
    }

    fn get(&self, id: &JobId) -> Result<Job, StoreError> {
        self.inner.get(id)
    }

    fn list_summaries(&self) -> Result<Vec<JobSummary>, StoreError> {
        self.inner.list_summaries()
    }

    fn count_by_status(&self) -> Result<StatusCounts, StoreError> {
        self.inner.count_by_status()
    }

    fn logs(&self, id: &JobId) -> Result<Vec<String>, StoreError> {
        self.inner.logs(id)
    }
}

// ---------------------------------------------------------------------------
// Test world
// ---------------------------------------------------------------------------

struct TestWorld {
    plugins: PluginSetup,
    store: Arc<HistoryStore>,
    jobs: Vec<JobId>,
    rejection: Option<JobError>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self {
            plugins: PluginSetup::new(),
            store: Arc::new(HistoryStore::default()),
            jobs: Vec::new(),
            rejection: None,
        }
    }
}

impl TestWorld {
    fn manager(&self) -> JobManager<PluginRegistry> {
        JobManager::new(
            Arc::clone(&self.store) as Arc<dyn JobStore>,
            self.plugins.registry.clone(),
            self.plugins.catalogue(),
        )
        .with_retry_policy(RetryPolicy::new(3, Duration::ZERO))
    }

    fn last_job(&self) -> Job {
        let id = self.jobs.last().expect("a job was submitted");
        self.store.get(id).expect("job exists")
    }
}

#[fixture]
fn world() -> TestWorld {
    TestWorld::default()
}

fn unquote(text: &str) -> &str {
    text.trim_matches('"')
}

fn parse_profile(text: &str) -> Profile {
    unquote(text).parse().expect("known profile")
}

// ---------------------------------------------------------------------------
// Given steps
// ---------------------------------------------------------------------------

#[given("a lite plugin {name} returning ips {ip}")]
fn given_payload_plugin(world: &mut TestWorld, name: String, ip: String) {
    world.plugins.add(
        Profile::Lite,
        unquote(&name),
        Script::Payload(json!({"ips": [unquote(&ip)]})),
    );
}

#[given("a lite plugin {name} failing with {message}")]
fn given_failing_plugin(world: &mut TestWorld, name: String, message: String) {
    world.plugins.add(
        Profile::Lite,
        unquote(&name),
        Script::Fail(unquote(&message).to_owned()),
    );
}

#[given("a lite plugin {name} emitting {count} lines")]
fn given_chatty_plugin(world: &mut TestWorld, name: String, count: usize) {
    world
        .plugins
        .add(Profile::Lite, unquote(&name), Script::Chatty(count));
}

// ---------------------------------------------------------------------------
// When steps
// ---------------------------------------------------------------------------

#[when("{target} is scanned with the {profile} profile")]
fn when_scanned(world: &mut TestWorld, target: String, profile: String) {
    let handle = world
        .manager()
        .submit_tracked(unquote(&target), parse_profile(&profile))
        .expect("submission accepted");
    world.jobs.push(handle.job_id().clone());
    handle.join().expect("worker completes");
}

#[when("{target} is submitted with the {profile} profile")]
fn when_submitted(world: &mut TestWorld, target: String, profile: String) {
    match world
        .manager()
        .submit(unquote(&target), parse_profile(&profile))
    {
        Ok(id) => world.jobs.push(id),
        Err(error) => world.rejection = Some(error),
    }
}

#[when("{left} and {right} are scanned concurrently with the {profile} profile")]
fn when_scanned_concurrently(world: &mut TestWorld, left: String, right: String, profile: String) {
    let manager = world.manager();
    let chosen = parse_profile(&profile);
    let handles: Vec<_> = [unquote(&left), unquote(&right)]
        .into_iter()
        .map(|target| manager.submit_tracked(target, chosen).expect("submit"))
        .collect();
    for handle in handles {
        world.jobs.push(handle.job_id().clone());
        handle.join().expect("worker completes");
    }
}

// ---------------------------------------------------------------------------
// Then steps
// ---------------------------------------------------------------------------

#[then("the job status is {status}")]
fn then_status(world: &mut TestWorld, status: String) {
    assert_eq!(world.last_job().status.to_string(), unquote(&status));
}

#[then("plugin {name} reported ips {ip}")]
fn then_plugin_ips(world: &mut TestWorld, name: String, ip: String) {
    let job = world.last_job();
    assert_eq!(
        job.results.get(unquote(&name)),
        Some(&json!({"ips": [unquote(&ip)]}))
    );
}

#[then("plugin {name} reported the error {message}")]
fn then_plugin_error(world: &mut TestWorld, name: String, message: String) {
    let job = world.last_job();
    assert_eq!(
        job.results.get(unquote(&name)),
        Some(&json!({"error": unquote(&message)}))
    );
}

#[then("the status history is {history}")]
fn then_status_history(world: &mut TestWorld, history: String) {
    let id = world.jobs.last().expect("a job was submitted");
    let observed: Vec<String> = world
        .store
        .history_for(id)
        .into_iter()
        .map(|status| status.to_string())
        .collect();
    let expected: Vec<&str> = unquote(&history).split(", ").collect();
    assert_eq!(observed, expected);
}

#[then("the job has no results")]
fn then_no_results(world: &mut TestWorld) {
    assert!(world.last_job().results.is_empty());
}

#[then("the submission is rejected as invalid input")]
fn then_rejected(world: &mut TestWorld) {
    let rejection = world.rejection.as_ref().expect("submission rejected");
    assert!(rejection.is_invalid_input(), "unexpected error: {rejection}");
    assert!(world.jobs.is_empty());
}

#[then("the store holds {count} jobs")]
fn then_store_count(world: &mut TestWorld, count: usize) {
    assert_eq!(world.store.count_by_status().expect("counts").total, count);
}

#[then("the listed targets are {targets}")]
fn then_listed_targets(world: &mut TestWorld, targets: String) {
    let listed: Vec<String> = world
        .store
        .list_summaries()
        .expect("list")
        .into_iter()
        .map(|summary| summary.target)
        .collect();
    let expected: Vec<&str> = unquote(&targets).split(", ").collect();
    assert_eq!(listed, expected);
}

#[then("every job log only mentions its own target")]
fn then_logs_attributed(world: &mut TestWorld) {
    for id in &world.jobs {
        let job = world.store.get(id).expect("job exists");
        let tagged: Vec<&String> = job
            .logs
            .iter()
            .filter(|line| line.contains(" line "))
            .collect();
        assert!(!tagged.is_empty(), "no diagnostics for {}", job.target);
        assert!(
            tagged.iter().all(|line| line.contains(&job.target)),
            "foreign line in {}: {tagged:?}",
            job.target
        );
    }
}

// ---------------------------------------------------------------------------
// Scenario registration
// ---------------------------------------------------------------------------

#[scenario(path = "tests/features/job_lifecycle.feature")]
fn job_lifecycle_behaviour(world: TestWorld) {
    let _ = world;
}

//! Crate-level test doubles and behaviour tests.

use std::fs;
use std::thread;

use mockall::mock;
use recon_plugins::{
    DiagnosticSink, Plugin, PluginCatalogue, PluginError, PluginRegistry, Profile,
};
use serde_json::Value;
use tempfile::TempDir;
use time::OffsetDateTime;

use crate::job::{Job, JobId, JobResults, JobStatus, JobSummary, StatusCounts};
use crate::store::{JobStore, StoreError};

mod behaviour;

mock! {
    pub Store {}
    impl JobStore for Store {
        fn create(&self, job: Job) -> Result<(), StoreError>;
        fn set_status(
            &self,
            id: &JobId,
            status: JobStatus,
            at: OffsetDateTime,
        ) -> Result<(), StoreError>;
        fn append_log(&self, id: &JobId, line: &str) -> Result<(), StoreError>;
        fn record_result(&self, id: &JobId, plugin: &str, value: Value) -> Result<(), StoreError>;
        fn set_results(&self, id: &JobId, results: JobResults) -> Result<(), StoreError>;
        fn get(&self, id: &JobId) -> Result<Job, StoreError>;
        fn list_summaries(&self) -> Result<Vec<JobSummary>, StoreError>;
        fn count_by_status(&self) -> Result<StatusCounts, StoreError>;
        fn logs(&self, id: &JobId) -> Result<Vec<String>, StoreError>;
    }
}

/// Behaviour of a scripted in-process plugin.
#[derive(Debug, Clone)]
pub(crate) enum Script {
    /// Returns the payload unchanged.
    Payload(Value),
    /// Fails with the message.
    Fail(String),
    /// Panics with the message.
    Panic(String),
    /// Emits `count` diagnostic lines tagged with the target, then succeeds.
    Chatty(usize),
    /// Returns the name of the thread running the plugin.
    ReportThread,
}

/// In-process plugin driven by a [`Script`].
#[derive(Debug, Clone)]
pub(crate) struct ScriptedPlugin {
    name: String,
    script: Script,
}

impl ScriptedPlugin {
    pub(crate) fn new(name: impl Into<String>, script: Script) -> Self {
        Self {
            name: name.into(),
            script,
        }
    }
}

impl Plugin for ScriptedPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, target: &str, sink: &dyn DiagnosticSink) -> Result<Value, PluginError> {
        match &self.script {
            Script::Payload(value) => Ok(value.clone()),
            Script::Fail(message) => Err(PluginError::failed(&self.name, message.clone())),
            Script::Panic(message) => panic!("{message}"),
            Script::Chatty(count) => {
                for line in 0..*count {
                    sink.emit(&format!("{target} line {line}"));
                }
                Ok(Value::Null)
            }
            Script::ReportThread => Ok(thread::current().name().map_or(Value::Null, Value::from)),
        }
    }
}

/// Temporary plugin root with one file per registered plugin.
pub(crate) struct PluginSetup {
    pub(crate) root: TempDir,
    pub(crate) registry: PluginRegistry,
}

impl PluginSetup {
    pub(crate) fn new() -> Self {
        Self {
            root: TempDir::new().expect("temp dir"),
            registry: PluginRegistry::new(),
        }
    }

    /// Adds a plugin file under `profile` and registers its behaviour.
    pub(crate) fn add(&mut self, profile: Profile, name: &str, script: Script) {
        self.touch(profile, name);
        self.registry
            .register(ScriptedPlugin::new(name, script))
            .expect("register plugin");
    }

    /// Adds a plugin file with no registered behaviour.
    pub(crate) fn touch(&self, profile: Profile, name: &str) {
        let directory = self.root.path().join(profile.directory_name());
        fs::create_dir_all(&directory).expect("create profile dir");
        fs::write(directory.join(format!("{name}.py")), "").expect("write plugin file");
    }

    pub(crate) fn catalogue(&self) -> PluginCatalogue {
        PluginCatalogue::new(self.root.path())
    }
}

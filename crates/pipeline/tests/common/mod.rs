//! Recording fakes for the host engine, transport, uploader and history.
//!
//! Engine, transport and uploader append to one shared journal so tests
//! can assert the order of side effects across collaborators.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use genflow_client::{JobClient, JobTransport, PollConfig, SubmitReceipt, SubmitRequest, Uploader};
use genflow_core::{Dimensions, GenerationError, HistoryEntry, Job, JobStatus};
use genflow_pipeline::{
    BlobRegistry, GenerationOrchestrator, HistoryStore, HostEngine, InMemoryHistory, LifecycleState,
    PlaceholderHandle, ResourceStager,
};
use serde_json::Value;

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

fn note(journal: &Journal, entry: impl Into<String>) {
    journal.lock().unwrap().push(entry.into());
}

// ---------------------------------------------------------------------------
// Host engine
// ---------------------------------------------------------------------------

pub struct FakeEngine {
    journal: Journal,
    next_id: AtomicUsize,
    states: Mutex<HashMap<PlaceholderHandle, Vec<LifecycleState>>>,
    committed: Mutex<Vec<(PlaceholderHandle, String)>>,
    buffers: Mutex<HashMap<String, (Vec<u8>, String)>>,
    pub fail_create: bool,
    pub fail_commit: bool,
}

impl FakeEngine {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            next_id: AtomicUsize::new(1),
            states: Mutex::new(HashMap::new()),
            committed: Mutex::new(Vec::new()),
            buffers: Mutex::new(HashMap::new()),
            fail_create: false,
            fail_commit: false,
        }
    }

    pub fn with_buffer(self, id: &str, bytes: Vec<u8>, mime_type: &str) -> Self {
        self.buffers
            .lock()
            .unwrap()
            .insert(id.to_string(), (bytes, mime_type.to_string()));
        self
    }

    pub fn states(&self, handle: &PlaceholderHandle) -> Vec<LifecycleState> {
        self.states.lock().unwrap().get(handle).cloned().unwrap_or_default()
    }

    /// States of the only placeholder created so far.
    pub fn only_states(&self) -> Vec<LifecycleState> {
        let states = self.states.lock().unwrap();
        assert_eq!(states.len(), 1, "expected exactly one placeholder");
        states.values().next().cloned().unwrap_or_default()
    }

    pub fn committed(&self) -> Vec<(PlaceholderHandle, String)> {
        self.committed.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostEngine for FakeEngine {
    async fn create_placeholder(
        &self,
        dimensions: Dimensions,
    ) -> Result<PlaceholderHandle, GenerationError> {
        if self.fail_create {
            return Err(GenerationError::Host("canvas is read-only".into()));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let handle = PlaceholderHandle::new(format!("ph-{id}"));
        note(&self.journal, format!("create:{dimensions}"));
        self.states.lock().unwrap().insert(handle.clone(), Vec::new());
        Ok(handle)
    }

    async fn tag_state(
        &self,
        handle: &PlaceholderHandle,
        state: &LifecycleState,
    ) -> Result<(), GenerationError> {
        note(&self.journal, format!("tag:{}", state.as_str()));
        self.states
            .lock()
            .unwrap()
            .entry(handle.clone())
            .or_default()
            .push(state.clone());
        Ok(())
    }

    async fn commit_content(
        &self,
        handle: &PlaceholderHandle,
        url: &str,
    ) -> Result<(), GenerationError> {
        if self.fail_commit {
            return Err(GenerationError::Host("placeholder was deleted".into()));
        }
        note(&self.journal, format!("commit:{url}"));
        self.committed.lock().unwrap().push((handle.clone(), url.to_string()));
        Ok(())
    }

    async fn read_buffer(&self, buffer_id: &str) -> Result<Vec<u8>, GenerationError> {
        self.buffers
            .lock()
            .unwrap()
            .get(buffer_id)
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| GenerationError::Host(format!("no buffer {buffer_id}")))
    }

    async fn mime_type(&self, buffer_id: &str) -> Result<String, GenerationError> {
        self.buffers
            .lock()
            .unwrap()
            .get(buffer_id)
            .map(|(_, mime)| mime.clone())
            .ok_or_else(|| GenerationError::Host(format!("no buffer {buffer_id}")))
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub struct ScriptedTransport {
    journal: Journal,
    receipt: Mutex<Result<SubmitReceipt, GenerationError>>,
    statuses: Mutex<VecDeque<Result<Job, GenerationError>>>,
    pub submitted: Mutex<Vec<SubmitRequest>>,
    pub submits: AtomicU32,
    pub polls: AtomicU32,
}

impl ScriptedTransport {
    pub fn new(journal: &Journal, receipt: Result<SubmitReceipt, GenerationError>) -> Self {
        Self {
            journal: journal.clone(),
            receipt: Mutex::new(receipt),
            statuses: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            submits: AtomicU32::new(0),
            polls: AtomicU32::new(0),
        }
    }

    /// Accepts submissions as job `j1` and replays `statuses`, repeating
    /// the last one.
    pub fn accepting(
        journal: &Journal,
        statuses: impl IntoIterator<Item = Result<Job, GenerationError>>,
    ) -> Self {
        let transport = Self::new(journal, Ok(SubmitReceipt::new("j1")));
        transport.statuses.lock().unwrap().extend(statuses);
        transport
    }

    pub fn calls(&self) -> u32 {
        self.submits.load(Ordering::SeqCst) + self.polls.load(Ordering::SeqCst)
    }

    pub fn last_input(&self) -> Option<Value> {
        self.submitted.lock().unwrap().last().map(|r| r.input.clone())
    }
}

#[async_trait]
impl JobTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    fn default_poll_config(&self) -> PollConfig {
        PollConfig::new(Duration::from_secs(2), 150)
    }

    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitReceipt, GenerationError> {
        note(&self.journal, "submit");
        self.submits.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(request.clone());
        self.receipt.lock().unwrap().clone()
    }

    async fn fetch_status(&self, _job_id: &str) -> Result<Job, GenerationError> {
        note(&self.journal, "poll");
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(Job::new("j1", JobStatus::Processing)))
        }
    }
}

pub fn processing() -> Result<Job, GenerationError> {
    Ok(Job::new("j1", JobStatus::Processing))
}

pub fn success(output: Value) -> Result<Job, GenerationError> {
    let mut job = Job::new("j1", JobStatus::Success);
    job.raw_output = Some(output);
    Ok(job)
}

pub fn failed(message: &str) -> Result<Job, GenerationError> {
    let mut job = Job::new("j1", JobStatus::Failed);
    job.error_message = Some(message.to_string());
    Ok(job)
}

// ---------------------------------------------------------------------------
// Uploader and history
// ---------------------------------------------------------------------------

pub struct FakeUploader {
    journal: Journal,
    pub uploads: Mutex<Vec<(Vec<u8>, String, String)>>,
    pub fail: bool,
}

impl FakeUploader {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            uploads: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl Uploader for FakeUploader {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        file_name: &str,
    ) -> Result<String, GenerationError> {
        note(&self.journal, "upload");
        if self.fail {
            return Err(GenerationError::Staging("Upload failed (503): unavailable".into()));
        }
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((bytes, mime_type.to_string(), file_name.to_string()));
        Ok(format!("https://uploads.test/{}", uploads.len()))
    }
}

pub struct FailingHistory;

#[async_trait]
impl HistoryStore for FailingHistory {
    async fn append(&self, _entry: HistoryEntry) -> Result<(), GenerationError> {
        Err(GenerationError::History("history store offline".into()))
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Poll every second, at most five times.
pub fn fast_poll() -> PollConfig {
    PollConfig::new(Duration::from_secs(1), 5)
}

pub struct Harness {
    pub journal: Journal,
    pub engine: Arc<FakeEngine>,
    pub transport: Arc<ScriptedTransport>,
    pub uploader: Arc<FakeUploader>,
    pub blobs: Arc<BlobRegistry>,
    pub history: Arc<InMemoryHistory>,
}

impl Harness {
    pub fn new(journal: Journal, engine: FakeEngine, transport: ScriptedTransport) -> Self {
        let uploader = FakeUploader::new(&journal);
        Self::with_uploader(journal, engine, transport, uploader)
    }

    pub fn with_uploader(
        journal: Journal,
        engine: FakeEngine,
        transport: ScriptedTransport,
        uploader: FakeUploader,
    ) -> Self {
        Self {
            journal,
            engine: Arc::new(engine),
            transport: Arc::new(transport),
            uploader: Arc::new(uploader),
            blobs: Arc::new(BlobRegistry::new()),
            history: Arc::new(InMemoryHistory::new()),
        }
    }

    pub fn stager(&self) -> Arc<ResourceStager> {
        Arc::new(ResourceStager::new(
            self.uploader.clone(),
            self.engine.clone(),
            self.blobs.clone(),
        ))
    }

    /// Orchestrator with staging enabled and the fast poll config.
    pub fn orchestrator(&self) -> GenerationOrchestrator {
        let client = JobClient::new(self.transport.clone()).with_poll_config(fast_poll());
        GenerationOrchestrator::new(self.engine.clone(), client, self.history.clone())
            .with_stager(self.stager())
    }

    pub fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }
}

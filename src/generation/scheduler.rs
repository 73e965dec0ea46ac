//! Single-worker generation scheduler
//!
//! At most one request executes at a time; the rest wait in FIFO order.
//! The scheduler hands out `GenerationJob`s instead of spawning them, so
//! whoever owns the interactive context runs the job and feeds its
//! outcome back before the next one is released:
//!
//! ```text
//! submit() -> Some(job)   idle -> running, caller runs the job
//! submit() -> None        already running, request queued
//! finish() -> Some(job)   next queued request, still running
//! finish() -> None        queue empty, back to idle
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task;
use tracing::{debug, info, warn};

use super::pipeline::{GenerationPipeline, GenerationRequest};
use crate::error::GenerationError;
use crate::state::data::ImageRecord;

#[derive(Debug, Default)]
struct SchedulerState {
    running: bool,
    queue: VecDeque<(u64, GenerationRequest)>,
    next_ticket: u64,
}

type SharedState = Arc<Mutex<SchedulerState>>;

fn lock_state(state: &Mutex<SchedulerState>) -> MutexGuard<'_, SchedulerState> {
    // The state is a flag and a queue; a panic elsewhere cannot leave it torn
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
pub struct GenerationScheduler {
    pipeline: Arc<Mutex<GenerationPipeline>>,
    state: SharedState,
}

impl GenerationScheduler {
    pub fn new(pipeline: GenerationPipeline) -> Self {
        Self {
            pipeline: Arc::new(Mutex::new(pipeline)),
            state: Arc::new(Mutex::new(SchedulerState::default())),
        }
    }

    /// Submit a request. Returns the job to run if the worker was idle,
    /// `None` if the request was queued behind the running one.
    ///
    /// An idle worker with a backlog (left by a dropped job) starts the
    /// oldest waiting request instead, so FIFO order holds.
    #[must_use = "the returned job must be run or the request stalls until the next submit"]
    pub fn submit(&self, request: GenerationRequest) -> Option<GenerationJob> {
        let mut state = lock_state(&self.state);
        let ticket = state.next_ticket;
        state.next_ticket += 1;
        state.queue.push_back((ticket, request));

        if state.running {
            debug!("Queued generation #{} ({} waiting)", ticket, state.queue.len());
            return None;
        }

        let (ticket, request) = state.queue.pop_front()?;
        state.running = true;
        Some(self.job(ticket, request))
    }

    /// Called once the previous job's outcome has been applied.
    /// Releases the next queued request, or goes idle.
    #[must_use = "the returned job must be run or the queue stalls"]
    pub fn finish(&self) -> Option<GenerationJob> {
        let mut state = lock_state(&self.state);
        match state.queue.pop_front() {
            Some((ticket, request)) => {
                debug!("Dequeued generation #{} ({} still waiting)", ticket, state.queue.len());
                Some(self.job(ticket, request))
            }
            None => {
                state.running = false;
                debug!("Generation worker idle");
                None
            }
        }
    }

    /// Whether a job is currently out for execution
    pub fn is_running(&self) -> bool {
        lock_state(&self.state).running
    }

    /// Requests waiting behind the running job
    pub fn queued(&self) -> usize {
        lock_state(&self.state).queue.len()
    }

    fn job(&self, ticket: u64, request: GenerationRequest) -> GenerationJob {
        GenerationJob {
            ticket,
            request,
            pipeline: Arc::clone(&self.pipeline),
            state: Arc::clone(&self.state),
            armed: true,
        }
    }
}

/// A request released by the scheduler, ready to run off the interactive thread.
///
/// Dropping a job without running it puts its request back at the head of
/// the queue and frees the worker; the next `submit` picks it up again.
#[derive(Debug)]
#[must_use = "a generation job does nothing unless it is run"]
pub struct GenerationJob {
    ticket: u64,
    request: GenerationRequest,
    pipeline: Arc<Mutex<GenerationPipeline>>,
    state: SharedState,
    armed: bool,
}

/// Result of running a `GenerationJob`
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub ticket: u64,
    pub result: Result<ImageRecord, GenerationError>,
}

impl GenerationJob {
    /// Execute the request on a blocking worker thread.
    ///
    /// Never fails outright: every error, including a panic in the
    /// synthesizer, comes back inside the outcome.
    pub async fn run(mut self) -> GenerationOutcome {
        self.armed = false;
        let ticket = self.ticket;
        let request = self.request.clone();
        let pipeline = Arc::clone(&self.pipeline);

        info!("🎨 Starting generation #{}", ticket);

        let result = task::spawn_blocking(move || {
            // A panic mid-request fails only that request
            let mut pipeline = pipeline.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            pipeline.execute(&request)
        })
        .await
        .map_err(|e| GenerationError::WorkerPanicked(e.to_string()))
        .and_then(|result| result);

        GenerationOutcome { ticket, result }
    }
}

impl Drop for GenerationJob {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!("Generation #{} dropped before running, requeueing", self.ticket);
        let mut state = lock_state(&self.state);
        state.queue.push_front((self.ticket, self.request.clone()));
        state.running = false;
    }
}

// lifecycle.rs — cooperative start/stop for the two worker threads.
//
// Idle -> Running -> StopRequested -> Stopped. Both workers receive a clone
// of the shared stop flag and check it at the top of every loop iteration.
// Join has no timeout, so a worker whose blocking calls are not bounded will
// hang shutdown; every blocking call in a worker loop must carry one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::data_log::TickRecord;

/// Shared cancellation signal, cloned into each worker.
#[derive(Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        StopFlag(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    StopRequested,
    Stopped,
}

pub struct LifecycleController {
    stop: StopFlag,
    state: RunState,
    ingestion: Option<JoinHandle<()>>,
    control: Option<JoinHandle<Vec<TickRecord>>>,
}

impl LifecycleController {
    pub fn new() -> Self {
        LifecycleController {
            stop: StopFlag::new(),
            state: RunState::Idle,
            ingestion: None,
            control: None,
        }
    }

    /// The flag workers should observe; clone it into them before `start`.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Spawn both workers as independent OS threads.
    pub fn start<I, C>(&mut self, ingestion: I, control: C)
    where
        I: FnOnce() + Send + 'static,
        C: FnOnce() -> Vec<TickRecord> + Send + 'static,
    {
        if self.state != RunState::Idle {
            log::warn!("start ignored in state {:?}", self.state);
            return;
        }
        self.ingestion = Some(thread::spawn(ingestion));
        self.control = Some(thread::spawn(control));
        self.state = RunState::Running;
    }

    /// Signal both workers to finish their current iteration and exit.
    pub fn request_stop(&mut self) {
        if self.state == RunState::Running {
            self.stop.set();
            self.state = RunState::StopRequested;
        }
    }

    /// Wait for both workers, then hand back the control worker's tick
    /// records for the shutdown flush.
    pub fn join(&mut self) -> Vec<TickRecord> {
        if let Some(handle) = self.ingestion.take() {
            if handle.join().is_err() {
                log::error!("ingestion worker panicked");
            }
        }
        let records = match self.control.take() {
            Some(handle) => match handle.join() {
                Ok(records) => records,
                Err(_) => {
                    log::error!("control worker panicked, log records lost");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        self.state = RunState::Stopped;
        records
    }
}

impl Default for LifecycleController {
    fn default() -> Self {
        Self::new()
    }
}

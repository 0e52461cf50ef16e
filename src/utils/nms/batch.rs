use crate::utils::box_set::BoxSet;
use crate::utils::nms::options::NmsOptions;
use crate::utils::nms::{SuppressionEngine, SuppressionReport};
use crate::{Errors, Result};
use anyhow::Context;
use crossbeam::channel::{Receiver, Sender};
use log::{debug, warn};
use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{spawn, JoinHandle};

pub type BatchRecords = HashMap<u64, BoxSet>;
pub type SceneSurvivors = (u64, SuppressionReport);

/// Scenes submitted together; each scene is suppressed independently of the others
///
#[derive(Debug)]
pub struct BatchRequest {
    batch: BatchRecords,
    sender: Sender<SceneSurvivors>,
    batch_size: Arc<AtomicUsize>,
}

/// Receiving side of a [`BatchRequest`]
///
#[derive(Clone, Debug)]
pub struct BatchResult {
    receiver: Receiver<SceneSurvivors>,
    batch_size: Arc<AtomicUsize>,
}

impl BatchResult {
    pub fn ready(&self) -> bool {
        !self.receiver.is_empty()
    }

    /// Blocks until the next scene is processed
    ///
    pub fn get(&self) -> anyhow::Result<SceneSurvivors> {
        self.receiver
            .recv()
            .context("NMS workers stopped before delivering every scene of the batch")
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.load(Ordering::Acquire)
    }
}

impl BatchRequest {
    pub fn new() -> (Self, BatchResult) {
        let (sender, receiver) = crossbeam::channel::unbounded();
        let batch_size = Arc::new(AtomicUsize::new(0));
        (
            Self {
                batch: BatchRecords::default(),
                sender,
                batch_size: batch_size.clone(),
            },
            BatchResult {
                receiver,
                batch_size,
            },
        )
    }

    /// Adds a scene; a scene added twice replaces the previous candidates
    ///
    pub fn add(&mut self, scene_id: u64, set: BoxSet) {
        self.batch.insert(scene_id, set);
        self.batch_size.store(self.batch.len(), Ordering::Release);
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.load(Ordering::Acquire)
    }

    pub fn get_batch(&self) -> &BatchRecords {
        &self.batch
    }
}

enum WorkerCommands {
    Suppress {
        scene_id: u64,
        set: BoxSet,
        channel: Sender<SceneSurvivors>,
    },
    Exit,
}

fn worker_thread(engine: Arc<SuppressionEngine>, rx: Receiver<WorkerCommands>) {
    while let Ok(command) = rx.recv() {
        match command {
            WorkerCommands::Suppress {
                scene_id,
                set,
                channel,
            } => {
                let report = engine.run(&set);
                if let Err(e) = channel.send((scene_id, report)) {
                    warn!("Unable to send results to a caller, likely the caller already closed the channel. Error is: {:?}", e);
                }
            }
            WorkerCommands::Exit => break,
        }
    }
}

/// Pool of threads, each running whole suppression passes.
///
/// Passes share nothing but the immutable engine, so scenes are dispatched round-robin
/// without any coordination between workers.
///
pub struct BatchNms {
    engine: Arc<SuppressionEngine>,
    workers: Vec<(Sender<WorkerCommands>, JoinHandle<()>)>,
    next_worker: usize,
}

impl Drop for BatchNms {
    fn drop(&mut self) {
        let workers = mem::take(&mut self.workers);
        for (tx, t) in workers {
            if tx.send(WorkerCommands::Exit).is_err() {
                warn!("NMS worker exited before the pool was dropped");
            }
            drop(tx);
            if t.join().is_err() {
                warn!("NMS worker panicked");
            }
        }
    }
}

impl BatchNms {
    /// Creates the pool with one worker per CPU core
    ///
    pub fn with_options(options: NmsOptions) -> Result<Self> {
        Self::new(num_cpus::get(), options)
    }

    pub fn new(workers: usize, options: NmsOptions) -> Result<Self> {
        if workers == 0 {
            return Err(Errors::ConfigurationError {
                parameter: "workers",
                reason: "at least one worker is required".into(),
            });
        }
        let engine = Arc::new(SuppressionEngine::new(options)?);
        let workers = (0..workers)
            .map(|_| {
                let (tx, rx) = crossbeam::channel::unbounded();
                let thread_engine = engine.clone();
                (tx, spawn(move || worker_thread(thread_engine, rx)))
            })
            .collect::<Vec<_>>();

        Ok(Self {
            engine,
            workers,
            next_worker: 0,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    pub fn options(&self) -> &NmsOptions {
        self.engine.options()
    }

    /// Dispatches every scene of the request; results arrive on the paired [`BatchResult`]
    /// in completion order
    ///
    pub fn process(&mut self, request: BatchRequest) {
        let BatchRequest { batch, sender, .. } = request;
        debug!("Dispatching a batch of {} scenes", batch.len());
        for (scene_id, set) in batch {
            let (tx, _) = &self.workers[self.next_worker];
            self.next_worker = (self.next_worker + 1) % self.workers.len();
            let command = WorkerCommands::Suppress {
                scene_id,
                set,
                channel: sender.clone(),
            };
            if tx.send(command).is_err() {
                warn!("NMS worker is gone, scene {} is dropped", scene_id);
            }
        }
    }
}

//! Worker pool running stage jobs on background threads.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error, info};

use crate::db::Database;
use crate::pipeline::StageRunner;
use crate::stages::AiStage;
use crate::worker::job::{StageJob, StageResult};

pub struct StagePool {
    job_sender: Sender<StageJob>,
    result_receiver: Receiver<StageResult>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl StagePool {
    /// Starts `worker_count` workers.
    ///
    /// `inflight` is shared with the orchestrator; a worker removes the
    /// document id after its job finishes, success or not.
    ///
    /// # Panics
    /// Panics if `worker_count` is 0.
    pub fn new(
        db: Database,
        ai: Arc<dyn AiStage>,
        worker_count: usize,
        inflight: Arc<Mutex<HashSet<String>>>,
    ) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (job_sender, job_receiver) = bounded::<StageJob>(worker_count * 2);
        let (result_sender, result_receiver) = bounded::<StageResult>(worker_count * 2);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let job_rx = job_receiver.clone();
            let result_tx = result_sender.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let runner = StageRunner::new(db.clone(), Arc::clone(&ai));
            let inflight = Arc::clone(&inflight);

            let handle = thread::spawn(move || {
                run_worker(worker_id, job_rx, result_tx, shutdown_flag, runner, inflight);
            });

            workers.push(handle);
        }

        info!("Started {} stage workers", worker_count);

        Self {
            job_sender,
            result_receiver,
            workers,
            shutdown,
        }
    }

    pub fn submit(&self, job: StageJob) -> Result<(), crossbeam_channel::SendError<StageJob>> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(crossbeam_channel::SendError(job));
        }
        self.job_sender.send(job)
    }

    pub fn try_recv_result(&self) -> Option<StageResult> {
        self.result_receiver.try_recv().ok()
    }

    pub fn recv_result(&self) -> Option<StageResult> {
        self.result_receiver.recv().ok()
    }

    pub fn shutdown(&self) {
        info!("Shutting down stage pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn wait(self) {
        // Drop sender to signal workers to exit
        drop(self.job_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All stage workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    job_receiver: Receiver<StageJob>,
    result_sender: Sender<StageResult>,
    shutdown: Arc<AtomicBool>,
    runner: StageRunner,
    inflight: Arc<Mutex<HashSet<String>>>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            break;
        }

        match job_receiver.recv_timeout(std::time::Duration::from_millis(100)) {
            Ok(job) => {
                debug!(
                    "Worker {} running {} on document {}",
                    worker_id, job.operation, job.document_id
                );

                let result = runner.run(&job);

                // Release the re-entrancy guard before reporting, so a
                // caller seeing the result can immediately trigger the
                // next stage.
                match inflight.lock() {
                    Ok(mut guard) => {
                        guard.remove(&job.document_id);
                    }
                    Err(poisoned) => {
                        log::warn!("In-flight set lock poisoned, recovering");
                        poisoned.into_inner().remove(&job.document_id);
                    }
                }

                if let Err(e) = result_sender.send(result) {
                    error!("Worker {} failed to send result: {}", worker_id, e);
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} job channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

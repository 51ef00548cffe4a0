//! # Bounded Worker Pool
//!
//! One generic executor for every checker instead of per-checker task
//! plumbing. A fixed number of workers drain a job channel, run the
//! executor, and publish results; a shared [`CancellationToken`] tears the
//! whole pool down mid-flight.
//!
//! Channels are rendezvous-sized, so a slow result consumer stalls both the
//! workers and job intake — backpressure is cooperative and there is no
//! hidden queue. Each job is taken by exactly one worker and yields exactly
//! one result; nothing orders results relative to submission.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

pub struct PoolOpt {
    pub workers: usize,
    pub cancel: CancellationToken,
}

/// Spawns the workers and hands back the result stream. The stream closes
/// once every worker has exited — because the job channel drained or the
/// token fired.
pub fn start<J, R, F, Fut>(
    opt: PoolOpt,
    jobs: mpsc::Receiver<J>,
    executor: F,
) -> mpsc::Receiver<R>
where
    J: Send + 'static,
    R: Send + 'static,
    F: Fn(J) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::channel(1);
    let jobs = Arc::new(Mutex::new(jobs));

    for _ in 0..opt.workers.max(1) {
        let jobs = Arc::clone(&jobs);
        let out = out_tx.clone();
        let cancel = opt.cancel.clone();
        let executor = executor.clone();

        tokio::spawn(async move {
            loop {
                // The intake lock makes each job visible to exactly one
                // worker; it is released before the job runs.
                let job = {
                    let mut rx = jobs.lock().await;
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        job = rx.recv() => job,
                    }
                };

                let Some(job) = job else { return };
                let result = executor(job).await;

                tokio::select! {
                    _ = cancel.cancelled() => return,
                    sent = out.send(result) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }
        });
    }

    // Workers hold the only senders; the last one to exit closes the stream.
    out_rx
}

/// Feeds a job list into `tx` until it is exhausted or the token fires,
/// then closes the channel by dropping the sender.
pub async fn push_and_close<J: Send>(
    cancel: CancellationToken,
    tx: mpsc::Sender<J>,
    jobs: Vec<J>,
) {
    for job in jobs {
        tokio::select! {
            _ = cancel.cancelled() => break,
            sent = tx.send(job) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

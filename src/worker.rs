use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::dict::Dictionary;
use crate::error::WorkerError;
use crate::game::board::Grid;
use crate::game::solver::{Quality, SolvedMap};
use crate::search::{GridSearch, PreparedRound, RoundPlan};

/// Work the pool can offload to its background thread.
#[derive(Debug)]
enum Job {
    Prepare {
        size: usize,
        round_number: u64,
        plan: RoundPlan,
    },
    Analyze {
        grid: Grid,
    },
    #[cfg(test)]
    Poison,
}

#[derive(Debug)]
enum JobOutput {
    Prepared(PreparedRound),
    Analysis(SolvedMap, Quality),
}

type Reply = oneshot::Sender<Result<JobOutput, WorkerError>>;

/// Healthy holds the live channel into the worker thread; Recovering means
/// the worker died and its replacement is not up yet.
enum PoolState {
    Healthy(std_mpsc::Sender<(u64, Job)>),
    Recovering,
}

struct PoolShared {
    state: PoolState,
    pending: HashMap<u64, Reply>,
}

/// Runs grid searches on exactly one persistent background thread so they
/// never stall the room tasks. Requests are correlated by integer id; a
/// worker crash rejects everything pending and respawns the thread.
pub struct SearchPool {
    shared: Arc<Mutex<PoolShared>>,
    next_id: AtomicU64,
}

impl SearchPool {
    pub fn spawn(dict: Arc<Dictionary>) -> Arc<Self> {
        let shared = Arc::new(Mutex::new(PoolShared {
            state: PoolState::Recovering,
            pending: HashMap::new(),
        }));
        spawn_worker(&shared, &dict);
        Arc::new(Self {
            shared,
            next_id: AtomicU64::new(1),
        })
    }

    pub async fn prepare_round(
        &self,
        size: usize,
        round_number: u64,
        plan: RoundPlan,
    ) -> Result<PreparedRound, WorkerError> {
        match self
            .request(Job::Prepare {
                size,
                round_number,
                plan,
            })
            .await?
        {
            JobOutput::Prepared(prepared) => Ok(prepared),
            _ => Err(WorkerError::Crashed),
        }
    }

    pub async fn analyze_grid(&self, grid: Grid) -> Result<(SolvedMap, Quality), WorkerError> {
        match self.request(Job::Analyze { grid }).await? {
            JobOutput::Analysis(solved, quality) => Ok((solved, quality)),
            _ => Err(WorkerError::Crashed),
        }
    }

    async fn request(&self, job: Job) -> Result<JobOutput, WorkerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut shared = self.shared.lock().expect("pool lock");
            let sent = match &shared.state {
                PoolState::Healthy(to_worker) => to_worker.send((id, job)).is_ok(),
                PoolState::Recovering => false,
            };
            if !sent {
                return Err(WorkerError::Unavailable);
            }
            shared.pending.insert(id, reply_tx);
        }
        reply_rx.await.map_err(|_| WorkerError::Crashed)?
    }
}

fn spawn_worker(shared: &Arc<Mutex<PoolShared>>, dict: &Arc<Dictionary>) {
    let (job_tx, job_rx) = std_mpsc::channel::<(u64, Job)>();
    let (out_tx, out_rx) = mpsc::unbounded_channel::<(u64, JobOutput)>();

    let worker_dict = dict.clone();
    let spawned = std::thread::Builder::new()
        .name("grid-search".to_string())
        .spawn(move || worker_loop(job_rx, out_tx, worker_dict));

    match spawned {
        Ok(_) => {
            shared.lock().expect("pool lock").state = PoolState::Healthy(job_tx);
            info!("grid search worker started");
            tokio::spawn(supervise(Arc::downgrade(shared), dict.clone(), out_rx));
        }
        Err(e) => {
            error!("failed to start grid search worker: {e}");
            let weak = Arc::downgrade(shared);
            let dict = dict.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                if let Some(shared) = weak.upgrade() {
                    spawn_worker(&shared, &dict);
                }
            });
        }
    }
}

/// Forwards worker results to their callers and handles the worker's death:
/// reject every pending request, flip to Recovering, respawn.
async fn supervise(
    weak: Weak<Mutex<PoolShared>>,
    dict: Arc<Dictionary>,
    mut out_rx: mpsc::UnboundedReceiver<(u64, JobOutput)>,
) {
    while let Some((id, output)) = out_rx.recv().await {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let reply = shared.lock().expect("pool lock").pending.remove(&id);
        if let Some(reply) = reply {
            let _ = reply.send(Ok(output));
        }
    }

    let Some(shared) = weak.upgrade() else {
        return;
    };
    {
        let mut shared = shared.lock().expect("pool lock");
        shared.state = PoolState::Recovering;
        for (_, reply) in shared.pending.drain() {
            let _ = reply.send(Err(WorkerError::Crashed));
        }
    }
    warn!("grid search worker exited, respawning");
    spawn_worker(&shared, &dict);
}

fn worker_loop(
    job_rx: std_mpsc::Receiver<(u64, Job)>,
    out_tx: mpsc::UnboundedSender<(u64, JobOutput)>,
    dict: Arc<Dictionary>,
) {
    let search = GridSearch::new(dict);
    let mut rng = rand::thread_rng();
    while let Ok((id, job)) = job_rx.recv() {
        let output = run_job(&search, job, &mut rng);
        if out_tx.send((id, output)).is_err() {
            break;
        }
    }
}

fn run_job<R: rand::Rng>(search: &GridSearch, job: Job, rng: &mut R) -> JobOutput {
    match job {
        Job::Prepare {
            size,
            round_number,
            plan,
        } => JobOutput::Prepared(search.prepare(size, round_number, plan, rng)),
        Job::Analyze { grid } => {
            let (solved, quality) = search.analyze(&grid);
            JobOutput::Analysis(solved, quality)
        }
        #[cfg(test)]
        Job::Poison => panic!("poison job"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_pool() -> Arc<SearchPool> {
        SearchPool::spawn(Arc::new(Dictionary::from(vec!["cat", "dog", "tres"])))
    }

    #[tokio::test]
    async fn test_prepare_round_returns_grid() {
        let pool = test_pool();
        let prepared = pool
            .prepare_round(4, 1, RoundPlan::normal(0))
            .await
            .unwrap();
        assert_eq!(prepared.grid.cell_count(), 16);
        assert_eq!(prepared.round_number, 1);
    }

    #[tokio::test]
    async fn test_analyze_grid() {
        let pool = test_pool();
        let grid = crate::game::board::grid_from(3, "catxxxxxx");
        let (solved, quality) = pool.analyze_grid(grid).await.unwrap();
        assert!(solved.contains_key("cat"));
        assert_eq!(quality.words, solved.len());
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_worker() {
        let pool = test_pool();
        let (a, b) = tokio::join!(
            pool.prepare_round(4, 1, RoundPlan::normal(0)),
            pool.prepare_round(5, 2, RoundPlan::normal(0)),
        );
        assert_eq!(a.unwrap().grid.cell_count(), 16);
        assert_eq!(b.unwrap().grid.cell_count(), 25);
    }

    #[tokio::test]
    async fn test_crash_rejects_and_respawns() {
        let pool = test_pool();
        let err = pool.request(Job::Poison).await.unwrap_err();
        assert_eq!(err, WorkerError::Crashed);

        // the replacement worker must come up on its own
        let mut recovered = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if pool
                .prepare_round(4, 1, RoundPlan::normal(0))
                .await
                .is_ok()
            {
                recovered = true;
                break;
            }
        }
        assert!(recovered, "pool never recovered after a worker crash");
    }
}

//! The per-shard actor: a dedicated OS thread running a current-thread
//! tokio runtime, owning its [`ShardState`] with no `Arc<Mutex<_>>`
//! anywhere. Every mutation reaches the shard as a boxed closure sent
//! over a channel and run to completion before the next one starts, so
//! there is never more than one writer touching a shard's data at a
//! time — cross-shard work is message passing, not locking.

use crate::Error;
use graph_store::{NodeStore, RelationshipStore};
use tokio::sync::{mpsc, oneshot};

pub struct ShardState {
    pub id: u16,
    pub nodes: NodeStore,
    pub relationships: RelationshipStore,
}

type Job = Box<dyn FnOnce(&mut ShardState) + Send + 'static>;

/// A cheap, cloneable reference to a running shard actor's inbox.
#[derive(Clone)]
pub struct ShardHandle {
    id: u16,
    jobs: mpsc::UnboundedSender<Job>,
}

impl ShardHandle {
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Runs `f` against the shard's state and returns its result. The
    /// closure executes on the shard's own thread; only its return
    /// value crosses back.
    pub async fn invoke<R, F>(&self, f: F) -> Result<R, Error>
    where
        F: FnOnce(&mut ShardState) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |state| {
            let result = f(state);
            let _ = reply_tx.send(result);
        });
        self.jobs.send(job).map_err(|_| Error::ShardGone)?;
        reply_rx.await.map_err(|_| Error::ShardGone)
    }
}

/// A running shard actor's thread handle and a handle to its inbox. The
/// thread exits once every [`ShardHandle`] clone for it is dropped,
/// closing the channel.
pub struct ShardThread {
    pub handle: ShardHandle,
    join: std::thread::JoinHandle<()>,
}

impl ShardThread {
    pub fn join(self) {
        let _ = self.join.join();
    }
}

/// Spawns a shard actor on its own OS thread with an empty
/// [`NodeStore`]/[`RelationshipStore`] pair.
pub fn spawn(id: u16) -> ShardThread {
    let (jobs_tx, mut jobs_rx) = mpsc::unbounded_channel::<Job>();

    let join = std::thread::Builder::new()
        .name(format!("graph-shard-{id}"))
        .spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("failed to build shard runtime");

            let mut state = ShardState {
                id,
                nodes: NodeStore::new(id),
                relationships: RelationshipStore::new(id),
            };

            runtime.block_on(async {
                while let Some(job) = jobs_rx.recv().await {
                    job(&mut state);
                }
            });

            tracing::info!(shard = id, "shard actor stopped");
        })
        .expect("failed to spawn shard thread");

    ShardThread {
        handle: ShardHandle { id, jobs: jobs_tx },
        join,
    }
}

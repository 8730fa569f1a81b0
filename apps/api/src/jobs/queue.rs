use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::{Job, JobEnvelope};

/// Redis list holding pending job envelopes. LPUSH in, BLMOVE out.
pub const QUEUE_KEY: &str = "studio:jobs";
/// Envelopes claimed by a worker and not yet acknowledged.
pub const PROCESSING_KEY: &str = "studio:jobs:processing";

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Returns the job id. Fire-and-forget: there is no handle to wait on or cancel.
    async fn enqueue(&self, job: Job) -> Result<Uuid, AppError>;
}

/// A job moved onto the processing list. `payload` is the exact list entry,
/// needed to acknowledge it.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub envelope: JobEnvelope,
    payload: String,
}

#[derive(Clone)]
pub struct RedisJobQueue {
    client: redis::Client,
}

impl RedisJobQueue {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    /// A dedicated connection for one worker; BLMOVE blocks the whole connection.
    pub async fn connect(&self) -> Result<MultiplexedConnection, AppError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    /// Moves every unacknowledged envelope back onto the queue. Called once at
    /// startup, before any worker runs, so jobs claimed by a process that died
    /// are delivered again.
    pub async fn requeue_unacknowledged(&self) -> Result<usize, AppError> {
        let mut conn = self.connect().await?;
        let mut moved = 0;
        loop {
            let entry: Option<String> = redis::cmd("LMOVE")
                .arg(PROCESSING_KEY)
                .arg(QUEUE_KEY)
                .arg("RIGHT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;
            if entry.is_none() {
                break;
            }
            moved += 1;
        }
        if moved > 0 {
            warn!("Requeued {moved} unacknowledged job(s)");
        }
        Ok(moved)
    }

    /// Waits up to `timeout` for the next envelope and moves it to the
    /// processing list. Undecodable payloads are acknowledged and dropped. An
    /// error means the connection is no longer usable.
    pub async fn claim(
        &self,
        conn: &mut MultiplexedConnection,
        timeout: Duration,
    ) -> Result<Option<ClaimedJob>, AppError> {
        let payload: Option<String> = redis::cmd("BLMOVE")
            .arg(QUEUE_KEY)
            .arg(PROCESSING_KEY)
            .arg("RIGHT")
            .arg("LEFT")
            .arg(timeout.as_secs().max(1))
            .query_async(conn)
            .await?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        match decode_envelope(&payload) {
            Some(envelope) => Ok(Some(ClaimedJob { envelope, payload })),
            None => {
                self.remove_processing(conn, &payload).await?;
                Ok(None)
            }
        }
    }

    /// Removes a finished job from the processing list.
    pub async fn acknowledge(
        &self,
        conn: &mut MultiplexedConnection,
        job: &ClaimedJob,
    ) -> Result<(), AppError> {
        self.remove_processing(conn, &job.payload).await
    }

    async fn remove_processing(
        &self,
        conn: &mut MultiplexedConnection,
        payload: &str,
    ) -> Result<(), AppError> {
        let _: i64 = redis::cmd("LREM")
            .arg(PROCESSING_KEY)
            .arg(1)
            .arg(payload)
            .query_async(conn)
            .await?;
        Ok(())
    }
}

fn decode_envelope(payload: &str) -> Option<JobEnvelope> {
    match serde_json::from_str(payload) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            warn!("Dropping malformed job payload: {e}");
            None
        }
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn enqueue(&self, job: Job) -> Result<Uuid, AppError> {
        let envelope = JobEnvelope::new(job);
        let payload = serde_json::to_string(&envelope)
            .map_err(|e| AppError::Queue(format!("could not encode job: {e}")))?;

        let mut conn = self.connect().await?;
        let depth: i64 = redis::cmd("LPUSH")
            .arg(QUEUE_KEY)
            .arg(payload)
            .query_async(&mut conn)
            .await?;

        debug!(
            "Enqueued {} job {} (queue depth {depth})",
            envelope.job.name(),
            envelope.id
        );
        Ok(envelope.id)
    }
}

#[cfg(test)]
pub use recording::RecordingQueue;


#[cfg(test)]
mod recording {
    use std::sync::Mutex;

    use super::*;

    /// Keeps enqueued jobs in memory, or refuses them when built with `failing()`.
    #[derive(Default)]
    pub struct RecordingQueue {
        jobs: Mutex<Vec<Job>>,
        fail: bool,
    }

    impl RecordingQueue {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        pub fn jobs(&self) -> Vec<Job> {
            self.jobs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobQueue for RecordingQueue {
        async fn enqueue(&self, job: Job) -> Result<Uuid, AppError> {
            if self.fail {
                return Err(AppError::Queue("connection refused".into()));
            }
            self.jobs.lock().unwrap().push(job);
            Ok(Uuid::new_v4())
        }
    }
}

use std::time::Duration;

use tracing::{error, info};

use crate::jobs::queue::RedisJobQueue;
use crate::jobs::{Job, JobEnvelope};
use crate::planning::plan::run_month_plan;
use crate::state::AppState;
use crate::tasks::generation::run_asset_job;

const POP_TIMEOUT: Duration = Duration::from_secs(5);
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Starts `count` workers draining the queue. They run until the process exits.
pub fn spawn_workers(state: AppState, queue: RedisJobQueue, count: usize) {
    for worker in 0..count.max(1) {
        let state = state.clone();
        let queue = queue.clone();
        tokio::spawn(async move { run_worker(worker, state, queue).await });
    }
    info!("Started {} job worker(s)", count.max(1));
}

async fn run_worker(worker: usize, state: AppState, queue: RedisJobQueue) {
    loop {
        let mut conn = match queue.connect().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Worker {worker} could not connect to the queue: {e}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        loop {
            match queue.claim(&mut conn, POP_TIMEOUT).await {
                Ok(Some(claimed)) => {
                    handle_job(&state, claimed.envelope.clone()).await;
                    if let Err(e) = queue.acknowledge(&mut conn, &claimed).await {
                        error!(
                            "Worker {worker} could not acknowledge job {}: {e}",
                            claimed.envelope.id
                        );
                        tokio::time::sleep(RECONNECT_DELAY).await;
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!("Worker {worker} lost its queue connection: {e}");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                    break;
                }
            }
        }
    }
}

/// Runs one job to completion. Failures are logged, never retried.
pub async fn handle_job(state: &AppState, envelope: JobEnvelope) {
    let id = envelope.id;
    let name = envelope.job.name();
    info!("Running {name} job {id}");

    let result = match envelope.job {
        Job::GenerateAsset {
            task_id,
            asset,
            prompt,
            skip_review,
        } => {
            run_asset_job(
                state.store.as_ref(),
                &state.asset_services(),
                task_id,
                asset,
                prompt,
                skip_review,
            )
            .await
        }
        Job::PlanMonth {
            blogger_id,
            year,
            month,
        } => run_month_plan(state.store.as_ref(), state.text.as_ref(), blogger_id, year, month)
            .await
            .map(|created| info!("Month plan {year}-{month:02} created {created} task(s)")),
    };

    match result {
        Ok(()) => info!("Finished {name} job {id}"),
        Err(e) => error!("{name} job {id} failed: {e}"),
    }
}

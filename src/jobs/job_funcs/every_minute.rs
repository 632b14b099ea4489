use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Timelike, Utc};
use tracing::{debug, error};

use crate::{init::state::ServerState, util::time::duration_formatter::format_dt_difference};

/// Next instant at `second_offset` seconds into a minute that is strictly after `now`.
pub fn next_minute_mark(now: DateTime<Utc>, second_offset: u32) -> Result<DateTime<Utc>> {
    let truncated_to_minute = now
        .with_second(0)
        .and_then(|dt| dt.with_nanosecond(0))
        .ok_or_else(|| anyhow!("Could not truncate to minute."))?;

    let mut target_time = truncated_to_minute + chrono::Duration::seconds(second_offset as i64);

    if target_time <= now {
        target_time += chrono::Duration::seconds(60);
    }

    Ok(target_time)
}

fn next_minute_delay(task_descriptor: &str, second_offset: u32) -> Result<tokio::time::Duration> {
    let now = Utc::now();
    let next_mark = next_minute_mark(now, second_offset)?;

    debug!(
        task = %task_descriptor,
        runs_in = %format_dt_difference(now, next_mark),
        "Task scheduled"
    );

    (next_mark - now)
        .to_std()
        .map_err(|e| anyhow!("Could not convert schedule delay for {task_descriptor}: {e:?}"))
}

/// Runs `task` once a minute at `second_offset` seconds past the minute, forever.
pub async fn schedule_task_every_minute_at<F, Fut>(
    state: Arc<ServerState>,
    task: F,
    task_descriptor: String,
    second_offset: u32,
) -> Result<()>
where
    F: Fn(Arc<ServerState>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    loop {
        let delay = match next_minute_delay(&task_descriptor, second_offset) {
            Ok(delay) => delay,
            Err(e) => {
                error!(task = %task_descriptor, error = ?e, "Could not calculate next run");
                tokio::time::sleep(std::time::Duration::from_secs(10)).await;
                continue;
            }
        };

        tokio::time::sleep(delay).await;
        task(Arc::clone(&state)).await;
    }
}

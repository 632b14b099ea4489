use std::sync::Arc;

use tracing::info;

use crate::{
    init::state::ServerState,
    jobs::{
        job_funcs::every_minute::schedule_task_every_minute_at,
        maintenance::purge_verification_cache::purge_verification_cache,
    },
};

pub async fn task_init(state: Arc<ServerState>) -> anyhow::Result<()> {
    info!("Task scheduler running...");

    let coroutine_state = Arc::clone(&state);
    tokio::spawn(async move {
        schedule_task_every_minute_at(
            coroutine_state,
            move |coroutine_state: Arc<ServerState>| async move {
                purge_verification_cache(coroutine_state).await
            },
            String::from("PURGE_VERIFICATION_CACHE"),
            0, // seconds
        )
        .await
    });

    Ok(())
}

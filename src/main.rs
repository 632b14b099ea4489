use init::{config::ServerConfig, logging::init_logging, server_init::server_init_proc};
use tracing::info;

// modules tree
pub mod build_info {
    include!(concat!(env!("OUT_DIR"), "/build_info.rs"));
}
pub mod docs;
pub mod domain {
    pub mod verification;
    pub mod verification_cache;
    pub mod verifier;
}
pub mod dto {
    pub mod requests {
        pub mod verify_request;
    }
    pub mod responses {
        pub mod health_response;
    }
}
pub mod errors {
    pub mod code_error;
}
pub mod handlers {
    pub mod fallback;
    pub mod root;
    pub mod verify;
}
pub mod init {
    pub mod config;
    pub mod logging;
    pub mod server_init;
    pub mod state;
}
pub mod jobs {
    pub mod job_funcs {
        pub mod every_minute;
        pub mod init_scheduler;
    }
    pub mod maintenance {
        pub mod purge_verification_cache;
    }
}
pub mod routers {
    pub mod main_router;
    pub mod middleware {
        pub mod logging;
    }
}
pub mod util {
    pub mod dns {
        pub mod mx_lookup;
    }
    pub mod email {
        pub mod random_mailbox;
        pub mod syntax;
    }
    pub mod smtp {
        pub mod probe;
    }
    pub mod time {
        pub mod duration_formatter;
        pub mod now;
    }
}

// main function
fn main() -> anyhow::Result<()> {
    let start = std::time::Instant::now();

    let config = ServerConfig::from_env()?;
    init_logging(&config.logging)?;

    info!(workers = %config.workers, "Initializing server...");

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()?
        .block_on(server_init_proc(tokio::time::Instant::from_std(start), config))
}

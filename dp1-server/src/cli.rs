use clap::Parser;

/// DP-1 feed operator service.
#[derive(Parser, Debug)]
#[command(name = "dp1-server")]
#[command(about = "Signed-feed operator service for the DP-1 digital-artwork distribution protocol")]
pub struct Cli {
    /// Path to a config file layered under defaults and `DP1_*` env vars.
    #[arg(long, env = "DP1_CONFIG_PATH")]
    pub config: Option<String>,

    /// Override the configured listen port.
    #[arg(long, env = "DP1_PORT")]
    pub port: Option<u16>,

    /// How many messages the background queue drain pulls per batch.
    #[arg(long, env = "DP1_QUEUE_BATCH_SIZE", default_value_t = 10)]
    pub queue_batch_size: usize,

    /// How long the background queue drain sleeps after finding nothing to do.
    #[arg(long, env = "DP1_QUEUE_IDLE_MILLIS", default_value_t = 250)]
    pub queue_idle_millis: u64,
}

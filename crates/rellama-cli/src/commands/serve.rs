use std::sync::Arc;

use clap::Parser;
use rellama::config::ConfigStore;
use rellama::proxy::{DEFAULT_LISTEN_ADDR, ProxyServer};

use crate::error::CliResult;

#[derive(Parser)]
pub struct ServeCommand {
    #[clap(
        long,
        short,
        default_value = DEFAULT_LISTEN_ADDR,
        help = "Address to listen on"
    )]
    pub listen: String,
}

impl ServeCommand {
    pub async fn execute(&self, config: Arc<ConfigStore>) -> CliResult<()> {
        ProxyServer::new(&self.listen, config).serve().await?;
        Ok(())
    }
}

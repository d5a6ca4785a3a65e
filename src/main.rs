//! strata CLI entry point.

use strata_lib::cli::{self, Cli};
use strata_lib::core::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    cli::execute(cli).await
}

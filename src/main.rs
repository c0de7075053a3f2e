mod args;
mod config;
mod entry;
mod error;
mod metrics;
mod run;
mod shutdown;
mod system;
mod transport;

use error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}

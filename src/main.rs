//! scctl - smart contract index CLI tool
//!
//! Queries the contract store written by the sync daemon and builds or
//! decodes invocation scripts.

use scindex::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

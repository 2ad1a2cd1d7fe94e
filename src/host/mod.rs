mod protocol;
mod server;

use crate::config::EngineConfig;
use std::io;

pub use protocol::{read_frame, write_message, HostMessage, HostMessageContent};
pub use server::HostServer;

/// Serve the protocol over stdin/stdout. Logging must stay on stderr.
pub fn run_host_mode(config: EngineConfig) -> io::Result<()> {
    let stdin = io::stdin();
    let mut server = HostServer::new(stdin.lock(), io::stdout(), config)?;
    server.run()
}

//! Stdio transport
//!
//! Newline-delimited JSON over stdin/stdout. One frame is handled completely,
//! upstream call included, before the next one is read.

use super::server::McpServer;
use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::{info, trace};

/// Serves `server` on the process's stdin/stdout until EOF.
pub async fn run_stdio(server: &McpServer) -> io::Result<()> {
    info!("Serving MCP over stdio");
    serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await
}

/// Reads frames from `reader` and writes one line per answered request.
/// Blank lines are skipped; notifications produce no output.
pub async fn serve<R, W>(server: &McpServer, mut reader: R, writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(writer);
    let mut buf = Vec::new();

    // Frames are raw bytes; invalid UTF-8 is answered as a parse error.
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let frame = buf.trim_ascii();
        if frame.is_empty() {
            trace!("Skipping empty line");
            continue;
        }

        trace!(message = %String::from_utf8_lossy(frame), "Received message");

        if let Some(response) = server.handle_message(frame).await {
            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }

    trace!("EOF reached on transport input");
    Ok(())
}

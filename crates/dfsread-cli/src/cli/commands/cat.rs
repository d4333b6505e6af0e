//! `dfsread cat <path>` – stream file bytes to stdout.

use anyhow::{Context, Result};
use std::io::{self, Write};

use dfsread_core::client::DfsClient;

pub fn run_cat(
    client: &DfsClient,
    path: &str,
    offset: u64,
    length: Option<u64>,
    read_param: Option<&str>,
) -> Result<()> {
    let mut stream = client
        .open(path, read_param)
        .with_context(|| format!("open {}", path))?;
    if offset > 0 {
        stream
            .seek_to(offset)
            .with_context(|| format!("seek to {}", offset))?;
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut remaining = length;
    let mut buf = vec![0u8; client.config().buffer_size.max(1)];
    loop {
        let want = match remaining {
            Some(0) => break,
            Some(left) => (left as usize).min(buf.len()),
            None => buf.len(),
        };
        let n = stream
            .read_bytes(&mut buf[..want])
            .with_context(|| format!("read {} at offset {}", path, stream.pos()))?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n])?;
        if let Some(left) = remaining.as_mut() {
            *left -= n as u64;
        }
    }
    out.flush()?;
    Ok(())
}

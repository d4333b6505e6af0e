//! `dfsread stat <path>` – print file metadata.

use anyhow::{Context, Result};

use dfsread_core::client::DfsClient;

pub fn run_stat(client: &DfsClient, path: &str) -> Result<()> {
    let status = client
        .status(path)
        .with_context(|| format!("stat {}", path))?;
    println!("path:        {}", path);
    println!("type:        {}", status.kind);
    println!("length:      {}", status.length);
    println!("owner:       {}:{}", status.owner, status.group);
    println!("permission:  {}", status.permission);
    println!("replication: {}", status.replication);
    println!("block size:  {}", status.block_size);
    println!("modified:    {}", status.modification_time);
    Ok(())
}

// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Dumps the zones of a Flexom building, with their current settings, as JSON.
//!
//! Credentials are read from standard input. Set `RUST_LOG` for diagnostics.

use anyhow::{Context, bail};
use futures::future::try_join_all;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

use flexom_lib::{Client, Zone};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let email = prompt(&mut lines, "Email: ").await?;
    let password = prompt(&mut lines, "Password: ").await?;

    let client = Client::builder()
        .credentials(email, password)
        .build()
        .await
        .context("failed to connect to Flexom")?;

    let result = dump_zones(&client).await;
    client.disconnect().await;
    let zones = result?;

    println!("{}", serde_json::to_string_pretty(&zones)?);
    Ok(())
}

/// Lists the zones and refreshes their settings concurrently.
async fn dump_zones(client: &Client) -> anyhow::Result<Vec<Zone>> {
    let zones = client.zones().await.context("failed to list zones")?;
    try_join_all(zones.into_iter().map(|mut zone| async move {
        let settings = client
            .zone_settings(&zone.id)
            .await
            .with_context(|| format!("failed to read settings of zone {}", zone.id))?;
        zone.settings = settings;
        anyhow::Ok(zone)
    }))
    .await
}

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> anyhow::Result<String> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(label.as_bytes()).await?;
    stderr.flush().await?;

    let Some(line) = lines.next_line().await? else {
        bail!("standard input closed before {}", label.trim_end_matches(": "));
    };
    Ok(line.trim().to_string())
}

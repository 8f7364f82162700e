use std::path::Path;

use kara::storage::{Directory, directory::CONFIG_FILE};
use tracing::instrument;

use super::terminal::Colorize;

#[instrument]
pub fn run(root: &Path) -> anyhow::Result<()> {
    let created = Directory::new(root.to_path_buf())
        .init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize {}: {e}", root.display()))?;

    if !created {
        println!(
            "{}",
            format!("Data directory already initialized ({CONFIG_FILE} exists)").dim()
        );
        return Ok(());
    }

    println!("Initialized data directory in {}", root.display());
    println!("  Created: {CONFIG_FILE}");
    println!("  Created: members/ groups/ demands/ settings/ contracts/");
    println!("           participants/ contributions/");
    println!();
    println!("Next steps:");
    println!("  kara settings publish STANDARD --minimum-amount 5000");
    println!("  kara list demands --status pending");

    Ok(())
}

//! Init command implementation.

use anyhow::{bail, Context, Result};
use ktguard_rules::DEFAULT_CONFIG;
use std::path::Path;

const CONFIG_FILE: &str = "ktguard.toml";

/// Writes the default configuration into `dir`.
pub fn write_config(dir: &Path, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILE);

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    Ok(())
}

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    write_config(Path::new("."), force)?;

    println!("Created {CONFIG_FILE}");
    println!("\nNext steps:");
    println!("  1. Edit {CONFIG_FILE} to configure rules");
    println!("  2. Run: ktguard check");
    println!("  3. Run: ktguard fix");

    Ok(())
}

//! `slotboard init` — Write the default configuration.

use slotboard_config::AppConfig;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    }

    if config_path.exists() && !force {
        println!("  Config file exists: {}", config_path.display());
        println!("  Run with --force to overwrite it.");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Wrote {}", config_path.display());
    println!();
    println!("Next steps:");
    println!("  slotboard place event 1 my-event --kind event --title \"Opening night\"");
    println!("  slotboard list event");
    println!("  slotboard serve");

    Ok(())
}

//! `slotboard status` — Show configuration and board occupancy.

use slotboard_config::AppConfig;

use super::open_boards;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let (config, boards) = open_boards().await?;

    println!("📌 slotboard status");
    println!("==================");
    println!("  Config dir:  {}", AppConfig::config_dir().display());
    println!("  Store:       {} ({})", config.store.backend, config.store.resolved_path().display());
    println!("  Gateway:     {}:{}", config.gateway.host, config.gateway.port);

    for (name, engine) in [("event", boards.event()?), ("daily", boards.daily()?)] {
        let occupied = engine.list().await?.len();
        let scope = engine.scope();
        println!(
            "  Board {name:<6} {occupied}/{} slots (overflow: {:?})",
            scope.capacity, scope.overflow
        );
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `slotboard init` first");
    }

    Ok(())
}

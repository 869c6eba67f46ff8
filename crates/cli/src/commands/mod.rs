pub mod board;
pub mod init;
pub mod serve;
pub mod status;

use slotboard_config::AppConfig;
use slotboard_core::CancelToken;
use slotboard_engine::{BoardRef, Boards, SlotEngine};

/// Load config and open the configured store.
pub async fn open_boards() -> Result<(AppConfig, Boards), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let kv = slotboard_store::build_from_config(&config.store).await?;
    let boards = Boards::new(kv, config.boards.clone());
    Ok((config, boards))
}

pub async fn open_board(board: &str) -> Result<SlotEngine, Box<dyn std::error::Error>> {
    let board: BoardRef = board.parse()?;
    let (_, boards) = open_boards().await?;
    Ok(boards.resolve(&board)?)
}

/// A token that trips on Ctrl-C, so a multi-step write stops between steps.
pub fn cancel_on_ctrl_c() -> CancelToken {
    let token = CancelToken::new();
    let handle = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping after the current write");
            handle.cancel();
        }
    });
    token
}

use sticky_lib::{Result, window::Workspace};
use sysexits::ExitCode;
use tokio::{runtime::Runtime, signal, sync::watch};
use tracing::{error, info};

pub fn handle(workspace: &Workspace, poll: bool) -> Result<ExitCode> {
    let mut board = workspace.open_board()?;
    board.set_poll_store(poll);

    let runtime = match Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start the async runtime: {err}");
            return Ok(ExitCode::OsErr);
        }
    };

    println!(
        "Watching {} notes, press Ctrl-C to stop",
        board.repo().notes().len()
    );

    runtime.block_on(async {
        let (shutdown, shutdown_rx) = watch::channel(false);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Interrupted");
                shutdown.send_replace(true);
            }
        });

        board.run(shutdown_rx).await;
    });

    Ok(ExitCode::Ok)
}

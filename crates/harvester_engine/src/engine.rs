use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use engine_logging::{engine_error, engine_info};

use crate::harvester::{HarvestBatch, Harvester};
use crate::types::BatchId;

enum EngineCommand {
    Harvest { batch_id: BatchId, text: String },
    DisposeContent,
}

#[derive(Debug)]
pub enum EngineEvent {
    BatchCompleted { batch_id: BatchId, batch: HarvestBatch },
    ContentDisposed { files_removed: usize },
}

/// Runs a [`Harvester`] on its own thread. Commands are handled strictly in
/// submission order; a batch finishes before the next one starts.
///
/// Downloads are only removed on [`EngineHandle::dispose_content`]; dropping
/// the handle leaves them on disk.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
}

impl EngineHandle {
    pub fn spawn(harvester: Harvester) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("harvester-engine".to_string())
            .spawn(move || {
                let mut harvester = harvester;
                while let Ok(command) = cmd_rx.recv() {
                    let event = runtime.block_on(handle_command(&mut harvester, command));
                    if event_tx.send(event).is_err() {
                        engine_error!("Engine event receiver dropped; stopping");
                        break;
                    }
                }
                engine_info!(
                    "Engine stopped with {} content record(s) not disposed",
                    harvester.content().len()
                );
            })?;

        Ok(Self { cmd_tx, event_rx })
    }

    pub fn submit(&self, batch_id: BatchId, text: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Harvest {
            batch_id,
            text: text.into(),
        });
    }

    pub fn dispose_content(&self) {
        let _ = self.cmd_tx.send(EngineCommand::DisposeContent);
    }

    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_command(harvester: &mut Harvester, command: EngineCommand) -> EngineEvent {
    match command {
        EngineCommand::Harvest { batch_id, text } => {
            let batch = harvester.harvest(&text).await;
            EngineEvent::BatchCompleted { batch_id, batch }
        }
        EngineCommand::DisposeContent => EngineEvent::ContentDisposed {
            files_removed: harvester.dispose_content(),
        },
    }
}

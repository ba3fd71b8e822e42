use std::{sync::Arc, time::Duration};

use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use crate::services::attempt_controller::{AttemptController, AttemptState};

/// Background task saving the attempt's draft on a fixed interval.
pub struct AutosaveHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl AutosaveHandle {
    pub async fn shutdown(self) {
        // The task may already be gone if the runtime is shutting down.
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            log::warn!("Autosave task ended abnormally: {}", e);
        }
    }
}

pub fn spawn_autosave(controller: Arc<AttemptController>, interval: Duration) -> AutosaveHandle {
    let (shutdown, mut stop) = oneshot::channel();

    let task = tokio::spawn(async move {
        let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    let solving = matches!(
                        controller.state(),
                        AttemptState::Ready | AttemptState::Solving
                    );
                    if !solving
                        || !controller.is_persisted()
                        || !controller.has_unsaved_changes()
                    {
                        continue;
                    }
                    if let Err(e) = controller.save_draft().await {
                        log::warn!(
                            "Autosave for question {} failed, retrying next tick: {}",
                            controller.question_id(),
                            e
                        );
                    }
                }
            }
        }
        log::debug!("Autosave for question {} stopped", controller.question_id());
    });

    AutosaveHandle { shutdown, task }
}

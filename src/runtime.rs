//! # Host Loop
//!
//! A single cooperative task owns the [`CommandRouter`] (and through it the engine and the
//! document). Commands, host events and host-side document edits arrive over one channel; engine
//! timers are served between messages. Nothing else ever touches the engine, so no locking is
//! needed anywhere in the crate.

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::commands::{Command, CommandResponse, CommandRouter};
use crate::dom::Document;
use crate::engine::HostEvent;

/// Host-side edit of the document, run inside the loop
pub type Mutation<D> = Box<dyn FnOnce(&mut D) + Send>;

pub enum HostMessage<D> {
    Command {
        command: Command,
        reply: Option<oneshot::Sender<CommandResponse>>,
    },
    Event(HostEvent),
    /// The page changing itself, as a script on the page would
    Mutate(Mutation<D>),
    Shutdown,
}

/// Cloneable sender side of a running loop
pub struct RuntimeHandle<D> {
    sender: mpsc::Sender<HostMessage<D>>,
}

impl<D> Clone for RuntimeHandle<D> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<D: Send + 'static> RuntimeHandle<D> {
    /// Send a command and wait for its response; `None` once the loop has stopped
    pub async fn command(&self, command: Command) -> Option<CommandResponse> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(HostMessage::Command {
                command,
                reply: Some(reply),
            })
            .await
            .ok()?;
        response.await.ok()
    }

    pub async fn event(&self, event: HostEvent) -> bool {
        self.sender.send(HostMessage::Event(event)).await.is_ok()
    }

    pub async fn mutate<F>(&self, edit: F) -> bool
    where
        F: FnOnce(&mut D) + Send + 'static,
    {
        self.sender
            .send(HostMessage::Mutate(Box::new(edit)))
            .await
            .is_ok()
    }

    pub async fn shutdown(&self) -> bool {
        self.sender.send(HostMessage::Shutdown).await.is_ok()
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending::<()>().await,
    }
}

/// Serve messages and engine timers until shutdown (or every sender is gone)
pub async fn run<D: Document>(
    mut router: CommandRouter<D>,
    mut inbox: mpsc::Receiver<HostMessage<D>>,
) -> CommandRouter<D> {
    info!("🔁 Host loop started");
    loop {
        let deadline = router.engine().next_deadline(Instant::now());
        tokio::select! {
            message = inbox.recv() => match message {
                Some(HostMessage::Command { command, reply }) => {
                    let response = router.dispatch(command).await;
                    if let Some(reply) = reply {
                        if reply.send(response).is_err() {
                            debug!("Command caller went away before the response");
                        }
                    }
                }
                Some(HostMessage::Event(event)) => {
                    router.engine_mut().handle_event(event, Instant::now());
                }
                Some(HostMessage::Mutate(edit)) => {
                    edit(router.engine_mut().document_mut());
                    router.engine_mut().tick(Instant::now());
                }
                Some(HostMessage::Shutdown) | None => break,
            },
            _ = wait_until(deadline) => router.engine_mut().tick(Instant::now()),
        }
    }
    info!("Host loop stopped");
    router
}

/// Start the loop on the current tokio runtime
pub fn spawn<D>(
    router: CommandRouter<D>,
    buffer: usize,
) -> (RuntimeHandle<D>, JoinHandle<CommandRouter<D>>)
where
    D: Document + Send + 'static,
{
    let (sender, inbox) = mpsc::channel(buffer.max(1));
    let task = tokio::spawn(run(router, inbox));
    (RuntimeHandle { sender }, task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{MemoryFetcher, ResourceLoader, StaticAssetResolver};
    use crate::config::EngineConfig;
    use crate::dom::{tags, DocumentExt, MemoryDocument};
    use crate::engine::RetroTransformer;
    use crate::settings::{MemorySettingsStore, Settings};
    use crate::theme::BuiltinThemes;
    use std::time::Duration;

    fn router() -> CommandRouter<MemoryDocument> {
        let config = EngineConfig::default();
        let loader = ResourceLoader::new(
            Box::new(StaticAssetResolver::new("assets")),
            Box::new(MemoryFetcher::new()),
            config.assets.retry_delay(),
        );
        let engine = RetroTransformer::new(
            MemoryDocument::new(),
            Box::new(BuiltinThemes::new()),
            loader,
            config,
        );
        let store = MemorySettingsStore::new(Settings::enabled_with_theme("terminal"));
        CommandRouter::new(engine, Box::new(store))
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_serves_commands_and_timers() {
        let (handle, task) = spawn(router(), 16);

        let response = handle.command(Command::Activate).await;
        assert_eq!(response, Some(CommandResponse::State { active: true }));

        handle
            .mutate(|doc: &mut MemoryDocument| {
                let body = doc.body().unwrap();
                let button = doc.append_element(body, "button").unwrap();
                doc.set_attribute(button, "id", "late").unwrap();
            })
            .await;
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert!(handle.shutdown().await);
        let router = task.await.unwrap();
        let doc = router.engine().document();
        let late = doc
            .all_elements()
            .into_iter()
            .find(|&n| doc.attribute(n, "id").as_deref() == Some("late"))
            .unwrap();
        assert_eq!(doc.attribute(late, tags::ELEMENT).as_deref(), Some("button"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_reports_stopped_loop() {
        let (handle, task) = spawn(router(), 4);
        handle.shutdown().await;
        task.await.unwrap();
        assert_eq!(handle.command(Command::GetSettings).await, None);
    }
}

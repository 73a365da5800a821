//! Owns a [`MapRenderer`] on its own task and feeds it successive stop lists.
//!
//! Each submitted list supersedes the cycle in progress: the old cycle task
//! is aborted, the renderer tears down and starts a new generation, and any
//! event still queued from the old cycle fails the generation check.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tourmap_core::Stop;
use tourmap_geocode::AddressLookup;

use crate::cycle::{spawn_cycle, CycleContext, CycleEvent};
use crate::error::RenderError;
use crate::path::PathEngine;
use crate::renderer::{MapRenderer, MapSnapshot};
use crate::surface::SurfaceFactory;

const COMMAND_BUFFER: usize = 8;
const EVENT_BUFFER: usize = 64;

pub struct TourSession<F: SurfaceFactory> {
    commands: mpsc::Sender<Vec<Stop>>,
    snapshots: watch::Receiver<MapSnapshot>,
    task: JoinHandle<MapRenderer<F>>,
    base_generation: u64,
    submitted: u64,
}

impl<F: SurfaceFactory> TourSession<F> {
    /// Moves `renderer` onto a new task. Must be called from within a Tokio
    /// runtime.
    pub fn spawn<L: AddressLookup, P: PathEngine>(
        renderer: MapRenderer<F>,
        ctx: CycleContext<L, P>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(renderer.snapshot());
        let base_generation = renderer.generation();
        let task = tokio::spawn(run(renderer, ctx, command_rx, snapshot_tx));
        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            task,
            base_generation,
            submitted: 0,
        }
    }

    /// Replaces the current stop list.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SessionClosed`] if the session task has ended.
    pub async fn submit(&mut self, stops: Vec<Stop>) -> Result<(), RenderError> {
        self.commands
            .send(stops)
            .await
            .map_err(|_| RenderError::SessionClosed)?;
        self.submitted += 1;
        Ok(())
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> MapSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that observes every published snapshot.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<MapSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until the most recently submitted list is drawn or has failed
    /// to get a surface.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SessionClosed`] if the session task ends first.
    pub async fn settled(&mut self) -> Result<MapSnapshot, RenderError> {
        let target = self.base_generation + self.submitted;
        let snapshot = self
            .snapshots
            .wait_for(|s| s.generation == target && s.is_settled())
            .await
            .map_err(|_| RenderError::SessionClosed)?;
        Ok(snapshot.clone())
    }

    /// Stops accepting stop lists, cancels the running cycle and hands the
    /// renderer back.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::SessionClosed`] if the session task panicked.
    pub async fn shutdown(self) -> Result<MapRenderer<F>, RenderError> {
        drop(self.commands);
        self.task.await.map_err(|err| {
            tracing::error!(error = %err, "tour session task failed");
            RenderError::SessionClosed
        })
    }
}

async fn run<F: SurfaceFactory, L: AddressLookup, P: PathEngine>(
    mut renderer: MapRenderer<F>,
    ctx: CycleContext<L, P>,
    mut commands: mpsc::Receiver<Vec<Stop>>,
    snapshots: watch::Sender<MapSnapshot>,
) -> MapRenderer<F> {
    let (event_tx, mut event_rx) = mpsc::channel::<CycleEvent>(EVENT_BUFFER);
    let mut current: Option<JoinHandle<()>> = None;

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => {
                let Some(stops) = command else { break };
                if let Some(previous) = current.take() {
                    previous.abort();
                }
                let generation = renderer.begin_cycle(stops.clone());
                tracing::info!(generation, stops = stops.len(), "new stop list");
                if renderer.is_available() {
                    current = Some(spawn_cycle(ctx.clone(), generation, stops, event_tx.clone()));
                }
                snapshots.send_replace(renderer.snapshot());
            }
            Some(event) = event_rx.recv() => {
                if renderer.apply(event) {
                    snapshots.send_replace(renderer.snapshot());
                }
            }
        }
    }

    if let Some(previous) = current {
        previous.abort();
    }
    tracing::debug!(generation = renderer.generation(), "tour session closed");
    renderer
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

//! One resolution cycle: fan-out geocoding, completion barrier, route.
//!
//! A cycle reports each stop as soon as its resolution settles, then, once
//! every stop has settled, builds the route and computes the drawable path.
//! Every event carries the cycle's generation so the renderer can drop
//! results from superseded cycles.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tourmap_core::{Depot, ResolvedStop, Stop};
use tourmap_geocode::{AddressLookup, GeocodeResolver};
use tourmap_route::{build_route, Route};

use crate::path::{DrawablePath, PathEngine};

/// Resolutions driven at once per cycle. The resolver's throttle still
/// decides how many reach the geocoding service.
pub const DEFAULT_CYCLE_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    /// Fewer than two waypoints; the path engine was not called.
    NotRequested,
    Computed(DrawablePath),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleEvent {
    StopSettled {
        generation: u64,
        /// Position of the stop in the cycle's ordered stop list.
        index: usize,
        resolved: ResolvedStop,
    },
    RouteReady {
        generation: u64,
        route: Route,
        path: PathOutcome,
    },
}

impl CycleEvent {
    #[must_use]
    pub fn generation(&self) -> u64 {
        match self {
            CycleEvent::StopSettled { generation, .. } | CycleEvent::RouteReady { generation, .. } => {
                *generation
            }
        }
    }
}

/// Everything a cycle needs besides its stop list.
pub struct CycleContext<L, P> {
    pub resolver: GeocodeResolver<L>,
    pub engine: Arc<P>,
    pub depot: Depot,
    pub concurrency: usize,
}

impl<L, P> Clone for CycleContext<L, P> {
    fn clone(&self) -> Self {
        Self {
            resolver: self.resolver.clone(),
            engine: Arc::clone(&self.engine),
            depot: self.depot.clone(),
            concurrency: self.concurrency,
        }
    }
}

impl<L: AddressLookup, P: PathEngine> CycleContext<L, P> {
    #[must_use]
    pub fn new(resolver: GeocodeResolver<L>, engine: P, depot: Depot) -> Self {
        Self {
            resolver,
            engine: Arc::new(engine),
            depot,
            concurrency: DEFAULT_CYCLE_CONCURRENCY,
        }
    }
}

/// Spawns the cycle for `stops` as a task.
///
/// The task stops quietly when `events` is closed. Aborting the returned
/// handle cancels the cycle; lookups already started keep running inside
/// the resolver and still populate its cache.
pub fn spawn_cycle<L: AddressLookup, P: PathEngine>(
    ctx: CycleContext<L, P>,
    generation: u64,
    stops: Vec<Stop>,
    events: mpsc::Sender<CycleEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        run_cycle(&ctx, generation, stops, &events).await;
    })
}

async fn run_cycle<L: AddressLookup, P: PathEngine>(
    ctx: &CycleContext<L, P>,
    generation: u64,
    stops: Vec<Stop>,
    events: &mpsc::Sender<CycleEvent>,
) {
    let total = stops.len();
    tracing::info!(generation, stops = total, "resolution cycle started");

    let mut settled: Vec<(usize, ResolvedStop)> = Vec::with_capacity(total);
    let mut resolutions = stream::iter(stops.into_iter().enumerate())
        .map(|(index, stop)| {
            let resolver = ctx.resolver.clone();
            async move {
                let resolution = resolver.resolve(&stop.address).await;
                (index, ResolvedStop { stop, resolution })
            }
        })
        .buffer_unordered(ctx.concurrency.max(1));

    while let Some((index, resolved)) = resolutions.next().await {
        let event = CycleEvent::StopSettled {
            generation,
            index,
            resolved: resolved.clone(),
        };
        if events.send(event).await.is_err() {
            return;
        }
        settled.push((index, resolved));
    }

    // Barrier: every stop has settled, success or not.
    settled.sort_by_key(|(index, _)| *index);
    let ordered: Vec<ResolvedStop> = settled.into_iter().map(|(_, r)| r).collect();
    let route = build_route(&ctx.depot, &ordered);

    let path = if route.has_line() {
        match ctx.engine.compute(&route.waypoints).await {
            Ok(path) => PathOutcome::Computed(path),
            Err(err) => {
                tracing::warn!(generation, error = %err, "path computation failed; drawing markers only");
                PathOutcome::Failed(err.to_string())
            }
        }
    } else {
        PathOutcome::NotRequested
    };

    tracing::info!(
        generation,
        waypoints = route.waypoints.len(),
        unresolved = total + 1 - route.waypoints.len(),
        "resolution cycle settled"
    );
    let _ = events
        .send(CycleEvent::RouteReady {
            generation,
            route,
            path,
        })
        .await;
}

//! Game server.
//!
//! One task owns the [`Simulation`] and is its only writer. Request lines
//! from every seat arrive on the session's inbound queue; each tick drains
//! the queue, advances the simulation, and broadcasts the resulting deltas
//! followed by a `tick` line.

use std::collections::BTreeMap;
use std::future::Future;

use rts_core::simulation::{Simulation, TickReport};
use rts_net::protocol::{ClientMessage, ServerMessage};
use rts_net::{ConnectionId, Inbound, InboundEvent};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace};

use crate::lobby::{Seat, Session};

/// Authoritative game loop over a started [`Session`].
#[derive(Debug)]
pub struct GameServer {
    simulation: Simulation,
    seats: BTreeMap<ConnectionId, Seat>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
}

impl GameServer {
    /// Take over `session`'s connections.
    ///
    /// Deltas still in the simulation's journal, typically the scenario
    /// setup, go out with the first tick.
    #[must_use]
    pub fn new(simulation: Simulation, session: Session) -> Self {
        let seats = session
            .seats
            .into_iter()
            .map(|seat| (seat.entry.id, seat))
            .collect();
        Self {
            simulation,
            seats,
            inbound: session.inbound,
        }
    }

    /// The authoritative state.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Number of players still connected.
    #[must_use]
    pub fn connected(&self) -> usize {
        self.seats.len()
    }

    /// Apply one inbound event.
    ///
    /// Requests are queued for the start of the next tick under the seat's
    /// player number. Unparseable lines are dropped.
    pub fn handle(&mut self, inbound: Inbound) {
        let id = inbound.connection;
        match inbound.event {
            InboundEvent::Line(line) => {
                let Some(seat) = self.seats.get(&id) else {
                    return;
                };
                match line.parse::<ClientMessage>() {
                    Ok(ClientMessage(request)) => {
                        trace!(player = seat.player(), ?request, "request received");
                        self.simulation.queue_request(seat.player(), request);
                    }
                    Err(error) => {
                        debug!(connection = id, player = seat.player(), %error, "dropping line");
                    }
                }
            }
            InboundEvent::Closed => {
                if let Some(seat) = self.seats.remove(&id) {
                    info!(connection = id, player = seat.player(), "player disconnected");
                }
            }
        }
    }

    /// Run one tick: drain pending input, advance, broadcast.
    pub fn step(&mut self) -> TickReport {
        while let Ok(inbound) = self.inbound.try_recv() {
            self.handle(inbound);
        }

        let report = self.simulation.advance_tick();
        self.broadcast(&report);

        let before = self.seats.len();
        self.seats.retain(|_, seat| seat.connection.is_active());
        if self.seats.len() != before {
            info!(
                tick = report.tick,
                dropped = before - self.seats.len(),
                "dropped closed connections"
            );
        }
        report
    }

    fn broadcast(&self, report: &TickReport) {
        let lines: Vec<String> = report
            .deltas
            .iter()
            .map(|delta| ServerMessage::Delta(delta.clone()).to_string())
            .collect();
        for seat in self.seats.values() {
            let sent = lines
                .iter()
                .try_for_each(|line| seat.connection.send(line))
                .and_then(|()| seat.connection.send(ServerMessage::Tick));
            if let Err(error) = sent {
                debug!(connection = seat.entry.id, tick = report.tick, %error, "broadcast failed");
            }
        }
    }

    /// Tick on the configured wall interval until `shutdown` resolves or
    /// every player has left. Returns the final simulation.
    pub async fn run(mut self, shutdown: impl Future<Output = ()>) -> Simulation {
        let mut interval = tokio::time::interval(self.simulation.config().wall_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            players = self.seats.len(),
            interval_ms = self.simulation.config().wall_interval().as_millis(),
            "game started"
        );
        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!(tick = self.simulation.get_tick(), "shutting down");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.step();
                    trace!(tick = report.tick, deltas = report.deltas.len(), "tick");
                    if self.seats.is_empty() {
                        info!(tick = report.tick, "all players left");
                        break;
                    }
                }
            }
        }
        for seat in self.seats.values() {
            seat.connection.close();
        }
        self.simulation
    }
}

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::config::RoomConfig;
use crate::dict::Dictionary;
use crate::error::SubmitError;
use crate::events::{Announcement, AnnouncementKind, Event, EventBus, SpecialInfo};
use crate::round::{Round, SubmitOutcome};
use crate::search::{GridSearch, PreparedRound, RoundKind, RoundPlan};
use crate::worker::SearchPool;

/// Seconds-left warning fires this long before the round ends.
const TIME_LEFT_WARNING: Duration = Duration::from_secs(30);
/// Close-fight check: top two within this many points, both at least the floor.
const DUEL_MARGIN: u32 = 5;
const DUEL_FLOOR: u32 = 15;

const COMMAND_BUFFER: usize = 64;

/// Commands a room task accepts. Submissions are processed strictly in
/// arrival order.
#[derive(Debug)]
pub enum RoomCmd {
    Submit {
        round_id: String,
        nick: String,
        word: String,
        reply: oneshot::Sender<Result<SubmitOutcome, SubmitError>>,
    },
    Join {
        nick: String,
    },
    Leave {
        nick: String,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomSnapshot {
    pub id: String,
    pub label: String,
    pub grid_size: usize,
    pub players: Vec<String>,
    pub round: Option<RoundSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundSnapshot {
    pub round_id: String,
    pub round_number: u64,
    pub kind: RoundKind,
    pub running: bool,
    pub ends_at: DateTime<Utc>,
}

/// Cheap cloneable handle to one room task.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    cfg: RoomConfig,
    tx: mpsc::Sender<RoomCmd>,
}

impl RoomHandle {
    pub fn id(&self) -> &str {
        &self.cfg.id
    }

    pub fn config(&self) -> &RoomConfig {
        &self.cfg
    }

    pub async fn submit(
        &self,
        round_id: String,
        nick: String,
        word: String,
    ) -> Result<SubmitOutcome, SubmitError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoomCmd::Submit {
                round_id,
                nick,
                word,
                reply,
            })
            .await
            .map_err(|_| SubmitError::InvalidRoom)?;
        rx.await.map_err(|_| SubmitError::InvalidRoom)?
    }

    pub async fn join(&self, nick: String) {
        let _ = self.tx.send(RoomCmd::Join { nick }).await;
    }

    pub async fn leave(&self, nick: String) {
        let _ = self.tx.send(RoomCmd::Leave { nick }).await;
    }

    pub async fn snapshot(&self) -> Option<RoomSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(RoomCmd::Snapshot { reply }).await.ok()?;
        rx.await.ok()
    }
}

/// The fixed room roster. Each room runs as an independent task; nothing is
/// shared between them except the dictionary and the search pool.
pub struct RoomManager {
    rooms: HashMap<String, RoomHandle>,
    order: Vec<String>,
}

impl RoomManager {
    pub fn start(
        configs: Vec<RoomConfig>,
        dict: Arc<Dictionary>,
        pool: Arc<SearchPool>,
        events: EventBus,
    ) -> Self {
        let mut rooms = HashMap::new();
        let mut order = Vec::new();
        for cfg in configs {
            info!(room = %cfg.id, size = cfg.grid_size, "starting room");
            let handle = RoomTask::spawn(cfg, dict.clone(), pool.clone(), events.clone());
            order.push(handle.id().to_string());
            rooms.insert(handle.id().to_string(), handle);
        }
        Self { rooms, order }
    }

    pub fn get(&self, room_id: &str) -> Option<&RoomHandle> {
        self.rooms.get(room_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoomHandle> {
        self.order.iter().filter_map(|id| self.rooms.get(id))
    }

    pub async fn submit(
        &self,
        room_id: &str,
        round_id: String,
        nick: String,
        word: String,
    ) -> Result<SubmitOutcome, SubmitError> {
        match self.get(room_id) {
            Some(room) => room.submit(round_id, nick, word).await,
            None => Err(SubmitError::InvalidRoom),
        }
    }
}

struct RoomTask {
    cfg: RoomConfig,
    dict: Arc<Dictionary>,
    pool: Arc<SearchPool>,
    events: EventBus,
    players: Vec<String>,
    round_number: u64,
    current: Option<Round>,
    /// Prepared-grid cache: at most one in-flight search, keyed by the round
    /// number it was prepared for. Stale entries are discarded at start.
    prepared_next: Option<(u64, oneshot::Receiver<PreparedRound>)>,
}

impl RoomTask {
    fn spawn(
        cfg: RoomConfig,
        dict: Arc<Dictionary>,
        pool: Arc<SearchPool>,
        events: EventBus,
    ) -> RoomHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = RoomHandle {
            cfg: cfg.clone(),
            tx,
        };
        let task = RoomTask {
            cfg,
            dict,
            pool,
            events,
            players: Vec::new(),
            round_number: 0,
            current: None,
            prepared_next: None,
        };
        tokio::spawn(task.run(rx));
        handle
    }

    async fn run(mut self, mut rx: mpsc::Receiver<RoomCmd>) {
        loop {
            let prepared = self.obtain_prepared(self.round_number + 1, &mut rx).await;
            self.round_number = prepared.round_number;
            self.start_round(prepared);

            let round_duration = Duration::from_millis(self.cfg.round_ms);
            let started = Instant::now();
            let ends = started + round_duration;
            let warn_deadline = if round_duration > TIME_LEFT_WARNING * 3 / 2 {
                Some(ends - TIME_LEFT_WARNING)
            } else {
                None
            };
            let duel_deadline = started + round_duration * 2 / 3;
            let mut warned = warn_deadline.is_none();
            let mut duel_checked = false;

            loop {
                tokio::select! {
                    cmd = rx.recv() => match cmd {
                        Some(cmd) => self.handle_cmd(cmd),
                        None => return,
                    },
                    _ = sleep_until(warn_deadline.unwrap_or(ends)), if !warned => {
                        warned = true;
                        self.announce(AnnouncementKind::TimeLeft {
                            seconds: TIME_LEFT_WARNING.as_secs() as u32,
                        });
                    }
                    _ = sleep_until(duel_deadline), if !duel_checked => {
                        duel_checked = true;
                        if let Some(duel) = self
                            .current
                            .as_ref()
                            .and_then(|round| round.close_fight(DUEL_MARGIN, DUEL_FLOOR))
                        {
                            self.announce(duel);
                        }
                    }
                    _ = sleep_until(ends) => break,
                }
            }

            self.finish_round();
            self.spawn_prefetch(self.round_number + 1);

            let break_duration = Duration::from_millis(self.cfg.break_ms);
            self.events.emit(Event::BreakStarted {
                room_id: self.cfg.id.clone(),
                next_start_at: Utc::now()
                    + chrono::Duration::milliseconds(self.cfg.break_ms as i64),
            });
            let break_over = Instant::now() + break_duration;
            loop {
                tokio::select! {
                    cmd = rx.recv() => match cmd {
                        Some(cmd) => self.handle_cmd(cmd),
                        None => return,
                    },
                    _ = sleep_until(break_over) => break,
                }
            }
        }
    }

    /// Uses the prefetched grid when it matches the wanted round number,
    /// otherwise falls back to a fresh pool request (with retries, then an
    /// in-task search as a last resort).
    async fn obtain_prepared(
        &mut self,
        round_number: u64,
        rx: &mut mpsc::Receiver<RoomCmd>,
    ) -> PreparedRound {
        if let Some((prepared_for, receiver)) = self.prepared_next.take() {
            if prepared_for == round_number {
                // commands keep draining while the search finishes
                let mut receiver = receiver;
                loop {
                    tokio::select! {
                        result = &mut receiver => match result {
                            Ok(prepared) => return prepared,
                            Err(_) => {
                                warn!(room = %self.cfg.id, "prefetched grid was lost, searching again");
                                break;
                            }
                        },
                        cmd = rx.recv() => match cmd {
                            Some(cmd) => self.handle_cmd(cmd),
                            None => break,
                        },
                    }
                }
            } else {
                debug!(
                    room = %self.cfg.id,
                    prepared_for,
                    wanted = round_number,
                    "discarding stale prepared grid"
                );
            }
        }

        let plan = RoundPlan::for_round(round_number, &self.cfg);
        loop {
            for _ in 0..2 {
                match self
                    .pool
                    .prepare_round(self.cfg.grid_size, round_number, plan.clone())
                    .await
                {
                    Ok(prepared) => return prepared,
                    Err(e) => {
                        warn!(room = %self.cfg.id, %e, "grid search request failed, retrying");
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                }
            }
            // the pool keeps failing; search on a blocking thread instead
            let dict = self.dict.clone();
            let size = self.cfg.grid_size;
            let fallback_plan = plan.clone();
            let searched = tokio::task::spawn_blocking(move || {
                GridSearch::new(dict).prepare(
                    size,
                    round_number,
                    fallback_plan,
                    &mut rand::thread_rng(),
                )
            })
            .await;
            match searched {
                Ok(prepared) => return prepared,
                Err(e) => error!(room = %self.cfg.id, %e, "in-task grid search failed"),
            }
        }
    }

    fn start_round(&mut self, prepared: PreparedRound) {
        let special = special_info(&prepared);
        let quality = prepared.quality;
        let round = Round::start(prepared, self.cfg.round_ms, &self.players);
        info!(
            room = %self.cfg.id,
            round = round.number,
            kind = ?round.plan.kind,
            words = quality.words,
            "round started"
        );
        self.events.emit(Event::RoundStarted {
            room_id: self.cfg.id.clone(),
            round_id: round.id.clone(),
            round_number: round.number,
            grid: round.grid.clone(),
            grid_size: round.grid.size(),
            ends_at: round.ends_at,
            special,
            quality,
        });
        self.current = Some(round);
    }

    fn finish_round(&mut self) {
        let Some(round) = self.current.as_mut() else {
            return;
        };
        let Some(results) = round.finalize() else {
            return;
        };
        info!(
            room = %self.cfg.id,
            round = round.number,
            players = results.len(),
            "round ended"
        );
        self.events.emit(Event::RoundEnded {
            room_id: self.cfg.id.clone(),
            round_id: round.id.clone(),
            results,
        });
        if let Some(reveal) = round.target_reveal() {
            let announcement = Announcement::new(&self.cfg.id, reveal);
            self.events.emit(Event::Announcement(announcement));
        }
    }

    /// Fire-and-forget search for the next round's grid, so it is ready
    /// before the break elapses.
    fn spawn_prefetch(&mut self, round_number: u64) {
        let plan = RoundPlan::for_round(round_number, &self.cfg);
        let pool = self.pool.clone();
        let size = self.cfg.grid_size;
        let room_id = self.cfg.id.clone();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            for attempt in 1..=3u32 {
                match pool.prepare_round(size, round_number, plan.clone()).await {
                    Ok(prepared) => {
                        let _ = tx.send(prepared);
                        return;
                    }
                    Err(e) => {
                        warn!(room = %room_id, %e, attempt, "next-grid preparation failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        });
        self.prepared_next = Some((round_number, rx));
    }

    fn handle_cmd(&mut self, cmd: RoomCmd) {
        match cmd {
            RoomCmd::Submit {
                round_id,
                nick,
                word,
                reply,
            } => {
                let result = match self.current.as_mut() {
                    Some(round) => round.submit(&round_id, &nick, &word),
                    None => Err(SubmitError::NoRoundSubs),
                };
                if let Ok(outcome) = &result {
                    let notes = outcome.notes.clone();
                    if let Some(round) = self.current.as_ref() {
                        self.events.emit(Event::RankingUpdate {
                            room_id: self.cfg.id.clone(),
                            round_id: round.id.clone(),
                            ranking: round.ranking(),
                        });
                    }
                    for note in notes {
                        self.announce(note);
                    }
                }
                let _ = reply.send(result);
            }
            RoomCmd::Join { nick } => {
                if !nick.is_empty() && !self.players.contains(&nick) {
                    self.players.push(nick);
                }
            }
            RoomCmd::Leave { nick } => {
                self.players.retain(|p| p != &nick);
            }
            RoomCmd::Snapshot { reply } => {
                let round = self.current.as_ref().map(|round| RoundSnapshot {
                    round_id: round.id.clone(),
                    round_number: round.number,
                    kind: round.plan.kind,
                    running: round.is_running(),
                    ends_at: round.ends_at,
                });
                let _ = reply.send(RoomSnapshot {
                    id: self.cfg.id.clone(),
                    label: self.cfg.label.clone(),
                    grid_size: self.cfg.grid_size,
                    players: self.players.clone(),
                    round,
                });
            }
        }
    }

    fn announce(&self, kind: AnnouncementKind) {
        self.events
            .emit(Event::Announcement(Announcement::new(&self.cfg.id, kind)));
    }
}

fn special_info(prepared: &PreparedRound) -> Option<SpecialInfo> {
    if !prepared.plan.kind.is_special() {
        return None;
    }
    Some(SpecialInfo {
        kind: prepared.plan.kind,
        fixed_word_score: prepared.plan.fixed_word_score,
        bonus_letter: prepared.bonus_letter.as_ref().map(|pick| pick.letter),
        bonus_letter_value: prepared.bonus_letter.as_ref().map(|pick| pick.value),
    })
}

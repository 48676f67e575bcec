//! Session scripts: timed host actions replayed against the engine.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use murmur_audio::headless::{GraphSupport, HeadlessBackend, HeadlessOptions};
use murmur_audio::{AudioEngine, EngineRunner};
use murmur_core::{Error, InteractionKind, Platform, Result};
use serde::Deserialize;
use tracing::{debug, info};

const fn default_settle_ms() -> u64 {
    1000
}

/// A recorded reader session.
#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// Overrides the configured platform.
    #[serde(default)]
    pub platform: Option<Platform>,
    /// How the simulated platform behaves.
    #[serde(default)]
    pub backend: BackendOptions,
    /// Clip lengths in milliseconds, by source path.
    #[serde(default)]
    pub durations: HashMap<String, u64>,
    /// Time to keep running after the last step.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphMode {
    #[default]
    Available,
    Unavailable,
    ResumeFails,
    PrimeFails,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct BackendOptions {
    pub graph: GraphMode,
    pub start_suspended: bool,
    pub deferred_resume: bool,
    pub autoplay_blocked: bool,
}

impl From<BackendOptions> for HeadlessOptions {
    fn from(options: BackendOptions) -> Self {
        Self {
            graph: match options.graph {
                GraphMode::Available => GraphSupport::Available,
                GraphMode::Unavailable => GraphSupport::Unavailable,
                GraphMode::ResumeFails => GraphSupport::ResumeFails,
                GraphMode::PrimeFails => GraphSupport::PrimeFails,
            },
            start_suspended: options.start_suspended,
            deferred_resume: options.deferred_resume,
            autoplay_blocked: options.autoplay_blocked,
        }
    }
}

/// One action at a point in session time.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    PlayAmbient {
        key: String,
        #[serde(default)]
        path: Option<String>,
    },
    PauseAmbient,
    ResumeAmbient,
    StopAmbient,
    PlayPlayback {
        path: String,
    },
    StopPlayback,
    PlayEffect {
        path: String,
    },
    SetVolumes {
        #[serde(default)]
        ambient: Option<f32>,
        #[serde(default)]
        effects: Option<f32>,
    },
    SetMuted {
        muted: bool,
    },
    ToggleMuted,
    Interact {
        event: String,
    },
    ResumeBackend {
        ok: bool,
    },
}

impl Session {
    pub fn from_json(json: &str) -> Result<Self> {
        let mut session: Self = serde_json::from_str(json)?;
        session.validate()?;
        session.steps.sort_by_key(|step| step.at_ms);
        Ok(session)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        for step in &self.steps {
            if let Action::PlayEffect { path } | Action::PlayPlayback { path } = &step.action {
                if path.trim().is_empty() {
                    return Err(Error::Session(format!(
                        "step at {}ms has an empty path",
                        step.at_ms
                    )));
                }
            }
        }
        Ok(())
    }

    /// A headless backend with the session's options and clip lengths.
    pub fn backend(&self) -> HeadlessBackend {
        let backend = HeadlessBackend::with_options(self.backend.into());
        for (source, ms) in &self.durations {
            backend.set_duration(source.clone(), Duration::from_millis(*ms));
        }
        backend
    }

    /// Session time of the last step plus the settle time.
    pub fn end(&self) -> Duration {
        let last = self.steps.last().map_or(0, |step| step.at_ms);
        Duration::from_millis(last.saturating_add(self.settle_ms))
    }

    /// Replay on a simulated clock. Playback time and engine ticks move in lockstep.
    pub fn run_simulated(&self, engine: &mut AudioEngine<HeadlessBackend>) {
        let mut clock = SimulatedClock::new(engine.tick_interval());

        for step in &self.steps {
            clock.advance_to(engine, Duration::from_millis(step.at_ms));
            apply(engine, &step.action);
        }
        clock.advance_to(engine, self.end());
        info!("Session replayed in {:?} of simulated time", clock.now);
    }

    /// Replay on the wall clock, with an [`EngineRunner`] driving the ticks.
    pub fn run_realtime(
        &self,
        engine: AudioEngine<HeadlessBackend>,
    ) -> Result<AudioEngine<HeadlessBackend>> {
        let backend = engine.backend().clone();
        let runner = EngineRunner::spawn_with(engine, move |_, elapsed| {
            backend.advance(elapsed);
        })?;

        let start = Instant::now();
        for step in &self.steps {
            sleep_until(start + Duration::from_millis(step.at_ms));
            apply(&mut runner.lock(), &step.action);
        }
        sleep_until(start + self.end());
        info!("Session replayed in {:?}", start.elapsed());

        let engine = runner.engine();
        runner.stop()?;
        let engine = std::sync::Arc::try_unwrap(engine)
            .map_err(|_| Error::Runner("engine still shared after shutdown".to_string()))?;
        Ok(engine.into_inner())
    }
}

fn sleep_until(deadline: Instant) {
    let now = Instant::now();
    if deadline > now {
        std::thread::sleep(deadline - now);
    }
}

struct SimulatedClock {
    tick: Duration,
    now: Duration,
}

impl SimulatedClock {
    const fn new(tick: Duration) -> Self {
        Self {
            tick,
            now: Duration::ZERO,
        }
    }

    fn advance_to(&mut self, engine: &mut AudioEngine<HeadlessBackend>, target: Duration) {
        while self.now < target {
            let step = self.tick.min(target - self.now);
            engine.backend().advance(step);
            engine.advance(step);
            self.now += step;
        }
    }
}

/// Perform one session action.
pub fn apply(engine: &mut AudioEngine<HeadlessBackend>, action: &Action) {
    debug!("Applying {action:?}");
    match action {
        Action::PlayAmbient { key, path: Some(path) } => engine.play_ambient(path, key),
        Action::PlayAmbient { key, path: None } => engine.play_ambient_key(key),
        Action::PauseAmbient => engine.pause_ambient(),
        Action::ResumeAmbient => engine.resume_ambient(),
        Action::StopAmbient => engine.stop_ambient(),
        Action::PlayPlayback { path } => {
            engine.play_playback(path);
        }
        Action::StopPlayback => engine.stop_playback(),
        Action::PlayEffect { path } => {
            engine.play_effect(path);
        }
        Action::SetVolumes { ambient, effects } => engine.set_volumes(*ambient, *effects),
        Action::SetMuted { muted } => engine.set_muted(*muted),
        Action::ToggleMuted => {
            engine.toggle_muted();
        }
        Action::Interact { event } => {
            let Some(kind) = InteractionKind::from_event_name(event) else {
                debug!("Ignoring non-gesture event {event}");
                return;
            };
            // A real gesture also lifts the platform's autoplay block.
            engine.backend().allow_autoplay();
            engine.interaction(kind);
        }
        Action::ResumeBackend { ok: true } => {
            engine.backend().complete_resume();
            engine.backend_resumed(Ok(()));
        }
        Action::ResumeBackend { ok: false } => {
            engine.backend_resumed(Err(Error::Resume("rejected by host".to_string())));
        }
    }
}

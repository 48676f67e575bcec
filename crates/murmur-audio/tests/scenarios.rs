//! End-to-end engine behavior against the headless backend.

#![allow(clippy::unwrap_used, clippy::float_cmp)] // Tests use unwrap for brevity

use std::time::Duration;

use murmur_audio::headless::{GraphSupport, HeadlessBackend, HeadlessOptions};
use murmur_audio::{AmbientState, AudioEngine, EngineEvent, OutputKind, UnlockState};
use murmur_core::{EngineConfig, InteractionKind, Platform};

const CROSSFADE: Duration = Duration::from_millis(400);

fn direct() -> (HeadlessBackend, AudioEngine<HeadlessBackend>) {
    let backend = HeadlessBackend::new();
    let engine = AudioEngine::new(backend.clone(), &EngineConfig::default()).unwrap();
    (backend, engine)
}

fn gated(options: HeadlessOptions) -> (HeadlessBackend, AudioEngine<HeadlessBackend>) {
    let backend = HeadlessBackend::with_options(options);
    let config = EngineConfig {
        platform: Platform::GestureGated,
        ..EngineConfig::default()
    };
    let engine = AudioEngine::new(backend.clone(), &config).unwrap();
    (backend, engine)
}

/// Advance playback time and the engine together, tick by tick.
fn run(backend: &HeadlessBackend, engine: &mut AudioEngine<HeadlessBackend>, total: Duration) {
    let tick = engine.tick_interval();
    let mut elapsed = Duration::ZERO;
    while elapsed < total {
        backend.advance(tick);
        engine.advance(tick);
        elapsed += tick;
    }
}

#[test]
fn test_repeated_ambient_key_keeps_handle_and_position() {
    let (backend, mut engine) = direct();
    engine.play_ambient("rain.mp3", "rain");
    let id = engine.ambient_handle().unwrap().id();
    run(&backend, &mut engine, Duration::from_millis(500));

    for _ in 0..5 {
        engine.play_ambient("rain.mp3", "rain");
    }

    assert_eq!(engine.ambient_handle().unwrap().id(), id);
    let elements = backend.elements();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].position_ms, 500);
    assert_eq!(elements[0].play_calls, 1);
}

#[test]
fn test_crossfade_end_state() {
    let (backend, mut engine) = direct();
    engine.play_ambient("rain.mp3", "rain");
    run(&backend, &mut engine, CROSSFADE);

    engine.play_ambient("wind.mp3", "wind");
    assert!(matches!(engine.ambient_state(), AmbientState::Crossfading { .. }));
    run(&backend, &mut engine, CROSSFADE);

    let rain = backend.elements_for("rain.mp3").remove(0);
    let wind = backend.elements_for("wind.mp3").remove(0);
    assert!(rain.paused);
    assert_eq!(rain.volume, 0.0);
    assert!(!wind.paused);
    assert_eq!(wind.volume, 0.9);
    assert_eq!(
        engine.ambient_state(),
        AmbientState::Playing {
            key: "wind".to_string()
        }
    );
}

#[test]
fn test_fifth_effect_evicts_first() {
    let (backend, mut engine) = direct();
    let ids: Vec<_> = (0..5)
        .map(|i| engine.play_effect(&format!("fx{i}.mp3")))
        .collect();

    assert_eq!(engine.effect_count(), 4);
    let tracked: Vec<_> = engine.effect_handles().map(|h| h.id()).collect();
    assert_eq!(tracked, ids[1..].to_vec());
    assert!(backend.elements_for("fx0.mp3")[0].paused);
    assert!(!backend.elements_for("fx4.mp3")[0].paused);
}

#[test]
fn test_mute_silences_everything_and_restores_preferences() {
    let (backend, mut engine) = direct();
    engine.set_volumes(Some(0.7), Some(0.4));
    engine.play_ambient("rain.mp3", "rain");
    run(&backend, &mut engine, CROSSFADE);
    engine.play_effect("fx.mp3");

    engine.set_muted(true);
    assert_eq!(engine.ambient_handle().unwrap().volume(), 0.0);
    assert!(engine.ambient_handle().unwrap().is_muted());
    for handle in engine.effect_handles() {
        assert_eq!(handle.volume(), 0.0);
        assert!(handle.is_muted());
    }
    assert_eq!(engine.volumes().ambient.get(), 0.7);
    assert_eq!(engine.volumes().effects.get(), 0.4);

    engine.set_muted(false);
    assert_eq!(engine.ambient_handle().unwrap().volume(), 0.7);
    assert!(!engine.ambient_handle().unwrap().is_muted());
    for handle in engine.effect_handles() {
        assert_eq!(handle.volume(), 0.4);
    }
}

#[test]
fn test_mute_toggle_scenario() {
    let (backend, mut engine) = direct();
    engine.play_ambient("rain.mp3", "rain");
    run(&backend, &mut engine, CROSSFADE);
    let ambient = engine.ambient_handle().unwrap().clone();

    assert_eq!(ambient.volume(), 0.9);
    assert!(engine.toggle_muted());
    assert_eq!(ambient.volume(), 0.0);
    assert!(!engine.toggle_muted());
    assert_eq!(ambient.volume(), 0.9);
}

#[test]
fn test_playback_pauses_then_resumes_ambient() {
    let (backend, mut engine) = direct();
    backend.set_duration("letter.mp3", Duration::from_millis(1500));
    let events = engine.subscribe();

    engine.play_ambient("rain.mp3", "rain");
    run(&backend, &mut engine, Duration::from_millis(800));
    let id = engine.play_playback("letter.mp3");

    let rain = backend.elements_for("rain.mp3").remove(0);
    assert!(rain.paused);
    assert_eq!(rain.position_ms, 800);

    // Volume changes while the clip plays apply once ambient comes back.
    engine.set_volumes(Some(0.5), None);
    run(&backend, &mut engine, Duration::from_millis(1600));

    assert!(!engine.playback_active());
    let rain = backend.elements_for("rain.mp3").remove(0);
    assert!(!rain.paused);
    assert_eq!(rain.volume, 0.5);
    assert!(rain.position_ms >= 800);
    assert!(events
        .try_iter()
        .any(|event| event == EngineEvent::PlaybackFinished { id }));
}

#[test]
fn test_stop_playback_does_not_resume_ambient() {
    let (backend, mut engine) = direct();
    engine.play_ambient("rain.mp3", "rain");
    engine.play_playback("letter.mp3");
    engine.stop_playback();
    run(&backend, &mut engine, Duration::from_millis(500));

    assert!(!engine.playback_active());
    assert!(engine.ambient_handle().unwrap().is_paused());
    engine.resume_ambient();
    assert!(!engine.ambient_handle().unwrap().is_paused());
}

#[test]
fn test_pending_effects_wired_once_on_unlock() {
    let (backend, mut engine) = gated(HeadlessOptions::default());
    let ids: Vec<_> = (0..3).map(|_| engine.play_effect("step.mp3")).collect();
    for id in &ids {
        assert!(engine.is_pending(*id));
    }
    assert_eq!(engine.unlock_state(), UnlockState::Locked);
    assert_eq!(engine.output_kind(), OutputKind::Direct);

    engine.interaction(InteractionKind::TouchStart);
    assert_eq!(engine.unlock_state(), UnlockState::Unlocked);
    assert_eq!(engine.output_kind(), OutputKind::Graph);

    // Later interactions and propagation passes never wire again.
    engine.interaction(InteractionKind::Click);
    engine.set_muted(true);
    engine.set_muted(false);
    engine.set_volumes(Some(0.2), Some(0.3));

    let graph = backend.graph().unwrap();
    assert_eq!(backend.graphs_created(), 1);
    assert_eq!(graph.primed.len(), 1);
    for id in &ids {
        assert!(engine.is_wired(*id));
        assert!(!engine.is_pending(*id));
    }
    for element in backend.elements_for("step.mp3") {
        assert_eq!(element.connections.len(), 1);
        assert!(element.muted);
    }
}

#[test]
fn test_sounds_after_unlock_are_wired_immediately() {
    let (backend, mut engine) = gated(HeadlessOptions::default());
    engine.interaction(InteractionKind::PointerDown);

    engine.play_ambient("rain.mp3", "rain");
    engine.play_playback("letter.mp3");
    let fx = engine.play_effect("fx.mp3");
    assert!(engine.is_wired(fx));

    let gains = engine.bus_gains().unwrap();
    assert_eq!(gains.master, 1.0);
    assert_eq!(gains.ambient, 0.9);
    assert_eq!(gains.effects, 1.0);

    let graph = backend.graph().unwrap();
    let rain = backend.elements_for("rain.mp3").remove(0);
    let letter = backend.elements_for("letter.mp3").remove(0);
    let effect = backend.elements_for("fx.mp3").remove(0);
    assert_eq!(rain.connections.len(), 1);
    // Playback shares the effects gain node.
    assert_eq!(letter.connections, effect.connections);
    assert_ne!(rain.connections, effect.connections);
    assert!(graph.edges.contains(&(rain.connections[0], graph.outputs[0])));
}

#[test]
fn test_unmute_keeps_wired_sounds_off_the_direct_path() {
    let (backend, mut engine) = gated(HeadlessOptions::default());
    engine.interaction(InteractionKind::KeyDown);
    engine.play_ambient("rain.mp3", "rain");
    run(&backend, &mut engine, CROSSFADE);

    engine.set_muted(true);
    assert_eq!(engine.bus_gains().unwrap().master, 0.0);
    assert_eq!(engine.bus_gains().unwrap().ambient, 0.0);

    engine.set_muted(false);
    let gains = engine.bus_gains().unwrap();
    assert_eq!(gains.master, 1.0);
    assert_eq!(gains.ambient, 0.9);
    assert!(engine.ambient_handle().unwrap().is_muted());
    assert_eq!(engine.ambient_handle().unwrap().volume(), 0.9);
}

#[test]
fn test_unavailable_graph_falls_back_to_direct() {
    let (backend, mut engine) = gated(HeadlessOptions {
        graph: GraphSupport::Unavailable,
        ..HeadlessOptions::default()
    });
    let events = engine.subscribe();
    let fx = engine.play_effect("fx.mp3");

    engine.interaction(InteractionKind::Click);
    assert_eq!(engine.unlock_state(), UnlockState::Unlocked);
    assert_eq!(engine.output_kind(), OutputKind::Direct);
    assert!(!engine.is_pending(fx));
    assert!(!engine.is_wired(fx));
    assert!(engine.snapshot().degraded);
    assert_eq!(
        events.try_recv().unwrap(),
        EngineEvent::Unlocked { routed: false }
    );

    // Direct volume control still works.
    engine.set_muted(true);
    assert!(backend.elements_for("fx.mp3")[0].muted);
    engine.set_muted(false);
    assert!(!backend.elements_for("fx.mp3")[0].muted);
}

#[test]
fn test_resume_failure_falls_back_to_direct() {
    let (backend, mut engine) = gated(HeadlessOptions {
        graph: GraphSupport::ResumeFails,
        ..HeadlessOptions::default()
    });
    engine.interaction(InteractionKind::TouchStart);
    assert_eq!(engine.output_kind(), OutputKind::Direct);
    assert_eq!(backend.graph().unwrap().resumes, 1);
    assert!(engine.bus_gains().is_none());
}

#[test]
fn test_deferred_resume_completes_unlock() {
    let (backend, mut engine) = gated(HeadlessOptions {
        start_suspended: true,
        deferred_resume: true,
        ..HeadlessOptions::default()
    });
    engine.play_ambient("rain.mp3", "rain");
    engine.interaction(InteractionKind::TouchStart);
    assert_eq!(engine.unlock_state(), UnlockState::Unlocking);

    let fx = engine.play_effect("fx.mp3");
    assert!(engine.is_pending(fx));

    backend.complete_resume();
    engine.backend_resumed(Ok(()));
    assert_eq!(engine.unlock_state(), UnlockState::Unlocked);
    assert!(engine.is_wired(fx));
    assert!(engine.is_wired(engine.ambient_handle().unwrap().id()));
}

#[test]
fn test_direct_platform_ignores_interactions() {
    let (backend, mut engine) = direct();
    let fx = engine.play_effect("fx.mp3");
    for kind in InteractionKind::ALL {
        engine.interaction(kind);
    }
    assert_eq!(backend.graphs_created(), 0);
    assert!(!engine.is_pending(fx));
    assert_eq!(engine.unlock_state(), UnlockState::Unlocked);
}

#[test]
fn test_blocked_autoplay_is_not_retried() {
    let (backend, mut engine) = gated(HeadlessOptions {
        autoplay_blocked: true,
        ..HeadlessOptions::default()
    });
    engine.play_effect("fx.mp3");
    assert!(backend.elements_for("fx.mp3")[0].paused);

    backend.allow_autoplay();
    run(&backend, &mut engine, Duration::from_millis(100));
    assert_eq!(backend.elements_for("fx.mp3")[0].play_calls, 0);

    // The stale entry is purged on the next insertion.
    engine.play_effect("fx2.mp3");
    assert_eq!(engine.effect_count(), 1);
}

#[test]
fn test_failed_start_leaves_handle_paused() {
    let (backend, mut engine) = direct();
    backend.set_unplayable("broken.mp3");
    engine.play_effect("broken.mp3");
    assert_eq!(engine.effect_count(), 1);
    assert!(backend.elements_for("broken.mp3")[0].paused);

    // The paused entry is purged before the next insertion.
    engine.play_effect("ok.mp3");
    assert_eq!(engine.effect_count(), 1);
    assert_eq!(backend.elements_for("broken.mp3")[0].play_calls, 0);
}

#[test]
fn test_ambient_switch_during_playback_waits_for_clip() {
    let (backend, mut engine) = direct();
    backend.set_duration("letter.mp3", Duration::from_millis(500));
    engine.play_ambient("rain.mp3", "rain");
    run(&backend, &mut engine, CROSSFADE);

    engine.play_playback("letter.mp3");
    engine.play_ambient("wind.mp3", "wind");

    assert!(engine.playback_active());
    assert_eq!(engine.ambient_key(), Some("wind"));
    assert!(backend.elements_for("wind.mp3").remove(0).paused);
    assert!(backend.elements_for("rain.mp3").remove(0).paused);

    run(&backend, &mut engine, Duration::from_millis(600));
    assert!(!engine.playback_active());
    let wind = backend.elements_for("wind.mp3").remove(0);
    assert!(!wind.paused);
    assert_eq!(wind.volume, 0.9);
    assert!(backend.elements_for("rain.mp3").remove(0).paused);
}

#[test]
fn test_mute_reaches_crossfade_and_playback() {
    let (backend, mut engine) = direct();
    engine.set_volumes(Some(0.6), None);
    engine.play_ambient("rain.mp3", "rain");
    run(&backend, &mut engine, CROSSFADE);

    // Mid-crossfade: both the incoming and the outgoing track go silent.
    engine.play_ambient("wind.mp3", "wind");
    run(&backend, &mut engine, Duration::from_millis(100));
    let rain = engine.ambient_previous_handle().unwrap().clone();
    let wind = engine.ambient_handle().unwrap().clone();

    engine.set_muted(true);
    assert!(engine.is_muted());
    for handle in [&rain, &wind] {
        assert_eq!(handle.volume(), 0.0);
        assert!(handle.is_muted());
    }
    run(&backend, &mut engine, CROSSFADE);
    assert!(rain.is_paused());
    assert_eq!(rain.volume(), 0.0);
    assert_eq!(wind.volume(), 0.0);

    engine.set_muted(false);
    assert_eq!(wind.volume(), 0.6);
    assert!(!wind.is_muted());

    // During a playback clip.
    backend.set_duration("letter.mp3", Duration::from_millis(1000));
    engine.play_playback("letter.mp3");
    let clip = engine.playback_handle().unwrap().clone();
    assert_eq!(clip.volume(), 0.6);

    engine.set_muted(true);
    assert!(engine.is_muted());
    assert_eq!(clip.volume(), 0.0);
    assert!(clip.is_muted());

    engine.set_muted(false);
    assert!(!engine.is_muted());
    assert_eq!(clip.volume(), 0.6);
    assert!(!clip.is_muted());
    assert!(wind.is_paused());
}

//! Fluid Light headless runner
//!
//! Drives the engine at a fixed 60 Hz without a window: a short idle stretch
//! with a varying stability signal, then one focus session held at the canvas
//! center until every particle is fused. Pass a settings JSON path as the
//! first argument to override the defaults. Set `RUST_LOG=debug` for detail.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use fluid_light::consts::NOMINAL_DT;
    use fluid_light::{Engine, InputBuffer, Settings};
    use glam::Vec2;

    env_logger::init();
    log::info!("Fluid Light (headless) starting...");

    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::load(path),
        None => Settings::default(),
    };

    let canvas = Vec2::new(390.0, 844.0);
    let mut engine = Engine::silent(settings);
    let mut input = InputBuffer::new();
    input.resize(canvas);

    // Idle: stability swings between calm and agitated
    for frame in 0..600u32 {
        let t = frame as f32 * NOMINAL_DT;
        input.set_stability(50.0 + 50.0 * (t * 0.5).cos());
        let snap = engine.step(NOMINAL_DT, &input.take());
        if frame % 120 == 0 {
            log::info!(
                "t={:5.2}s chaos={:.2} speed={:.2} breath={:?}",
                t,
                snap.profile.chaos,
                snap.profile.speed,
                snap.breath.map(|b| b.phase)
            );
        }
    }

    input.set_stability(80.0);
    engine.start_focus_session();
    input.touch_began(canvas * 0.5);

    let max_frames = 60 * 600;
    let mut frames = 0;
    while frames < max_frames {
        let snap = engine.step(NOMINAL_DT, &input.take());
        frames += 1;
        if frames % 300 == 0 {
            log::info!(
                "focus t={:5.1}s fused {}/{} instability={:.2}",
                frames as f32 * NOMINAL_DT,
                snap.fused_count,
                snap.population,
                snap.local_instability
            );
        }
        if snap.session_complete {
            break;
        }
    }

    input.touch_ended();
    engine.step(NOMINAL_DT, &input.take());

    let snap = engine.snapshot();
    if snap.session_complete {
        println!(
            "Session complete: {} particles fused in {:.1}s",
            snap.fused_count,
            frames as f32 * NOMINAL_DT
        );
    } else {
        println!(
            "Session stopped after {:.1}s with {}/{} fused",
            frames as f32 * NOMINAL_DT,
            snap.fused_count,
            snap.population
        );
    }
    engine.end_focus_session();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The host app embeds the library; there is no standalone web entry point
}

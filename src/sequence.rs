// Loading sequence: the phase state machine driving the particle field.
// Timing is frame-based and host-driven; nothing here touches a clock.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::particle::ParticleField;
use crate::types::*;

type PhaseListener = Box<dyn FnMut(&PhaseChange)>;

/// One glyph as the host should draw it this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderGlyph {
    pub glyph: char,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub size: f32,
    pub opacity: f32,
    pub layer: f32,
    pub hue: f32,
    pub is_word: bool,
    /// Word glyphs: glow strength in [0, 1].
    pub glow: f32,
    /// Decorative glyphs: opacity multiplier from the slow pulse.
    pub pulse: f32,
}

/// Phase state machine for the letter-swirl loader.
pub struct LoadingSequence {
    config: SequenceConfig,
    field: ParticleField,
    phase: Phase,
    /// Frames elapsed in the current phase.
    phase_frames: u32,
    cycle: u32,
    stopped: bool,
    listeners: Vec<PhaseListener>,
}

impl LoadingSequence {
    pub fn new(config: SequenceConfig, canvas: CanvasSize) -> Result<Self, EngineError> {
        config.validate()?;
        let field = ParticleField::new(&config.word, config.decorative_count, canvas, config.seed)?;
        Ok(LoadingSequence {
            config,
            field,
            phase: Phase::Swirl,
            phase_frames: 0,
            cycle: 0,
            stopped: false,
            listeners: Vec::new(),
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_frames(&self) -> u32 {
        self.phase_frames
    }

    pub fn cycle(&self) -> u32 {
        self.cycle
    }

    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Register a callback fired on every phase transition.
    pub fn on_phase_change(&mut self, listener: impl FnMut(&PhaseChange) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Whether another frame should be scheduled.
    pub fn wants_frame(&self) -> bool {
        !self.stopped && !self.is_terminal()
    }

    pub fn is_terminal(&self) -> bool {
        self.config.variant == SequenceVariant::OneShot && self.phase == Phase::Formed
    }

    /// Idempotent. Later ticks are no-ops.
    pub fn stop(&mut self) {
        if !self.stopped {
            log::debug!("loading sequence stopped in {}", self.phase.as_str());
        }
        self.stopped = true;
    }

    pub fn resize(&mut self, canvas: CanvasSize, anchor: Option<Vec2>) {
        self.field.relayout(canvas, anchor);
    }

    /// Advance by `delta_frames` single-frame steps. Returns the transitions taken.
    pub fn tick(&mut self, delta_frames: u32) -> Vec<PhaseChange> {
        let mut changes = Vec::new();
        for _ in 0..delta_frames {
            if !self.wants_frame() {
                break;
            }
            if let Some(change) = self.step() {
                for listener in &mut self.listeners {
                    listener(&change);
                }
                changes.push(change);
            }
        }
        changes
    }

    fn step(&mut self) -> Option<PhaseChange> {
        self.phase_frames += 1;

        match self.phase {
            Phase::Swirl => self.field.swirl_step(),
            Phase::Forming => {
                let eased = ease_in_out_cubic(self.phase_progress());
                self.field.forming_step(eased);
            }
            Phase::Formed => {}
            Phase::Holding => self.field.hold_step(),
            Phase::Dissolving => {
                let first_frame = self.phase_frames == 1;
                self.field.dissolve_step(self.phase_progress(), first_frame);
            }
        }

        if self.phase_frames < self.duration_of(self.phase) {
            return None;
        }
        let next = self.next_phase()?;
        Some(self.enter(next))
    }

    fn enter(&mut self, next: Phase) -> PhaseChange {
        let change = PhaseChange {
            from: self.phase,
            to: next,
            cycle: self.cycle,
        };

        match next {
            Phase::Formed => {
                let hand_off = self.config.variant == SequenceVariant::OneShot;
                self.field.settle(hand_off);
            }
            Phase::Dissolving => self.field.rerandomize_decorative(),
            Phase::Swirl => self.cycle += 1,
            Phase::Forming | Phase::Holding => {}
        }

        log::debug!(
            "loader phase {} -> {} (cycle {})",
            change.from.as_str(),
            change.to.as_str(),
            change.cycle
        );
        self.phase = next;
        self.phase_frames = 0;
        change
    }

    fn next_phase(&self) -> Option<Phase> {
        let looping = self.config.variant == SequenceVariant::Looping;
        match self.phase {
            Phase::Swirl => Some(Phase::Forming),
            Phase::Forming => Some(Phase::Formed),
            Phase::Formed if looping => Some(Phase::Holding),
            Phase::Formed => None,
            Phase::Holding => Some(Phase::Dissolving),
            Phase::Dissolving => Some(Phase::Swirl),
        }
    }

    fn duration_of(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Swirl => self.config.swirl_duration,
            Phase::Forming => self.config.form_duration,
            Phase::Formed => 0,
            Phase::Holding => self.config.hold_duration,
            Phase::Dissolving => self.config.dissolve_duration,
        }
    }

    /// Linear progress through the current phase, clamped to [0, 1].
    pub fn phase_progress(&self) -> f32 {
        match self.duration_of(self.phase) {
            0 => 1.0,
            duration => (self.phase_frames as f32 / duration as f32).clamp(0.0, 1.0),
        }
    }

    /// Loader progress over swirl + forming, 0..=100. Floored, so it reads 100
    /// only once the word has formed.
    pub fn progress_percent(&self) -> u8 {
        let total = self.config.total_duration();
        let elapsed = match self.phase {
            Phase::Swirl => self.phase_frames,
            Phase::Forming => self.config.swirl_duration.saturating_add(self.phase_frames),
            Phase::Formed | Phase::Holding | Phase::Dissolving => total,
        };
        if total == 0 {
            return 100;
        }
        (u64::from(elapsed) * 100 / u64::from(total)).min(100) as u8
    }

    /// Visible glyphs sorted back to front.
    pub fn render_list(&self) -> Vec<RenderGlyph> {
        let glow = match self.phase {
            Phase::Swirl => 0.3,
            Phase::Forming => self.phase_progress(),
            _ => 1.0,
        };
        let mut glyphs: Vec<RenderGlyph> = self
            .field
            .particles()
            .iter()
            .filter(|p| p.opacity > 0.01)
            .map(|p| RenderGlyph {
                glyph: p.glyph,
                x: p.position.x,
                y: p.position.y,
                angle: p.angle,
                size: p.size,
                opacity: p.opacity,
                layer: p.layer,
                hue: p.hue,
                is_word: p.is_word(),
                glow: if p.is_word() { glow } else { 0.0 },
                pulse: if p.is_word() {
                    1.0
                } else {
                    (self.phase_frames as f32 * 0.02 + p.pulse_offset).sin() * 0.2 + 0.8
                },
            })
            .collect();
        glyphs.sort_by(|a, b| a.layer.total_cmp(&b.layer));
        glyphs
    }
}

pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn canvas() -> CanvasSize {
        CanvasSize::new(800.0, 600.0)
    }

    fn one_shot(swirl: u32, form: u32) -> LoadingSequence {
        let config = SequenceConfig {
            swirl_duration: swirl,
            form_duration: form,
            ..Default::default()
        };
        LoadingSequence::new(config, canvas()).unwrap()
    }

    fn looping() -> LoadingSequence {
        let config = SequenceConfig {
            swirl_duration: 10,
            form_duration: 10,
            hold_duration: 5,
            dissolve_duration: 5,
            variant: SequenceVariant::Looping,
            ..Default::default()
        };
        LoadingSequence::new(config, canvas()).unwrap()
    }

    #[test]
    fn transitions_at_configured_frames() {
        let mut seq = one_shot(180, 120);
        seq.tick(179);
        assert_eq!(seq.phase(), Phase::Swirl);
        seq.tick(1);
        assert_eq!(seq.phase(), Phase::Forming);
        assert_eq!(seq.phase_frames(), 0);
        seq.tick(1);
        assert_eq!(seq.phase(), Phase::Forming, "frame 181");
        seq.tick(118);
        assert_eq!(seq.phase(), Phase::Forming, "frame 299");
        seq.tick(1);
        assert_eq!(seq.phase(), Phase::Formed, "frame 300");
        seq.tick(1);
        assert_eq!(seq.phase(), Phase::Formed, "frame 301");
    }

    #[test]
    fn formed_is_terminal() {
        let mut seq = one_shot(3, 3);
        let changes = seq.tick(100);
        assert_eq!(changes.len(), 2);
        assert!(seq.is_terminal());
        assert!(!seq.wants_frame());
        assert_eq!(seq.phase_frames(), 0);
        assert!(seq.tick(10).is_empty());
    }

    #[test]
    fn progress_hits_100_exactly_at_formed() {
        let mut seq = one_shot(180, 120);
        assert_eq!(seq.progress_percent(), 0);
        seq.tick(150);
        assert_eq!(seq.progress_percent(), 50);
        seq.tick(149);
        assert_eq!(seq.phase(), Phase::Forming);
        assert_eq!(seq.progress_percent(), 99);
        seq.tick(1);
        assert_eq!(seq.progress_percent(), 100);
    }

    #[test]
    fn listeners_see_every_transition() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut seq = one_shot(2, 2);
        let sink = Rc::clone(&seen);
        seq.on_phase_change(move |change| sink.borrow_mut().push((change.from, change.to)));
        seq.tick(10);
        assert_eq!(
            *seen.borrow(),
            vec![
                (Phase::Swirl, Phase::Forming),
                (Phase::Forming, Phase::Formed)
            ]
        );
    }

    #[test]
    fn stop_is_idempotent_and_freezes() {
        let mut seq = one_shot(180, 120);
        seq.tick(10);
        seq.stop();
        seq.stop();
        let before = seq.field().particles().to_vec();
        assert!(seq.tick(50).is_empty());
        assert_eq!(seq.phase_frames(), 10);
        assert_eq!(seq.field().particles(), before.as_slice());
        assert!(!seq.wants_frame());
    }

    #[test]
    fn looping_variant_cycles_forever() {
        let mut seq = looping();
        // swirl 10 + forming 10 + formed 1 + holding 5 + dissolving 5
        let changes = seq.tick(31);
        let phases: Vec<Phase> = changes.iter().map(|c| c.to).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Forming,
                Phase::Formed,
                Phase::Holding,
                Phase::Dissolving,
                Phase::Swirl
            ]
        );
        assert_eq!(seq.cycle(), 1);
        assert!(seq.wants_frame());
        assert!(!seq.is_terminal());

        seq.tick(31 * 3);
        assert_eq!(seq.cycle(), 4);
        seq.stop();
        assert!(!seq.wants_frame());
    }

    #[test]
    fn looping_keeps_word_particles_tagged() {
        let mut seq = looping();
        seq.tick(31 * 2 + 7);
        let words = seq.field().word_particles().count();
        assert_eq!(words, 5);
    }

    #[test]
    fn one_shot_formed_hides_canvas_word() {
        let mut seq = one_shot(2, 2);
        seq.tick(4);
        assert!(seq.render_list().iter().all(|g| !g.is_word));
    }

    #[test]
    fn render_list_is_sorted_and_visible() {
        let mut seq = one_shot(180, 120);
        seq.tick(30);
        let list = seq.render_list();
        assert!(!list.is_empty());
        assert!(list.windows(2).all(|w| w[0].layer <= w[1].layer));
        assert!(list.iter().all(|g| g.opacity > 0.01));
        assert!(list.iter().filter(|g| g.is_word).all(|g| g.glow == 0.3));
    }

    #[test]
    fn easing_bounds() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-6);
        assert_eq!(ease_in_out_cubic(2.0), 1.0);
    }

    proptest! {
        #[test]
        fn phase_boundaries_match_durations(swirl in 1u32..60, form in 1u32..60) {
            let mut seq = one_shot(swirl, form);
            seq.tick(swirl - 1);
            prop_assert_eq!(seq.phase(), Phase::Swirl);
            seq.tick(1);
            prop_assert_eq!(seq.phase(), Phase::Forming);
            seq.tick(form - 1);
            prop_assert_eq!(seq.phase(), Phase::Forming);
            seq.tick(1);
            prop_assert_eq!(seq.phase(), Phase::Formed);
        }

        #[test]
        fn progress_is_monotonic(swirl in 1u32..60, form in 1u32..60, step in 1u32..7) {
            let mut seq = one_shot(swirl, form);
            let mut last = seq.progress_percent();
            while seq.wants_frame() {
                seq.tick(step);
                let now = seq.progress_percent();
                prop_assert!(now >= last);
                last = now;
            }
            prop_assert_eq!(last, 100);
        }
    }
}

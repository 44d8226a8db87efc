// Letter particles: field initialization, word layout, and per-phase kinematics.
// Pure state + math; the host draws whatever `render_list` hands it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::types::{CanvasSize, Vec2};

/// Glyphs may drift this far outside the canvas before bouncing back.
const EDGE_MARGIN: f32 = 50.0;
const DAMPING: f32 = 0.995;
const ANGULAR_DECAY: f32 = 0.999;
const WORD_TANGENTIAL: f32 = 0.2;
const WORD_CENTRIPETAL: f32 = 0.0005;
const DECOR_TANGENTIAL: f32 = 0.05;
const DECOR_CENTRIPETAL: f32 = 0.0002;
const DECOR_JITTER: f32 = 0.05;
const DECOR_FADE_PER_FRAME: f32 = 0.015;
const WORD_SWIRL_OPACITY: f32 = 0.8;
const DISSOLVE_BURST: f32 = 6.0;
const DISSOLVE_DAMPING: f32 = 0.96;

/// A single glyph on the animation surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    pub glyph: char,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
    pub size: f32,
    pub opacity: f32,
    /// Opacity a decorative glyph fades back to in the looping variant.
    pub base_opacity: f32,
    /// Depth in [0, 1]; drawn back to front.
    pub layer: f32,
    pub hue: f32,
    pub pulse_offset: f32,
    /// Set only for word particles.
    pub word_index: Option<usize>,
    /// Set only for word particles.
    pub target: Option<Vec2>,
}

impl Particle {
    pub fn is_word(&self) -> bool {
        self.word_index.is_some()
    }
}

/// Horizontal, centered, evenly spaced placement of the word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordLayout {
    pub font_size: f32,
    pub spacing: f32,
    pub start_x: f32,
    pub center_y: f32,
}

impl WordLayout {
    pub fn compute(letters: usize, size: CanvasSize, center: Vec2) -> Self {
        let font_size = (size.width / 10.0).clamp(40.0, 80.0);
        let spacing = font_size * 0.9;
        let total_width = letters.saturating_sub(1) as f32 * spacing;
        WordLayout {
            font_size,
            spacing,
            start_x: center.x - total_width / 2.0,
            center_y: center.y,
        }
    }

    pub fn target(&self, index: usize) -> Vec2 {
        Vec2::new(self.start_x + index as f32 * self.spacing, self.center_y)
    }
}

/// Every particle of the loader plus the geometry they move in.
pub struct ParticleField {
    particles: Vec<Particle>,
    glyphs: Vec<char>,
    size: CanvasSize,
    center: Vec2,
    layout: WordLayout,
    rng: StdRng,
}

impl ParticleField {
    /// One word particle per character of `word` (indices `0..len`), followed by
    /// `decorative_count` decorative glyphs.
    pub fn new(
        word: &str,
        decorative_count: usize,
        size: CanvasSize,
        seed: u64,
    ) -> Result<Self, EngineError> {
        let glyphs: Vec<char> = word.chars().collect();
        if glyphs.is_empty() {
            return Err(EngineError::InvalidConfig("word must not be empty".into()));
        }

        let center = size.center();
        let layout = WordLayout::compute(glyphs.len(), size, center);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut particles = Vec::with_capacity(glyphs.len() + decorative_count);

        for (index, &glyph) in glyphs.iter().enumerate() {
            let mut particle = random_decorative(&mut rng, &glyphs, size);
            particle.glyph = glyph;
            particle.word_index = Some(index);
            particle.target = Some(layout.target(index));
            particle.size = layout.font_size;
            particle.opacity = WORD_SWIRL_OPACITY;
            particle.base_opacity = WORD_SWIRL_OPACITY;
            particle.layer = 1.0;
            particles.push(particle);
        }

        for _ in 0..decorative_count {
            particles.push(random_decorative(&mut rng, &glyphs, size));
        }

        log::debug!(
            "particle field: {} word + {} decorative glyphs on {}x{}",
            glyphs.len(),
            decorative_count,
            size.width,
            size.height
        );

        Ok(ParticleField {
            particles,
            glyphs,
            size,
            center,
            layout,
            rng,
        })
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn word_particles(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.is_word())
    }

    pub fn size(&self) -> CanvasSize {
        self.size
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn layout(&self) -> WordLayout {
        self.layout
    }

    /// Recompute word targets for a new canvas size. `anchor` is where the
    /// formed word should be centered; defaults to the canvas center.
    /// Decorative particles are left as they are.
    pub fn relayout(&mut self, size: CanvasSize, anchor: Option<Vec2>) {
        self.size = size;
        self.center = anchor.unwrap_or_else(|| size.center());
        self.layout = WordLayout::compute(self.glyphs.len(), size, self.center);

        let layout = self.layout;
        for particle in &mut self.particles {
            if let Some(index) = particle.word_index {
                particle.target = Some(layout.target(index));
                particle.size = layout.font_size;
            }
        }
    }

    /// Orbit around the center with a weak pull inward.
    pub fn swirl_step(&mut self) {
        let ParticleField {
            particles,
            size,
            center,
            rng,
            ..
        } = self;

        for p in particles.iter_mut() {
            let d = p.position - *center;
            let dist = match d.length() {
                len if len > 0.0 => len,
                _ => 1.0,
            };
            let tangent = d.perp() * (1.0 / dist);

            if p.is_word() {
                p.velocity += tangent * WORD_TANGENTIAL;
                p.velocity += d * -WORD_CENTRIPETAL;
            } else {
                p.velocity += tangent * DECOR_TANGENTIAL;
                p.velocity += d * -DECOR_CENTRIPETAL;
                p.velocity += Vec2::new(
                    rng.random_range(-DECOR_JITTER..DECOR_JITTER),
                    rng.random_range(-DECOR_JITTER..DECOR_JITTER),
                );
            }

            p.velocity = p.velocity * DAMPING;
            p.position += p.velocity;
            p.angle += p.angular_velocity;
            p.angular_velocity *= ANGULAR_DECAY;
            bounce(p, *size);
        }
    }

    /// `eased` is the eased phase progress in [0, 1].
    pub fn forming_step(&mut self, eased: f32) {
        let font_size = self.layout.font_size;
        for p in &mut self.particles {
            match p.target {
                Some(target) => {
                    let rate = 0.05 + eased * 0.1;
                    p.position += (target - p.position) * rate;
                    p.angle *= 0.95;
                    p.opacity = (0.6 + eased * 0.4).min(1.0);
                    p.size = font_size * (5.0 / 6.0 + eased / 6.0);
                }
                None => {
                    p.position += p.velocity * 0.5;
                    p.angle += p.angular_velocity * 0.5;
                    p.opacity = (p.opacity - DECOR_FADE_PER_FRAME).max(0.0);
                }
            }
        }
    }

    /// Snap word particles onto their targets. With `hand_off`, their canvas
    /// opacity drops to zero because the host shows the word as static text.
    pub fn settle(&mut self, hand_off: bool) {
        let font_size = self.layout.font_size;
        for p in &mut self.particles {
            if let Some(target) = p.target {
                p.position = target;
                p.velocity = Vec2::ZERO;
                p.angle = 0.0;
                p.angular_velocity = 0.0;
                p.size = font_size;
                p.opacity = if hand_off { 0.0 } else { 1.0 };
            }
        }
    }

    pub fn hold_step(&mut self) {
        for p in &mut self.particles {
            match p.target {
                Some(target) => {
                    p.position = target;
                    p.opacity = 1.0;
                }
                None => p.position += p.velocity * 0.5,
            }
        }
    }

    /// Explode the word outward and fade decorative glyphs back in.
    /// `progress` is the linear phase progress in [0, 1].
    pub fn dissolve_step(&mut self, progress: f32, first_frame: bool) {
        let ParticleField {
            particles,
            size,
            center,
            rng,
            ..
        } = self;

        for p in particles.iter_mut() {
            if p.is_word() {
                if first_frame {
                    let outward = (p.position - *center).normalize_or_zero();
                    p.velocity = outward * DISSOLVE_BURST
                        + Vec2::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0));
                    p.angular_velocity = rng.random_range(-0.1..0.1);
                }
                p.opacity = 1.0 + (WORD_SWIRL_OPACITY - 1.0) * progress;
            } else {
                p.opacity = p.base_opacity * progress;
            }

            p.velocity = p.velocity * DISSOLVE_DAMPING;
            p.position += p.velocity;
            p.angle += p.angular_velocity;
            bounce(p, *size);
        }
    }

    /// Fresh random kinematics and glyphs for every decorative particle, starting invisible.
    pub fn rerandomize_decorative(&mut self) {
        let ParticleField {
            particles,
            glyphs,
            size,
            rng,
            ..
        } = self;

        for p in particles.iter_mut().filter(|p| !p.is_word()) {
            *p = random_decorative(rng, glyphs, *size);
            p.opacity = 0.0;
        }
    }
}

fn random_decorative(rng: &mut StdRng, glyphs: &[char], size: CanvasSize) -> Particle {
    let layer: f32 = rng.random();
    let base_opacity = 0.1 + layer * 0.5;
    Particle {
        glyph: glyphs[rng.random_range(0..glyphs.len())],
        position: Vec2::new(
            rng.random::<f32>() * size.width,
            rng.random::<f32>() * size.height,
        ),
        velocity: Vec2::new(rng.random_range(-1.5..1.5), rng.random_range(-1.5..1.5)),
        angle: rng.random::<f32>() * std::f32::consts::TAU,
        angular_velocity: rng.random_range(-0.05..0.05),
        size: 10.0 + layer * 40.0,
        opacity: base_opacity,
        base_opacity,
        layer,
        hue: rng.random::<f32>() * 30.0,
        pulse_offset: rng.random::<f32>() * std::f32::consts::TAU,
        word_index: None,
        target: None,
    }
}

/// Clamp to the margin and reverse the offending component at half speed.
fn bounce(p: &mut Particle, size: CanvasSize) {
    if p.position.x < -EDGE_MARGIN {
        p.position.x = -EDGE_MARGIN;
        p.velocity.x = p.velocity.x.abs() * 0.5;
    }
    if p.position.x > size.width + EDGE_MARGIN {
        p.position.x = size.width + EDGE_MARGIN;
        p.velocity.x = -p.velocity.x.abs() * 0.5;
    }
    if p.position.y < -EDGE_MARGIN {
        p.position.y = -EDGE_MARGIN;
        p.velocity.y = p.velocity.y.abs() * 0.5;
    }
    if p.position.y > size.height + EDGE_MARGIN {
        p.position.y = size.height + EDGE_MARGIN;
        p.velocity.y = -p.velocity.y.abs() * 0.5;
    }
}

// Site controller: ties the preference gate, the loading sequence, and the
// timeline together. Every host-facing call returns a batch of page commands.

use crate::error::EngineError;
use crate::preference::{PreferenceGate, PreferenceStore};
use crate::sequence::{LoadingSequence, RenderGlyph};
use crate::timeline::Timeline;
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheduled {
    Reveal(RevealTarget),
    FallbackReveal,
    Dismiss,
    StartPageEffects,
}

/// Where the loading screen is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderState {
    NotStarted,
    /// A stored preference existed; the loader never ran.
    Skipped,
    Running,
    Dismissed,
}

pub struct SiteController<S: PreferenceStore> {
    config: SiteConfig,
    gate: PreferenceGate<S>,
    canvas: Option<CanvasSize>,
    /// Center of the formed-word element, as last reported by the host.
    anchor: Option<Vec2>,
    sequence: Option<LoadingSequence>,
    timeline: Timeline<Scheduled>,
    state: LoaderState,
    cascade_started: bool,
    selection_made: bool,
    last_progress: Option<u8>,
}

impl<S: PreferenceStore> SiteController<S> {
    /// `canvas` is `None` when the page has no animation surface; the loader
    /// then runs without particles.
    pub fn new(
        config: SiteConfig,
        store: S,
        canvas: Option<CanvasSize>,
    ) -> Result<Self, EngineError> {
        config.sequence.validate()?;
        let gate = PreferenceGate::new(store, config.storage_key.clone());
        Ok(SiteController {
            config,
            gate,
            canvas,
            anchor: None,
            sequence: None,
            timeline: Timeline::new(),
            state: LoaderState::NotStarted,
            cascade_started: false,
            selection_made: false,
            last_progress: None,
        })
    }

    pub fn state(&self) -> LoaderState {
        self.state
    }

    pub fn preference(&self) -> Option<Preference> {
        self.gate.current()
    }

    pub fn gate(&self) -> &PreferenceGate<S> {
        &self.gate
    }

    pub fn sequence(&self) -> Option<&LoadingSequence> {
        self.sequence.as_ref()
    }

    /// Mutable access, e.g. to register `on_phase_change` listeners.
    pub fn sequence_mut(&mut self) -> Option<&mut LoadingSequence> {
        self.sequence.as_mut()
    }

    pub fn next_due(&self) -> Option<Timestamp> {
        self.timeline.next_due()
    }

    /// Page load. Skips the loader entirely when a preference is stored.
    pub fn start(&mut self, now: Timestamp) -> Result<Vec<PageCommand>, EngineError> {
        if self.state != LoaderState::NotStarted {
            return Ok(Vec::new());
        }

        if let Some(pref) = self.gate.current() {
            log::info!("stored preference {pref}; skipping loader");
            self.state = LoaderState::Skipped;
            let mut commands = self.gate.apply_current();
            commands.extend([
                PageCommand::HideLoadingScreen,
                PageCommand::ShowMainContent,
                PageCommand::ShowNav,
                PageCommand::SetBodyLoading { loading: false },
                PageCommand::StartPageEffects,
            ]);
            return Ok(commands);
        }

        let mut commands = vec![
            PageCommand::SetBodyLoading { loading: true },
            PageCommand::ShowLoadingScreen,
        ];

        match self.canvas {
            Some(canvas) => {
                let mut sequence = LoadingSequence::new(self.config.sequence.clone(), canvas)?;
                if self.anchor.is_some() {
                    sequence.resize(canvas, self.anchor);
                }
                self.sequence = Some(sequence);
                self.last_progress = Some(0);
                commands.push(PageCommand::SetProgress { percent: 0 });
            }
            None => log::debug!("no animation surface; loader runs without particles"),
        }

        if let Some(delay) = self.config.fallback_reveal_ms {
            self.timeline.schedule(now, delay, Scheduled::FallbackReveal);
        }

        self.state = LoaderState::Running;
        Ok(commands)
    }

    /// One host animation frame covering `delta_frames` display frames.
    pub fn frame(&mut self, now: Timestamp, delta_frames: u32) -> FrameOutput {
        let mut commands = Vec::new();

        if self.state == LoaderState::Running {
            if let Some(sequence) = self.sequence.as_mut() {
                let changes = sequence.tick(delta_frames);
                let percent = sequence.progress_percent();
                let formed = changes.iter().any(|c| c.to == Phase::Formed);
                let hand_off = sequence.config().variant == SequenceVariant::OneShot;

                if self.last_progress != Some(percent) {
                    self.last_progress = Some(percent);
                    commands.push(PageCommand::SetProgress { percent });
                }
                if formed && !self.cascade_started {
                    self.cascade_started = true;
                    commands.extend(self.start_reveal_cascade(now, hand_off));
                }
            }
        }

        commands.extend(self.advance_clock(now));

        let request_frame = self.state == LoaderState::Running
            && self.sequence.as_ref().is_some_and(|s| s.wants_frame());
        FrameOutput {
            commands,
            request_frame,
        }
    }

    /// Fire every timer due at `now`.
    pub fn advance_clock(&mut self, now: Timestamp) -> Vec<PageCommand> {
        let mut commands = Vec::new();
        for item in self.timeline.advance(now) {
            log::debug!("timeline fired {item:?}");
            commands.extend(self.dispatch(item, now));
        }
        commands
    }

    /// The user picked a variant on the loading screen. Only the first pick counts.
    pub fn select_preference(&mut self, pref: Preference, now: Timestamp) -> Vec<PageCommand> {
        if self.selection_made {
            return Vec::new();
        }
        self.selection_made = true;

        let commands = self.gate.set_preference(pref);
        if self.state == LoaderState::Running {
            self.timeline
                .schedule(now, self.config.dismiss_delay_ms, Scheduled::Dismiss);
        }
        commands
    }

    /// The always-available version switch.
    pub fn toggle_preference(&mut self) -> Vec<PageCommand> {
        self.gate.toggle()
    }

    /// Explicit external stop of the animation loop.
    pub fn stop_animation(&mut self) -> Vec<PageCommand> {
        match self.sequence.as_mut() {
            Some(sequence) if !sequence.is_stopped() => {
                sequence.stop();
                vec![PageCommand::StopAnimation]
            }
            _ => Vec::new(),
        }
    }

    /// Safe to call before `start`; the size and anchor are kept for the
    /// sequence created there.
    pub fn resize(&mut self, canvas: CanvasSize, anchor: Option<Vec2>) {
        self.canvas = Some(canvas);
        self.anchor = anchor;
        if let Some(sequence) = self.sequence.as_mut() {
            sequence.resize(canvas, anchor);
        }
    }

    pub fn render_list(&self) -> Vec<RenderGlyph> {
        self.sequence
            .as_ref()
            .map(LoadingSequence::render_list)
            .unwrap_or_default()
    }

    fn start_reveal_cascade(&mut self, now: Timestamp, hand_off: bool) -> Vec<PageCommand> {
        let timing = &self.config.sequence.reveal;
        let delays = [
            (timing.subtitle_ms, RevealTarget::Subtitle),
            (timing.version_selector_ms, RevealTarget::VersionSelector),
            (timing.progress_bar_ms, RevealTarget::ProgressBar),
        ];
        for (delay, target) in delays {
            self.timeline.schedule(now, delay, Scheduled::Reveal(target));
        }

        // Looping presentations keep drawing the word on the canvas.
        if hand_off {
            vec![PageCommand::Reveal {
                target: RevealTarget::FormedWord,
            }]
        } else {
            Vec::new()
        }
    }

    fn dispatch(&mut self, item: Scheduled, now: Timestamp) -> Vec<PageCommand> {
        match item {
            Scheduled::Reveal(target) if self.state == LoaderState::Running => {
                vec![PageCommand::Reveal { target }]
            }
            Scheduled::FallbackReveal if self.state == LoaderState::Running => {
                if self.cascade_started {
                    return Vec::new();
                }
                log::debug!("fallback reveal: animation did not finish in time");
                [
                    RevealTarget::FormedWord,
                    RevealTarget::Subtitle,
                    RevealTarget::VersionSelector,
                ]
                .into_iter()
                .map(|target| PageCommand::Reveal { target })
                .collect()
            }
            Scheduled::Dismiss if self.state == LoaderState::Running => self.dismiss(now),
            Scheduled::StartPageEffects => vec![PageCommand::StartPageEffects],
            _ => Vec::new(),
        }
    }

    fn dismiss(&mut self, now: Timestamp) -> Vec<PageCommand> {
        self.state = LoaderState::Dismissed;
        let mut commands = self.stop_animation();
        commands.extend([
            PageCommand::HideLoadingScreen,
            PageCommand::ShowMainContent,
            PageCommand::ShowNav,
            PageCommand::SetBodyLoading { loading: false },
        ]);
        self.timeline.schedule(
            now,
            self.config.page_effects_delay_ms,
            Scheduled::StartPageEffects,
        );
        commands
    }
}

// Post-load page effects: terminal demo pacing, typewriter, parallax, scroll cascade.
// Pure timing math; the host applies styles.

use serde::{Deserialize, Serialize};

/// Page effect timing, passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectSettings {
    #[serde(default = "default_terminal_line_ms")]
    pub terminal_line_ms: u64,
    #[serde(default = "default_terminal_menu_ms")]
    pub terminal_menu_ms: u64,
    #[serde(default = "default_typewriter_start_ms")]
    pub typewriter_start_ms: u64,
    #[serde(default = "default_typewriter_char_ms")]
    pub typewriter_char_ms: u64,
    #[serde(default = "default_cursor_blink_ms")]
    pub cursor_blink_ms: u64,
    #[serde(default = "default_parallax_factor")]
    pub parallax_factor: f32,
    #[serde(default = "default_scroll_stagger_ms")]
    pub scroll_stagger_ms: u64,
}

fn default_terminal_line_ms() -> u64 {
    200
}

fn default_terminal_menu_ms() -> u64 {
    300
}

fn default_typewriter_start_ms() -> u64 {
    500
}

fn default_typewriter_char_ms() -> u64 {
    150
}

fn default_cursor_blink_ms() -> u64 {
    500
}

fn default_parallax_factor() -> f32 {
    0.3
}

fn default_scroll_stagger_ms() -> u64 {
    50
}

impl Default for EffectSettings {
    fn default() -> Self {
        EffectSettings {
            terminal_line_ms: default_terminal_line_ms(),
            terminal_menu_ms: default_terminal_menu_ms(),
            typewriter_start_ms: default_typewriter_start_ms(),
            typewriter_char_ms: default_typewriter_char_ms(),
            cursor_blink_ms: default_cursor_blink_ms(),
            parallax_factor: default_parallax_factor(),
            scroll_stagger_ms: default_scroll_stagger_ms(),
        }
    }
}

/// Element of the scripted terminal demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum TerminalItem {
    Line(usize),
    Menu(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalStep {
    pub delay_ms: u64,
    pub item: TerminalItem,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypewriterFrame {
    pub text: String,
    pub cursor_visible: bool,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParallaxFrame {
    pub translate_y: f32,
    pub opacity: f32,
}

pub struct PageEffects {
    settings: EffectSettings,
}

impl PageEffects {
    pub fn new(settings: EffectSettings) -> Self {
        PageEffects { settings }
    }

    /// Reveal order for a terminal showcase: each line, then its menu (if any).
    /// A menu pushes every later line back.
    pub fn terminal_schedule(&self, lines: usize, menus: usize) -> Vec<TerminalStep> {
        let mut steps = Vec::with_capacity(lines + menus.min(lines));
        let mut delay_ms = 0;

        for i in 0..lines {
            steps.push(TerminalStep {
                delay_ms,
                item: TerminalItem::Line(i),
            });
            delay_ms += self.settings.terminal_line_ms;

            if i < menus {
                steps.push(TerminalStep {
                    delay_ms,
                    item: TerminalItem::Menu(i),
                });
                delay_ms += self.settings.terminal_menu_ms;
            }
        }

        steps
    }

    /// What the hero title shows `elapsed_ms` after the effect started.
    pub fn typewriter_at(&self, text: &str, elapsed_ms: u64) -> TypewriterFrame {
        let total = text.chars().count() as u64;
        let start = self.settings.typewriter_start_ms;
        let step = self.settings.typewriter_char_ms.max(1);

        let typed = if elapsed_ms < start {
            0
        } else {
            ((elapsed_ms - start) / step + 1).min(total)
        };
        let done_at = start + total * step;
        let done = elapsed_ms >= done_at;

        let cursor_visible = if done {
            let blink = self.settings.cursor_blink_ms.max(1);
            ((elapsed_ms - done_at) / blink) % 2 == 0
        } else {
            true
        };

        TypewriterFrame {
            text: text.chars().take(typed as usize).collect(),
            cursor_visible,
            done,
        }
    }

    /// Hero offset for the current scroll position. `None` once the hero is out of view.
    pub fn parallax(&self, scrolled: f32, viewport_height: f32) -> Option<ParallaxFrame> {
        if viewport_height <= 0.0 || scrolled >= viewport_height {
            return None;
        }
        Some(ParallaxFrame {
            translate_y: scrolled * self.settings.parallax_factor,
            opacity: 1.0 - scrolled / viewport_height,
        })
    }

    /// Delay for the `index`-th element of a batch entering view.
    pub fn scroll_reveal_delay(&self, index: usize) -> u64 {
        index as u64 * self.settings.scroll_stagger_ms
    }
}

impl Default for PageEffects {
    fn default() -> Self {
        Self::new(EffectSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menus_push_lines_back() {
        let effects = PageEffects::default();
        let steps = effects.terminal_schedule(3, 1);
        assert_eq!(
            steps,
            vec![
                TerminalStep {
                    delay_ms: 0,
                    item: TerminalItem::Line(0)
                },
                TerminalStep {
                    delay_ms: 200,
                    item: TerminalItem::Menu(0)
                },
                TerminalStep {
                    delay_ms: 500,
                    item: TerminalItem::Line(1)
                },
                TerminalStep {
                    delay_ms: 700,
                    item: TerminalItem::Line(2)
                },
            ]
        );
    }

    #[test]
    fn extra_menus_are_ignored() {
        let effects = PageEffects::default();
        assert_eq!(effects.terminal_schedule(1, 4).len(), 2);
        assert!(effects.terminal_schedule(0, 2).is_empty());
    }

    #[test]
    fn typewriter_types_then_blinks() {
        let effects = PageEffects::default();
        assert_eq!(effects.typewriter_at("cnmsb", 0).text, "");
        assert_eq!(effects.typewriter_at("cnmsb", 500).text, "c");
        assert_eq!(effects.typewriter_at("cnmsb", 799).text, "cn");

        let typing = effects.typewriter_at("cnmsb", 1100);
        assert_eq!(typing.text, "cnmsb");
        assert!(!typing.done);
        assert!(typing.cursor_visible);

        // Done at 500 + 5 * 150 = 1250.
        assert!(effects.typewriter_at("cnmsb", 1250).cursor_visible);
        assert!(!effects.typewriter_at("cnmsb", 1750).cursor_visible);
        assert!(effects.typewriter_at("cnmsb", 2250).done);
    }

    #[test]
    fn parallax_fades_hero() {
        let effects = PageEffects::default();
        let frame = effects.parallax(400.0, 800.0).unwrap();
        assert!((frame.translate_y - 120.0).abs() < 1e-4);
        assert!((frame.opacity - 0.5).abs() < 1e-6);
        assert!(effects.parallax(800.0, 800.0).is_none());
    }

    #[test]
    fn scroll_cascade_staggers() {
        let effects = PageEffects::default();
        assert_eq!(effects.scroll_reveal_delay(0), 0);
        assert_eq!(effects.scroll_reveal_delay(4), 200);
    }
}

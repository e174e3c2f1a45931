//! Speech Bubble Layout
//!
//! Wraps a message into lines and sizes the rounded rectangle around it.
//! Glyph width is approximated from the font size; renderers that measure
//! real glyphs may reflow, but the line breaks stay stable.

use std::time::Duration;

use serde::Serialize;
use textwrap::wrap;
use unicode_width::UnicodeWidthStr;

use super::color::Rgba;
use crate::settings::SpeechBubbleSettings;

/// Average glyph advance as a fraction of the font size
const CHAR_WIDTH_RATIO: f32 = 0.6;
/// Line height as a multiple of the font size
const LINE_HEIGHT_RATIO: f32 = 1.3;
/// Fade-out at the end of the display time
const FADE_OUT: Duration = Duration::from_millis(250);

/// A laid-out bubble ready to draw
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BubbleLayout {
    /// Original message
    pub text: String,
    /// Wrapped lines
    pub lines: Vec<String>,
    /// Outer width in pixels
    pub width: f32,
    /// Outer height in pixels
    pub height: f32,
    /// Corner radius in pixels
    pub corner_radius: f32,
    /// Inner padding in pixels
    pub padding: f32,
    /// Font size in points
    pub font_size: f32,
    /// Fill colour
    pub background: Rgba,
    /// Text colour
    pub text_color: Rgba,
    /// Outline colour
    pub border: Rgba,
    /// Overall opacity (fades near the end)
    pub opacity: f32,
}

/// Lay out `text` if it is still visible `shown_for` after appearing
#[must_use]
pub fn layout(text: &str, style: &SpeechBubbleSettings, shown_for: Duration) -> Option<BubbleLayout> {
    let visible_for = style.display_duration();
    if text.trim().is_empty() || shown_for >= visible_for {
        return None;
    }

    let char_width = style.font_size * CHAR_WIDTH_RATIO;
    let inner_width = (style.max_width - 2.0 * style.padding).max(char_width);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let columns = ((inner_width / char_width).floor() as usize).max(1);

    let lines: Vec<String> = wrap(text, columns)
        .into_iter()
        .map(|cow| cow.into_owned())
        .collect();
    let widest = lines.iter().map(|l| l.width()).max().unwrap_or(0);

    #[allow(clippy::cast_precision_loss)]
    let width = (widest as f32 * char_width + 2.0 * style.padding).min(style.max_width);
    #[allow(clippy::cast_precision_loss)]
    let height = lines.len() as f32 * style.font_size * LINE_HEIGHT_RATIO + 2.0 * style.padding;

    let remaining = visible_for - shown_for;
    let opacity = if remaining < FADE_OUT {
        remaining.as_secs_f32() / FADE_OUT.as_secs_f32()
    } else {
        1.0
    };

    Some(BubbleLayout {
        text: text.to_string(),
        lines,
        width,
        height,
        corner_radius: style.corner_radius,
        padding: style.padding,
        font_size: style.font_size,
        background: style.background(),
        text_color: style.text(),
        border: style.border(),
        opacity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_single_line() {
        let style = SpeechBubbleSettings::default();
        let b = layout("Hi!", &style, Duration::ZERO).unwrap();
        assert_eq!(b.lines, vec!["Hi!".to_string()]);
        assert!(b.width <= style.max_width);
        assert!((b.opacity - 1.0).abs() < f32::EPSILON);
        assert_eq!(b.background, Rgba::WHITE);
    }

    #[test]
    fn test_long_message_wraps_within_max_width() {
        let style = SpeechBubbleSettings::default();
        let text = "Let me take a look at that file and see what the problem might be";
        let b = layout(text, &style, Duration::ZERO).unwrap();
        assert!(b.lines.len() > 1);
        assert!(b.width <= style.max_width + f32::EPSILON);
        assert_eq!(b.lines.join(" "), text);
    }

    #[test]
    fn test_hidden_after_display_duration() {
        let style = SpeechBubbleSettings::default();
        assert!(layout("Hi", &style, Duration::from_millis(2999)).is_some());
        assert!(layout("Hi", &style, Duration::from_secs(3)).is_none());
        assert!(layout("   ", &style, Duration::ZERO).is_none());
    }

    #[test]
    fn test_fades_near_the_end() {
        let style = SpeechBubbleSettings::default();
        let b = layout("Hi", &style, Duration::from_millis(2900)).unwrap();
        assert!(b.opacity < 1.0 && b.opacity > 0.0);
    }

    #[test]
    fn test_oversized_display_duration_is_capped() {
        let style = SpeechBubbleSettings {
            display_duration: 1e30,
            ..SpeechBubbleSettings::default()
        };
        assert!(layout("Hi", &style, Duration::from_secs(3600)).is_some());
        assert!(layout("Hi", &style, Duration::from_secs(86_400)).is_none());
    }
}

//! Screen renderers
//!
//! Every screen is an inverted header bar followed by a body of text lines.
//! Renderers draw on any `embedded-graphics` target, normally an
//! [`oledd_hal::Canvas`]. Line builders are kept separate from drawing so the
//! display loop can measure content height before it picks a scroll offset.

use crate::scroll::MARQUEE_GAP;
use embedded_graphics::{
    mono_font::{MonoTextStyle, ascii::FONT_6X10},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use oledd_telemetry::{NetworkSnapshot, SystemSnapshot};
use std::borrow::Cow;

/// Rows covered by the header bar and its underline
pub const HEADER_HEIGHT: u32 = 14;

/// First row of the body area
pub const BODY_TOP: u32 = 16;

/// Vertical pitch of body lines
pub const LINE_HEIGHT: u32 = 12;

/// Left inset of body text, also the gap above the first body line
pub const TEXT_INSET: u32 = 2;

pub const CHAR_WIDTH: u32 = 6;

const ELLIPSIS: &str = "...";

/// Shown in place of a value that could not be read
pub const UNAVAILABLE: &str = "?";

const BAR_X: i32 = 24;
const BAR_WIDTH: u32 = 40;
const BAR_HEIGHT: u32 = 8;
const PERCENT_X: i32 = 68;

/// Geometry of the drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
}

impl Layout {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Region body text is clipped to
    pub fn body_area(&self) -> Rectangle {
        Rectangle::new(
            Point::new(0, BODY_TOP as i32),
            Size::new(self.width, self.visible_body_height()),
        )
    }

    pub fn visible_body_height(&self) -> u32 {
        self.height.saturating_sub(BODY_TOP)
    }

    /// Characters that fit on one body line
    pub fn max_chars(&self) -> usize {
        (self.width.saturating_sub(TEXT_INSET) / CHAR_WIDTH) as usize
    }

    /// Top of body line `index` before scrolling
    fn line_y(&self, index: usize) -> i32 {
        (BODY_TOP + TEXT_INSET) as i32 + (index as u32 * LINE_HEIGHT) as i32
    }

    /// x that ends `text` at the right inset
    fn right_aligned_x(&self, text: &str) -> i32 {
        let text_width = text.chars().count() as u32 * CHAR_WIDTH;
        self.width.saturating_sub(TEXT_INSET + text_width) as i32
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new(128, 64)
    }
}

/// Height of a body made of `lines` lines
pub fn content_height(lines: usize) -> u32 {
    lines as u32 * LINE_HEIGHT
}

/// Width in pixels of `text` in the body font
pub fn text_width(text: &str) -> u32 {
    text.chars().count() as u32 * CHAR_WIDTH
}

/// Cut `line` to `max_chars`, marking the cut with an ellipsis
pub fn truncate_line(line: &str, max_chars: usize) -> Cow<'_, str> {
    if line.chars().count() <= max_chars {
        return Cow::Borrowed(line);
    }
    let keep = max_chars.saturating_sub(ELLIPSIS.len());
    let mut out: String = line.chars().take(keep).collect();
    out.push_str(&ELLIPSIS[..max_chars.min(ELLIPSIS.len())]);
    Cow::Owned(out)
}

pub fn percent_label(value: Option<f32>) -> String {
    match value {
        Some(v) => format!("{:.0}%", v.clamp(0.0, 100.0)),
        None => UNAVAILABLE.to_string(),
    }
}

pub fn temperature_label(celsius: Option<f32>) -> String {
    match celsius {
        Some(t) => format!("{:.1}C", t),
        None => UNAVAILABLE.to_string(),
    }
}

pub fn uptime_label(snapshot: &SystemSnapshot) -> String {
    match (snapshot.uptime_hours(), snapshot.uptime_minutes()) {
        (Some(h), Some(m)) => format!("Up: {}h{:02}m", h, m),
        _ => format!("Up: {}", UNAVAILABLE),
    }
}

/// Body of the network screen; `None` when telemetry failed
pub fn network_lines(snapshot: Option<&NetworkSnapshot>) -> Vec<String> {
    let Some(net) = snapshot else {
        return vec![
            format!("IP: {}", UNAVAILABLE),
            format!("Net: {}", UNAVAILABLE),
        ];
    };

    let mut lines = Vec::with_capacity(net.interfaces.len() + 2);
    match net.local_ip {
        Some(ip) => lines.push(format!("IP: {}", ip)),
        None => lines.push(format!("IP: {}", UNAVAILABLE)),
    }
    lines.extend(net.interfaces.iter().map(|i| format!("{}: {}", i.name, i.addr)));
    lines.push(match (net.reachable, net.ping_ms) {
        (true, Some(ms)) => format!("Net: OK {:.1}ms", ms),
        (true, None) => "Net: OK".to_string(),
        (false, _) => "Net: KO".to_string(),
    });
    lines
}

/// Body of the custom data screen
pub fn custom_lines(data: &[(String, String)]) -> Vec<String> {
    if data.is_empty() {
        return vec!["No data".to_string()];
    }
    data.iter().map(|(k, v)| format!("{}: {}", k, v)).collect()
}

/// Operator message split into display lines
pub fn manual_lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Whether a message should scroll sideways instead of being truncated
pub fn needs_marquee(text: &str, layout: &Layout) -> bool {
    let mut lines = text.lines();
    match (lines.next(), lines.next()) {
        (Some(only), None) => only.chars().count() > layout.max_chars(),
        _ => false,
    }
}

fn body_style() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

/// Inverted title bar across the top of the screen
pub fn draw_header<D>(target: &mut D, layout: &Layout, title: &str) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Rectangle::new(Point::zero(), Size::new(layout.width, HEADER_HEIGHT - 1))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)?;

    let underline_y = HEADER_HEIGHT as i32 - 1;
    Line::new(
        Point::new(0, underline_y),
        Point::new(layout.width as i32 - 1, underline_y),
    )
    .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
    .draw(target)?;

    let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::Off);
    Text::with_baseline(title, Point::new(2, 2), style, Baseline::Top).draw(target)?;
    Ok(())
}

/// Outlined bar filled in proportion to `percent`; empty when unknown
pub fn draw_progress_bar<D>(
    target: &mut D,
    top_left: Point,
    size: Size,
    percent: Option<f32>,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Rectangle::new(top_left, size)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)?;

    let inner_width = size.width.saturating_sub(2);
    let filled = percent
        .map(|p| (p.clamp(0.0, 100.0) / 100.0 * inner_width as f32) as u32)
        .unwrap_or(0);
    if filled > 0 {
        Rectangle::new(
            top_left + Point::new(1, 1),
            Size::new(filled, size.height.saturating_sub(2)),
        )
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)?;
    }
    Ok(())
}

/// Header and body lines, scrolled up by `offset` and clipped to the body
pub fn render_lines<D, S>(
    target: &mut D,
    layout: &Layout,
    title: &str,
    lines: &[S],
    offset: u32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
    S: AsRef<str>,
{
    draw_header(target, layout, title)?;

    let mut body = target.clipped(&layout.body_area());
    let style = body_style();
    let max_chars = layout.max_chars();
    let visible = layout.body_area();

    for (i, line) in lines.iter().enumerate() {
        let y = layout.line_y(i) - offset as i32;
        if y + LINE_HEIGHT as i32 <= visible.top_left.y || y >= layout.height as i32 {
            continue;
        }
        let text = truncate_line(line.as_ref(), max_chars);
        Text::with_baseline(&text, Point::new(TEXT_INSET as i32, y), style, Baseline::Top)
            .draw(&mut body)?;
    }
    Ok(())
}

/// CPU, memory and disk with bars, temperature, uptime and wall clock
///
/// `None` draws every field as unavailable.
pub fn render_system<D>(
    target: &mut D,
    layout: &Layout,
    snapshot: Option<&SystemSnapshot>,
    clock: &str,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    draw_header(target, layout, "SYSTEM")?;

    let empty = SystemSnapshot::default();
    let snapshot = snapshot.unwrap_or(&empty);
    let style = body_style();

    let rows = [
        ("CPU", snapshot.cpu_percent),
        ("RAM", snapshot.ram_percent),
        ("DSK", snapshot.disk_percent),
    ];
    for (i, (label, value)) in rows.into_iter().enumerate() {
        let y = layout.line_y(i);
        Text::with_baseline(label, Point::new(TEXT_INSET as i32, y), style, Baseline::Top)
            .draw(target)?;
        draw_progress_bar(
            target,
            Point::new(BAR_X, y),
            Size::new(BAR_WIDTH, BAR_HEIGHT),
            value,
        )?;
        Text::with_baseline(
            &percent_label(value),
            Point::new(PERCENT_X, y),
            style,
            Baseline::Top,
        )
        .draw(target)?;
    }

    let temperature = temperature_label(snapshot.cpu_temp_celsius);
    Text::with_baseline(
        &temperature,
        Point::new(layout.right_aligned_x(&temperature), layout.line_y(0)),
        style,
        Baseline::Top,
    )
    .draw(target)?;

    let last = layout.line_y(3);
    Text::with_baseline(
        &uptime_label(snapshot),
        Point::new(TEXT_INSET as i32, last),
        style,
        Baseline::Top,
    )
    .draw(target)?;
    Text::with_baseline(
        clock,
        Point::new(layout.right_aligned_x(clock), last),
        style,
        Baseline::Top,
    )
    .draw(target)?;
    Ok(())
}

/// Single long line scrolling sideways, centred in the body
pub fn render_marquee<D>(
    target: &mut D,
    layout: &Layout,
    text: &str,
    offset: u32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    draw_header(target, layout, "MESSAGE")?;

    let style = body_style();
    let y = (BODY_TOP + layout.visible_body_height().saturating_sub(FONT_6X10.character_size.height) / 2) as i32;
    let x = TEXT_INSET as i32 - offset as i32;
    let period = (text_width(text) + MARQUEE_GAP) as i32;

    let mut body = target.clipped(&layout.body_area());
    Text::with_baseline(text, Point::new(x, y), style, Baseline::Top).draw(&mut body)?;
    Text::with_baseline(text, Point::new(x + period, y), style, Baseline::Top).draw(&mut body)?;
    Ok(())
}

/// Title and a centred message, used when a screen has nothing valid to show
pub fn render_placeholder<D>(
    target: &mut D,
    layout: &Layout,
    title: &str,
    message: &str,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    draw_header(target, layout, title)?;
    let message = truncate_line(message, layout.max_chars());
    let x = ((layout.width.saturating_sub(text_width(&message))) / 2) as i32;
    let y = (BODY_TOP + layout.visible_body_height().saturating_sub(FONT_6X10.character_size.height) / 2) as i32;
    Text::with_baseline(&message, Point::new(x, y), body_style(), Baseline::Top).draw(target)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oledd_hal::Canvas;
    use oledd_telemetry::InterfaceAddr;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    fn canvas() -> Canvas {
        Canvas::new(128, 64)
    }

    #[test]
    fn test_layout() {
        let layout = Layout::default();
        assert_eq!(layout.visible_body_height(), 48);
        assert_eq!(layout.max_chars(), 21);
        assert_eq!(layout.line_y(0), 18);
        assert_eq!(layout.line_y(3), 54);
        assert_eq!(content_height(4), 48);
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("short", 21), "short");
        assert_eq!(truncate_line("exactly five", 12), "exactly five");
        assert_eq!(truncate_line("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_line("abcdefghij", 8).chars().count(), 8);
        assert_eq!(truncate_line("héllo wörld", 6), "hél...");
    }

    #[test]
    fn test_labels() {
        assert_eq!(percent_label(Some(12.4)), "12%");
        assert_eq!(percent_label(Some(140.0)), "100%");
        assert_eq!(percent_label(None), "?");
        assert_eq!(temperature_label(Some(47.2)), "47.2C");
        assert_eq!(temperature_label(None), "?");

        let snapshot = SystemSnapshot {
            uptime: Some(Duration::from_secs(3 * 3600 + 7 * 60)),
            ..Default::default()
        };
        assert_eq!(uptime_label(&snapshot), "Up: 3h07m");
        assert_eq!(uptime_label(&SystemSnapshot::default()), "Up: ?");
    }

    #[test]
    fn test_network_lines() {
        let net = NetworkSnapshot {
            local_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20))),
            interfaces: vec![
                InterfaceAddr {
                    name: "eth0".into(),
                    addr: Ipv4Addr::new(192, 168, 1, 20),
                },
                InterfaceAddr {
                    name: "wlan0".into(),
                    addr: Ipv4Addr::new(10, 0, 0, 5),
                },
            ],
            reachable: true,
            ping_ms: Some(12.34),
        };
        assert_eq!(
            network_lines(Some(&net)),
            vec![
                "IP: 192.168.1.20",
                "eth0: 192.168.1.20",
                "wlan0: 10.0.0.5",
                "Net: OK 12.3ms"
            ]
        );

        let offline = NetworkSnapshot::default();
        assert_eq!(network_lines(Some(&offline)), vec!["IP: ?", "Net: KO"]);
        assert_eq!(network_lines(None), vec!["IP: ?", "Net: ?"]);
    }

    #[test]
    fn test_custom_and_manual_lines() {
        let data = vec![("temp".to_string(), "21.5C".to_string())];
        assert_eq!(custom_lines(&data), vec!["temp: 21.5C"]);
        assert_eq!(custom_lines(&[]), vec!["No data"]);

        assert_eq!(manual_lines("a\nb\r\nc"), vec!["a", "b", "c"]);
        assert!(manual_lines("").is_empty());
    }

    #[test]
    fn test_needs_marquee() {
        let layout = Layout::default();
        assert!(!needs_marquee("short", &layout));
        assert!(needs_marquee(&"x".repeat(22), &layout));
        assert!(!needs_marquee(&format!("{}\nsecond", "x".repeat(30)), &layout));
    }

    #[test]
    fn test_header_is_inverted() {
        let layout = Layout::default();
        let mut c = canvas();
        draw_header(&mut c, &layout, "SYSTEM").unwrap();

        // Bar is mostly lit with dark title glyphs, nothing below it
        let header = c.lit_pixels_in_rows(0, HEADER_HEIGHT);
        assert!(header > 128 * 12);
        assert!(header < 128 * HEADER_HEIGHT as usize);
        assert_eq!(c.lit_pixels_in_rows(HEADER_HEIGHT, 64), 0);
    }

    #[test]
    fn test_progress_bar_fill() {
        let mut empty = canvas();
        draw_progress_bar(&mut empty, Point::new(0, 0), Size::new(40, 8), None).unwrap();
        let mut half = canvas();
        draw_progress_bar(&mut half, Point::new(0, 0), Size::new(40, 8), Some(50.0)).unwrap();
        let mut full = canvas();
        draw_progress_bar(&mut full, Point::new(0, 0), Size::new(40, 8), Some(100.0)).unwrap();

        assert_eq!(half.lit_pixels() - empty.lit_pixels(), 19 * 6);
        assert_eq!(full.lit_pixels() - empty.lit_pixels(), 38 * 6);
    }

    #[test]
    fn test_body_never_overwrites_header() {
        let layout = Layout::default();
        let mut header_only = canvas();
        draw_header(&mut header_only, &layout, "DATA").unwrap();

        let lines: Vec<String> = (0..10).map(|i| format!("line {}", i)).collect();
        for offset in [0, 7, 30, 72] {
            let mut c = canvas();
            render_lines(&mut c, &layout, "DATA", &lines, offset).unwrap();
            for y in 0..BODY_TOP {
                for x in 0..128 {
                    assert_eq!(c.pixel(x, y), header_only.pixel(x, y), "offset {}", offset);
                }
            }
            assert!(c.lit_pixels_in_rows(BODY_TOP, 64) > 0);
        }
    }

    #[test]
    fn test_scroll_offset_moves_body() {
        let layout = Layout::default();
        let lines = ["top", "", "", "", "", "bottom"];
        let mut top = canvas();
        render_lines(&mut top, &layout, "DATA", &lines, 0).unwrap();
        let mut scrolled = canvas();
        render_lines(&mut scrolled, &layout, "DATA", &lines, content_height(6) - 48).unwrap();

        // "top" sits in the first body line only when unscrolled
        assert!(top.lit_pixels_in_rows(18, 28) > 0);
        assert_eq!(scrolled.lit_pixels_in_rows(18, 28), 0);
        assert!(scrolled.lit_pixels_in_rows(54, 64) > 0);
    }

    #[test]
    fn test_system_placeholder_renders() {
        let layout = Layout::default();
        let mut c = canvas();
        render_system(&mut c, &layout, None, "12:00:00").unwrap();
        assert!(c.lit_pixels_in_rows(BODY_TOP, 64) > 0);

        let mut full = canvas();
        let snapshot = SystemSnapshot {
            cpu_percent: Some(100.0),
            ram_percent: Some(100.0),
            disk_percent: Some(100.0),
            cpu_temp_celsius: Some(50.0),
            uptime: Some(Duration::from_secs(60)),
        };
        render_system(&mut full, &layout, Some(&snapshot), "12:00:00").unwrap();
        assert!(full.lit_pixels() > c.lit_pixels());
    }

    #[test]
    fn test_marquee_wraps_around() {
        let layout = Layout::default();
        let text = "x".repeat(40);
        let mut start = canvas();
        render_marquee(&mut start, &layout, &text, 0).unwrap();
        let mut shifted = canvas();
        render_marquee(&mut shifted, &layout, &text, text_width(&text) + MARQUEE_GAP).unwrap();
        assert_eq!(start, shifted);
    }

    #[test]
    fn test_placeholder() {
        let layout = Layout::default();
        let mut c = canvas();
        render_placeholder(&mut c, &layout, "QR", "QR unavailable").unwrap();
        assert!(c.lit_pixels_in_rows(BODY_TOP, 64) > 0);
    }
}

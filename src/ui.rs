use crate::audio::AudioEngine;
use crate::cover::Thumbnail;
use crate::player::{Player, format_time};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use std::time::Duration;

const APP_TITLE: &str = "tracklist  ";

const BG: Color = Color::Rgb(14, 14, 16);
const PANEL_BG: Color = Color::Rgb(26, 26, 28);
const BORDER: Color = Color::Rgb(90, 60, 50);
const TEXT: Color = Color::Rgb(236, 232, 228);
const MUTED: Color = Color::Rgb(150, 142, 136);
const ACCENT: Color = Color::Rgb(255, 69, 0);
const SELECTED_BG: Color = Color::Rgb(48, 36, 32);
const PLACEHOLDER: Color = Color::Rgb(60, 60, 64);

/// Screen regions the event loop needs for mouse hit-testing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub search: Rect,
    pub list: Rect,
    pub now_playing: Rect,
    pub progress: Rect,
    pub status: Rect,
}

pub fn screen_layout(area: Rect) -> ScreenLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
        .split(vertical[2]);

    ScreenLayout {
        header: vertical[0],
        search: vertical[1],
        list: body[0],
        now_playing: body[1],
        progress: vertical[3],
        status: vertical[4],
    }
}

/// Maps a click inside the list panel to a view row.
pub fn list_row_at(layout: &ScreenLayout, list_offset: usize, x: u16, y: u16) -> Option<usize> {
    let inner = layout.list.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    if !point_in_rect(x, y, inner) {
        return None;
    }
    Some(list_offset + usize::from(y - inner.y))
}

/// Fraction of the progress bar left of a click, in `0.0..=1.0`.
pub fn progress_fraction_at(layout: &ScreenLayout, x: u16, y: u16) -> Option<f64> {
    let inner = layout.progress.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    if !point_in_rect(x, y, inner) {
        return None;
    }
    let width = f64::from(inner.width.max(1));
    Some((f64::from(x - inner.x) / width).clamp(0.0, 1.0))
}

fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    x >= rect.x
        && x < rect.x.saturating_add(rect.width)
        && y >= rect.y
        && y < rect.y.saturating_add(rect.height)
}

pub fn draw(
    frame: &mut Frame,
    player: &Player,
    audio: &dyn AudioEngine,
    search_mode: bool,
    list_state: &mut ListState,
) -> ScreenLayout {
    let layout = screen_layout(frame.area());
    frame.render_widget(Block::default().style(Style::default().bg(BG)), frame.area());

    draw_header(frame, player, layout.header);
    draw_search(frame, player, search_mode, layout.search);
    draw_list(frame, player, audio, layout.list, list_state);
    draw_now_playing(frame, player, audio, layout.now_playing);
    draw_progress(frame, audio, layout.progress);

    let status = Paragraph::new(Line::from(vec![
        Span::styled(player.status.as_str(), Style::default().fg(TEXT)),
        Span::styled(
            "   enter play  space pause  n/p next/prev  s shuffle  l loop  / search  q quit",
            Style::default().fg(MUTED),
        ),
    ]))
    .block(panel_block("Status"));
    frame.render_widget(status, layout.status);

    layout
}

fn draw_header(frame: &mut Frame, player: &Player, area: Rect) {
    let flag = |label: &'static str, on: bool| {
        Span::styled(
            label,
            if on {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(MUTED)
            },
        )
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Songs {}", player.tracks.len()),
            Style::default().fg(TEXT),
        ),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        flag("SHUFFLE", player.sequencer.is_shuffle()),
        Span::raw("  "),
        flag("LOOP", player.sequencer.is_loop()),
    ]))
    .block(panel_block("Player"));
    frame.render_widget(header, area);
}

fn draw_search(frame: &mut Frame, player: &Player, search_mode: bool, area: Rect) {
    let (text, style) = if player.search.is_empty() && !search_mode {
        (String::from("press / to search"), Style::default().fg(MUTED))
    } else if search_mode {
        (format!("{}_", player.search), Style::default().fg(TEXT))
    } else {
        (player.search.clone(), Style::default().fg(TEXT))
    };
    let title = format!("Search ({} of {})", player.view.len(), player.tracks.len());
    frame.render_widget(
        Paragraph::new(Span::styled(text, style)).block(panel_block(&title)),
        area,
    );
}

fn draw_list(
    frame: &mut Frame,
    player: &Player,
    audio: &dyn AudioEngine,
    area: Rect,
    list_state: &mut ListState,
) {
    if player.tracks.is_empty() {
        let empty = Paragraph::new(player.status.as_str())
            .style(Style::default().fg(TEXT))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(panel_block("Songs"));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = player
        .view
        .iter()
        .map(|&index| {
            let track = &player.tracks[index];
            let marker = if !player.is_active(index) {
                "  "
            } else if audio.is_paused() {
                "⏸ "
            } else {
                "▶ "
            };
            let swatch = match player.thumbnail_for(index) {
                Some(thumbnail) => Span::styled("██", Style::default().fg(average_color(thumbnail))),
                None => Span::styled("♪ ", Style::default().fg(PLACEHOLDER)),
            };
            let title_style = if player.is_active(index) {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(TEXT)
            };

            let mut spans = vec![
                Span::styled(marker, Style::default().fg(ACCENT)),
                swatch,
                Span::raw(" "),
                Span::styled(track.title.as_str(), title_style),
            ];
            if let Some(artist) = &track.artist {
                spans.push(Span::styled(
                    format!("  {artist}"),
                    Style::default().fg(MUTED),
                ));
            }
            if let Some(seconds) = track.duration_seconds {
                spans.push(Span::styled(
                    format!("  {}", format_time(Some(Duration::from_secs(u64::from(seconds))))),
                    Style::default().fg(MUTED),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    list_state.select((!player.view.is_empty()).then_some(player.selected_row));
    let list = List::new(items)
        .block(panel_block("Songs"))
        .highlight_style(
            Style::default()
                .bg(SELECTED_BG)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_stateful_widget(list, area, list_state);
}

fn draw_now_playing(frame: &mut Frame, player: &Player, audio: &dyn AudioEngine, area: Rect) {
    let block = panel_block("Now Playing");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(track) = player.current_track() else {
        frame.render_widget(
            Paragraph::new("Nothing playing").style(Style::default().fg(MUTED)),
            inner,
        );
        return;
    };

    let art_height = player
        .now_playing_thumbnail()
        .map_or(crate::cover::THUMBNAIL_ROWS as u16, |thumb| {
            (thumb.height / 2) as u16
        });
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(art_height), Constraint::Min(3)])
        .split(inner);

    let art = match player.now_playing_thumbnail() {
        Some(thumbnail) => thumbnail_lines(thumbnail),
        None => placeholder_lines(art_height),
    };
    frame.render_widget(Paragraph::new(art), chunks[0]);

    let info = vec![
        Line::from(Span::styled(
            track.title.as_str(),
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            track.artist.as_deref().unwrap_or("-"),
            Style::default().fg(MUTED),
        )),
        Line::from(Span::styled(
            format!(
                "Volume {}%  {}",
                (audio.volume() * 100.0).round() as u16,
                audio.output_name().unwrap_or_default()
            ),
            Style::default().fg(MUTED),
        )),
    ];
    frame.render_widget(
        Paragraph::new(info).wrap(Wrap { trim: true }),
        chunks[1],
    );
}

fn draw_progress(frame: &mut Frame, audio: &dyn AudioEngine, area: Rect) {
    let position = audio.position();
    let duration = audio.duration();
    let ratio = match (position, duration) {
        (Some(position), Some(duration)) if !duration.is_zero() => {
            (position.as_secs_f64() / duration.as_secs_f64()).clamp(0.0, 1.0)
        }
        _ => 0.0,
    };
    let gauge = Gauge::default()
        .block(panel_block("Progress"))
        .gauge_style(Style::default().fg(ACCENT).bg(PANEL_BG))
        .ratio(ratio)
        .label(format!(
            "{} / {}",
            format_time(position),
            format_time(duration)
        ));
    frame.render_widget(gauge, area);
}

/// Upper half-blocks: foreground is the top pixel, background the bottom one.
fn thumbnail_lines(thumbnail: &Thumbnail) -> Vec<Line<'static>> {
    (0..thumbnail.height / 2)
        .map(|row| {
            let spans = (0..thumbnail.width)
                .map(|x| {
                    let top = thumbnail.pixel(x, row * 2).unwrap_or([0, 0, 0]);
                    let bottom = thumbnail.pixel(x, row * 2 + 1).unwrap_or([0, 0, 0]);
                    Span::styled("▀", Style::default().fg(rgb(top)).bg(rgb(bottom)))
                })
                .collect::<Vec<_>>();
            Line::from(spans)
        })
        .collect()
}

fn placeholder_lines(height: u16) -> Vec<Line<'static>> {
    let width = crate::cover::THUMBNAIL_COLUMNS as usize;
    (0..height)
        .map(|row| {
            let text = if row == height / 2 {
                format!("{:^width$}", "♪")
            } else {
                " ".repeat(width)
            };
            Line::from(Span::styled(
                text,
                Style::default().fg(ACCENT).bg(PLACEHOLDER),
            ))
        })
        .collect()
}

fn average_color(thumbnail: &Thumbnail) -> Color {
    let mut sum = [0_u32; 3];
    let mut count = 0_u32;
    for y in 0..thumbnail.height {
        for x in 0..thumbnail.width {
            if let Some(pixel) = thumbnail.pixel(x, y) {
                for (total, channel) in sum.iter_mut().zip(pixel) {
                    *total += u32::from(channel);
                }
                count += 1;
            }
        }
    }
    if count == 0 {
        return PLACEHOLDER;
    }
    Color::Rgb(
        (sum[0] / count) as u8,
        (sum[1] / count) as u8,
        (sum[2] / count) as u8,
    )
}

fn rgb([r, g, b]: [u8; 3]) -> Color {
    Color::Rgb(r, g, b)
}

fn panel_block(title: &str) -> Block<'static> {
    Block::default()
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(PANEL_BG))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_click_maps_to_row_with_scroll_offset() {
        let layout = screen_layout(Rect::new(0, 0, 100, 40));
        let first_row_y = layout.list.y + 1;

        assert_eq!(list_row_at(&layout, 0, layout.list.x + 2, first_row_y), Some(0));
        assert_eq!(
            list_row_at(&layout, 4, layout.list.x + 2, first_row_y + 3),
            Some(7)
        );
        assert_eq!(list_row_at(&layout, 0, layout.list.x, first_row_y), None);
        assert_eq!(list_row_at(&layout, 0, layout.now_playing.x + 2, first_row_y), None);
    }

    #[test]
    fn progress_click_maps_to_fraction() {
        let layout = screen_layout(Rect::new(0, 0, 102, 40));
        let y = layout.progress.y + 1;

        assert_eq!(progress_fraction_at(&layout, 1, y), Some(0.0));
        assert_eq!(progress_fraction_at(&layout, 51, y), Some(0.5));
        assert_eq!(progress_fraction_at(&layout, 51, layout.progress.y), None);
    }

    #[test]
    fn average_of_solid_thumbnail_is_that_color() {
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .expect("png");
        let thumbnail = Thumbnail::decode(&png, 2, 2).expect("thumbnail");

        assert_eq!(average_color(&thumbnail), Color::Rgb(10, 20, 30));
        assert_eq!(thumbnail_lines(&thumbnail).len(), 2);
    }
}

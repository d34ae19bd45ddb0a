//! Terminal rendering of the player.
//!
//! One redrawn status line (`\r`) for icon, track, bar and times; anything
//! else (playlist, errors, track changes) is printed on its own lines above it.

use std::io::Write;

use lyre_core::{PlayIcon, PlayerView, PlaylistRow, ProgressView};

const BAR_WIDTH: usize = 30;

pub struct TerminalView<W: Write> {
    out: W,
    track: String,
    icon: PlayIcon,
    looping: bool,
    playlist_visible: bool,
    rows: Vec<PlaylistRow>,
    printed_rows: Vec<PlaylistRow>,
    progress: ProgressView,
    /// A status line is on screen without a trailing newline.
    line_open: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            track: String::new(),
            icon: PlayIcon::Play,
            looping: false,
            playlist_visible: true,
            rows: Vec::new(),
            printed_rows: Vec::new(),
            progress: ProgressView::zero(),
            line_open: false,
        }
    }

    /// Print the playlist even if it has not changed.
    pub fn print_playlist(&mut self) {
        self.end_line();
        for row in &self.rows {
            let marker = if row.active { ">" } else { " " };
            writeln!(self.out, "{} {}. {}", marker, row.index + 1, row.title).ok();
        }
        self.printed_rows = self.rows.clone();
        self.draw_status();
    }

    pub fn print_message(&mut self, message: &str) {
        self.end_line();
        writeln!(self.out, "{}", message).ok();
        self.draw_status();
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn end_line(&mut self) {
        if self.line_open {
            writeln!(self.out).ok();
            self.line_open = false;
        }
    }

    fn draw_status(&mut self) {
        let filled = ((self.progress.percent / 100.0) * BAR_WIDTH as f64).round() as usize;
        let filled = filled.min(BAR_WIDTH);
        write!(
            self.out,
            "\r  {} {}  [{}{}] {} {}{}    ",
            self.icon.glyph(),
            self.track,
            "=".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            self.progress.elapsed,
            self.progress.remaining,
            if self.looping { "  (loop)" } else { "" },
        )
        .ok();
        self.out.flush().ok();
        self.line_open = true;
    }
}

impl<W: Write> PlayerView for TerminalView<W> {
    fn set_play_icon(&mut self, icon: PlayIcon) {
        if self.icon != icon {
            self.icon = icon;
            self.draw_status();
        }
    }

    fn set_loop_indicator(&mut self, active: bool) {
        if self.looping != active {
            self.looping = active;
            self.draw_status();
        }
    }

    fn set_track_name(&mut self, name: &str) {
        if self.track != name {
            self.track = name.to_string();
            self.print_message(&format!("now playing: {}", name));
        }
    }

    fn render_playlist(&mut self, rows: &[PlaylistRow]) {
        self.rows = rows.to_vec();
        if self.playlist_visible && self.rows != self.printed_rows {
            self.print_playlist();
        }
    }

    fn render_progress(&mut self, progress: &ProgressView) {
        self.progress = progress.clone();
        self.draw_status();
    }

    fn set_playlist_visible(&mut self, visible: bool) {
        if self.playlist_visible == visible {
            return;
        }
        self.playlist_visible = visible;
        if visible {
            self.print_playlist();
        } else {
            self.printed_rows.clear();
            self.print_message("playlist hidden");
        }
    }

    fn show_error(&mut self, message: &str) {
        self.print_message(&format!("error: {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(active: usize) -> Vec<PlaylistRow> {
        ["a.mp3", "b.mp3", "c.mp3"]
            .iter()
            .enumerate()
            .map(|(index, title)| PlaylistRow {
                index,
                title: title.to_string(),
                active: index == active,
            })
            .collect()
    }

    fn text(view: TerminalView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).expect("utf8")
    }

    #[test]
    fn playlist_marks_active_row_once() {
        let mut view = TerminalView::new(Vec::new());
        view.render_playlist(&rows(1));
        view.render_playlist(&rows(1));
        let out = text(view);
        assert_eq!(out.matches("> 2. b.mp3").count(), 1);
        assert!(out.contains("  1. a.mp3"));
    }

    #[test]
    fn hidden_playlist_is_not_printed() {
        let mut view = TerminalView::new(Vec::new());
        view.set_playlist_visible(false);
        view.render_playlist(&rows(0));
        let out = text(view);
        assert!(!out.contains("a.mp3"));
        assert!(out.contains("playlist hidden"));
    }

    #[test]
    fn status_line_shows_bar_and_times() {
        let mut view = TerminalView::new(Vec::new());
        view.set_track_name("don.mp3");
        view.render_progress(&ProgressView::compute(60.0, Some(120.0)));
        let out = text(view);
        assert!(out.contains("now playing: don.mp3"));
        assert!(out.contains(&format!("[{}{}]", "=".repeat(15), " ".repeat(15))));
        assert!(out.contains("1:00 - 1:00"));
    }

    #[test]
    fn errors_get_their_own_line() {
        let mut view = TerminalView::new(Vec::new());
        view.render_progress(&ProgressView::zero());
        view.show_error("media unavailable: x.mp3: missing");
        let out = text(view);
        assert!(out.contains("\nerror: media unavailable: x.mp3: missing\n"));
    }
}

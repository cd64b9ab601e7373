use std::io::Write;

use marquee_core::{AppState, LayoutMode, LoadStatus, MovieId, MovieView};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

/// Columns used by the grid layout.
const GRID_COLUMNS: usize = 3;
const GRID_CELL_WIDTH: usize = 26;

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}

fn heart(liked: bool) -> &'static str {
    if liked { "♥" } else { " " }
}

/// Print the status line and the visible list in the configured layout.
pub fn print_state(
    w: &mut dyn Write,
    state: &AppState,
    color: ColorMode,
) -> std::io::Result<()> {
    print_status(w, &state.status, color)?;
    if let LoadStatus::Error(_) = state.status {
        return Ok(());
    }

    let settings = state.settings;
    let header = format!(
        "{} movies · sort: {} · filter: {} · layout: {}",
        state.visible.len(),
        settings.sort.label(),
        settings.filter.label(),
        settings.layout.label(),
    );
    if color.enabled() {
        writeln!(w, "{}", header.dimmed())?;
    } else {
        writeln!(w, "{}", header)?;
    }
    writeln!(w)?;

    match settings.layout {
        LayoutMode::List => print_list(w, &state.visible, state.selection, color),
        LayoutMode::Grid => print_grid(w, &state.visible, color),
    }
}

pub fn print_status(
    w: &mut dyn Write,
    status: &LoadStatus,
    color: ColorMode,
) -> std::io::Result<()> {
    match status {
        LoadStatus::Error(msg) => {
            let line = format!("Failed to load movies: {}", msg);
            if color.enabled() {
                writeln!(w, "{}", line.red().bold())?;
                writeln!(w, "{}", "Run the command again to retry.".dimmed())?;
            } else {
                writeln!(w, "{}", line)?;
                writeln!(w, "Run the command again to retry.")?;
            }
        }
        LoadStatus::Loading => writeln!(w, "Loading...")?,
        LoadStatus::Idle | LoadStatus::Ready => {}
    }
    Ok(())
}

fn print_list(
    w: &mut dyn Write,
    visible: &[MovieView],
    selection: Option<MovieId>,
    color: ColorMode,
) -> std::io::Result<()> {
    for movie in visible {
        let r = &movie.record;
        let date = r.release_date.as_deref().unwrap_or("----------");
        let marker = if selection == Some(r.id) { ">" } else { " " };
        let camera = if r.photo_uri.is_some() { " [photo]" } else { "" };
        let title = truncate(&r.title, 48);

        if color.enabled() {
            let heart = if movie.liked {
                heart(true).red().to_string()
            } else {
                heart(false).to_string()
            };
            writeln!(
                w,
                "{} {} {:>8}  {}  {:>4.1}  {}{}",
                marker,
                heart,
                r.id.dimmed(),
                date,
                r.vote_average.yellow(),
                title.bold(),
                camera.cyan(),
            )?;
        } else {
            writeln!(
                w,
                "{} {} {:>8}  {}  {:>4.1}  {}{}",
                marker,
                heart(movie.liked),
                r.id,
                date,
                r.vote_average,
                title,
                camera,
            )?;
        }
    }
    Ok(())
}

fn print_grid(w: &mut dyn Write, visible: &[MovieView], color: ColorMode) -> std::io::Result<()> {
    for row in visible.chunks(GRID_COLUMNS) {
        let mut titles = String::new();
        let mut details = String::new();
        for movie in row {
            let title = format!(
                "{} {}",
                heart(movie.liked),
                truncate(&movie.record.title, GRID_CELL_WIDTH - 4)
            );
            let detail = format!("#{} · {:.1}", movie.record.id, movie.record.vote_average);
            titles.push_str(&format!("{:<width$}", title, width = GRID_CELL_WIDTH));
            details.push_str(&format!("{:<width$}", detail, width = GRID_CELL_WIDTH));
        }
        if color.enabled() {
            writeln!(w, "{}", titles.trim_end().bold())?;
            writeln!(w, "{}", details.trim_end().dimmed())?;
        } else {
            writeln!(w, "{}", titles.trim_end())?;
            writeln!(w, "{}", details.trim_end())?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Print the detail view for one movie.
pub fn print_detail(
    w: &mut dyn Write,
    movie: &MovieView,
    color: ColorMode,
) -> std::io::Result<()> {
    let r = &movie.record;
    if color.enabled() {
        writeln!(w, "{}", r.title.bold())?;
    } else {
        writeln!(w, "{}", r.title)?;
    }
    writeln!(w, "Rating: {:.1} / 10", r.vote_average)?;
    writeln!(w, "Votes: {}", r.vote_count)?;
    if let Some(date) = &r.release_date {
        writeln!(w, "Release date: {}", date)?;
    }
    writeln!(w, "Liked: {}", if movie.liked { "yes" } else { "no" })?;
    if let Some(url) = r.poster_url() {
        writeln!(w, "Poster: {}", url)?;
    }
    if let Some(photo) = &r.photo_uri {
        writeln!(w, "Photo: {}", photo)?;
    }
    if !r.overview.is_empty() {
        writeln!(w)?;
        writeln!(w, "{}", r.overview)?;
    }
    Ok(())
}

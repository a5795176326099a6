//! Terminal rendering of a session: the narrative with its citation markers,
//! the match cards they point at, and the history/suggestion lists.

use std::fmt::Write;

use owo_colors::OwoColorize;

use crate::citations::Segment;
use crate::models::{country_display, Match, Surface};
use crate::session::{Phase, SessionSnapshot};
use crate::suggestions::Category;

const THIN_SEPARATOR: &str = "----------------------------------------";

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub color: bool,
}

impl RenderOptions {
    pub fn plain() -> Self {
        Self { color: false }
    }

    pub fn colored() -> Self {
        Self { color: true }
    }
}

pub fn render_session(
    snapshot: &SessionSnapshot,
    narrative: &[Segment],
    opts: RenderOptions,
) -> String {
    let mut out = String::new();

    match snapshot.phase {
        Phase::Idle => {
            let _ = writeln!(out, "Ask about tennis history.");
            return out;
        }
        Phase::Loading => {
            let _ = writeln!(out, "Illuminating...");
            return out;
        }
        Phase::Failed => {
            let message = snapshot.error.as_deref().unwrap_or_default();
            if opts.color {
                let _ = writeln!(out, "[ERROR] {}", message.red());
            } else {
                let _ = writeln!(out, "[ERROR] {}", message);
            }
            return out;
        }
        Phase::Success => {}
    }

    let Some(result) = &snapshot.result else {
        return out;
    };

    if !narrative.is_empty() {
        let _ = writeln!(out, "{}", heading("Tennis Torch", opts));
        let _ = writeln!(out, "{}", render_narrative(narrative, opts));
    }

    if !result.analysis.trim().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", heading("Analysis", opts));
        let _ = writeln!(out, "{}", result.analysis.trim());
    }

    if !result.matches.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", heading("Match Records", opts));
        for (idx, m) in result.matches.iter().enumerate() {
            let position = idx + 1;
            let highlighted = snapshot.active_citation == Some(position);
            out.push_str(&render_match_card(position, m, highlighted, opts));
        }
    }

    out
}

fn heading(title: &str, opts: RenderOptions) -> String {
    if opts.color {
        title.bold().green().to_string()
    } else {
        title.to_string()
    }
}

pub fn render_narrative(segments: &[Segment], opts: RenderOptions) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Text { text } => out.push_str(text),
            Segment::Citation { number, active } => {
                let marker = format!("[{}]", number);
                match (opts.color, *active) {
                    (true, true) => {
                        let _ = write!(out, "{}", marker.black().on_green());
                    }
                    (true, false) => {
                        let _ = write!(out, "{}", marker.green());
                    }
                    (false, true) => {
                        let _ = write!(out, "[*{}]", number);
                    }
                    (false, false) => out.push_str(&marker),
                }
            }
        }
    }
    out
}

pub fn render_match_card(
    position: usize,
    m: &Match,
    highlighted: bool,
    opts: RenderOptions,
) -> String {
    let mut out = String::new();

    let pointer = if highlighted { ">" } else { " " };
    let country = country_display(&m.tournament_country);
    let mut header = format!("{}[{}] ", pointer, position);
    if !country.is_empty() {
        let _ = write!(header, "{} ", country);
    }
    header.push_str(&m.tournament_name);

    let header = if opts.color {
        surface_tint(&header, m.surface_kind(), highlighted)
    } else {
        header
    };
    let _ = writeln!(out, "{}", header);

    let mut details = vec![m.level_name(), m.surface.clone(), m.round.clone()];
    details.retain(|d| !d.is_empty());
    let date = m.formatted_date();
    if !date.is_empty() {
        details.push(date);
    }
    if !details.is_empty() {
        let _ = writeln!(out, "     {}", details.join(" * "));
    }

    let _ = writeln!(
        out,
        "     {}  {}  {}",
        player_label(&m.winner_name, &m.winner_country),
        m.score,
        player_label(&m.loser_name, &m.loser_country),
    );
    let _ = writeln!(out, "     {}", THIN_SEPARATOR);
    out
}

fn player_label(name: &str, country: &str) -> String {
    if country.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, country_display(country))
    }
}

fn surface_tint(text: &str, surface: Surface, highlighted: bool) -> String {
    let tinted = match surface {
        Surface::Hard => text.blue().to_string(),
        Surface::Clay => text.red().to_string(),
        Surface::Grass => text.green().to_string(),
        Surface::Carpet => text.white().to_string(),
        Surface::Other => text.to_string(),
    };
    if highlighted {
        tinted.bold().to_string()
    } else {
        tinted
    }
}

pub fn render_history(entries: &[String]) -> String {
    if entries.is_empty() {
        return "No recent queries.\n".to_string();
    }

    let mut out = String::from("Recent Queries\n");
    for (idx, entry) in entries.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", idx + 1, entry);
    }
    out
}

pub fn render_suggestions(categories: &[Category]) -> String {
    let mut out = String::new();
    for category in categories {
        let _ = writeln!(out, "{}", category.name());
        for question in category.questions() {
            let _ = writeln!(out, "  - {}", question);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citations::split_narrative;
    use crate::history::QueryHistory;
    use crate::models::AnswerResult;

    fn wimbledon_final() -> Match {
        Match {
            match_id: "2008-540-701".to_string(),
            description: "Wimbledon 20080623 F".to_string(),
            tournament_name: "Wimbledon".to_string(),
            tournament_level: "G".to_string(),
            tournament_country: "gbr".to_string(),
            surface: "Grass".to_string(),
            round: "F".to_string(),
            winner_name: "Rafael Nadal".to_string(),
            winner_country: "esp".to_string(),
            loser_name: "Roger Federer".to_string(),
            loser_country: "sui".to_string(),
            score: "6-4 6-4 6-7(5) 6-7(8) 9-7".to_string(),
            similarity: 0.93,
        }
    }

    fn snapshot(active: Option<usize>) -> SessionSnapshot {
        SessionSnapshot {
            current_query: "2008 Wimbledon final".to_string(),
            history: QueryHistory::from_entries(vec!["2008 Wimbledon final".to_string()]),
            phase: Phase::Success,
            result: Some(AnswerResult {
                response: "Nadal ended Federer's run [1].".to_string(),
                matches: vec![wimbledon_final()],
                analysis: "Longest final at the time.".to_string(),
            }),
            error: None,
            active_citation: active,
        }
    }

    #[test]
    fn plain_card_shows_level_surface_date_and_players() {
        let card = render_match_card(1, &wimbledon_final(), false, RenderOptions::plain());
        assert!(card.starts_with(" [1] GBR Wimbledon"));
        assert!(card.contains("Grand Slam * Grass * F * June 23, 2008"));
        let players = "Rafael Nadal (ESP)  6-4 6-4 6-7(5) 6-7(8) 9-7  Roger Federer (SUI)";
        assert!(card.contains(players));
    }

    #[test]
    fn active_citation_marks_marker_and_card() {
        let snap = snapshot(Some(1));
        let narrative = split_narrative(&snap.result.as_ref().unwrap().response, Some(1));
        let out = render_session(&snap, &narrative, RenderOptions::plain());

        assert!(out.contains("Nadal ended Federer's run [*1]."));
        assert!(out.contains(">[1] GBR Wimbledon"));
        assert!(out.contains("Longest final at the time."));
    }

    #[test]
    fn failed_session_shows_only_error() {
        let snap = SessionSnapshot {
            phase: Phase::Failed,
            result: None,
            error: Some("Failed to fetch response".to_string()),
            ..snapshot(None)
        };
        let out = render_session(&snap, &[], RenderOptions::plain());
        assert_eq!(out, "[ERROR] Failed to fetch response\n");
    }

    #[test]
    fn history_is_numbered_from_one() {
        let out = render_history(&["b".to_string(), "a".to_string()]);
        assert_eq!(out, "Recent Queries\n  1. b\n  2. a\n");
    }
}

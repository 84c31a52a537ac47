//! UI rendering for leitner trainer.

use crate::app::{App, InputField, View};
use chrono::{DateTime, Local};
use leitner_core::{box_distribution, preview_intervals, CardStatus, Timestamp, NEVER};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart, Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, app: &mut App) {
    match app.view {
        View::DeckList => draw_deck_list(f, app),
        View::Study => draw_study(f, app),
        View::Dashboard => draw_dashboard(f, app),
        View::Editor => draw_editor(f, app),
    }

    if app.show_help {
        draw_help(f);
    }

    if app.is_editing() {
        draw_input(f, app);
    }

    if let Some(msg) = &app.message {
        draw_message(f, msg);
    }
}

/// Local calendar date for a timestamp.
pub fn format_date(ts: Timestamp, format: &str) -> String {
    DateTime::from_timestamp_millis(ts)
        .map(|dt| dt.with_timezone(&Local).format(format).to_string())
        .unwrap_or_else(|| "?".to_string())
}

pub fn format_days(days: u32) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

fn last_studied_label(ts: Timestamp, format: &str) -> String {
    if ts == NEVER {
        "never".to_string()
    } else {
        format_date(ts, format)
    }
}

fn status_color(status: CardStatus) -> Color {
    match status {
        CardStatus::New => Color::Blue,
        CardStatus::Learning => Color::Yellow,
        CardStatus::Review => Color::Cyan,
        CardStatus::Known => Color::Green,
    }
}

fn screen_chunks(area: Rect) -> std::rc::Rc<[Rect]> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
        .split(area)
}

fn header(title: &str) -> Paragraph<'_> {
    Paragraph::new(title)
        .style(Style::default().add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL))
}

fn footer(keys: &str) -> Paragraph<'_> {
    Paragraph::new(keys)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL))
}

fn draw_deck_list(f: &mut Frame, app: &App) {
    let chunks = screen_chunks(f.area());
    f.render_widget(header("Leitner Trainer"), chunks[0]);

    if app.decks.is_empty() {
        let msg = Paragraph::new("No decks yet. Press 'a' to create one or 'i' to import a CSV file.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(" Decks "));
        f.render_widget(msg, chunks[1]);
    } else {
        let items: Vec<ListItem> = app
            .decks
            .iter()
            .enumerate()
            .map(|(i, deck)| {
                let stats = app.deck_stats.get(&deck.id);
                let due = app.due_counts.get(&deck.id).copied().unwrap_or(0);
                let new = stats.map_or(0, |s| s.new_cards);
                let total = stats.map_or(0, |s| s.total_cards);

                let style = if i == app.selected_deck {
                    Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };

                let mut spans = vec![
                    Span::styled(deck.name.as_str(), style),
                    Span::raw(" - "),
                    Span::styled(format!("{due} due"), Style::default().fg(Color::Yellow)),
                    Span::raw(", "),
                    Span::styled(format!("{new} new"), Style::default().fg(Color::Blue)),
                    Span::raw(format!(" ({total} total)")),
                ];
                if !deck.description.is_empty() {
                    spans.push(Span::styled(
                        format!("  {}", deck.description),
                        Style::default().fg(Color::DarkGray),
                    ));
                }

                ListItem::new(Line::from(spans)).style(if i == app.selected_deck {
                    Style::default().bg(Color::DarkGray)
                } else {
                    Style::default()
                })
            })
            .collect();

        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Decks "));
        f.render_widget(list, chunks[1]);
    }

    f.render_widget(
        footer("j/k:Navigate  Enter:Study  a:Add  r:Rename  e:Cards  d:Delete  s:Stats  i:Import  x:Export  ?:Help  q:Quit"),
        chunks[2],
    );
}

fn draw_study(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Progress
            Constraint::Min(0),    // Card
            Constraint::Length(3), // Buttons
        ])
        .split(f.area());

    let Some(session) = &app.session else {
        return;
    };
    let date_format = app.config.display.date_format.as_str();

    let mut progress_text = format!(
        "Card {} of {} | {}/{} done ({}%)",
        (session.current_index + 1).min(session.total_cards()),
        session.total_cards(),
        session.completed(),
        session.total_cards(),
        session.percent()
    );
    if let Some(card) = &app.current_card {
        let seen = if card.has_been_reviewed() {
            format!("last studied {}", format_date(card.last_reviewed(), date_format))
        } else {
            "first review".to_string()
        };
        progress_text.push_str(&format!(" | Box {} | {}", card.leitner_box(), seen));
    }
    let progress = Paragraph::new(progress_text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(progress, chunks[0]);

    if session.is_complete() {
        let summary = format!(
            "Session complete!\n\nAgain: {}   Hard: {}   Good: {}\n\nr: study again   any other key: back to decks",
            session.count(leitner_core::Rating::Again),
            session.count(leitner_core::Rating::Hard),
            session.count(leitner_core::Rating::Good),
        );
        let complete = Paragraph::new(summary)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(complete, chunks[1]);
        return;
    }

    let Some(card) = &app.current_card else {
        return;
    };

    let visible = session.revealed.min(card.sections().len());
    let mut lines: Vec<Line> = Vec::new();
    for (i, section) in card.sections().iter().take(visible).enumerate() {
        if i > 0 {
            lines.push(Line::from(Span::styled("────", Style::default().fg(Color::DarkGray))));
        }
        let style = if i == 0 {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Green)
        };
        for text in section.content.lines() {
            lines.push(Line::from(Span::styled(text.to_string(), style)));
        }
    }

    let title = format!(" Section {visible}/{} ", card.sections().len());
    let content = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
    f.render_widget(content, chunks[1]);

    let button_spans: Vec<Span> = if session.can_rate(card.sections().len()) {
        let colors = [Color::Red, Color::Yellow, Color::Green];
        preview_intervals(card)
            .iter()
            .zip(colors)
            .flat_map(|((rating, days), color)| {
                let label = if app.config.display.show_next_review {
                    format!(" {} ({}) ", rating.name(), format_days(*days))
                } else {
                    format!(" {} ", rating.name())
                };
                vec![
                    Span::styled(format!("[{}]", rating.key()), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                    Span::raw(label),
                    Span::raw("  "),
                ]
            })
            .collect()
    } else {
        vec![
            Span::styled("[Space]", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" Show next section  "),
            Span::styled("[q]", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" End session"),
        ]
    };

    let buttons = Paragraph::new(Line::from(button_spans))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(buttons, chunks[2]);
}

fn draw_dashboard(f: &mut Frame, app: &App) {
    let chunks = screen_chunks(f.area());
    f.render_widget(header("Statistics"), chunks[0]);

    let body = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    let date_format = app.config.display.date_format.as_str();
    let rows: Vec<Row> = app
        .decks
        .iter()
        .enumerate()
        .map(|(i, deck)| {
            let stats = app.deck_stats.get(&deck.id);
            let count = |status| stats.map(|s| s.count(status).to_string()).unwrap_or_default();
            let row = Row::new(vec![
                deck.name.clone(),
                stats.map(|s| s.total_cards.to_string()).unwrap_or_default(),
                count(CardStatus::New),
                count(CardStatus::Learning),
                count(CardStatus::Review),
                count(CardStatus::Known),
                app.due_counts.get(&deck.id).map(|n| n.to_string()).unwrap_or_default(),
                stats
                    .map(|s| last_studied_label(s.last_studied, date_format))
                    .unwrap_or_default(),
            ]);
            if i == app.selected_deck {
                row.style(Style::default().bg(Color::DarkGray))
            } else {
                row
            }
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(24),
            Constraint::Percentage(8),
            Constraint::Percentage(8),
            Constraint::Percentage(10),
            Constraint::Percentage(9),
            Constraint::Percentage(8),
            Constraint::Percentage(8),
            Constraint::Percentage(25),
        ],
    )
    .header(
        Row::new(vec!["Deck", "Total", "New", "Learning", "Review", "Known", "Due", "Last studied"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(Block::default().borders(Borders::ALL).title(" Decks "));
    f.render_widget(table, body[0]);

    if let (Some(deck), Some(stats)) = (
        app.selected_deck(),
        app.selected_deck().and_then(|d| app.deck_stats.get(&d.id)),
    ) {
        let detail = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(body[1]);

        let data: Vec<(&str, u64)> = CardStatus::ALL
            .iter()
            .map(|&s| (s.name(), stats.count(s) as u64))
            .collect();
        let chart = BarChart::default()
            .block(Block::default().borders(Borders::ALL).title(format!(" {} ", deck.name)))
            .data(data.as_slice())
            .bar_width(9)
            .bar_gap(2)
            .bar_style(Style::default().fg(status_color(CardStatus::Review)))
            .value_style(Style::default().add_modifier(Modifier::BOLD));
        f.render_widget(chart, detail[0]);

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(detail[1]);

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(" Known "))
            .gauge_style(Style::default().fg(status_color(CardStatus::Known)))
            .ratio(stats.known_ratio().clamp(0.0, 1.0))
            .label(format!("{}/{}", stats.known_cards, stats.total_cards));
        f.render_widget(gauge, side[0]);

        let boxes: Vec<Line> = box_distribution(deck)
            .iter()
            .enumerate()
            .map(|(b, n)| Line::from(format!("Box {b}: {n}")))
            .collect();
        let boxes = Paragraph::new(boxes).block(Block::default().borders(Borders::ALL).title(" Boxes "));
        f.render_widget(boxes, side[1]);
    }

    f.render_widget(footer("j/k:Select deck  q:Back  ?:Help"), chunks[2]);
}

fn draw_editor(f: &mut Frame, app: &App) {
    let chunks = screen_chunks(f.area());
    let title = app
        .selected_deck()
        .map_or_else(|| "Cards".to_string(), |d| format!("Cards: {}", d.name));
    f.render_widget(header(&title), chunks[0]);

    let date_format = app.config.display.date_format.as_str();
    let cards = app.selected_deck().map(|d| d.cards()).unwrap_or_default();

    if cards.is_empty() {
        let content = Paragraph::new("No cards in this deck. Press 'a' to add one.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(content, chunks[1]);
    } else {
        let rows: Vec<Row> = cards
            .iter()
            .enumerate()
            .map(|(i, card)| {
                let row = Row::new(vec![
                    Span::raw(card.prompt().lines().next().unwrap_or_default().to_string()),
                    Span::raw(card.sections().len().to_string()),
                    Span::raw(card.leitner_box().to_string()),
                    Span::styled(card.status().name(), Style::default().fg(status_color(card.status()))),
                    Span::raw(format_date(card.next_review(), date_format)),
                ]);
                if i == app.selected_card {
                    row.style(Style::default().bg(Color::DarkGray))
                } else {
                    row
                }
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Percentage(45),
                Constraint::Percentage(10),
                Constraint::Percentage(8),
                Constraint::Percentage(14),
                Constraint::Percentage(23),
            ],
        )
        .header(
            Row::new(vec!["Prompt", "Sections", "Box", "Status", "Next review"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(table, chunks[1]);
    }

    f.render_widget(footer("j/k:Navigate  a:Add card  Enter/e:Edit  d:Delete  q:Back  ?:Help"), chunks[2]);
}

fn draw_help(f: &mut Frame) {
    let area = centered_rect(60, 80, f.area());
    f.render_widget(Clear, area);

    let help = r#"
Leitner Trainer Keybindings

Deck List:
  j/k, Up/Down    Navigate decks
  Enter, Space    Study due cards
  a / r           Add / rename deck
  e               Edit cards
  d               Delete deck
  s               Statistics
  i / x           Import / export CSV
  q               Quit

Study Session:
  Space, Enter    Show next section
  1               Again (back to box 0)
  2               Hard (stay in box)
  3               Good (up one box)
  q, Esc          End session

Card Editor:
  a               Add card
  Enter, e        Edit card
  d               Delete card
  (an empty section finishes the card)

Press any key to close
"#;

    let popup = Paragraph::new(help)
        .block(Block::default().borders(Borders::ALL).title(" Help "))
        .wrap(Wrap { trim: false });
    f.render_widget(popup, area);
}

fn draw_input(f: &mut Frame, app: &App) {
    let area = centered_rect(60, 15, f.area());
    f.render_widget(Clear, area);

    let title = match app.input_field {
        InputField::DeckName => "Deck name".to_string(),
        InputField::DeckDescription => "Deck description".to_string(),
        InputField::Section(0) => "Prompt (section 1)".to_string(),
        InputField::Section(i) => format!("Section {} (empty to finish)", i + 1),
        InputField::ImportPath => "CSV file to import".to_string(),
        InputField::ExportPath => "Export to".to_string(),
        InputField::None => String::new(),
    };

    let input = Paragraph::new(app.input_buffer.as_str())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title(format!(" {title} ")));
    f.render_widget(input, area);

    f.set_cursor_position(input_cursor(area, &app.input_buffer));
}

/// Cursor after the typed text, kept inside the popup border.
fn input_cursor(area: Rect, text: &str) -> (u16, u16) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    let offset = text.chars().count().min(inner_width);
    // offset <= area.width, which is a u16
    (area.x + 1 + offset as u16, area.y + 1)
}

fn draw_message(f: &mut Frame, msg: &str) {
    let area = Rect::new(
        f.area().x + 2,
        f.area().height.saturating_sub(5),
        f.area().width.saturating_sub(4),
        3,
    );
    f.render_widget(Clear, area);

    let message = Paragraph::new(msg)
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(message, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::Database;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use leitner_core::{Library, Section};
    use ratatui::{backend::TestBackend, Terminal};

    const T0: Timestamp = 1_700_000_000_000;

    fn fixed_clock() -> Timestamp {
        T0
    }

    fn sample_app() -> App {
        let mut library = Library::new(Database::in_memory().unwrap());
        let deck = library.create_deck("Geography", "Capitals", T0).unwrap();
        library
            .create_card(deck.id, vec![Section::new("Capital of Chile?"), Section::new("Santiago")], T0)
            .unwrap();
        App::with_clock(library, Config::default(), fixed_clock).unwrap()
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        let mut out = String::new();
        for y in area.y..area.y + area.height {
            for x in area.x..area.x + area.width {
                if let Some(cell) = buffer.cell((x, y)) {
                    out.push_str(cell.symbol());
                }
            }
            out.push('\n');
        }
        out
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn test_deck_list_render() {
        let mut app = sample_app();
        let screen = render(&mut app);
        assert!(screen.contains("Leitner Trainer"));
        assert!(screen.contains("Geography - 1 due, 1 new (1 total)"));
    }

    #[test]
    fn test_study_render_reveals_sections() {
        let mut app = sample_app();
        press(&mut app, KeyCode::Enter);

        let screen = render(&mut app);
        assert!(screen.contains("Capital of Chile?"));
        assert!(!screen.contains("Santiago"));
        assert!(screen.contains("first review"));
        assert!(screen.contains("Section 1/2"));

        press(&mut app, KeyCode::Char(' '));
        let screen = render(&mut app);
        assert!(screen.contains("Santiago"));
        assert!(screen.contains("[3] Good (2 days)"));
        assert!(screen.contains("[1] Again (1 day)"));
    }

    #[test]
    fn test_dashboard_render() {
        let mut app = sample_app();
        press(&mut app, KeyCode::Char('s'));
        let screen = render(&mut app);
        assert!(screen.contains("Statistics"));
        assert!(screen.contains("Last studied"));
        assert!(screen.contains("never"));
        assert!(screen.contains("Box 0: 1"));
    }

    #[test]
    fn test_empty_deck_list_render() {
        let mut app = App::with_clock(Library::new(Database::in_memory().unwrap()), Config::default(), fixed_clock).unwrap();
        let screen = render(&mut app);
        assert!(screen.contains("No decks yet"));
    }

    #[test]
    fn test_input_cursor_stays_in_popup() {
        let area = Rect::new(10, 5, 20, 3);
        assert_eq!(input_cursor(area, ""), (11, 6));
        assert_eq!(input_cursor(area, "abc"), (14, 6));
        assert_eq!(input_cursor(area, &"x".repeat(70_000)), (29, 6));
        assert_eq!(input_cursor(Rect::new(0, 0, 1, 1), "abc"), (1, 1));
    }

    #[test]
    fn test_format_days() {
        assert_eq!(format_days(1), "1 day");
        assert_eq!(format_days(30), "30 days");
        assert_eq!(last_studied_label(NEVER, "%Y"), "never");
    }
}

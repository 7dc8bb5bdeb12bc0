use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::i18n;
use crate::models::Situation;
use crate::view::LikeButton;

pub fn draw(frame: &mut Frame, app: &App) {
    // Main horizontal split: 1/3 left, 2/3 right
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3), // Left pane: situations
            Constraint::Ratio(2, 3), // Right pane: tip
        ])
        .split(frame.area());

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(0),    // Situation list
            Constraint::Length(1), // Status line
        ])
        .split(main_chunks[0]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Intro
            Constraint::Min(0),    // Tip content
            Constraint::Length(3), // Like and music controls
            Constraint::Length(1), // Banner
        ])
        .split(main_chunks[1]);

    render_header(frame, app, left_chunks[0]);
    render_situations(frame, app, left_chunks[1]);
    render_left_status(frame, app, left_chunks[2]);

    render_intro(frame, app, right_chunks[0]);
    render_tip(frame, app, right_chunks[1]);
    render_controls(frame, app, right_chunks[2]);
    render_banner(frame, app, right_chunks[3]);

    if app.show_help {
        render_help(frame);
    }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let s = i18n::strings(app.language());

    let block = Block::default()
        .title(format!(" {} ", s.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text = format!(" [{}] t: {}", app.language().as_str(), s.switch_lang);
    let paragraph = Paragraph::new(text).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_situations(frame: &mut Frame, app: &App, area: Rect) {
    let language = app.language();

    let items: Vec<ListItem> = Situation::ALL
        .iter()
        .enumerate()
        .map(|(i, situation)| {
            let line = Line::from(vec![
                Span::styled(format!("{} ", i + 1), Style::default().fg(Color::Yellow)),
                Span::styled(
                    i18n::situation_label(language, *situation),
                    Style::default().fg(Color::White),
                ),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(
        app.state
            .state()
            .current_situation
            .and_then(|current| Situation::ALL.iter().position(|s| *s == current)),
    );

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_left_status(frame: &mut Frame, app: &App, area: Rect) {
    let status = if app.view.is_loading {
        i18n::strings(app.language()).loading
    } else {
        "1-5:situation  n:next  l:like  ?:help  q:quit"
    };

    let paragraph = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

fn render_intro(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let paragraph = Paragraph::new(i18n::strings(app.language()).intro)
        .block(block)
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_tip(frame: &mut Frame, app: &App, area: Rect) {
    let language = app.language();
    let s = i18n::strings(language);
    let state = app.state.state();

    let content = if app.view.is_loading {
        s.loading
    } else {
        match (app.view.tip_text(), state.current_situation) {
            (Some(text), _) => text,
            (None, Some(_)) => s.no_tips,
            (None, None) => s.pick_situation,
        }
    };

    let title = state
        .current_situation
        .map(|situation| format!(" {} ", i18n::situation_label(language, situation)))
        .unwrap_or_default();

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, area);
}

fn render_controls(frame: &mut Frame, app: &App, area: Rect) {
    let language = app.language();
    let s = i18n::strings(language);

    let like_style = match app.view.like_button() {
        LikeButton::Confirmed { .. } => Style::default().fg(Color::Red),
        _ if app.view.like_enabled() => Style::default().fg(Color::White),
        _ => Style::default().fg(Color::DarkGray),
    };
    let heart = if app.is_current_tip_liked() { "♥ " } else { "♡ " };

    let music = if app.is_audio_playing() {
        s.stop_music
    } else {
        s.play_music
    };

    let line = Line::from(vec![
        Span::styled(format!("l: {heart}"), like_style),
        Span::styled(app.view.like_label(language), like_style),
        Span::raw("   "),
        Span::styled(format!("n: {}", s.next_tip), Style::default().fg(Color::White)),
        Span::raw("   "),
        Span::styled(format!("a: {music}"), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!(" [{}]", app.current_track().as_str()),
            Style::default().fg(Color::Blue),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

fn render_banner(frame: &mut Frame, app: &App, area: Rect) {
    let Some(message) = app.view.banner() else {
        return;
    };

    let paragraph = Paragraph::new(format!(" {message}")).style(
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
    );
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 60, frame.area());

    let help_text = vec![
        "",
        " Tips:",
        "   1-5        Pick a situation",
        "   n / Enter  Next tip",
        "   l          Like this tip",
        "   t          Switch language",
        "",
        " Music:",
        "   a          Play / stop",
        "   s          Next track",
        "",
        " General:",
        "   r          Reload tips",
        "   ?          Toggle this help",
        "   q          Quit",
        "",
        " Press any key to close",
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(ratatui::widgets::Clear, area);
    frame.render_widget(paragraph, area);
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

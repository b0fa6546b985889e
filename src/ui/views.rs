use crate::app::search::ALL_CATEGORIES;
use crate::app::state::{App, DetailTab, SearchMode};
use crate::listing::model::BusinessRecord;
use crate::listing::normalize::map_embed;
use crate::util::{format_rupiah, truncate};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Tabs, Wrap},
};

const FAVORITE_MARK: &str = "♥ ";

/// Draws the browse view: search input, category bar, results and status bar.
pub fn draw_browse(frame: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search input
            Constraint::Length(1), // Categories
            Constraint::Min(1),    // Results
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    draw_search_input(frame, app, layout[0]);
    draw_category_bar(frame, app, layout[1]);
    draw_results(frame, app, layout[2]);
    draw_status_bar(
        frame,
        app,
        layout[3],
        "Esc quit • Enter detail • Tab category • Ctrl+F favorite • Ctrl+L favorites • Ctrl+K quick search",
    );
}

pub fn draw_detail(frame: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),  // Header
            Constraint::Length(10), // Info
            Constraint::Min(3),     // Tabs
            Constraint::Length(1),  // Status bar
        ])
        .split(frame.area());

    let hints = "b back • f favorite • Tab products/location • / quick search";
    let Some(record) = &app.detail.record else {
        let text = if let Some(msg) = &app.detail.message {
            msg.clone()
        } else if app.detail_loading() {
            "Loading business details…".to_string()
        } else {
            "No business selected".to_string()
        };
        let msg = Paragraph::new(text)
            .block(Block::default().title("Detail").borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        frame.render_widget(msg, layout[1].union(layout[2]));
        draw_status_bar(frame, app, layout[3], hints);
        return;
    };

    draw_detail_header(frame, app, record, layout[0]);
    draw_info(frame, record, layout[1]);

    let tab_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(layout[2]);
    let selected = match app.detail.tab {
        DetailTab::Products => 0,
        DetailTab::Location => 1,
    };
    let tabs = Tabs::new(vec!["Products", "Location"])
        .select(selected)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, tab_area[0]);

    match app.detail.tab {
        DetailTab::Products => draw_products(frame, record, tab_area[1]),
        DetailTab::Location => draw_location(frame, app, record, tab_area[1]),
    }
    draw_status_bar(frame, app, layout[3], hints);
}

pub fn draw_favorites(frame: &mut Frame, app: &App) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    let items: Vec<ListItem> = app
        .favorites
        .list()
        .iter()
        .map(|f| {
            let kind = if f.kind.is_empty() { "Unknown" } else { f.kind.as_str() };
            ListItem::new(Line::from(vec![
                Span::styled(
                    f.name.clone(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  "),
                Span::styled(kind.to_string(), Style::default().fg(Color::Cyan)),
                Span::raw("  "),
                Span::styled(truncate(&f.address, 40), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let mut list_state = ListState::default();
    if !app.favorites.is_empty() {
        list_state.select(Some(app.favorites_selected));
    }

    let title = format!("Favorites ({})", app.favorites.len());
    if items.is_empty() {
        let empty = Paragraph::new("No favorites yet. Press Ctrl+F on a business to save it.")
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(empty, layout[0]);
    } else {
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD | Modifier::REVERSED),
            )
            .highlight_symbol("▸ ");
        frame.render_stateful_widget(list, layout[0], &mut list_state);
    }

    draw_status_bar(frame, app, layout[1], "b back • Enter open • d remove • / quick search");
}

/// Quick search popup drawn over whichever view is active.
pub fn draw_overlay(frame: &mut Frame, app: &App) {
    let area = centered(frame.area(), 60, 14);
    frame.render_widget(Clear, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let input_block = Block::default().title("Quick search").borders(Borders::ALL);
    let input = Paragraph::new(app.overlay.input.as_str()).block(input_block.clone());
    frame.render_widget(input, layout[0]);
    let inner = input_block.inner(layout[0]);
    frame.set_cursor_position((
        inner.x.saturating_add(app.overlay.input.chars().count() as u16),
        inner.y,
    ));

    let items: Vec<ListItem> = app
        .overlay
        .results
        .iter()
        .filter_map(|&i| app.listing.get(i))
        .map(|r| {
            ListItem::new(Line::from(vec![
                Span::styled(r.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw("  "),
                Span::styled(truncate(&r.description, 30), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let block = Block::default().borders(Borders::ALL);
    if items.is_empty() {
        let hint = if app.overlay.input.is_empty() || app.overlay.needs_filter {
            "Type to search by name or description"
        } else {
            "No matches"
        };
        frame.render_widget(
            Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)).block(block),
            layout[1],
        );
        return;
    }

    let mut state = ListState::default();
    state.select(Some(app.overlay.selected_index));
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::REVERSED))
        .highlight_symbol("▸ ");
    frame.render_stateful_widget(list, layout[1], &mut state);
}

fn draw_search_input(frame: &mut Frame, app: &App, area: Rect) {
    let input_line = if app.browse.input.is_empty() {
        Line::from(vec![Span::styled(
            "Search name, description, address or type…",
            Style::default().fg(Color::DarkGray),
        )])
    } else {
        Line::from(Span::raw(app.browse.input.as_str()))
    };

    let input_block = Block::default().title("Search").borders(Borders::ALL);
    let input = Paragraph::new(input_line)
        .block(input_block.clone())
        .wrap(Wrap { trim: true });

    frame.render_widget(input, area);

    if app.browse.mode == SearchMode::Insert && !app.overlay.open {
        let inner = input_block.inner(area);
        let x = inner.x.saturating_add(app.browse.input.chars().count() as u16);
        frame.set_cursor_position((x, inner.y));
    }
}

fn draw_category_bar(frame: &mut Frame, app: &App, area: Rect) {
    let selected = app.browse.category.label();
    let mut spans = vec![Span::styled("Category: ", Style::default().fg(Color::DarkGray))];
    for name in std::iter::once(ALL_CATEGORIES).chain(app.browse.categories.iter().map(String::as_str)) {
        let style = if name == selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {name} "), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_results(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .browse
        .filtered_indices
        .iter()
        .filter_map(|&i| app.listing.get(i))
        .map(|r| {
            let mark = if app.favorites.is_favorite(&r.id) { FAVORITE_MARK } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(Color::Red)),
                Span::styled(
                    r.name.clone(),
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ),
                Span::raw("  ["),
                Span::styled(r.kind.clone(), Style::default().fg(Color::Cyan)),
                Span::raw("]  "),
                Span::styled(r.hours(), Style::default().fg(Color::Green)),
                Span::raw("  "),
                Span::styled(truncate(&r.address, 40), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let mut list_state = ListState::default();
    if !app.browse.filtered_indices.is_empty() {
        list_state.select(Some(app.browse.selected_index));
    }

    let title = Line::from(vec![
        Span::styled("Businesses ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("(Enter to open) – "),
        Span::styled(
            format!("{} results", app.browse.filtered_indices.len()),
            Style::default().fg(Color::Gray),
        ),
    ]);
    let block = Block::default().title(title).borders(Borders::ALL);

    if items.is_empty() {
        let text = if app.listing_loading() {
            "Loading businesses…"
        } else {
            "No businesses match your search."
        };
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut list_state);
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, hints: &str) {
    let mode = if app.browse.mode == SearchMode::Insert { "Insert" } else { "Navigate" };
    let status_line = Line::from(vec![
        Span::styled(app.status.clone(), Style::default().fg(Color::Gray)),
        Span::raw("   "),
        Span::styled(hints.to_string(), Style::default().fg(Color::DarkGray)),
        Span::raw("   |  ♥ "),
        Span::styled(app.favorites.len().to_string(), Style::default().fg(Color::Red)),
        Span::raw("   |  Seller login: "),
        Span::styled(app.services.login_url, Style::default().fg(Color::DarkGray)),
        Span::raw("   |  Mode: "),
        Span::styled(mode, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
    ]);

    frame.render_widget(Paragraph::new(status_line).wrap(Wrap { trim: true }), area);
}

fn draw_detail_header(frame: &mut Frame, app: &App, record: &BusinessRecord, area: Rect) {
    let mark = if app.favorites.is_favorite(&record.id) { FAVORITE_MARK } else { "" };
    let header = Paragraph::new(format!("{mark}{}   [{}]", record.name, record.kind))
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(header, area);
}

fn draw_info(frame: &mut Frame, record: &BusinessRecord, area: Rect) {
    let or = |value: &str, fallback: &'static str| {
        if value.trim().is_empty() { fallback.to_string() } else { value.to_string() }
    };

    let rows = vec![
        Row::new(vec![
            Cell::from("About"),
            Cell::from(or(&record.description, "No description available")),
        ]),
        Row::new(vec![
            Cell::from("Address"),
            Cell::from(or(&record.address, "Address not provided")),
        ]),
        Row::new(vec![
            Cell::from("Phone"),
            Cell::from(record.phone.clone().unwrap_or_else(|| "No contact info".into())),
        ]),
        Row::new(vec![
            Cell::from("Open"),
            Cell::from(record.hours()).style(Style::default().fg(Color::Green)),
        ]),
        Row::new(vec![Cell::from("Cover"), Cell::from(record.cover_image.clone())]),
        Row::new(vec![
            Cell::from("Images"),
            Cell::from(record.images.len().to_string()),
        ]),
        Row::new(vec![
            Cell::from("Document"),
            Cell::from(record.document.clone().unwrap_or_else(|| "-".into())),
        ]),
    ];

    let table = Table::new(rows, [Constraint::Length(10), Constraint::Min(10)])
        .block(Block::default().title("Business").borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn draw_products(frame: &mut Frame, record: &BusinessRecord, area: Rect) {
    let block = Block::default().title("Featured Products").borders(Borders::ALL);
    if record.products.is_empty() {
        frame.render_widget(Paragraph::new("No products available.").block(block), area);
        return;
    }

    let header = Row::new(vec![
        Cell::from("Name"),
        Cell::from("Price"),
        Cell::from("Description"),
        Cell::from("Image"),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows = record.products.iter().map(|p| {
        Row::new(vec![
            Cell::from(p.name.clone()),
            Cell::from(format_rupiah(p.price)).style(Style::default().fg(Color::Green)),
            Cell::from(truncate(&p.description, 40)),
            Cell::from(p.image.clone()).style(Style::default().fg(Color::DarkGray)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(24),
            Constraint::Length(14),
            Constraint::Length(42),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .block(block);
    frame.render_widget(table, area);
}

fn draw_location(frame: &mut Frame, app: &App, record: &BusinessRecord, area: Rect) {
    let embed = record
        .location_url
        .as_deref()
        .and_then(|loc| map_embed(loc, app.services.maps_api_key.as_deref()));

    let lines = vec![
        Line::from(vec![
            Span::styled("Address: ", Style::default().fg(Color::DarkGray)),
            Span::raw(record.address.clone()),
        ]),
        Line::from(vec![
            Span::styled("Map: ", Style::default().fg(Color::DarkGray)),
            match embed {
                Some(url) => Span::styled(url, Style::default().fg(Color::Cyan)),
                None => Span::styled("No map available", Style::default().fg(Color::DarkGray)),
            },
        ]),
    ];

    let para = Paragraph::new(lines)
        .block(Block::default().title("Location").borders(Borders::ALL))
        .wrap(Wrap { trim: false });
    frame.render_widget(para, area);
}

fn centered(area: Rect, width_pct: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(width_pct) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 3,
        width,
        height,
    }
}

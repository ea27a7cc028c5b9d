#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap};

use crate::error::TaskdeckError;
use crate::output::tasks::{deadline_label, status_icon, task_details};
use crate::task::clock::Clock;
use crate::task::model::{Task, TaskPatch, TaskStatus};
use crate::task::storage::TaskSlot;
use crate::task::store::TaskStore;
use crate::tui::{self, TerminalGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Urgent,
    Active,
    Done,
}

impl Pane {
    const ALL: [Self; 3] = [Self::Urgent, Self::Active, Self::Done];

    fn index(self) -> usize {
        match self {
            Self::Urgent => 0,
            Self::Active => 1,
            Self::Done => 2,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::Active => "Active",
            Self::Done => "Done",
        }
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % 3]
    }

    fn prev(self) -> Self {
        Self::ALL[(self.index() + 2) % 3]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

/// Board state that survives between frames. Task lists are recomputed
/// from the store on every draw; only cursor positions are kept here.
#[derive(Debug)]
pub struct Board {
    focus: Pane,
    cursor: [usize; 3],
    pending_delete: Option<i64>,
    show_help: bool,
    show_details: bool,
    message: Option<String>,
}

impl Default for Board {
    fn default() -> Self {
        Self {
            focus: Pane::Active,
            cursor: [0; 3],
            pending_delete: None,
            show_help: false,
            show_details: false,
            message: None,
        }
    }
}

impl Board {
    #[must_use]
    pub fn focus(&self) -> Pane {
        self.focus
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn pane_ids<S: TaskSlot, C: Clock>(store: &TaskStore<S, C>, pane: Pane) -> Vec<i64> {
        let views = store.views();
        let list = match pane {
            Pane::Urgent => views.urgent,
            Pane::Active => views.active,
            Pane::Done => views.done,
        };
        list.iter().map(|t| t.id).collect()
    }

    /// Id under the cursor in the focused pane.
    #[must_use]
    pub fn selected_id<S: TaskSlot, C: Clock>(&self, store: &TaskStore<S, C>) -> Option<i64> {
        let ids = Self::pane_ids(store, self.focus);
        ids.get(self.cursor[self.focus.index()]).copied()
    }

    fn clamp_cursors<S: TaskSlot, C: Clock>(&mut self, store: &TaskStore<S, C>) {
        for pane in Pane::ALL {
            let len = Self::pane_ids(store, pane).len();
            let c = &mut self.cursor[pane.index()];
            *c = (*c).min(len.saturating_sub(1));
        }
    }

    fn move_cursor<S: TaskSlot, C: Clock>(&mut self, store: &TaskStore<S, C>, delta: isize) {
        let len = Self::pane_ids(store, self.focus).len();
        if len == 0 {
            return;
        }
        let c = &mut self.cursor[self.focus.index()];
        *c = c.saturating_add_signed(delta).min(len - 1);
    }

    pub fn handle_key<S: TaskSlot, C: Clock>(
        &mut self,
        store: &mut TaskStore<S, C>,
        key: KeyEvent,
    ) -> Result<Outcome, TaskdeckError> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c'))
        {
            return Ok(Outcome::Quit);
        }

        if let Some(id) = self.pending_delete.take() {
            if matches!(key.code, KeyCode::Char('y' | 'Y')) {
                if store.delete(id)? {
                    self.message = Some(format!("deleted {id}"));
                }
            } else {
                self.message = Some("delete cancelled".to_owned());
            }
            self.clamp_cursors(store);
            return Ok(Outcome::Continue);
        }

        if self.show_help {
            self.show_help = false;
            return Ok(Outcome::Continue);
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(Outcome::Quit),
            KeyCode::Char('?') => self.show_help = true,
            KeyCode::Char('i') => self.show_details = !self.show_details,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => self.focus = self.focus.next(),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
                self.focus = self.focus.prev();
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(store, 1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(store, -1),
            KeyCode::Char('r') => {
                store.resort();
                self.message = Some("refreshed".to_owned());
            }
            KeyCode::Enter | KeyCode::Char('s') => {
                if let Some(task) = self.selected_id(store).and_then(|id| store.get(id)) {
                    let (id, next) = (task.id, task.status.next());
                    store.set_status(id, next)?;
                    self.message = Some(format!("{id} -> {next}"));
                }
            }
            KeyCode::Char('x') => {
                if let Some(id) = self.selected_id(store) {
                    store.set_status(id, TaskStatus::Done)?;
                    self.message = Some(format!("{id} -> done"));
                }
            }
            KeyCode::Char('p') => {
                if let Some(task) = self.selected_id(store).and_then(|id| store.get(id)) {
                    let (id, next) = (task.id, task.priority.cycle());
                    store.update(id, &TaskPatch::priority(next))?;
                    self.message = Some(format!("{id} priority {next}"));
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_id(store) {
                    self.pending_delete = Some(id);
                    self.message = Some(format!("delete {id}? (y/n)"));
                }
            }
            _ => {}
        }

        self.clamp_cursors(store);
        Ok(Outcome::Continue)
    }
}

/// Runs the interactive board until the user quits.
pub fn run<S: TaskSlot, C: Clock>(
    store: &mut TaskStore<S, C>,
    refresh: Duration,
) -> Result<(), TaskdeckError> {
    if !tui::is_tty() {
        return Err(TaskdeckError::Other("board requires a TTY".to_owned()));
    }

    let terminal = tui::init_terminal()?;
    let mut guard = TerminalGuard::new(terminal);
    let mut board = Board::default();
    let mut last_tick = Instant::now();

    loop {
        let terminal = guard
            .terminal
            .as_mut()
            .ok_or_else(|| TaskdeckError::Other("terminal unavailable".to_owned()))?;
        terminal
            .draw(|f| draw(f, &board, store))
            .map_err(|e| TaskdeckError::Other(format!("failed to draw board: {e}")))?;

        if event::poll(Duration::from_millis(100))
            .map_err(|e| TaskdeckError::Other(format!("event poll failed: {e}")))?
            && let Event::Key(key) =
                event::read().map_err(|e| TaskdeckError::Other(format!("event read failed: {e}")))?
            && key.kind == KeyEventKind::Press
        {
            match board.handle_key(store, key) {
                Ok(Outcome::Quit) => return Ok(()),
                Ok(Outcome::Continue) => {}
                Err(e) => board.message = Some(format!("error: {e}")),
            }
        }

        if last_tick.elapsed() >= refresh {
            store.resort();
            last_tick = Instant::now();
        }
    }
}

fn draw<S: TaskSlot, C: Clock>(f: &mut Frame<'_>, board: &Board, store: &TaskStore<S, C>) {
    let now = store.now();
    let views = store.views();
    let area = f.area();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(if board.show_details { 10 } else { 0 }),
            Constraint::Length(1),
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(rows[0]);

    for (pane, tasks) in [
        (Pane::Urgent, &views.urgent),
        (Pane::Active, &views.active),
        (Pane::Done, &views.done),
    ] {
        let focused = board.focus == pane;
        let items: Vec<ListItem> = if tasks.is_empty() {
            vec![ListItem::new(Line::styled(
                "None",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            tasks.iter().map(|t| task_item(t, pane, now)).collect()
        };

        let border = if focused {
            Style::default().fg(Color::Cyan)
        } else if pane == Pane::Urgent && !tasks.is_empty() {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!("{} ({})", pane.title(), tasks.len()))
                    .borders(Borders::ALL)
                    .border_style(border),
            )
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );

        let mut state = ListState::default();
        if focused && !tasks.is_empty() {
            state.select(Some(board.cursor[pane.index()]));
        }
        f.render_stateful_widget(list, columns[pane.index()], &mut state);
    }

    if board.show_details {
        let text = board
            .selected_id(store)
            .and_then(|id| store.get(id))
            .map_or_else(|| "No task selected".to_owned(), |t| task_details(t, now));
        let details = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title("Details"))
            .wrap(Wrap { trim: false });
        f.render_widget(details, rows[1]);
    }

    let hint = "←/→ pane • j/k move • s status • x done • p priority • d delete • ? help • q quit";
    let status = Paragraph::new(Line::from(vec![
        Span::styled(
            board.message.clone().unwrap_or_default(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(hint, Style::default().fg(Color::DarkGray)),
    ]));
    f.render_widget(status, rows[2]);

    if board.show_help {
        let popup = centered_rect(60, 60, area);
        f.render_widget(Clear, popup);
        let lines = vec![
            Line::from("Keys:"),
            Line::from("  ←/→, h/l, Tab   Switch pane"),
            Line::from("  ↑/↓, j/k        Move"),
            Line::from("  s, Enter        Next status (todo → doing → done)"),
            Line::from("  x               Mark done"),
            Line::from("  p               Cycle priority"),
            Line::from("  d, Del          Delete (confirm with y)"),
            Line::from("  i               Toggle details"),
            Line::from("  r               Re-sort now"),
            Line::from("  q, Esc          Quit"),
        ];
        let help = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: false });
        f.render_widget(help, popup);
    }
}

fn task_item(task: &Task, pane: Pane, now: time::OffsetDateTime) -> ListItem<'static> {
    let mut spans = vec![
        Span::raw(format!("{} ", status_icon(task.status))),
        Span::styled(
            format!("P{} ", task.priority),
            priority_style(task.priority.value()),
        ),
        Span::raw(task.title.clone()),
    ];
    if pane != Pane::Done {
        spans.push(Span::styled(
            format!("  {}", deadline_label(task, now)),
            Style::default().fg(Color::DarkGray),
        ));
    }
    ListItem::new(Line::from(spans))
}

fn priority_style(priority: u8) -> Style {
    match priority {
        3 => Style::default().fg(Color::Red),
        2 => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Green),
    }
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

// tui.rs

use crate::app::{App, InputMode, SetupStep};
use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use ratatui::{
    Terminal,
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use std::{io, time::Duration};
use textwrap::wrap;

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()>
where
    std::io::Error: From<<B as Backend>::Error>,
{
    // First run without a saved config goes straight to setup; otherwise
    // pull the list once so the view starts populated.
    if app.store.is_some() {
        app.refresh();
    } else {
        app.start_setup();
    }

    loop {
        terminal.draw(|f| ui(f, app))?;

        if crossterm::event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match app.input_mode {
                    InputMode::Normal => match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char('a') => {
                            app.begin_create();
                        }
                        KeyCode::Char('e') => {
                            app.begin_edit_selected();
                        }
                        KeyCode::Char('d') => {
                            app.request_remove();
                        }
                        KeyCode::Char('r') => {
                            app.refresh();
                        }
                        KeyCode::Char('s') => {
                            app.start_setup();
                        }
                        KeyCode::Down => {
                            if app.selected < app.tasks.len().saturating_sub(1) {
                                app.selected += 1;
                            }
                        }
                        KeyCode::Up => {
                            if app.selected > 0 {
                                app.selected -= 1;
                            }
                        }
                        _ => {}
                    },
                    InputMode::EditingJob => match key.code {
                        KeyCode::Enter | KeyCode::Tab => {
                            app.input_mode = InputMode::EditingAssignor;
                        }
                        KeyCode::Esc => {
                            app.cancel_edit();
                        }
                        KeyCode::Char(c) => {
                            app.draft.job.push(c);
                        }
                        KeyCode::Backspace => {
                            app.draft.job.pop();
                        }
                        _ => {}
                    },
                    InputMode::EditingAssignor => match key.code {
                        KeyCode::Enter | KeyCode::Tab => {
                            app.input_mode = InputMode::EditingDeadline;
                        }
                        KeyCode::Esc => {
                            app.cancel_edit();
                        }
                        KeyCode::Char(c) => {
                            app.draft.assignor.push(c);
                        }
                        KeyCode::Backspace => {
                            app.draft.assignor.pop();
                        }
                        _ => {}
                    },
                    InputMode::EditingDeadline => match key.code {
                        KeyCode::Enter | KeyCode::Tab => {
                            app.input_mode = InputMode::EditingFinishDate;
                        }
                        KeyCode::Esc => {
                            app.cancel_edit();
                        }
                        KeyCode::Char(c) => {
                            app.draft.deadline.push(c);
                        }
                        KeyCode::Backspace => {
                            app.draft.deadline.pop();
                        }
                        _ => {}
                    },
                    InputMode::EditingFinishDate => match key.code {
                        KeyCode::Enter | KeyCode::Tab => {
                            app.input_mode = InputMode::EditingJobdesc;
                        }
                        KeyCode::Esc => {
                            app.cancel_edit();
                        }
                        KeyCode::Char(c) => {
                            app.draft.finishdate.push(c);
                        }
                        KeyCode::Backspace => {
                            app.draft.finishdate.pop();
                        }
                        _ => {}
                    },
                    InputMode::EditingJobdesc => match key.code {
                        // last field: Enter submits, Tab wraps back around
                        KeyCode::Enter => {
                            app.submit();
                        }
                        KeyCode::Tab => {
                            app.input_mode = InputMode::EditingJob;
                        }
                        KeyCode::Esc => {
                            app.cancel_edit();
                        }
                        KeyCode::Char(c) => {
                            app.draft.jobdesc.push(c);
                        }
                        KeyCode::Backspace => {
                            app.draft.jobdesc.pop();
                        }
                        _ => {}
                    },
                    InputMode::ConfirmingDelete => match key.code {
                        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                            app.confirm_remove();
                        }
                        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                            app.decline_remove();
                        }
                        _ => {}
                    },
                    InputMode::EditingSetup => match key.code {
                        KeyCode::Enter => {
                            app.submit_setup();
                        }
                        KeyCode::Esc => {
                            app.cancel_setup();
                        }
                        KeyCode::Char(c) => {
                            app.input_setup.push(c);
                        }
                        KeyCode::Backspace => {
                            app.input_setup.pop();
                        }
                        _ => {}
                    },
                }
            }
        }
    }
}

fn ui(f: &mut ratatui::Frame<'_>, app: &App) {
    let size = f.area();

    let editing = matches!(
        app.input_mode,
        InputMode::EditingJob
            | InputMode::EditingAssignor
            | InputMode::EditingDeadline
            | InputMode::EditingFinishDate
            | InputMode::EditingJobdesc
    );

    let mut constraints = vec![
        Constraint::Length(3), // title
        Constraint::Length(3), // help
        Constraint::Min(1),    // task list
    ];
    if editing {
        constraints.push(Constraint::Length(7)); // form
    }
    if matches!(
        app.input_mode,
        InputMode::ConfirmingDelete | InputMode::EditingSetup
    ) {
        constraints.push(Constraint::Length(3)); // prompt / setup input
    }
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(constraints)
        .split(size);

    let mut title_text = "Task Desk".to_string();
    if app.loading {
        title_text.push_str(" (loading...)");
    } else if app.submitting {
        title_text.push_str(" (saving...)");
    } else if app.store.is_none() {
        title_text.push_str(" (no store configured)");
    }
    let title = Paragraph::new(Line::from(Span::styled(
        title_text,
        Style::default().add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    let b = Style::default().add_modifier(Modifier::BOLD);
    let help = Paragraph::new(vec![
        Line::from(vec![
            Span::raw("Press "),
            Span::styled("a", b),
            Span::raw(" add, "),
            Span::styled("e", b),
            Span::raw(" edit, "),
            Span::styled("d", b),
            Span::raw(" delete, "),
            Span::styled("r", b),
            Span::raw(" refresh, "),
            Span::styled("s", b),
            Span::raw(" setup, "),
            Span::styled("q", b),
            Span::raw(" quit"),
        ]),
        Line::from(vec![
            Span::raw("In the form: "),
            Span::styled("Enter", b),
            Span::raw(" next field / save, "),
            Span::styled("Tab", b),
            Span::raw(" cycle fields, "),
            Span::styled("Esc", b),
            Span::raw(" cancel"),
        ]),
    ])
    .alignment(Alignment::Center);
    f.render_widget(help, chunks[1]);

    let list_area = chunks[2];
    let inner_width = list_area.width.saturating_sub(2) as usize;

    if app.loading {
        let fetching = Paragraph::new("Fetching tasks...")
            .block(Block::default().borders(Borders::ALL).title("Tasks"))
            .style(Style::default().fg(Color::Blue));
        f.render_widget(fetching, list_area);
    } else if app.tasks.is_empty() {
        let empty = Paragraph::new("No tasks found. Press 'a' to add one.")
            .block(Block::default().borders(Borders::ALL).title("Tasks"))
            .style(Style::default().fg(Color::Gray));
        f.render_widget(empty, list_area);
    } else {
        let tasks: Vec<ListItem> = app
            .tasks
            .iter()
            .map(|t| {
                let finished = t.finishdate.is_some();
                let status = if finished { "[x]" } else { "[ ]" };
                let color = if finished {
                    Color::Green
                } else if is_overdue(&t.deadline) {
                    Color::Red
                } else {
                    Color::Yellow
                };

                let mut text = format!(
                    "{} {} (by {}) (Deadline: {})",
                    status, t.job, t.assignor, t.deadline
                );
                if let Some(ref fdate) = t.finishdate {
                    text.push_str(&format!(" (Finished: {})", fdate));
                }
                text.push_str(&format!(" [Created: {}]", created_date(&t.created_at)));
                if let Some(ref desc) = t.jobdesc {
                    if !desc.is_empty() {
                        text.push_str(&format!(" - {}", desc));
                    }
                }

                let wrapped = wrap(&text, inner_width.max(1));
                let lines: Vec<Line> = wrapped
                    .iter()
                    .map(|w| Line::from(Span::styled(w.to_string(), Style::default().fg(color))))
                    .collect();
                ListItem::new(lines)
            })
            .collect();

        let mut list_state = ratatui::widgets::ListState::default();
        if !tasks.is_empty() {
            list_state.select(Some(app.selected.min(tasks.len() - 1)));
        }

        let task_list = List::new(tasks)
            .block(Block::default().borders(Borders::ALL).title("Tasks"))
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ");
        f.render_stateful_widget(task_list, list_area, &mut list_state);
    }

    let last = chunks.len() - 1;

    if editing {
        let form_title = match app.draft.editing_id {
            Some(id) => format!("Edit Task #{}", id),
            None => "Add Task".to_string(),
        };
        let lines = vec![
            form_line(
                "Job:",
                &app.draft.job,
                app.input_mode == InputMode::EditingJob,
            ),
            form_line(
                "Assignor:",
                &app.draft.assignor,
                app.input_mode == InputMode::EditingAssignor,
            ),
            form_line(
                "Deadline:",
                &app.draft.deadline,
                app.input_mode == InputMode::EditingDeadline,
            ),
            form_line(
                "Finish date:",
                &app.draft.finishdate,
                app.input_mode == InputMode::EditingFinishDate,
            ),
            form_line(
                "Description:",
                &app.draft.jobdesc,
                app.input_mode == InputMode::EditingJobdesc,
            ),
        ];
        let form = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(form_title));
        f.render_widget(form, chunks[last]);
    } else if matches!(app.input_mode, InputMode::ConfirmingDelete) {
        let job = app
            .pending_delete_task()
            .map(|t| t.job.as_str())
            .unwrap_or("this task");
        let prompt = Paragraph::new(format!(
            "Delete \"{}\"? Press y to confirm, n to cancel.",
            job
        ))
        .block(Block::default().borders(Borders::ALL).title("Confirm Delete"))
        .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD));
        f.render_widget(prompt, chunks[last]);
    } else if matches!(app.input_mode, InputMode::EditingSetup) {
        let caret = "|";
        let text = if app.input_setup.is_empty() {
            caret.to_string()
        } else {
            format!("{}{}", app.input_setup, caret)
        };
        let step_title = match app.setup_step {
            Some(SetupStep::Url) => "Store Project URL",
            Some(SetupStep::ApiKey) => "Store API Key",
            None => "Store Setup",
        };
        let widget = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(step_title))
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            .wrap(Wrap { trim: true });
        f.render_widget(widget, chunks[last]);
    }

    // Show error message if any
    if let Some(ref msg) = app.error_message {
        let error = Paragraph::new(msg.as_str())
            .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        let area = ratatui::layout::Rect {
            x: size.x,
            y: size.height.saturating_sub(2),
            width: size.width,
            height: 1,
        };
        f.render_widget(error, area);
    }
}

fn form_line(label: &str, value: &str, active: bool) -> Line<'static> {
    let text = if active {
        format!("{}|", value)
    } else {
        value.to_string()
    };
    let style = if active {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    Line::from(vec![
        Span::styled(format!("{:<13}", label), Style::default().fg(Color::Gray)),
        Span::styled(text, style),
    ])
}

// A task is overdue when its deadline has passed; finished tasks are
// drawn as done regardless.
fn is_overdue(deadline: &str) -> bool {
    if let Ok(date) = NaiveDate::parse_from_str(deadline, "%Y-%m-%d") {
        let today = Local::now().date_naive();
        return date < today;
    }
    false
}

/// The store reports `created_at` as a full timestamp; only the calendar
/// day is worth showing in the list.
fn created_date(created_at: &str) -> &str {
    created_at.get(..10).unwrap_or(created_at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_overdue() {
        assert!(is_overdue("2000-01-01"));
        assert!(!is_overdue("2099-12-31"));
        assert!(!is_overdue("not a date"));
    }

    #[test]
    fn test_created_date_trims_timestamp() {
        assert_eq!(created_date("2024-05-02T10:11:12.345+00:00"), "2024-05-02");
        assert_eq!(created_date("2024"), "2024");
    }
}

use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::Local;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::list::TaskView;
use crate::task::{Priority, Task};
use crate::validation::FieldErrors;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip(self, views))]
    pub fn print_task_table(&self, views: &[TaskView]) -> anyhow::Result<()> {
        let table = self.task_table(views)?;
        io::stdout().lock().write_all(table.as_bytes())?;
        Ok(())
    }

    pub fn task_table(&self, views: &[TaskView]) -> anyhow::Result<String> {
        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Pri".to_string(),
            "Due".to_string(),
            "Category".to_string(),
            "Title".to_string(),
        ];

        let mut rows = Vec::with_capacity(views.len());
        for view in views {
            let id = self.paint(&view.id.to_string(), "33");
            let done = if view.completed { "x" } else { "" }.to_string();
            let priority = match view.badges.priority {
                Priority::High => self.paint("high", "31"),
                other => other.to_string(),
            };
            let due = match view.badges.due.as_ref() {
                Some(badge) => {
                    let text = badge.due.with_timezone(&Local).format("%Y-%m-%d").to_string();
                    if badge.overdue { self.paint(&text, "31") } else { text }
                }
                None => String::new(),
            };
            let category = view.badges.category.clone().unwrap_or_default();

            rows.push(vec![id, done, priority, due, category, view.title_display.clone()]);
        }

        let mut out = Vec::new();
        write_table(&mut out, headers, rows)?;
        writeln!(out, "{} task(s)", views.len())?;
        Ok(String::from_utf8(out)?)
    }

    #[tracing::instrument(skip(self, task))]
    pub fn print_task_info(&self, task: &Task) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "id        {}", task.id)?;
        writeln!(out, "title     {}", task.title)?;
        if !task.description.is_empty() {
            writeln!(out, "desc      {}", task.description)?;
        }
        writeln!(out, "done      {}", if task.completed { "yes" } else { "no" })?;
        writeln!(out, "priority  {}", task.priority)?;
        writeln!(out, "category  {}", task.category.clone().unwrap_or_default())?;
        if let Some(due) = task.due_date {
            writeln!(out, "due       {}", due.format("%Y-%m-%dT%H:%M:%SZ"))?;
        }
        writeln!(out, "created   {}", task.created_at.format("%Y-%m-%dT%H:%M:%SZ"))?;

        Ok(())
    }

    pub fn print_field_errors(&self, errors: &FieldErrors) -> anyhow::Result<()> {
        let mut err = io::stderr().lock();
        for (field, message) in errors.iter() {
            writeln!(err, "{field}: {message}")?;
        }
        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

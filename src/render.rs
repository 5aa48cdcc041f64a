//! Plain-text screen builder shared by every page.

use std::fmt;

use crate::cache::Loadable;
use crate::error::{ClientError, ErrorNotice};
use crate::style::{paint, Tone};

pub const LOADING: &str = "Loading…";

#[derive(Debug, Clone, Default)]
pub struct Screen {
    lines: Vec<String>,
    color: bool,
}

impl Screen {
    pub fn new(color: bool) -> Self {
        Self {
            lines: Vec::new(),
            color,
        }
    }

    pub fn color(&self) -> bool {
        self.color
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        let rule = "═".repeat(text.chars().count() + 4);
        self.lines.push(rule.clone());
        self.lines.push(format!("  {}", text));
        self.lines.push(rule);
        self
    }

    pub fn heading(&mut self, text: &str) -> &mut Self {
        if !self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.lines.push(format!("── {} ──", text));
        self
    }

    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.lines.push(text.into());
        self
    }

    pub fn indented(&mut self, depth: usize, text: impl AsRef<str>) -> &mut Self {
        let pad = "  ".repeat(depth);
        for l in text.as_ref().lines() {
            self.lines.push(format!("{}{}", pad, l));
        }
        self
    }

    pub fn item(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.lines.push(format!("  • {}", text.as_ref()));
        self
    }

    pub fn kv(&mut self, key: &str, value: impl fmt::Display) -> &mut Self {
        self.lines.push(format!("  {:<16} {}", format!("{}:", key), value));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    /// Explicit placeholder for empty or not-yet-available data.
    pub fn placeholder(&mut self, text: &str) -> &mut Self {
        let text = paint(text, Tone::Gray, self.color);
        self.lines.push(format!("  {}", text));
        self
    }

    pub fn loading(&mut self) -> &mut Self {
        self.placeholder(LOADING)
    }

    pub fn error(&mut self, err: &ClientError) -> &mut Self {
        let notice = ErrorNotice::from(err);
        let text = paint(&format!("! {}", notice.message), Tone::Red, self.color);
        self.lines.push(format!("  {}", text));
        self.lines
            .push(format!("    {}", paint(&notice.recovery_suggestion, Tone::Gray, self.color)));
        self
    }

    /// Loading / failed / empty / populated rendering of a list query.
    pub fn list<T>(
        &mut self,
        items: &Loadable<Vec<T>>,
        empty: &str,
        mut row: impl FnMut(&mut Screen, &T),
    ) -> &mut Self {
        match items {
            Loadable::Idle => {}
            Loadable::Loading => {
                self.loading();
            }
            Loadable::Failed(e) => {
                self.error(e);
            }
            Loadable::Ready(items) if items.is_empty() => {
                self.placeholder(empty);
            }
            Loadable::Ready(items) => {
                for item in items {
                    row(self, item);
                }
            }
        }
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|l| l.contains(needle))
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

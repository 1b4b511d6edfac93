//! Line-based stand-in for native file dialogs.
//!
//! An empty answer accepts the suggested path, `-` cancels. With
//! `assume_yes` every prompt silently accepts its suggestion.

use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use {
    async_trait::async_trait,
    plugport_extensions::{
        Error, MessageKind, MessageOptions, OpenDialogOptions, PromptService, Result,
        SaveDialogOptions,
    },
};

const CANCEL: &str = "-";

#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Accept,
    Cancel,
    Value(String),
}

fn parse_answer(line: &str) -> Answer {
    match line.trim() {
        "" => Answer::Accept,
        CANCEL => Answer::Cancel,
        value => Answer::Value(value.to_string()),
    }
}

/// Resolve an answer against the suggestion. `None` means cancelled.
fn resolve(answer: Answer, suggestion: Option<PathBuf>, multiple: bool) -> Option<Vec<PathBuf>> {
    match answer {
        Answer::Cancel => None,
        Answer::Accept => suggestion.map(|path| vec![path]),
        Answer::Value(value) if multiple => {
            let paths: Vec<PathBuf> = value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .collect();
            (!paths.is_empty()).then_some(paths)
        },
        Answer::Value(value) => Some(vec![PathBuf::from(value)]),
    }
}

pub struct TerminalPrompt {
    assume_yes: bool,
}

impl TerminalPrompt {
    pub fn new(assume_yes: bool) -> Self {
        Self { assume_yes }
    }

    async fn ask(&self, title: String, suggestion: Option<PathBuf>) -> Result<Answer> {
        if self.assume_yes {
            return Ok(Answer::Accept);
        }
        tokio::task::spawn_blocking(move || read_answer(&title, suggestion.as_ref()))
            .await
            .map_err(|e| Error::external("prompt task failed", e))?
    }
}

fn read_answer(title: &str, suggestion: Option<&PathBuf>) -> Result<Answer> {
    let mut stdout = std::io::stdout();
    match suggestion {
        Some(path) => write!(stdout, "{title} [{}] ('{CANCEL}' to cancel): ", path.display())?,
        None => write!(stdout, "{title} ('{CANCEL}' to cancel): ")?,
    }
    stdout.flush()?;

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        // EOF behaves like cancel.
        return Ok(Answer::Cancel);
    }
    Ok(parse_answer(&line))
}

#[async_trait]
impl PromptService for TerminalPrompt {
    async fn show_open(&self, options: OpenDialogOptions) -> Result<Option<Vec<PathBuf>>> {
        let what = match (options.directories, options.files) {
            (true, false) => "directory",
            (false, true) => "file",
            _ => "path",
        };
        let title = match (options.title, options.multiple) {
            (Some(title), true) => format!("{title}: {what}s, comma-separated"),
            (Some(title), false) => format!("{title}: {what}"),
            (None, true) => format!("Choose {what}s, comma-separated"),
            (None, false) => format!("Choose a {what}"),
        };
        let answer = self.ask(title, options.default_path.clone()).await?;
        Ok(resolve(answer, options.default_path, options.multiple))
    }

    async fn show_save(&self, options: SaveDialogOptions) -> Result<Option<PathBuf>> {
        let title = options.title.unwrap_or_else(|| "Save as".to_string());
        let answer = self.ask(title, options.default_path.clone()).await?;
        Ok(resolve(answer, options.default_path, false).and_then(|paths| paths.into_iter().next()))
    }

    async fn show_message(&self, options: MessageOptions) -> Result<()> {
        let label = match options.kind {
            MessageKind::Info => "info",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
        };
        eprintln!("{label}: {}: {}", options.title, options.message);
        if let Some(detail) = options.detail {
            for line in detail.lines() {
                eprintln!("  {line}");
            }
        }
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers() {
        assert_eq!(parse_answer("\n"), Answer::Accept);
        assert_eq!(parse_answer(" - \n"), Answer::Cancel);
        assert_eq!(parse_answer("/tmp/x\n"), Answer::Value("/tmp/x".into()));
    }

    #[test]
    fn resolve_against_suggestion() {
        let suggestion = Some(PathBuf::from("/plugins/demo"));
        assert_eq!(
            resolve(Answer::Accept, suggestion.clone(), false),
            Some(vec![PathBuf::from("/plugins/demo")])
        );
        assert_eq!(resolve(Answer::Accept, None, false), None);
        assert_eq!(resolve(Answer::Cancel, suggestion, false), None);
        assert_eq!(
            resolve(Answer::Value("/a, /b,".into()), None, true),
            Some(vec![PathBuf::from("/a"), PathBuf::from("/b")])
        );
        assert_eq!(
            resolve(Answer::Value("/a, /b".into()), None, false),
            Some(vec![PathBuf::from("/a, /b")])
        );
    }

    #[tokio::test]
    async fn assume_yes_accepts_suggestions() {
        let prompt = TerminalPrompt::new(true);
        let saved = prompt
            .show_save(SaveDialogOptions {
                title: None,
                default_path: Some(PathBuf::from("/plugins/demo")),
            })
            .await
            .unwrap();
        assert_eq!(saved, Some(PathBuf::from("/plugins/demo")));

        let opened = prompt.show_open(OpenDialogOptions::default()).await.unwrap();
        assert_eq!(opened, None);
    }
}

use std::io::Write;

use inquire::{
    Password, PasswordDisplayMode, Text,
    ui::{Color, RenderConfig, StyleSheet, Styled},
};
use once_cell::sync::Lazy;

use super::error::AnkrError;

/// Reads one line of operator input. Swapped out by tests for scripted
/// answers.
pub(crate) type ReadLine = Box<dyn FnMut() -> std::io::Result<String>>;

pub(crate) fn stdin_read_line() -> ReadLine {
    Box::new(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        Ok(line)
    })
}

/// Succeeds only when the operator answers `y`, `ye` or `yes`.
pub(crate) fn ask_for_confirm(
    out: &mut dyn Write,
    read_line: &mut ReadLine,
    prompt: &str,
) -> Result<(), AnkrError> {
    write!(out, "Warning: Are you sure you want to {prompt} (y/N) ? ")?;
    out.flush()?;

    let answer = match read_line() {
        Ok(answer) => answer,
        Err(e) => {
            tracing::debug!("failed to read confirmation: {e}");
            return Err(AnkrError::ConfirmationDeclined);
        }
    };

    match answer
        .trim_end_matches(['\r', '\n'])
        .trim()
        .to_lowercase()
        .as_str()
    {
        "y" | "ye" | "yes" => Ok(()),
        _ => Err(AnkrError::ConfirmationDeclined),
    }
}

static PROMPT_CONFIG: Lazy<RenderConfig> = Lazy::new(|| {
    RenderConfig::default()
        .with_prompt_prefix(Styled::new(">").with_fg(Color::LightBlue))
        .with_answer(StyleSheet::default().with_fg(Color::Grey))
        .with_help_message(StyleSheet::default().with_fg(Color::Grey))
});

pub(crate) struct Prompt;

impl Prompt {
    pub(crate) fn string(msg: &str) -> Result<String, AnkrError> {
        let answer = Text::new(msg).with_render_config(*PROMPT_CONFIG).prompt()?;
        Ok(answer.trim().to_string())
    }

    pub(crate) fn password(msg: &str) -> Result<String, AnkrError> {
        let answer = Password::new(msg)
            .with_render_config(*PROMPT_CONFIG)
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .prompt()?;
        Ok(answer)
    }
}

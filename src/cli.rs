//! Terminal walkthrough of the onboarding flow.
//!
//! Prints the current step, reads one line per answer, and drives the
//! manager until the flow completes or the user quits. Lines that parse as
//! JSON are sent as JSON; anything else is sent as text.

use std::io::Write;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::onboarding::manager::{DEFAULT_RECOMMENDATIONS, OnboardingManager};
use crate::onboarding::session::{StepView, Transition};
use crate::onboarding::step::InputKind;
use crate::onboarding::SessionView;

/// One line of user input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Empty,
    Answer(Value),
    Back,
    Skip,
    Tips,
    Packs,
    Quit,
}

/// Interpret a line against the step being shown.
///
/// On choice steps a number picks the matching option (1-based) and, for
/// multi-choice, a comma-separated line becomes a list.
pub fn parse_command(line: &str, step: &StepView) -> Command {
    let line = line.trim();
    match line {
        "" => return Command::Empty,
        ":back" | ":b" => return Command::Back,
        ":skip" | ":s" => return Command::Skip,
        ":tips" | ":t" => return Command::Tips,
        ":packs" | ":p" => return Command::Packs,
        ":quit" | ":q" => return Command::Quit,
        _ => {}
    }

    let is_choice = matches!(
        step.input_kind,
        InputKind::SingleChoice | InputKind::PackSelector | InputKind::SportSelector
    );
    if let Some(option) = is_choice.then(|| pick_option(line, step)).flatten() {
        return Command::Answer(option);
    }

    if step.input_kind == InputKind::MultiChoice && !line.starts_with('[') {
        let picked: Vec<Value> = line
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| pick_option(s, step).unwrap_or_else(|| Value::String(s.to_string())))
            .collect();
        return Command::Answer(Value::Array(picked));
    }

    if step.input_kind == InputKind::Boolean {
        match line.to_ascii_lowercase().as_str() {
            "y" | "yes" => return Command::Answer(Value::Bool(true)),
            "n" | "no" => return Command::Answer(Value::Bool(false)),
            _ => {}
        }
    }

    let value = serde_json::from_str(line).unwrap_or_else(|_| Value::String(line.to_string()));
    Command::Answer(value)
}

fn pick_option(token: &str, step: &StepView) -> Option<Value> {
    let index: usize = token.parse().ok()?;
    step.options
        .get(index.checked_sub(1)?)
        .map(|option| option.value.clone())
}

fn render(out: &mut impl Write, view: &SessionView) -> std::io::Result<()> {
    let step = &view.current_step;
    writeln!(out)?;
    writeln!(
        out,
        "[{}%] {}",
        view.progress_percentage,
        if step.title.is_empty() { &step.id } else { &step.title }
    )?;
    writeln!(out, "{}", step.prompt)?;
    if let Some(subtitle) = &step.subtitle {
        writeln!(out, "  {subtitle}")?;
    }
    for (i, option) in step.options.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, option.label)?;
    }
    for tip in &view.tips {
        writeln!(out, "  tip: {tip}")?;
    }
    let mut hints = Vec::new();
    if view.can_go_back {
        hints.push(":back");
    }
    if step.skippable {
        hints.push(":skip");
    }
    hints.extend([":tips", ":packs", ":quit"]);
    writeln!(
        out,
        "  ({}; about {}s left)",
        hints.join(" "),
        view.estimated_time_left
    )
}

/// Run the walkthrough until completion, `:quit`, or end of input.
pub async fn run<R, W>(manager: &OnboardingManager, input: R, mut out: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut view = manager.view().await?;
    if view.phase.is_terminal() {
        writeln!(out, "Onboarding is already {}.", view.phase)?;
        return Ok(());
    }
    render(&mut out, &view)?;

    let mut lines = input.lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let result = match parse_command(&line, &view.current_step) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Packs => {
                for rec in manager.recommendations(DEFAULT_RECOMMENDATIONS).await {
                    writeln!(out, "  {} ({:.1})", rec.pack.name, rec.score)?;
                    for reason in &rec.reasons {
                        writeln!(out, "    - {reason}")?;
                    }
                }
                continue;
            }
            Command::Back => manager.back().await,
            Command::Skip => manager.skip().await,
            Command::Tips => manager.toggle_tips().await,
            Command::Answer(value) => match manager.set_response(value).await {
                Ok(_) => manager.next().await,
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(status) => {
                view = status.session;
                match status.transition {
                    Some(Transition::Rejected { errors }) => {
                        for error in errors {
                            writeln!(out, "  ! {error}")?;
                        }
                    }
                    Some(Transition::Completed { profile }) => {
                        let name = profile.first_name().unwrap_or("there");
                        writeln!(out, "\nAll set, {name}! Your profile has been saved.")?;
                        return Ok(());
                    }
                    _ => render(&mut out, &view)?,
                }
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => writeln!(out, "  ! {e}")?,
        }
    }

    writeln!(out, "\nProgress saved. Run again to pick up where you left off.")?;
    Ok(())
}

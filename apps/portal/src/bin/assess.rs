//! Terminal front-end for the career assessment.
//!
//! Walks a user through initial questions, resume upload, personalized
//! questions and results against the backend at `API_URL`.

use std::sync::Arc;

use anyhow::Result;
use colored::{ColoredString, Colorize};
use rustyline::{error::ReadlineError, DefaultEditor};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use portal::assessment::export::RESULTS_FILE_NAME;
use portal::assessment::flow::{AssessmentFlow, PrimaryAction};
use portal::assessment::store::{BannerKind, Step};
use portal::backend::models::{
    AnalysisOutcome, AnswerValue, Difficulty, Question, QuestionKind, QuestionOption,
};
use portal::backend::upload::{ResumeFile, MAX_RESUME_MB};
use portal::backend::{BackendConfig, HttpBackend};

enum Input {
    Line(String),
    Quit,
}

enum Reply {
    Answer(AnswerValue),
    /// Blank input on a question that already has an answer.
    Keep,
    Back,
    Quit,
}

struct Terminal {
    editor: DefaultEditor,
}

impl Terminal {
    fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }

    fn read(&mut self, prompt: &str) -> Result<Input> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                self.editor.add_history_entry(line.as_str())?;
                Ok(Input::Line(line.trim().to_string()))
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(Input::Quit),
            Err(e) => Err(e.into()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = BackendConfig::from_env();
    println!("{}", "Career Assessment".bold());
    println!("{}\n", format!("Backend: {}", config.base_url).dimmed());

    let backend = HttpBackend::new(config)?;
    let mut flow = AssessmentFlow::new(Arc::new(backend));
    let mut term = Terminal::new()?;

    loop {
        let keep_going = match flow.step() {
            Step::Initial => initial_step(&mut flow, &mut term).await?,
            Step::ResumeUpload => resume_step(&mut flow, &mut term).await?,
            Step::DynamicQuestions => dynamic_step(&mut flow, &mut term).await?,
            Step::Results => results_step(&mut flow, &mut term).await?,
        };
        if !keep_going {
            break;
        }
    }

    println!("Goodbye.");
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Steps. Each returns Ok(false) when the user quits.
// ────────────────────────────────────────────────────────────────────────────

async fn initial_step(flow: &mut AssessmentFlow, term: &mut Terminal) -> Result<bool> {
    if flow.initial_questions().is_empty() {
        if flow.load_initial_questions().await.is_err() {
            show_banner(flow);
            return retry_or_quit(term);
        }
        if flow.initial_questions().is_empty() {
            println!("{}", "No questions are available right now.".yellow());
            return Ok(false);
        }
    }

    let questions = flow.initial_questions().to_vec();
    let total = questions.len();
    for (index, question) in questions.iter().enumerate() {
        // Answers survive a failed submit; only ask for what is missing.
        if question.is_answered_by(&flow.store().initial_answers) {
            continue;
        }
        print_question(question, index, total);
        match ask(term, question, None, false)? {
            Reply::Answer(answer) => flow.answer_initial(question.id.clone(), answer)?,
            Reply::Quit => return Ok(false),
            Reply::Keep | Reply::Back => {}
        }
    }

    if flow.submit_initial().await.is_err() {
        show_banner(flow);
        return retry_or_quit(term);
    }
    println!("{}", "Initial assessment complete.".green());
    Ok(true)
}

async fn resume_step(flow: &mut AssessmentFlow, term: &mut Terminal) -> Result<bool> {
    println!("\n{}", "Resume Upload".bold());
    println!(
        "{}",
        format!("PDF, DOC or DOCX up to {MAX_RESUME_MB}MB. Leave blank to skip.").dimmed()
    );

    let Input::Line(path) = term.read("Resume path: ")? else {
        return Ok(false);
    };
    if path.is_empty() {
        flow.skip_resume()?;
        return Ok(true);
    }

    let file = match ResumeFile::from_path(&path).await {
        Ok(file) => file,
        Err(e) => {
            println!("{}", format!("Could not read {path}: {e}").red());
            return Ok(true);
        }
    };

    println!("Uploading & analyzing...");
    if flow.upload_resume(file).await.is_err() {
        show_banner(flow);
        return Ok(true);
    }

    println!("{}", "Resume processed.".green());
    if let Some(preview) = &flow.store().resume_preview {
        println!("{}", preview.dimmed());
    }
    Ok(true)
}

async fn dynamic_step(flow: &mut AssessmentFlow, term: &mut Terminal) -> Result<bool> {
    if !flow.store().dynamic_questions.is_generated() {
        println!("\nCreating questions tailored to your profile...");
        if flow.ensure_dynamic_questions().await.is_err() {
            show_banner(flow);
            return retry_or_quit(term);
        }
    }

    let Some(question) = flow.current_question().cloned() else {
        println!("{}", "No personalized questions were generated.".yellow());
        return start_new_or_quit(flow, term);
    };

    print_question(&question, flow.cursor(), flow.dynamic_questions().len());
    let existing = flow.current_answer().cloned();
    if let Some(answer) = &existing {
        println!("{}", format!("Current answer: {}", describe(answer)).dimmed());
    }
    if flow.can_go_back() {
        println!("{}", "Type :back for the previous question.".dimmed());
    }

    match ask(term, &question, existing.as_ref(), flow.can_go_back())? {
        Reply::Answer(answer) => flow.answer_current(answer)?,
        Reply::Keep => {}
        Reply::Back => {
            flow.previous();
            return Ok(true);
        }
        Reply::Quit => return Ok(false),
    }

    match flow.primary_action() {
        Some(PrimaryAction::Next) => {
            flow.next();
        }
        Some(PrimaryAction::Complete) => {
            println!("Analyzing your responses...");
            if flow.complete().await.is_err() {
                show_banner(flow);
                return retry_or_quit(term);
            }
        }
        None => {}
    }
    Ok(true)
}

async fn results_step(flow: &mut AssessmentFlow, term: &mut Terminal) -> Result<bool> {
    let Some(outcome) = flow.outcome().cloned() else {
        flow.start_new();
        return Ok(true);
    };
    print_outcome(&outcome);

    loop {
        let Input::Line(choice) = term.read("\n[s]ave results, [n]ew assessment, [q]uit: ")?
        else {
            return Ok(false);
        };
        match choice.as_str() {
            "s" | "save" => {
                let export = flow.export_results()?;
                match export.write_to(RESULTS_FILE_NAME).await {
                    Ok(()) => println!("{}", format!("Saved to {RESULTS_FILE_NAME}").green()),
                    Err(e) => println!("{}", format!("{e:#}").red()),
                }
            }
            "n" | "new" => {
                flow.start_new();
                return Ok(true);
            }
            "q" | "quit" => return Ok(false),
            _ => {}
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prompts
// ────────────────────────────────────────────────────────────────────────────

fn ask(
    term: &mut Terminal,
    question: &Question,
    existing: Option<&AnswerValue>,
    allow_back: bool,
) -> Result<Reply> {
    loop {
        let Input::Line(line) = term.read("> ")? else {
            return Ok(Reply::Quit);
        };
        if allow_back && line == ":back" {
            return Ok(Reply::Back);
        }
        if line.is_empty() && existing.is_some_and(|a| !a.is_empty()) {
            return Ok(Reply::Keep);
        }

        match parse_answer(question, &line) {
            Ok(answer) if question.required && answer.is_empty() => {
                println!("{}", "This question is required.".yellow());
            }
            Ok(answer) => return Ok(Reply::Answer(answer)),
            Err(message) => println!("{}", message.yellow()),
        }
    }
}

fn parse_answer(question: &Question, line: &str) -> Result<AnswerValue, String> {
    match question.kind {
        QuestionKind::FreeText => Ok(AnswerValue::text(line)),
        QuestionKind::SingleChoice if line.is_empty() => Ok(AnswerValue::text("")),
        QuestionKind::SingleChoice => Ok(AnswerValue::text(pick(question, line)?.value.clone())),
        QuestionKind::MultiChoice => {
            let values = line
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(|token| pick(question, token).map(|o| o.value.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AnswerValue::choices(values))
        }
    }
}

/// Resolves a 1-based option number.
fn pick<'q>(question: &'q Question, token: &str) -> Result<&'q QuestionOption, String> {
    token
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| question.options.get(i))
        .ok_or_else(|| format!("Choose a number between 1 and {}", question.options.len()))
}

fn retry_or_quit(term: &mut Terminal) -> Result<bool> {
    loop {
        let Input::Line(choice) = term.read("[r]etry or [q]uit: ")? else {
            return Ok(false);
        };
        match choice.as_str() {
            "" | "r" | "retry" => return Ok(true),
            "q" | "quit" => return Ok(false),
            _ => {}
        }
    }
}

fn start_new_or_quit(flow: &mut AssessmentFlow, term: &mut Terminal) -> Result<bool> {
    loop {
        let Input::Line(choice) = term.read("[n]ew assessment or [q]uit: ")? else {
            return Ok(false);
        };
        match choice.as_str() {
            "n" | "new" => {
                flow.start_new();
                return Ok(true);
            }
            "q" | "quit" => return Ok(false),
            _ => {}
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rendering
// ────────────────────────────────────────────────────────────────────────────

fn show_banner(flow: &mut AssessmentFlow) {
    if let Some(banner) = flow.error() {
        let line = match banner.kind {
            BannerKind::Validation => banner.message.yellow(),
            BannerKind::Failure => banner.message.red(),
        };
        println!("{line}");
    }
    flow.dismiss_error();
}

fn print_question(question: &Question, index: usize, total: usize) {
    let marker = if question.required { " *" } else { "" };
    println!(
        "\n{}{}",
        format!("Question {} of {}", index + 1, total).dimmed(),
        marker.red()
    );
    println!("{}", question.title.bold());

    match question.kind {
        QuestionKind::SingleChoice | QuestionKind::MultiChoice => {
            for (i, option) in question.options.iter().enumerate() {
                println!("  {}. {}", i + 1, option.label);
            }
            if question.kind == QuestionKind::MultiChoice {
                println!("{}", "Select one or more numbers, separated by commas.".dimmed());
            }
        }
        QuestionKind::FreeText => println!("{}", "Type your answer.".dimmed()),
    }
}

fn describe(answer: &AnswerValue) -> String {
    match answer {
        AnswerValue::Text(text) => text.clone(),
        AnswerValue::Choices(values) => values.iter().cloned().collect::<Vec<_>>().join(", "),
    }
}

fn difficulty_badge(level: &Difficulty) -> ColoredString {
    let label = format!("[{level}]");
    match level {
        Difficulty::Beginner => label.as_str().green(),
        Difficulty::Intermediate => label.as_str().yellow(),
        Difficulty::Advanced => label.as_str().red(),
        Difficulty::Other(_) => label.as_str().normal(),
        Difficulty::Unrated => "".normal(),
    }
}

fn print_outcome(outcome: &AnalysisOutcome) {
    let analysis = &outcome.analysis;

    println!("\n{}", "Your Profile".bold());
    if let Some(level) = &analysis.skill_level {
        println!("  Skill level: {}", level.cyan());
    }
    if !analysis.primary_interests.is_empty() {
        println!("  Interests: {}", analysis.primary_interests.join(", "));
    }
    if let Some(path) = &analysis.recommended_path {
        println!("  Recommended path: {path}");
    }
    if !analysis.next_steps.is_empty() {
        println!("  Next steps:");
        for step in &analysis.next_steps {
            println!("    - {step}");
        }
    }

    println!(
        "\n{} ({})",
        "Recommended GitHub Projects".bold(),
        outcome.projects.len()
    );
    if outcome.projects.is_empty() {
        println!("  No project recommendations yet.");
    }
    for project in &outcome.projects {
        println!(
            "\n  {} {}",
            project.name.bold(),
            difficulty_badge(&project.difficulty_level)
        );
        if let Some(description) = &project.description {
            println!("    {description}");
        }
        println!(
            "    stars {}  forks {}  {}  match {}%",
            project.star_count,
            project.fork_count,
            project.language.as_deref().unwrap_or("-"),
            project.match_score
        );
        if !project.topics.is_empty() {
            println!("    {}", project.topics.join(" · ").dimmed());
        }
        println!("    {}", project.url.underline());
    }
}

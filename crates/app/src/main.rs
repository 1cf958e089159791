use std::fmt;

use lms_core::model::{QuizDuration, StudentColor, UserId};
use services::{AppServices, Clock};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    MissingFlag { flag: &'static str },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::MissingFlag { flag } => write!(f, "{flag} is required"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- seed     [--db <sqlite_url>] [--media <dir>]");
    eprintln!(
        "  cargo run -p app -- progress --student <slug> --subject <slug> [--db <sqlite_url>]"
    );
    eprintln!(
        "  cargo run -p app -- results  --student <slug> --subject <slug> --topic <slug> \
         --chapter <slug> --quiz <slug> [--db <sqlite_url>]"
    );
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://dev.sqlite3");
    eprintln!("  --media media");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LMS_DB_URL, LMS_MEDIA_ROOT");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Seed,
    Progress,
    Results,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "seed" => Some(Self::Seed),
            "progress" => Some(Self::Progress),
            "results" => Some(Self::Results),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    media_root: String,
    student: Option<String>,
    subject: Option<String>,
    topic: Option<String>,
    chapter: Option<String>,
    quiz: Option<String>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            db_url: std::env::var("LMS_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://dev.sqlite3".into(), normalize_sqlite_url),
            media_root: std::env::var("LMS_MEDIA_ROOT").unwrap_or_else(|_| "media".into()),
            student: None,
            subject: None,
            topic: None,
            chapter: None,
            quiz: None,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--media" => parsed.media_root = require_value(args, "--media")?,
                "--student" => parsed.student = Some(require_value(args, "--student")?),
                "--subject" => parsed.subject = Some(require_value(args, "--subject")?),
                "--topic" => parsed.topic = Some(require_value(args, "--topic")?),
                "--chapter" => parsed.chapter = Some(require_value(args, "--chapter")?),
                "--quiz" => parsed.quiz = Some(require_value(args, "--quiz")?),
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn require_flag(flag: &'static str, value: &Option<String>) -> Result<String, ArgsError> {
    value.clone().ok_or(ArgsError::MissingFlag { flag })
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Loads a small demo catalog so the read-only commands have data to show.
async fn seed(app: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = app.catalog();

    let grade = catalog.create_grade("Grade 7", None).await?;
    let student = catalog
        .create_student(
            UserId::new(1),
            grade.id(),
            "Amina",
            "Khalil",
            None,
            StudentColor::Blue,
        )
        .await?;
    catalog.create_teacher(UserId::new(100), grade.id()).await?;
    let subject = catalog
        .create_subject(
            grade.id(),
            "Mathematics",
            None,
            Some("numbers, shapes, and patterns".into()),
            "subjects/mathematics.png",
        )
        .await?;
    let topic = catalog
        .create_topic(
            subject.id(),
            "Number Theory",
            None,
            Some("divisibility and primes".into()),
            "topics/number-theory.png",
            None,
        )
        .await?;

    let primes = catalog
        .create_chapter(
            topic.id(),
            "Prime Numbers",
            1,
            None,
            Some("what makes a prime".into()),
            "chapters/prime-numbers.png",
            Some("recap divisibility first".into()),
            "A prime number has exactly two divisors: one and itself.",
        )
        .await?;
    catalog
        .create_chapter(
            topic.id(),
            "Composite Numbers",
            2,
            None,
            None,
            "chapters/composite-numbers.png",
            None,
            "Every integer greater than one is prime or composite.",
        )
        .await?;

    let quiz = catalog
        .create_quiz(primes.id(), "Primes Checkpoint", None, true, QuizDuration::Min5)
        .await?;
    let q1 = catalog.add_question(quiz.id(), "Is 7 a prime number?").await?;
    catalog.add_choice(q1.id(), "Yes", true, None, 1).await?;
    catalog
        .add_choice(q1.id(), "No", false, Some("7 has no divisor but 1 and 7".into()), 1)
        .await?;
    let q2 = catalog.add_question(quiz.id(), "Is 9 a prime number?").await?;
    catalog
        .add_choice(q2.id(), "Yes", false, Some("9 = 3 × 3".into()), 1)
        .await?;
    catalog.add_choice(q2.id(), "No", true, None, 1).await?;

    app.quotes()
        .add_quote(
            "The only way to learn mathematics is to do mathematics.",
            Some("Paul Halmos".into()),
        )
        .await?;

    println!(
        "seeded: student '{}' in '{}', subject '{}', {} chapters, quiz '{}'",
        student.slug(),
        grade.name(),
        subject.slug(),
        2,
        quiz.slug(),
    );
    Ok(())
}

async fn progress(
    app: &AppServices,
    student_slug: &str,
    subject_slug: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let dashboard = app
        .catalog()
        .subject_dashboard(student_slug, subject_slug)
        .await?;

    println!(
        "{} - {}: {}% complete ({}/{} topics done)",
        dashboard.student.first_name(),
        dashboard.subject.name(),
        dashboard.progress.percent,
        dashboard.progress.fully_completed_topics,
        dashboard.progress.total_topics,
    );
    for topic in &dashboard.progress.topics {
        println!(
            "  {}: {}/{} chapters ({}%)",
            topic.topic.name(),
            topic.completed_chapters,
            topic.total_chapters,
            topic.percent,
        );
    }

    if let Some(quote) = app.quotes().random_quote().await? {
        match &quote.author {
            Some(author) => println!("\n\"{}\" - {}", quote.quote, author),
            None => println!("\n\"{}\"", quote.quote),
        }
    }
    Ok(())
}

async fn results(
    app: &AppServices,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    let path = app
        .catalog()
        .resolve_quiz(
            &require_flag("--student", &args.student)?,
            &require_flag("--subject", &args.subject)?,
            &require_flag("--topic", &args.topic)?,
            &require_flag("--chapter", &args.chapter)?,
            &require_flag("--quiz", &args.quiz)?,
        )
        .await?;

    let results = app
        .quizzes()
        .results(path.student.id(), path.quiz.id())
        .await?;

    println!(
        "{} - {} ({} questions)",
        path.student.first_name(),
        results.quiz.title(),
        results.total_questions,
    );
    println!(
        "correct {}, incorrect {}, unanswered {} -> {}% [{}]",
        results.number_correct,
        results.number_incorrect,
        results.number_unanswered,
        results.percentage,
        results.color,
    );
    for answered in &results.answered {
        let verdict = if answered.is_correct() { "✓" } else { "✗" };
        println!("  {verdict} {} - {}", answered.question.text(), answered.selected.text());
    }
    for unanswered in &results.unanswered {
        println!("  - {} (unanswered)", unanswered.question.text());
        for choice in &unanswered.choices {
            let marker = if choice.is_correct() { "*" } else { " " };
            println!("      {marker} {}", choice.text());
        }
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    argv.remove(0);

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup so core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;
    let app = AppServices::new_sqlite(&args.db_url, Clock::default_clock(), &args.media_root).await?;

    match cmd {
        Command::Seed => seed(&app).await,
        Command::Progress => {
            let student = require_flag("--student", &args.student)?;
            let subject = require_flag("--subject", &args.subject)?;
            progress(&app, &student, &subject).await
        }
        Command::Results => results(&app, &args).await,
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}

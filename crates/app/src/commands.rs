use std::path::Path;

use anyhow::{Context, bail};
use tracing::info;

use exam_core::model::{AssemblyWarning, Domain, ExamKind};
use exam_core::{Clock, ExamAssembler, ExamSession};
use services::AppServices;

use crate::interactive;
use crate::render;
use crate::settings::{Settings, prepare_sqlite_file};

async fn open_services(settings: &Settings) -> anyhow::Result<AppServices> {
    prepare_sqlite_file(&settings.db_url)?;
    let services = AppServices::new_sqlite(
        &settings.db_url,
        Clock::default_clock(),
        settings.bank.clone(),
        settings.config.clone(),
    )
    .await
    .with_context(|| format!("opening {}", settings.db_url))?;
    Ok(services)
}

fn announce_user(settings: &Settings) {
    if settings.user_generated {
        println!(
            "No --user given; using {} for this run.",
            settings.user_id
        );
    }
}

fn print_warnings(session: &ExamSession) {
    for warning in session.exam().warnings() {
        match warning {
            AssemblyWarning::InsufficientQuestions {
                domain,
                available,
                requested,
            } => println!(
                "warning: {} has only {available} questions for {requested} slots; some repeat",
                domain.label()
            ),
        }
    }
}

pub async fn exam(mut settings: Settings, review: bool) -> anyhow::Result<()> {
    let services = open_services(&settings).await?;
    let exams = services.exams();
    announce_user(&settings);

    exams.discard_saved(&settings.user_id).await?;
    let session = exams.start_exam(&mut settings.rng)?;
    print_warnings(&session);
    println!(
        "{} questions, {} minutes.",
        session.exam().len(),
        settings.config.time_minutes
    );

    interactive::drive(exams, settings.user_id, ExamKind::FullExam, session, review).await
}

pub async fn practice(
    mut settings: Settings,
    domain: &str,
    count: u32,
    review: bool,
) -> anyhow::Result<()> {
    let domain: Domain = domain.parse()?;
    if count == 0 {
        bail!("--count must be at least 1");
    }
    let services = open_services(&settings).await?;
    let exams = services.exams();
    announce_user(&settings);

    let session = exams.start_practice(domain, count, &mut settings.rng)?;
    print_warnings(&session);
    println!("{} practice: {} questions.", domain.label(), session.exam().len());

    interactive::drive(
        exams,
        settings.user_id,
        ExamKind::DomainPractice(domain),
        session,
        review,
    )
    .await
}

pub async fn resume(settings: Settings, review: bool) -> anyhow::Result<()> {
    let services = open_services(&settings).await?;
    let exams = services.exams();

    let Some(session) = exams.resume(&settings.user_id).await? else {
        println!("No saved exam for {}.", settings.user_id);
        return Ok(());
    };
    println!(
        "Resuming at question {} of {}.",
        session.current_index() + 1,
        session.exam().len()
    );
    interactive::drive(exams, settings.user_id, ExamKind::FullExam, session, review).await
}

pub async fn trends(settings: Settings) -> anyhow::Result<()> {
    let services = open_services(&settings).await?;
    let trends = services.trends();
    let items = trends.recent(&settings.user_id).await?;
    let summary = trends.summary(&settings.user_id).await?;
    render::print_trends(&items, &summary);
    Ok(())
}

/// Report per-domain counts against the configured targets and try a dry-run
/// assembly with the same settings.
pub fn bank_validate(settings: &Settings) -> anyhow::Result<()> {
    let bank = &settings.bank;
    let config = &settings.config;
    println!("{} questions", bank.len());

    for domain in Domain::ALL {
        let available = bank.count(domain);
        let target = config.domain_weights.target(domain);
        let note = if available == 0 && target > 0 {
            "  MISSING"
        } else if available < target as usize {
            "  short (duplicates will be drawn)"
        } else {
            ""
        };
        println!("  {:<18} {available:>4} / {target:>3}{note}", domain.key());
    }

    let mut rng = settings.rng.clone();
    let exam = ExamAssembler::new(bank)
        .assemble_with_config(config, &mut rng)
        .context("dry-run assembly failed")?;
    info!(questions = exam.len(), degraded = exam.is_degraded(), "dry-run assembly");
    println!("ok: assembles {} questions", exam.len());
    Ok(())
}

pub fn bank_export(settings: &Settings, out: &Path) -> anyhow::Result<()> {
    let json = settings.bank.to_json()?;
    std::fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
    println!("wrote {} questions to {}", settings.bank.len(), out.display());
    Ok(())
}

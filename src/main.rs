use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

mod cli;
mod config;

use cli::Cli;
use cli::commands::{Commands, FilterArgs, PoolArgs};
use config::Config;
use fairdraw::domain::{DrawFilter, DrawScope, PoolKey, PoolKind};
use fairdraw::draw::{Assignee, DisplayTemplate, DrawController, DrawOutcome, DrawRequest, DrawResult};
use fairdraw::history::filter_by_subject;
use fairdraw::weight::format_weight_column;

fn setup_logging(level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fairdraw")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("fairdraw.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.unwrap_or("info")))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn scope_for(pool: PoolKey, filter: &FilterArgs, config: &Config) -> DrawScope {
    let sentinels = &config.draw.sentinels;
    DrawScope::new(
        pool,
        DrawFilter::from_selection(filter.group.as_deref(), &sentinels.all_groups),
        DrawFilter::from_selection(filter.gender.as_deref(), &sentinels.all_genders),
    )
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    let store = config.open_store()?;
    let controller = DrawController::new(store, config.weight_settings());

    match &cli.command {
        Commands::Weights {
            pool,
            roster,
            subject,
            detailed,
        } => handle_weights_command(&controller, pool, roster, subject.as_deref(), *detailed),
        Commands::Draw {
            pool,
            roster,
            count,
            filter,
            repeat,
            subject,
            confirm,
        } => {
            let scope = scope_for(pool.key(), filter, config);
            let mut request = DrawRequest::new(scope, *count, config.repeat_mode(*repeat));
            request.subject = subject.clone();
            handle_draw_command(&controller, &request, roster, *confirm)
        }
        Commands::Lottery {
            pool,
            prizes,
            count,
            class,
            students,
            by_group,
            filter,
            repeat,
            template,
            confirm,
        } => {
            let mode = config.repeat_mode(*repeat);
            let prize_request = DrawRequest::new(DrawScope::whole_pool(PoolKey::lottery(pool.clone())), *count, mode);
            let student_side = match (class, students) {
                (Some(class), Some(path)) => Some((
                    DrawRequest::new(scope_for(PoolKey::roll_call(class.clone()), filter, config), *count, mode),
                    path.as_path(),
                )),
                _ => None,
            };
            let template = template
                .map(DisplayTemplate::from_index)
                .unwrap_or_else(|| config.display_template());
            let assign_to = if *by_group { Assignee::Group } else { Assignee::Student };
            handle_lottery_command(&controller, &prize_request, prizes, student_side, assign_to, template, *confirm)
        }
        Commands::Preview { roster, count, filter } => {
            let scope = scope_for(PoolKey::roll_call("preview"), filter, config);
            handle_preview_command(&controller, &scope, roster, *count)
        }
        Commands::Reset {
            pool,
            filter,
            all_history,
        } => handle_reset_command(&controller, scope_for(pool.key(), filter, config), *all_history),
        Commands::History { pool, subject } => handle_history_command(&controller, pool, subject.as_deref()),
    }
}

fn handle_weights_command(
    controller: &DrawController,
    pool: &PoolArgs,
    roster: &Path,
    subject: Option<&str>,
    detailed: bool,
) -> Result<()> {
    let candidates = cli::load_roster(roster)?;
    let weighted = controller.weights(&pool.key(), &candidates, subject);
    info!("Computed {} weights for {}", weighted.len(), pool.key());

    if weighted.is_empty() {
        println!("{}", "No candidates".yellow());
        return Ok(());
    }

    let column = format_weight_column(&weighted.iter().map(|w| w.weight).collect::<Vec<_>>());
    println!("{} {}", "Weights for".green(), pool.key());
    for (w, shown) in weighted.iter().zip(column) {
        let marker = if w.breakdown.is_shielded {
            " (shielded)".red().to_string()
        } else {
            String::new()
        };
        println!("  {}  {}{}", shown.cyan(), w.candidate.name, marker);
        if detailed {
            let b = &w.breakdown;
            println!(
                "      base {:.2}  freq {:.2}  group {:.2}  gender {:.2}  time {:.2}  picks {}/{}{}",
                b.base_weight,
                b.frequency_penalty,
                b.group_balance,
                b.gender_balance,
                b.time_factor,
                b.total_count,
                b.max_total_count,
                if b.is_cold_start { "  cold start" } else { "" }
            );
            if b.is_shielded {
                println!("      shield {:.0}s remaining", b.shield_remaining_seconds);
            }
        }
    }
    Ok(())
}

fn print_result(result: &DrawResult) {
    let weights = format_weight_column(&result.weights_used());
    for (w, shown) in result.selected.iter().zip(weights) {
        println!("  {}  {}", shown.cyan(), w.candidate.name.bold());
    }
}

fn print_reset_required(scope: &DrawScope) {
    println!("{} {}", "Reset required:".red(), scope);
    println!(
        "  Every eligible candidate has been drawn. Run `fairdraw reset -k {} -p {:?}` to start a new cycle.",
        match scope.pool.kind {
            PoolKind::RollCall => "roll-call",
            PoolKind::Lottery => "lottery",
            PoolKind::GroupDraw => "group-draw",
        },
        scope.pool.name
    );
}

fn handle_draw_command(controller: &DrawController, request: &DrawRequest, roster: &Path, confirm: bool) -> Result<()> {
    let candidates = cli::load_roster(roster)?;
    info!("Drawing {} from {} ({})", request.count, request.scope, request.mode);

    match controller.draw(request, &candidates, &mut rand::rng())? {
        DrawOutcome::Selected(result) => {
            println!("{} {}", "Selected from".green(), result.scope);
            print_result(&result);
            if confirm {
                let record = controller.confirm(&result).context("Failed to record draw")?;
                println!("{} round {}", "Recorded".green(), record.total_rounds);
            }
        }
        DrawOutcome::ResetRequired(scope) => print_reset_required(&scope),
    }
    Ok(())
}

fn handle_lottery_command(
    controller: &DrawController,
    prize_request: &DrawRequest,
    prizes: &Path,
    students: Option<(DrawRequest, &Path)>,
    assign_to: Assignee,
    template: DisplayTemplate,
    confirm: bool,
) -> Result<()> {
    let prize_pool = cli::load_roster(prizes)?;
    let student_side = match students {
        Some((request, path)) => Some((request, cli::load_roster(path)?)),
        None => None,
    };

    let outcome = controller.draw_paired(
        (prize_request, prize_pool.as_slice()),
        student_side.as_ref().map(|(request, roster)| (request, roster.as_slice())),
        assign_to,
        template,
        &mut rand::rng(),
    )?;

    match outcome {
        DrawOutcome::Selected(paired) => {
            println!("{} {}", "Prizes from".green(), paired.prizes.scope.pool);
            for assignment in &paired.assignments {
                println!("  {}", assignment.display.replace('\n', "\n  ").bold());
            }
            if confirm {
                controller.confirm_paired(&paired).context("Failed to record lottery")?;
                println!("{}", "Recorded".green());
            }
        }
        DrawOutcome::ResetRequired(scope) => print_reset_required(&scope),
    }
    Ok(())
}

fn handle_preview_command(controller: &DrawController, scope: &DrawScope, roster: &Path, count: usize) -> Result<()> {
    let candidates = cli::load_roster(roster)?;
    let frame = controller.preview(scope, &candidates, count, &mut rand::rng())?;
    let names: Vec<&str> = frame.iter().map(|c| c.name.as_str()).collect();
    println!("{}", names.join("  ").dimmed());
    Ok(())
}

fn handle_reset_command(controller: &DrawController, scope: DrawScope, all_history: bool) -> Result<()> {
    if all_history {
        controller.reset_history(&scope.pool).context("Failed to reset history")?;
        println!("{} all history of {}", "Cleared".yellow(), scope.pool);
    } else if controller.reset_exclusions(&scope).context("Failed to reset exclusions")? {
        println!("{} exclusion cycle of {}", "Cleared".yellow(), scope);
    } else {
        println!("{} {}", "Nothing to clear for".dimmed(), scope);
    }
    Ok(())
}

fn handle_history_command(controller: &DrawController, pool: &PoolArgs, subject: Option<&str>) -> Result<()> {
    let key = pool.key();
    let mut record = controller.store().try_load(&key).context("Failed to load history")?;
    if let Some(subject) = subject {
        record = filter_by_subject(&record, subject);
    }

    println!(
        "{} {}: {} rounds, {} selections",
        "History of".green(),
        key,
        record.total_rounds,
        record.total_selections
    );
    for (name, entity) in &record.entities {
        let last = entity
            .last_drawn_time
            .as_ref()
            .map(fairdraw::clock::format_timestamp)
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {:<16} picked {:>3}  missed {:>3}  last {}",
            name, entity.total_count, entity.rounds_missed, last
        );
    }
    for (group, count) in &record.group_stats {
        println!("  {} {}: {}", "group".dimmed(), group, count);
    }
    for (gender, count) in &record.gender_stats {
        println!("  {} {}: {}", "gender".dimmed(), gender, count);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_level.as_deref()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}

use std::process::ExitCode;

use adm_backup_lib::cli::{Action, BackupArgs, Cli, InitDbArgs};
use adm_backup_lib::config::BackupConfig;
use adm_backup_lib::orchestrator::{self, RunConfig};
use adm_backup_lib::project::Project;
use adm_backup_lib::sync::Rclone;
use adm_backup_lib::{schema, staging};

use clap::Parser;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // init logger
    let mut env_logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = cli.verbose {
        env_logger.filter_level(level);
    }
    env_logger.try_init().expect("env_logger should not fail");

    let config = match &cli.config {
        Some(path) => match BackupConfig::load_or_init(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => BackupConfig::default(),
    };
    let project = Project::with_database(cli.root.clone(), &config.database);

    match cli.action() {
        Action::Backup => backup(&project, &config, cli.backup),
        Action::InitDb(args) => init_db(&project, args),
    }
}

fn backup(project: &Project, config: &BackupConfig, args: BackupArgs) -> ExitCode {
    let retention_days = if args.no_prune {
        None
    } else if let Some(days) = args.retention_days {
        Some(days)
    } else {
        config.retention.max_age_days()
    };
    let run_config = RunConfig {
        destination: args.destination.or_else(|| config.destination.clone()),
        retention_days,
        dry_run: args.dry_run,
    };
    let remote = Rclone::with_program(config.sync.program.clone());

    let run = match orchestrator::run(project, &run_config, &remote, &staging::now()) {
        Ok(run) => run,
        Err(e) => {
            log::error!(target: "orchestrator", "{e}");
            return ExitCode::FAILURE;
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&run.report()) {
            Ok(report) => println!("{report}"),
            Err(e) => log::error!("Serializing the run report failed: {e}"),
        }
    }

    if run.outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_db(project: &Project, args: InitDbArgs) -> ExitCode {
    let database = args
        .database
        .unwrap_or_else(|| project.database().to_path_buf());
    let schema = args.schema.unwrap_or_else(|| project.schema());

    match schema::initialize(&database, &schema) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!(target: "schema", "{e}");
            ExitCode::FAILURE
        }
    }
}

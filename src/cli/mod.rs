use std::num::NonZeroU32;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Verbosity of the command output. Defaults to `RUST_LOG` or `info`.
    #[arg(long, global = true)]
    pub verbose: Option<LevelFilter>,

    /// Root directory of the ad manager installation.
    #[arg(long, short = 'r', global = true, default_value = ".")]
    pub root: PathBuf,

    /// Configuration file. The default configuration is written to it if it doesn't exist.
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Backup options, accepted before and after the `backup` subcommand.
    #[command(flatten)]
    pub backup: BackupArgs,

    #[command(subcommand)]
    pub action: Option<Action>,
}

impl Cli {
    /// The requested action, [Action::Backup] if none was given.
    pub fn action(&self) -> Action {
        self.action.clone().unwrap_or_default()
    }
}

#[derive(Subcommand, Debug, Clone, Default)]
pub enum Action {
    /// Backup the database and brand configs. (Default)
    #[default]
    Backup,
    /// Initialize the database from the schema file.
    InitDb(InitDbArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct BackupArgs {
    /// Remote destination understood by rclone, e.g. `gdrive:ad-manager-backups`.
    ///
    /// Without a destination only a local snapshot is kept.
    #[arg(long = "dest", short = 'd', global = true, env = "BACKUP_RCLONE_DEST")]
    pub destination: Option<String>,

    /// Delete remote backups older than this many days. Must be at least 1.
    #[arg(long, global = true)]
    pub retention_days: Option<NonZeroU32>,

    /// Don't delete old remote backups.
    #[arg(long, global = true)]
    pub no_prune: bool,

    /// Simulative backup run.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Print a JSON report of the run to stdout.
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct InitDbArgs {
    /// Schema file. Defaults to `data/schema.sql` below the root.
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Database file. Defaults to the configured database.
    #[arg(long)]
    pub database: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_is_default_action() {
        let cli =
            Cli::try_parse_from(["adm-backup", "--root", "/srv/app", "--dest", "s3:b"]).unwrap();

        assert_eq!(cli.root, PathBuf::from("/srv/app"));
        assert!(matches!(cli.action(), Action::Backup));
        assert_eq!(cli.backup.destination.as_deref(), Some("s3:b"));
    }

    #[test]
    fn test_backup_args() {
        let cli = Cli::try_parse_from([
            "adm-backup",
            "backup",
            "--dest",
            "gdrive:backups",
            "--retention-days",
            "7",
            "--no-prune",
            "--dry-run",
        ])
        .unwrap();

        assert!(matches!(cli.action(), Action::Backup));
        assert_eq!(cli.backup.destination.as_deref(), Some("gdrive:backups"));
        assert_eq!(cli.backup.retention_days, NonZeroU32::new(7));
        assert!(cli.backup.no_prune);
        assert!(cli.backup.dry_run);
    }

    #[test]
    fn test_backup_args_before_subcommand() {
        let cli = Cli::try_parse_from([
            "adm-backup",
            "--dest",
            "s3:b",
            "--json",
            "backup",
            "--retention-days",
            "14",
        ])
        .unwrap();

        assert!(matches!(cli.action(), Action::Backup));
        assert_eq!(cli.backup.destination.as_deref(), Some("s3:b"));
        assert_eq!(cli.backup.retention_days, NonZeroU32::new(14));
        assert!(cli.backup.json);
    }

    #[test]
    fn test_zero_retention_is_rejected() {
        for args in [
            ["adm-backup", "backup", "--retention-days", "0"],
            ["adm-backup", "--retention-days", "0", "backup"],
        ] {
            assert!(Cli::try_parse_from(args).is_err(), "{args:?} should be rejected");
        }
    }

    #[test]
    fn test_init_db_args() {
        let cli =
            Cli::try_parse_from(["adm-backup", "init-db", "--schema", "/tmp/schema.sql"]).unwrap();

        let Action::InitDb(args) = cli.action() else {
            panic!("expected init-db action");
        };
        assert_eq!(args.schema, Some(PathBuf::from("/tmp/schema.sql")));
        assert_eq!(args.database, None);
    }
}

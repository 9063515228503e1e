use super::*;
use crate::collect::{BoundaryArg, FlowArg, TruncationArg};

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["postspy", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli = Cli::try_parse_from(["postspy", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["postspy"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn collect_defaults() {
    let cli = Cli::try_parse_from(["postspy", "collect", "@alpha,@beta"]).unwrap();
    let Some(Commands::Collect(args)) = cli.command else {
        panic!("expected collect");
    };
    assert_eq!(args.channels, "@alpha,@beta");
    assert_eq!(args.limit, 0);
    assert_eq!(args.flow, FlowArg::AdHoc);
    assert_eq!(args.truncation, TruncationArg::Global);
    assert!(args.boundary.is_none());
    assert!(args.snapshot.is_none());
    assert!(!args.no_store);
    assert!(!args.dry_run);
}

#[test]
fn collect_report_with_month_and_overrides() {
    let cli = Cli::try_parse_from([
        "postspy",
        "collect",
        "@alpha",
        "--flow",
        "report",
        "--month",
        "2025-01",
        "--boundary",
        "skip",
        "--truncation",
        "per-channel",
        "--limit",
        "50",
        "--no-store",
    ])
    .unwrap();
    let Some(Commands::Collect(args)) = cli.command else {
        panic!("expected collect");
    };
    assert_eq!(args.flow, FlowArg::Report);
    assert_eq!(args.month, Some((2025, 1)));
    assert_eq!(args.boundary, Some(BoundaryArg::Skip));
    assert_eq!(args.truncation, TruncationArg::PerChannel);
    assert_eq!(args.limit, 50);
    assert!(args.no_store);
}

#[test]
fn collect_rejects_two_periods() {
    let result = Cli::try_parse_from([
        "postspy",
        "collect",
        "@alpha",
        "--last-week",
        "--days",
        "3",
    ]);
    assert!(result.is_err());
}

#[test]
fn collect_rejects_bad_month() {
    assert!(Cli::try_parse_from(["postspy", "collect", "@alpha", "--month", "2025-13"]).is_err());
    assert!(Cli::try_parse_from(["postspy", "collect", "@alpha", "--month", "january"]).is_err());
}

#[test]
fn collect_requires_channels() {
    assert!(Cli::try_parse_from(["postspy", "collect"]).is_err());
}

#[test]
fn parses_probe_with_snapshot() {
    let cli =
        Cli::try_parse_from(["postspy", "probe", "@alpha", "--snapshot", "feed.json"]).unwrap();
    match cli.command {
        Some(Commands::Probe { channel, snapshot }) => {
            assert_eq!(channel, "@alpha");
            assert_eq!(snapshot, Some(PathBuf::from("feed.json")));
        }
        other => panic!("expected probe, got {other:?}"),
    }
}

#[test]
fn parses_report_json() {
    let cli = Cli::try_parse_from(["postspy", "report", "--channels", "@a,@b", "--json"]).unwrap();
    match cli.command {
        Some(Commands::Report { channels, json }) => {
            assert_eq!(channels.as_deref(), Some("@a,@b"));
            assert!(json);
        }
        other => panic!("expected report, got {other:?}"),
    }
}

#[test]
fn export_defaults_to_posts_csv() {
    let cli = Cli::try_parse_from(["postspy", "export"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Export { ref out }) if out == &PathBuf::from("posts.csv")
    ));
}

#[test]
fn runs_defaults() {
    let cli = Cli::try_parse_from(["postspy", "runs"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Runs {
            limit: 10,
            details: false
        })
    ));
}

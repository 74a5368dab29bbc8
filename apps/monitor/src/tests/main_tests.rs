use super::*;

use clap::CommandFactory;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn watch_defaults_to_unfiltered_tabs() {
    let cli = Cli::try_parse_from(["monitor", "watch"]).expect("parse");
    assert_eq!(cli.config, PathBuf::from("config.json"));

    let Command::Watch(args) = cli.command else {
        panic!("expected watch");
    };
    assert_eq!(args.result_prefix, "");
    assert_eq!(args.result_filter, ResultFilter::All);
    assert_eq!(args.job, ALL_JOBS);
    assert_eq!(args.log_level, None);
    assert_eq!(args.rows, 0);
}

#[test]
fn watch_accepts_initial_filters() {
    let cli = Cli::try_parse_from([
        "monitor",
        "--config",
        "/etc/ketl/monitor.json",
        "watch",
        "--result-prefix",
        "etl_",
        "--result-filter",
        "failed",
        "--job",
        "etl_orders",
        "--log-level",
        "warning",
    ])
    .expect("parse");

    assert_eq!(cli.config, PathBuf::from("/etc/ketl/monitor.json"));
    let Command::Watch(args) = cli.command else {
        panic!("expected watch");
    };
    assert_eq!(args.result_filter, ResultFilter::Failed);
    assert_eq!(args.job, "etl_orders");
    assert_eq!(args.log_level, Some(LogLevel::Warning));
}

#[test]
fn unknown_filter_values_are_rejected() {
    assert!(Cli::try_parse_from(["monitor", "watch", "--result-filter", "broken"]).is_err());
    assert!(Cli::try_parse_from(["monitor", "watch", "--log-level", "any"]).is_err());
}

#[test]
fn query_log_parses_limit() {
    let cli = Cli::try_parse_from(["monitor", "query", "log", "--prefix", "etl", "--limit", "50"])
        .expect("parse");
    match cli.command {
        Command::Query {
            target: QueryTarget::Log { prefix, level, limit },
        } => {
            assert_eq!(prefix, "etl");
            assert_eq!(level, None);
            assert_eq!(limit, Some(50));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

use super::*;

#[test]
fn parses_db_ping_command() {
    let cli = Cli::try_parse_from(["brandrec-cli", "db", "ping"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Ping
        })
    ));
}

#[test]
fn parses_db_migrate_command() {
    let cli =
        Cli::try_parse_from(["brandrec-cli", "db", "migrate"]).expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Some(Commands::Db {
            command: DbCommands::Migrate
        })
    ));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["brandrec-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn compare_defaults_to_table_without_saving() {
    let cli = Cli::try_parse_from([
        "brandrec-cli",
        "compare",
        "--source-a",
        "a.json",
        "--source-b",
        "b.json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Compare {
            save: false,
            no_fuzzy: false,
            name: None,
            format: OutputFormat::Table,
            ..
        })
    ));
}

#[test]
fn compare_with_save_name_and_json() {
    let cli = Cli::try_parse_from([
        "brandrec-cli",
        "compare",
        "--source-a",
        "a.json",
        "--source-b",
        "b.json",
        "--id-a",
        "https://a.example/designers",
        "--save",
        "--name",
        "spring",
        "--format",
        "json",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Compare {
            save: true,
            name: Some(ref n),
            id_a: Some(ref id),
            format: OutputFormat::Json,
            ..
        }) if n == "spring" && id == "https://a.example/designers"
    ));
}

#[test]
fn compare_name_requires_save() {
    let result = Cli::try_parse_from([
        "brandrec-cli",
        "compare",
        "--source-a",
        "a.json",
        "--source-b",
        "b.json",
        "--name",
        "spring",
    ]);
    assert!(result.is_err());
}

#[test]
fn compare_requires_both_sources() {
    let result = Cli::try_parse_from(["brandrec-cli", "compare", "--source-a", "a.json"]);
    assert!(result.is_err());
}

#[test]
fn parses_snapshots_diff() {
    let cli = Cli::try_parse_from(["brandrec-cli", "snapshots", "diff", "4", "9"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshots {
            command: SnapshotCommands::Diff {
                first: 4,
                second: 9,
                format: OutputFormat::Table
            }
        })
    ));
}

#[test]
fn snapshots_list_filter_needs_both_sources() {
    let result = Cli::try_parse_from(["brandrec-cli", "snapshots", "list", "--source-a", "a"]);
    assert!(result.is_err());

    let cli = Cli::try_parse_from([
        "brandrec-cli",
        "snapshots",
        "list",
        "--source-a",
        "a",
        "--source-b",
        "b",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Snapshots {
            command: SnapshotCommands::List {
                source_a: Some(_),
                source_b: Some(_),
                ..
            }
        })
    ));
}

#[test]
fn snapshots_delete_rejects_non_numeric_id() {
    let result = Cli::try_parse_from(["brandrec-cli", "snapshots", "delete", "latest"]);
    assert!(result.is_err());
}

use cascata::cli::commands::agent::AgentCommands;
use cascata::cli::commands::cascade::CascadeCommands;
use cascata::cli::commands::lead::LeadCommands;
use cascata::cli::commands::sweep::SweepCommands;
use cascata::cli::{Cli, Commands};
use cascata::domain::models::Motivo;
use clap::Parser;
use uuid::Uuid;

#[test]
fn test_parse_lead_add() {
    let cli = Cli::try_parse_from([
        "cascata", "lead", "add", "Maria", "--telefone", "+55 11 98888-7777", "--source", "portal",
    ])
    .unwrap();

    match cli.command {
        Commands::Lead(args) => match args.command {
            LeadCommands::Add {
                nome,
                telefone,
                email,
                source,
            } => {
                assert_eq!(nome, "Maria");
                assert_eq!(telefone.as_deref(), Some("+55 11 98888-7777"));
                assert!(email.is_none());
                assert_eq!(source, "portal");
            }
            other => panic!("Wrong lead command: {other:?}"),
        },
        _ => panic!("Wrong top-level command"),
    }
}

#[test]
fn test_parse_agent_add_with_shift() {
    let cli = Cli::try_parse_from([
        "cascata", "agent", "add", "bruno", "--department", "plantao", "--shift", "22-6",
    ])
    .unwrap();

    let Commands::Agent(args) = cli.command else {
        panic!("Wrong top-level command");
    };
    let AgentCommands::Add {
        id,
        department,
        shift,
        off_duty,
        ..
    } = args.command
    else {
        panic!("Wrong agent command");
    };
    assert_eq!(id, "bruno");
    assert_eq!(department, "plantao");
    assert_eq!(shift, Some((22, 6)));
    assert!(!off_duty);
}

#[test]
fn test_parse_bad_shift_fails() {
    let result = Cli::try_parse_from([
        "cascata", "agent", "add", "bruno", "--department", "plantao", "--shift", "noite",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_parse_finalize_motivo() {
    let cliente = Uuid::new_v4();
    let id = cliente.to_string();
    let cli = Cli::try_parse_from([
        "cascata",
        "cascade",
        "finalize",
        id.as_str(),
        "--user",
        "ana",
        "--motivo",
        "duplicado",
    ])
    .unwrap();

    let Commands::Cascade(args) = cli.command else {
        panic!("Wrong top-level command");
    };
    match args.command {
        CascadeCommands::Finalize {
            cliente_id,
            user,
            motivo,
        } => {
            assert_eq!(cliente_id, cliente);
            assert_eq!(user, "ana");
            assert_eq!(motivo, Motivo::Duplicado);
        }
        other => panic!("Wrong cascade command: {other:?}"),
    }
}

#[test]
fn test_parse_finalize_rejects_expirado() {
    let id = Uuid::new_v4().to_string();
    let result = Cli::try_parse_from([
        "cascata",
        "cascade",
        "finalize",
        id.as_str(),
        "--user",
        "ana",
        "--motivo",
        "expirado",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "cascata", "sweep", "run", "--interval", "5", "--json", "--config", "ops.yaml", "-v",
    ])
    .unwrap();
    assert!(cli.json);
    assert!(cli.verbose);
    assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("ops.yaml")));
    let Commands::Sweep(args) = cli.command else {
        panic!("Wrong top-level command");
    };
    assert!(matches!(args.command, SweepCommands::Run { interval: Some(5) }));
}

#[test]
fn test_metrics_range_requires_both_bounds() {
    assert!(Cli::try_parse_from(["cascata", "metrics", "--from", "2025-03-01"]).is_err());
    let cli = Cli::try_parse_from([
        "cascata", "metrics", "--from", "2025-03-01", "--to", "2025-04-01",
    ])
    .unwrap();
    let Commands::Metrics(args) = cli.command else {
        panic!("Wrong top-level command");
    };
    assert!(args.from.is_some() && args.to.is_some());
}

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelpTopic {
    Root,
    Connections,
    Tables,
    Describe,
}

#[derive(Debug, Clone)]
pub enum Command {
    Help(HelpTopic),
    Connections(SourceArgs),
    Tables(TablesArgs),
    Describe(DescribeArgs),
}

/// Where named connections and mapper configuration come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArgs {
    pub env: PathBuf,
    pub config: PathBuf,
}

impl Default for SourceArgs {
    fn default() -> Self {
        Self {
            env: PathBuf::from(".env"),
            config: PathBuf::from("pgmap.toml"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TablesArgs {
    pub source: SourceArgs,
    pub connection: String,
}

#[derive(Debug, Clone)]
pub struct DescribeArgs {
    pub source: SourceArgs,
    pub connection: String,
    pub table: String,
}

pub fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    let mut it = args.iter().skip(1);
    let Some(first) = it.next() else {
        return Ok(Command::Help(HelpTopic::Root));
    };

    let topic = match first.as_str() {
        "-h" | "--help" | "help" => return Ok(Command::Help(HelpTopic::Root)),
        "connections" => HelpTopic::Connections,
        "tables" => HelpTopic::Tables,
        "describe" => HelpTopic::Describe,
        _ => anyhow::bail!("unknown command: {first}"),
    };

    let mut source = SourceArgs::default();
    let mut connection: Option<String> = None;
    let mut positional: Vec<String> = Vec::new();

    while let Some(token) = it.next() {
        match token.as_str() {
            "-h" | "--help" => return Ok(Command::Help(topic)),
            "--env" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--env requires a value");
                };
                source.env = PathBuf::from(v);
            }
            t if t.starts_with("--env=") => {
                source.env = PathBuf::from(t.trim_start_matches("--env="));
            }
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                source.config = PathBuf::from(v);
            }
            t if t.starts_with("--config=") => {
                source.config = PathBuf::from(t.trim_start_matches("--config="));
            }
            "--connection" | "-c" if topic != HelpTopic::Connections => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--connection requires a value");
                };
                connection = Some(v.to_string());
            }
            t if t.starts_with("--connection=") && topic != HelpTopic::Connections => {
                connection = Some(t.trim_start_matches("--connection=").to_string());
            }
            other if other.starts_with('-') => anyhow::bail!("unknown argument: {other}"),
            other => positional.push(other.to_string()),
        }
    }

    let require_connection = |connection: Option<String>| -> anyhow::Result<String> {
        match connection {
            Some(name) if !name.is_empty() => Ok(name),
            _ => anyhow::bail!("missing --connection <NAME>"),
        }
    };

    match topic {
        HelpTopic::Connections => {
            if let Some(extra) = positional.first() {
                anyhow::bail!("unexpected argument: {extra}");
            }
            Ok(Command::Connections(source))
        }
        HelpTopic::Tables => {
            if let Some(extra) = positional.first() {
                anyhow::bail!("unexpected argument: {extra}");
            }
            Ok(Command::Tables(TablesArgs {
                source,
                connection: require_connection(connection)?,
            }))
        }
        HelpTopic::Describe => {
            let mut positional = positional.into_iter();
            let Some(table) = positional.next() else {
                anyhow::bail!("missing TABLE: expected `pgmap describe <TABLE> --connection <NAME>`");
            };
            if let Some(extra) = positional.next() {
                anyhow::bail!("unexpected argument: {extra}");
            }
            Ok(Command::Describe(DescribeArgs {
                source,
                connection: require_connection(connection)?,
                table,
            }))
        }
        HelpTopic::Root => Ok(Command::Help(HelpTopic::Root)),
    }
}

pub fn print_help(topic: HelpTopic) {
    match topic {
        HelpTopic::Root => {
            println!(
                "\
pgmap - inspect named connections and mapped schemas

USAGE:
  pgmap <COMMAND> [OPTIONS]

COMMANDS:
  connections   List named connections from the env file
  tables        Map a connection and list its tables
  describe      Print the columns of one mapped table

Run `pgmap <command> --help` for more."
            );
        }
        HelpTopic::Connections => {
            println!(
                "\
USAGE:
  pgmap connections [OPTIONS]

OPTIONS:
  --env <FILE>          Env file with connection tuples (default: .env)
  --config <FILE>       Mapper config (default: pgmap.toml, optional)
  -h, --help            Print help"
            );
        }
        HelpTopic::Tables => {
            println!(
                "\
USAGE:
  pgmap tables --connection <NAME> [OPTIONS]

OPTIONS:
  -c, --connection <NAME>   Named connection to open
  --env <FILE>              Env file with connection tuples (default: .env)
  --config <FILE>           Mapper config (default: pgmap.toml, optional)
  -h, --help                Print help"
            );
        }
        HelpTopic::Describe => {
            println!(
                "\
USAGE:
  pgmap describe <TABLE> --connection <NAME> [OPTIONS]

TABLE is matched case-insensitively.

OPTIONS:
  -c, --connection <NAME>   Named connection to open
  --env <FILE>              Env file with connection tuples (default: .env)
  --config <FILE>           Mapper config (default: pgmap.toml, optional)
  -h, --help                Print help"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("pgmap")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn no_args_prints_root_help() {
        assert!(matches!(
            parse_args(&args(&[])).unwrap(),
            Command::Help(HelpTopic::Root)
        ));
    }

    #[test]
    fn parse_connections_with_paths() {
        let cmd = parse_args(&args(&["connections", "--env=prod.env", "--config", "x.toml"])).unwrap();
        let Command::Connections(source) = cmd else {
            panic!("expected connections");
        };
        assert_eq!(source.env, PathBuf::from("prod.env"));
        assert_eq!(source.config, PathBuf::from("x.toml"));
    }

    #[test]
    fn parse_tables_requires_connection() {
        let err = parse_args(&args(&["tables"])).unwrap_err();
        assert!(err.to_string().contains("--connection"));

        let Command::Tables(tables) = parse_args(&args(&["tables", "-c", "main"])).unwrap() else {
            panic!("expected tables");
        };
        assert_eq!(tables.connection, "main");
        assert_eq!(tables.source, SourceArgs::default());
    }

    #[test]
    fn parse_describe_takes_one_table() {
        let Command::Describe(describe) =
            parse_args(&args(&["describe", "Users", "--connection=main"])).unwrap()
        else {
            panic!("expected describe");
        };
        assert_eq!(describe.table, "Users");
        assert_eq!(describe.connection, "main");

        assert!(parse_args(&args(&["describe", "--connection", "main"])).is_err());
        assert!(parse_args(&args(&["describe", "a", "b", "-c", "main"])).is_err());
    }

    #[test]
    fn subcommand_help_and_unknown_input() {
        assert!(matches!(
            parse_args(&args(&["tables", "--help"])).unwrap(),
            Command::Help(HelpTopic::Tables)
        ));
        assert!(parse_args(&args(&["migrate"])).is_err());
        assert!(parse_args(&args(&["connections", "--connection", "main"])).is_err());
    }
}

mod cli;
mod inspect;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Connections(args) => inspect::connections(args),
        cli::Command::Tables(args) => inspect::tables(args).await,
        cli::Command::Describe(args) => inspect::describe(args).await,
    }
}

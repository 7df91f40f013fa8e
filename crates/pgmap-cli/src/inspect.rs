use crate::cli::{DescribeArgs, SourceArgs, TablesArgs};
use anyhow::Context;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use pgmap::{Database, ErrorLog, MapperConfig, SchemaMapper};

fn load_config(source: &SourceArgs) -> anyhow::Result<MapperConfig> {
    if !source.config.exists() {
        return Ok(MapperConfig::default());
    }
    MapperConfig::load(&source.config)
        .with_context(|| format!("failed to load config {}", source.config.display()))
}

fn load_database(source: &SourceArgs) -> anyhow::Result<Database> {
    let config = load_config(source)?;
    let database = Database::from_env_file(&source.env, config)
        .with_context(|| format!("failed to load connections from {}", source.env.display()))?;
    Ok(database.with_error_log(ErrorLog::new()))
}

async fn open(source: &SourceArgs, connection: &str) -> anyhow::Result<SchemaMapper> {
    let database = load_database(source)?;
    database
        .try_open_connection(connection)
        .await
        .with_context(|| format!("failed to open connection {connection}"))
}

fn header(names: &[&str]) -> Vec<Cell> {
    names
        .iter()
        .map(|name| {
            Cell::new(name)
                .add_attribute(Attribute::Bold)
                .fg(Color::Cyan)
        })
        .collect()
}

fn new_table(names: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(names));
    table
}

pub fn connections(source: SourceArgs) -> anyhow::Result<()> {
    let database = load_database(&source)?;
    if database.connections().is_empty() {
        println!("no connections found in {}", source.env.display());
        return Ok(());
    }

    let mut table = new_table(&["Name", "DSN", "User"]);
    for spec in database.connections() {
        table.add_row(vec![
            Cell::new(&spec.name).fg(Color::Yellow),
            Cell::new(spec.dsn()),
            Cell::new(&spec.user),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub async fn tables(args: TablesArgs) -> anyhow::Result<()> {
    let mapper = open(&args.source, &args.connection).await?;

    let mut table = new_table(&["Table", "Key", "Columns"]);
    for proxy in mapper.tables() {
        let count = proxy.columns().len();
        table.add_row(vec![
            Cell::new(proxy.name()).fg(Color::Yellow),
            Cell::new(proxy.key()),
            Cell::new(count).fg(if count == 0 {
                Color::DarkGrey
            } else {
                Color::Green
            }),
        ]);
    }
    println!(
        "{}.{}: {} tables",
        mapper.database_name(),
        mapper.schema(),
        mapper.table_names().len()
    );
    println!("{table}");

    for record in mapper.error_log().records() {
        match &record.cause {
            Some(cause) => eprintln!("warning: {}: {cause}", record.message),
            None => eprintln!("warning: {}", record.message),
        }
    }
    Ok(())
}

pub async fn describe(args: DescribeArgs) -> anyhow::Result<()> {
    let mapper = open(&args.source, &args.connection).await?;
    let proxy = mapper.table(&args.table)?;

    let mut table = new_table(&["#", "Column"]);
    for (i, column) in proxy.columns().iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1).fg(Color::DarkGrey), Cell::new(column)]);
    }
    println!("{} ({})", proxy.name(), proxy.key());
    println!("{table}");
    Ok(())
}

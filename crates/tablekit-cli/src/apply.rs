use crate::cli::ApplyArgs;

pub async fn run(args: ApplyArgs) -> anyhow::Result<()> {
    let (mut db, config) = crate::config::connect(&args.conn).await?;

    if config.tables.is_empty() {
        println!("no [[tables]] defined in {}", args.conn.config.display());
        db.close().await?;
        return Ok(());
    }

    db.apply_tables(&config.tables).await?;
    for def in &config.tables {
        match &def.schema {
            Some(schema) => println!("ensured {schema}.{}", def.name),
            None => println!("ensured {}", def.name),
        }
    }
    println!("{} table(s) applied", config.tables.len());

    db.close().await?;
    Ok(())
}

use crate::cli::SchemaArgs;
use crate::render;

pub async fn run(args: SchemaArgs) -> anyhow::Result<()> {
    let (db, config) = crate::config::connect(&args.conn).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(db.schema())?);
    } else {
        let mut count = 0usize;
        for table in db.schema().tables() {
            println!("{} ({:?})", table.qualified_name(), table.kind);
            println!("{}", render::columns_table(table));
            count += 1;
        }
        println!(
            "{count} table(s) in schema(s): {}",
            config.schemas.join(",")
        );
    }

    db.close().await?;
    Ok(())
}

use crate::cli::ExecArgs;

pub async fn run(args: ExecArgs) -> anyhow::Result<()> {
    let (db, _) = crate::config::connect(&args.conn).await?;

    let affected = db.execute_raw(&args.sql, &[]).await?;
    println!("{affected} row(s) affected");

    db.close().await?;
    Ok(())
}

mod apply;
mod cli;
mod config;
mod exec;
mod init;
mod render;
mod schema;
mod select;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let cmd = cli::parse_args(&args)?;
    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Init(args) => init::run(args),
        cli::Command::Schema(args) => schema::run(args).await,
        cli::Command::Apply(args) => apply::run(args).await,
        cli::Command::Select(args) => select::run(args).await,
        cli::Command::Exec(args) => exec::run(args).await,
    }
}

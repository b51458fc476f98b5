use clap::Parser;
use playground_client::terminal::{app, cli::Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    match app::execute(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("❌ {err:#}");
            std::process::exit(1);
        }
    }
}

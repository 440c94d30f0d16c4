use clap::Parser;

fn main() -> anyhow::Result<()> {
    portfolio_app::run_app(portfolio_app::Args::parse())
}

fn main() -> anyhow::Result<()> {
    reskit::cli::run_cli()
}

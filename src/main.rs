fn main() {
    #[cfg(feature = "cli")]
    namefix::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("namefix: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}

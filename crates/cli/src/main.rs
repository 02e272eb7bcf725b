fn main() {
    std::process::exit(regiodedupe_cli::run());
}

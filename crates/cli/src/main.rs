//! `typebridge` binary.

fn main() {
    typebridge_cli::init_tracing();
    std::process::exit(typebridge_cli::run_cli(std::env::args().collect()));
}

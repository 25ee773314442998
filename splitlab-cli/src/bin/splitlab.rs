fn main() {
    if let Err(e) = splitlab_cli::run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

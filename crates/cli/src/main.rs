fn main() {
    if let Err(e) = bootshim_cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

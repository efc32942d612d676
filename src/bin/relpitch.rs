fn main() {
    if let Err(e) = relpitch::tui::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn main() {
    if let Err(err) = archdiagram::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn main() {
    if let Err(error) = media_digest::run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

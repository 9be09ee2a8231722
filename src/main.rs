fn main() {
    if let Err(err) = tabular_intake::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

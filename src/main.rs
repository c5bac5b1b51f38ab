fn main() {
    if let Err(err) = ifblock_shape::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

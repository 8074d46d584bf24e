fn main() {
    if let Err(e) = docverify_lib::run() {
        eprintln!("docverify: {e}");
        std::process::exit(1);
    }
}

fn main() {
    if let Err(err) = csvsql::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

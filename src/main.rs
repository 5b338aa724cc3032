fn main() {
    if let Err(err) = cc_stats_server::run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn main() {
    if let Err(err) = flowchart_textbook::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

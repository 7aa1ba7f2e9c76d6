use clap::Parser;

fn main() {
    let cli = loopforgectl::Cli::parse();
    if let Err(err) = loopforgectl::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

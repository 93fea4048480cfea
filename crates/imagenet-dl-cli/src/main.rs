mod cli;

fn main() {
    // Logging is initialized inside the run command, once the target directory is known.
    if let Err(err) = cli::run_from_args() {
        eprintln!("imagenet-dl error: {:#}", err);
        std::process::exit(1);
    }
}

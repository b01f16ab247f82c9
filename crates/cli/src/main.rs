use std::process::ExitCode;

fn main() -> ExitCode {
    dermacraft_cli::run()
}
